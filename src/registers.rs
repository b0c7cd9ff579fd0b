//! ## Register set
//! Stores `count` HyperLogLog registers, each holding the maximum rank observed
//! for its bucket, using `REGISTER_WIDTH` bits per register.
//!
//! The `words` format:
//! - words[0..N]   - register ranks packed using `REGISTER_WIDTH` bits per register,
//!   register `i` occupies bits `[i * W, (i + 1) * W)` of the little-endian bit stream.
//! - words[N]      - one extra zero word for branchless register access (see `read`).
//!
//! Registers start at zero and are only ever raised, see `update_if_greater`.

use std::fmt::{Debug, Formatter};
use std::mem::{size_of, size_of_val};

use crate::error::HyperLogLogError;

/// Number of bits used for every register.
///
/// Ranks derived from a 32-bit hash never exceed 32, which needs 6 bits.
pub const REGISTER_WIDTH: usize = 6;
/// Largest value a register is able to hold.
pub const MAX_REGISTER_VALUE: u32 = (1 << REGISTER_WIDTH) - 1;

/// Fixed-size array of bit-packed registers.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterSet {
    /// Number of registers
    count: usize,
    /// Packed register values followed by one padding word
    words: Vec<u32>,
}

impl RegisterSet {
    /// Creates new `RegisterSet` with `count` registers set to zero.
    pub fn new(count: usize) -> Self {
        let words = vec![0u32; Self::words_len(count)];
        Self { count, words }
    }

    /// Number of `u32` words needed to pack `count` registers, plus one padding word.
    #[inline]
    fn words_len(count: usize) -> usize {
        (count * REGISTER_WIDTH).div_ceil(32) + 1
    }

    /// Returns number of registers.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns current value of register `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Result<u32, HyperLogLogError> {
        self.check_index(index)?;
        Ok(self.read(index))
    }

    /// Raises register `index` to `value` if `value` is greater than its current value.
    ///
    /// Returns `true` if register was changed. Values above `MAX_REGISTER_VALUE` are clamped.
    #[inline]
    pub fn update_if_greater(&mut self, index: usize, value: u32) -> Result<bool, HyperLogLogError> {
        self.check_index(index)?;
        Ok(self.raise(index, value))
    }

    /// Returns an iterator over all register values in index order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.count).map(move |index| self.read(index))
    }

    /// Returns memory size of `RegisterSet` in bytes.
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + self.heap_size()
    }

    /// Returns number of heap allocated bytes holding register values.
    #[inline]
    pub(crate) fn heap_size(&self) -> usize {
        size_of_val(self.words.as_slice())
    }

    #[inline]
    fn check_index(&self, index: usize) -> Result<(), HyperLogLogError> {
        if index < self.count {
            Ok(())
        } else {
            Err(HyperLogLogError::OutOfRange {
                index,
                count: self.count,
            })
        }
    }

    /// Raise register `index` without range check.
    /// Caller must ensure that `index < self.count`.
    #[inline]
    pub(crate) fn raise(&mut self, index: usize, value: u32) -> bool {
        let value = value.min(MAX_REGISTER_VALUE);
        if value > self.read(index) {
            self.write(index, value);
            true
        } else {
            false
        }
    }

    /// Read register `index`, which may span two consecutive words.
    #[inline]
    fn read(&self, index: usize) -> u32 {
        let bit_idx = index * REGISTER_WIDTH;
        let word_idx = bit_idx / 32;
        let bit_pos = bit_idx % 32;
        let bits = &self.words[word_idx..word_idx + 2];
        let bits_1 = REGISTER_WIDTH.min(32 - bit_pos);
        let bits_2 = REGISTER_WIDTH - bits_1;
        let mask_1 = (1u32 << bits_1) - 1;
        let mask_2 = (1u32 << bits_2) - 1;

        ((bits[0] >> bit_pos) & mask_1) | ((bits[1] & mask_2) << bits_1)
    }

    /// Overwrite register `index` with `value`.
    #[inline]
    fn write(&mut self, index: usize, value: u32) {
        let bit_idx = index * REGISTER_WIDTH;
        let word_idx = bit_idx / 32;
        let bit_pos = bit_idx % 32;
        let bits = &mut self.words[word_idx..word_idx + 2];
        let bits_1 = REGISTER_WIDTH.min(32 - bit_pos);
        let bits_2 = REGISTER_WIDTH - bits_1;
        let mask_1 = (1u32 << bits_1) - 1;
        let mask_2 = (1u32 << bits_2) - 1;

        // Unconditionally update both words, the second one is untouched when `mask_2` is zero
        bits[0] &= !(mask_1 << bit_pos);
        bits[0] |= (value & mask_1) << bit_pos;
        bits[1] &= !mask_2;
        bits[1] |= (value >> bits_1) & mask_2;
    }
}

impl Debug for RegisterSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
