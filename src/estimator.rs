//! HyperLogLog estimator allows to estimate number of distinct elements
//! in the stream or dataset using `2^log2m` registers of `REGISTER_WIDTH` bits.
//!
//! # Algorithm
//!
//! Every element is hashed into 32-bit word which is split into two parts:
//! - top `log2m` bits select register index `j` in `[0, m)`.
//! - remaining `32 - log2m` bits define rank `r`: number of leading zeros plus one.
//!   Sentinel bit placed right after the remaining bits bounds rank to `32 - log2m + 1`.
//!
//! Each register keeps the maximum rank observed for its index. Estimate is computed as
//! harmonic mean `alpha * m^2 / sum(2^-M[j])`, and for small cardinalities
//! (raw estimate `<= 2.5 * m`) linear counting `m * ln(m / zeros)` is used instead.
//!
//! Original HyperLogLog paper:
//! http://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf
//!
//! ## Degenerate small-range estimate
//! Linear counting is undefined when small-range correction applies but no register is zero
//! (e.g. every register holds rank 1). [`HyperLogLog::cardinality`] falls back to the raw
//! harmonic-mean estimate in this case, while [`HyperLogLog::try_cardinality`] reports
//! [`HyperLogLogError::DegenerateEstimate`].

use std::fmt::{Debug, Formatter};
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};
use std::mem::size_of;

use tracing::debug;
use wyhash::WyHash;

use crate::error::HyperLogLogError;
use crate::precision::Precision;
use crate::registers::RegisterSet;

/// Width of hash word consumed by the estimator
pub const HASH_BITS: u32 = 32;

/// HyperLogLog cardinality estimator
pub struct HyperLogLog<H: Hasher + Default = WyHash> {
    /// Number of bits used for register indices
    precision: Precision,
    /// Bias correction constant multiplied by `m^2`
    alpha_mm: f64,
    /// Registers holding maximum observed ranks
    registers: RegisterSet,
    /// Zero-sized build hasher
    build_hasher: BuildHasherDefault<H>,
}

impl<H: Hasher + Default> HyperLogLog<H> {
    /// Creates new instance of `HyperLogLog` with `2^log2m` zero registers
    pub fn new(precision: Precision) -> Self {
        let registers = RegisterSet::new(precision.registers());
        let hll = Self::from_parts(precision, registers);
        debug!(
            log2m = precision.log2m(),
            registers = precision.registers(),
            rsd = precision.rsd(),
            "created HyperLogLog estimator"
        );
        hll
    }

    /// Creates new instance of `HyperLogLog` with explicit `log2m`
    #[inline]
    pub fn with_log2m(log2m: u8) -> Result<Self, HyperLogLogError> {
        Ok(Self::new(Precision::new(log2m)?))
    }

    /// Creates new instance of `HyperLogLog` with the smallest number of registers
    /// providing requested relative standard deviation `rsd`
    #[inline]
    pub fn with_rsd(rsd: f64) -> Result<Self, HyperLogLogError> {
        Ok(Self::new(Precision::from_rsd(rsd)?))
    }

    /// Creates new instance of `HyperLogLog` on top of existing `registers`,
    /// which must hold exactly `2^log2m` registers
    pub fn with_registers(
        precision: Precision,
        registers: RegisterSet,
    ) -> Result<Self, HyperLogLogError> {
        if registers.count() != precision.registers() {
            return Err(HyperLogLogError::RegisterCountMismatch {
                expected: precision.registers(),
                actual: registers.count(),
            });
        }
        Ok(Self::from_parts(precision, registers))
    }

    #[inline]
    pub(crate) fn from_parts(precision: Precision, registers: RegisterSet) -> Self {
        Self {
            precision,
            alpha_mm: precision.alpha_mm(),
            registers,
            build_hasher: BuildHasherDefault::default(),
        }
    }

    /// Add a hashable item into `HyperLogLog`.
    ///
    /// Returns `true` if the item raised any register.
    #[inline]
    pub fn add<T: Hash + ?Sized>(&mut self, item: &T) -> bool {
        let mut hasher = self.build_hasher.build_hasher();
        item.hash(&mut hasher);
        self.offer_hashed(fold_hash(hasher.finish()))
    }

    /// Add uniformly distributed 32-bit hash into `HyperLogLog`.
    ///
    /// Returns `true` if the hash raised its register.
    #[inline]
    pub fn offer_hashed(&mut self, hash: u32) -> bool {
        let (idx, rank) = decode_hash(self.precision, hash);
        self.registers.raise(idx, rank)
    }

    /// Return harmonic-mean estimate without small-range correction
    #[inline]
    pub fn raw_estimate(&self) -> f64 {
        self.alpha_mm / RegisterStats::collect(self.registers.iter()).sum
    }

    /// Return cardinality estimate.
    ///
    /// Falls back to the raw estimate when linear counting is undefined.
    pub fn cardinality(&self) -> u64 {
        match estimate(self.precision, self.alpha_mm, self.registers.iter()) {
            Estimate::Raw(e) | Estimate::LinearCounting(e) => round(e),
            Estimate::Degenerate(raw) => {
                debug!(
                    log2m = self.precision.log2m(),
                    raw, "no zero registers left for linear counting, using raw estimate"
                );
                round(raw)
            }
        }
    }

    /// Return cardinality estimate or `DegenerateEstimate` error when linear counting is undefined.
    pub fn try_cardinality(&self) -> Result<u64, HyperLogLogError> {
        match estimate(self.precision, self.alpha_mm, self.registers.iter()) {
            Estimate::Raw(e) | Estimate::LinearCounting(e) => Ok(round(e)),
            Estimate::Degenerate(_) => Err(HyperLogLogError::DegenerateEstimate),
        }
    }

    /// Return precision of `HyperLogLog`
    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Return registers of `HyperLogLog`
    #[inline]
    pub fn registers(&self) -> &RegisterSet {
        &self.registers
    }

    /// Return expected relative standard deviation of estimates
    #[inline]
    pub fn relative_standard_deviation(&self) -> f64 {
        self.precision.rsd()
    }

    /// Return whether no hash has been added yet
    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|rank| rank == 0)
    }

    /// Return memory size of `HyperLogLog`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() + self.registers.heap_size()
    }
}

impl<H: Hasher + Default> Default for HyperLogLog<H> {
    fn default() -> Self {
        Self::new(Precision::default())
    }
}

impl<H: Hasher + Default> Clone for HyperLogLog<H> {
    fn clone(&self) -> Self {
        Self::from_parts(self.precision, self.registers.clone())
    }
}

impl<H: Hasher + Default> PartialEq for HyperLogLog<H> {
    fn eq(&self, rhs: &Self) -> bool {
        self.precision == rhs.precision && self.registers == rhs.registers
    }
}

impl<H: Hasher + Default> Debug for HyperLogLog<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, estimate: {}, size: {} }}",
            self.precision,
            self.cardinality(),
            self.size_of()
        )
    }
}

/// Fold 64-bit hasher output into 32-bit hash word
#[inline]
pub(crate) fn fold_hash(hash: u64) -> u32 {
    ((hash >> 32) ^ hash) as u32
}

/// Return register index and rank of `hash`
#[inline]
pub(crate) fn decode_hash(precision: Precision, hash: u32) -> (usize, u32) {
    let log2m = u32::from(precision.log2m());
    let idx = (hash >> (HASH_BITS - log2m)) as usize;
    let rank = ((hash << log2m) | (1 << (log2m - 1))).leading_zeros() + 1;
    (idx, rank)
}

/// Harmonic sum and number of zero registers
pub(crate) struct RegisterStats {
    pub(crate) sum: f64,
    pub(crate) zeros: usize,
}

impl RegisterStats {
    #[inline]
    pub(crate) fn collect(ranks: impl Iterator<Item = u32>) -> Self {
        let mut stats = Self { sum: 0.0, zeros: 0 };
        for rank in ranks {
            stats.sum += (-f64::from(rank)).exp2();
            stats.zeros += usize::from(rank == 0);
        }
        stats
    }
}

/// Cardinality estimate before rounding
#[derive(Debug, PartialEq)]
pub(crate) enum Estimate {
    /// Harmonic-mean estimate
    Raw(f64),
    /// Small-range estimate using linear counting
    LinearCounting(f64),
    /// Small-range estimate requested without zero registers, holds raw estimate
    Degenerate(f64),
}

/// Estimate cardinality from register ranks
pub(crate) fn estimate(
    precision: Precision,
    alpha_mm: f64,
    ranks: impl Iterator<Item = u32>,
) -> Estimate {
    let m = precision.registers() as f64;
    let stats = RegisterStats::collect(ranks);
    let raw = alpha_mm / stats.sum;
    if raw > 2.5 * m {
        Estimate::Raw(raw)
    } else if stats.zeros == 0 {
        Estimate::Degenerate(raw)
    } else {
        Estimate::LinearCounting(linear_counting(m, stats.zeros as f64))
    }
}

#[inline]
fn linear_counting(m: f64, zeros: f64) -> f64 {
    m * (m / zeros).ln()
}

#[inline]
fn round(estimate: f64) -> u64 {
    estimate.round() as u64
}
