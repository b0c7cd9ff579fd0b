//! ## Concurrent HyperLogLog
//! Lock-free variant of [`HyperLogLog`] which can be shared between threads.
//!
//! Every register is stored in its own `AtomicU8` and raised with `fetch_max`, so concurrent
//! `add` calls touching the same register never lose the larger rank. Estimates computed
//! while other threads are adding are snapshots of whatever ranks were visible at the time.

use std::fmt::{Debug, Formatter};
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};
use std::sync::atomic::{AtomicU8, Ordering};

use wyhash::WyHash;

use crate::error::HyperLogLogError;
use crate::estimator::{decode_hash, estimate, fold_hash, Estimate, HyperLogLog, RegisterStats};
use crate::precision::Precision;
use crate::registers::RegisterSet;

/// HyperLogLog cardinality estimator with atomic registers
pub struct AtomicHyperLogLog<H: Hasher + Default = WyHash> {
    precision: Precision,
    alpha_mm: f64,
    registers: Box<[AtomicU8]>,
    build_hasher: BuildHasherDefault<H>,
}

impl<H: Hasher + Default> AtomicHyperLogLog<H> {
    /// Creates new instance of `AtomicHyperLogLog` with `2^log2m` zero registers
    pub fn new(precision: Precision) -> Self {
        let registers = (0..precision.registers()).map(|_| AtomicU8::new(0)).collect();
        Self {
            precision,
            alpha_mm: precision.alpha_mm(),
            registers,
            build_hasher: BuildHasherDefault::default(),
        }
    }

    /// Creates new instance of `AtomicHyperLogLog` with explicit `log2m`
    #[inline]
    pub fn with_log2m(log2m: u8) -> Result<Self, HyperLogLogError> {
        Ok(Self::new(Precision::new(log2m)?))
    }

    /// Creates new instance of `AtomicHyperLogLog` providing requested relative standard deviation
    #[inline]
    pub fn with_rsd(rsd: f64) -> Result<Self, HyperLogLogError> {
        Ok(Self::new(Precision::from_rsd(rsd)?))
    }

    /// Add a hashable item, returns `true` if the item raised its register
    #[inline]
    pub fn add<T: Hash + ?Sized>(&self, item: &T) -> bool {
        let mut hasher = self.build_hasher.build_hasher();
        item.hash(&mut hasher);
        self.offer_hashed(fold_hash(hasher.finish()))
    }

    /// Add uniformly distributed 32-bit hash, returns `true` if the hash raised its register
    #[inline]
    pub fn offer_hashed(&self, hash: u32) -> bool {
        let (idx, rank) = decode_hash(self.precision, hash);
        // rank never exceeds 32
        let rank = rank as u8;
        self.registers[idx].fetch_max(rank, Ordering::Relaxed) < rank
    }

    /// Return harmonic-mean estimate without small-range correction
    #[inline]
    pub fn raw_estimate(&self) -> f64 {
        self.alpha_mm / RegisterStats::collect(self.ranks()).sum
    }

    /// Return cardinality estimate, falling back to the raw estimate when linear counting is undefined
    pub fn cardinality(&self) -> u64 {
        match estimate(self.precision, self.alpha_mm, self.ranks()) {
            Estimate::Raw(e) | Estimate::LinearCounting(e) | Estimate::Degenerate(e) => {
                e.round() as u64
            }
        }
    }

    /// Return cardinality estimate or `DegenerateEstimate` error when linear counting is undefined
    pub fn try_cardinality(&self) -> Result<u64, HyperLogLogError> {
        match estimate(self.precision, self.alpha_mm, self.ranks()) {
            Estimate::Raw(e) | Estimate::LinearCounting(e) => Ok(e.round() as u64),
            Estimate::Degenerate(_) => Err(HyperLogLogError::DegenerateEstimate),
        }
    }

    /// Return precision of `AtomicHyperLogLog`
    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Copy currently visible register values into single-threaded `HyperLogLog`
    pub fn snapshot(&self) -> HyperLogLog<H> {
        let mut registers = RegisterSet::new(self.registers.len());
        for (idx, rank) in self.ranks().enumerate() {
            registers.raise(idx, rank);
        }
        HyperLogLog::from_parts(self.precision, registers)
    }

    #[inline]
    fn ranks(&self) -> impl Iterator<Item = u32> + '_ {
        self.registers
            .iter()
            .map(|r| u32::from(r.load(Ordering::Relaxed)))
    }
}

impl<H: Hasher + Default> Default for AtomicHyperLogLog<H> {
    fn default() -> Self {
        Self::new(Precision::default())
    }
}

impl<H: Hasher + Default> Debug for AtomicHyperLogLog<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, estimate: {} }}",
            self.precision,
            self.cardinality()
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::thread;
    use test_case::test_case;

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AtomicHyperLogLog>();
    }

    #[test]
    fn test_empty() {
        let hll = AtomicHyperLogLog::<WyHash>::with_log2m(8).unwrap();
        assert_eq!(hll.cardinality(), 0);
        assert_eq!(hll.try_cardinality(), Ok(0));
        assert_eq!(format!("{:?}", hll), "{ precision: 8, estimate: 0 }");
        assert!(hll.snapshot().is_empty());
    }

    #[test]
    fn test_offer_hashed() {
        let hll = AtomicHyperLogLog::<WyHash>::with_log2m(4).unwrap();
        assert!(hll.offer_hashed(0x0800_0000));
        assert!(!hll.offer_hashed(0x0800_0000));
        assert!(hll.offer_hashed(0x0000_0000));
        assert!(!hll.offer_hashed(0x0400_0000));
        assert_eq!(hll.snapshot().registers().get(0), Ok(29));
    }

    #[test]
    fn test_degenerate_estimate() {
        let hll = AtomicHyperLogLog::<WyHash>::with_log2m(4).unwrap();
        for idx in 0..16u32 {
            hll.offer_hashed((idx << 28) | (1 << 27));
        }
        assert_eq!(hll.try_cardinality(), Err(HyperLogLogError::DegenerateEstimate));
        assert_eq!(hll.cardinality(), 22);
        assert!((hll.raw_estimate() - 21.536).abs() < 1e-9);
    }

    #[test_case(4, 1000)]
    #[test_case(10, 1000)]
    #[test_case(12, 100_000)]
    fn test_concurrent_matches_sequential(log2m: u8, n: usize) {
        let concurrent = AtomicHyperLogLog::<WyHash>::with_log2m(log2m).unwrap();
        let threads = 4;
        thread::scope(|s| {
            for t in 0..threads {
                let hll = &concurrent;
                s.spawn(move || {
                    for i in (t..n).step_by(threads) {
                        hll.add(&i);
                    }
                });
            }
        });

        let mut sequential = HyperLogLog::<WyHash>::with_log2m(log2m).unwrap();
        for i in 0..n {
            sequential.add(&i);
        }

        assert_eq!(concurrent.snapshot(), sequential);
        assert_eq!(concurrent.cardinality(), sequential.cardinality());
    }
}
