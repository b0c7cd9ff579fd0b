//! `hll-counter` is a Rust crate designed to estimate the number of distinct elements in a stream or dataset
//! using bounded memory.
//!
//! This library implements HyperLogLog with bit-packed registers and linear counting for small cardinalities.
//!
//! ```
//! use hll_counter::HyperLogLog;
//!
//! let mut hll: HyperLogLog = HyperLogLog::with_rsd(0.02).unwrap();
//! for i in 0..1000 {
//!     hll.add(&i);
//! }
//! let estimate = hll.cardinality();
//! assert!(estimate > 900 && estimate < 1100);
//! ```
pub mod concurrent;
pub mod error;
pub mod estimator;
pub mod precision;
pub mod registers;

pub use concurrent::AtomicHyperLogLog;
pub use error::HyperLogLogError;
pub use estimator::HyperLogLog;
pub use precision::Precision;
pub use registers::RegisterSet;
