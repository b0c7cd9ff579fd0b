//! Errors returned by `HyperLogLog` construction, register access and estimation.

use thiserror::Error;

/// HyperLogLog error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HyperLogLogError {
    /// Register index does not address any register of the set.
    #[error("register index {index} is out of range for {count} registers")]
    OutOfRange { index: usize, count: usize },
    /// Precision (`log2m`) outside of the supported range.
    #[error("precision {0} is out of range, expected value in [1..31]")]
    InvalidPrecision(u8),
    /// Relative standard deviation which does not map to a supported precision.
    #[error("relative standard deviation {0} is invalid, expected value in (0..1)")]
    InvalidRsd(f64),
    /// Register set injected into an estimator has a different number of registers.
    #[error("register set holds {actual} registers, expected {expected}")]
    RegisterCountMismatch { expected: usize, actual: usize },
    /// Small-range correction is undefined when no register is zero.
    #[error("linear counting is undefined without zero registers")]
    DegenerateEstimate,
}

impl HyperLogLogError {
    /// Returns whether error is caused by invalid estimator configuration.
    #[inline]
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidPrecision(_) | Self::InvalidRsd(_) | Self::RegisterCountMismatch { .. }
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(HyperLogLogError::OutOfRange { index: 16, count: 16 } => "register index 16 is out of range for 16 registers")]
    #[test_case(HyperLogLogError::InvalidPrecision(0) => "precision 0 is out of range, expected value in [1..31]")]
    #[test_case(HyperLogLogError::InvalidRsd(1.5) => "relative standard deviation 1.5 is invalid, expected value in (0..1)")]
    #[test_case(HyperLogLogError::RegisterCountMismatch { expected: 16, actual: 32 } => "register set holds 32 registers, expected 16")]
    #[test_case(HyperLogLogError::DegenerateEstimate => "linear counting is undefined without zero registers")]
    fn test_display(e: HyperLogLogError) -> String {
        e.to_string()
    }

    #[test_case(HyperLogLogError::OutOfRange { index: 0, count: 0 } => false)]
    #[test_case(HyperLogLogError::InvalidPrecision(32) => true)]
    #[test_case(HyperLogLogError::InvalidRsd(0.0) => true)]
    #[test_case(HyperLogLogError::RegisterCountMismatch { expected: 1, actual: 2 } => true)]
    #[test_case(HyperLogLogError::DegenerateEstimate => false)]
    fn test_is_invalid_configuration(e: HyperLogLogError) -> bool {
        e.is_invalid_configuration()
    }
}
