//! Precision (`log2m`) of HyperLogLog estimators.
//!
//! Precision defines number of registers `m = 2^log2m` and thus the trade-off between
//! memory and accuracy: relative standard deviation of the estimate is `1.106 / sqrt(m)`.
//!   - log2m = 4:  1.106 / sqrt(2^4)  = 27.65%
//!   - log2m = 10: 1.106 / sqrt(2^10) = 3.46%
//!   - log2m = 12: 1.106 / sqrt(2^12) = 1.73%
//!   - log2m = 16: 1.106 / sqrt(2^16) = 0.43%

use std::fmt::{Display, Formatter};

use crate::error::HyperLogLogError;

/// Smallest supported precision.
pub const MIN_PRECISION: u8 = 1;
/// Largest supported precision, keeps index and rank shifts within a 32-bit hash word.
pub const MAX_PRECISION: u8 = 31;
/// Precision used by `Default` estimators.
pub const DEFAULT_PRECISION: u8 = 12;

/// Constant relating number of registers to relative standard deviation.
const RSD_FACTOR: f64 = 1.106;

/// Validated number of bits used for register indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Precision(u8);

impl Precision {
    /// Create new `Precision` from explicit `log2m`
    #[inline]
    pub fn new(log2m: u8) -> Result<Self, HyperLogLogError> {
        if (MIN_PRECISION..=MAX_PRECISION).contains(&log2m) {
            Ok(Self(log2m))
        } else {
            Err(HyperLogLogError::InvalidPrecision(log2m))
        }
    }

    /// Create new `Precision` providing at least requested relative standard deviation `rsd`,
    /// computed as `floor(log2((1.106 / rsd)^2))`.
    pub fn from_rsd(rsd: f64) -> Result<Self, HyperLogLogError> {
        if !(rsd > 0.0 && rsd < 1.0) {
            return Err(HyperLogLogError::InvalidRsd(rsd));
        }
        let log2m = (RSD_FACTOR / rsd).powi(2).log2().floor();
        if log2m < f64::from(MIN_PRECISION) || log2m > f64::from(MAX_PRECISION) {
            return Err(HyperLogLogError::InvalidRsd(rsd));
        }
        Ok(Self(log2m as u8))
    }

    /// Returns `log2m`
    #[inline]
    pub fn log2m(&self) -> u8 {
        self.0
    }

    /// Returns number of registers `m`
    #[inline]
    pub fn registers(&self) -> usize {
        1 << self.0
    }

    /// Returns expected relative standard deviation of estimates.
    #[inline]
    pub fn rsd(&self) -> f64 {
        RSD_FACTOR / (self.registers() as f64).sqrt()
    }

    /// Returns bias correction constant multiplied by `m^2`.
    #[inline]
    pub fn alpha_mm(&self) -> f64 {
        let m = self.registers() as f64;
        alpha(self.0, m) * m * m
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self(DEFAULT_PRECISION)
    }
}

impl TryFrom<u8> for Precision {
    type Error = HyperLogLogError;

    fn try_from(log2m: u8) -> Result<Self, Self::Error> {
        Self::new(log2m)
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parameter for bias correction
#[inline]
fn alpha(log2m: u8, m: f64) -> f64 {
    match log2m {
        4 => 0.673,
        5 => 0.697,
        6 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / m),
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0 => Err(HyperLogLogError::InvalidPrecision(0)))]
    #[test_case(1 => Ok(1))]
    #[test_case(12 => Ok(12))]
    #[test_case(31 => Ok(31))]
    #[test_case(32 => Err(HyperLogLogError::InvalidPrecision(32)))]
    #[test_case(255 => Err(HyperLogLogError::InvalidPrecision(255)))]
    fn test_new(log2m: u8) -> Result<u8, HyperLogLogError> {
        Precision::new(log2m).map(|p| p.log2m())
    }

    #[test_case(0.5 => Ok(2))]
    #[test_case(0.1325 => Ok(6))]
    #[test_case(0.03 => Ok(10))]
    #[test_case(0.0163 => Ok(12))]
    fn test_from_rsd(rsd: f64) -> Result<u8, HyperLogLogError> {
        Precision::from_rsd(rsd).map(|p| p.log2m())
    }

    #[test_case(0.0; "zero")]
    #[test_case(1.0; "one")]
    #[test_case(-0.1; "negative")]
    #[test_case(1.5; "above one")]
    #[test_case(0.9; "maps to zero precision")]
    #[test_case(1e-6; "maps to precision above maximum")]
    #[test_case(f64::NAN; "nan")]
    #[test_case(f64::INFINITY; "infinity")]
    fn test_from_rsd_invalid(rsd: f64) {
        let err = Precision::from_rsd(rsd).unwrap_err();
        assert!(matches!(err, HyperLogLogError::InvalidRsd(_)));
        assert!(err.is_invalid_configuration());
    }

    #[test_case(4, 0.673)]
    #[test_case(5, 0.697)]
    #[test_case(6, 0.709)]
    #[test_case(10, 0.7213 / (1.0 + 1.079 / 1024.0))]
    #[test_case(12, 0.7213 / (1.0 + 1.079 / 4096.0))]
    fn test_alpha_mm(log2m: u8, alpha: f64) {
        let precision = Precision::new(log2m).unwrap();
        let m = precision.registers() as f64;
        assert!((precision.alpha_mm() - alpha * m * m).abs() < 1e-9 * m * m);
    }

    #[test_case(4 => 16)]
    #[test_case(10 => 1024)]
    #[test_case(16 => 65536)]
    fn test_registers(log2m: u8) -> usize {
        Precision::new(log2m).unwrap().registers()
    }

    #[test]
    fn test_rsd_round_trip() {
        let precision = Precision::new(10).unwrap();
        assert!((precision.rsd() - 0.0345625).abs() < 1e-12);
        // slightly tighter than the precision's own rsd still maps back to it
        assert_eq!(Precision::from_rsd(precision.rsd() * 0.99), Ok(precision));
        assert_eq!(
            Precision::from_rsd(precision.rsd() * 1.01).map(|p| p.log2m()),
            Ok(9)
        );
    }

    #[test]
    fn test_default_and_display() {
        assert_eq!(Precision::default().log2m(), DEFAULT_PRECISION);
        assert_eq!(Precision::default().to_string(), "12");
        assert_eq!(Precision::try_from(8u8).map(|p| p.registers()), Ok(256));
    }
}
