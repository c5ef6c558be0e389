//! # Basis Points
//!
//! **NO FLOATING POINT IN PROBABILITY OR REWARD MATH**
//!
//! Every probability and share in a recipe is expressed in basis points:
//! `0` is 0%, `10000` is 100%. Values above `10000` cannot be constructed,
//! so a stored recipe never carries an out-of-range probability.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CraftingError, CraftingResult};

/// The denominator for basis points (100%).
pub const BASIS_POINTS_DENOMINATOR: u16 = 10_000;

/// A probability or share in basis points (0-10000).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
#[repr(transparent)]
pub struct BasisPoints(u16);

impl BasisPoints {
    /// 0% - never.
    pub const ZERO: Self = Self(0);

    /// 100% - always.
    pub const MAX: Self = Self(BASIS_POINTS_DENOMINATOR);

    /// Creates a value, rejecting anything above 10000.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBasisPoints` if `value > 10000`.
    #[inline]
    pub const fn new(value: u16) -> CraftingResult<Self> {
        if value > BASIS_POINTS_DENOMINATOR {
            Err(CraftingError::InvalidBasisPoints(value as u32))
        } else {
            Ok(Self(value))
        }
    }

    /// Creates a value, clamping anything above 10000 to 10000.
    #[inline]
    #[must_use]
    pub const fn saturating(value: u16) -> Self {
        if value > BASIS_POINTS_DENOMINATOR {
            Self::MAX
        } else {
            Self(value)
        }
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// Returns true for 0%.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns true for 100%.
    #[inline]
    #[must_use]
    pub const fn is_certain(self) -> bool {
        self.0 == BASIS_POINTS_DENOMINATOR
    }

    /// Returns true when the outcome actually depends on randomness,
    /// i.e. strictly between 0% and 100%.
    #[inline]
    #[must_use]
    pub const fn is_uncertain(self) -> bool {
        self.0 > 0 && self.0 < BASIS_POINTS_DENOMINATOR
    }

    /// Applies this share to `value`, rounding down.
    ///
    /// # Errors
    ///
    /// Returns `ArithmeticOverflow` if the intermediate product overflows.
    #[inline]
    pub fn apply_floor(self, value: u64) -> CraftingResult<u64> {
        value
            .checked_mul(u64::from(self.0))
            .map(|v| v / u64::from(BASIS_POINTS_DENOMINATOR))
            .ok_or(CraftingError::ArithmeticOverflow)
    }
}

impl TryFrom<u16> for BasisPoints {
    type Error = CraftingError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BasisPoints> for u16 {
    fn from(bp: BasisPoints) -> Self {
        bp.0
    }
}

impl fmt::Debug for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasisPoints({})", self.0)
    }
}

impl fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_is_enforced() {
        assert!(BasisPoints::new(0).is_ok());
        assert!(BasisPoints::new(10_000).is_ok());
        assert_eq!(
            BasisPoints::new(10_001),
            Err(CraftingError::InvalidBasisPoints(10_001))
        );
        assert_eq!(BasisPoints::saturating(u16::MAX), BasisPoints::MAX);
    }

    #[test]
    fn test_uncertainty_excludes_extremes() {
        assert!(!BasisPoints::ZERO.is_uncertain());
        assert!(!BasisPoints::MAX.is_uncertain());
        assert!(BasisPoints::saturating(1).is_uncertain());
        assert!(BasisPoints::saturating(9_999).is_uncertain());
    }

    #[test]
    fn test_apply_floor() {
        let quarter = BasisPoints::saturating(2_500);
        assert_eq!(quarter.apply_floor(10).unwrap(), 2); // 2.5 rounds down
        assert_eq!(BasisPoints::MAX.apply_floor(77).unwrap(), 77);
        assert_eq!(BasisPoints::ZERO.apply_floor(77).unwrap(), 0);
        assert_eq!(
            BasisPoints::MAX.apply_floor(u64::MAX),
            Err(CraftingError::ArithmeticOverflow)
        );
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        #[derive(Deserialize)]
        struct Wrapper {
            p: BasisPoints,
        }

        let ok: Wrapper = toml::from_str("p = 5000").unwrap();
        assert_eq!(ok.p.get(), 5000);

        let bad: Result<Wrapper, _> = toml::from_str("p = 20000");
        assert!(bad.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(BasisPoints::saturating(1_234).to_string(), "12.34%");
    }
}
