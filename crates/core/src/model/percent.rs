use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PercentError {
    #[error("percentage must be between 0 and 100, got {0}")]
    OutOfRange(f64),

    #[error("percentage must be a finite number")]
    NotFinite,
}

/// A percentage in `[0, 100]`.
///
/// Out-of-range input is rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percent(f64);

impl Percent {
    pub const ZERO: Percent = Percent(0.0);
    pub const FULL: Percent = Percent(100.0);

    /// For compile-time constants already known to be in range.
    pub(crate) const fn new_unchecked(value: f64) -> Self {
        Self(value)
    }

    /// # Errors
    ///
    /// Returns `PercentError` for NaN, infinities and values outside `[0, 100]`.
    pub fn new(value: f64) -> Result<Self, PercentError> {
        if !value.is_finite() {
            return Err(PercentError::NotFinite);
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(PercentError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// `100 * part / whole`, or zero when `whole` is zero.
    #[must_use]
    pub fn ratio(part: u32, whole: u32) -> Self {
        if whole == 0 {
            return Self::ZERO;
        }
        let value = 100.0 * f64::from(part.min(whole)) / f64::from(whole);
        Self(value)
    }

    /// Arithmetic mean of the given values, zero for an empty input.
    #[must_use]
    pub fn mean<I: IntoIterator<Item = Percent>>(values: I) -> Self {
        let (sum, count) = values
            .into_iter()
            .fold((0.0_f64, 0_u32), |(sum, n), p| (sum + p.0, n + 1));
        if count == 0 {
            return Self::ZERO;
        }
        Self((sum / f64::from(count)).clamp(0.0, 100.0))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 >= 100.0
    }
}

impl TryFrom<f64> for Percent {
    type Error = PercentError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percent> for f64 {
    fn from(p: Percent) -> Self {
        p.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_values_outside_range() {
        assert_eq!(Percent::new(150.0), Err(PercentError::OutOfRange(150.0)));
        assert_eq!(Percent::new(-0.5), Err(PercentError::OutOfRange(-0.5)));
        assert_eq!(Percent::new(f64::NAN), Err(PercentError::NotFinite));
        assert!(Percent::new(100.0).unwrap().is_complete());
    }

    #[test]
    fn ratio_of_zero_whole_is_zero() {
        assert_eq!(Percent::ratio(0, 0), Percent::ZERO);
        let two_thirds = Percent::ratio(2, 3).value();
        assert!((two_thirds - 66.666_666).abs() < 1e-3);
    }

    #[test]
    fn mean_of_nothing_is_zero() {
        assert_eq!(Percent::mean(Vec::new()), Percent::ZERO);
        let m = Percent::mean([Percent::FULL, Percent::new(50.0).unwrap()]);
        assert_eq!(m.value(), 75.0);
    }

    #[test]
    fn deserializing_out_of_range_fails() {
        assert!(serde_json::from_str::<Percent>("101").is_err());
        let p: Percent = serde_json::from_str("42.5").unwrap();
        assert_eq!(p.value(), 42.5);
    }
}
