//! Fixed-point decimal type with 2 decimal places precision.
//!
//! Uses `rust_decimal` internally with scale enforcement so wallet amounts
//! never pick up floating-point drift between reads and writes.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// A decimal type that maintains exactly 2 decimal places of precision.
///
/// Rounding is half-to-even (banker's rounding), so `12.345` becomes `12.34`
/// while `12.355` becomes `12.36`.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use wallet_sync::Decimal2;
///
/// let amount = Decimal2::from_str("10.5").unwrap();
/// assert_eq!(amount.to_string(), "10.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct Decimal2(Decimal);

impl Decimal2 {
    /// The number of decimal places to maintain.
    pub const SCALE: u32 = 2;

    /// Zero value.
    pub const ZERO: Self = Decimal2(Decimal::ZERO);

    /// Largest representable amount.
    pub const MAX: Self = Decimal2(Decimal::MAX);

    /// Smallest meaningful amount (`0.01`), used as the regression tolerance.
    pub const EPSILON: Self = Decimal2(Decimal::from_parts(1, 0, 0, false, 2));

    /// Creates a new `Decimal2` from a `Decimal`, rounding to 2 decimal places.
    pub fn new(value: Decimal) -> Self {
        let mut normalized =
            value.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointNearestEven);
        normalized.rescale(Self::SCALE);
        Decimal2(normalized)
    }

    /// Converts a float, mapping NaN and infinities to zero.
    pub fn from_f64(value: f64) -> Self {
        if !value.is_finite() {
            return Self::ZERO;
        }
        Self::parse_lenient(&value.to_string())
    }

    /// Parses `s`, falling back to zero for anything that is not a number.
    pub fn parse_lenient(s: &str) -> Self {
        let trimmed = s.trim();
        Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map(Decimal2::new)
            .unwrap_or(Self::ZERO)
    }

    /// Reads an amount out of a JSON value.
    ///
    /// Numbers and numeric strings are accepted; anything else is zero.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Number(n) => Self::parse_lenient(&n.to_string()),
            Value::String(s) => Self::parse_lenient(s),
            _ => Self::ZERO,
        }
    }

    /// Returns this value, or zero if it is negative.
    pub fn non_negative(self) -> Self {
        if self.is_negative() {
            Self::ZERO
        } else {
            self
        }
    }

    /// Returns `true` if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns `true` if this value is below zero.
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Returns the underlying `Decimal`.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Decimal2 {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        let decimal = Decimal::from_str(trimmed)?;
        Ok(Decimal2::new(decimal))
    }
}

impl From<Decimal> for Decimal2 {
    fn from(value: Decimal) -> Self {
        Decimal2::new(value)
    }
}

impl fmt::Display for Decimal2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Decimal2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Decimal2::new(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Decimal2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Decimal2::new(self.0.saturating_sub(rhs.0))
    }
}

/// Serialized as a JSON number carrying the exact decimal digits.
impl Serialize for Decimal2 {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rust_decimal::serde::arbitrary_precision::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Decimal2 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Decimal2::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal2 {
        Decimal2::from_str(s).unwrap()
    }

    #[test]
    fn test_from_str_normalizes_scale() {
        assert_eq!(dec("1").to_string(), "1.00");
        assert_eq!(dec("1.5").to_string(), "1.50");
        assert_eq!(dec("  2.5  ").to_string(), "2.50");
    }

    #[test]
    fn test_rounds_half_to_even() {
        assert_eq!(dec("12.345").to_string(), "12.34");
        assert_eq!(dec("12.355").to_string(), "12.36");
        assert_eq!(dec("0.125").to_string(), "0.12");
        assert_eq!(dec("0.135").to_string(), "0.14");
        assert_eq!(dec("1.006").to_string(), "1.01");
    }

    #[test]
    fn test_arithmetic_preserves_scale() {
        let a = dec("1.5");
        let b = dec("2.25");

        assert_eq!((a + b).to_string(), "3.75");
        assert_eq!((b - a).to_string(), "0.75");
        assert_eq!((a - b).to_string(), "-0.75");
    }

    #[test]
    fn test_epsilon_is_one_cent() {
        assert_eq!(Decimal2::EPSILON, dec("0.01"));
        assert!(Decimal2::ZERO.is_zero());
    }

    #[test]
    fn test_from_f64_handles_non_finite() {
        assert_eq!(Decimal2::from_f64(f64::NAN), Decimal2::ZERO);
        assert_eq!(Decimal2::from_f64(f64::INFINITY), Decimal2::ZERO);
        assert_eq!(Decimal2::from_f64(12.345), dec("12.34"));
        assert_eq!(Decimal2::from_f64(-3.1), dec("-3.10"));
    }

    #[test]
    fn test_parse_lenient_falls_back_to_zero() {
        assert_eq!(Decimal2::parse_lenient("abc"), Decimal2::ZERO);
        assert_eq!(Decimal2::parse_lenient(""), Decimal2::ZERO);
        assert_eq!(Decimal2::parse_lenient(" 7.129 "), dec("7.13"));
        assert_eq!(Decimal2::parse_lenient("1e2"), dec("100"));
    }

    #[test]
    fn test_from_json_accepts_numbers_and_strings() {
        assert_eq!(Decimal2::from_json(&json!(4.5)), dec("4.5"));
        assert_eq!(Decimal2::from_json(&json!(3)), dec("3"));
        assert_eq!(Decimal2::from_json(&json!("8.25")), dec("8.25"));
        assert_eq!(Decimal2::from_json(&json!(null)), Decimal2::ZERO);
        assert_eq!(Decimal2::from_json(&json!([1, 2])), Decimal2::ZERO);
    }

    #[test]
    fn test_non_negative_clamps() {
        assert_eq!(dec("-0.01").non_negative(), Decimal2::ZERO);
        assert_eq!(dec("0.01").non_negative(), dec("0.01"));
        assert!(!Decimal2::ZERO.is_negative());
    }

    #[test]
    fn test_serializes_as_number() {
        assert_eq!(serde_json::to_string(&dec("5")).unwrap(), "5.00");
        assert_eq!(serde_json::to_string(&dec("12.34")).unwrap(), "12.34");
        assert_eq!(serde_json::to_string(&dec("-3.1")).unwrap(), "-3.10");
    }

    #[test]
    fn test_large_amounts_serialize_exactly() {
        for text in [
            "90071992547409.93",
            "9999999999999999999999999.99",
            "79228162514264337593543950335",
        ] {
            let amount = dec(text);
            let json = serde_json::to_string(&amount).unwrap();
            assert!(!json.contains('e'), "exponent form: {}", json);

            let back: Decimal2 = serde_json::from_str(&json).unwrap();
            assert_eq!(back, amount, "round trip of {}", text);
        }
    }

    #[test]
    fn test_arithmetic_saturates_at_bounds() {
        let min = dec("-79228162514264337593543950335");
        assert_eq!(min - Decimal2::MAX, min);
        assert_eq!(Decimal2::MAX - min, Decimal2::MAX);
        assert_eq!(Decimal2::MAX + Decimal2::EPSILON, Decimal2::MAX);
    }
}
