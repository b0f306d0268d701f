//! Fixed-point money amounts.
//!
//! Amounts are exposed as [Decimal] values with two decimal places and stored as integer minor
//! units (cents) so that sums in SQL are exact.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;

/// The number of decimal places kept for every amount and balance.
pub const DECIMAL_PLACES: u32 = 2;

/// The maximum number of digits allowed before the decimal point.
pub const MAX_INTEGER_DIGITS: u32 = 12;

/// The largest balance or amount that can be stored, 999 999 999 999.99, in minor units.
pub const MAX_MINOR_UNITS: i64 = 99_999_999_999_999;

/// Why a value could not be turned into an [Amount].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The value is not a decimal number.
    #[error("A valid number is required.")]
    NotANumber,

    /// The value is zero or negative.
    #[error("Ensure this value is greater than or equal to 0.01.")]
    NotPositive,

    /// The value has more than [DECIMAL_PLACES] significant decimal places.
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimalPlaces,

    /// The value has more than [MAX_INTEGER_DIGITS] digits before the decimal point.
    #[error("Ensure that there are no more than 12 digits before the decimal point.")]
    TooManyDigits,
}

/// A strictly positive amount of money with at most two decimal places.
///
/// The only way to get an `Amount` is through validation, so holding one means the value is
/// safe to deposit or withdraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    /// Validate `value` as an amount.
    ///
    /// Trailing zeros are ignored, so `10.500` is accepted as `10.50`.
    ///
    /// # Errors
    /// Returns an [AmountError] describing the first rule `value` breaks.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NotPositive);
        }

        let mut normalized = value.normalize();
        if normalized.scale() > DECIMAL_PLACES {
            return Err(AmountError::TooManyDecimalPlaces);
        }

        if normalized.trunc() >= Decimal::from(10_i64.pow(MAX_INTEGER_DIGITS)) {
            return Err(AmountError::TooManyDigits);
        }

        normalized.rescale(DECIMAL_PLACES);
        let minor_units =
            i64::try_from(normalized.mantissa()).map_err(|_| AmountError::TooManyDigits)?;

        Ok(Self(minor_units))
    }

    /// Parse and validate a decimal string such as `"20.50"` or `"2.05e1"`.
    ///
    /// # Errors
    /// Returns [AmountError::NotANumber] if `text` is not a decimal number, otherwise the
    /// same errors as [Amount::new].
    pub fn parse(text: &str) -> Result<Self, AmountError> {
        let text = text.trim();
        let value = Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map_err(|_| AmountError::NotANumber)?;

        Self::new(value)
    }

    /// Create an amount from a count of minor units (cents).
    ///
    /// Returns `None` for zero, negative or out of range values.
    pub fn from_minor_units(minor_units: i64) -> Option<Self> {
        (1..=MAX_MINOR_UNITS)
            .contains(&minor_units)
            .then_some(Self(minor_units))
    }

    /// The amount in minor units (cents).
    pub fn minor_units(&self) -> i64 {
        self.0
    }

    /// The amount as a decimal with two decimal places.
    pub fn to_decimal(&self) -> Decimal {
        to_decimal(self.0)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_decimal().fmt(f)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Convert a count of minor units into a decimal with two decimal places.
pub fn to_decimal(minor_units: i64) -> Decimal {
    Decimal::new(minor_units, DECIMAL_PLACES)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::money::{Amount, AmountError, MAX_MINOR_UNITS, to_decimal};

    #[test]
    fn parses_two_decimal_places() {
        let amount = Amount::parse("50.25").unwrap();

        assert_eq!(amount.minor_units(), 5025);
        assert_eq!(amount.to_decimal(), dec!(50.25));
        assert_eq!(amount.to_string(), "50.25");
    }

    #[test]
    fn parses_whole_numbers() {
        assert_eq!(Amount::parse("20").unwrap().minor_units(), 2000);
    }

    #[test]
    fn ignores_trailing_zeros() {
        assert_eq!(Amount::parse("10.500").unwrap().minor_units(), 1050);
    }

    #[test]
    fn accepts_smallest_amount() {
        assert_eq!(Amount::parse("0.01").unwrap().minor_units(), 1);
    }

    #[test]
    fn rejects_zero_and_negative() {
        assert_eq!(Amount::parse("0"), Err(AmountError::NotPositive));
        assert_eq!(Amount::parse("0.00"), Err(AmountError::NotPositive));
        assert_eq!(Amount::parse("-5.00"), Err(AmountError::NotPositive));
    }

    #[test]
    fn rejects_too_many_decimal_places() {
        assert_eq!(
            Amount::parse("1.005"),
            Err(AmountError::TooManyDecimalPlaces)
        );
        assert_eq!(
            Amount::parse("0.001"),
            Err(AmountError::TooManyDecimalPlaces)
        );
    }

    #[test]
    fn rejects_too_many_integer_digits() {
        assert_eq!(
            Amount::parse("1000000000000"),
            Err(AmountError::TooManyDigits)
        );
        assert_eq!(
            Amount::parse("999999999999.99").unwrap().minor_units(),
            MAX_MINOR_UNITS
        );
    }

    #[test]
    fn parses_exponent_notation() {
        assert_eq!(Amount::parse("1e2").unwrap().minor_units(), 10_000);
        assert_eq!(Amount::parse("2.05E1").unwrap().minor_units(), 2050);
        assert_eq!(
            Amount::parse("1e-3"),
            Err(AmountError::TooManyDecimalPlaces)
        );
        assert_eq!(Amount::parse("1e16"), Err(AmountError::TooManyDigits));
    }

    #[test]
    fn rejects_non_numeric_text() {
        assert_eq!(Amount::parse("ten"), Err(AmountError::NotANumber));
        assert_eq!(Amount::parse(""), Err(AmountError::NotANumber));
        assert_eq!(Amount::parse("12,50"), Err(AmountError::NotANumber));
    }

    #[test]
    fn minor_units_must_be_in_range() {
        assert_eq!(Amount::from_minor_units(0), None);
        assert_eq!(Amount::from_minor_units(-1), None);
        assert_eq!(Amount::from_minor_units(MAX_MINOR_UNITS + 1), None);
        assert!(Amount::from_minor_units(1).is_some());
    }

    #[test]
    fn converts_minor_units_to_decimal() {
        assert_eq!(to_decimal(3000).to_string(), "30.00");
        assert_eq!(to_decimal(0), Decimal::ZERO);
    }
}
