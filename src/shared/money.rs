//! Decimal money amounts.
//!
//! Amounts are stored as `NUMERIC(19,4)` and carried as `rust_decimal::Decimal`.
//! On the way in every amount is rounded to two places with banker's rounding;
//! on the wire amounts are JSON strings (`"10.50"`) so no float ever touches
//! a balance.

use std::fmt;
use std::ops::{Add, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::{
    Decode, Encode, Postgres, Type,
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
};

/// Decimal places kept for every amount.
pub const SCALE: u32 = 2;

/// Always holds exactly two decimal places, whatever the source scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Round `amount` to two places (banker's rounding).
    pub fn new(amount: Decimal) -> Self {
        let mut rounded = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointNearestEven);
        rounded.rescale(SCALE);
        Self(rounded)
    }

    /// Build an amount from an integer count of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, SCALE))
    }

    pub const fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(Self::new)
    }
}

// `NUMERIC(19,4)` columns come back with four places; decoding rescales them.
impl Type<Postgres> for Money {
    fn type_info() -> PgTypeInfo {
        <Decimal as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <Decimal as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Money {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        <Decimal as Decode<'r, Postgres>>::decode(value).map(Self::new)
    }
}

impl<'q> Encode<'q, Postgres> for Money {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <Decimal as Encode<'q, Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(dec!(10.125), dec!(10.12))]
    #[case(dec!(10.135), dec!(10.14))]
    #[case(dec!(10.1), dec!(10.10))]
    #[case(dec!(-3.005), dec!(-3.00))]
    fn new_rounds_half_to_even(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(Money::new(input).amount(), expected);
    }

    #[rstest]
    fn serializes_as_string() {
        let json = serde_json::to_string(&Money::from_cents(1050)).unwrap();
        assert_eq!(json, "\"10.50\"");
    }

    #[rstest]
    #[case("\"12.345\"", dec!(12.34))]
    #[case("12.5", dec!(12.50))]
    fn deserializing_rounds(#[case] json: &str, #[case] expected: Decimal) {
        let money: Money = serde_json::from_str(json).unwrap();
        assert_eq!(money.amount(), expected);
    }

    #[rstest]
    #[case(dec!(1250.5000), "\"1250.50\"")]
    #[case(dec!(10.1), "\"10.10\"")]
    #[case(dec!(7), "\"7.00\"")]
    fn serializes_with_two_places_whatever_the_source_scale(
        #[case] amount: Decimal,
        #[case] expected: &str,
    ) {
        assert_eq!(serde_json::to_string(&Money::new(amount)).unwrap(), expected);
    }

    #[rstest]
    fn sign_checks_treat_zero_as_neither() {
        assert!(!Money::ZERO.is_positive());
        assert!(!Money::ZERO.is_negative());
        assert!(Money::from_cents(1).is_positive());
        assert!(Money::from_cents(-1).is_negative());
    }

    #[rstest]
    fn arithmetic_and_display() {
        let total = Money::from_cents(1999) + Money::from_cents(1);
        assert_eq!(total.to_string(), "20.00");
        assert_eq!((total - Money::from_cents(2500)).to_string(), "-5.00");
    }
}
