//! Fixed-point currency amounts.
//!
//! All balances and amounts in the ledger are `Money`: a non-negative decimal
//! with exactly two fractional digits. Values are never converted to binary
//! floating point. Arithmetic is checked and a subtraction that would go below
//! zero yields `None`, so a negative balance cannot be represented.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::{
    Postgres,
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
};

use crate::error::AppError;

/// Number of fractional digits carried by every amount.
pub const SCALE: u32 = 2;

/// Whole units an amount must stay below to fit `NUMERIC(14,2)`.
const UPPER_BOUND_UNITS: i64 = 1_000_000_000_000;

/// Non-negative currency amount with two decimal places.
///
/// Stored in `NUMERIC(14,2)` columns and serialized as a decimal string
/// (`"1450.00"`) so clients never see a float. Values read back from the
/// database go through the same validation as values parsed from requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::from_parts(0, 0, 0, false, SCALE));

    /// Build an amount from whole currency units (e.g. rupees).
    pub fn from_major(units: u32) -> Self {
        let mut value = Decimal::from(units);
        value.rescale(SCALE);
        Money(value)
    }

    /// Build an amount from minor units (e.g. paise).
    pub fn from_minor(minor: i64) -> Result<Self, AppError> {
        Money::try_from(Decimal::new(minor, SCALE))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Minor units as sent to the payment gateway (`12.34` -> `1234`).
    pub fn to_minor(&self) -> Result<i64, AppError> {
        i64::try_from(self.0.mantissa())
            .map_err(|_| AppError::InvalidAmount(format!("Amount {self} is too large")))
    }

    /// Add, returning `None` if the sum no longer fits a stored amount.
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0
            .checked_add(other.0)
            .and_then(|sum| Money::try_from(sum).ok())
    }

    /// Subtract, returning `None` if the result would be negative.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        if other.0 > self.0 {
            return None;
        }
        self.0.checked_sub(other.0).map(Money)
    }

    /// Fails with `InvalidAmount` unless the amount is strictly positive.
    pub fn ensure_positive(self) -> Result<Money, AppError> {
        if self.is_zero() {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }
        Ok(self)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = AppError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AppError::InvalidAmount(
                "Amount cannot be negative".to_string(),
            ));
        }
        if value.normalize().scale() > SCALE {
            return Err(AppError::InvalidAmount(format!(
                "Amount {} has more than {} decimal places",
                value, SCALE
            )));
        }
        if value >= Decimal::from(UPPER_BOUND_UNITS) {
            return Err(AppError::InvalidAmount(format!(
                "Amount {value} exceeds the largest supported amount"
            )));
        }
        let mut value = value.abs();
        value.rescale(SCALE);
        Ok(Money(value))
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl FromStr for Money {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim())
            .map_err(|_| AppError::InvalidAmount(format!("Malformed amount: {s}")))?;
        Money::try_from(value)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl sqlx::Type<Postgres> for Money {
    fn type_info() -> PgTypeInfo {
        <Decimal as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'q> sqlx::Encode<'q, Postgres> for Money {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <Decimal as sqlx::Encode<'q, Postgres>>::encode_by_ref(&self.0, buf)
    }
}

// NUMERIC comes back with the column's scale, but an aggregate or a bare
// literal may not carry it, so decoding rescales like any other input.
impl<'r> sqlx::Decode<'r, Postgres> for Money {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let decimal = <Decimal as sqlx::Decode<'r, Postgres>>::decode(value)?;
        Ok(Money::try_from(decimal)?)
    }
}
