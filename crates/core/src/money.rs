use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("invalid money amount `{input}`")]
    InvalidAmount { input: String },
}

/// An exact GBP amount backed by `rust_decimal`. Never a binary float:
/// arithmetic and ordering operate on the decimal representation, and
/// values cross the persistence boundary as decimal strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Parses a decimal-string amount such as `"900"` or `"1234.56"`.
    pub fn parse(input: &str) -> Result<Self, MoneyError> {
        Decimal::from_str(input.trim())
            .map(Self)
            .map_err(|_| MoneyError::InvalidAmount { input: input.to_string() })
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn multiply_by(&self, factor: i64) -> Money {
        Money(self.0 * Decimal::from(factor))
    }

    /// Exact ratio of two amounts; `None` when the divisor is zero.
    pub fn checked_div(&self, divisor: Money) -> Option<Decimal> {
        self.0.checked_div(divisor.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Formats as a `£` display string with thousands separators. A pure
    /// projection for output; never used for comparison.
    pub fn to_display_string(&self, fraction_digits: u32) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(fraction_digits, RoundingStrategy::MidpointAwayFromZero);
        let raw = format!("{:.*}", fraction_digits as usize, rounded.abs());
        let (integral, fraction) = match raw.split_once('.') {
            Some((integral, fraction)) => (integral.to_string(), Some(fraction.to_string())),
            None => (raw, None),
        };

        let mut grouped = String::new();
        for (count, digit) in integral.chars().rev().enumerate() {
            if count > 0 && count % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }
        let grouped: String = grouped.chars().rev().collect();

        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        match fraction {
            Some(fraction) => format!("{sign}£{grouped}.{fraction}"),
            None => format!("{sign}£{grouped}"),
        }
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Money::parse(&raw).map_err(D::Error::custom)
    }
}
