use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------       Money         ---------------------------------------------------------
/// A monetary amount in minor currency units (cents).
///
/// Reconciliation arithmetic stays in integers; conversion to and from decimal strings happens only at the
/// boundary via [`Display`] and [`FromStr`].
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in minor currency units: {0}")]
pub struct MoneyConversionError(String);

#[derive(Debug, Clone, Error)]
#[error("Invalid money amount: {0}")]
pub struct MoneyParseError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = MoneyParseError;

    /// Parses a decimal amount with at most two fractional digits, e.g. `120`, `120.5`, `-0.01`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1i64, rest),
            None => (1i64, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if (whole.is_empty() && frac.is_empty()) || digits.contains('-') {
            return Err(MoneyParseError(s.to_string()));
        }
        if frac.len() > 2 {
            return Err(MoneyParseError(format!("{s} has more precision than minor units can hold")));
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| MoneyParseError(s.to_string()))?
        };
        let frac: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<2}");
            padded.parse().map_err(|_| MoneyParseError(s.to_string()))?
        };
        Ok(Self(sign * (whole * 100 + frac)))
    }
}

impl Money {
    pub const fn value(&self) -> i64 {
        self.0
    }

    /// An amount given in whole currency units.
    pub const fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    /// An amount given directly in minor units.
    pub const fn from_minor(cents: i64) -> Self {
        Self(cents)
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_renders_minor_units_as_decimals() {
        assert_eq!(Money::from_minor(12_345).to_string(), "123.45");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-1).to_string(), "-0.01");
        assert_eq!(Money::from_major(300).to_string(), "300.00");
    }

    #[test]
    fn parses_decimal_strings() {
        assert_eq!("123.45".parse::<Money>().unwrap(), Money::from_minor(12_345));
        assert_eq!("120".parse::<Money>().unwrap(), Money::from_major(120));
        assert_eq!("120.5".parse::<Money>().unwrap(), Money::from_minor(12_050));
        assert_eq!("-0.01".parse::<Money>().unwrap(), Money::from_minor(-1));
        assert_eq!(".5".parse::<Money>().unwrap(), Money::from_minor(50));
    }

    #[test]
    fn rejects_unrepresentable_strings() {
        assert!("12.345".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("-".parse::<Money>().is_err());
        assert!("--5".parse::<Money>().is_err());
        assert!("12a".parse::<Money>().is_err());
    }

    #[test]
    fn sums_and_subtracts() {
        let total: Money = [Money::from_major(200), Money::from_major(100)].into_iter().sum();
        assert_eq!(total, Money::from_major(300));
        assert_eq!((Money::from_major(1) - Money::from_minor(101)).abs(), Money::from_minor(1));
    }
}
