//! Fixed-point money, tax factors and rebates.
//!
//! Amounts are stored as integers: [`Money`] counts 1/100 cent (four decimal places),
//! [`TaxRate`] counts 1/10000 of a factor and [`Rebate`] counts 1/100 of a percent.
//! Arithmetic that needs fractions goes through [`rust_decimal::Decimal`] and is
//! rounded exactly once, half-up, when converted back with [`Money::from_decimal`].

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::Neg,
    str::FromStr,
};

/// Decimal places of [`Money`].
pub const MONEY_SCALE: u32 = 4;
/// Decimal places of [`TaxRate`].
pub const TAX_SCALE: u32 = 4;
/// Decimal places of [`Rebate`] (in percent).
pub const REBATE_SCALE: u32 = 2;

/// A monetary amount in 1/100 cent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Money(i64);

impl Money {
    /// Nothing.
    pub const ZERO: Self = Self(0);
    /// One cent.
    pub const CENT: Self = Self(100);

    /// Wraps a raw count of 1/100 cent.
    #[must_use]
    pub const fn from_minor(units: i64) -> Self {
        Self(units)
    }

    /// Raw count of 1/100 cent, as stored in the database.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Exact decimal value in currency units.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, MONEY_SCALE)
    }

    /// Converts a decimal currency value, rounding half-up to 1/100 cent.
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        value
            .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::new(10_i64.pow(MONEY_SCALE), 0))
            .and_then(|scaled| scaled.to_i64())
            .map(Self)
            .ok_or_else(|| Error::InvalidMoney {
                input: value.to_string(),
            })
    }

    /// Rounds half-up to whole cents.
    #[must_use]
    pub fn round_to_cents(self) -> Self {
        let cents = self
            .to_decimal()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        // Rounding to fewer places can't leave the i64 range we started in.
        Self::from_decimal(cents).unwrap_or(self)
    }

    /// Absolute value, saturating at the largest amount.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.saturating_abs())
    }

    fn overflow(self, op: &str, rhs: impl fmt::Display) -> Error {
        Error::InvalidMoney {
            input: format!("{} {op} {rhs}", self.to_decimal()),
        }
    }

    /// Sum of two amounts.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMoney`] if the result doesn't fit.
    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or_else(|| self.overflow("+", rhs.to_decimal()))
    }

    /// Difference of two amounts.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMoney`] if the result doesn't fit.
    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or_else(|| self.overflow("-", rhs.to_decimal()))
    }

    /// Unit price times quantity.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMoney`] if the result doesn't fit.
    pub fn checked_mul(self, units: i64) -> Result<Self> {
        self.0
            .checked_mul(units)
            .map(Self)
            .ok_or_else(|| self.overflow("×", units))
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Parses a loosely formatted amount the way bank statements present them:
    /// everything except digits and the decimal point is dropped, so `"€ 1,234.50"`
    /// becomes `1234.50`. The sign is dropped too; callers decide it.
    pub fn parse_lenient(input: &str) -> Result<Self> {
        let cleaned: String = input
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        cleaned.parse().map_err(|_| Error::InvalidMoney {
            input: input.to_string(),
        })
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = Decimal::from_str(s.trim()).map_err(|_| Error::InvalidMoney {
            input: s.to_string(),
        })?;
        Self::from_decimal(value)
    }
}

impl TryFrom<String> for Money {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Money> for String {
    fn from(value: Money) -> Self {
        value.to_decimal().normalize().to_string()
    }
}

/// Renders whole cents, e.g. `12.35`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.round_to_cents().to_decimal())
    }
}

/// Negation saturates, so `i64::MIN` becomes `i64::MAX` instead of overflowing.
impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }
}

/// A tax rate expressed as a multiplicative factor on the net price (1.19 for 19 %).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaxRate(i64);

impl TaxRate {
    /// No tax at all (factor 1).
    pub const NONE: Self = Self(10_000);

    /// Wraps a raw factor in 1/10000.
    #[must_use]
    pub const fn from_scaled(scaled: i64) -> Self {
        Self(scaled)
    }

    /// Raw factor in 1/10000, as stored in the database.
    #[must_use]
    pub const fn scaled(self) -> i64 {
        self.0
    }

    /// Factor as a decimal.
    #[must_use]
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, TAX_SCALE)
    }

    /// A factor of zero (or below) would make net/gross conversion meaningless.
    pub fn validate(self) -> Result<Self> {
        if self.0 > 0 {
            Ok(self)
        } else {
            Err(Error::InvalidTax {
                tax: self.to_string(),
            })
        }
    }
}

impl FromStr for TaxRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidTax { tax: s.to_string() };
        let value = Decimal::from_str(s.trim()).map_err(|_| invalid())?;
        let scaled = value
            .checked_mul(Decimal::new(10_i64.pow(TAX_SCALE), 0))
            .ok_or_else(invalid)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(invalid)?;
        if scaled <= 0 {
            return Err(invalid());
        }
        Ok(Self(scaled))
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal().normalize())
    }
}

/// A rebate on a whole purchase, in percent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rebate(i64);

impl Rebate {
    /// No rebate.
    pub const NONE: Self = Self(0);

    /// Wraps a raw percentage in 1/100 percent.
    #[must_use]
    pub const fn from_scaled(scaled: i64) -> Self {
        Self(scaled)
    }

    /// Raw percentage in 1/100 percent, as stored in the database.
    #[must_use]
    pub const fn scaled(self) -> i64 {
        self.0
    }

    /// Percentage as a decimal (e.g. `12.5`).
    #[must_use]
    pub fn percent(self) -> Decimal {
        Decimal::new(self.0, REBATE_SCALE)
    }

    /// Share of the price that is actually paid: `(100 - rebate) / 100`.
    #[must_use]
    pub fn kept_share(self) -> Decimal {
        (Decimal::ONE_HUNDRED - self.percent()) / Decimal::ONE_HUNDRED
    }

    /// Rebates outside 0–100 % are rejected.
    pub fn validate(self) -> Result<Self> {
        if (0..=100 * 10_i64.pow(REBATE_SCALE)).contains(&self.0) {
            Ok(self)
        } else {
            Err(Error::InvalidRebate {
                rebate: self.percent().normalize().to_string(),
            })
        }
    }
}

impl FromStr for Rebate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidRebate {
            rebate: s.to_string(),
        };
        let value = Decimal::from_str(s.trim()).map_err(|_| invalid())?;
        let scaled = value
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or_else(invalid)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(invalid)?;
        Self(scaled).validate()
    }
}

impl fmt::Display for Rebate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.percent().normalize())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_parsing_and_display() {
        let price: Money = "13.37".parse().unwrap();
        assert_eq!(price.minor(), 133_700);
        assert_eq!(price.to_string(), "13.37");

        let tiny = Money::from_minor(3570);
        assert_eq!(tiny.to_decimal(), dec!(0.3570));
        assert_eq!(tiny.to_string(), "0.36");

        assert!("twelve".parse::<Money>().is_err());
    }

    #[test]
    fn test_money_rounds_half_up() {
        assert_eq!(Money::from_decimal(dec!(0.00005)).unwrap(), Money::from_minor(1));
        assert_eq!(Money::from_decimal(dec!(0.00004)).unwrap(), Money::ZERO);
        assert_eq!(Money::from_decimal(dec!(-0.00005)).unwrap(), Money::from_minor(-1));
        assert_eq!(Money::from_minor(150).round_to_cents(), Money::from_minor(200));
        assert_eq!(Money::from_minor(149).round_to_cents(), Money::from_minor(100));
    }

    #[test]
    fn test_money_lenient_parsing_strips_decoration() {
        assert_eq!(
            Money::parse_lenient("€ 1,234.50").unwrap(),
            Money::from_minor(12_345_000)
        );
        assert_eq!(Money::parse_lenient("-42").unwrap(), Money::from_minor(420_000));
        assert!(Money::parse_lenient("n/a").is_err());
    }

    #[test]
    fn test_money_arithmetic() {
        let unit = Money::from_minor(250);
        assert_eq!(unit.checked_mul(4).unwrap(), Money::from_minor(1000));
        assert_eq!(
            -unit.checked_add(unit).unwrap(),
            Money::from_minor(-500)
        );
        assert!(Money::ZERO.checked_sub(unit).unwrap().is_negative());
        assert_eq!(Money::from_minor(-7).abs(), Money::from_minor(7));
    }

    #[test]
    fn test_money_arithmetic_reports_overflow() {
        let price = Money::from_decimal(dec!(1)).unwrap();
        assert!(matches!(
            price.checked_mul(i64::MAX / 2),
            Err(Error::InvalidMoney { .. })
        ));
        assert!(matches!(
            Money::from_minor(i64::MAX).checked_add(Money::CENT),
            Err(Error::InvalidMoney { .. })
        ));
        assert!(matches!(
            Money::from_minor(i64::MIN).checked_sub(Money::CENT),
            Err(Error::InvalidMoney { .. })
        ));
        assert_eq!(-Money::from_minor(i64::MIN), Money::from_minor(i64::MAX));
        assert_eq!(Money::from_minor(i64::MIN).abs(), Money::from_minor(i64::MAX));
    }

    #[test]
    fn test_money_serde_uses_decimal_strings() {
        #[derive(Deserialize)]
        struct Priced {
            price: Money,
        }
        let priced: Priced = toml::from_str(r#"price = "2.50""#).unwrap();
        assert_eq!(priced.price, Money::from_minor(25_000));
        assert_eq!(String::from(priced.price), "2.5");
    }

    #[test]
    fn test_tax_rate() {
        let tax: TaxRate = "1.19".parse().unwrap();
        assert_eq!(tax.scaled(), 11_900);
        assert_eq!(tax.to_decimal(), dec!(1.19));
        assert_eq!(tax.to_string(), "1.19");
        assert!("0".parse::<TaxRate>().is_err());
        assert!(TaxRate::from_scaled(0).validate().is_err());
        assert!(TaxRate::NONE.validate().is_ok());
        assert!(matches!(
            "79228162514264337593543950335".parse::<TaxRate>(),
            Err(Error::InvalidTax { .. })
        ));
    }

    #[test]
    fn test_rebate() {
        let rebate: Rebate = "12.5".parse().unwrap();
        assert_eq!(rebate.scaled(), 1250);
        assert_eq!(rebate.kept_share(), dec!(0.875));
        assert_eq!(Rebate::NONE.kept_share(), Decimal::ONE);
        assert!("101".parse::<Rebate>().is_err());
        assert!("-1".parse::<Rebate>().is_err());
        assert!(matches!(
            "79228162514264337593543950335".parse::<Rebate>(),
            Err(Error::InvalidRebate { .. })
        ));
    }
}
