//! # Money Types
//!
//! Prices are stored in the smallest currency unit (cents for CAD) so
//! totals never accumulate floating-point drift. Floats appear only at
//! system boundaries (tier config, display) and are converted on entry.

use serde::{Deserialize, Serialize};

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    CAD,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Returns the lowercase ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::CAD => "cad",
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
        }
    }

    /// Parse a currency code, case-insensitive
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "cad" => Some(Currency::CAD),
            "usd" => Some(Currency::USD),
            "eur" => Some(Currency::EUR),
            "gbp" => Some(Currency::GBP),
            _ => None,
        }
    }

    /// Number of decimal places for this currency
    pub fn decimal_places(&self) -> u8 {
        2
    }

    /// Convert a decimal amount to the smallest currency unit
    pub fn to_smallest_unit(&self, amount: f64) -> i64 {
        let multiplier = 10_f64.powi(self.decimal_places() as i32);
        (amount * multiplier).round() as i64
    }

    /// Convert from smallest unit back to decimal
    pub fn from_smallest_unit(&self, amount: i64) -> f64 {
        let divisor = 10_f64.powi(self.decimal_places() as i32);
        amount as f64 / divisor
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::CAD
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Price with amount in smallest currency unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in smallest currency unit (cents for CAD)
    pub amount: i64,
    /// Currency
    pub currency: Currency,
}

impl Price {
    /// Create a new price from a decimal amount
    pub fn new(amount: f64, currency: Currency) -> Self {
        Self {
            amount: currency.to_smallest_unit(amount),
            currency,
        }
    }

    /// Create a price from the smallest unit (cents)
    pub fn from_cents(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// A zero amount in the given currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: 0,
            currency,
        }
    }

    /// Get the decimal amount
    pub fn as_decimal(&self) -> f64 {
        self.currency.from_smallest_unit(self.amount)
    }

    /// Whether the amount is exactly zero
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Format for display (e.g., "C$10.00")
    pub fn display(&self) -> String {
        let symbol = match self.currency {
            Currency::CAD => "C$",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
        };
        format!("{}{:.2}", symbol, self.as_decimal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_conversion() {
        let cad = Currency::CAD;
        assert_eq!(cad.to_smallest_unit(10.99), 1099);
        assert_eq!(cad.from_smallest_unit(1099), 10.99);
        assert_eq!(cad.to_smallest_unit(58.0), 5800);
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("CAD"), Some(Currency::CAD));
        assert_eq!(Currency::parse("usd"), Some(Currency::USD));
        assert_eq!(Currency::parse("xyz"), None);
    }

    #[test]
    fn test_price_display() {
        let price = Price::new(29.99, Currency::CAD);
        assert_eq!(price.display(), "C$29.99");

        let price_gbp = Price::new(19.99, Currency::GBP);
        assert_eq!(price_gbp.display(), "£19.99");
    }

    #[test]
    fn test_zero() {
        let zero = Price::zero(Currency::CAD);
        assert!(zero.is_zero());
        assert_eq!(zero.amount, 0);
    }
}
