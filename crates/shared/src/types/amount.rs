//! Decimal amount parsing.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! User input often arrives as comma-formatted text ("1,234.50"); thousands
//! separators are stripped before the value is parsed as a `Decimal`.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing an amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The input was empty after trimming.
    #[error("amount is required")]
    Empty,

    /// The input is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
}

/// Parses a user-entered amount, stripping thousands separators and
/// surrounding whitespace. No rounding is applied.
///
/// # Errors
///
/// Returns [`AmountError`] when the text is empty or not a decimal.
pub fn parse_amount(input: &str) -> Result<Decimal, AmountError> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(AmountError::Empty);
    }

    Decimal::from_str(&cleaned).map_err(|_| AmountError::Invalid(input.to_string()))
}

/// Amount as it arrives over the wire: either a JSON number or a string.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    /// Textual amount, possibly comma-formatted.
    Text(String),
    /// Numeric amount.
    Number(serde_json::Number),
}

impl AmountInput {
    /// Normalizes the input into a `Decimal`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError`] when the value is not a decimal.
    pub fn to_decimal(&self) -> Result<Decimal, AmountError> {
        match self {
            Self::Text(text) => parse_amount(text),
            Self::Number(number) => parse_amount(&number.to_string()),
        }
    }
}
