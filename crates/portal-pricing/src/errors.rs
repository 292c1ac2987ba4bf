//! ---
//! portal_section: "08-pricing"
//! portal_subsection: "module"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Price reconstruction for quotations and calculations."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PricingError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("field '{field}' holds '{value}' which is not a number")]
    InvalidNumber { field: String, value: String },
    #[error("line {line} has a negative quantity")]
    NegativeQuantity { line: usize },
    #[error("line {line} has discount {value}% outside 0..=100")]
    InvalidDiscount { line: usize, value: String },
    #[error("line {line} is not an object")]
    MalformedLine { line: usize },
    #[error("amount overflow while pricing line {line}")]
    Overflow { line: usize },
    #[error("amount overflow while adding up {total}")]
    TotalOverflow { total: &'static str },
}

/// Failure to read a money or quantity string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    #[error("empty amount")]
    Empty,
    #[error("unexpected character '{0}' in amount")]
    InvalidCharacter(char),
    #[error("more than one decimal separator")]
    AmbiguousSeparators,
    #[error("amount out of range")]
    OutOfRange,
}
