//! Economic error types for the Conduit service module.

use thiserror::Error;

/// Errors that can occur while parsing pricing or computing fees.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EconError {
    // =========================================================================
    // Pricing Errors
    // =========================================================================
    /// Pricing document is not the expected JSON shape
    #[error("failed to unmarshal the pricing: {0}")]
    MalformedPricing(String),

    /// A price entry could not be split into amount and unit
    #[error("malformed price entry '{0}'")]
    MalformedPrice(String),

    /// Decimal amount is not a plain non-negative decimal
    #[error("invalid decimal amount '{0}'")]
    InvalidDecimal(String),

    /// The unit is neither native nor known to the token registry
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),

    /// A discount outside `(0, 1]`
    #[error("invalid discount '{0}'")]
    InvalidDiscount(String),

    /// Time promotions overlap, are unordered, or have an empty window
    #[error("invalid time promotion: {0}")]
    InvalidTimePromotion(String),

    /// Volume promotions are unordered or have a zero volume
    #[error("invalid volume promotion: {0}")]
    InvalidVolumePromotion(String),

    // =========================================================================
    // Arithmetic Errors
    // =========================================================================
    /// Amount does not fit in 128 bits
    #[error("amount overflow")]
    Overflow,
}

/// Result type for economic operations.
pub type EconResult<T> = std::result::Result<T, EconError>;
