//! Validation error types for the Conduit service module.
//!
//! Each variant maps onto a protocol [`ErrorCode`] through
//! [`ValidationError::error_code`].

use conduit_types::ErrorCode;
use thiserror::Error;

/// Errors that can occur during basic validation of commands.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    // =========================================================================
    // Definition Errors
    // =========================================================================
    /// Service name does not match `^[a-zA-Z][a-zA-Z0-9_-]*$`
    #[error("invalid service name '{0}'")]
    InvalidServiceName(String),

    /// Service name exceeds maximum length
    #[error("service name too long: {length} chars exceeds maximum {max}")]
    ServiceNameTooLong {
        /// Actual length
        length: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Description exceeds maximum length
    #[error("{field} too long: {length} chars exceeds maximum {max}")]
    DescriptionTooLong {
        /// `description` or `author_description`
        field: &'static str,
        /// Actual length
        length: usize,
        /// Maximum allowed length
        max: usize,
    },

    /// Too many tags
    #[error("too many tags: {count} exceeds maximum {max}")]
    TooManyTags {
        /// Actual tag count
        count: usize,
        /// Maximum allowed tags
        max: usize,
    },

    /// Tag empty or too long
    #[error("invalid tag '{0}'")]
    InvalidTag(String),

    /// Tag listed twice
    #[error("duplicate tag '{0}'")]
    DuplicateTag(String),

    /// Schemas document missing a member or not compilable
    #[error("invalid schemas: {0}")]
    InvalidSchemas(String),

    // =========================================================================
    // Request Errors
    // =========================================================================
    /// Provider list empty
    #[error("providers missing")]
    NoProviders,

    /// Too many providers
    #[error("too many providers: {count} exceeds maximum {max}")]
    TooManyProviders {
        /// Actual provider count
        count: usize,
        /// Maximum allowed providers
        max: usize,
    },

    /// Provider listed twice
    #[error("duplicate provider {0}")]
    DuplicateProvider(String),

    /// Input missing, not JSON, or rejected by the input schema
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Input or output exceeds the payload size limit
    #[error("{field} too large: {size} bytes exceeds maximum {max} bytes")]
    PayloadTooLarge {
        /// `input` or `output`
        field: &'static str,
        /// Actual size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Timeout zero or above the maximum
    #[error("timeout {timeout} must be within 1..={max}")]
    InvalidTimeout {
        /// Requested timeout
        timeout: u64,
        /// Maximum allowed timeout
        max: u64,
    },

    /// Repeated frequency shorter than the timeout
    #[error("repeated frequency {frequency} must be zero or at least the timeout {timeout}")]
    InvalidRepeatedFrequency {
        /// Requested frequency
        frequency: u64,
        /// Effective timeout
        timeout: u64,
    },

    /// Repeated total not -1 and not positive
    #[error("repeated total {0} must be -1 or positive")]
    InvalidRepeatedTotal(i64),

    /// Threshold larger than the provider count
    #[error("response threshold {threshold} exceeds provider count {providers}")]
    InvalidThreshold {
        /// Requested threshold
        threshold: u32,
        /// Number of providers
        providers: usize,
    },

    /// Module callback name empty or too long
    #[error("invalid module name '{0}'")]
    InvalidModuleName(String),

    // =========================================================================
    // Response Errors
    // =========================================================================
    /// Result/output pair inconsistent or malformed
    #[error("invalid result: {0}")]
    InvalidResult(String),

    /// Request id is not well-formed
    #[error("invalid request id: {0}")]
    InvalidRequestId(String),

    // =========================================================================
    // Amount Errors
    // =========================================================================
    /// Coins missing or malformed
    #[error("invalid {field}: {reason}")]
    InvalidCoins {
        /// Which amount
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ValidationError {
    /// Protocol error code for this failure.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidServiceName(_) | Self::ServiceNameTooLong { .. } => {
                ErrorCode::InvalidServiceName
            }
            Self::DescriptionTooLong { .. } => ErrorCode::InvalidDescription,
            Self::TooManyTags { .. } | Self::InvalidTag(_) | Self::DuplicateTag(_) => {
                ErrorCode::InvalidTags
            }
            Self::InvalidSchemas(_) => ErrorCode::InvalidSchemas,
            Self::NoProviders | Self::TooManyProviders { .. } | Self::DuplicateProvider(_) => {
                ErrorCode::InvalidProviders
            }
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::PayloadTooLarge { field, .. } => {
                if *field == "input" {
                    ErrorCode::InvalidInput
                } else {
                    ErrorCode::InvalidResult
                }
            }
            Self::InvalidTimeout { .. } => ErrorCode::InvalidTimeout,
            Self::InvalidRepeatedFrequency { .. } => ErrorCode::InvalidRepeatedFrequency,
            Self::InvalidRepeatedTotal(_) => ErrorCode::InvalidRepeatedTotal,
            Self::InvalidThreshold { .. } => ErrorCode::InvalidThreshold,
            Self::InvalidModuleName(_) => ErrorCode::InvalidModuleName,
            Self::InvalidResult(_) => ErrorCode::InvalidResult,
            Self::InvalidRequestId(_) => ErrorCode::InvalidRequestId,
            Self::InvalidCoins { .. } => ErrorCode::InvalidCoins,
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ValidationError::DuplicateTag("x".into()).error_code(),
            ErrorCode::InvalidTags
        );
        assert_eq!(
            ValidationError::PayloadTooLarge {
                field: "output",
                size: 5,
                max: 4
            }
            .error_code(),
            ErrorCode::InvalidResult
        );
        assert_eq!(
            ValidationError::InvalidRepeatedTotal(-2).error_code(),
            ErrorCode::InvalidRepeatedTotal
        );
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::InvalidTimeout {
            timeout: 0,
            max: 100,
        };
        assert_eq!(err.to_string(), "timeout 0 must be within 1..=100");
    }
}
