//! Protocol-level error codes.
//!
//! Every failure a command can produce maps to one stable numeric code so
//! hosts can report rejections without depending on error message text.

use serde::{Deserialize, Serialize};

/// Stable error codes of the service module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
#[non_exhaustive]
pub enum ErrorCode {
    // =========================================================================
    // Validation Errors (0x0100 - 0x01FF)
    // =========================================================================
    /// Service name is empty, too long, or has illegal characters
    InvalidServiceName = 0x0100,
    /// Description or author description too long
    InvalidDescription = 0x0101,
    /// Too many, too long, empty or duplicate tags
    InvalidTags = 0x0102,
    /// Schemas document is not valid JSON Schema
    InvalidSchemas = 0x0103,
    /// Provider list empty, too long, or has duplicates
    InvalidProviders = 0x0104,
    /// Request input is empty, not JSON, or fails the input schema
    InvalidInput = 0x0105,
    /// Timeout zero or above the governance maximum
    InvalidTimeout = 0x0106,
    /// Repeated frequency shorter than the timeout
    InvalidRepeatedFrequency = 0x0107,
    /// Repeated total not -1 and not positive
    InvalidRepeatedTotal = 0x0108,
    /// Response threshold larger than the provider count
    InvalidThreshold = 0x0109,
    /// Pricing JSON malformed or semantically invalid
    InvalidPricing = 0x010A,
    /// Response result/output pair inconsistent or malformed
    InvalidResult = 0x010B,
    /// Request id is not well-formed hex
    InvalidRequestId = 0x010C,
    /// Coin amount malformed
    InvalidCoins = 0x010D,
    /// Module callback name not registered
    InvalidModuleName = 0x010E,

    // =========================================================================
    // Registry Errors (0x0200 - 0x02FF)
    // =========================================================================
    /// No definition for the service name
    UnknownDefinition = 0x0200,
    /// A definition with the same name exists
    DefinitionExists = 0x0201,
    /// No binding for (service, provider)
    UnknownBinding = 0x0202,
    /// A binding for (service, provider) exists
    BindingExists = 0x0203,
    /// Binding is disabled
    BindingUnavailable = 0x0204,
    /// Binding is enabled
    BindingAvailable = 0x0205,

    // =========================================================================
    // Economic Errors (0x0300 - 0x03FF)
    // =========================================================================
    /// Deposit below the required minimum
    InsufficientDeposit = 0x0300,
    /// Account cannot cover a transfer
    InsufficientBalance = 0x0301,
    /// Binding has no deposit left
    NoDeposit = 0x0302,
    /// Deposit refund attempted too early
    IncorrectRefundTime = 0x0303,
    /// Provider has no earned fees
    NoEarnedFees = 0x0304,

    // =========================================================================
    // Lifecycle Errors (0x0400 - 0x04FF)
    // =========================================================================
    /// No request context with the given id
    UnknownRequestContext = 0x0400,
    /// Command not allowed in the context's current state
    InvalidStateTransition = 0x0401,
    /// No pending request with the given id
    UnknownRequest = 0x0402,
    /// Responder is not the request's provider
    WrongProvider = 0x0403,
    /// Caller is not the context's consumer
    WrongConsumer = 0x0404,

    // =========================================================================
    // Authorization Errors (0x0500 - 0x05FF)
    // =========================================================================
    /// Caller lacks the required role
    Unauthorized = 0x0500,

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Storage or encoding failure
    InternalError = 0xFFFF,
}

impl ErrorCode {
    /// Returns true if this is a validation error (0x0100-0x01FF)
    pub fn is_validation_error(&self) -> bool {
        (0x0100..=0x01FF).contains(&self.code())
    }

    /// Returns true if this is a registry error (0x0200-0x02FF)
    pub fn is_registry_error(&self) -> bool {
        (0x0200..=0x02FF).contains(&self.code())
    }

    /// Returns true if this is an economic error (0x0300-0x03FF)
    pub fn is_economic_error(&self) -> bool {
        (0x0300..=0x03FF).contains(&self.code())
    }

    /// Returns true if this is a lifecycle error (0x0400-0x04FF)
    pub fn is_lifecycle_error(&self) -> bool {
        (0x0400..=0x04FF).contains(&self.code())
    }

    /// Returns true if this is an authorization error (0x0500-0x05FF)
    pub fn is_authorization_error(&self) -> bool {
        (0x0500..=0x05FF).contains(&self.code())
    }

    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get a user-facing hint for recovering from this error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidServiceName => Some("Use letters, digits, '-' or '_', starting with a letter."),
            Self::InvalidDescription => Some("Shorten the description to 280 characters."),
            Self::InvalidTags => Some("Use at most 10 distinct, non-empty tags."),
            Self::InvalidSchemas => Some("Provide input, output and error members, each a JSON Schema."),
            Self::InvalidProviders => Some("List between 1 and 10 distinct providers."),
            Self::InvalidInput => Some("Input must be JSON matching the service's input schema."),
            Self::InvalidTimeout => Some("Choose a timeout between 1 and the governance maximum."),
            Self::InvalidRepeatedFrequency => Some("Frequency must be zero or at least the timeout."),
            Self::InvalidRepeatedTotal => Some("Total must be -1 (unlimited) or positive."),
            Self::InvalidThreshold => Some("Threshold cannot exceed the number of providers."),
            Self::InvalidPricing => Some("Check the price units and promotion ordering."),
            Self::InvalidResult => Some("Code 200 requires output; any other code forbids it."),
            Self::InvalidRequestId => Some("Request ids are 100 hex characters."),
            Self::InvalidCoins => Some("Write amounts as <integer><denom>, comma separated."),
            Self::InvalidModuleName => Some("Register the callback before creating the context."),

            Self::UnknownDefinition => Some("Define the service first."),
            Self::DefinitionExists => Some("Pick another service name."),
            Self::UnknownBinding => Some("Bind the service first."),
            Self::BindingExists => Some("Update the existing binding instead."),
            Self::BindingUnavailable => Some("Enable the binding first."),
            Self::BindingAvailable => Some("Disable the binding first."),

            Self::InsufficientDeposit => Some("Increase the deposit or lower the price."),
            Self::InsufficientBalance => Some("Fund the account before retrying."),
            Self::NoDeposit => Some("The deposit has already been refunded."),
            Self::IncorrectRefundTime => Some("Wait until the arbitration and complaint windows pass."),
            Self::NoEarnedFees => Some("Nothing to withdraw yet."),

            Self::UnknownRequestContext => Some("Check the request context id."),
            Self::InvalidStateTransition => Some("Query the context state before retrying."),
            Self::UnknownRequest => Some("The request already expired or was answered."),
            Self::WrongProvider => Some("Only the addressed provider may respond."),
            Self::WrongConsumer => Some("Only the context's consumer may change it."),

            Self::Unauthorized => Some("This operation needs a trusted-operator role."),

            Self::InternalError => Some("An internal error occurred. Please report this issue."),
        }
    }

    /// Get the error category name.
    pub fn category(&self) -> &'static str {
        if self.is_validation_error() {
            "Validation"
        } else if self.is_registry_error() {
            "Registry"
        } else if self.is_economic_error() {
            "Economic"
        } else if self.is_lifecycle_error() {
            "Lifecycle"
        } else if self.is_authorization_error() {
            "Authorization"
        } else {
            "Internal"
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCode::InvalidServiceName => "INVALID_SERVICE_NAME",
            ErrorCode::InvalidDescription => "INVALID_DESCRIPTION",
            ErrorCode::InvalidTags => "INVALID_TAGS",
            ErrorCode::InvalidSchemas => "INVALID_SCHEMAS",
            ErrorCode::InvalidProviders => "INVALID_PROVIDERS",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::InvalidTimeout => "INVALID_TIMEOUT",
            ErrorCode::InvalidRepeatedFrequency => "INVALID_REPEATED_FREQUENCY",
            ErrorCode::InvalidRepeatedTotal => "INVALID_REPEATED_TOTAL",
            ErrorCode::InvalidThreshold => "INVALID_THRESHOLD",
            ErrorCode::InvalidPricing => "INVALID_PRICING",
            ErrorCode::InvalidResult => "INVALID_RESULT",
            ErrorCode::InvalidRequestId => "INVALID_REQUEST_ID",
            ErrorCode::InvalidCoins => "INVALID_COINS",
            ErrorCode::InvalidModuleName => "INVALID_MODULE_NAME",
            ErrorCode::UnknownDefinition => "UNKNOWN_DEFINITION",
            ErrorCode::DefinitionExists => "DEFINITION_EXISTS",
            ErrorCode::UnknownBinding => "UNKNOWN_BINDING",
            ErrorCode::BindingExists => "BINDING_EXISTS",
            ErrorCode::BindingUnavailable => "BINDING_UNAVAILABLE",
            ErrorCode::BindingAvailable => "BINDING_AVAILABLE",
            ErrorCode::InsufficientDeposit => "INSUFFICIENT_DEPOSIT",
            ErrorCode::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ErrorCode::NoDeposit => "NO_DEPOSIT",
            ErrorCode::IncorrectRefundTime => "INCORRECT_REFUND_TIME",
            ErrorCode::NoEarnedFees => "NO_EARNED_FEES",
            ErrorCode::UnknownRequestContext => "UNKNOWN_REQUEST_CONTEXT",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::UnknownRequest => "UNKNOWN_REQUEST",
            ErrorCode::WrongProvider => "WRONG_PROVIDER",
            ErrorCode::WrongConsumer => "WRONG_CONSUMER",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        f.write_str(name)
    }
}
