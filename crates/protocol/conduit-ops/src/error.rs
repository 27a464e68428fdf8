//! Error types for the operations layer.
//!
//! This module defines the `ServiceError` enum returned by every command,
//! block hook and query of the service keeper.

use conduit_crypto::Address;
use conduit_types::{Coins, ErrorCode, RequestContextId, RequestContextState, Timestamp};
use thiserror::Error;

use crate::traits::Role;

/// Result type for service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Failure reported by a [`Bank`](crate::Bank) implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    /// The sender cannot cover the transfer.
    #[error("insufficient funds in {address}: need {needed}, have {available}")]
    InsufficientFunds {
        /// Paying account.
        address: Address,
        /// Amount requested.
        needed: Coins,
        /// Spendable balance.
        available: Coins,
    },

    /// Balances could not be read or written.
    #[error("bank store error: {0}")]
    Store(#[from] conduit_store::StoreError),
}

/// Errors that can occur during service operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    // =========================================================================
    // Registry Errors
    // =========================================================================
    /// A definition with this name already exists.
    #[error("service definition already exists: {0}")]
    DefinitionExists(String),

    /// No definition with this name.
    #[error("unknown service definition: {0}")]
    UnknownDefinition(String),

    /// The provider already bound this service.
    #[error("service binding already exists: {service_name}/{provider}")]
    BindingExists {
        /// Service name.
        service_name: String,
        /// Bound provider.
        provider: Address,
    },

    /// No binding for (service, provider).
    #[error("unknown service binding: {service_name}/{provider}")]
    UnknownBinding {
        /// Service name.
        service_name: String,
        /// Provider address.
        provider: Address,
    },

    /// The binding is disabled.
    #[error("service binding is unavailable")]
    BindingUnavailable,

    /// The binding is enabled.
    #[error("service binding is available")]
    BindingAvailable,

    // =========================================================================
    // Economic Errors
    // =========================================================================
    /// Deposit below the minimum required by the pricing.
    #[error("insufficient deposit: {actual} below minimum {required}")]
    InsufficientDeposit {
        /// Minimum deposit.
        required: Coins,
        /// Deposit the binding would hold.
        actual: Coins,
    },

    /// Pricing document rejected by the pricing engine.
    #[error("invalid pricing: {0}")]
    InvalidPricing(#[from] conduit_econ::EconError),

    /// A transfer could not be made.
    #[error("bank error: {0}")]
    Bank(#[from] BankError),

    /// The binding holds no deposit.
    #[error("no deposit to refund")]
    NoDeposit,

    /// Deposit refund requested before the dispute window closed.
    #[error("deposit refundable at {refundable_at}, now {now}")]
    IncorrectRefundTime {
        /// Earliest refund time (ms).
        refundable_at: Timestamp,
        /// Current block time (ms).
        now: Timestamp,
    },

    /// The provider has no earned fees.
    #[error("no earned fees for {0}")]
    NoEarnedFees(Address),

    // =========================================================================
    // Lifecycle Errors
    // =========================================================================
    /// No request context with this id.
    #[error("unknown request context: {0}")]
    UnknownRequestContext(RequestContextId),

    /// The command is not allowed in the context's current state.
    #[error("cannot {action} request context {context_id} in state {state}")]
    InvalidStateTransition {
        /// Context id.
        context_id: RequestContextId,
        /// Current state.
        state: RequestContextState,
        /// Attempted command.
        action: &'static str,
    },

    /// No pending request with this id (expired, answered or never issued).
    #[error("unknown request: {0}")]
    UnknownRequest(String),

    /// Responder is not the request's provider.
    #[error("response from {actual}, request addressed to {expected}")]
    WrongProvider {
        /// Provider the request was sent to.
        expected: Address,
        /// Address that responded.
        actual: Address,
    },

    /// Caller is not the context's consumer.
    #[error("{0} is not the consumer of this request context")]
    WrongConsumer(Address),

    /// No callback registered under this module name.
    #[error("no response callback registered for module '{0}'")]
    UnknownCallback(String),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    /// Caller lacks the role the command requires.
    #[error("{address} lacks the {role} role")]
    Unauthorized {
        /// Caller.
        address: Address,
        /// Required role.
        role: Role,
    },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Parameter file unreadable or invalid.
    #[error("config error: {0}")]
    Config(String),

    /// Parameter values outside their allowed ranges.
    #[error("invalid params: {0}")]
    InvalidParams(#[from] conduit_types::ParamsError),

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// Basic validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] conduit_valid::ValidationError),

    /// Storage error.
    #[error("store error: {0}")]
    Store(#[from] conduit_store::StoreError),

    /// Arithmetic overflow or corrupted ledger state.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Create a config error.
    pub fn config(msg: impl Into<String>) -> Self {
        ServiceError::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        ServiceError::Internal(msg.into())
    }

    pub(crate) fn transition(
        context_id: RequestContextId,
        state: RequestContextState,
        action: &'static str,
    ) -> Self {
        ServiceError::InvalidStateTransition {
            context_id,
            state,
            action,
        }
    }

    /// Get the protocol error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DefinitionExists(_) => ErrorCode::DefinitionExists,
            Self::UnknownDefinition(_) => ErrorCode::UnknownDefinition,
            Self::BindingExists { .. } => ErrorCode::BindingExists,
            Self::UnknownBinding { .. } => ErrorCode::UnknownBinding,
            Self::BindingUnavailable => ErrorCode::BindingUnavailable,
            Self::BindingAvailable => ErrorCode::BindingAvailable,

            Self::InsufficientDeposit { .. } => ErrorCode::InsufficientDeposit,
            Self::InvalidPricing(_) => ErrorCode::InvalidPricing,
            Self::Bank(BankError::InsufficientFunds { .. }) => ErrorCode::InsufficientBalance,
            Self::Bank(_) => ErrorCode::InternalError,
            Self::NoDeposit => ErrorCode::NoDeposit,
            Self::IncorrectRefundTime { .. } => ErrorCode::IncorrectRefundTime,
            Self::NoEarnedFees(_) => ErrorCode::NoEarnedFees,

            Self::UnknownRequestContext(_) => ErrorCode::UnknownRequestContext,
            Self::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
            Self::UnknownRequest(_) => ErrorCode::UnknownRequest,
            Self::WrongProvider { .. } => ErrorCode::WrongProvider,
            Self::WrongConsumer(_) => ErrorCode::WrongConsumer,
            Self::UnknownCallback(_) => ErrorCode::InvalidModuleName,

            Self::Unauthorized { .. } => ErrorCode::Unauthorized,

            Self::Validation(e) => e.error_code(),
            Self::Config(_) | Self::InvalidParams(_) | Self::Store(_) | Self::Internal(_) => {
                ErrorCode::InternalError
            }
        }
    }

    /// Metric label for rejected commands.
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::DefinitionExists(_) => "definition_exists",
            Self::UnknownDefinition(_) => "unknown_definition",
            Self::BindingExists { .. } => "binding_exists",
            Self::UnknownBinding { .. } => "unknown_binding",
            Self::BindingUnavailable => "binding_unavailable",
            Self::BindingAvailable => "binding_available",
            Self::InsufficientDeposit { .. } => "insufficient_deposit",
            Self::InvalidPricing(_) => "invalid_pricing",
            Self::Bank(_) => "bank",
            Self::NoDeposit => "no_deposit",
            Self::IncorrectRefundTime { .. } => "incorrect_refund_time",
            Self::NoEarnedFees(_) => "no_earned_fees",
            Self::UnknownRequestContext(_) => "unknown_request_context",
            Self::InvalidStateTransition { .. } => "invalid_state_transition",
            Self::UnknownRequest(_) => "unknown_request",
            Self::WrongProvider { .. } => "wrong_provider",
            Self::WrongConsumer(_) => "wrong_consumer",
            Self::UnknownCallback(_) => "unknown_callback",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Config(_) => "config",
            Self::InvalidParams(_) => "invalid_params",
            Self::Validation(_) => "validation",
            Self::Store(_) => "store",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_crypto::module_address;
    use conduit_valid::ValidationError;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            ServiceError::DefinitionExists("s1".into()).error_code(),
            ErrorCode::DefinitionExists
        );
        assert_eq!(ServiceError::NoDeposit.error_code(), ErrorCode::NoDeposit);
        assert_eq!(
            ServiceError::Validation(ValidationError::NoProviders).error_code(),
            ErrorCode::InvalidProviders
        );

        let insufficient = ServiceError::Bank(BankError::InsufficientFunds {
            address: module_address("c"),
            needed: Coins::single("acdt", 10),
            available: Coins::new(),
        });
        assert_eq!(insufficient.error_code(), ErrorCode::InsufficientBalance);
        assert!(insufficient.error_code().is_economic_error());
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::IncorrectRefundTime {
            refundable_at: 10,
            now: 5,
        };
        assert_eq!(err.to_string(), "deposit refundable at 10, now 5");
        assert_eq!(err.metric_label(), "incorrect_refund_time");
    }
}
