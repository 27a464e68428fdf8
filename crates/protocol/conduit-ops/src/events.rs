//! Events emitted by service commands and the block hook.
//!
//! Events are returned to the host alongside the committed state change;
//! they carry enough detail for indexers and for the metrics collector.

use conduit_crypto::Address;
use conduit_types::{BlockHeight, Coins, RequestContextId, RequestId};
use serde::Serialize;

/// Something that happened inside the service module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServiceEvent {
    // =========================================================================
    // Registry
    // =========================================================================
    ServiceDefined {
        service_name: String,
        author: Address,
    },
    ServiceBound {
        service_name: String,
        provider: Address,
        deposit: Coins,
    },
    BindingUpdated {
        service_name: String,
        provider: Address,
    },
    BindingDisabled {
        service_name: String,
        provider: Address,
    },
    BindingEnabled {
        service_name: String,
        provider: Address,
    },
    DepositRefunded {
        service_name: String,
        provider: Address,
        amount: Coins,
    },

    // =========================================================================
    // Fee ledger
    // =========================================================================
    WithdrawAddressSet {
        provider: Address,
        withdraw_address: Address,
    },
    EarnedFeesWithdrawn {
        provider: Address,
        withdraw_address: Address,
        amount: Coins,
    },
    TaxWithdrawn {
        trustee: Address,
        destination: Address,
        amount: Coins,
    },

    // =========================================================================
    // Request contexts
    // =========================================================================
    RequestContextCreated {
        context_id: RequestContextId,
        service_name: String,
        consumer: Address,
    },
    RequestContextUpdated {
        context_id: RequestContextId,
    },
    RequestContextPaused {
        context_id: RequestContextId,
        /// Set when the consumer could not pay for the next round.
        insufficient_balance: bool,
    },
    RequestContextStarted {
        context_id: RequestContextId,
    },
    RequestContextCompleted {
        context_id: RequestContextId,
        /// Set when the consumer killed the context.
        killed: bool,
    },

    // =========================================================================
    // Rounds and requests
    // =========================================================================
    RoundStarted {
        context_id: RequestContextId,
        batch_counter: u64,
        request_count: u32,
    },
    RoundCompleted {
        context_id: RequestContextId,
        batch_counter: u64,
        responded: u32,
        expired: u32,
    },
    NewRequest {
        request_id: RequestId,
        context_id: RequestContextId,
        provider: Address,
        service_fee: Coins,
        expiration_height: BlockHeight,
    },
    RequestExpired {
        request_id: RequestId,
        provider: Address,
    },
    RequestAbandoned {
        request_id: RequestId,
        provider: Address,
    },
    ResponseReceived {
        request_id: RequestId,
        provider: Address,
        code: u16,
    },
}

impl ServiceEvent {
    /// Short name used as the metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceDefined { .. } => "service_defined",
            Self::ServiceBound { .. } => "service_bound",
            Self::BindingUpdated { .. } => "binding_updated",
            Self::BindingDisabled { .. } => "binding_disabled",
            Self::BindingEnabled { .. } => "binding_enabled",
            Self::DepositRefunded { .. } => "deposit_refunded",
            Self::WithdrawAddressSet { .. } => "withdraw_address_set",
            Self::EarnedFeesWithdrawn { .. } => "earned_fees_withdrawn",
            Self::TaxWithdrawn { .. } => "tax_withdrawn",
            Self::RequestContextCreated { .. } => "request_context_created",
            Self::RequestContextUpdated { .. } => "request_context_updated",
            Self::RequestContextPaused { .. } => "request_context_paused",
            Self::RequestContextStarted { .. } => "request_context_started",
            Self::RequestContextCompleted { .. } => "request_context_completed",
            Self::RoundStarted { .. } => "round_started",
            Self::RoundCompleted { .. } => "round_completed",
            Self::NewRequest { .. } => "new_request",
            Self::RequestExpired { .. } => "request_expired",
            Self::RequestAbandoned { .. } => "request_abandoned",
            Self::ResponseReceived { .. } => "response_received",
        }
    }
}

/// Id of the first context created in `events`, if any.
pub fn created_context_id(events: &[ServiceEvent]) -> Option<RequestContextId> {
    events.iter().find_map(|e| match e {
        ServiceEvent::RequestContextCreated { context_id, .. } => Some(*context_id),
        _ => None,
    })
}

/// Requests issued in `events`, in issue order.
pub fn issued_requests(events: &[ServiceEvent]) -> Vec<RequestId> {
    events
        .iter()
        .filter_map(|e| match e {
            ServiceEvent::NewRequest { request_id, .. } => Some(*request_id),
            _ => None,
        })
        .collect()
}
