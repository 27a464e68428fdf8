//! Collaborator interfaces consumed by the service keeper.
//!
//! The keeper never reaches into another module's state directly. Balances,
//! roles, governance parameters and result consumers are injected through
//! these traits when the host assembles the application.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use conduit_crypto::Address;
use conduit_store::KvStore;
use conduit_types::{Coins, RequestContextId, RequestContextState, Response, ServiceParams};
use serde::{Deserialize, Serialize};

use crate::error::BankError;

/// Balance transfer primitive.
///
/// Balances live in the same store as service state, so a transfer made
/// inside a command is discarded together with the command's other writes
/// when the command fails.
pub trait Bank: Send + Sync {
    /// Spendable balance of an account.
    fn balance(&self, store: &dyn KvStore, address: &Address) -> Result<Coins, BankError>;

    /// Move `amount` from one account to another.
    fn transfer(
        &self,
        store: &mut dyn KvStore,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<(), BankError>;
}

/// Trusted-operator roles checked by the service module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// May issue super-mode requests.
    Profiler,
    /// May withdraw accumulated service tax.
    Trustee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Profiler => f.write_str("profiler"),
            Role::Trustee => f.write_str("trustee"),
        }
    }
}

/// Role registry.
pub trait Guardian: Send + Sync {
    fn has_role(&self, address: &Address, role: Role) -> bool;
}

/// Read-only governance parameters.
pub trait ParamSource: Send + Sync {
    fn params(&self) -> ServiceParams;
}

impl ParamSource for ServiceParams {
    fn params(&self) -> ServiceParams {
        self.clone()
    }
}

/// Responses gathered for one completed round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    pub context_id: RequestContextId,
    pub batch_counter: u64,
    /// Responses in request-id order, successful or not.
    pub responses: Vec<Response>,
    /// Whether enough successful responses arrived to meet the threshold.
    pub threshold_met: bool,
}

/// Consumer of round results, registered under a module name.
///
/// Callbacks run after the command or block hook that completed the round
/// has been committed.
pub trait ResponseCallback: Send + Sync {
    fn on_round_complete(&self, round: &RoundResult);

    /// Called when the context is paused or completed.
    fn on_state_change(&self, _context_id: &RequestContextId, _state: RequestContextState) {}
}

/// Named response callbacks, assembled once at startup.
#[derive(Default, Clone)]
pub struct CallbackRegistry {
    callbacks: BTreeMap<String, Arc<dyn ResponseCallback>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback, replacing any previous one with the same name.
    pub fn register(&mut self, module_name: impl Into<String>, callback: Arc<dyn ResponseCallback>) {
        self.callbacks.insert(module_name.into(), callback);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, module_name: impl Into<String>, callback: Arc<dyn ResponseCallback>) -> Self {
        self.register(module_name, callback);
        self
    }

    pub fn get(&self, module_name: &str) -> Option<&Arc<dyn ResponseCallback>> {
        self.callbacks.get(module_name)
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.callbacks.contains_key(module_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.callbacks.keys().map(String::as_str)
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.callbacks.keys()).finish()
    }
}
