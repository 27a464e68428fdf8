//! The service keeper and its per-command execution context.
//!
//! [`ServiceKeeper`] owns no state of its own: every call receives the
//! store handle and the current block height and time explicitly through a
//! [`BlockContext`]. Each command and each block hook runs inside a
//! [`KvBranch`]; the branch is committed only when the whole operation
//! succeeds, so a rejected command leaves no trace.

use std::sync::Arc;

use conduit_crypto::{module_address, Address};
use conduit_econ::TokenRegistry;
use conduit_store::{KvBranch, KvStore};
use conduit_types::{BlockHeight, RequestContextId, RequestContextState, ServiceParams, Timestamp};
use tracing::{debug, warn};

use crate::command::Command;
use crate::error::ServiceResult;
use crate::events::ServiceEvent;
use crate::metrics::ServiceMetrics;
use crate::traits::{Bank, CallbackRegistry, Guardian, ParamSource, RoundResult};

/// Module account holding provider deposits.
pub const DEPOSIT_ACCOUNT: &str = "service_deposit";
/// Module account holding escrowed request fees and unwithdrawn earnings.
pub const REQUEST_ACCOUNT: &str = "service_request";
/// Module account collecting the service fee tax.
pub const TAX_ACCOUNT: &str = "service_tax";

/// Address of the deposit escrow account.
pub fn deposit_account() -> Address {
    module_address(DEPOSIT_ACCOUNT)
}

/// Address of the request fee escrow account.
pub fn request_account() -> Address {
    module_address(REQUEST_ACCOUNT)
}

/// Address of the tax account.
pub fn tax_account() -> Address {
    module_address(TAX_ACCOUNT)
}

/// Store handle plus the block coordinates an operation runs at.
pub struct BlockContext<'a> {
    pub store: &'a mut dyn KvStore,
    pub height: BlockHeight,
    /// Block time in milliseconds
    pub time: Timestamp,
}

impl<'a> BlockContext<'a> {
    pub fn new(store: &'a mut dyn KvStore, height: BlockHeight, time: Timestamp) -> Self {
        Self {
            store,
            height,
            time,
        }
    }
}

/// Buffered state of one running operation.
pub(crate) struct TxContext<'a> {
    pub store: KvBranch<'a>,
    pub height: BlockHeight,
    pub time: Timestamp,
    pub params: ServiceParams,
    events: Vec<ServiceEvent>,
    rounds: Vec<(String, RoundResult)>,
    state_changes: Vec<(String, RequestContextId, RequestContextState)>,
}

/// What a committed operation produced.
struct TxOutcome {
    events: Vec<ServiceEvent>,
    rounds: Vec<(String, RoundResult)>,
    state_changes: Vec<(String, RequestContextId, RequestContextState)>,
}

impl<'a> TxContext<'a> {
    fn new(block: BlockContext<'a>, params: ServiceParams) -> Self {
        Self {
            store: KvBranch::new(block.store),
            height: block.height,
            time: block.time,
            params,
            events: Vec::new(),
            rounds: Vec::new(),
            state_changes: Vec::new(),
        }
    }

    pub fn emit(&mut self, event: ServiceEvent) {
        self.events.push(event);
    }

    /// Queue a round result for the named callback.
    pub fn deliver_round(&mut self, module_name: &str, round: RoundResult) {
        self.rounds.push((module_name.to_string(), round));
    }

    /// Queue a state notification for the named callback.
    pub fn notify_state(&mut self, module_name: &str, context_id: RequestContextId, state: RequestContextState) {
        self.state_changes
            .push((module_name.to_string(), context_id, state));
    }

    fn commit(self) -> ServiceResult<TxOutcome> {
        let TxContext {
            store,
            events,
            rounds,
            state_changes,
            ..
        } = self;
        store.commit()?;
        Ok(TxOutcome {
            events,
            rounds,
            state_changes,
        })
    }
}

/// Service invocation keeper.
///
/// Collaborators are injected at assembly time:
/// - `bank`: balance transfers
/// - `tokens`: pricing unit resolution
/// - `guardian`: role checks for super mode and tax withdrawal
/// - `params`: governance parameters, read once per operation
/// - `callbacks`: named consumers of round results
pub struct ServiceKeeper {
    pub(crate) bank: Arc<dyn Bank>,
    pub(crate) tokens: Arc<dyn TokenRegistry + Send + Sync>,
    pub(crate) guardian: Arc<dyn Guardian>,
    params: Arc<dyn ParamSource>,
    pub(crate) callbacks: CallbackRegistry,
    metrics: Option<Arc<ServiceMetrics>>,
}

impl ServiceKeeper {
    /// Create a keeper with no callbacks and no metrics.
    pub fn new(
        bank: Arc<dyn Bank>,
        tokens: Arc<dyn TokenRegistry + Send + Sync>,
        guardian: Arc<dyn Guardian>,
        params: Arc<dyn ParamSource>,
    ) -> Self {
        Self {
            bank,
            tokens,
            guardian,
            params,
            callbacks: CallbackRegistry::new(),
            metrics: None,
        }
    }

    /// Attach the response callbacks.
    pub fn with_callbacks(mut self, callbacks: CallbackRegistry) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Attach a metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<ServiceMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Current governance parameters.
    pub fn params(&self) -> ServiceParams {
        self.params.params()
    }

    pub fn metrics(&self) -> Option<&Arc<ServiceMetrics>> {
        self.metrics.as_ref()
    }

    /// Execute one command atomically.
    ///
    /// On success the command's writes are committed to `block.store` and its
    /// events returned. On failure nothing is written.
    pub fn execute(&self, block: BlockContext<'_>, command: Command) -> ServiceResult<Vec<ServiceEvent>> {
        let name = command.name();
        let result = self.run(block, |keeper, tx| keeper.dispatch(tx, command));
        if let Err(e) = &result {
            debug!(command = name, error = %e, code = %e.error_code(), "command rejected");
            if let Some(metrics) = &self.metrics {
                metrics.record_rejection(e);
            }
        }
        result
    }

    /// Block-boundary hook, run once per height after the block's commands.
    ///
    /// Expires every request due at `block.height`, then dispatches every
    /// round scheduled for it.
    pub fn end_block(&self, block: BlockContext<'_>) -> ServiceResult<Vec<ServiceEvent>> {
        self.run(block, |keeper, tx| {
            keeper.expire_requests(tx)?;
            keeper.dispatch_scheduled_rounds(tx)
        })
    }

    /// Administrative sweep returning every binding's deposit.
    pub fn refund_all_deposits(&self, block: BlockContext<'_>) -> ServiceResult<Vec<ServiceEvent>> {
        self.run(block, |keeper, tx| keeper.refund_every_deposit(tx))
    }

    fn run<F>(&self, block: BlockContext<'_>, op: F) -> ServiceResult<Vec<ServiceEvent>>
    where
        F: FnOnce(&Self, &mut TxContext<'_>) -> ServiceResult<()>,
    {
        let mut tx = TxContext::new(block, self.params.params());
        op(self, &mut tx)?;
        let outcome = tx.commit()?;
        self.deliver(&outcome);
        if let Some(metrics) = &self.metrics {
            metrics.observe(&outcome.events);
        }
        Ok(outcome.events)
    }

    fn deliver(&self, outcome: &TxOutcome) {
        for (module_name, round) in &outcome.rounds {
            match self.callbacks.get(module_name) {
                Some(callback) => callback.on_round_complete(round),
                None => warn!(module = %module_name, "round result for unregistered callback dropped"),
            }
        }
        for (module_name, context_id, state) in &outcome.state_changes {
            if let Some(callback) = self.callbacks.get(module_name) {
                callback.on_state_change(context_id, *state);
            }
        }
    }
}
