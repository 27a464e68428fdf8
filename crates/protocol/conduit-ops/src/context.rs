//! Request context lifecycle commands.
//!
//! ```text
//!            create                      round done (more rounds left)
//!   ──────────────────> RUNNING        BATCHRUNNING ───────────────> BATCHCOMPLETED
//!                          │  ▲           │    ▲                         │
//!                    pause │  │ start     │    └──── next round due ─────┘
//!                          ▼  │           ▼
//!                         PAUSED <──── pause (also from BATCHCOMPLETED)
//!
//!   kill, or last round done  ──>  COMPLETED (terminal)
//! ```

use conduit_crypto::{tagged_hash, Address, DOMAIN_REQUEST_CONTEXT};
use conduit_store::ServiceStore;
use conduit_types::constants::UNLIMITED_REPEATS;
use conduit_types::{RequestContext, RequestContextId, RequestContextState};
use conduit_valid::{document_matches, validate_context, SchemaKind, ValidationError};
use tracing::info;

use crate::command::{CallService, ContextUpdate};
use crate::error::{ServiceError, ServiceResult};
use crate::events::ServiceEvent;
use crate::keeper::{ServiceKeeper, TxContext};
use crate::traits::Role;

impl ServiceKeeper {
    /// Create a request context and dispatch its first round.
    pub(crate) fn call_service(&self, tx: &mut TxContext<'_>, call: CallService) -> ServiceResult<RequestContextId> {
        // 1. The service must exist and accept the input
        let definition = tx
            .store
            .get_definition(&call.service_name)?
            .ok_or_else(|| ServiceError::UnknownDefinition(call.service_name.clone()))?;
        if !document_matches(&definition.schemas, SchemaKind::Input, &call.input)? {
            return Err(ValidationError::InvalidInput(
                "input does not conform to the service input schema".into(),
            )
            .into());
        }

        // 2. Super mode is reserved for profilers
        if call.super_mode && !self.guardian.has_role(&call.consumer, Role::Profiler) {
            return Err(ServiceError::Unauthorized {
                address: call.consumer,
                role: Role::Profiler,
            });
        }

        // 3. Round results need somewhere to go
        if let Some(module_name) = &call.module_name {
            if !self.callbacks.contains(module_name) {
                return Err(ServiceError::UnknownCallback(module_name.clone()));
            }
        }

        // 4. Derive the id and run the first round
        let sequence = tx.store.next_context_sequence()?;
        let id = context_id(&call.consumer, &call.service_name, tx.height, sequence);
        let mut ctx = call.to_context(id);

        info!(
            context = %id,
            service = %ctx.service_name,
            consumer = %ctx.consumer,
            providers = ctx.providers.len(),
            repeated = ctx.repeated,
            "request context created"
        );
        tx.emit(ServiceEvent::RequestContextCreated {
            context_id: id,
            service_name: ctx.service_name.clone(),
            consumer: ctx.consumer,
        });

        self.start_round(tx, &mut ctx)?;
        tx.store.set_request_context(&ctx)?;
        Ok(id)
    }

    /// Stop dispatching rounds. In-flight requests stay pending.
    pub(crate) fn pause_request_context(
        &self,
        tx: &mut TxContext<'_>,
        context_id: RequestContextId,
        consumer: Address,
    ) -> ServiceResult<()> {
        let mut ctx = self.load_owned_context(tx, &context_id, &consumer)?;
        if !ctx.state.is_pausable() {
            return Err(ServiceError::transition(context_id, ctx.state, "pause"));
        }

        if let Some(height) = ctx.scheduled_height.take() {
            tx.store.unschedule_new_batch(height, &context_id)?;
        }
        self.set_state(tx, &mut ctx, RequestContextState::Paused);
        tx.store.set_request_context(&ctx)?;

        info!(context = %context_id, "request context paused");
        tx.emit(ServiceEvent::RequestContextPaused {
            context_id,
            insufficient_balance: false,
        });
        Ok(())
    }

    /// Resume a paused context.
    pub(crate) fn start_request_context(
        &self,
        tx: &mut TxContext<'_>,
        context_id: RequestContextId,
        consumer: Address,
    ) -> ServiceResult<()> {
        let mut ctx = self.load_owned_context(tx, &context_id, &consumer)?;
        if ctx.state != RequestContextState::Paused {
            return Err(ServiceError::transition(context_id, ctx.state, "start"));
        }

        tx.emit(ServiceEvent::RequestContextStarted { context_id });
        if ctx.round_open {
            let state = if ctx.repeated {
                RequestContextState::BatchRunning
            } else {
                RequestContextState::Running
            };
            self.set_state(tx, &mut ctx, state);
        } else if ctx.rounds_exhausted() {
            self.finish(tx, &mut ctx, false);
        } else {
            self.set_state(tx, &mut ctx, RequestContextState::BatchCompleted);
            tx.store.schedule_new_batch(tx.height, &context_id)?;
            ctx.scheduled_height = Some(tx.height);
        }
        tx.store.set_request_context(&ctx)?;

        info!(context = %context_id, state = %ctx.state, "request context started");
        Ok(())
    }

    /// Complete a context immediately, refunding outstanding requests.
    pub(crate) fn kill_request_context(
        &self,
        tx: &mut TxContext<'_>,
        context_id: RequestContextId,
        consumer: Address,
    ) -> ServiceResult<()> {
        let mut ctx = self.load_owned_context(tx, &context_id, &consumer)?;
        if ctx.state.is_terminal() {
            return Err(ServiceError::transition(context_id, ctx.state, "kill"));
        }

        self.abandon_outstanding(tx, &ctx)?;
        tx.store.clear_responses_of(&context_id)?;
        if let Some(height) = ctx.scheduled_height.take() {
            tx.store.unschedule_new_batch(height, &context_id)?;
        }
        ctx.round_open = false;
        self.finish(tx, &mut ctx, true);
        tx.store.set_request_context(&ctx)?;

        info!(context = %context_id, rounds = ctx.batch_counter, "request context killed");
        Ok(())
    }

    /// Change providers, fee cap, timeout or repetition in place.
    pub(crate) fn update_request_context(
        &self,
        tx: &mut TxContext<'_>,
        context_id: RequestContextId,
        consumer: Address,
        update: ContextUpdate,
    ) -> ServiceResult<()> {
        let ctx = self.load_owned_context(tx, &context_id, &consumer)?;
        if ctx.state.is_terminal() {
            return Err(ServiceError::transition(context_id, ctx.state, "update"));
        }
        if !ctx.repeated && (update.repeated_frequency != 0 || update.repeated_total != 0) {
            return Err(ServiceError::transition(
                context_id,
                ctx.state,
                "change repetition of",
            ));
        }

        // 1. Merge the non-empty fields
        let mut merged = ctx.clone();
        if !update.providers.is_empty() {
            merged.providers = update.providers;
        }
        if !update.service_fee_cap.is_zero() {
            merged.service_fee_cap = update.service_fee_cap;
        }
        if update.timeout != 0 {
            merged.timeout = update.timeout;
        }
        if update.repeated_frequency != 0 {
            merged.repeated_frequency = update.repeated_frequency;
        }
        if update.repeated_total != 0 {
            merged.repeated_total = update.repeated_total;
        }

        // 2. Validate the result as a whole
        if merged.repeated
            && merged.repeated_total != UNLIMITED_REPEATS
            && (merged.repeated_total as u64) < merged.batch_counter
        {
            return Err(ValidationError::InvalidRepeatedTotal(merged.repeated_total).into());
        }
        validate_context(&merged, &tx.params)?;

        // 3. Keep the round queue consistent with the new settings
        if merged.state == RequestContextState::BatchCompleted && merged.rounds_exhausted() {
            if let Some(height) = merged.scheduled_height.take() {
                tx.store.unschedule_new_batch(height, &context_id)?;
            }
            self.finish(tx, &mut merged, false);
        } else if let Some(height) = merged.scheduled_height {
            let next = self.next_round_height(tx, &merged);
            if next != height {
                tx.store.unschedule_new_batch(height, &context_id)?;
                tx.store.schedule_new_batch(next, &context_id)?;
                merged.scheduled_height = Some(next);
            }
        }
        tx.store.set_request_context(&merged)?;

        info!(context = %context_id, "request context updated");
        tx.emit(ServiceEvent::RequestContextUpdated { context_id });
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn load_context(&self, tx: &TxContext<'_>, id: &RequestContextId) -> ServiceResult<RequestContext> {
        tx.store
            .get_request_context(id)?
            .ok_or(ServiceError::UnknownRequestContext(*id))
    }

    fn load_owned_context(
        &self,
        tx: &TxContext<'_>,
        id: &RequestContextId,
        consumer: &Address,
    ) -> ServiceResult<RequestContext> {
        let ctx = self.load_context(tx, id)?;
        if ctx.consumer != *consumer {
            return Err(ServiceError::WrongConsumer(*consumer));
        }
        Ok(ctx)
    }

    /// Change state and tell the context's callback, if any.
    pub(crate) fn set_state(&self, tx: &mut TxContext<'_>, ctx: &mut RequestContext, state: RequestContextState) {
        ctx.state = state;
        if let Some(module_name) = &ctx.module_name {
            tx.notify_state(module_name, ctx.id, state);
        }
    }

    /// Move a context to COMPLETED.
    pub(crate) fn finish(&self, tx: &mut TxContext<'_>, ctx: &mut RequestContext, killed: bool) {
        self.set_state(tx, ctx, RequestContextState::Completed);
        tx.emit(ServiceEvent::RequestContextCompleted {
            context_id: ctx.id,
            killed,
        });
    }
}

/// Deterministic context id: consumer, service, height and a global sequence.
pub fn context_id(consumer: &Address, service_name: &str, height: u64, sequence: u64) -> RequestContextId {
    tagged_hash(
        DOMAIN_REQUEST_CONTEXT,
        &[
            &consumer.0[..],
            service_name.as_bytes(),
            &height.to_be_bytes()[..],
            &sequence.to_be_bytes()[..],
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_crypto::module_address;

    #[test]
    fn test_context_id_is_deterministic_and_unique() {
        let c = module_address("consumer");
        let a = context_id(&c, "s1", 10, 0);
        assert_eq!(a, context_id(&c, "s1", 10, 0));
        assert_ne!(a, context_id(&c, "s1", 10, 1));
        assert_ne!(a, context_id(&c, "s1", 11, 0));
        assert_ne!(a, context_id(&c, "s2", 10, 0));
        assert_ne!(a, context_id(&module_address("other"), "s1", 10, 0));
    }
}
