//! Round dispatch, completion and the block-boundary queues.
//!
//! Two height-indexed queues drive everything that happens without a
//! command: requests expire at `request_height + timeout`, and repeated
//! contexts wait in the new-batch queue for their next round.

use conduit_econ::{effective_price, fee_within_cap, per_provider_cap};
use conduit_store::ServiceStore;
use conduit_types::{Coins, Request, RequestContext, RequestContextState, RequestId};
use tracing::{debug, info, warn};

use crate::binding::add_coins;
use crate::error::{BankError, ServiceError, ServiceResult};
use crate::events::ServiceEvent;
use crate::keeper::{request_account, ServiceKeeper, TxContext};
use crate::traits::RoundResult;

impl ServiceKeeper {
    /// Issue one request per eligible provider and escrow their fees.
    ///
    /// Fails without side effects when the consumer cannot cover the round.
    pub(crate) fn start_round(&self, tx: &mut TxContext<'_>, ctx: &mut RequestContext) -> ServiceResult<()> {
        let batch_counter = ctx.batch_counter + 1;
        let cap_share = per_provider_cap(&ctx.service_fee_cap, ctx.providers.len());

        // 1. Price every provider without touching state
        let mut requests = Vec::with_capacity(ctx.providers.len());
        let mut total = Coins::new();
        for (index, provider) in ctx.providers.iter().enumerate() {
            let available = tx
                .store
                .get_binding(&ctx.service_name, provider)?
                .is_some_and(|b| b.available);
            if !available {
                debug!(context = %ctx.id, provider = %provider, "provider skipped: binding unavailable");
                continue;
            }

            let service_fee = if ctx.super_mode {
                Coins::new()
            } else {
                let pricing = self.load_pricing(tx, &ctx.service_name, provider)?;
                let volume = tx
                    .store
                    .get_request_volume(&ctx.consumer, &ctx.service_name, provider)?;
                effective_price(&pricing, tx.time, volume)
            };
            if !fee_within_cap(&service_fee, cap_share.as_ref()) {
                debug!(context = %ctx.id, provider = %provider, fee = %service_fee, "provider skipped: fee above cap");
                continue;
            }

            total = add_coins(&total, &service_fee)?;
            requests.push(Request {
                id: RequestId {
                    context_id: ctx.id,
                    batch_counter,
                    request_height: tx.height,
                    index: index as u16,
                },
                request_context_id: ctx.id,
                batch_counter,
                service_name: ctx.service_name.clone(),
                provider: *provider,
                consumer: ctx.consumer,
                input: ctx.input.clone(),
                service_fee,
                super_mode: ctx.super_mode,
                request_height: tx.height,
                expiration_height: tx.height + ctx.timeout,
            });
        }

        // 2. Escrow the whole round at once
        self.bank
            .transfer(&mut tx.store, &ctx.consumer, &request_account(), &total)?;

        // 3. Open the round
        ctx.batch_counter = batch_counter;
        ctx.batch_height = tx.height;
        ctx.batch_request_count = requests.len() as u32;
        ctx.responded_count = 0;
        ctx.expired_count = 0;
        ctx.round_open = true;
        ctx.scheduled_height = None;
        let state = if ctx.repeated {
            RequestContextState::BatchRunning
        } else {
            RequestContextState::Running
        };
        if ctx.state != state {
            self.set_state(tx, ctx, state);
        }

        for request in &requests {
            tx.store.set_request(request)?;
            if !request.super_mode {
                tx.store
                    .increment_request_volume(&request.consumer, &request.service_name, &request.provider)?;
            }
            tx.emit(ServiceEvent::NewRequest {
                request_id: request.id,
                context_id: ctx.id,
                provider: request.provider,
                service_fee: request.service_fee.clone(),
                expiration_height: request.expiration_height,
            });
        }

        info!(
            context = %ctx.id,
            batch = batch_counter,
            requests = requests.len(),
            escrowed = %total,
            "round started"
        );
        tx.emit(ServiceEvent::RoundStarted {
            context_id: ctx.id,
            batch_counter,
            request_count: ctx.batch_request_count,
        });

        if requests.is_empty() {
            self.complete_round(tx, ctx)?;
        }
        Ok(())
    }

    /// Complete the open round once its threshold is met or nothing is left
    /// outstanding.
    pub(crate) fn check_round(&self, tx: &mut TxContext<'_>, ctx: &mut RequestContext) -> ServiceResult<()> {
        if !ctx.round_open {
            return Ok(());
        }
        let threshold_met = ctx.response_threshold > 0 && ctx.responded_count >= ctx.effective_threshold();
        let settled = ctx.responded_count + ctx.expired_count >= ctx.batch_request_count;
        if threshold_met || settled {
            self.complete_round(tx, ctx)?;
        }
        Ok(())
    }

    fn complete_round(&self, tx: &mut TxContext<'_>, ctx: &mut RequestContext) -> ServiceResult<()> {
        // 1. Late providers lose their request
        self.abandon_outstanding(tx, ctx)?;

        // 2. Hand the collected responses to the callback
        let responses = tx.store.responses_of(&ctx.id)?;
        tx.store.clear_responses_of(&ctx.id)?;
        ctx.round_open = false;

        tx.emit(ServiceEvent::RoundCompleted {
            context_id: ctx.id,
            batch_counter: ctx.batch_counter,
            responded: ctx.responded_count,
            expired: ctx.expired_count,
        });
        if let Some(module_name) = &ctx.module_name {
            let successes = responses.iter().filter(|r| r.result.is_success()).count() as u32;
            let round = RoundResult {
                context_id: ctx.id,
                batch_counter: ctx.batch_counter,
                threshold_met: ctx.batch_request_count > 0 && successes >= ctx.effective_threshold(),
                responses,
            };
            tx.deliver_round(module_name, round);
        }

        // 3. Decide what comes next
        if ctx.rounds_exhausted() {
            self.finish(tx, ctx, false);
            info!(context = %ctx.id, rounds = ctx.batch_counter, "request context completed");
        } else if ctx.state == RequestContextState::Paused {
            debug!(context = %ctx.id, "round completed while paused");
        } else {
            self.set_state(tx, ctx, RequestContextState::BatchCompleted);
            self.schedule_next_round(tx, ctx)?;
        }
        Ok(())
    }

    /// Delete every still-active request of `ctx`, refunding its fee.
    pub(crate) fn abandon_outstanding(&self, tx: &mut TxContext<'_>, ctx: &RequestContext) -> ServiceResult<()> {
        for request in tx.store.active_requests_of(&ctx.id)? {
            tx.store.delete_request(&request)?;
            self.refund_request_fee(tx, &request)?;
            tx.emit(ServiceEvent::RequestAbandoned {
                request_id: request.id,
                provider: request.provider,
            });
        }
        Ok(())
    }

    /// Height the round after the current one is due at.
    pub(crate) fn next_round_height(&self, tx: &TxContext<'_>, ctx: &RequestContext) -> u64 {
        (ctx.batch_height + ctx.round_interval()).max(tx.height)
    }

    fn schedule_next_round(&self, tx: &mut TxContext<'_>, ctx: &mut RequestContext) -> ServiceResult<()> {
        let next = self.next_round_height(tx, ctx);
        tx.store.schedule_new_batch(next, &ctx.id)?;
        ctx.scheduled_height = Some(next);
        debug!(context = %ctx.id, next_height = next, "next round scheduled");
        Ok(())
    }

    // =========================================================================
    // Block hook
    // =========================================================================

    /// Expire every request whose deadline is the current height.
    pub(crate) fn expire_requests(&self, tx: &mut TxContext<'_>) -> ServiceResult<()> {
        for request in tx.store.requests_expiring_at(tx.height)? {
            // An earlier completion in this loop may have abandoned it
            if tx.store.get_active_request(&request.id)?.is_none() {
                continue;
            }
            tx.store.delete_request(&request)?;
            self.refund_request_fee(tx, &request)?;
            debug!(request = %request.id, provider = %request.provider, "request expired");
            tx.emit(ServiceEvent::RequestExpired {
                request_id: request.id,
                provider: request.provider,
            });

            let mut ctx = self.load_context(tx, &request.request_context_id)?;
            ctx.expired_count += 1;
            self.check_round(tx, &mut ctx)?;
            tx.store.set_request_context(&ctx)?;
        }
        Ok(())
    }

    /// Start every round queued for the current height.
    ///
    /// A consumer that cannot pay for a round is paused instead of failing
    /// the whole hook.
    pub(crate) fn dispatch_scheduled_rounds(&self, tx: &mut TxContext<'_>) -> ServiceResult<()> {
        for context_id in tx.store.new_batches_at(tx.height)? {
            tx.store.unschedule_new_batch(tx.height, &context_id)?;
            let Some(mut ctx) = tx.store.get_request_context(&context_id)? else {
                warn!(context = %context_id, "scheduled round for unknown context dropped");
                continue;
            };
            if ctx.state != RequestContextState::BatchCompleted || ctx.scheduled_height != Some(tx.height) {
                debug!(context = %context_id, state = %ctx.state, "stale scheduled round skipped");
                continue;
            }

            ctx.scheduled_height = None;
            match self.start_round(tx, &mut ctx) {
                Ok(()) => {}
                Err(ServiceError::Bank(BankError::InsufficientFunds { needed, available, .. })) => {
                    warn!(
                        context = %context_id,
                        consumer = %ctx.consumer,
                        needed = %needed,
                        available = %available,
                        "consumer cannot pay for round, pausing"
                    );
                    self.set_state(tx, &mut ctx, RequestContextState::Paused);
                    tx.emit(ServiceEvent::RequestContextPaused {
                        context_id,
                        insufficient_balance: true,
                    });
                }
                Err(e) => return Err(e),
            }
            tx.store.set_request_context(&ctx)?;
        }
        Ok(())
    }
}
