//! The simulation driver.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use conduit_crypto::{module_address, Address};
use conduit_econ::{min_deposit, parse_pricing, NativeOnly};
use conduit_ops::{
    tax_account, Bank, BlockContext, CallService, CallbackRegistry, Command, ContextUpdate, Guardian, ResponseCallback,
    Role, RoundResult, ServiceEvent, ServiceKeeper, ServiceMetrics, StoreBank,
};
use conduit_store::{KvStore, ServiceStore};
use conduit_types::constants::{NATIVE_BASE_DENOM, UNLIMITED_REPEATS};
use conduit_types::{Amount, BlockHeight, Coins, RequestContextState, ServiceDefinition, ServiceParams, Timestamp};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::invariants;
use crate::report::SimReport;

/// Callback module the simulator registers.
pub const SIM_CALLBACK: &str = "sim";

const BLOCK_TIME_MS: Timestamp = 5_000;
const GENESIS_TIME_MS: Timestamp = 1_767_225_600_000;
const CONSUMER_FUNDING: Amount = 20_000;

const SCHEMAS: &str = r#"{
    "input": {"type":"object","properties":{"pair":{"type":"string"}},"required":["pair"]},
    "output": {"type":"object","properties":{"rate":{"type":"number"}},"required":["rate"]},
    "error": {"type":"object"}
}"#;

/// Grants the profiler and trustee roles to one address each.
struct SimGuardian {
    profiler: Address,
    trustee: Address,
}

impl Guardian for SimGuardian {
    fn has_role(&self, address: &Address, role: Role) -> bool {
        match role {
            Role::Profiler => *address == self.profiler,
            Role::Trustee => *address == self.trustee,
        }
    }
}

/// Counts delivered rounds.
#[derive(Default)]
struct RoundCounter(AtomicU64);

impl ResponseCallback for RoundCounter {
    fn on_round_complete(&self, round: &RoundResult) {
        debug!(context = %round.context_id, batch = round.batch_counter, responses = round.responses.len(), "round delivered");
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// Simulation sizing.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub seed: u64,
    pub providers: usize,
    pub consumers: usize,
    pub services: usize,
    pub actions_per_block: usize,
}

/// A keeper, a store and a population of actors driven by a seeded RNG.
pub struct Simulation {
    keeper: ServiceKeeper,
    store: Box<dyn KvStore>,
    bank: StoreBank,
    rounds: Arc<RoundCounter>,
    rng: StdRng,
    config: SimConfig,
    providers: Vec<Address>,
    consumers: Vec<Address>,
    services: Vec<String>,
    profiler: Address,
    trustee: Address,
    height: BlockHeight,
    time: Timestamp,
    minted: Coins,
    report: SimReport,
}

impl Simulation {
    pub fn new(
        config: SimConfig,
        params: ServiceParams,
        store: Box<dyn KvStore>,
        metrics: Arc<ServiceMetrics>,
    ) -> Result<Self> {
        let profiler = module_address("sim/profiler");
        let trustee = module_address("sim/trustee");
        let rounds = Arc::new(RoundCounter::default());
        let bank = StoreBank::new();

        let keeper = ServiceKeeper::new(
            Arc::new(bank),
            Arc::new(NativeOnly),
            Arc::new(SimGuardian { profiler, trustee }),
            Arc::new(params),
        )
        .with_callbacks(CallbackRegistry::new().with(SIM_CALLBACK, rounds.clone()))
        .with_metrics(metrics);

        let mut sim = Self {
            keeper,
            store,
            bank,
            rounds,
            rng: StdRng::seed_from_u64(config.seed),
            providers: (0..config.providers)
                .map(|i| module_address(&format!("sim/provider/{}", i)))
                .collect(),
            consumers: (0..config.consumers)
                .map(|i| module_address(&format!("sim/consumer/{}", i)))
                .collect(),
            services: (0..config.services).map(|i| format!("feed-{}", i)).collect(),
            config,
            profiler,
            trustee,
            height: 1,
            time: GENESIS_TIME_MS,
            minted: Coins::new(),
            report: SimReport::default(),
        };
        sim.report.seed = sim.config.seed;
        sim.genesis()?;
        Ok(sim)
    }

    /// Define every service and bind every provider to it.
    fn genesis(&mut self) -> Result<()> {
        let author = module_address("sim/author");
        let params = self.keeper.params();

        for name in self.services.clone() {
            self.submit(Command::DefineService {
                definition: ServiceDefinition {
                    name: name.clone(),
                    description: format!("{} price feed", name),
                    tags: vec!["oracle".into(), "sim".into()],
                    author,
                    author_description: "simulator".into(),
                    schemas: SCHEMAS.into(),
                },
            })
            .with_context(|| format!("defining {}", name))?;

            for provider in self.providers.clone() {
                let price: Amount = self.rng.gen_range(1..=100);
                let raw = format!(r#"{{"price":"{}{}"}}"#, price, NATIVE_BASE_DENOM);
                let pricing = parse_pricing(&raw, &NativeOnly)?;
                let deposit = min_deposit(&pricing, &params)
                    .checked_mul(2)
                    .context("deposit overflow")?;
                self.mint(&provider, &deposit)?;
                self.submit(Command::BindService {
                    service_name: name.clone(),
                    provider,
                    deposit,
                    pricing: raw,
                })
                .with_context(|| format!("binding {} to {}", name, provider))?;
            }
        }

        for consumer in self.consumers.clone() {
            self.mint(&consumer, &Coins::single(NATIVE_BASE_DENOM, CONSUMER_FUNDING))?;
        }
        info!(
            services = self.services.len(),
            providers = self.providers.len(),
            consumers = self.consumers.len(),
            "genesis complete"
        );
        Ok(())
    }

    fn mint(&mut self, address: &Address, amount: &Coins) -> Result<()> {
        self.bank.mint(self.store.as_mut(), address, amount)?;
        self.minted = self
            .minted
            .checked_add(amount)
            .context("minted supply overflow")?;
        Ok(())
    }

    /// Run `blocks` blocks, checking invariants after each.
    pub fn run(mut self, blocks: u64) -> Result<SimReport> {
        for _ in 0..blocks {
            self.step()?;
        }
        self.finish()
    }

    fn step(&mut self) -> Result<()> {
        for _ in 0..self.config.actions_per_block {
            let command = self.random_command()?;
            if let Some(command) = command {
                // Rejections are part of the workload
                let _ = self.submit(command);
            }
        }
        if self.rng.gen_bool(0.05) {
            let consumer = *self.consumers.choose(&mut self.rng).context("no consumers")?;
            self.mint(&consumer, &Coins::single(NATIVE_BASE_DENOM, CONSUMER_FUNDING / 4))?;
        }

        let events = self
            .keeper
            .end_block(BlockContext::new(self.store.as_mut(), self.height, self.time))
            .with_context(|| format!("end block {}", self.height))?;
        self.tally(&events);

        let supply = self.bank.total_supply(self.store.as_ref())?;
        invariants::check(
            &self.keeper,
            self.store.as_ref(),
            self.height,
            &self.providers,
            &self.minted,
            &supply,
        )
        .with_context(|| format!("invariant violated at height {}", self.height))?;

        debug!(height = self.height, events = events.len(), "block closed");
        self.height += 1;
        self.time += BLOCK_TIME_MS;
        self.report.blocks += 1;
        Ok(())
    }

    fn submit(&mut self, command: Command) -> conduit_ops::ServiceResult<()> {
        let result = self
            .keeper
            .execute(BlockContext::new(self.store.as_mut(), self.height, self.time), command);
        match result {
            Ok(events) => {
                self.report.commands_accepted += 1;
                self.tally(&events);
                Ok(())
            }
            Err(e) => {
                self.report.commands_rejected += 1;
                *self
                    .report
                    .rejections
                    .entry(e.error_code().to_string())
                    .or_insert(0) += 1;
                Err(e)
            }
        }
    }

    fn tally(&mut self, events: &[ServiceEvent]) {
        for event in events {
            *self.report.events.entry(event.kind().to_string()).or_insert(0) += 1;
        }
    }

    fn finish(mut self) -> Result<SimReport> {
        let store = self.store.as_ref();
        self.report.rounds_delivered = self.rounds.0.load(Ordering::Relaxed);
        self.report.open_contexts = store
            .all_request_contexts()?
            .iter()
            .filter(|c| c.state != RequestContextState::Completed)
            .count();
        self.report.active_requests = store.all_requests()?.len();
        self.report.total_supply = self.bank.total_supply(store)?.to_string();
        info!(blocks = self.report.blocks, "simulation finished");
        Ok(self.report)
    }

    // =========================================================================
    // Random workload
    // =========================================================================

    fn random_command(&mut self) -> Result<Option<Command>> {
        let roll = self.rng.gen_range(0..100);
        let command = match roll {
            0..=29 => Some(self.random_call()),
            30..=59 => self.random_response()?,
            60..=79 => self.random_context_command()?,
            80..=91 => self.random_binding_command(),
            92..=96 => {
                let provider = *self.providers.choose(&mut self.rng).context("no providers")?;
                Some(Command::WithdrawEarnedFees { provider })
            }
            _ => {
                let pool = self.bank.balance(self.store.as_ref(), &tax_account())?;
                let amount = pool.amount_of(NATIVE_BASE_DENOM);
                (amount > 0).then(|| Command::WithdrawTax {
                    trustee: self.trustee,
                    destination: self.trustee,
                    amount: Coins::single(NATIVE_BASE_DENOM, self.rng.gen_range(1..=amount)),
                })
            }
        };
        Ok(command)
    }

    fn random_call(&mut self) -> Command {
        let params = self.keeper.params();
        let service_name = self.services[self.rng.gen_range(0..self.services.len())].clone();
        let max_providers = self.providers.len().min(params.max_providers_per_request);
        let count = self.rng.gen_range(1..=max_providers);
        let providers: Vec<Address> = self
            .providers
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();
        let super_mode = self.rng.gen_bool(0.05);
        let consumer = if super_mode {
            self.profiler
        } else {
            self.consumers[self.rng.gen_range(0..self.consumers.len())]
        };
        let timeout = self.rng.gen_range(1..=params.max_request_timeout.min(10));

        let mut call = CallService::new(service_name, providers, consumer, r#"{"pair":"cdt-usdt"}"#, timeout)
            .with_threshold(self.rng.gen_range(0..=count as u32));
        if super_mode {
            call = call.super_mode();
        }
        if self.rng.gen_bool(0.3) {
            let total = if self.rng.gen_bool(0.1) {
                UNLIMITED_REPEATS
            } else {
                self.rng.gen_range(1..=5)
            };
            call = call.repeated(timeout + self.rng.gen_range(0..5), total);
        }
        if self.rng.gen_bool(0.2) {
            call = call.with_fee_cap(Coins::single(
                NATIVE_BASE_DENOM,
                self.rng.gen_range(1..=100) * count as Amount,
            ));
        }
        if self.rng.gen_bool(0.5) {
            call = call.with_callback(SIM_CALLBACK);
        }
        Command::CallService(call)
    }

    fn random_response(&mut self) -> Result<Option<Command>> {
        let requests = self.store.all_requests()?;
        let Some(request) = requests.choose(&mut self.rng) else {
            return Ok(None);
        };
        let command = if self.rng.gen_bool(0.8) {
            Command::RespondService {
                request_id: request.id,
                provider: request.provider,
                result: r#"{"code":200,"message":"ok"}"#.into(),
                output: Some(format!(r#"{{"rate":{}}}"#, self.rng.gen_range(1..1000))),
            }
        } else {
            Command::RespondService {
                request_id: request.id,
                provider: request.provider,
                result: r#"{"code":500,"message":"unavailable"}"#.into(),
                output: None,
            }
        };
        Ok(Some(command))
    }

    fn random_context_command(&mut self) -> Result<Option<Command>> {
        let contexts: Vec<_> = self
            .store
            .all_request_contexts()?
            .into_iter()
            .filter(|c| c.state != RequestContextState::Completed)
            .collect();
        let Some(ctx) = contexts.choose(&mut self.rng) else {
            return Ok(None);
        };
        let (context_id, consumer) = (ctx.id, ctx.consumer);
        let command = match self.rng.gen_range(0..4) {
            0 => Command::PauseRequestContext { context_id, consumer },
            1 => Command::StartRequestContext { context_id, consumer },
            2 => Command::KillRequestContext { context_id, consumer },
            _ => Command::UpdateRequestContext {
                context_id,
                consumer,
                update: ContextUpdate {
                    timeout: self.rng.gen_range(1..=10),
                    ..Default::default()
                },
            },
        };
        Ok(Some(command))
    }

    fn random_binding_command(&mut self) -> Option<Command> {
        let service_name = self.services.choose(&mut self.rng)?.clone();
        let provider = *self.providers.choose(&mut self.rng)?;
        let command = match self.rng.gen_range(0..4) {
            0 => Command::DisableServiceBinding { service_name, provider },
            1 => Command::EnableServiceBinding {
                service_name,
                provider,
                deposit: Coins::new(),
            },
            2 => Command::RefundServiceDeposit { service_name, provider },
            _ => Command::UpdateServiceBinding {
                service_name,
                provider,
                deposit: Coins::new(),
                pricing: format!(r#"{{"price":"{}{}"}}"#, self.rng.gen_range(1..=50), NATIVE_BASE_DENOM),
            },
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_store::MemoryKvStore;

    fn config(seed: u64) -> SimConfig {
        SimConfig {
            seed,
            providers: 4,
            consumers: 3,
            services: 2,
            actions_per_block: 8,
        }
    }

    fn params() -> ServiceParams {
        ServiceParams::default()
            .with_min_deposit_amount(1_000)
            .with_min_deposit_multiple(10)
            .with_refund_delays(20_000, 20_000)
    }

    fn run(seed: u64, blocks: u64) -> SimReport {
        let sim = Simulation::new(
            config(seed),
            params(),
            Box::new(MemoryKvStore::new()),
            Arc::new(ServiceMetrics::new()),
        )
        .unwrap();
        sim.run(blocks).unwrap()
    }

    #[test]
    fn test_invariants_hold_across_seeds() {
        for seed in [1, 7, 42] {
            let report = run(seed, 60);
            assert_eq!(report.blocks, 60);
            assert!(report.event_count("new_request") > 0);
        }
    }

    #[test]
    fn test_same_seed_replays_identically() {
        let a = run(9, 40);
        let b = run(9, 40);
        assert_eq!(a.events, b.events);
        assert_eq!(a.rejections, b.rejections);
        assert_eq!(a.total_supply, b.total_supply);
    }
}
