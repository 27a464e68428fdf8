//! A single-node chain driving a `ServiceKeeper` block by block.

use std::sync::Arc;

use conduit_crypto::Address;
use conduit_ops::{
    created_context_id, BlockContext, CallService, CallbackRegistry, Command, ServiceEvent, ServiceKeeper,
    ServiceMetrics, ServiceResult,
};
use conduit_store::{KvStore, MemoryKvStore};
use conduit_types::constants::NATIVE_BASE_DENOM;
use conduit_types::{Amount, BlockHeight, RequestContextId, ServiceParams, Timestamp};

use crate::helpers::{flat_pricing, native, test_definition, test_params, TEST_INPUT};
use crate::{MockBank, MockGuardian, MockTokenRegistry, RecordingCallback};

/// Module name the [`RecordingCallback`] is registered under.
pub const CALLBACK_MODULE: &str = "recorder";

/// Block interval in milliseconds.
pub const BLOCK_TIME_MS: Timestamp = 5_000;

/// Genesis block time in milliseconds.
pub const GENESIS_TIME_MS: Timestamp = 1_767_225_600_000;

/// Keeper, store and mocks wired together.
///
/// Commands run at the current `height`. [`next_block`](Self::next_block)
/// runs the block hook for that height and moves on to the next one.
pub struct TestChain {
    pub store: MemoryKvStore,
    pub keeper: ServiceKeeper,
    pub bank: MockBank,
    pub guardian: MockGuardian,
    pub callback: RecordingCallback,
    pub metrics: Arc<ServiceMetrics>,
    pub height: BlockHeight,
    pub time: Timestamp,
}

impl Default for TestChain {
    fn default() -> Self {
        Self::new()
    }
}

impl TestChain {
    pub fn new() -> Self {
        Self::with_params(test_params())
    }

    pub fn with_params(params: ServiceParams) -> Self {
        Self::with_parts(params, MockTokenRegistry::new().with_token("usdt", "uusdt", 6))
    }

    pub fn with_parts(params: ServiceParams, tokens: MockTokenRegistry) -> Self {
        let bank = MockBank::new();
        let guardian = MockGuardian::new();
        let callback = RecordingCallback::new();
        let metrics = Arc::new(ServiceMetrics::new());
        let keeper = ServiceKeeper::new(
            Arc::new(bank.clone()),
            Arc::new(tokens),
            Arc::new(guardian.clone()),
            Arc::new(params),
        )
        .with_callbacks(CallbackRegistry::new().with(CALLBACK_MODULE, Arc::new(callback.clone())))
        .with_metrics(metrics.clone());

        Self {
            store: MemoryKvStore::new(),
            keeper,
            bank,
            guardian,
            callback,
            metrics,
            height: 1,
            time: GENESIS_TIME_MS,
        }
    }

    /// Execute a command in the current block.
    pub fn exec(&mut self, command: Command) -> ServiceResult<Vec<ServiceEvent>> {
        self.keeper
            .execute(BlockContext::new(&mut self.store, self.height, self.time), command)
    }

    /// Close the current block and open the next one.
    pub fn next_block(&mut self) -> Vec<ServiceEvent> {
        let events = self
            .keeper
            .end_block(BlockContext::new(&mut self.store, self.height, self.time))
            .unwrap();
        self.height += 1;
        self.time += BLOCK_TIME_MS;
        events
    }

    /// Close every block up to and including `height`.
    pub fn advance_through(&mut self, height: BlockHeight) -> Vec<ServiceEvent> {
        let mut events = Vec::new();
        while self.height <= height {
            events.extend(self.next_block());
        }
        events
    }

    /// Jump the clock forward without producing blocks.
    pub fn advance_time(&mut self, ms: Timestamp) {
        self.time += ms;
    }

    // =========================================================================
    // Balances
    // =========================================================================

    pub fn fund(&mut self, address: &Address, amount: Amount) {
        self.bank.mint(&mut self.store, address, &native(amount));
    }

    /// Native balance of `address`.
    pub fn balance(&self, address: &Address) -> Amount {
        use conduit_ops::Bank;
        self.bank
            .balance(&self.store, address)
            .unwrap()
            .amount_of(NATIVE_BASE_DENOM)
    }

    pub fn total_supply(&self) -> Amount {
        self.bank
            .total_supply(&self.store)
            .amount_of(NATIVE_BASE_DENOM)
    }

    pub fn store(&self) -> &dyn KvStore {
        &self.store
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    /// Define `name` and bind every `(provider, price)` pair with a
    /// sufficient deposit.
    pub fn setup_service(&mut self, name: &str, providers: &[(Address, Amount)]) {
        let author = crate::helpers::test_address("author");
        self.exec(Command::DefineService {
            definition: test_definition(name, author),
        })
        .unwrap();
        for (provider, price) in providers {
            let deposit = (price * 10).max(1_000);
            self.fund(provider, deposit);
            self.exec(Command::BindService {
                service_name: name.to_string(),
                provider: *provider,
                deposit: native(deposit),
                pricing: flat_pricing(&format!("{}acdt", price)),
            })
            .unwrap();
        }
    }

    /// Issue a one-shot call and return its context id.
    pub fn call(&mut self, call: CallService) -> ServiceResult<RequestContextId> {
        let events = self.exec(Command::CallService(call))?;
        Ok(created_context_id(&events).unwrap())
    }

    /// A call builder with the standard test input.
    pub fn call_builder(
        &self,
        service_name: &str,
        providers: Vec<Address>,
        consumer: Address,
        timeout: u64,
    ) -> CallService {
        CallService::new(service_name, providers, consumer, TEST_INPUT, timeout)
    }
}
