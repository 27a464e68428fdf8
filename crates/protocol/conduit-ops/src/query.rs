//! Read-only queries over committed state.

use conduit_crypto::Address;
use conduit_store::{KvStore, ServiceStore};
use conduit_types::{
    BlockHeight, Coins, Pricing, Request, RequestContext, RequestContextId, RequestId, Response, ServiceBinding,
    ServiceDefinition,
};

use crate::error::{ServiceError, ServiceResult};
use crate::keeper::{deposit_account, request_account, tax_account, ServiceKeeper};

impl ServiceKeeper {
    pub fn query_definition(&self, store: &dyn KvStore, service_name: &str) -> ServiceResult<ServiceDefinition> {
        store
            .get_definition(service_name)?
            .ok_or_else(|| ServiceError::UnknownDefinition(service_name.to_string()))
    }

    pub fn query_binding(
        &self,
        store: &dyn KvStore,
        service_name: &str,
        provider: &Address,
    ) -> ServiceResult<ServiceBinding> {
        store
            .get_binding(service_name, provider)?
            .ok_or_else(|| ServiceError::UnknownBinding {
                service_name: service_name.to_string(),
                provider: *provider,
            })
    }

    /// All bindings of a service, ordered by provider.
    pub fn query_bindings(&self, store: &dyn KvStore, service_name: &str) -> ServiceResult<Vec<ServiceBinding>> {
        Ok(store.bindings_of(service_name)?)
    }

    /// The parsed pricing of a binding.
    pub fn query_pricing(&self, store: &dyn KvStore, service_name: &str, provider: &Address) -> ServiceResult<Pricing> {
        store
            .get_pricing(service_name, provider)?
            .ok_or_else(|| ServiceError::UnknownBinding {
                service_name: service_name.to_string(),
                provider: *provider,
            })
    }

    /// Where a provider's earnings go; the provider itself unless set.
    pub fn query_withdraw_address(&self, store: &dyn KvStore, provider: &Address) -> ServiceResult<Address> {
        Ok(store.get_withdraw_address(provider)?)
    }

    pub fn query_request_context(&self, store: &dyn KvStore, id: &RequestContextId) -> ServiceResult<RequestContext> {
        store
            .get_request_context(id)?
            .ok_or(ServiceError::UnknownRequestContext(*id))
    }

    pub fn query_request(&self, store: &dyn KvStore, id: &RequestId) -> ServiceResult<Request> {
        store
            .get_active_request(id)?
            .ok_or_else(|| ServiceError::UnknownRequest(id.to_string()))
    }

    /// Active requests of a context.
    pub fn query_requests(&self, store: &dyn KvStore, id: &RequestContextId) -> ServiceResult<Vec<Request>> {
        Ok(store.active_requests_of(id)?)
    }

    /// Active requests due to expire at `height`.
    pub fn query_requests_by_height(&self, store: &dyn KvStore, height: BlockHeight) -> ServiceResult<Vec<Request>> {
        Ok(store.requests_expiring_at(height)?)
    }

    /// Responses collected for the context's open round.
    pub fn query_responses(&self, store: &dyn KvStore, id: &RequestContextId) -> ServiceResult<Vec<Response>> {
        Ok(store.responses_of(id)?)
    }

    pub fn query_earned_fees(&self, store: &dyn KvStore, provider: &Address) -> ServiceResult<Coins> {
        Ok(store.get_earned_fees(provider)?)
    }

    pub fn query_request_volume(
        &self,
        store: &dyn KvStore,
        consumer: &Address,
        service_name: &str,
        provider: &Address,
    ) -> ServiceResult<u64> {
        Ok(store.get_request_volume(consumer, service_name, provider)?)
    }

    /// Contexts scheduled to start a round at `height`.
    pub fn query_scheduled_rounds(
        &self,
        store: &dyn KvStore,
        height: BlockHeight,
    ) -> ServiceResult<Vec<RequestContextId>> {
        Ok(store.new_batches_at(height)?)
    }

    // =========================================================================
    // Module accounts
    // =========================================================================

    pub fn deposit_pool(&self, store: &dyn KvStore) -> ServiceResult<Coins> {
        Ok(self.bank.balance(store, &deposit_account())?)
    }

    /// Escrowed fees plus unwithdrawn earnings.
    pub fn request_pool(&self, store: &dyn KvStore) -> ServiceResult<Coins> {
        Ok(self.bank.balance(store, &request_account())?)
    }

    pub fn tax_pool(&self, store: &dyn KvStore) -> ServiceResult<Coins> {
        Ok(self.bank.balance(store, &tax_account())?)
    }
}
