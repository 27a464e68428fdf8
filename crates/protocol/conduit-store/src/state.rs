//! Typed access to service module records.
//!
//! [`ServiceStore`] is implemented for every [`KvStore`], so the keeper can
//! call `store.get_binding(..)` on a branch, a memory store or SQLite alike.

use conduit_crypto::Address;
use conduit_types::{
    BlockHeight, Coins, Pricing, Request, RequestContext, RequestContextId, RequestId, Response,
    ServiceBinding, ServiceDefinition,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{decode, encode};
use crate::error::{Result, StoreError};
use crate::keys;
use crate::traits::KvStore;

fn load<T: DeserializeOwned, S: KvStore + ?Sized>(store: &S, key: &[u8]) -> Result<Option<T>> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

fn save<T: Serialize, S: KvStore + ?Sized>(store: &mut S, key: &[u8], value: &T) -> Result<()> {
    let bytes = encode(value)?;
    store.set(key, &bytes)
}

fn load_all<T: DeserializeOwned, S: KvStore + ?Sized>(store: &S, prefix: &[u8]) -> Result<Vec<T>> {
    store
        .prefix(prefix)?
        .into_iter()
        .map(|(_, v)| decode(&v))
        .collect()
}

/// Record-level operations over a key/value store.
pub trait ServiceStore: KvStore {
    // =========================================================================
    // Definitions
    // =========================================================================

    fn get_definition(&self, name: &str) -> Result<Option<ServiceDefinition>> {
        load(self, &keys::definition(name))
    }

    fn set_definition(&mut self, definition: &ServiceDefinition) -> Result<()> {
        save(self, &keys::definition(&definition.name), definition)
    }

    // =========================================================================
    // Bindings and pricing
    // =========================================================================

    fn get_binding(&self, name: &str, provider: &Address) -> Result<Option<ServiceBinding>> {
        load(self, &keys::binding(name, provider))
    }

    fn set_binding(&mut self, binding: &ServiceBinding) -> Result<()> {
        save(
            self,
            &keys::binding(&binding.service_name, &binding.provider),
            binding,
        )
    }

    /// Bindings of one service in provider order.
    fn bindings_of(&self, name: &str) -> Result<Vec<ServiceBinding>> {
        load_all(self, &keys::bindings_of(name))
    }

    /// Bindings of every service in (service, provider) order.
    fn all_bindings(&self) -> Result<Vec<ServiceBinding>> {
        load_all(self, &keys::all_bindings())
    }

    fn get_pricing(&self, name: &str, provider: &Address) -> Result<Option<Pricing>> {
        load(self, &keys::pricing(name, provider))
    }

    fn set_pricing(&mut self, name: &str, provider: &Address, pricing: &Pricing) -> Result<()> {
        save(self, &keys::pricing(name, provider), pricing)
    }

    // =========================================================================
    // Fee ledger
    // =========================================================================

    /// Payout address of a provider; the provider itself unless set.
    fn get_withdraw_address(&self, provider: &Address) -> Result<Address> {
        Ok(load(self, &keys::withdraw_address(provider))?.unwrap_or(*provider))
    }

    fn set_withdraw_address(&mut self, provider: &Address, withdraw: &Address) -> Result<()> {
        save(self, &keys::withdraw_address(provider), withdraw)
    }

    fn get_earned_fees(&self, provider: &Address) -> Result<Coins> {
        Ok(load(self, &keys::earned_fees(provider))?.unwrap_or_default())
    }

    /// Store a provider's earned fees; an empty balance removes the entry.
    fn set_earned_fees(&mut self, provider: &Address, fees: &Coins) -> Result<()> {
        let key = keys::earned_fees(provider);
        if fees.is_zero() {
            self.delete(&key)
        } else {
            save(self, &key, fees)
        }
    }

    fn get_request_volume(&self, consumer: &Address, name: &str, provider: &Address) -> Result<u64> {
        Ok(load(self, &keys::request_volume(consumer, name, provider))?.unwrap_or(0))
    }

    fn increment_request_volume(&mut self, consumer: &Address, name: &str, provider: &Address) -> Result<u64> {
        let next = self
            .get_request_volume(consumer, name, provider)?
            .saturating_add(1);
        save(self, &keys::request_volume(consumer, name, provider), &next)?;
        Ok(next)
    }

    // =========================================================================
    // Request contexts
    // =========================================================================

    fn get_request_context(&self, id: &RequestContextId) -> Result<Option<RequestContext>> {
        load(self, &keys::request_context(id))
    }

    fn set_request_context(&mut self, ctx: &RequestContext) -> Result<()> {
        save(self, &keys::request_context(&ctx.id), ctx)
    }

    fn all_request_contexts(&self) -> Result<Vec<RequestContext>> {
        load_all(self, &keys::all_request_contexts())
    }

    /// Return the current context sequence number and advance it.
    fn next_context_sequence(&mut self) -> Result<u64> {
        let key = keys::request_context_sequence();
        let current: u64 = load(self, &key)?.unwrap_or(0);
        save(self, &key, &(current + 1))?;
        Ok(current)
    }

    // =========================================================================
    // Requests
    // =========================================================================

    /// Store a request under its expiration height and index it by context.
    fn set_request(&mut self, request: &Request) -> Result<()> {
        save(
            self,
            &keys::request(request.expiration_height, &request.id),
            request,
        )?;
        save(
            self,
            &keys::active_request(&request.request_context_id, &request.id),
            &request.expiration_height,
        )
    }

    /// Remove a request and its context index entry.
    fn delete_request(&mut self, request: &Request) -> Result<()> {
        self.delete(&keys::request(request.expiration_height, &request.id))?;
        self.delete(&keys::active_request(&request.request_context_id, &request.id))
    }

    /// Look up a pending request by id.
    fn get_active_request(&self, id: &RequestId) -> Result<Option<Request>> {
        let height: Option<BlockHeight> = load(self, &keys::active_request(&id.context_id, id))?;
        match height {
            Some(h) => load(self, &keys::request(h, id)),
            None => Ok(None),
        }
    }

    /// Pending requests of one context in request-id order.
    fn active_requests_of(&self, ctx: &RequestContextId) -> Result<Vec<Request>> {
        let mut out = Vec::new();
        for (key, value) in self.prefix(&keys::active_requests_of(ctx))? {
            let height: BlockHeight = decode(&value)?;
            let id_hex = std::str::from_utf8(&key)
                .ok()
                .and_then(|k| k.rsplit(':').next())
                .ok_or_else(|| StoreError::invalid_data("malformed active request key"))?;
            let id = RequestId::from_hex(id_hex)
                .map_err(|e| StoreError::invalid_data(e.to_string()))?;
            if let Some(request) = load(self, &keys::request(height, &id))? {
                out.push(request);
            }
        }
        Ok(out)
    }

    /// Requests expiring at `height` in request-id order.
    fn requests_expiring_at(&self, height: BlockHeight) -> Result<Vec<Request>> {
        load_all(self, &keys::requests_expiring_at(height))
    }

    /// Every pending request in (expiration height, id) order.
    fn all_requests(&self) -> Result<Vec<Request>> {
        load_all(self, &keys::all_requests())
    }

    // =========================================================================
    // Round queue
    // =========================================================================

    fn schedule_new_batch(&mut self, height: BlockHeight, ctx: &RequestContextId) -> Result<()> {
        save(self, &keys::new_batch(height, ctx), &())
    }

    fn unschedule_new_batch(&mut self, height: BlockHeight, ctx: &RequestContextId) -> Result<()> {
        self.delete(&keys::new_batch(height, ctx))
    }

    /// Contexts whose next round is queued for `height`, in id order.
    fn new_batches_at(&self, height: BlockHeight) -> Result<Vec<RequestContextId>> {
        self.prefix(&keys::new_batches_at(height))?
            .into_iter()
            .map(|(k, _)| {
                keys::context_id_from_new_batch(&k)
                    .ok_or_else(|| StoreError::invalid_data("malformed new batch key"))
            })
            .collect()
    }

    // =========================================================================
    // Responses
    // =========================================================================

    fn set_response(&mut self, response: &Response) -> Result<()> {
        save(
            self,
            &keys::response(&response.request_context_id, &response.request_id),
            response,
        )
    }

    /// Stored responses of a context's current round in request-id order.
    fn responses_of(&self, ctx: &RequestContextId) -> Result<Vec<Response>> {
        load_all(self, &keys::responses_of(ctx))
    }

    fn clear_responses_of(&mut self, ctx: &RequestContextId) -> Result<()> {
        for (key, _) in self.prefix(&keys::responses_of(ctx))? {
            self.delete(&key)?;
        }
        Ok(())
    }
}

impl<S: KvStore + ?Sized> ServiceStore for S {}
