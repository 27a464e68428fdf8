//! Service binding operations.
//!
//! A binding is a provider's offer for one service: a deposit held in the
//! deposit account, a pricing document and an availability flag. While a
//! binding is available its deposit must cover the minimum deposit implied
//! by its pricing.

use conduit_crypto::Address;
use conduit_econ::{min_deposit, parse_pricing};
use conduit_store::ServiceStore;
use conduit_types::{Coins, Pricing, ServiceBinding};
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::events::ServiceEvent;
use crate::keeper::{deposit_account, ServiceKeeper, TxContext};

impl ServiceKeeper {
    /// Bind a defined service as a provider.
    pub(crate) fn bind_service(
        &self,
        tx: &mut TxContext<'_>,
        service_name: &str,
        provider: Address,
        deposit: Coins,
        raw_pricing: &str,
    ) -> ServiceResult<()> {
        // 1. The service must be defined and not yet bound by this provider
        if tx.store.get_definition(service_name)?.is_none() {
            return Err(ServiceError::UnknownDefinition(service_name.to_string()));
        }
        if tx.store.get_binding(service_name, &provider)?.is_some() {
            return Err(ServiceError::BindingExists {
                service_name: service_name.to_string(),
                provider,
            });
        }

        // 2. Parse pricing and check the deposit floor
        let pricing = parse_pricing(raw_pricing, &*self.tokens)?;
        self.check_min_deposit(tx, &deposit, &pricing)?;

        // 3. Lock the deposit
        self.bank
            .transfer(&mut tx.store, &provider, &deposit_account(), &deposit)?;

        // 4. Store binding and parsed pricing
        let binding = ServiceBinding {
            service_name: service_name.to_string(),
            provider,
            deposit: deposit.clone(),
            pricing: raw_pricing.to_string(),
            available: true,
            disabled_time: 0,
        };
        tx.store.set_binding(&binding)?;
        tx.store.set_pricing(service_name, &provider, &pricing)?;

        info!(service = %service_name, provider = %provider, deposit = %deposit, "service bound");
        tx.emit(ServiceEvent::ServiceBound {
            service_name: service_name.to_string(),
            provider,
            deposit,
        });
        Ok(())
    }

    /// Add deposit and/or replace pricing. Empty values mean "no change".
    pub(crate) fn update_service_binding(
        &self,
        tx: &mut TxContext<'_>,
        service_name: &str,
        provider: Address,
        added_deposit: Coins,
        raw_pricing: &str,
    ) -> ServiceResult<()> {
        let mut binding = self.load_binding(tx, service_name, provider)?;

        let mut pricing = None;
        if !raw_pricing.trim().is_empty() {
            pricing = Some(parse_pricing(raw_pricing, &*self.tokens)?);
            binding.pricing = raw_pricing.to_string();
        }
        if !added_deposit.is_zero() {
            binding.deposit = add_coins(&binding.deposit, &added_deposit)?;
        }

        let changed = pricing.is_some() || !added_deposit.is_zero();
        if binding.available && changed {
            let current = match &pricing {
                Some(p) => p.clone(),
                None => self.load_pricing(tx, service_name, &provider)?,
            };
            self.check_min_deposit(tx, &binding.deposit, &current)?;
        }

        if !added_deposit.is_zero() {
            self.bank
                .transfer(&mut tx.store, &provider, &deposit_account(), &added_deposit)?;
        }

        tx.store.set_binding(&binding)?;
        if let Some(p) = &pricing {
            tx.store.set_pricing(service_name, &provider, p)?;
        }

        info!(service = %service_name, provider = %provider, deposit = %binding.deposit, "service binding updated");
        tx.emit(ServiceEvent::BindingUpdated {
            service_name: service_name.to_string(),
            provider,
        });
        Ok(())
    }

    /// Take a binding out of service; starts the refund delay.
    pub(crate) fn disable_service_binding(
        &self,
        tx: &mut TxContext<'_>,
        service_name: &str,
        provider: Address,
    ) -> ServiceResult<()> {
        let mut binding = self.load_binding(tx, service_name, provider)?;
        if !binding.available {
            return Err(ServiceError::BindingUnavailable);
        }

        binding.available = false;
        binding.disabled_time = tx.time;
        tx.store.set_binding(&binding)?;

        info!(service = %service_name, provider = %provider, at = tx.time, "service binding disabled");
        tx.emit(ServiceEvent::BindingDisabled {
            service_name: service_name.to_string(),
            provider,
        });
        Ok(())
    }

    /// Put a disabled binding back in service, optionally topping up its deposit.
    pub(crate) fn enable_service_binding(
        &self,
        tx: &mut TxContext<'_>,
        service_name: &str,
        provider: Address,
        added_deposit: Coins,
    ) -> ServiceResult<()> {
        let mut binding = self.load_binding(tx, service_name, provider)?;
        if binding.available {
            return Err(ServiceError::BindingAvailable);
        }

        binding.deposit = add_coins(&binding.deposit, &added_deposit)?;
        let pricing = self.load_pricing(tx, service_name, &provider)?;
        self.check_min_deposit(tx, &binding.deposit, &pricing)?;

        self.bank
            .transfer(&mut tx.store, &provider, &deposit_account(), &added_deposit)?;

        binding.available = true;
        binding.disabled_time = 0;
        tx.store.set_binding(&binding)?;

        info!(service = %service_name, provider = %provider, deposit = %binding.deposit, "service binding enabled");
        tx.emit(ServiceEvent::BindingEnabled {
            service_name: service_name.to_string(),
            provider,
        });
        Ok(())
    }

    /// Return a disabled binding's deposit once the dispute window has passed.
    pub(crate) fn refund_service_deposit(
        &self,
        tx: &mut TxContext<'_>,
        service_name: &str,
        provider: Address,
    ) -> ServiceResult<()> {
        let mut binding = self.load_binding(tx, service_name, provider)?;
        if binding.available {
            return Err(ServiceError::BindingAvailable);
        }
        if binding.deposit.is_zero() {
            return Err(ServiceError::NoDeposit);
        }

        let refundable_at = binding.refundable_at(
            tx.params.arbitration_time_limit_ms,
            tx.params.complaint_retrospect_ms,
        );
        if tx.time < refundable_at {
            return Err(ServiceError::IncorrectRefundTime {
                refundable_at,
                now: tx.time,
            });
        }

        let amount = std::mem::take(&mut binding.deposit);
        self.bank
            .transfer(&mut tx.store, &deposit_account(), &provider, &amount)?;
        tx.store.set_binding(&binding)?;

        info!(service = %service_name, provider = %provider, amount = %amount, "deposit refunded");
        tx.emit(ServiceEvent::DepositRefunded {
            service_name: service_name.to_string(),
            provider,
            amount,
        });
        Ok(())
    }

    /// Refund every binding's deposit, disabling bindings still in service.
    pub(crate) fn refund_every_deposit(&self, tx: &mut TxContext<'_>) -> ServiceResult<()> {
        let bindings = tx.store.all_bindings()?;
        let mut refunded = 0usize;

        for mut binding in bindings {
            if binding.deposit.is_zero() {
                continue;
            }
            let amount = std::mem::take(&mut binding.deposit);
            self.bank
                .transfer(&mut tx.store, &deposit_account(), &binding.provider, &amount)?;

            let was_available = binding.available;
            if was_available {
                binding.available = false;
                binding.disabled_time = tx.time;
            }
            tx.store.set_binding(&binding)?;

            if was_available {
                tx.emit(ServiceEvent::BindingDisabled {
                    service_name: binding.service_name.clone(),
                    provider: binding.provider,
                });
            }
            tx.emit(ServiceEvent::DepositRefunded {
                service_name: binding.service_name,
                provider: binding.provider,
                amount,
            });
            refunded += 1;
        }

        info!(bindings = refunded, "all service deposits refunded");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn load_binding(
        &self,
        tx: &TxContext<'_>,
        service_name: &str,
        provider: Address,
    ) -> ServiceResult<ServiceBinding> {
        tx.store
            .get_binding(service_name, &provider)?
            .ok_or_else(|| ServiceError::UnknownBinding {
                service_name: service_name.to_string(),
                provider,
            })
    }

    pub(crate) fn load_pricing(&self, tx: &TxContext<'_>, service_name: &str, provider: &Address) -> ServiceResult<Pricing> {
        tx.store
            .get_pricing(service_name, provider)?
            .ok_or_else(|| ServiceError::internal(format!("binding {}/{} has no pricing", service_name, provider)))
    }

    fn check_min_deposit(&self, tx: &TxContext<'_>, deposit: &Coins, pricing: &Pricing) -> ServiceResult<()> {
        let required = min_deposit(pricing, &tx.params);
        if !deposit.is_all_gte(&required) {
            return Err(ServiceError::InsufficientDeposit {
                required,
                actual: deposit.clone(),
            });
        }
        Ok(())
    }
}

pub(crate) fn add_coins(a: &Coins, b: &Coins) -> ServiceResult<Coins> {
    a.checked_add(b)
        .ok_or_else(|| ServiceError::internal("coin amount overflow"))
}
