//! Fee ledger operations.
//!
//! Escrowed request fees and unwithdrawn provider earnings both sit in the
//! request account. Settling a successful request only moves the tax share
//! out to the tax account; the rest is credited to the provider's
//! `earnedFees` record until withdrawn.

use conduit_crypto::Address;
use conduit_econ::split_tax;
use conduit_store::ServiceStore;
use conduit_types::{Coins, Request};
use tracing::{debug, info};

use crate::binding::add_coins;
use crate::error::{ServiceError, ServiceResult};
use crate::events::ServiceEvent;
use crate::keeper::{request_account, tax_account, ServiceKeeper, TxContext};
use crate::traits::Role;

impl ServiceKeeper {
    /// Set the address a provider's earnings are paid to.
    pub(crate) fn set_withdraw_address(
        &self,
        tx: &mut TxContext<'_>,
        provider: Address,
        withdraw_address: Address,
    ) -> ServiceResult<()> {
        tx.store.set_withdraw_address(&provider, &withdraw_address)?;
        info!(provider = %provider, withdraw_address = %withdraw_address, "withdraw address set");
        tx.emit(ServiceEvent::WithdrawAddressSet {
            provider,
            withdraw_address,
        });
        Ok(())
    }

    /// Pay a provider's whole earned balance to its withdraw address.
    pub(crate) fn withdraw_earned_fees(&self, tx: &mut TxContext<'_>, provider: Address) -> ServiceResult<()> {
        let earned = tx.store.get_earned_fees(&provider)?;
        if earned.is_zero() {
            return Err(ServiceError::NoEarnedFees(provider));
        }
        let withdraw_address = tx.store.get_withdraw_address(&provider)?;

        self.bank
            .transfer(&mut tx.store, &request_account(), &withdraw_address, &earned)?;
        tx.store.set_earned_fees(&provider, &Coins::new())?;

        info!(provider = %provider, withdraw_address = %withdraw_address, amount = %earned, "earned fees withdrawn");
        tx.emit(ServiceEvent::EarnedFeesWithdrawn {
            provider,
            withdraw_address,
            amount: earned,
        });
        Ok(())
    }

    /// Move accumulated tax to `destination`. Trustees only.
    pub(crate) fn withdraw_tax(
        &self,
        tx: &mut TxContext<'_>,
        trustee: Address,
        destination: Address,
        amount: Coins,
    ) -> ServiceResult<()> {
        if !self.guardian.has_role(&trustee, Role::Trustee) {
            return Err(ServiceError::Unauthorized {
                address: trustee,
                role: Role::Trustee,
            });
        }

        self.bank
            .transfer(&mut tx.store, &tax_account(), &destination, &amount)?;

        info!(trustee = %trustee, destination = %destination, amount = %amount, "service tax withdrawn");
        tx.emit(ServiceEvent::TaxWithdrawn {
            trustee,
            destination,
            amount,
        });
        Ok(())
    }

    // =========================================================================
    // Settlement helpers
    // =========================================================================

    /// Return a request's escrowed fee to its consumer.
    pub(crate) fn refund_request_fee(&self, tx: &mut TxContext<'_>, request: &Request) -> ServiceResult<()> {
        if request.service_fee.is_zero() {
            return Ok(());
        }
        self.bank.transfer(
            &mut tx.store,
            &request_account(),
            &request.consumer,
            &request.service_fee,
        )?;
        debug!(request = %request.id, consumer = %request.consumer, fee = %request.service_fee, "service fee refunded");
        Ok(())
    }

    /// Credit a request's fee to its provider, minus the tax.
    pub(crate) fn settle_request_fee(&self, tx: &mut TxContext<'_>, request: &Request) -> ServiceResult<()> {
        if request.service_fee.is_zero() {
            return Ok(());
        }
        let (income, tax) = split_tax(&request.service_fee, tx.params.service_fee_tax_ppm);
        if !tax.is_zero() {
            self.bank
                .transfer(&mut tx.store, &request_account(), &tax_account(), &tax)?;
        }

        let earned = tx.store.get_earned_fees(&request.provider)?;
        tx.store
            .set_earned_fees(&request.provider, &add_coins(&earned, &income)?)?;

        debug!(request = %request.id, provider = %request.provider, income = %income, tax = %tax, "service fee settled");
        Ok(())
    }
}
