//! Store-backed balance ledger.
//!
//! [`StoreBank`] keeps one `balance:{address}` record per account in the
//! same key/value store as the service module. Hosts with their own bank
//! module implement [`Bank`] over it instead.

use conduit_crypto::Address;
use conduit_store::codec::{decode, encode};
use conduit_store::KvStore;
use conduit_types::Coins;

use crate::error::BankError;
use crate::traits::Bank;

const BALANCE_PREFIX: &str = "balance:";

fn balance_key(address: &Address) -> Vec<u8> {
    format!("{}{}", BALANCE_PREFIX, address).into_bytes()
}

/// Balance ledger persisted in the shared store.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreBank;

impl StoreBank {
    pub fn new() -> Self {
        Self
    }

    fn write(&self, store: &mut dyn KvStore, address: &Address, coins: &Coins) -> Result<(), BankError> {
        let key = balance_key(address);
        if coins.is_zero() {
            store.delete(&key)?;
        } else {
            store.set(&key, &encode(coins)?)?;
        }
        Ok(())
    }

    /// Credit an account out of thin air. Genesis and tests only.
    pub fn mint(&self, store: &mut dyn KvStore, address: &Address, amount: &Coins) -> Result<(), BankError> {
        let current = self.balance(store, address)?;
        let next = current
            .checked_add(amount)
            .ok_or_else(|| conduit_store::StoreError::invalid_data("balance overflow"))?;
        self.write(store, address, &next)
    }

    /// Sum of every account balance.
    pub fn total_supply(&self, store: &dyn KvStore) -> Result<Coins, BankError> {
        let mut total = Coins::new();
        for (_, value) in store.prefix(BALANCE_PREFIX.as_bytes())? {
            let coins: Coins = decode(&value)?;
            total = total
                .checked_add(&coins)
                .ok_or_else(|| conduit_store::StoreError::invalid_data("supply overflow"))?;
        }
        Ok(total)
    }
}

impl Bank for StoreBank {
    fn balance(&self, store: &dyn KvStore, address: &Address) -> Result<Coins, BankError> {
        match store.get(&balance_key(address))? {
            Some(bytes) => Ok(decode(&bytes)?),
            None => Ok(Coins::new()),
        }
    }

    fn transfer(
        &self,
        store: &mut dyn KvStore,
        from: &Address,
        to: &Address,
        amount: &Coins,
    ) -> Result<(), BankError> {
        if amount.is_zero() || from == to {
            return Ok(());
        }
        let available = self.balance(store, from)?;
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| BankError::InsufficientFunds {
                address: *from,
                needed: amount.clone(),
                available: available.clone(),
            })?;
        let credited = self
            .balance(store, to)?
            .checked_add(amount)
            .ok_or_else(|| conduit_store::StoreError::invalid_data("balance overflow"))?;
        self.write(store, from, &remaining)?;
        self.write(store, to, &credited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_crypto::module_address;
    use conduit_store::MemoryKvStore;

    #[test]
    fn test_transfer_moves_funds() {
        let mut store = MemoryKvStore::new();
        let bank = StoreBank::new();
        let (a, b) = (module_address("a"), module_address("b"));
        bank.mint(&mut store, &a, &Coins::single("acdt", 100)).unwrap();

        bank.transfer(&mut store, &a, &b, &Coins::single("acdt", 30))
            .unwrap();
        assert_eq!(bank.balance(&store, &a).unwrap(), Coins::single("acdt", 70));
        assert_eq!(bank.balance(&store, &b).unwrap(), Coins::single("acdt", 30));
        assert_eq!(
            bank.total_supply(&store).unwrap(),
            Coins::single("acdt", 100)
        );
    }

    #[test]
    fn test_insufficient_funds() {
        let mut store = MemoryKvStore::new();
        let bank = StoreBank::new();
        let (a, b) = (module_address("a"), module_address("b"));
        bank.mint(&mut store, &a, &Coins::single("acdt", 5)).unwrap();

        let err = bank
            .transfer(&mut store, &a, &b, &Coins::single("acdt", 6))
            .unwrap_err();
        assert!(matches!(err, BankError::InsufficientFunds { .. }));
        assert_eq!(bank.balance(&store, &a).unwrap(), Coins::single("acdt", 5));
    }

    #[test]
    fn test_emptied_account_removed() {
        let mut store = MemoryKvStore::new();
        let bank = StoreBank::new();
        let (a, b) = (module_address("a"), module_address("b"));
        bank.mint(&mut store, &a, &Coins::single("acdt", 5)).unwrap();
        bank.transfer(&mut store, &a, &b, &Coins::single("acdt", 5))
            .unwrap();
        assert_eq!(store.len(), 1);
    }
}
