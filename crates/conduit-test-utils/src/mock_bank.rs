//! Mock implementation of the `Bank` trait for testing.
//!
//! Balances are kept in the store exactly as [`StoreBank`] keeps them, so
//! command atomicity still covers transfers. On top of that the mock records
//! every committed-or-not transfer attempt and can be told to refuse them.

use std::sync::{Arc, RwLock};

use conduit_crypto::Address;
use conduit_ops::{Bank, BankError, StoreBank};
use conduit_store::KvStore;
use conduit_types::Coins;

/// One transfer the keeper asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    pub from: Address,
    pub to: Address,
    pub amount: Coins,
}

struct MockBankInner {
    /// Every transfer that went through, in order.
    transfers: Vec<TransferRecord>,
    /// When true, every non-empty transfer fails with insufficient funds.
    should_fail: bool,
}

/// A store-backed bank with call recording and failure injection.
///
/// Uses `Arc<RwLock<...>>` internally, so it is cheap to clone and all
/// clones share the same state.
#[derive(Clone)]
pub struct MockBank {
    store_bank: StoreBank,
    inner: Arc<RwLock<MockBankInner>>,
}

impl Default for MockBank {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBank {
    pub fn new() -> Self {
        Self {
            store_bank: StoreBank::new(),
            inner: Arc::new(RwLock::new(MockBankInner {
                transfers: Vec::new(),
                should_fail: false,
            })),
        }
    }

    /// Configure the mock to refuse all transfers.
    pub fn with_failure(self) -> Self {
        self.inner.write().unwrap().should_fail = true;
        self
    }

    /// Set the failure mode at runtime.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.inner.write().unwrap().should_fail = should_fail;
    }

    /// Credit an account out of thin air.
    pub fn mint(&self, store: &mut dyn KvStore, address: &Address, amount: &Coins) {
        self.store_bank.mint(store, address, amount).unwrap();
    }

    pub fn total_supply(&self, store: &dyn KvStore) -> Coins {
        self.store_bank.total_supply(store).unwrap()
    }

    // =========================================================================
    // Assertion Helpers
    // =========================================================================

    /// All transfers performed, including those of rolled-back commands.
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.inner.read().unwrap().transfers.clone()
    }

    /// Number of transfers into `to`.
    pub fn transfers_to(&self, to: &Address) -> usize {
        self.inner
            .read()
            .unwrap()
            .transfers
            .iter()
            .filter(|t| t.to == *to)
            .count()
    }

    pub fn clear(&self) {
        self.inner.write().unwrap().transfers.clear();
    }
}

impl Bank for MockBank {
    fn balance(&self, store: &dyn KvStore, address: &Address) -> Result<Coins, BankError> {
        self.store_bank.balance(store, address)
    }

    fn transfer(&self, store: &mut dyn KvStore, from: &Address, to: &Address, amount: &Coins) -> Result<(), BankError> {
        if self.inner.read().unwrap().should_fail && !amount.is_zero() {
            return Err(BankError::InsufficientFunds {
                address: *from,
                needed: amount.clone(),
                available: Coins::new(),
            });
        }
        self.store_bank.transfer(store, from, to, amount)?;
        self.inner.write().unwrap().transfers.push(TransferRecord {
            from: *from,
            to: *to,
            amount: amount.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_crypto::module_address;
    use conduit_store::MemoryKvStore;

    #[test]
    fn test_records_transfers() {
        let bank = MockBank::new();
        let mut store = MemoryKvStore::new();
        let (a, b) = (module_address("a"), module_address("b"));
        bank.mint(&mut store, &a, &Coins::single("acdt", 10));

        bank.transfer(&mut store, &a, &b, &Coins::single("acdt", 4)).unwrap();
        assert_eq!(bank.transfers().len(), 1);
        assert_eq!(bank.transfers_to(&b), 1);
        assert_eq!(bank.balance(&store, &b).unwrap(), Coins::single("acdt", 4));
    }

    #[test]
    fn test_failure_mode() {
        let bank = MockBank::new().with_failure();
        let mut store = MemoryKvStore::new();
        let (a, b) = (module_address("a"), module_address("b"));
        bank.mint(&mut store, &a, &Coins::single("acdt", 10));

        let err = bank.transfer(&mut store, &a, &b, &Coins::single("acdt", 1));
        assert!(matches!(err, Err(BankError::InsufficientFunds { .. })));
        assert!(bank.transfers().is_empty());

        bank.set_should_fail(false);
        assert!(bank.transfer(&mut store, &a, &b, &Coins::single("acdt", 1)).is_ok());
    }
}
