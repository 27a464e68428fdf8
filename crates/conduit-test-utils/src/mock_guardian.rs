//! Mock role registry.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use conduit_crypto::Address;
use conduit_ops::{Guardian, Role};

/// Grants exactly the roles it was told to.
#[derive(Clone, Default)]
pub struct MockGuardian {
    grants: Arc<RwLock<HashSet<(Address, Role)>>>,
}

impl MockGuardian {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(self, address: Address, role: Role) -> Self {
        self.grant(address, role);
        self
    }

    pub fn grant(&self, address: Address, role: Role) {
        self.grants.write().unwrap().insert((address, role));
    }

    pub fn revoke(&self, address: &Address, role: Role) {
        self.grants.write().unwrap().remove(&(*address, role));
    }
}

impl Guardian for MockGuardian {
    fn has_role(&self, address: &Address, role: Role) -> bool {
        self.grants.read().unwrap().contains(&(*address, role))
    }
}
