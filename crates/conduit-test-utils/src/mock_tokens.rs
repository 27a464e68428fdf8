//! Token registry with a fixed set of extra tokens.

use std::collections::HashMap;

use conduit_econ::{TokenInfo, TokenRegistry};

/// Resolves the units it was configured with, on top of the native ones.
#[derive(Debug, Clone, Default)]
pub struct MockTokenRegistry {
    tokens: HashMap<String, TokenInfo>,
}

impl MockTokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `unit` as a display unit of `denom` with `decimals`.
    pub fn with_token(mut self, unit: &str, denom: &str, decimals: u32) -> Self {
        self.tokens
            .insert(unit.to_string(), TokenInfo::new(denom, decimals));
        self
    }
}

impl TokenRegistry for MockTokenRegistry {
    fn resolve_unit(&self, unit: &str) -> Option<TokenInfo> {
        self.tokens.get(unit).cloned()
    }
}
