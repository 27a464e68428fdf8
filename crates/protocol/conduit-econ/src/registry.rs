//! Token registry abstraction used to resolve price units.

use conduit_types::constants::{NATIVE_BASE_DENOM, NATIVE_DECIMALS, NATIVE_UNIT};

/// Denomination and decimal exponent of a price unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Minimal denomination amounts are stored in
    pub denom: String,
    /// Fractional digits between the unit and `denom`
    pub decimals: u32,
}

impl TokenInfo {
    pub fn new(denom: impl Into<String>, decimals: u32) -> Self {
        Self {
            denom: denom.into(),
            decimals,
        }
    }
}

/// Lookup of non-native units (`uusdt`, `btc`, ...).
///
/// The ledger's asset module implements this; tests use a mock.
pub trait TokenRegistry {
    /// Resolve a display unit, `None` if the unit is not registered.
    fn resolve_unit(&self, unit: &str) -> Option<TokenInfo>;
}

/// Resolve a unit: the native display unit and the native base denom are
/// built in, everything else goes to the registry.
pub fn resolve_unit<R: TokenRegistry + ?Sized>(registry: &R, unit: &str) -> Option<TokenInfo> {
    match unit {
        NATIVE_UNIT => Some(TokenInfo::new(NATIVE_BASE_DENOM, NATIVE_DECIMALS)),
        NATIVE_BASE_DENOM => Some(TokenInfo::new(NATIVE_BASE_DENOM, 0)),
        other => registry.resolve_unit(other),
    }
}

/// Registry that knows no tokens beyond the native one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeOnly;

impl TokenRegistry for NativeOnly {
    fn resolve_unit(&self, _unit: &str) -> Option<TokenInfo> {
        None
    }
}
