//! Data structures for the Conduit service invocation subsystem.
//!
//! This crate defines the records the service module keeps in the ledger
//! store and the vocabulary shared by every other crate.
//!
//! # Module Organization
//!
//! - [`coins`] - Multi-denomination amounts
//! - [`service`] - Service definitions, bindings and pricing
//! - [`context`] - Request contexts, requests and responses
//! - [`params`] - Governance parameters
//! - [`constants`] - Protocol limits and parameter defaults
//! - [`error`] - Stable error codes
//!
//! # Example
//!
//! ```
//! use conduit_types::{Coins, RequestContextState, ServiceParams};
//!
//! let deposit: Coins = "20000acdt".parse().unwrap();
//! assert_eq!(deposit.amount_of("acdt"), 20_000);
//!
//! let params = ServiceParams::default().with_min_deposit_multiple(2);
//! assert_eq!(params.min_deposit_multiple, 2);
//! assert_eq!(RequestContextState::Paused.to_string(), "PAUSED");
//! ```

pub mod coins;
pub mod constants;
pub mod context;
pub mod error;
pub mod params;
pub mod service;

pub use coins::{is_valid_denom, Coins, CoinsError};
pub use context::{
    Request, RequestContext, RequestContextId, RequestContextState, RequestId, Response,
    ResponseResult,
};
pub use error::ErrorCode;
pub use params::{ParamsError, ServiceParams};
pub use service::{Pricing, PromotionByTime, PromotionByVolume, ServiceBinding, ServiceDefinition};

pub use conduit_crypto::{Address, Hash};

/// Token amount in minimal units.
pub type Amount = u128;

/// Block time in milliseconds since Unix epoch.
pub type Timestamp = u64;

/// Block height.
pub type BlockHeight = u64;
