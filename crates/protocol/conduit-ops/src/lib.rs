//! Service invocation operations for the Conduit ledger.
//!
//! This crate combines the foundation crates (store, valid, econ, types,
//! crypto) into the service keeper: providers register and bind services,
//! consumers open request contexts, the block hook dispatches and expires
//! rounds, and responses settle fees and feed callbacks.
//!
//! # Module Organization
//!
//! - [`keeper`] - `ServiceKeeper`, block context and atomic execution
//! - [`command`] - The commands the keeper accepts and their stateless checks
//! - [`definition`] - Service definitions
//! - [`binding`] - Provider bindings and deposits
//! - [`fees`] - Earned fees, withdraw addresses and tax
//! - [`context`] - Request context lifecycle
//! - [`scheduler`] - Round dispatch, completion, expiry and the new-batch queue
//! - [`response`] - Provider responses
//! - [`query`] - Read-only queries
//! - [`bank`] - A store-backed `Bank`
//! - [`traits`] - Injected collaborators and callbacks
//! - [`events`] - Events emitted by committed operations
//! - [`metrics`] - Prometheus metrics
//! - [`config`] - Parameter files
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use conduit_crypto::module_address;
//! use conduit_econ::NativeOnly;
//! use conduit_ops::{BlockContext, Command, Guardian, Role, ServiceKeeper, StoreBank};
//! use conduit_store::MemoryKvStore;
//! use conduit_types::{ServiceDefinition, ServiceParams};
//!
//! struct Nobody;
//! impl Guardian for Nobody {
//!     fn has_role(&self, _: &conduit_crypto::Address, _: Role) -> bool {
//!         false
//!     }
//! }
//!
//! let keeper = ServiceKeeper::new(
//!     Arc::new(StoreBank::new()),
//!     Arc::new(NativeOnly),
//!     Arc::new(Nobody),
//!     Arc::new(ServiceParams::default()),
//! );
//!
//! let mut store = MemoryKvStore::new();
//! let definition = ServiceDefinition {
//!     name: "price-feed".into(),
//!     description: "spot prices".into(),
//!     tags: vec!["oracle".into()],
//!     author: module_address("author"),
//!     author_description: String::new(),
//!     schemas: r#"{"input":{"type":"object"},"output":{"type":"object"},"error":{"type":"object"}}"#.into(),
//! };
//!
//! let events = keeper
//!     .execute(BlockContext::new(&mut store, 1, 0), Command::DefineService { definition })
//!     .unwrap();
//! assert_eq!(events.len(), 1);
//! assert!(keeper.query_definition(&store, "price-feed").is_ok());
//! ```
//!
//! # Execution Model
//!
//! Every command and every `end_block` call runs against a write buffer over
//! the caller's store. Balances live in the same store when the
//! [`StoreBank`] is used, so fee escrow and state changes commit together or
//! not at all. Callbacks run only after a successful commit.

pub mod bank;
pub mod binding;
pub mod command;
pub mod config;
pub mod context;
pub mod definition;
pub mod error;
pub mod events;
pub mod fees;
pub mod keeper;
pub mod metrics;
pub mod query;
pub mod response;
pub mod scheduler;
pub mod traits;

// Keeper
pub use keeper::{
    deposit_account, request_account, tax_account, BlockContext, ServiceKeeper, DEPOSIT_ACCOUNT, REQUEST_ACCOUNT,
    TAX_ACCOUNT,
};

// Commands
pub use command::{CallService, Command, ContextUpdate};
pub use context::context_id;

// Events and metrics
pub use events::{created_context_id, issued_requests, ServiceEvent};
pub use metrics::ServiceMetrics;

// Error types
pub use error::{BankError, ServiceError, ServiceResult};

// Collaborators
pub use bank::StoreBank;
pub use traits::{Bank, CallbackRegistry, Guardian, ParamSource, ResponseCallback, Role, RoundResult};

// Configuration
pub use config::{load_params, params_from_toml, save_params};
