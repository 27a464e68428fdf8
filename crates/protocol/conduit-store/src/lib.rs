//! Deterministic key/value storage for the Conduit service module.
//!
//! Every piece of service state lives in one ordered byte-keyed store:
//!
//! - **Definitions and bindings**: what services exist and who provides them
//! - **Fee ledger**: earned fees, withdraw addresses, request volumes
//! - **Request contexts**: invocation state machines and their sequence
//! - **Height indexes**: pending requests by expiration, rounds by start height
//! - **Responses**: replies collected for the current round
//!
//! Two backends implement [`KvStore`]: [`MemoryKvStore`] for tests and
//! simulation, and [`SqliteKvStore`] for persisted state. Commands run
//! against a [`KvBranch`] so a failed command leaves no partial writes.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.conduit/
//! ├── params.toml      # Module parameters
//! └── conduit.db       # SQLite: single `kv` table
//! ```
//!
//! # Example
//!
//! ```
//! use conduit_store::{KvBranch, MemoryKvStore, ServiceStore};
//!
//! let mut store = MemoryKvStore::new();
//! let mut branch = KvBranch::new(&mut store);
//! let seq = branch.next_context_sequence().unwrap();
//! assert_eq!(seq, 0);
//! branch.commit().unwrap();
//! assert_eq!(store.next_context_sequence().unwrap(), 1);
//! ```

pub mod branch;
pub mod codec;
pub mod error;
pub mod keys;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod state;
pub mod traits;

pub use branch::KvBranch;
pub use error::{Result, StoreError};
pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;
pub use state::ServiceStore;
pub use traits::{Entry, KvStore, Write};

use std::path::PathBuf;

/// Database file name inside the data directory.
pub const DATABASE_FILE: &str = "conduit.db";

/// Get the default data directory for persisted module state.
///
/// Priority:
/// 1. `CONDUIT_DATA_DIR` environment variable (if set)
/// 2. Platform-specific data directory
/// 3. Fallback to `$HOME/.conduit`
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CONDUIT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    directories::ProjectDirs::from("io", "conduit", "conduit")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".conduit")
        })
}
