//! Durable persistence for jobs, results, and the queue state machine.
//!
//! The only implementation today is [`SqliteStore`], a single-file SQLite
//! database accessed through a mutex-guarded connection. Callers should
//! depend on the [`StateStore`] trait, not on `SqliteStore` directly.

mod error;
mod sqlite_store;
mod state_store;

pub use error::{StoreError, StoreResult};
pub use sqlite_store::SqliteStore;
pub use state_store::{StateStore, StoreSummary};
