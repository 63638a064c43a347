pub mod error;
pub mod reconcile;
pub mod sqlite;
pub mod store;
pub mod sweep;
pub mod synchronizer;

pub use error::SyncError;
pub use reconcile::{reconcile, Effect, Reconciliation};
pub use sqlite::SqliteOrderStore;
pub use store::{InMemoryOrderStore, OrderStore, StoreError};
pub use sweep::{Sweep, SweepConfig, SweepOutcome, SweepReport};
pub use synchronizer::{Applied, Synchronizer};
