mod connection;
mod executor;
mod handle;
mod transaction;
mod util;

pub use connection::*;
pub use executor::*;
pub use handle::*;
pub use transaction::*;

use settle_core::BusyWaitFinalizer;

/// Finalizer of a Postgres transaction.
pub type PostgresFinalizer = BusyWaitFinalizer<PostgresTransactionHandle, PostgresTransaction>;
