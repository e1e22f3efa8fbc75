use crate::util::truncate_long;
use settle_core::{ConnectionState, Error, NativeTransaction, Result};
use std::{
    any::Any,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tokio_postgres::Client;

/// A Postgres transaction opened with `BEGIN` on a shared client.
///
/// The connection is reported as executing while at least one statement issued through a
/// [`crate::PostgresExecutor`] is still waiting for its response.
pub struct PostgresTransaction {
    pub(crate) client: Arc<Client>,
    in_flight: AtomicUsize,
    completed: AtomicBool,
    disposed: AtomicBool,
}

impl PostgresTransaction {
    pub(crate) fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            in_flight: AtomicUsize::new(0),
            completed: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    /// Statements currently running on the transaction.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run a client call, counting it as in flight until it resolves.
    pub(crate) async fn track<T, F>(&self, sql: &str, future: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, tokio_postgres::Error>>,
    {
        if self.is_terminal() {
            let error = Error::msg(format!(
                "Cannot run the query on a finished transaction:\n{}",
                truncate_long!(sql)
            ));
            log::error!("{:#}", error);
            return Err(error);
        }
        let _in_flight = InFlight::new(&self.in_flight);
        future.await.map_err(|e| {
            let error =
                Error::new(e).context(format!("While running the query:\n{}", truncate_long!(sql)));
            log::error!("{:#}", error);
            error
        })
    }

    /// Send `COMMIT` or `ROLLBACK`. The transaction is over once the server answered, successfully or not.
    pub(crate) async fn finish(&self, sql: &'static str) -> Result<()> {
        let result = self.client.batch_execute(sql).await;
        self.completed.store(true, Ordering::SeqCst);
        result.map_err(|e| {
            let error = Error::new(e).context(format!("While sending `{}`", sql));
            log::error!("{:#}", error);
            error
        })
    }

    /// Marks the transaction disposed, returns `true` only for the first call.
    pub(crate) fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::SeqCst)
    }
}

impl NativeTransaction for PostgresTransaction {
    fn connection_state(&self) -> Option<ConnectionState> {
        if self.client.is_closed() {
            return Some(ConnectionState::Closed);
        }
        Some(if self.in_flight() > 0 {
            ConnectionState::Executing
        } else {
            ConnectionState::Open
        })
    }

    fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
