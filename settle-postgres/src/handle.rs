use crate::{PostgresExecutor, PostgresTransaction, util::block_on};
use settle_core::{
    CancellationToken, Error, FinalizeError, NativeTransaction, Result, TransactionHandle,
};
use std::sync::Arc;
use tokio::runtime::{Handle, RuntimeFlavor};

const COMMIT: &str = "COMMIT";
const ROLLBACK: &str = "ROLLBACK";

/// Handle of a Postgres transaction, to be wrapped in a [`crate::PostgresFinalizer`].
pub struct PostgresTransactionHandle {
    transaction: Arc<PostgresTransaction>,
}

impl PostgresTransactionHandle {
    pub(crate) fn new(transaction: PostgresTransaction) -> Self {
        Self {
            transaction: Arc::new(transaction),
        }
    }

    /// Executor bound to this transaction, it can be moved to other tasks.
    pub fn executor(&self) -> PostgresExecutor {
        PostgresExecutor {
            transaction: self.transaction.clone(),
        }
    }

    pub fn transaction(&self) -> &PostgresTransaction {
        &self.transaction
    }

    /// The token is only checked before sending: once `sql` is queued the server runs it anyway.
    async fn finish_async(&self, sql: &'static str, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            let error =
                Error::new(FinalizeError::Cancelled).context(format!("While sending `{}`", sql));
            log::error!("{:#}", error);
            return Err(error);
        }
        self.transaction.finish(sql).await
    }
}

impl TransactionHandle for PostgresTransactionHandle {
    fn native_transaction(&self) -> Option<&dyn NativeTransaction> {
        Some(&*self.transaction)
    }

    fn commit(&mut self) -> Result<()> {
        block_on(self.transaction.finish(COMMIT))?
    }

    fn commit_async(
        &mut self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send {
        self.finish_async(COMMIT, cancel)
    }

    fn rollback(&mut self) -> Result<()> {
        block_on(self.transaction.finish(ROLLBACK))?
    }

    fn rollback_async(
        &mut self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send {
        self.finish_async(ROLLBACK, cancel)
    }

    fn dispose(&mut self) {
        if !self.transaction.mark_disposed() || self.transaction.is_completed() {
            return;
        }
        match Handle::try_current() {
            // Cannot block the only thread, the rollback completes in the background
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::CurrentThread => {
                let transaction = self.transaction.clone();
                handle.spawn(async move {
                    let _ = transaction.finish(ROLLBACK).await;
                });
            }
            _ => {
                let _ = block_on(self.transaction.finish(ROLLBACK));
            }
        }
    }

    async fn dispose_async(&mut self) {
        if !self.transaction.mark_disposed() || self.transaction.is_completed() {
            return;
        }
        let _ = self.transaction.finish(ROLLBACK).await;
    }
}

impl Drop for PostgresTransactionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}
