use crate::PostgresTransaction;
use settle_core::Result;
use std::sync::Arc;
use tokio_postgres::{Row, SimpleQueryMessage};

/// Runs statements inside a transaction, from any task.
///
/// While a call is pending the transaction reports its connection as executing.
#[derive(Clone)]
pub struct PostgresExecutor {
    pub(crate) transaction: Arc<PostgresTransaction>,
}

impl PostgresExecutor {
    /// Execute a single statement and return the number of rows affected.
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        let client = &self.transaction.client;
        self.transaction.track(sql, client.execute(sql, &[])).await
    }

    /// Execute one or more statements separated by semicolons.
    pub async fn batch_execute(&self, sql: &str) -> Result<()> {
        let client = &self.transaction.client;
        self.transaction.track(sql, client.batch_execute(sql)).await
    }

    pub async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let client = &self.transaction.client;
        self.transaction.track(sql, client.query(sql, &[])).await
    }

    /// Text protocol query, every value comes back as a string.
    pub async fn simple_query(&self, sql: &str) -> Result<Vec<SimpleQueryMessage>> {
        let client = &self.transaction.client;
        self.transaction.track(sql, client.simple_query(sql)).await
    }
}
