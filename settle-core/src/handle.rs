use crate::{CancellationToken, NativeTransaction, Result};
use std::future::Future;

/// A live database transaction bound to a connection, provided by a driver.
///
/// The finalizer only consumes this capability, it never looks inside the driver.
/// Disposal must be idempotent on the driver side as well: disposing an already
/// disposed (or completed) transaction has no effect.
pub trait TransactionHandle: Send {
    /// The driver transaction, `None` when the handle does not hold one anymore.
    fn native_transaction(&self) -> Option<&dyn NativeTransaction>;

    fn commit(&mut self) -> Result<()>;

    fn commit_async(
        &mut self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> Result<()>;

    fn rollback_async(
        &mut self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;

    fn dispose(&mut self);

    fn dispose_async(&mut self) -> impl Future<Output = ()> + Send;
}
