use uuid::Uuid;

/// The unit of work driving a finalizer.
///
/// Finalizers receive it as context only (it ends up in the log records), it never changes
/// how a transaction is finalized.
pub trait TransactionCoordinator: Send + Sync {
    fn transaction_id(&self) -> Uuid;
}

impl TransactionCoordinator for Uuid {
    fn transaction_id(&self) -> Uuid {
        *self
    }
}
