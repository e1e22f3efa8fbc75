use crate::ConnectionState;
use std::any::{Any, type_name};

/// The driver level transaction object a [`TransactionHandle`](crate::TransactionHandle) wraps.
///
/// Every method takes `&self`: the state can be changed concurrently by other
/// tasks holding the same transaction (a statement still running, someone
/// disposing it), drivers are expected to back it with atomics.
pub trait NativeTransaction: Any + Send + Sync {
    /// State of the connection the transaction is bound to.
    ///
    /// `None` when the transaction is not bound to a connection anymore, this is treated as idle.
    fn connection_state(&self) -> Option<ConnectionState>;

    fn is_completed(&self) -> bool;

    fn is_disposed(&self) -> bool;

    /// Either committed, rolled back or disposed: nothing left to finalize.
    fn is_terminal(&self) -> bool {
        self.is_completed() || self.is_disposed()
    }

    fn is_executing(&self) -> bool {
        self.connection_state()
            .is_some_and(|state| state.is_executing())
    }

    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str {
        type_name::<Self>()
    }
}

