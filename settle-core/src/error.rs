use thiserror::Error;

/// Failures raised by the finalizer itself.
///
/// They travel inside [`crate::Error`], match them with `error.downcast_ref::<FinalizeError>()`.
/// Driver errors are never translated into this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FinalizeError {
    #[error("A transaction finalizer requires a transaction handle")]
    NullHandle,
    #[error("Invalid transaction type `{found}`, expected `{expected}`")]
    UnexpectedTransactionType {
        found: &'static str,
        expected: &'static str,
    },
    #[error("The transaction finalization was cancelled while waiting for the connection")]
    Cancelled,
    #[error("Invalid value `{value}` for `{key}`, expected a non negative integer")]
    InvalidConfig { key: &'static str, value: String },
}
