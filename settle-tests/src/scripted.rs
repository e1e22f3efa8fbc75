use settle_core::{
    CancellationToken, ConnectionState, Error, FinalizeError, NativeTransaction, Result,
    TransactionHandle,
};
use std::{
    any::Any,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

/// Transaction whose connection reports `Executing` for a scripted number of polls.
#[derive(Debug, Default)]
pub struct ScriptedTransaction {
    busy_polls: u32,
    polls: AtomicU32,
    completed: AtomicBool,
    disposed: AtomicBool,
}

impl ScriptedTransaction {
    pub const FOREVER: u32 = u32::MAX;

    pub fn new(busy_polls: u32) -> Self {
        Self {
            busy_polls,
            ..Default::default()
        }
    }

    /// Times the connection state was looked at.
    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn mark_completed(&self) {
        self.completed.store(true, Ordering::SeqCst);
    }

    pub fn mark_disposed(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

impl NativeTransaction for ScriptedTransaction {
    fn connection_state(&self) -> Option<ConnectionState> {
        let polls = self.polls.fetch_add(1, Ordering::SeqCst);
        Some(if self.busy_polls == Self::FOREVER || polls < self.busy_polls {
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

/// A transaction of some other driver, never executing.
#[derive(Debug, Default)]
pub struct ForeignTransaction;

impl NativeTransaction for ForeignTransaction {
    fn connection_state(&self) -> Option<ConnectionState> {
        Some(ConnectionState::Open)
    }
    fn is_completed(&self) -> bool {
        false
    }
    fn is_disposed(&self) -> bool {
        false
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Number of times each handle operation was invoked.
#[derive(Debug, Default)]
pub struct Calls {
    pub commit: AtomicU32,
    pub commit_async: AtomicU32,
    pub rollback: AtomicU32,
    pub rollback_async: AtomicU32,
    pub dispose: AtomicU32,
    pub dispose_async: AtomicU32,
}

impl Calls {
    pub fn commits(&self) -> u32 {
        self.commit.load(Ordering::SeqCst) + self.commit_async.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> u32 {
        self.rollback.load(Ordering::SeqCst) + self.rollback_async.load(Ordering::SeqCst)
    }

    pub fn disposals(&self) -> u32 {
        self.dispose.load(Ordering::SeqCst) + self.dispose_async.load(Ordering::SeqCst)
    }

    /// Every finalizing call, sync and async.
    pub fn finalizations(&self) -> u32 {
        self.commits() + self.rollbacks()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Native {
    #[default]
    Scripted,
    Foreign,
    Missing,
}

/// Handle over a [`ScriptedTransaction`], recording every call it receives.
///
/// Keep a [`ScriptedHandle::probe`] before moving the handle into a finalizer to observe it.
#[derive(Debug)]
pub struct ScriptedHandle {
    transaction: Arc<ScriptedTransaction>,
    foreign: ForeignTransaction,
    native: Native,
    calls: Arc<Calls>,
    failure: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Probe {
    pub transaction: Arc<ScriptedTransaction>,
    pub calls: Arc<Calls>,
}

impl ScriptedHandle {
    pub fn new(busy_polls: u32) -> Self {
        Self {
            transaction: Arc::new(ScriptedTransaction::new(busy_polls)),
            foreign: ForeignTransaction,
            native: Native::Scripted,
            calls: Default::default(),
            failure: None,
        }
    }

    pub fn idle() -> Self {
        Self::new(0)
    }

    pub fn busy_forever() -> Self {
        Self::new(ScriptedTransaction::FOREVER)
    }

    /// Expose a transaction of another driver.
    pub fn foreign(mut self) -> Self {
        self.native = Native::Foreign;
        self
    }

    /// Expose no transaction at all.
    pub fn missing(mut self) -> Self {
        self.native = Native::Missing;
        self
    }

    /// Commit and rollback fail with `message`, like a driver rejecting them.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn probe(&self) -> Probe {
        Probe {
            transaction: self.transaction.clone(),
            calls: self.calls.clone(),
        }
    }

    fn finalize(&self) -> Result<()> {
        if let Some(message) = &self.failure {
            return Err(Error::msg(message.clone()));
        }
        self.transaction.mark_completed();
        Ok(())
    }

    fn check_cancel(cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(FinalizeError::Cancelled.into());
        }
        Ok(())
    }
}

impl TransactionHandle for ScriptedHandle {
    fn native_transaction(&self) -> Option<&dyn NativeTransaction> {
        match self.native {
            Native::Scripted => Some(&*self.transaction),
            Native::Foreign => Some(&self.foreign),
            Native::Missing => None,
        }
    }

    fn commit(&mut self) -> Result<()> {
        self.calls.commit.fetch_add(1, Ordering::SeqCst);
        self.finalize()
    }

    async fn commit_async(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.calls.commit_async.fetch_add(1, Ordering::SeqCst);
        Self::check_cancel(cancel)?;
        tokio::task::yield_now().await;
        self.finalize()
    }

    fn rollback(&mut self) -> Result<()> {
        self.calls.rollback.fetch_add(1, Ordering::SeqCst);
        self.finalize()
    }

    async fn rollback_async(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.calls.rollback_async.fetch_add(1, Ordering::SeqCst);
        Self::check_cancel(cancel)?;
        tokio::task::yield_now().await;
        self.finalize()
    }

    fn dispose(&mut self) {
        self.calls.dispose.fetch_add(1, Ordering::SeqCst);
        self.transaction.mark_disposed();
    }

    async fn dispose_async(&mut self) {
        self.calls.dispose_async.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.transaction.mark_disposed();
    }
}
