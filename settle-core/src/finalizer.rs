use crate::{
    BusyWait, CancellationToken, Error, FinalizeError, FinalizerConfig, NativeTransaction,
    Result, Step, TransactionCoordinator, TransactionHandle,
};
use std::{
    any::type_name,
    fmt::{self, Display, Formatter},
    future::Future,
    marker::PhantomData,
    thread,
};

/// Concludes a transaction on behalf of a coordinator.
pub trait TransactionFinalizer: Send {
    fn commit(&mut self, coordinator: &dyn TransactionCoordinator) -> Result<()>;

    fn commit_async(
        &mut self,
        coordinator: &dyn TransactionCoordinator,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;

    /// The `error` that caused the rollback is informational only.
    fn rollback(
        &mut self,
        coordinator: &dyn TransactionCoordinator,
        error: Option<&Error>,
    ) -> Result<()>;

    fn rollback_async(
        &mut self,
        coordinator: &dyn TransactionCoordinator,
        error: Option<&Error>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send;

    fn dispose(&mut self);

    fn dispose_async(&mut self) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finalization {
    Commit,
    Rollback,
}

impl Display for Finalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Finalization::Commit => "commit",
            Finalization::Rollback => "rollback",
        })
    }
}

/// Finalizer that waits for the connection to stop executing before committing or rolling back.
///
/// It owns the handle: dropping or disposing the finalizer disposes the handle, exactly once.
/// `N` is the driver transaction the handle is expected to carry, anything else is rejected
/// with [`FinalizeError::UnexpectedTransactionType`] before waiting or delegating.
pub struct BusyWaitFinalizer<H: TransactionHandle, N: NativeTransaction> {
    handle: H,
    config: FinalizerConfig,
    disposed: bool,
    _native: PhantomData<fn() -> N>,
}

impl<H: TransactionHandle, N: NativeTransaction> BusyWaitFinalizer<H, N> {
    pub fn new(handle: H, config: FinalizerConfig) -> Self {
        Self {
            handle,
            config,
            disposed: false,
            _native: PhantomData,
        }
    }

    pub fn try_new(handle: Option<H>, config: FinalizerConfig) -> Result<Self> {
        match handle {
            Some(handle) => Ok(Self::new(handle, config)),
            None => {
                let error = Error::new(FinalizeError::NullHandle);
                log::error!("{:#}", error);
                Err(error)
            }
        }
    }

    pub fn config(&self) -> &FinalizerConfig {
        &self.config
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn native(&self) -> Result<&N> {
        let native = self.handle.native_transaction();
        native
            .and_then(|v| v.as_any().downcast_ref::<N>())
            .ok_or_else(|| {
                let error = Error::new(FinalizeError::UnexpectedTransactionType {
                    found: native.map_or("<none>", |v| v.type_name()),
                    expected: type_name::<N>(),
                });
                log::error!("{:#}", error);
                error
            })
    }

    /// Next step of the poll, the native transaction is checked again every time.
    fn step(&self, busy_wait: &mut BusyWait) -> Result<Step> {
        Ok(busy_wait.step(self.native()?))
    }

    fn finalize_blocking(
        &mut self,
        finalization: Finalization,
        coordinator: &dyn TransactionCoordinator,
    ) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        let transaction_id = coordinator.transaction_id();
        let mut busy_wait = BusyWait::new(self.config);
        loop {
            let step = self.step(&mut busy_wait)?;
            match step {
                Step::Wait(duration) => {
                    log::debug!(
                        "Transaction {} waiting {:?} for the connection before {}",
                        transaction_id,
                        duration,
                        finalization
                    );
                    thread::sleep(duration);
                }
                Step::Skip => {
                    log::debug!(
                        "Transaction {} already completed, skipping {}",
                        transaction_id,
                        finalization
                    );
                    return Ok(());
                }
                Step::Finalize => break,
            }
        }
        log::debug!(
            "Transaction {} {} after {} waits",
            transaction_id,
            finalization,
            busy_wait.iterations()
        );
        match finalization {
            Finalization::Commit => self.handle.commit(),
            Finalization::Rollback => self.handle.rollback(),
        }
    }

    async fn finalize_async(
        &mut self,
        finalization: Finalization,
        coordinator: &dyn TransactionCoordinator,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if self.disposed {
            return Ok(());
        }
        let transaction_id = coordinator.transaction_id();
        let mut busy_wait = BusyWait::new(self.config);
        loop {
            let step = self.step(&mut busy_wait)?;
            match step {
                Step::Wait(duration) => {
                    log::debug!(
                        "Transaction {} waiting {:?} for the connection before {}",
                        transaction_id,
                        duration,
                        finalization
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            let error = Error::new(FinalizeError::Cancelled)
                                .context(format!("While trying to {} transaction {}", finalization, transaction_id));
                            log::error!("{:#}", error);
                            return Err(error);
                        }
                        _ = tokio::time::sleep(duration) => {}
                    }
                }
                Step::Skip => {
                    log::debug!(
                        "Transaction {} already completed, skipping {}",
                        transaction_id,
                        finalization
                    );
                    return Ok(());
                }
                Step::Finalize => break,
            }
        }
        log::debug!(
            "Transaction {} {} after {} waits",
            transaction_id,
            finalization,
            busy_wait.iterations()
        );
        match finalization {
            Finalization::Commit => self.handle.commit_async(cancel).await,
            Finalization::Rollback => self.handle.rollback_async(cancel).await,
        }
    }
}

impl<H: TransactionHandle, N: NativeTransaction> TransactionFinalizer for BusyWaitFinalizer<H, N> {
    fn commit(&mut self, coordinator: &dyn TransactionCoordinator) -> Result<()> {
        self.finalize_blocking(Finalization::Commit, coordinator)
    }

    fn commit_async(
        &mut self,
        coordinator: &dyn TransactionCoordinator,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send {
        self.finalize_async(Finalization::Commit, coordinator, cancel)
    }

    fn rollback(
        &mut self,
        coordinator: &dyn TransactionCoordinator,
        error: Option<&Error>,
    ) -> Result<()> {
        if let Some(error) = error {
            log::debug!(
                "Rolling back transaction {} because of: {:#}",
                coordinator.transaction_id(),
                error
            );
        }
        self.finalize_blocking(Finalization::Rollback, coordinator)
    }

    fn rollback_async(
        &mut self,
        coordinator: &dyn TransactionCoordinator,
        error: Option<&Error>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<()>> + Send {
        if let Some(error) = error {
            log::debug!(
                "Rolling back transaction {} because of: {:#}",
                coordinator.transaction_id(),
                error
            );
        }
        self.finalize_async(Finalization::Rollback, coordinator, cancel)
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.handle.dispose();
    }

    async fn dispose_async(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.handle.dispose_async().await;
    }
}

impl<H: TransactionHandle, N: NativeTransaction> Drop for BusyWaitFinalizer<H, N> {
    fn drop(&mut self) {
        self.dispose();
    }
}
