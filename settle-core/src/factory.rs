use crate::{
    BusyWaitFinalizer, FinalizerConfig, NativeTransaction, Result, TransactionFinalizer,
    TransactionHandle,
};
use std::marker::PhantomData;

/// Builds the finalizer a coordinator uses for a transaction handle.
pub trait FinalizerFactory<H: TransactionHandle> {
    type Finalizer: TransactionFinalizer;

    /// Fails with [`crate::FinalizeError::NullHandle`] when `handle` is `None`.
    fn create(
        &self,
        handle: Option<H>,
        config: FinalizerConfig,
    ) -> Result<Self::Finalizer>;

    fn create_default(&self, handle: Option<H>) -> Result<Self::Finalizer> {
        self.create(handle, FinalizerConfig::default())
    }
}

/// Factory of [`BusyWaitFinalizer`] bound to the driver transaction `N`.
pub struct BusyWaitFinalizerFactory<N: NativeTransaction>(PhantomData<fn() -> N>);

impl<N: NativeTransaction> BusyWaitFinalizerFactory<N> {
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<N: NativeTransaction> Default for BusyWaitFinalizerFactory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: TransactionHandle, N: NativeTransaction> FinalizerFactory<H>
    for BusyWaitFinalizerFactory<N>
{
    type Finalizer = BusyWaitFinalizer<H, N>;

    fn create(
        &self,
        handle: Option<H>,
        config: FinalizerConfig,
    ) -> Result<BusyWaitFinalizer<H, N>> {
        BusyWaitFinalizer::try_new(handle, config)
    }
}
