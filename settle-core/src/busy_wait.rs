use crate::{FinalizerConfig, NativeTransaction};
use std::time::Duration;

/// What a finalizer must do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The connection is executing, wait before looking again.
    Wait(Duration),
    /// Delegate the commit or rollback to the handle.
    Finalize,
    /// The transaction is already completed or disposed, nothing to do.
    Skip,
}

/// Bounded poll of the connection state, shared by the blocking and the async finalization.
///
/// Each call to [`BusyWait::step`] looks at the transaction once. It answers [`Step::Wait`]
/// at most `max_poll_iterations` times, the caller performs the wait and asks again.
#[derive(Debug, Clone)]
pub struct BusyWait {
    config: FinalizerConfig,
    iterations: u32,
}

impl BusyWait {
    pub const fn new(config: FinalizerConfig) -> Self {
        Self {
            config,
            iterations: 0,
        }
    }

    /// Number of waits handed out so far.
    pub const fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn step(&mut self, transaction: &dyn NativeTransaction) -> Step {
        if transaction.is_terminal() {
            return Step::Skip;
        }
        if !transaction.is_executing() {
            return Step::Finalize;
        }
        if self.iterations < self.config.max_poll_iterations {
            self.iterations += 1;
            return Step::Wait(self.config.poll_interval);
        }
        log::warn!(
            "Connection still executing after {} waits of {:?}, finalizing anyway",
            self.iterations,
            self.config.poll_interval,
        );
        Step::Finalize
    }
}
