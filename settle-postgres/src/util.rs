use settle_core::{Error, Result};
use std::{
    fmt::{self, Display, Formatter},
    future::Future,
};
use tokio::{
    runtime::{Handle, RuntimeFlavor},
    task::block_in_place,
};

/// First characters of a query, for the error context.
macro_rules! truncate_long {
    ($query:expr) => {
        $crate::util::TruncateLong($query)
    };
}
pub(crate) use truncate_long;

const TRUNCATE_AT: usize = 497;

pub(crate) struct TruncateLong<'a>(pub &'a str);

impl Display for TruncateLong<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let query = self.0;
        if query.len() <= TRUNCATE_AT {
            return f.write_str(query.trim_end());
        }
        let mut end = TRUNCATE_AT;
        while !query.is_char_boundary(end) {
            end -= 1;
        }
        write!(f, "{}...", query[..end].trim_end())
    }
}

/// Drive a client future to completion from a blocking caller.
///
/// The connection task lives on the tokio runtime, so a single threaded runtime cannot make
/// progress while its only thread is blocked here.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    match Handle::try_current() {
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => {
                let error = Error::msg(
                    "Cannot block on a Postgres transaction from a current thread runtime, use the async variant instead",
                );
                log::error!("{:#}", error);
                Err(error)
            }
            _ => Ok(block_in_place(|| handle.block_on(future))),
        },
        Err(..) => Ok(futures::executor::block_on(future)),
    }
}
