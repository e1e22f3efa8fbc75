mod busy_wait;
mod config;
mod connection_state;
mod coordinator;
mod error;
mod factory;
mod finalizer;
mod handle;
mod native;

pub use ::anyhow::Context;
pub use busy_wait::*;
pub use config::*;
pub use connection_state::*;
pub use coordinator::*;
pub use error::*;
pub use factory::*;
pub use finalizer::*;
pub use handle::*;
pub use native::*;
pub use tokio_util::sync::CancellationToken;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
