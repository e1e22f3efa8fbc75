pub use settle_core::*;
