use std::fmt::{self, Display, Formatter};

/// State of the connection a transaction is bound to, as reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Closed,
    Open,
    Connecting,
    /// A command is in flight, finalizing the transaction now is unsafe.
    Executing,
    Fetching,
    Broken,
}

impl ConnectionState {
    pub const fn is_executing(&self) -> bool {
        matches!(self, ConnectionState::Executing)
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Open => "open",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Executing => "executing",
            ConnectionState::Fetching => "fetching",
            ConnectionState::Broken => "broken",
        })
    }
}
