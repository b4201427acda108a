//! Shared connection state types.

/// Lifecycle of the realtime socket as observed by views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// Connection dropped; events published meanwhile are lost and views
    /// must refetch once the state returns to `Connected`.
    Reconnecting,
    Closed,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connected)
    }
}
