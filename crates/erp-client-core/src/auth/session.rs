/// Session lifecycle notifications broadcast by the client.
///
/// `SessionTerminated` means the refresh protocol failed and the stored
/// session was cleared; collaborators should route the user to login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    TokensRefreshed,
    LoggedOut,
    SessionTerminated,
}

/// Buffered events per subscriber before the oldest are dropped
pub(crate) const SESSION_EVENT_CAPACITY: usize = 16;
