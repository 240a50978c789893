/// Live session lifecycle state.
///
/// One instance per session. Transitions are monotonic: `Error` and
/// `Closed` are terminal, and there is no path back to `Idle` short of
/// constructing a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Error,
    Closed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Error | SessionState::Closed)
    }

    /// Whether `to` is a legal next state. `Closed` is reachable from any
    /// non-terminal state because stop() is safe to call at any time.
    pub(crate) fn can_transition(self, to: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, to),
            (Idle, Connecting)
                | (Connecting, Open)
                | (Connecting, Error)
                | (Open, Error)
                | (Idle, Closed)
                | (Connecting, Closed)
                | (Open, Closed)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Error => "error",
            SessionState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}
