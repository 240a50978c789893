//! Domain error types for fala-live.
//!
//! The session controller is the only layer that reports failures to the
//! caller, and it distinguishes fatal startup failures from mid-session
//! channel failures. Errors are embedded in `anyhow::Error` so the trait
//! seams keep `anyhow::Result` signatures while callers can downcast:
//! `e.downcast_ref::<SessionError>()`.

use thiserror::Error;

/// Session-level failures surfaced by the controller.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Audio device unavailable or permission denied. Raised before any
    /// channel is opened; no session resources exist afterwards.
    #[error("audio capture unavailable: {0}")]
    Startup(String),

    /// Channel open or mid-session failure. The session is over, but the
    /// transcript gathered so far is preserved and returned by `stop()`.
    /// Not retried automatically; the caller restarts explicitly.
    #[error("live channel failure: {0}")]
    Channel(String),

    /// Operation attempted from a state that does not allow it
    /// (e.g. `start()` on a session that already ran).
    #[error("invalid session state: {0}")]
    InvalidState(&'static str),
}

/// Malformed inbound audio payload. The offending chunk is dropped and
/// the session continues; playback never crashes on bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty audio payload")]
    Empty,

    #[error("audio payload length {0} is not a whole number of 16-bit samples")]
    TruncatedSample(usize),
}
