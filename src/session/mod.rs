//! Live session management
//!
//! This module provides the `LiveSession` controller that owns:
//! - The duplex channel lifecycle (open, event dispatch, close)
//! - Forwarding captured audio frames to the remote service
//! - Routing inbound events to playback and transcript aggregation
//! - The session state machine and final transcript hand-off

mod config;
mod controller;
mod state;

pub use config::{ImageArtifact, SessionConfig};
pub use controller::LiveSession;
pub use state::SessionState;
