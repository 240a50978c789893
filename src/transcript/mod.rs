//! Transcript aggregation
//!
//! Turns the remote service's incremental transcription events into a
//! committed, ordered message history. Each side of the conversation has
//! at most one open partial accumulator at a time; accumulators become
//! immutable `Message`s only on an explicit turn-complete signal (or on
//! session flush), in user-before-AI order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which side of the conversation a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnSide {
    User,
    Ai,
}

impl std::fmt::Display for TurnSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnSide::User => write!(f, "user"),
            TurnSide::Ai => write!(f, "ai"),
        }
    }
}

/// One committed transcript entry. Immutable once appended to history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub side: TurnSide,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Accumulates partial transcription text per side and commits it to an
/// append-only history.
///
/// History order equals commit order, which equals the order in which the
/// remote service reported turn completion. Nothing outside this type
/// touches the accumulators.
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    user_partial: String,
    ai_partial: String,
    history: Vec<Message>,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenate a transcription delta onto the side's open accumulator.
    /// Does not commit.
    pub fn append_partial(&mut self, side: TurnSide, delta: &str) {
        match side {
            TurnSide::User => self.user_partial.push_str(delta),
            TurnSide::Ai => self.ai_partial.push_str(delta),
        }
    }

    /// Commit both open accumulators on a turn-complete signal, user
    /// before AI (natural turn order). A turn-complete with both
    /// accumulators empty is a no-op.
    pub fn commit_turn(&mut self) {
        self.commit_side(TurnSide::User);
        self.commit_side(TurnSide::Ai);
    }

    /// Clear the AI accumulator without emitting a message. Called on
    /// barge-in: pre-empted AI speech was never delivered to the user.
    /// The user accumulator survives untouched.
    pub fn discard_ai_partial(&mut self) {
        if !self.ai_partial.is_empty() {
            debug!("discarding interrupted AI partial ({} chars)", self.ai_partial.len());
        }
        self.ai_partial.clear();
    }

    /// Commit any still-open accumulator on session stop, so a hangup
    /// never silently drops the last thing said. Idempotent: emitting
    /// clears the accumulator, so a second flush produces nothing.
    pub fn flush(&mut self) {
        self.commit_side(TurnSide::User);
        self.commit_side(TurnSide::Ai);
    }

    fn commit_side(&mut self, side: TurnSide) {
        let partial = match side {
            TurnSide::User => &mut self.user_partial,
            TurnSide::Ai => &mut self.ai_partial,
        };

        // Whitespace-only partials are treated as empty and never committed.
        if partial.trim().is_empty() {
            partial.clear();
            return;
        }

        let text = std::mem::take(partial);
        debug!("committing {} message ({} chars)", side, text.len());
        self.history.push(Message {
            side,
            text,
            timestamp: Utc::now(),
        });
    }

    /// Committed history, in commit order.
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Current open partial for one side (for live display).
    pub fn partial(&self, side: TurnSide) -> &str {
        match side {
            TurnSide::User => &self.user_partial,
            TurnSide::Ai => &self.ai_partial,
        }
    }
}
