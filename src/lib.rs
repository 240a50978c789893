pub mod audio;
pub mod channel;
pub mod config;
pub mod errors;
pub mod playback;
pub mod session;
pub mod transcript;

pub use audio::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource, WavTap,
};
pub use channel::{
    ChannelConfig, ChannelEvent, ChannelSink, LiveChannel, NatsChannel, ServerContent,
};
pub use config::Config;
pub use errors::{DecodeError, SessionError};
pub use playback::{
    AudioSink, ChunkSchedule, NullSink, PlaybackChunk, PlaybackScheduler, SpeakerSink,
};
pub use session::{ImageArtifact, LiveSession, SessionConfig, SessionState};
pub use transcript::{Message, TranscriptAggregator, TurnSide};
