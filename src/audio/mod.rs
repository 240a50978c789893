pub mod backend;
pub mod mic;
pub mod recorder;

pub use backend::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
    ScriptedBackend,
};
pub use mic::MicBackend;
pub use recorder::WavTap;
