use anyhow::Result;
use tokio::sync::mpsc;

/// One fixed-duration slice of captured audio (mono i16 PCM,
/// gain-adjusted). Created in the capture callback, forwarded once,
/// discarded.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, mono)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Encode samples as little-endian 16-bit PCM bytes for the wire.
    pub fn to_pcm_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }
}

/// Configuration for the capture pipeline
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Input sample rate (the remote service expects 16kHz mono)
    pub sample_rate: u32,
    /// Frame size in samples. Larger frames trade latency for robustness:
    /// input glitching makes the remote recognizer drop words.
    pub frame_size: usize,
    /// Fixed gain boost applied to every sample. Compensates for the
    /// remote side's voice-activity-detection sensitivity; automatic gain
    /// control is left off in favor of this predictable manual level.
    pub gain: f32,
    /// Input device name (None = system default)
    pub device: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            frame_size: 4096,
            gain: 3.0,
            device: None,
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal input stream on a dedicated capture thread
/// - Scripted: fixed frame list (for testing/batch processing)
#[async_trait::async_trait]
pub trait CaptureBackend: Send {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that will receive audio frames. Device
    /// or permission failures surface here, synchronously, before any
    /// remote channel is opened.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing and release the device. Required on every exit
    /// path, including error exits.
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Default microphone via cpal
    Microphone,
    /// Pre-recorded frames (for testing/batch processing)
    Frames(Vec<AudioFrame>),
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(source: CaptureSource, config: CaptureConfig) -> Result<Box<dyn CaptureBackend>> {
        match source {
            CaptureSource::Microphone => {
                let backend = super::mic::MicBackend::new(config);
                Ok(Box::new(backend))
            }
            CaptureSource::Frames(frames) => Ok(Box::new(ScriptedBackend::new(frames))),
        }
    }
}

/// Feeds a fixed list of frames, then keeps the stream open until
/// stopped.
pub struct ScriptedBackend {
    frames: Vec<AudioFrame>,
    tx: Option<mpsc::Sender<AudioFrame>>,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<AudioFrame>) -> Self {
        Self { frames, tx: None }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(self.frames.len().max(1));
        for frame in self.frames.drain(..) {
            // Capacity matches the frame count, so this never fails.
            let _ = tx.try_send(frame);
        }
        // Holding the sender keeps the stream open until stop().
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
