use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::SessionConfig;
use super::state::SessionState;
use crate::audio::{AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureSource, WavTap};
use crate::channel::{ChannelEvent, ChannelSink, LiveChannel, ServerContent};
use crate::errors::SessionError;
use crate::playback::{AudioSink, PlaybackScheduler};
use crate::transcript::{Message, TranscriptAggregator, TurnSide};

/// A live conversation session.
///
/// Owns the channel lifecycle: captured frames flow out through the
/// channel sink, inbound events are dispatched to the playback scheduler
/// and transcript aggregator strictly in arrival order, and `stop()`
/// returns the finalized ordered transcript. The controller is the only
/// component that touches the channel; everything else interacts through
/// typed operations on state it exclusively owns.
pub struct LiveSession {
    config: SessionConfig,

    /// Channel implementation (opened once, on start)
    channel: Arc<dyn LiveChannel>,

    /// Session lifecycle state
    state: Arc<Mutex<SessionState>>,

    /// User-facing message from a channel error, if one occurred
    last_error: Arc<Mutex<Option<String>>>,

    /// Transcript accumulators and committed history
    aggregator: Arc<Mutex<TranscriptAggregator>>,

    /// Playback timeline (cursor + pending chunks)
    scheduler: Arc<PlaybackScheduler>,

    /// Capture backend, held so stop() can release the device
    capture: Mutex<Option<Box<dyn CaptureBackend>>>,

    /// Outbound half of the open channel
    channel_sink: Mutex<Option<Arc<dyn ChannelSink>>>,

    /// Optional WAV tap of outbound audio
    wav_tap: Arc<Mutex<Option<WavTap>>>,

    /// Handle for the frame forwarding task
    forward_task: Mutex<Option<JoinHandle<()>>>,

    /// Handle for the inbound event dispatch task
    dispatch_task: Mutex<Option<JoinHandle<()>>>,

    /// Whether the session is actively streaming
    running: Arc<AtomicBool>,
}

impl LiveSession {
    pub fn new(
        channel: Arc<dyn LiveChannel>,
        speaker: Arc<dyn AudioSink>,
        config: SessionConfig,
    ) -> Self {
        let scheduler = Arc::new(PlaybackScheduler::new(config.output_sample_rate, speaker));

        Self {
            config,
            channel,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            last_error: Arc::new(Mutex::new(None)),
            aggregator: Arc::new(Mutex::new(TranscriptAggregator::new())),
            scheduler,
            capture: Mutex::new(None),
            channel_sink: Mutex::new(None),
            wav_tap: Arc::new(Mutex::new(None)),
            forward_task: Mutex::new(None),
            dispatch_task: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the session against the default microphone.
    pub async fn start(&self) -> Result<()> {
        self.start_from(CaptureSource::Microphone).await
    }

    /// Start with an explicit capture source (scripted sources serve
    /// tests and batch runs).
    pub async fn start_from(&self, source: CaptureSource) -> Result<()> {
        {
            let state = self.state.lock().await;
            if *state != SessionState::Idle {
                return Err(SessionError::InvalidState(
                    "start() requires a session that has not run yet",
                )
                .into());
            }
        }

        info!("Starting live session: {}", self.config.session_id);

        // Acquire the input device before anything else: a device or
        // permission failure must abort start before any channel exists,
        // leaving nothing to tear down.
        let mut backend = CaptureBackendFactory::create(source, self.config.capture.clone())
            .map_err(|e| SessionError::Startup(e.to_string()))?;
        let frames = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => return Err(SessionError::Startup(e.to_string()).into()),
        };

        self.transition(SessionState::Connecting).await;

        let opened = self
            .channel
            .open(&self.config.session_id, &self.config.channel)
            .await;
        let (sink, events) = match opened {
            Ok(pair) => pair,
            Err(e) => {
                // Release the device on this exit path too.
                if let Err(stop_err) = backend.stop().await {
                    warn!("Failed to release capture device: {}", stop_err);
                }
                let message = e.to_string();
                *self.last_error.lock().await = Some(message.clone());
                self.transition(SessionState::Error).await;
                return Err(SessionError::Channel(message).into());
            }
        };

        self.transition(SessionState::Open).await;

        // The initial context artifact goes out exactly once, before any
        // audio frame, so the remote side can open the conversation
        // without waiting for user speech.
        if let Some(image) = &self.config.initial_image {
            if let Err(e) = sink.send_image(&image.bytes, &image.mime_type).await {
                warn!("Failed to send initial image: {}", e);
            }
        }

        if let Some(path) = &self.config.capture_wav_path {
            match WavTap::create(path, self.config.capture.sample_rate) {
                Ok(tap) => *self.wav_tap.lock().await = Some(tap),
                Err(e) => warn!("WAV tap unavailable: {}", e),
            }
        }

        self.running.store(true, Ordering::SeqCst);
        *self.capture.lock().await = Some(backend);
        *self.channel_sink.lock().await = Some(Arc::clone(&sink));

        let forward = tokio::spawn(Self::forward_frames(
            frames,
            sink,
            Arc::clone(&self.running),
            Arc::clone(&self.wav_tap),
        ));
        *self.forward_task.lock().await = Some(forward);

        let dispatch = tokio::spawn(Self::dispatch_events(
            events,
            Arc::clone(&self.aggregator),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.state),
            Arc::clone(&self.last_error),
        ));
        *self.dispatch_task.lock().await = Some(dispatch);

        info!("Live session open: {}", self.config.session_id);

        Ok(())
    }

    /// Stop the session and return the finalized, ordered transcript.
    ///
    /// Safe to call from any non-terminal state; never fails; calling it
    /// again returns the same history. Teardown order is fixed: capture,
    /// playback, channel, flush.
    pub async fn stop(&self) -> Vec<Message> {
        info!("Stopping live session: {}", self.config.session_id);
        self.running.store(false, Ordering::SeqCst);

        // 1. Stop frame forwarding and release the input device. Sends
        // still in flight complete as harmless no-ops.
        if let Some(task) = self.forward_task.lock().await.take() {
            task.abort();
        }
        if let Some(mut backend) = self.capture.lock().await.take() {
            if let Err(e) = backend.stop().await {
                warn!("Failed to release capture device: {}", e);
            }
        }
        if let Some(mut tap) = self.wav_tap.lock().await.take() {
            tap.finalize();
        }

        // 2. Stop all playback.
        self.scheduler.interrupt().await;

        // 3. Request channel close, best effort; the session ends
        // regardless of whether the remote ever sees it.
        if let Some(sink) = self.channel_sink.lock().await.take() {
            if let Err(e) = sink.close().await {
                warn!("Channel close failed (ignored): {}", e);
            }
        }
        if let Some(task) = self.dispatch_task.lock().await.take() {
            task.abort();
        }

        // 4. Flush open partials and hand back the ordered history.
        let history = {
            let mut aggregator = self.aggregator.lock().await;
            aggregator.flush();
            aggregator.history().to_vec()
        };

        self.transition(SessionState::Closed).await;

        info!(
            "Live session stopped with {} transcript messages",
            history.len()
        );

        history
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    pub async fn state(&self) -> SessionState {
        *self.state.lock().await
    }

    /// User-facing message from the last channel error, if any.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Committed history so far (live view; `stop()` returns the final one).
    pub async fn history_snapshot(&self) -> Vec<Message> {
        self.aggregator.lock().await.history().to_vec()
    }

    /// Current open partials as (user, ai), for live display.
    pub async fn partials(&self) -> (String, String) {
        let aggregator = self.aggregator.lock().await;
        (
            aggregator.partial(TurnSide::User).to_string(),
            aggregator.partial(TurnSide::Ai).to_string(),
        )
    }

    async fn transition(&self, to: SessionState) {
        transition_shared(&self.state, to).await;
    }

    /// Single producer on the capture side: each send is awaited before
    /// the next frame, so wire order matches capture order.
    async fn forward_frames(
        mut frames: mpsc::Receiver<AudioFrame>,
        sink: Arc<dyn ChannelSink>,
        running: Arc<AtomicBool>,
        wav_tap: Arc<Mutex<Option<WavTap>>>,
    ) {
        while let Some(frame) = frames.recv().await {
            if !running.load(Ordering::SeqCst) {
                break;
            }

            if let Some(tap) = wav_tap.lock().await.as_mut() {
                tap.write_frame(&frame);
            }

            let pcm = frame.to_pcm_bytes();
            if let Err(e) = sink.send_audio_frame(&pcm, frame.sample_rate).await {
                if running.load(Ordering::SeqCst) {
                    warn!("Failed to send audio frame: {}", e);
                }
            }
        }

        info!("Frame forwarding stopped");
    }

    /// Single consumer on the inbound side: events are applied strictly
    /// in arrival order, because transcript and turn-complete events
    /// interleave with audio and must not be reordered.
    async fn dispatch_events(
        mut events: mpsc::Receiver<ChannelEvent>,
        aggregator: Arc<Mutex<TranscriptAggregator>>,
        scheduler: Arc<PlaybackScheduler>,
        state: Arc<Mutex<SessionState>>,
        last_error: Arc<Mutex<Option<String>>>,
    ) {
        while let Some(event) = events.recv().await {
            match event {
                ChannelEvent::Content(content) => {
                    Self::apply_content(content, &aggregator, &scheduler).await;
                }
                ChannelEvent::Closed => {
                    info!("Channel closed by remote");
                    transition_shared(&state, SessionState::Closed).await;
                    break;
                }
                ChannelEvent::Error(message) => {
                    warn!("Channel error: {}", message);
                    *last_error.lock().await = Some(message);
                    transition_shared(&state, SessionState::Error).await;
                    break;
                }
            }
        }
    }

    /// Apply one inbound event. The field order is a deliberate
    /// tie-break carried over from the service contract: transcription
    /// first, interruption last, so a partial arriving together with a
    /// barge-in still reaches its accumulator before the AI side is
    /// discarded.
    async fn apply_content(
        content: ServerContent,
        aggregator: &Arc<Mutex<TranscriptAggregator>>,
        scheduler: &Arc<PlaybackScheduler>,
    ) {
        if let Some(text) = &content.user_text {
            aggregator.lock().await.append_partial(TurnSide::User, text);
        }

        if let Some(text) = &content.ai_text {
            aggregator.lock().await.append_partial(TurnSide::Ai, text);
        }

        if content.turn_complete {
            aggregator.lock().await.commit_turn();
        }

        if let Some(audio) = &content.audio {
            if let Err(e) = scheduler.enqueue(audio).await {
                // Malformed chunk: drop it, keep the session alive.
                warn!("Dropping malformed audio chunk: {}", e);
            }
        }

        if content.interrupted {
            scheduler.interrupt().await;
            aggregator.lock().await.discard_ai_partial();
        }
    }
}

async fn transition_shared(state: &Arc<Mutex<SessionState>>, to: SessionState) {
    let mut state = state.lock().await;
    if state.can_transition(to) {
        info!("Session state {} -> {}", *state, to);
        *state = to;
    } else if *state != to {
        tracing::debug!("Ignoring state change {} -> {}", *state, to);
    }
}
