//! Gapless playback scheduling
//!
//! Inbound encoded audio payloads are decoded into `PlaybackChunk`s and
//! placed on a single output timeline. A monotonic cursor tracks the next
//! available start time: chunks that arrive faster than real time play
//! back-to-back with no artificial gap, chunks that arrive late start at
//! arrival time, and no two chunks ever overlap. Interruption (barge-in)
//! cancels every pending chunk and resets the cursor; discarded chunks
//! are never resumed or replayed.

pub mod sink;

pub use sink::{AudioSink, NullSink, SpeakerSink};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

use crate::errors::DecodeError;

/// A decoded audio buffer owned by the scheduler from decode until its
/// scheduled end time.
#[derive(Debug, Clone)]
pub struct PlaybackChunk {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl PlaybackChunk {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Decode a little-endian 16-bit PCM payload into samples.
pub fn decode_pcm16(payload: &[u8]) -> Result<Vec<i16>, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }
    if payload.len() % 2 != 0 {
        return Err(DecodeError::TruncatedSample(payload.len()));
    }
    Ok(payload
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// The `[start, end)` interval a chunk was scheduled into.
#[derive(Debug, Clone, Copy)]
pub struct ChunkSchedule {
    pub start: Instant,
    pub end: Instant,
}

struct SchedulerInner {
    /// Next available start time on the output timeline. Never moves
    /// backwards except on interruption.
    cursor: Instant,
    /// Chunks scheduled but not yet finished, keyed by chunk id.
    pending: HashMap<u64, JoinHandle<()>>,
    next_id: u64,
}

/// Schedules decoded chunks onto the speaker timeline.
///
/// The cursor and pending set are owned exclusively by this type; the
/// session controller interacts only through `enqueue` and `interrupt`.
pub struct PlaybackScheduler {
    sample_rate: u32,
    sink: Arc<dyn AudioSink>,
    inner: Arc<Mutex<SchedulerInner>>,
}

impl PlaybackScheduler {
    pub fn new(sample_rate: u32, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sample_rate,
            sink,
            inner: Arc::new(Mutex::new(SchedulerInner {
                cursor: Instant::now(),
                pending: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Decode a payload and schedule it at `max(now, cursor)`, advancing
    /// the cursor by the chunk duration. A malformed payload is dropped
    /// without touching the timeline.
    pub async fn enqueue(&self, payload: &[u8]) -> Result<ChunkSchedule, DecodeError> {
        let samples = decode_pcm16(payload)?;
        let chunk = PlaybackChunk {
            samples,
            sample_rate: self.sample_rate,
        };
        let duration = chunk.duration();

        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let start = now.max(inner.cursor);
        let end = start + duration;
        inner.cursor = end;

        let id = inner.next_id;
        inner.next_id += 1;

        let sink = Arc::clone(&self.sink);
        let tracker = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            sleep_until(start).await;
            sink.play(chunk);
            // Tracked as pending until the scheduled end, then untracked.
            sleep_until(end).await;
            tracker.lock().await.pending.remove(&id);
        });
        inner.pending.insert(id, handle);

        debug!(
            "scheduled chunk {} ({:.0}ms, starts in {:.0}ms)",
            id,
            duration.as_secs_f64() * 1000.0,
            start.saturating_duration_since(now).as_secs_f64() * 1000.0
        );

        Ok(ChunkSchedule { start, end })
    }

    /// Stop every pending chunk regardless of progress, clear the pending
    /// set, and reset the cursor to the current time.
    pub async fn interrupt(&self) {
        let mut inner = self.inner.lock().await;
        let cancelled = inner.pending.len();
        for (_, handle) in inner.pending.drain() {
            handle.abort();
        }
        inner.cursor = Instant::now();
        drop(inner);

        self.sink.stop_all();

        if cancelled > 0 {
            debug!("interrupted playback, cancelled {} pending chunks", cancelled);
        }
    }

    /// Number of chunks scheduled but not yet finished.
    pub async fn pending_len(&self) -> usize {
        self.inner.lock().await.pending.len()
    }
}
