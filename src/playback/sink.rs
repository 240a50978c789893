//! Speaker output
//!
//! The scheduler hands fully-decoded chunks to an `AudioSink` at their
//! scheduled start time. The cpal sink drains a shared sample queue on a
//! dedicated output thread; clearing that queue is what makes barge-in
//! cut the speaker off immediately.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, warn};

use super::PlaybackChunk;

/// Destination for scheduled chunks.
pub trait AudioSink: Send + Sync {
    /// Begin playing a chunk now. Fire-and-forget; the scheduler owns
    /// the timing.
    fn play(&self, chunk: PlaybackChunk);

    /// Drop everything queued, including partially played audio.
    fn stop_all(&self);
}

/// Discards audio; used for muted sessions and tests.
#[derive(Debug, Default)]
pub struct NullSink {
    played: AtomicUsize,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks handed to this sink so far.
    pub fn played(&self) -> usize {
        self.played.load(Ordering::SeqCst)
    }
}

impl AudioSink for NullSink {
    fn play(&self, _chunk: PlaybackChunk) {
        self.played.fetch_add(1, Ordering::SeqCst);
    }

    fn stop_all(&self) {}
}

/// cpal speaker sink.
///
/// The output stream lives on its own thread (cpal streams are not
/// `Send`); the callback drains `queue` and zero-fills on underrun.
pub struct SpeakerSink {
    queue: Arc<Mutex<VecDeque<i16>>>,
    stop_tx: Mutex<Option<std::sync::mpsc::Sender<()>>>,
}

impl SpeakerSink {
    /// Open the default output device at the given sample rate, mono.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let queue: Arc<Mutex<VecDeque<i16>>> = Arc::new(Mutex::new(VecDeque::new()));
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        let callback_queue = Arc::clone(&queue);
        std::thread::Builder::new()
            .name("speaker-sink".to_string())
            .spawn(move || {
                output_thread(sample_rate, callback_queue, ready_tx, stop_rx);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow!("speaker thread exited before reporting readiness")),
        }

        info!("speaker sink open ({}Hz mono)", sample_rate);

        Ok(Self {
            queue,
            stop_tx: Mutex::new(Some(stop_tx)),
        })
    }
}

impl AudioSink for SpeakerSink {
    fn play(&self, chunk: PlaybackChunk) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.extend(chunk.samples);
        }
    }

    fn stop_all(&self) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.clear();
        }
    }
}

impl Drop for SpeakerSink {
    fn drop(&mut self) {
        if let Ok(mut stop_tx) = self.stop_tx.lock() {
            // Dropping the sender wakes the output thread and releases
            // the device.
            stop_tx.take();
        }
    }
}

fn output_thread(
    sample_rate: u32,
    queue: Arc<Mutex<VecDeque<i16>>>,
    ready_tx: std::sync::mpsc::Sender<Result<()>>,
    stop_rx: std::sync::mpsc::Receiver<()>,
) {
    let host = cpal::default_host();
    let device = match host.default_output_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(anyhow!("no output device available")));
            return;
        }
    };

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _| {
            let mut queue = match queue.lock() {
                Ok(queue) => queue,
                Err(_) => return,
            };
            for slot in data.iter_mut() {
                *slot = match queue.pop_front() {
                    Some(sample) => sample as f32 / i16::MAX as f32,
                    None => 0.0,
                };
            }
        },
        |err| error!("output stream error: {}", err),
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(anyhow!("failed to build output stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(anyhow!("failed to start output stream: {}", e)));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Block until the sink is dropped; the stream is released with it.
    if stop_rx.recv().is_ok() {
        warn!("unexpected message on speaker stop channel");
    }
    drop(stream);
}
