// Microphone capture backend using cpal
//
// The cpal stream is not Send, so it lives on a dedicated capture thread
// for the session lifetime. Echo cancellation and noise suppression are
// whatever the OS input pipeline provides; automatic gain control is
// replaced by the fixed gain in CaptureConfig.

use anyhow::{anyhow, bail, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};

/// Microphone backend
pub struct MicBackend {
    config: CaptureConfig,
    control: Option<CaptureControl>,
}

struct CaptureControl {
    stop_tx: std::sync::mpsc::Sender<()>,
    thread: std::thread::JoinHandle<()>,
}

impl MicBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            control: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.control.is_some() {
            bail!("Already capturing");
        }

        info!(
            "Starting microphone capture ({}Hz, frame size {}, gain {:.1}x)",
            self.config.sample_rate, self.config.frame_size, self.config.gain
        );

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<()>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        let config = self.config.clone();
        let thread = std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                capture_thread(config, frame_tx, ready_tx, stop_rx);
            })?;

        // The thread reports stream startup success or failure before any
        // frame flows, so device/permission errors abort start() itself.
        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                bail!("capture thread exited before reporting readiness");
            }
        }

        self.control = Some(CaptureControl { stop_tx, thread });

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(control) = self.control.take() else {
            return Ok(());
        };

        info!("Stopping microphone capture");

        // Wake the capture thread; it drops the stream and releases the
        // device before exiting.
        let _ = control.stop_tx.send(());
        let join = tokio::task::spawn_blocking(move || control.thread.join());
        if join.await.map(|r| r.is_err()).unwrap_or(true) {
            warn!("capture thread did not shut down cleanly");
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.control.is_some()
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn capture_thread(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: std::sync::mpsc::Sender<Result<()>>,
    stop_rx: std::sync::mpsc::Receiver<()>,
) {
    let host = cpal::default_host();

    let device = match &config.device {
        Some(name) => {
            let mut found = None;
            if let Ok(devices) = host.input_devices() {
                for device in devices {
                    if device.name().map(|n| &n == name).unwrap_or(false) {
                        found = Some(device);
                        break;
                    }
                }
            }
            match found {
                Some(device) => device,
                None => {
                    let _ = ready_tx.send(Err(anyhow!("input device '{}' not found", name)));
                    return;
                }
            }
        }
        None => match host.default_input_device() {
            Some(device) => device,
            None => {
                let _ = ready_tx.send(Err(anyhow!(
                    "no input device available (missing microphone or permission denied)"
                )));
                return;
            }
        },
    };

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let started = std::time::Instant::now();
    let gain = config.gain;
    let frame_size = config.frame_size;
    let sample_rate = config.sample_rate;
    let mut pending: Vec<i16> = Vec::with_capacity(frame_size);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _| {
            for &sample in data {
                let boosted = (sample * gain).clamp(-1.0, 1.0);
                pending.push((boosted * i16::MAX as f32) as i16);

                if pending.len() >= frame_size {
                    let samples = std::mem::replace(&mut pending, Vec::with_capacity(frame_size));
                    let frame = AudioFrame {
                        samples,
                        sample_rate,
                        timestamp_ms: started.elapsed().as_millis() as u64,
                    };
                    // try_send: blocking inside the device callback causes
                    // the exact input glitching the frame size is sized
                    // against. A full queue is logged, never silent.
                    if frame_tx.try_send(frame).is_err() {
                        warn!("capture queue full, dropping frame");
                    }
                }
            }
        },
        |err| error!("input stream error: {}", err),
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(anyhow!("failed to build input stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(anyhow!("failed to start input stream: {}", e)));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Park until stop() signals (or the backend is dropped); the device
    // is released when the stream drops.
    let _ = stop_rx.recv();
    drop(stream);
    info!("Microphone capture thread stopped");
}
