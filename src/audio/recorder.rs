use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::backend::AudioFrame;

/// Optional WAV tap of forwarded capture frames, for session review.
///
/// Write failures disable the tap but never fail the session.
pub struct WavTap {
    writer: Option<WavWriter<BufWriter<File>>>,
    path: PathBuf,
}

impl WavTap {
    pub fn create(path: &Path, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let writer = WavWriter::create(path, spec)
            .with_context(|| format!("Failed to create WAV tap at {}", path.display()))?;

        info!("WAV tap recording to {}", path.display());

        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
        })
    }

    pub fn write_frame(&mut self, frame: &AudioFrame) {
        let mut failed = false;

        if let Some(writer) = self.writer.as_mut() {
            for &sample in &frame.samples {
                if let Err(e) = writer.write_sample(sample) {
                    warn!("WAV tap write failed, disabling tap: {}", e);
                    failed = true;
                    break;
                }
            }
        }

        if failed {
            self.writer = None;
        }
    }

    /// Finish the file, fixing up the WAV header. Idempotent.
    pub fn finalize(&mut self) {
        if let Some(writer) = self.writer.take() {
            match writer.finalize() {
                Ok(()) => info!("WAV tap finalized: {}", self.path.display()),
                Err(e) => warn!("WAV tap finalize failed: {}", e),
            }
        }
    }
}
