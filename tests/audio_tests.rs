// Unit tests for the capture pipeline types
//
// These verify the frame and configuration types, the scripted capture
// backend used for batch runs, and the optional WAV tap.

use fala_live::audio::ScriptedBackend;
use fala_live::{AudioFrame, CaptureBackend, CaptureConfig, WavTap};

#[test]
fn test_capture_config_default() {
    let config = CaptureConfig::default();

    assert_eq!(config.sample_rate, 16000, "Remote service expects 16kHz input");
    assert_eq!(config.frame_size, 4096, "Large frames resist input glitching");
    assert!((config.gain - 3.0).abs() < f32::EPSILON, "Default gain is 3x");
    assert!(config.device.is_none());
}

#[test]
fn test_frame_pcm_encoding_is_little_endian() {
    let frame = AudioFrame {
        samples: vec![1, -2, i16::MAX],
        sample_rate: 16000,
        timestamp_ms: 0,
    };

    let bytes = frame.to_pcm_bytes();
    assert_eq!(bytes, vec![0x01, 0x00, 0xFE, 0xFF, 0xFF, 0x7F]);
}

#[test]
fn test_frame_duration_math() {
    // 4096 samples at 16kHz is 256ms of audio.
    let frame = AudioFrame {
        samples: vec![0i16; 4096],
        sample_rate: 16000,
        timestamp_ms: 0,
    };

    let duration_secs = frame.samples.len() as f64 / frame.sample_rate as f64;
    assert!((duration_secs - 0.256).abs() < 0.001);
}

#[tokio::test]
async fn test_scripted_backend_replays_frames_in_order() {
    let frames = vec![
        AudioFrame {
            samples: vec![1],
            sample_rate: 16000,
            timestamp_ms: 0,
        },
        AudioFrame {
            samples: vec![2],
            sample_rate: 16000,
            timestamp_ms: 256,
        },
    ];

    let mut backend = ScriptedBackend::new(frames);
    assert!(!backend.is_capturing());

    let mut rx = backend.start().await.unwrap();
    assert!(backend.is_capturing());

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first.samples, vec![1]);
    assert_eq!(second.samples, vec![2]);

    backend.stop().await.unwrap();
    assert!(!backend.is_capturing());

    // The stream ends once the backend is stopped.
    assert!(rx.recv().await.is_none());
}

#[test]
fn test_wav_tap_writes_playable_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.wav");

    let mut tap = WavTap::create(&path, 16000).unwrap();
    tap.write_frame(&AudioFrame {
        samples: vec![100, -100, 200],
        sample_rate: 16000,
        timestamp_ms: 0,
    });
    tap.finalize();
    // Finalize twice: must be a no-op.
    tap.finalize();

    let reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 16000);
    assert_eq!(spec.bits_per_sample, 16);

    let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
    assert_eq!(samples, vec![100, -100, 200]);
}
