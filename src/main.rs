use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use fala_live::{
    AudioSink, CaptureConfig, ChannelConfig, Config, ImageArtifact, LiveSession, NatsChannel,
    NullSink, SessionConfig, SpeakerSink,
};

#[derive(Parser)]
#[command(name = "fala-live", about = "Live conversation session client")]
struct Cli {
    /// Config file (without extension)
    #[arg(long, default_value = "config/fala-live")]
    config: String,

    /// System instruction handed to the remote service at channel open
    #[arg(long)]
    instruction: String,

    /// Optional scenario image sent once right after the channel opens
    #[arg(long)]
    image: Option<PathBuf>,

    /// Stop automatically after this many seconds (default: run until Ctrl-C)
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Discard returned audio instead of playing it
    #[arg(long)]
    mute: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("{} v0.1.0", cfg.service.name);

    let initial_image = match &cli.image {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("Failed to read image {}", path.display()))?;
            let mime_type = match path.extension().and_then(|e| e.to_str()) {
                Some("png") => "image/png",
                _ => "image/jpeg",
            };
            Some(ImageArtifact {
                bytes,
                mime_type: mime_type.to_string(),
            })
        }
        None => None,
    };

    let session_config = SessionConfig {
        channel: ChannelConfig {
            model: cfg.channel.model.clone(),
            voice: cfg.channel.voice.clone(),
            system_instruction: cli.instruction.clone(),
            ..ChannelConfig::default()
        },
        capture: CaptureConfig {
            sample_rate: cfg.audio.input_sample_rate,
            frame_size: cfg.audio.frame_size,
            gain: cfg.audio.gain,
            device: None,
        },
        output_sample_rate: cfg.audio.output_sample_rate,
        initial_image,
        capture_wav_path: cfg.audio.capture_wav_path.clone().map(PathBuf::from),
        ..SessionConfig::default()
    };

    let speaker: Arc<dyn AudioSink> = if cli.mute {
        Arc::new(NullSink::new())
    } else {
        Arc::new(SpeakerSink::new(cfg.audio.output_sample_rate)?)
    };

    let channel = Arc::new(NatsChannel::connect(&cfg.channel.nats_url).await?);
    let session = LiveSession::new(channel, speaker, session_config);

    session.start().await?;
    info!("Session open; speak now (Ctrl-C to stop)");

    match cli.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
            }
        }
        None => {
            tokio::signal::ctrl_c().await?;
        }
    }

    let history = session.stop().await;

    if let Some(error) = session.last_error().await {
        eprintln!("Session ended with an error: {}", error);
        eprintln!("Restart to try again.");
    }

    for message in &history {
        println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M:%S"),
            message.side,
            message.text
        );
    }

    Ok(())
}
