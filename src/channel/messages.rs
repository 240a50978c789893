use serde::{Deserialize, Serialize};

/// Channel setup message, published once when a session opens
#[derive(Debug, Serialize, Deserialize)]
pub struct SetupMessage {
    pub session_id: String,
    pub model: String,
    /// Always "audio" for this engine
    pub response_modality: String,
    pub system_instruction: String,
    pub voice: String,
    pub input_transcription: bool,
    pub output_transcription: bool,
}

/// Outbound audio frame message
#[derive(Debug, Serialize, Deserialize)]
pub struct AudioInputMessage {
    pub session_id: String,
    pub sequence: u32,
    pub pcm: String, // Base64-encoded PCM16 bytes
    pub sample_rate: u32,
    pub timestamp: String, // RFC3339 timestamp
}

/// Outbound context artifact (e.g. scenario image)
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageInputMessage {
    pub session_id: String,
    pub data: String, // Base64-encoded bytes
    pub mime_type: String,
    pub timestamp: String,
}

/// Outbound control message (close request)
#[derive(Debug, Serialize, Deserialize)]
pub struct ControlMessage {
    pub session_id: String,
    pub action: String,
}

/// Inbound server message. Fields are sparse: most messages set only
/// one or two of them, so everything defaults.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServerMessage {
    pub session_id: String,
    #[serde(default)]
    pub user_text: Option<String>,
    #[serde(default)]
    pub ai_text: Option<String>,
    #[serde(default, rename = "turn_complete")]
    pub turn_complete: bool,
    #[serde(default)]
    pub audio: Option<String>, // Base64-encoded PCM16 at the output rate
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub error: Option<String>,
}
