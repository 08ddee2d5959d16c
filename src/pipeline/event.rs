use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::error;

/// One event on a turn's output stream.
///
/// Per request the sequence is strictly ordered: an optional
/// `user_transcript` first, then any number of `transcript`/`text`/`audio`
/// events, then exactly one terminal `done` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceEvent {
    /// What the user said, as transcribed (voice path)
    UserTranscript { data: String },
    /// Incremental or full reply text (voice path)
    Transcript { data: String },
    /// Incremental reply text (text path)
    Text { data: String },
    /// Base64 PCM16 of the synthesized reply
    Audio { data: String },
    /// Terminal success
    Done {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transcript: Option<String>,
        #[serde(
            default,
            rename = "conversationId",
            skip_serializing_if = "Option::is_none"
        )]
        conversation_id: Option<i64>,
    },
    /// Terminal failure
    Error { error: String },
}

impl VoiceEvent {
    /// Audio event carrying base64-encoded PCM bytes
    pub fn audio_from_pcm(pcm: &[u8]) -> Self {
        VoiceEvent::Audio {
            data: base64::engine::general_purpose::STANDARD.encode(pcm),
        }
    }

    /// Whether this event terminates its stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, VoiceEvent::Done { .. } | VoiceEvent::Error { .. })
    }

    /// Serialize as one wire frame: `data: <json>\n\n`
    pub fn sse_frame(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("data: {}\n\n", json),
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                "data: {\"type\":\"error\",\"error\":\"event serialization failed\"}\n\n"
                    .to_string()
            }
        }
    }
}
