//! Error types for the voice pipeline

use thiserror::Error;

use crate::audio::TranscodeError;

/// Result type alias for pipeline operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur in the voice pipeline and its providers
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("STT error: {0}")]
    Transcription(String),

    #[error("Completion error: {0}")]
    Completion(String),

    #[error("TTS error: {0}")]
    Synthesis(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Request aborted")]
    Aborted,

    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for VoiceError {
    fn from(err: reqwest::Error) -> Self {
        VoiceError::Http(err.to_string())
    }
}
