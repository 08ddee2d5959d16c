use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::audio::AudioFormat;
use crate::error::{VoiceError, VoiceResult};

/// Speech-to-text capability.
///
/// Implementations receive the upload after normalization: WAV or MP3 on
/// the happy path, or the original container when transcoding failed and
/// the pipeline is degrading to a best-effort submission.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe one audio buffer. An empty transcript is a valid result.
    async fn transcribe(
        &self,
        audio: &[u8],
        format: AudioFormat,
        language: Option<&str>,
    ) -> VoiceResult<String>;
}

/// OpenAI-compatible transcription endpoint (`POST {base}/audio/transcriptions`)
pub struct HttpTranscriber {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl HttpTranscriber {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        format: AudioFormat,
        language: Option<&str>,
    ) -> VoiceResult<String> {
        if audio.is_empty() {
            return Ok(String::new());
        }

        let url = format!(
            "{}/audio/transcriptions",
            self.base_url.trim_end_matches('/')
        );
        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(format!("audio.{}", format.extension()))
            .mime_str(format.mime_type())
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        if let Some(lang) = language {
            form = form.text("language", lang.to_string());
        }

        let mut request = self.client.post(&url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request
            .send()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Transcription(format!(
                "STT API error {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| VoiceError::Transcription(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        debug!("Transcribed {} bytes of {}: {:?}", audio.len(), format, text);
        Ok(text)
    }
}

/// Placeholder transcriber: returns a fixed string. Use for running the
/// pipeline without a transcription service.
#[derive(Debug, Default)]
pub struct PlaceholderTranscriber {
    /// If set, return this instead of the default message.
    pub response: Option<String>,
}

impl PlaceholderTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(s: impl Into<String>) -> Self {
        Self {
            response: Some(s.into()),
        }
    }
}

#[async_trait]
impl Transcriber for PlaceholderTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        format: AudioFormat,
        _language: Option<&str>,
    ) -> VoiceResult<String> {
        if let Some(ref r) = self.response {
            return Ok(r.clone());
        }
        Ok(format!(
            "[transcription placeholder: {} bytes of {} — connect an STT service]",
            audio.len(),
            format
        ))
    }
}
