use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::audio::pcm16_to_bytes;
use crate::cache::TtsCache;
use crate::error::{VoiceError, VoiceResult};

/// Text-to-speech capability producing raw mono 16-bit PCM
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text`. Returning an empty buffer means "no audio" and
    /// is not an error.
    async fn synthesize(&self, text: &str, language: &str) -> VoiceResult<Vec<u8>>;

    /// Sample rate of the synthesized PCM
    fn sample_rate(&self) -> u32;
}

/// Look up `(text, language)` in the cache, synthesizing and storing on a
/// miss. A failed synthesis is returned as an error and leaves the cache
/// untouched.
pub async fn synthesize_cached(
    synthesizer: &dyn Synthesizer,
    cache: &TtsCache,
    text: &str,
    language: &str,
) -> VoiceResult<Arc<Vec<u8>>> {
    if let Some(hit) = cache.get(text, language).await {
        debug!("TTS cache hit for {:?}", text);
        return Ok(hit);
    }

    let audio = Arc::new(synthesizer.synthesize(text, language).await?);
    cache.put(text, language, audio.clone()).await;
    Ok(audio)
}

/// OpenAI-compatible speech endpoint (`POST {base}/audio/speech`) asked
/// for raw PCM output
pub struct HttpSynthesizer {
    base_url: String,
    api_key: Option<String>,
    model: String,
    voice: String,
    sample_rate: u32,
    client: reqwest::Client,
}

impl HttpSynthesizer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        sample_rate: u32,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            voice: voice.into(),
            sample_rate,
            client,
        })
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, language: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let body = json!({
            "model": self.model,
            "input": text,
            "voice": self.voice,
            "language": language,
            "response_format": "pcm",
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request
            .send()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Synthesis(format!(
                "TTS API error {}: {}",
                status, body
            )));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Placeholder synthesizer: generates a short sine tone per utterance. Use
/// for running the pipeline and playback without a TTS service.
pub struct PlaceholderSynthesizer {
    sample_rate: u32,
}

impl PlaceholderSynthesizer {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }
}

#[async_trait]
impl Synthesizer for PlaceholderSynthesizer {
    async fn synthesize(&self, text: &str, _language: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        // 200ms tone, pitch varies with the text
        let freq = 220.0 + (text.len() % 16) as f32 * 55.0;
        let samples: Vec<i16> = (0..self.sample_rate / 5)
            .map(|n| {
                let t = n as f32 / self.sample_rate as f32;
                ((t * freq * 2.0 * std::f32::consts::PI).sin() * 8000.0) as i16
            })
            .collect();

        Ok(pcm16_to_bytes(&samples))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
