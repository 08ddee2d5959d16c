use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cache::TtsCache;
use crate::error::{VoiceError, VoiceResult};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches synthesized speech audio for the kiosk client
#[async_trait]
pub trait SpeechFetcher: Send + Sync {
    /// Fetch PCM audio for `text`. Cancellation surfaces as
    /// `VoiceError::Aborted`, never as a failure.
    async fn fetch(
        &self,
        text: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> VoiceResult<Arc<Vec<u8>>>;
}

/// Fetches speech from the kiosk server's TTS endpoint, with a local
/// cache in front so repeated prompts skip the network
pub struct HttpSpeechFetcher {
    base_url: String,
    client: reqwest::Client,
    cache: Arc<TtsCache>,
}

impl HttpSpeechFetcher {
    pub fn new(base_url: impl Into<String>, cache: Arc<TtsCache>) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| VoiceError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            cache,
        })
    }

    async fn fetch_remote(&self, text: &str, language: &str) -> VoiceResult<Vec<u8>> {
        let url = format!("{}/api/tts", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "text": text, "lang": language }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(VoiceError::Http(format!(
                "TTS endpoint returned {}",
                response.status()
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SpeechFetcher for HttpSpeechFetcher {
    async fn fetch(
        &self,
        text: &str,
        language: &str,
        cancel: &CancellationToken,
    ) -> VoiceResult<Arc<Vec<u8>>> {
        if let Some(hit) = self.cache.get(text, language).await {
            debug!("Speech cache hit for {:?}", text);
            return Ok(hit);
        }

        let audio = tokio::select! {
            _ = cancel.cancelled() => return Err(VoiceError::Aborted),
            result = self.fetch_remote(text, language) => result?,
        };

        let audio = Arc::new(audio);
        self.cache.put(text, language, Arc::clone(&audio)).await;
        Ok(audio)
    }
}
