pub mod chat;
pub mod stt;
pub mod tts;

pub use chat::{ChatProvider, HttpChatProvider, PlaceholderChat};
pub use stt::{HttpTranscriber, PlaceholderTranscriber, Transcriber};
pub use tts::{synthesize_cached, HttpSynthesizer, PlaceholderSynthesizer, Synthesizer};

use std::sync::Arc;

use tracing::info;

use crate::config::ProvidersConfig;
use crate::error::VoiceResult;

/// The three external capabilities the pipeline depends on
#[derive(Clone)]
pub struct ProviderSet {
    pub transcriber: Arc<dyn Transcriber>,
    pub chat: Arc<dyn ChatProvider>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// Provider factory
pub struct ProviderFactory;

impl ProviderFactory {
    /// Build providers from configuration. A capability with no configured
    /// URL gets its placeholder so the pipeline stays runnable end to end.
    pub fn create(config: &ProvidersConfig) -> VoiceResult<ProviderSet> {
        let transcriber: Arc<dyn Transcriber> = if config.stt.url.trim().is_empty() {
            info!("No STT URL configured, using placeholder transcriber");
            Arc::new(PlaceholderTranscriber::new())
        } else {
            Arc::new(HttpTranscriber::new(
                config.stt.url.clone(),
                config.stt.api_key.clone(),
                config.stt.model.clone(),
            )?)
        };

        let chat: Arc<dyn ChatProvider> = if config.chat.url.trim().is_empty() {
            info!("No chat URL configured, using placeholder chat provider");
            Arc::new(PlaceholderChat::new())
        } else {
            Arc::new(HttpChatProvider::new(
                config.chat.url.clone(),
                config.chat.model.clone(),
            )?)
        };

        let synthesizer: Arc<dyn Synthesizer> = if config.tts.url.trim().is_empty() {
            info!("No TTS URL configured, using placeholder synthesizer");
            Arc::new(PlaceholderSynthesizer::new(config.tts.sample_rate))
        } else {
            Arc::new(HttpSynthesizer::new(
                config.tts.url.clone(),
                config.tts.api_key.clone(),
                config.tts.model.clone(),
                config.tts.voice.clone(),
                config.tts.sample_rate,
            )?)
        };

        Ok(ProviderSet {
            transcriber,
            chat,
            synthesizer,
        })
    }
}
