use std::sync::Arc;

use crate::cache::TtsCache;
use crate::conversation::ConversationStore;
use crate::pipeline::VoiceOrchestrator;
use crate::providers::Synthesizer;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Pipeline driving voice and text turns
    pub orchestrator: Arc<VoiceOrchestrator>,
    /// Conversation history, shared with the pipeline
    pub conversations: Arc<ConversationStore>,
    /// Speech synthesis for the standalone TTS endpoint
    pub synthesizer: Arc<dyn Synthesizer>,
    /// Synthesized speech, shared between the pipeline and the TTS endpoint
    pub tts_cache: Arc<TtsCache>,
    /// Language assumed when a request does not specify one
    pub default_language: String,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<VoiceOrchestrator>,
        conversations: Arc<ConversationStore>,
        synthesizer: Arc<dyn Synthesizer>,
        tts_cache: Arc<TtsCache>,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            conversations,
            synthesizer,
            tts_cache,
            default_language: default_language.into(),
        }
    }
}
