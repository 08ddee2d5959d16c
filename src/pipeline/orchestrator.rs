use std::fmt;
use std::sync::Arc;

use base64::Engine;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::audio::{detect_format, FormatNormalizer, NormalizedAudio};
use crate::cache::TtsCache;
use crate::conversation::{ConversationStore, Role};
use crate::error::{VoiceError, VoiceResult};
use crate::providers::{synthesize_cached, ProviderSet};

use super::event::VoiceEvent;

/// Transcript recorded when speech-to-text fails on a voice turn
pub const FALLBACK_TRANSCRIPT: &str = "(unintelligible audio)";

/// Stage of an in-flight turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Receiving,
    Normalizing,
    Transcribing,
    Composing,
    Synthesizing,
    Completed,
    Failed,
}

impl fmt::Display for TurnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnStage::Receiving => "receiving",
            TurnStage::Normalizing => "normalizing",
            TurnStage::Transcribing => "transcribing",
            TurnStage::Composing => "composing",
            TurnStage::Synthesizing => "synthesizing",
            TurnStage::Completed => "completed",
            TurnStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn advance(stage: &mut TurnStage, next: TurnStage) {
    debug!("Turn stage: {} -> {}", stage, next);
    *stage = next;
}

/// A voice turn as accepted by the pipeline
pub struct VoiceTurnRequest {
    pub conversation_id: Option<i64>,
    /// Base64-encoded audio upload
    pub audio: String,
    pub language: Option<String>,
}

/// A text turn as accepted by the pipeline
pub struct TextTurnRequest {
    pub conversation_id: Option<i64>,
    pub message: String,
    /// Also synthesize the reply and emit an audio event
    pub include_audio: bool,
    pub language: Option<String>,
}

enum IncrementKind {
    Transcript,
    Text,
}

/// Drives a turn through normalize -> transcribe -> compose -> synthesize,
/// emitting ordered events into a per-request channel.
///
/// Every turn ends with exactly one `done` or `error` event. Failures in
/// individual stages degrade that stage's output; only a completion
/// failure is fatal to the turn.
pub struct VoiceOrchestrator {
    normalizer: FormatNormalizer,
    providers: ProviderSet,
    store: Arc<ConversationStore>,
    cache: Arc<TtsCache>,
    system_prompt: String,
    default_language: String,
}

impl VoiceOrchestrator {
    pub fn new(
        normalizer: FormatNormalizer,
        providers: ProviderSet,
        store: Arc<ConversationStore>,
        cache: Arc<TtsCache>,
        system_prompt: impl Into<String>,
        default_language: impl Into<String>,
    ) -> Self {
        Self {
            normalizer,
            providers,
            store,
            cache,
            system_prompt: system_prompt.into(),
            default_language: default_language.into(),
        }
    }

    /// Run a voice turn to completion, emitting events on `events`
    pub async fn run_voice_turn(&self, request: VoiceTurnRequest, events: mpsc::Sender<VoiceEvent>) {
        let terminal = match self.voice_turn(&request, &events).await {
            Ok(done) => {
                debug!("Voice turn {}", TurnStage::Completed);
                done
            }
            Err(VoiceError::Aborted) => {
                info!("Voice turn abandoned, client disconnected");
                return;
            }
            Err(e) => {
                error!("Voice turn {}: {}", TurnStage::Failed, e);
                VoiceEvent::Error {
                    error: e.to_string(),
                }
            }
        };
        let _ = events.send(terminal).await;
    }

    /// Run a text turn to completion, emitting events on `events`
    pub async fn run_text_turn(&self, request: TextTurnRequest, events: mpsc::Sender<VoiceEvent>) {
        let terminal = match self.text_turn(&request, &events).await {
            Ok(done) => {
                debug!("Text turn {}", TurnStage::Completed);
                done
            }
            Err(VoiceError::Aborted) => {
                info!("Text turn abandoned, client disconnected");
                return;
            }
            Err(e) => {
                error!("Text turn {}: {}", TurnStage::Failed, e);
                VoiceEvent::Error {
                    error: e.to_string(),
                }
            }
        };
        let _ = events.send(terminal).await;
    }

    async fn voice_turn(
        &self,
        request: &VoiceTurnRequest,
        events: &mpsc::Sender<VoiceEvent>,
    ) -> VoiceResult<VoiceEvent> {
        let mut stage = TurnStage::Receiving;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(request.audio.as_bytes())
            .map_err(|e| VoiceError::InvalidRequest(format!("invalid base64 audio: {}", e)))?;
        let language = self.language_for(request.language.as_deref());

        // Normalize; a transcode failure degrades to submitting the
        // original container as-is
        advance(&mut stage, TurnStage::Normalizing);
        let (bytes, format) = match self.normalizer.ensure_compatible(&audio).await {
            Ok(NormalizedAudio { bytes, format }) => (bytes, format.as_audio_format()),
            Err(e) => {
                warn!("Transcode failed, submitting original upload: {}", e);
                let format = detect_format(&audio);
                (audio, format)
            }
        };

        // Transcribe; a failure substitutes the fallback transcript so the
        // user still gets a reply
        advance(&mut stage, TurnStage::Transcribing);
        let transcript = match self
            .providers
            .transcriber
            .transcribe(&bytes, format, Some(&language))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Transcription failed, using fallback transcript: {}", e);
                FALLBACK_TRANSCRIPT.to_string()
            }
        };

        // Persist the user turn and surface it before the reply arrives
        let conversation_id = self.store.ensure(request.conversation_id).await;
        self.store
            .append(conversation_id, Role::User, transcript.clone())
            .await;
        self.send(events, VoiceEvent::UserTranscript { data: transcript })
            .await?;

        advance(&mut stage, TurnStage::Composing);
        let reply = self
            .compose(conversation_id, events, IncrementKind::Transcript)
            .await?;

        advance(&mut stage, TurnStage::Synthesizing);
        self.emit_reply_audio(&reply, &language, events).await?;

        self.store
            .append(conversation_id, Role::Assistant, reply.clone())
            .await;

        Ok(VoiceEvent::Done {
            transcript: Some(reply),
            conversation_id: Some(conversation_id),
        })
    }

    async fn text_turn(
        &self,
        request: &TextTurnRequest,
        events: &mpsc::Sender<VoiceEvent>,
    ) -> VoiceResult<VoiceEvent> {
        let mut stage = TurnStage::Receiving;

        let message = request.message.trim();
        if message.is_empty() {
            return Err(VoiceError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }

        let conversation_id = self.store.ensure(request.conversation_id).await;
        self.store.append(conversation_id, Role::User, message).await;

        advance(&mut stage, TurnStage::Composing);
        let reply = self
            .compose(conversation_id, events, IncrementKind::Text)
            .await?;

        if request.include_audio {
            advance(&mut stage, TurnStage::Synthesizing);
            let language = self.language_for(request.language.as_deref());
            self.emit_reply_audio(&reply, &language, events).await?;
        }

        self.store
            .append(conversation_id, Role::Assistant, reply)
            .await;

        Ok(VoiceEvent::Done {
            transcript: None,
            conversation_id: Some(conversation_id),
        })
    }

    /// Stream a completion for the conversation's history, forwarding each
    /// increment as a `transcript` or `text` event
    async fn compose(
        &self,
        conversation_id: i64,
        events: &mpsc::Sender<VoiceEvent>,
        kind: IncrementKind,
    ) -> VoiceResult<String> {
        let history = self
            .store
            .history(conversation_id)
            .await
            .unwrap_or_default();

        let (tx, mut rx) = mpsc::channel::<String>(32);
        let chat = Arc::clone(&self.providers.chat);
        let system_prompt = self.system_prompt.clone();
        let task = tokio::spawn(async move { chat.complete(&system_prompt, &history, tx).await });

        while let Some(increment) = rx.recv().await {
            let event = match kind {
                IncrementKind::Transcript => VoiceEvent::Transcript { data: increment },
                IncrementKind::Text => VoiceEvent::Text { data: increment },
            };
            self.send(events, event).await?;
        }

        match task.await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(VoiceError::Completion(format!(
                "completion task panicked: {}",
                e
            ))),
        }
    }

    /// Synthesize the reply and emit one audio event. Synthesis failure is
    /// non-fatal; the turn proceeds without audio.
    async fn emit_reply_audio(
        &self,
        reply: &str,
        language: &str,
        events: &mpsc::Sender<VoiceEvent>,
    ) -> VoiceResult<()> {
        match synthesize_cached(
            self.providers.synthesizer.as_ref(),
            &self.cache,
            reply,
            language,
        )
        .await
        {
            Ok(audio) if !audio.is_empty() => {
                self.send(events, VoiceEvent::audio_from_pcm(&audio)).await
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Synthesis failed, reply stays text only: {}", e);
                Ok(())
            }
        }
    }

    fn language_for(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_string)
            .unwrap_or_else(|| self.default_language.clone())
    }

    async fn send(&self, events: &mpsc::Sender<VoiceEvent>, event: VoiceEvent) -> VoiceResult<()> {
        events.send(event).await.map_err(|_| VoiceError::Aborted)
    }
}
