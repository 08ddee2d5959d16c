// Voice turn demo: drives the whole pipeline in-process
//
// Runs one voice turn against the placeholder providers, so it works
// without ffmpeg, a network connection, or any external service, and
// prints the event stream a kiosk client would receive.

use std::sync::Arc;

use anyhow::Result;
use base64::Engine;
use kiosk_voice::audio::{wrap_pcm_in_wav, FormatNormalizer, Transcoder};
use kiosk_voice::cache::TtsCache;
use kiosk_voice::conversation::ConversationStore;
use kiosk_voice::pipeline::{VoiceEvent, VoiceOrchestrator, VoiceTurnRequest};
use kiosk_voice::providers::{
    PlaceholderChat, PlaceholderSynthesizer, PlaceholderTranscriber, ProviderSet,
};
use tokio::sync::mpsc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("🎤 Driving one voice turn through the pipeline");

    let providers = ProviderSet {
        transcriber: Arc::new(PlaceholderTranscriber::with_response(
            "when does the office open",
        )),
        chat: Arc::new(PlaceholderChat::with_reply(
            "The office opens at nine tomorrow morning.",
        )),
        synthesizer: Arc::new(PlaceholderSynthesizer::new(16_000)),
    };
    let store = Arc::new(ConversationStore::new());
    let orchestrator = VoiceOrchestrator::new(
        FormatNormalizer::new(Transcoder::new("ffmpeg", std::env::temp_dir())),
        providers,
        Arc::clone(&store),
        Arc::new(TtsCache::new(16)),
        "You are a helpful assistant at a citizen services kiosk.",
        "en",
    );

    // One second of silence, wrapped as WAV and base64-encoded the way a
    // browser upload arrives
    let pcm = vec![0u8; 32_000];
    let audio = base64::engine::general_purpose::STANDARD.encode(wrap_pcm_in_wav(&pcm, 16_000)?);

    let (tx, mut rx) = mpsc::channel(32);
    let turn = tokio::spawn(async move {
        orchestrator
            .run_voice_turn(
                VoiceTurnRequest {
                    conversation_id: None,
                    audio,
                    language: None,
                },
                tx,
            )
            .await;
    });

    while let Some(event) = rx.recv().await {
        match &event {
            VoiceEvent::Audio { data } => info!("🔊 audio event: {} base64 chars", data.len()),
            other => info!("📨 {}", serde_json::to_string(other)?),
        }
    }
    turn.await?;

    info!("✅ Turn complete");
    Ok(())
}
