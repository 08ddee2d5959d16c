// Integration tests for the HTTP API
//
// Each test boots the real router on an ephemeral port and talks to it
// over the wire, including reading back the event-stream bodies that
// voice and text turns produce.

use std::sync::Arc;

use anyhow::Result;
use base64::Engine;
use kiosk_voice::audio::{wrap_pcm_in_wav, FormatNormalizer, Transcoder};
use kiosk_voice::cache::TtsCache;
use kiosk_voice::conversation::ConversationStore;
use kiosk_voice::http::{create_router, AppState};
use kiosk_voice::pipeline::VoiceOrchestrator;
use kiosk_voice::providers::{
    PlaceholderChat, PlaceholderSynthesizer, PlaceholderTranscriber, ProviderSet,
};
use serde_json::{json, Value};

struct TestServer {
    base_url: String,
    cache: Arc<TtsCache>,
}

/// Boot the full router on an ephemeral port with placeholder providers
async fn spawn_server() -> TestServer {
    let store = Arc::new(ConversationStore::new());
    let cache = Arc::new(TtsCache::new(16));
    let providers = ProviderSet {
        transcriber: Arc::new(PlaceholderTranscriber::with_response("what are your hours")),
        chat: Arc::new(PlaceholderChat::with_reply("We are open until five.")),
        synthesizer: Arc::new(PlaceholderSynthesizer::new(16_000)),
    };
    let normalizer = FormatNormalizer::new(Transcoder::new(
        "/nonexistent/kiosk-test-decoder",
        std::env::temp_dir(),
    ));
    let orchestrator = Arc::new(VoiceOrchestrator::new(
        normalizer,
        providers.clone(),
        Arc::clone(&store),
        Arc::clone(&cache),
        "You are a kiosk assistant.",
        "en",
    ));
    let state = AppState::new(
        orchestrator,
        store,
        providers.synthesizer,
        Arc::clone(&cache),
        "en",
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        cache,
    }
}

/// A small valid WAV upload, base64-encoded
fn wav_upload() -> Result<String> {
    let pcm: Vec<u8> = vec![0; 3200];
    let wav = wrap_pcm_in_wav(&pcm, 16_000)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(wav))
}

/// Split an event-stream body into its JSON payloads
fn parse_frames(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .map(|frame| {
            let json = frame
                .strip_prefix("data: ")
                .unwrap_or_else(|| panic!("frame missing data prefix: {:?}", frame));
            serde_json::from_str(json).expect("frame payload should be JSON")
        })
        .collect()
}

#[tokio::test]
async fn test_health() -> Result<()> {
    let server = spawn_server().await;

    let res = reqwest::get(format!("{}/health", server.base_url)).await?;

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn test_tts_requires_text() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    for body in [json!({}), json!({"text": 42}), json!({"text": "   "})] {
        let res = client
            .post(format!("{}/api/tts", server.base_url))
            .json(&body)
            .send()
            .await?;
        assert_eq!(res.status(), 400, "body {:?} should be rejected", body);
    }

    Ok(())
}

#[tokio::test]
async fn test_tts_returns_cacheable_audio() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/tts", server.base_url))
        .json(&json!({"text": "welcome", "lang": "en"}))
        .send()
        .await?;

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );
    assert_eq!(
        res.headers().get("cache-control").unwrap(),
        "public, max-age=86400"
    );

    let audio = res.bytes().await?;
    assert!(!audio.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_tts_caches_by_text_and_language() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        client
            .post(format!("{}/api/tts", server.base_url))
            .json(&json!({"text": "welcome"}))
            .send()
            .await?;
    }
    assert_eq!(server.cache.len().await, 1, "repeat text shares an entry");

    client
        .post(format!("{}/api/tts", server.base_url))
        .json(&json!({"text": "welcome", "lang": "es"}))
        .send()
        .await?;
    assert_eq!(server.cache.len().await, 2, "language is part of the key");

    Ok(())
}

#[tokio::test]
async fn test_conversation_lifecycle() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    // Create
    let res = client
        .post(format!("{}/api/conversations", server.base_url))
        .json(&json!({"title": "Window A"}))
        .send()
        .await?;
    assert_eq!(res.status(), 200);
    let created: Value = res.json().await?;
    assert_eq!(created["title"], "Window A");
    assert!(created["createdAt"].is_string());
    let id = created["id"].as_i64().expect("id should be numeric");

    // Empty history
    let res = client
        .get(format!(
            "{}/api/conversations/{}/messages",
            server.base_url, id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), 200);
    let messages: Value = res.json().await?;
    assert_eq!(messages.as_array().map(Vec::len), Some(0));

    // Delete, then the id is gone
    let res = client
        .delete(format!("{}/api/conversations/{}", server.base_url, id))
        .send()
        .await?;
    assert_eq!(res.status(), 204);

    let res = client
        .delete(format!("{}/api/conversations/{}", server.base_url, id))
        .send()
        .await?;
    assert_eq!(res.status(), 404);

    let res = client
        .get(format!(
            "{}/api/conversations/{}/messages",
            server.base_url, id
        ))
        .send()
        .await?;
    assert_eq!(res.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_conversation_gets_default_title() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/conversations", server.base_url))
        .json(&json!({}))
        .send()
        .await?;
    let created: Value = res.json().await?;

    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["title"], format!("Conversation {}", id).as_str());

    Ok(())
}

#[tokio::test]
async fn test_voice_message_streams_ordered_events() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(format!("{}/api/conversations", server.base_url))
        .json(&json!({}))
        .send()
        .await?
        .json()
        .await?;
    let id = created["id"].as_i64().unwrap();

    let res = client
        .post(format!(
            "{}/api/conversations/{}/messages",
            server.base_url, id
        ))
        .json(&json!({"audio": wav_upload()?}))
        .send()
        .await?;

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "text/event-stream"
    );
    assert_eq!(res.headers().get("cache-control").unwrap(), "no-cache");

    let frames = parse_frames(&res.text().await?);
    assert!(frames.len() >= 3, "expected several events: {:?}", frames);

    assert_eq!(frames[0]["type"], "user_transcript");
    assert_eq!(frames[0]["data"], "what are your hours");

    let last = frames.last().unwrap();
    assert_eq!(last["type"], "done");
    assert_eq!(last["transcript"], "We are open until five.");
    assert_eq!(last["conversationId"], id);

    assert!(
        frames.iter().any(|f| f["type"] == "audio"),
        "voice turns carry synthesized audio"
    );

    // And the turn was persisted
    let messages: Value = client
        .get(format!(
            "{}/api/conversations/{}/messages",
            server.base_url, id
        ))
        .send()
        .await?
        .json()
        .await?;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "what are your hours");
    assert_eq!(messages[1]["role"], "assistant");
    assert!(messages[1]["createdAt"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_text_chat_streams_text_events() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/text-chat", server.base_url))
        .json(&json!({"message": "hello", "includeAudio": false}))
        .send()
        .await?;

    assert_eq!(res.status(), 200);
    let frames = parse_frames(&res.text().await?);

    let reply: String = frames
        .iter()
        .filter(|f| f["type"] == "text")
        .filter_map(|f| f["data"].as_str())
        .collect();
    assert_eq!(reply, "We are open until five.");

    assert!(!frames.iter().any(|f| f["type"] == "audio"));
    assert!(!frames.iter().any(|f| f["type"] == "user_transcript"));

    let last = frames.last().unwrap();
    assert_eq!(last["type"], "done");
    assert!(
        last.get("transcript").is_none(),
        "text turns omit the transcript field entirely"
    );
    assert!(last["conversationId"].is_i64());

    Ok(())
}

#[tokio::test]
async fn test_text_chat_with_audio() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/text-chat", server.base_url))
        .json(&json!({"message": "hello", "includeAudio": true}))
        .send()
        .await?;

    let frames = parse_frames(&res.text().await?);
    assert!(frames.iter().any(|f| f["type"] == "audio"));

    Ok(())
}

#[tokio::test]
async fn test_text_chat_rejects_empty_message_in_stream() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/text-chat", server.base_url))
        .json(&json!({"message": ""}))
        .send()
        .await?;

    // The turn starts streaming before validation, so the failure arrives
    // as the stream's terminal event
    assert_eq!(res.status(), 200);
    let frames = parse_frames(&res.text().await?);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "error");

    Ok(())
}

#[tokio::test]
async fn test_voice_message_with_bad_base64_streams_error() -> Result<()> {
    let server = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/conversations/1/messages", server.base_url))
        .json(&json!({"audio": "@@not-base64@@"}))
        .send()
        .await?;

    assert_eq!(res.status(), 200);
    let frames = parse_frames(&res.text().await?);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["type"], "error");

    Ok(())
}
