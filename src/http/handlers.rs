use super::state::AppState;
use crate::pipeline::{TextTurnRequest, VoiceEvent, VoiceTurnRequest};
use crate::providers::synthesize_cached;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use futures::StreamExt;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    /// Optional display title
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoiceMessageRequest {
    /// Base64-encoded audio capture
    pub audio: String,
    /// Language tag for transcription and synthesis
    pub language: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChatRequest {
    pub message: String,
    pub conversation_id: Option<i64>,
    /// Also synthesize the reply and stream an audio event
    #[serde(default)]
    pub include_audio: bool,
    pub language: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/tts
/// Synthesize speech for a text prompt, serving repeats from the cache
pub async fn synthesize_speech(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    // Validate by hand so a missing, non-string, or empty text is a 400
    // rather than a deserialization error
    let text = match body.get("text").and_then(|t| t.as_str()) {
        Some(t) if !t.trim().is_empty() => t.trim().to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "text is required and must be a non-empty string".to_string(),
                }),
            )
                .into_response();
        }
    };
    let lang = body
        .get("lang")
        .and_then(|l| l.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| state.default_language.clone());

    match synthesize_cached(state.synthesizer.as_ref(), &state.tts_cache, &text, &lang).await {
        Ok(audio) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/octet-stream"),
                (header::CACHE_CONTROL, "public, max-age=86400"),
            ],
            Body::from(audio.as_ref().clone()),
        )
            .into_response(),
        Err(e) => {
            error!("Synthesis failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Synthesis failed: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// POST /api/conversations
/// Create a conversation
pub async fn create_conversation(
    State(state): State<AppState>,
    Json(req): Json<CreateConversationRequest>,
) -> impl IntoResponse {
    let summary = state.conversations.create(req.title).await;
    (StatusCode::OK, Json(summary)).into_response()
}

/// DELETE /api/conversations/:conversation_id
/// Delete a conversation and its history
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
) -> impl IntoResponse {
    if state.conversations.delete(conversation_id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Conversation {} not found", conversation_id),
            }),
        )
            .into_response()
    }
}

/// GET /api/conversations/:conversation_id/messages
/// Full message history for a conversation, oldest first
pub async fn get_conversation_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
) -> impl IntoResponse {
    match state.conversations.history(conversation_id).await {
        Some(messages) => (StatusCode::OK, Json(messages)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Conversation {} not found", conversation_id),
            }),
        )
            .into_response(),
    }
}

/// POST /api/conversations/:conversation_id/messages
/// Run a voice turn, streaming events as they happen
pub async fn post_voice_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Json(req): Json<VoiceMessageRequest>,
) -> impl IntoResponse {
    info!("Voice turn for conversation {}", conversation_id);

    let request = VoiceTurnRequest {
        conversation_id: Some(conversation_id),
        audio: req.audio,
        language: req.language,
    };

    let (tx, rx) = mpsc::channel::<VoiceEvent>(32);
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        orchestrator.run_voice_turn(request, tx).await;
    });

    event_stream_response(rx)
}

/// POST /api/text-chat
/// Run a text turn, streaming reply increments as they happen
pub async fn post_text_chat(
    State(state): State<AppState>,
    Json(req): Json<TextChatRequest>,
) -> impl IntoResponse {
    info!("Text turn for conversation {:?}", req.conversation_id);

    let request = TextTurnRequest {
        conversation_id: req.conversation_id,
        message: req.message,
        include_audio: req.include_audio,
        language: req.language,
    };

    let (tx, rx) = mpsc::channel::<VoiceEvent>(32);
    let orchestrator = Arc::clone(&state.orchestrator);
    tokio::spawn(async move {
        orchestrator.run_text_turn(request, tx).await;
    });

    event_stream_response(rx)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Wrap a turn's event channel as a streaming response, one
/// `data: <json>\n\n` frame per event, flushed as events arrive
fn event_stream_response(rx: mpsc::Receiver<VoiceEvent>) -> Response {
    let stream = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(event.sse_frame()));

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response()
}
