use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Speech synthesis
        .route("/api/tts", post(handlers::synthesize_speech))
        // Conversation lifecycle
        .route("/api/conversations", post(handlers::create_conversation))
        .route(
            "/api/conversations/:conversation_id",
            delete(handlers::delete_conversation),
        )
        // Voice turns and history
        .route(
            "/api/conversations/:conversation_id/messages",
            get(handlers::get_conversation_messages).post(handlers::post_voice_message),
        )
        // Text turns
        .route("/api/text-chat", post(handlers::post_text_chat))
        // Voice uploads arrive as base64 JSON, larger than the default body cap
        .layer(DefaultBodyLimit::max(32 * 1024 * 1024))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
