//! HTTP API for the kiosk frontend
//!
//! This module exposes the voice pipeline over REST plus streaming:
//! - POST /api/tts - Synthesize speech for a text prompt
//! - POST /api/conversations - Create a conversation
//! - DELETE /api/conversations/:id - Delete a conversation
//! - GET /api/conversations/:id/messages - Message history
//! - POST /api/conversations/:id/messages - Voice turn (event stream)
//! - POST /api/text-chat - Text turn (event stream)
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
