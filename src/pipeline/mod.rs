pub mod event;
pub mod orchestrator;

pub use event::VoiceEvent;
pub use orchestrator::{
    TextTurnRequest, TurnStage, VoiceOrchestrator, VoiceTurnRequest, FALLBACK_TRANSCRIPT,
};
