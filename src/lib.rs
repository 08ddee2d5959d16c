pub mod audio;
pub mod cache;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod providers;
pub mod speech;

pub use audio::{
    detect_format, AudioFormat, FormatNormalizer, NormalizedAudio, NormalizedFormat,
    TranscodeError, Transcoder,
};
pub use cache::TtsCache;
pub use config::Config;
pub use conversation::{ConversationStore, ConversationSummary, Message, Role};
pub use error::{VoiceError, VoiceResult};
pub use http::{create_router, AppState};
pub use pipeline::{TextTurnRequest, VoiceEvent, VoiceOrchestrator, VoiceTurnRequest};
pub use providers::{ChatProvider, ProviderFactory, ProviderSet, Synthesizer, Transcriber};
pub use speech::{PlaybackEngine, RodioBackend, SpeakOutcome, SpeechQueue};
