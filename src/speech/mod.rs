//! Kiosk-side speech output: fetching synthesized audio from the server
//! and playing it through the local sound device in strict order.

pub mod fetch;
pub mod playback;
pub mod queue;

pub use fetch::{HttpSpeechFetcher, SpeechFetcher};
pub use playback::{PlaybackBackend, PlaybackEngine, PlaybackOutcome, RodioBackend};
pub use queue::{SpeakOutcome, SpeechQueue};
