pub mod format;
pub mod normalize;
pub mod pcm;
pub mod transcode;

pub use format::{detect_format, AudioFormat};
pub use normalize::{FormatNormalizer, NormalizedAudio, NormalizedFormat};
pub use pcm::{pcm16_from_bytes, pcm16_to_bytes, pcm16_to_f32, wrap_pcm_in_wav};
pub use transcode::{TranscodeError, Transcoder, TARGET_SAMPLE_RATE};
