use tracing::info;

use super::format::{detect_format, AudioFormat};
use super::transcode::{TranscodeError, Transcoder};

/// Formats submitted to transcription providers without conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedFormat {
    Wav,
    Mp3,
}

impl NormalizedFormat {
    pub fn as_audio_format(&self) -> AudioFormat {
        match self {
            NormalizedFormat::Wav => AudioFormat::Wav,
            NormalizedFormat::Mp3 => AudioFormat::Mp3,
        }
    }
}

/// An upload buffer ready for transcription
pub struct NormalizedAudio {
    pub bytes: Vec<u8>,
    pub format: NormalizedFormat,
}

/// Decides per upload whether decoding is required before transcription
pub struct FormatNormalizer {
    transcoder: Transcoder,
}

impl FormatNormalizer {
    pub fn new(transcoder: Transcoder) -> Self {
        Self { transcoder }
    }

    /// Pass WAV and MP3 uploads through untouched; decode everything else
    /// (including unrecognized buffers, which the decoder probes itself)
    /// to mono 16kHz WAV.
    pub async fn ensure_compatible(&self, data: &[u8]) -> Result<NormalizedAudio, TranscodeError> {
        match detect_format(data) {
            AudioFormat::Wav => Ok(NormalizedAudio {
                bytes: data.to_vec(),
                format: NormalizedFormat::Wav,
            }),
            AudioFormat::Mp3 => Ok(NormalizedAudio {
                bytes: data.to_vec(),
                format: NormalizedFormat::Mp3,
            }),
            other => {
                info!("Transcoding {} upload ({} bytes) to WAV", other, data.len());
                let wav = self.transcoder.transcode(data).await?;
                Ok(NormalizedAudio {
                    bytes: wav,
                    format: NormalizedFormat::Wav,
                })
            }
        }
    }
}
