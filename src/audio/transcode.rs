use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::fs;
use tokio::process::Command;
use tracing::{info, warn};
use uuid::Uuid;

use super::format::detect_format;

/// Timeout for a single decoder run
const TRANSCODE_TIMEOUT: Duration = Duration::from_secs(60);

/// Sample rate expected by transcription providers
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Errors from the external audio decoder
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to spawn decoder {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Decoder failed ({status}): {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("Decoder timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts uploaded audio to mono 16kHz 16-bit WAV via an external decoder
/// (ffmpeg by default)
pub struct Transcoder {
    decoder_path: PathBuf,
    work_dir: PathBuf,
}

impl Transcoder {
    pub fn new(decoder_path: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            decoder_path: decoder_path.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Decode `data` to a mono 16kHz s16le WAV buffer.
    ///
    /// The buffer round-trips through scratch files in the work directory;
    /// both files are removed on every exit path, including timeouts.
    pub async fn transcode(&self, data: &[u8]) -> Result<Vec<u8>, TranscodeError> {
        let format = detect_format(data);
        let id = Uuid::new_v4();
        let input_path = self
            .work_dir
            .join(format!("voice-in-{}.{}", id, format.extension()));
        let output_path = self.work_dir.join(format!("voice-out-{}.wav", id));
        let _scratch = ScratchFiles {
            paths: [input_path.clone(), output_path.clone()],
        };

        fs::write(&input_path, data).await?;

        let mut command = Command::new(&self.decoder_path);
        command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(&input_path)
            .arg("-vn") // strip any video track (WebM uploads may carry one)
            .arg("-ac")
            .arg("1")
            .arg("-ar")
            .arg(TARGET_SAMPLE_RATE.to_string())
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-f")
            .arg("wav")
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| TranscodeError::Spawn {
            program: self.decoder_path.display().to_string(),
            source: e,
        })?;

        let output = tokio::time::timeout(TRANSCODE_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| TranscodeError::Timeout(TRANSCODE_TIMEOUT))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(TranscodeError::Failed {
                status: output.status,
                stderr,
            });
        }

        let wav = fs::read(&output_path).await?;
        info!(
            "Transcoded {} upload: {} bytes -> {} bytes WAV",
            format,
            data.len(),
            wav.len()
        );
        Ok(wav)
    }
}

/// Removes scratch files when a transcode attempt ends
struct ScratchFiles {
    paths: [PathBuf; 2],
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove scratch file {:?}: {}", path, e);
                }
            }
        }
    }
}
