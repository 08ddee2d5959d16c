use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audio::{pcm16_from_bytes, pcm16_to_f32};
use crate::error::{VoiceError, VoiceResult};

/// How often the playback thread polls the sink for completion
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How a playback session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The buffer played to its end
    Finished,
    /// Playback was stopped, or displaced by a newer session
    Stopped,
}

/// Audio output capability for the kiosk client
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Play mono f32 samples. Resolves when playback finishes naturally or
    /// is stopped. Starting a new play stops the previous session first.
    async fn play(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        cancel: &CancellationToken,
    ) -> VoiceResult<PlaybackOutcome>;

    /// Stop the active session, if any. Safe to call when idle.
    fn stop(&self);
}

enum PlaybackCommand {
    Play {
        samples: Vec<f32>,
        sample_rate: u32,
        done: oneshot::Sender<VoiceResult<PlaybackOutcome>>,
    },
    Stop,
}

/// Plays audio through rodio on a dedicated thread.
///
/// The output stream must stay on the thread that opened it, so the
/// backend hands samples over a channel and the thread owns the stream,
/// the sink, and the at-most-one-active-session rule.
pub struct RodioBackend {
    commands: mpsc::Sender<PlaybackCommand>,
}

impl RodioBackend {
    /// Open the default output device. Fails when no device is available.
    pub fn new() -> VoiceResult<Self> {
        let (commands, receiver) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("kiosk-playback".to_string())
            .spawn(move || playback_thread(receiver, ready_tx))
            .map_err(|e| VoiceError::Playback(format!("Failed to spawn playback thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { commands }),
            Ok(Err(e)) => Err(VoiceError::Playback(e)),
            Err(_) => Err(VoiceError::Playback(
                "playback thread exited during startup".to_string(),
            )),
        }
    }
}

#[async_trait]
impl PlaybackBackend for RodioBackend {
    async fn play(
        &self,
        samples: Vec<f32>,
        sample_rate: u32,
        cancel: &CancellationToken,
    ) -> VoiceResult<PlaybackOutcome> {
        let (done, mut done_rx) = oneshot::channel();
        self.commands
            .send(PlaybackCommand::Play {
                samples,
                sample_rate,
                done,
            })
            .map_err(|_| VoiceError::Playback("playback thread is gone".to_string()))?;

        tokio::select! {
            outcome = &mut done_rx => flatten(outcome),
            _ = cancel.cancelled() => {
                let _ = self.commands.send(PlaybackCommand::Stop);
                flatten(done_rx.await)
            }
        }
    }

    fn stop(&self) {
        let _ = self.commands.send(PlaybackCommand::Stop);
    }
}

fn flatten(
    received: Result<VoiceResult<PlaybackOutcome>, oneshot::error::RecvError>,
) -> VoiceResult<PlaybackOutcome> {
    match received {
        Ok(result) => result,
        Err(_) => Err(VoiceError::Playback("playback thread exited".to_string())),
    }
}

fn playback_thread(
    commands: mpsc::Receiver<PlaybackCommand>,
    ready: mpsc::Sender<Result<(), String>>,
) {
    // The stream handle pair must live here for the thread's lifetime;
    // dropping the stream silences the device.
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            let _ = ready.send(Err(format!("Failed to open output device: {}", e)));
            return;
        }
    };
    let _ = ready.send(Ok(()));
    info!("Playback thread ready");

    let mut current: Option<(Sink, oneshot::Sender<VoiceResult<PlaybackOutcome>>)> = None;

    loop {
        // Poll the sink while a session is active, otherwise block until
        // the next command
        let command = if current.is_some() {
            match commands.recv_timeout(POLL_INTERVAL) {
                Ok(command) => Some(command),
                Err(mpsc::RecvTimeoutError::Timeout) => None,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        match command {
            Some(PlaybackCommand::Play {
                samples,
                sample_rate,
                done,
            }) => {
                // Exactly one session at a time: tear down the old one
                if let Some((sink, pending)) = current.take() {
                    sink.stop();
                    let _ = pending.send(Ok(PlaybackOutcome::Stopped));
                }

                match Sink::try_new(&handle) {
                    Ok(sink) => {
                        sink.append(SamplesBuffer::new(1, sample_rate, samples));
                        current = Some((sink, done));
                    }
                    Err(e) => {
                        warn!("Failed to open playback sink: {}", e);
                        let _ = done.send(Err(VoiceError::Playback(e.to_string())));
                    }
                }
            }
            Some(PlaybackCommand::Stop) => {
                if let Some((sink, pending)) = current.take() {
                    sink.stop();
                    let _ = pending.send(Ok(PlaybackOutcome::Stopped));
                }
            }
            None => {
                let finished = current
                    .as_ref()
                    .map(|(sink, _)| sink.empty())
                    .unwrap_or(false);
                if finished {
                    if let Some((_sink, pending)) = current.take() {
                        let _ = pending.send(Ok(PlaybackOutcome::Finished));
                    }
                }
            }
        }
    }
}

/// Client-side PCM playback with exclusive session ownership
pub struct PlaybackEngine {
    backend: Arc<dyn PlaybackBackend>,
    sample_rate: u32,
}

impl PlaybackEngine {
    pub fn new(backend: Arc<dyn PlaybackBackend>, sample_rate: u32) -> Self {
        Self {
            backend,
            sample_rate,
        }
    }

    /// Decode little-endian PCM16 bytes to [-1, 1] floats and play them.
    /// Resolves when playback completes naturally or is stopped.
    pub async fn play(
        &self,
        pcm: &[u8],
        cancel: &CancellationToken,
    ) -> VoiceResult<PlaybackOutcome> {
        let samples = pcm16_to_f32(&pcm16_from_bytes(pcm));
        if samples.is_empty() {
            return Ok(PlaybackOutcome::Finished);
        }
        self.backend.play(samples, self.sample_rate, cancel).await
    }

    /// Stop whatever is playing. Idempotent, safe when nothing plays.
    pub fn stop(&self) {
        self.backend.stop();
    }
}
