use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::VoiceError;
use crate::speech::fetch::SpeechFetcher;
use crate::speech::playback::{PlaybackEngine, PlaybackOutcome};

/// Pause between consecutive utterances so they do not run together
const INTER_ITEM_GAP: Duration = Duration::from_millis(200);

/// Pause after a preemption so stop and restart do not race on the device
const PREEMPT_SETTLE: Duration = Duration::from_millis(150);

/// How a queued speak request was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// The item was fetched and played to completion
    Spoken,
    /// The item was displaced by a newer request or the queue closed
    Skipped,
    /// Fetching or playing the item failed
    Failed(String),
}

struct QueueItem {
    text: String,
    language: String,
    done: oneshot::Sender<SpeakOutcome>,
}

struct QueueInner {
    pending: Mutex<VecDeque<QueueItem>>,
    notify: Notify,
    /// Token for the item currently being fetched or played
    current_cancel: Mutex<Option<CancellationToken>>,
    closed: AtomicBool,
    fetcher: Arc<dyn SpeechFetcher>,
    playback: PlaybackEngine,
}

/// Ordered queue of speak requests with a single background consumer.
///
/// Items play strictly in submission order with a short gap between
/// them. [`SpeechQueue::speak_now`] preempts: it cancels the in-flight
/// item, clears everything pending, and speaks its own text after a
/// short settle.
#[derive(Clone)]
pub struct SpeechQueue {
    inner: Arc<QueueInner>,
}

impl SpeechQueue {
    /// Create the queue and start its consumer task
    pub fn start(fetcher: Arc<dyn SpeechFetcher>, playback: PlaybackEngine) -> Self {
        let inner = Arc::new(QueueInner {
            pending: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            current_cancel: Mutex::new(None),
            closed: AtomicBool::new(false),
            fetcher,
            playback,
        });

        tokio::spawn(consume(Arc::clone(&inner)));

        Self { inner }
    }

    /// Queue `text` to be spoken after everything already queued. The
    /// returned receiver resolves once the item is spoken or skipped.
    pub async fn enqueue(
        &self,
        text: impl Into<String>,
        language: impl Into<String>,
    ) -> oneshot::Receiver<SpeakOutcome> {
        let (done, done_rx) = oneshot::channel();

        if self.inner.closed.load(Ordering::SeqCst) {
            let _ = done.send(SpeakOutcome::Skipped);
            return done_rx;
        }

        self.inner.pending.lock().await.push_back(QueueItem {
            text: text.into(),
            language: language.into(),
            done,
        });
        self.inner.notify.notify_one();

        done_rx
    }

    /// Speak `text` immediately: cancel the in-flight item, discard the
    /// queue, settle briefly, then play
    pub async fn speak_now(
        &self,
        text: impl Into<String>,
        language: impl Into<String>,
    ) -> oneshot::Receiver<SpeakOutcome> {
        if let Some(token) = self.inner.current_cancel.lock().await.take() {
            token.cancel();
        }
        self.inner.playback.stop();

        let displaced: Vec<QueueItem> = self.inner.pending.lock().await.drain(..).collect();
        for item in displaced {
            let _ = item.done.send(SpeakOutcome::Skipped);
        }

        tokio::time::sleep(PREEMPT_SETTLE).await;

        self.enqueue(text, language).await
    }

    /// Schedule a [`SpeechQueue::speak_now`] for `delay` in the future,
    /// leaving the queue untouched until then
    pub fn speak_with_delay(
        &self,
        text: impl Into<String>,
        language: impl Into<String>,
        delay: Duration,
    ) -> oneshot::Receiver<SpeakOutcome> {
        let (done, done_rx) = oneshot::channel();
        let queue = self.clone();
        let text = text.into();
        let language = language.into();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let receiver = queue.speak_now(text, language).await;
            let outcome = receiver.await.unwrap_or(SpeakOutcome::Skipped);
            let _ = done.send(outcome);
        });

        done_rx
    }

    /// Stop playback, discard everything pending, and refuse further items
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);

        if let Some(token) = self.inner.current_cancel.lock().await.take() {
            token.cancel();
        }
        self.inner.playback.stop();

        let displaced: Vec<QueueItem> = self.inner.pending.lock().await.drain(..).collect();
        for item in displaced {
            let _ = item.done.send(SpeakOutcome::Skipped);
        }

        self.inner.notify.notify_waiters();
    }

    /// Number of items waiting behind the one currently speaking
    pub async fn pending_len(&self) -> usize {
        self.inner.pending.lock().await.len()
    }
}

async fn consume(inner: Arc<QueueInner>) {
    loop {
        if inner.closed.load(Ordering::SeqCst) {
            break;
        }

        let item = inner.pending.lock().await.pop_front();
        let item = match item {
            Some(item) => item,
            None => {
                inner.notify.notified().await;
                continue;
            }
        };

        let token = CancellationToken::new();
        *inner.current_cancel.lock().await = Some(token.clone());

        let outcome = speak_item(&inner, &item.text, &item.language, &token).await;

        *inner.current_cancel.lock().await = None;
        let _ = item.done.send(outcome);

        tokio::time::sleep(INTER_ITEM_GAP).await;
    }
}

async fn speak_item(
    inner: &QueueInner,
    text: &str,
    language: &str,
    cancel: &CancellationToken,
) -> SpeakOutcome {
    let audio = match inner.fetcher.fetch(text, language, cancel).await {
        Ok(audio) => audio,
        Err(VoiceError::Aborted) => return SpeakOutcome::Skipped,
        Err(e) => {
            warn!("Speech fetch failed: {}", e);
            return SpeakOutcome::Failed(e.to_string());
        }
    };

    match inner.playback.play(&audio, cancel).await {
        Ok(PlaybackOutcome::Finished) => SpeakOutcome::Spoken,
        Ok(PlaybackOutcome::Stopped) => SpeakOutcome::Skipped,
        Err(e) => {
            warn!("Playback failed: {}", e);
            SpeakOutcome::Failed(e.to_string())
        }
    }
}
