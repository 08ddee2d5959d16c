// Tests for the kiosk-side speech queue
//
// A fake fetcher and playback backend stand in for the server and the
// sound device, so these tests pin the queue's ordering, preemption, and
// shutdown behavior without audio hardware.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use kiosk_voice::audio::pcm16_to_bytes;
use kiosk_voice::error::{VoiceError, VoiceResult};
use kiosk_voice::speech::{
    PlaybackBackend, PlaybackEngine, PlaybackOutcome, SpeakOutcome, SpeechFetcher, SpeechQueue,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Fetcher that records request order and simulates latency
struct FakeFetcher {
    log: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeFetcher {
    fn new(delay: Duration) -> Self {
        Self {
            log: Mutex::new(Vec::new()),
            delay,
        }
    }
}

#[async_trait]
impl SpeechFetcher for FakeFetcher {
    async fn fetch(
        &self,
        text: &str,
        _language: &str,
        cancel: &CancellationToken,
    ) -> VoiceResult<Arc<Vec<u8>>> {
        self.log.lock().await.push(text.to_string());
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => Ok(Arc::new(vec![0u8; 64])),
            _ = cancel.cancelled() => Err(VoiceError::Aborted),
        }
    }
}

/// Fetcher that always fails
struct FailingFetcher;

#[async_trait]
impl SpeechFetcher for FailingFetcher {
    async fn fetch(
        &self,
        _text: &str,
        _language: &str,
        _cancel: &CancellationToken,
    ) -> VoiceResult<Arc<Vec<u8>>> {
        Err(VoiceError::Http("server offline".to_string()))
    }
}

/// Backend that records what it plays and simulates playback time
struct FakeBackend {
    sessions: Mutex<Vec<Vec<f32>>>,
    stops: AtomicUsize,
    duration: Duration,
}

impl FakeBackend {
    fn new(duration: Duration) -> Self {
        Self {
            sessions: Mutex::new(Vec::new()),
            stops: AtomicUsize::new(0),
            duration,
        }
    }
}

#[async_trait]
impl PlaybackBackend for FakeBackend {
    async fn play(
        &self,
        samples: Vec<f32>,
        _sample_rate: u32,
        cancel: &CancellationToken,
    ) -> VoiceResult<PlaybackOutcome> {
        self.sessions.lock().await.push(samples);
        tokio::select! {
            _ = tokio::time::sleep(self.duration) => Ok(PlaybackOutcome::Finished),
            _ = cancel.cancelled() => Ok(PlaybackOutcome::Stopped),
        }
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

fn quick_queue(fetcher: Arc<dyn SpeechFetcher>) -> SpeechQueue {
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(10)));
    SpeechQueue::start(fetcher, PlaybackEngine::new(backend, 16_000))
}

#[tokio::test]
async fn test_items_speak_in_submission_order() -> Result<()> {
    let fetcher = Arc::new(FakeFetcher::new(Duration::from_millis(1)));
    let queue = quick_queue(Arc::clone(&fetcher) as Arc<dyn SpeechFetcher>);

    let first = queue.enqueue("first", "en").await;
    let second = queue.enqueue("second", "en").await;
    let third = queue.enqueue("third", "en").await;

    assert_eq!(first.await?, SpeakOutcome::Spoken);
    assert_eq!(second.await?, SpeakOutcome::Spoken);
    assert_eq!(third.await?, SpeakOutcome::Spoken);

    let log = fetcher.log.lock().await.clone();
    assert_eq!(log, vec!["first", "second", "third"]);

    Ok(())
}

#[tokio::test]
async fn test_speak_now_displaces_everything() -> Result<()> {
    let fetcher = Arc::new(FakeFetcher::new(Duration::from_millis(200)));
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(500)));
    let queue = SpeechQueue::start(
        Arc::clone(&fetcher) as Arc<dyn SpeechFetcher>,
        PlaybackEngine::new(Arc::clone(&backend) as Arc<dyn PlaybackBackend>, 16_000),
    );

    let in_flight = queue.enqueue("in flight", "en").await;
    let waiting = queue.enqueue("waiting", "en").await;

    // Let the first item get into its fetch before preempting
    tokio::time::sleep(Duration::from_millis(50)).await;
    let urgent = queue.speak_now("urgent", "en").await;

    assert_eq!(in_flight.await?, SpeakOutcome::Skipped);
    assert_eq!(waiting.await?, SpeakOutcome::Skipped);
    assert_eq!(urgent.await?, SpeakOutcome::Spoken);

    // The waiting item never reached the fetcher
    let log = fetcher.log.lock().await.clone();
    assert_eq!(log, vec!["in flight", "urgent"]);
    assert!(backend.stops.load(Ordering::SeqCst) >= 1);

    Ok(())
}

#[tokio::test]
async fn test_speak_now_interrupts_active_playback() -> Result<()> {
    let fetcher = Arc::new(FakeFetcher::new(Duration::from_millis(1)));
    let backend = Arc::new(FakeBackend::new(Duration::from_secs(5)));
    let queue = SpeechQueue::start(
        Arc::clone(&fetcher) as Arc<dyn SpeechFetcher>,
        PlaybackEngine::new(Arc::clone(&backend) as Arc<dyn PlaybackBackend>, 16_000),
    );

    let long = queue.enqueue("a very long announcement", "en").await;

    // Wait until it is audibly playing, then cut in
    tokio::time::sleep(Duration::from_millis(100)).await;
    let urgent = queue.speak_now("urgent", "en").await;

    assert_eq!(long.await?, SpeakOutcome::Skipped);

    // The urgent item still plays its full five seconds in this setup,
    // so only check that it started
    tokio::time::sleep(Duration::from_millis(300)).await;
    let sessions = backend.sessions.lock().await.len();
    assert_eq!(sessions, 2, "urgent playback should have started");
    drop(urgent);

    Ok(())
}

#[tokio::test]
async fn test_close_skips_pending_items() -> Result<()> {
    let fetcher = Arc::new(FakeFetcher::new(Duration::from_millis(1)));
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(300)));
    let queue = SpeechQueue::start(
        Arc::clone(&fetcher) as Arc<dyn SpeechFetcher>,
        PlaybackEngine::new(backend, 16_000),
    );

    let playing = queue.enqueue("playing", "en").await;
    let pending = queue.enqueue("pending", "en").await;

    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.close().await;

    assert_eq!(playing.await?, SpeakOutcome::Skipped);
    assert_eq!(pending.await?, SpeakOutcome::Skipped);

    // After close, new items are refused immediately
    let refused = queue.enqueue("too late", "en").await;
    assert_eq!(refused.await?, SpeakOutcome::Skipped);

    Ok(())
}

#[tokio::test]
async fn test_fetch_failure_reports_failed_and_queue_survives() -> Result<()> {
    let queue = quick_queue(Arc::new(FailingFetcher));

    let first = queue.enqueue("one", "en").await;
    match first.await? {
        SpeakOutcome::Failed(message) => assert!(message.contains("offline")),
        other => panic!("Expected a failure outcome, got: {:?}", other),
    }

    // The consumer keeps going after a failure
    let second = queue.enqueue("two", "en").await;
    assert!(matches!(second.await?, SpeakOutcome::Failed(_)));

    Ok(())
}

#[tokio::test]
async fn test_speak_with_delay_defers_the_preemption() -> Result<()> {
    let fetcher = Arc::new(FakeFetcher::new(Duration::from_millis(1)));
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(400)));
    let queue = SpeechQueue::start(
        Arc::clone(&fetcher) as Arc<dyn SpeechFetcher>,
        PlaybackEngine::new(backend, 16_000),
    );

    let background = queue.enqueue("background", "en").await;
    let announce = queue.speak_with_delay("announcement", "en", Duration::from_millis(100));

    assert_eq!(background.await?, SpeakOutcome::Skipped);
    assert_eq!(announce.await?, SpeakOutcome::Spoken);

    let log = fetcher.log.lock().await.clone();
    assert_eq!(log, vec!["background", "announcement"]);

    Ok(())
}

#[tokio::test]
async fn test_playback_engine_decodes_pcm16() -> Result<()> {
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(1)));
    let engine = PlaybackEngine::new(Arc::clone(&backend) as Arc<dyn PlaybackBackend>, 16_000);

    let pcm = pcm16_to_bytes(&[0, 16_384, -32_768]);
    let outcome = engine.play(&pcm, &CancellationToken::new()).await?;

    assert_eq!(outcome, PlaybackOutcome::Finished);
    let sessions = backend.sessions.lock().await.clone();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0], vec![0.0, 0.5, -1.0]);

    Ok(())
}

#[tokio::test]
async fn test_playback_engine_skips_empty_buffers() -> Result<()> {
    let backend = Arc::new(FakeBackend::new(Duration::from_millis(1)));
    let engine = PlaybackEngine::new(Arc::clone(&backend) as Arc<dyn PlaybackBackend>, 16_000);

    let outcome = engine.play(&[], &CancellationToken::new()).await?;

    assert_eq!(outcome, PlaybackOutcome::Finished);
    assert!(backend.sessions.lock().await.is_empty());

    Ok(())
}
