//! Interactive speech client for the kiosk.
//!
//! Reads lines from stdin and speaks them through the kiosk server's
//! TTS endpoint, strictly in order. Two prefixes change scheduling:
//!
//!   !now <text>           speak immediately, dropping everything queued
//!   !later <secs> <text>  speak after a delay, preempting at that point
//!
//! Everything else is queued first-in first-out. Ctrl-D exits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use kiosk_voice::cache::{TtsCache, DEFAULT_CACHE_CAPACITY};
use kiosk_voice::speech::{
    HttpSpeechFetcher, PlaybackEngine, RodioBackend, SpeakOutcome, SpeechQueue,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "kiosk-speak", version)]
struct Args {
    /// Kiosk server base URL
    #[arg(long, default_value = "http://127.0.0.1:3100")]
    server: String,

    /// Language tag sent with every request
    #[arg(long, default_value = "en")]
    lang: String,

    /// Sample rate of the PCM the server returns
    #[arg(long, default_value_t = 24_000)]
    sample_rate: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cache = Arc::new(TtsCache::new(DEFAULT_CACHE_CAPACITY));
    let fetcher = Arc::new(
        HttpSpeechFetcher::new(args.server.clone(), cache)
            .context("Failed to build speech fetcher")?,
    );
    let backend = Arc::new(RodioBackend::new().context("Failed to open audio output")?);
    let playback = PlaybackEngine::new(backend, args.sample_rate);
    let queue = SpeechQueue::start(fetcher, playback);

    println!(
        "Connected to {}. Type text to speak it; !now <text> preempts; !later <secs> <text> delays.",
        args.server
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("!now ") {
            let text = rest.trim();
            if text.is_empty() {
                println!("usage: !now <text>");
                continue;
            }
            let receiver = queue.speak_now(text, args.lang.as_str()).await;
            report_outcome(text.to_string(), receiver);
        } else if let Some(rest) = line.strip_prefix("!later ") {
            let mut parts = rest.trim().splitn(2, ' ');
            let secs: Option<u64> = parts.next().and_then(|v| v.parse().ok());
            let text = parts.next().unwrap_or("").trim();
            match (secs, text.is_empty()) {
                (Some(secs), false) => {
                    let receiver =
                        queue.speak_with_delay(text, args.lang.as_str(), Duration::from_secs(secs));
                    report_outcome(text.to_string(), receiver);
                }
                _ => println!("usage: !later <secs> <text>"),
            }
        } else {
            let receiver = queue.enqueue(line, args.lang.as_str()).await;
            report_outcome(line.to_string(), receiver);
        }
    }

    queue.close().await;
    Ok(())
}

/// Print the outcome once the item resolves, without blocking the prompt
fn report_outcome(text: String, receiver: oneshot::Receiver<SpeakOutcome>) {
    tokio::spawn(async move {
        match receiver.await {
            Ok(SpeakOutcome::Spoken) => println!("spoken: {}", text),
            Ok(SpeakOutcome::Skipped) => println!("skipped: {}", text),
            Ok(SpeakOutcome::Failed(e)) => warn!("Failed to speak {:?}: {}", text, e),
            Err(_) => {}
        }
    });
}
