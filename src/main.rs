use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use kiosk_voice::audio::{FormatNormalizer, Transcoder};
use kiosk_voice::cache::TtsCache;
use kiosk_voice::config::Config;
use kiosk_voice::conversation::ConversationStore;
use kiosk_voice::http::{create_router, AppState};
use kiosk_voice::pipeline::VoiceOrchestrator;
use kiosk_voice::providers::ProviderFactory;
use tokio::net::TcpListener;
use tracing::info;

/// Voice interaction server for the citizen-services kiosk
#[derive(Parser, Debug)]
#[command(name = "kiosk-voice", version)]
struct Args {
    /// Path to the configuration file, without extension
    #[arg(long, default_value = "config/kiosk-voice")]
    config: String,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the configured port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    info!("{} starting", config.service.name);

    let bind = args.bind.unwrap_or_else(|| config.service.http.bind.clone());
    let port = args.port.unwrap_or(config.service.http.port);

    // An empty work_dir selects the system temp directory
    let work_dir = if config.transcode.work_dir.is_empty() {
        std::env::temp_dir()
    } else {
        PathBuf::from(&config.transcode.work_dir)
    };
    let transcoder = Transcoder::new(&config.transcode.decoder_path, work_dir);
    let normalizer = FormatNormalizer::new(transcoder);

    let providers = ProviderFactory::create(&config.providers)?;
    let conversations = Arc::new(ConversationStore::new());
    let tts_cache = Arc::new(TtsCache::new(config.cache.capacity));

    let orchestrator = Arc::new(VoiceOrchestrator::new(
        normalizer,
        providers.clone(),
        Arc::clone(&conversations),
        Arc::clone(&tts_cache),
        config.providers.chat.system_prompt.clone(),
        config.service.default_language.clone(),
    ));

    let state = AppState::new(
        orchestrator,
        conversations,
        providers.synthesizer,
        tts_cache,
        config.service.default_language.clone(),
    );
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .context("Failed to parse bind address")?;
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind HTTP listener")?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("{} shut down", config.service.name);
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
