use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transcode: TranscodeConfig,
    pub providers: ProvidersConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Language tag assumed when a request does not specify one
    pub default_language: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct TranscodeConfig {
    /// Decoder executable; bare names are resolved via PATH
    pub decoder_path: String,
    /// Scratch directory; empty means the system temp dir
    pub work_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct ProvidersConfig {
    pub stt: SttConfig,
    pub chat: ChatConfig,
    pub tts: TtsConfig,
}

#[derive(Debug, Deserialize)]
pub struct SttConfig {
    /// Base URL of an OpenAI-compatible transcription API; empty selects
    /// the placeholder
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatConfig {
    /// Ollama-compatible host; empty selects the placeholder
    pub url: String,
    pub model: String,
    /// System instruction prepended to every completion
    pub system_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct TtsConfig {
    /// Base URL of an OpenAI-compatible speech API; empty selects the
    /// placeholder
    pub url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    /// Sample rate of the PCM the provider returns
    pub sample_rate: u32,
}

#[derive(Debug, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached utterances
    pub capacity: usize,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
