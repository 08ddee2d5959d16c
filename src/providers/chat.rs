use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::warn;

use crate::conversation::{Message, Role};
use crate::error::{VoiceError, VoiceResult};

/// Text-completion capability.
///
/// `complete` sends reply increments into `increments` as they arrive and
/// returns the assembled reply once the provider finishes. Implementations
/// without streaming support send the whole reply as one increment. Send
/// failures are ignored so a disconnected consumer never cuts the reply
/// short.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Message],
        increments: mpsc::Sender<String>,
    ) -> VoiceResult<String>;
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
    }
}

/// Ollama-compatible chat endpoint (`POST {host}/api/chat`) with streaming
/// newline-delimited JSON responses
pub struct HttpChatProvider {
    host: String,
    model: String,
    client: reqwest::Client,
}

impl HttpChatProvider {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> VoiceResult<Self> {
        // No overall timeout: the response streams for as long as the
        // model generates.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| VoiceError::Completion(e.to_string()))?;

        Ok(Self {
            host: host.into(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[Message],
        increments: mpsc::Sender<String>,
    ) -> VoiceResult<String> {
        let mut messages = vec![json!({"role": "system", "content": system_prompt})];
        for message in history {
            messages.push(json!({
                "role": role_name(message.role),
                "content": message.content,
            }));
        }

        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });
        let url = format!("{}/api/chat", self.host.trim_end_matches('/'));

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Completion(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Completion(format!(
                "Chat API error {}: {}",
                status, body
            )));
        }

        // One JSON object per line; buffer bytes until a full line arrives
        let mut stream = res.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut reply = String::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| VoiceError::Completion(e.to_string()))?;
            pending.extend_from_slice(&chunk);

            while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let value: serde_json::Value = match serde_json::from_str(line) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Skipping unparseable chat chunk: {}", e);
                        continue;
                    }
                };

                if let Some(content) = value.pointer("/message/content").and_then(|c| c.as_str()) {
                    if !content.is_empty() {
                        reply.push_str(content);
                        let _ = increments.send(content.to_string()).await;
                    }
                }

                if value.get("done").and_then(|d| d.as_bool()).unwrap_or(false) {
                    return Ok(reply);
                }
            }
        }

        Ok(reply)
    }
}

const DEFAULT_PLACEHOLDER_REPLY: &str =
    "I'm sorry, the assistant is not connected yet. Please ask a staff member for help.";

/// Placeholder chat provider: streams a canned reply word by word. Use for
/// running the pipeline without a completion service.
#[derive(Debug, Default)]
pub struct PlaceholderChat {
    /// If set, reply with this instead of the default message.
    pub reply: Option<String>,
}

impl PlaceholderChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(s: impl Into<String>) -> Self {
        Self {
            reply: Some(s.into()),
        }
    }
}

#[async_trait]
impl ChatProvider for PlaceholderChat {
    async fn complete(
        &self,
        _system_prompt: &str,
        _history: &[Message],
        increments: mpsc::Sender<String>,
    ) -> VoiceResult<String> {
        let reply = self
            .reply
            .clone()
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER_REPLY.to_string());

        // Word by word so consumers exercise the incremental path
        for word in reply.split_inclusive(' ') {
            let _ = increments.send(word.to_string()).await;
        }

        Ok(reply)
    }
}
