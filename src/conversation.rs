use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Conversation metadata as returned by the HTTP API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

struct Conversation {
    summary: ConversationSummary,
    messages: Vec<Message>,
}

/// In-memory store of conversations keyed by numeric id.
///
/// History lives only as long as the process; it exists to supply prior
/// turns as completion context, not as durable storage. The pipeline only
/// appends and reads, it never rewrites history.
pub struct ConversationStore {
    next_id: AtomicI64,
    conversations: RwLock<HashMap<i64, Conversation>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Create a conversation with an optional title
    pub async fn create(&self, title: Option<String>) -> ConversationSummary {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let summary = ConversationSummary {
            id,
            title: title.unwrap_or_else(|| format!("Conversation {}", id)),
            created_at: Utc::now(),
        };

        let mut conversations = self.conversations.write().await;
        conversations.insert(
            id,
            Conversation {
                summary: summary.clone(),
                messages: Vec::new(),
            },
        );
        info!("Created conversation {}", id);

        summary
    }

    /// Delete a conversation. Returns false when the id is unknown.
    pub async fn delete(&self, id: i64) -> bool {
        let removed = self.conversations.write().await.remove(&id).is_some();
        if removed {
            info!("Deleted conversation {}", id);
        }
        removed
    }

    /// Resolve `requested` to an existing conversation, creating a fresh
    /// one when the id is absent or unknown. Returns the id actually used.
    pub async fn ensure(&self, requested: Option<i64>) -> i64 {
        if let Some(id) = requested {
            if self.conversations.read().await.contains_key(&id) {
                return id;
            }
            warn!("Conversation {} not found, starting a new one", id);
        }
        self.create(None).await.id
    }

    /// Append a message to a conversation
    pub async fn append(&self, id: i64, role: Role, content: impl Into<String>) {
        let mut conversations = self.conversations.write().await;
        match conversations.get_mut(&id) {
            Some(conversation) => conversation.messages.push(Message::new(role, content)),
            None => warn!("Dropping message for unknown conversation {}", id),
        }
    }

    /// Metadata for a conversation
    pub async fn summary(&self, id: i64) -> Option<ConversationSummary> {
        let conversations = self.conversations.read().await;
        conversations.get(&id).map(|c| c.summary.clone())
    }

    /// Full message history for a conversation, oldest first
    pub async fn history(&self, id: i64) -> Option<Vec<Message>> {
        let conversations = self.conversations.read().await;
        conversations.get(&id).map(|c| c.messages.clone())
    }
}
