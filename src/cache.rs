use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

/// Default number of cached utterances
pub const DEFAULT_CACHE_CAPACITY: usize = 150;

/// One synthesized utterance is keyed by (text, language)
type CacheKey = (String, String);

struct CacheInner {
    entries: HashMap<CacheKey, Arc<Vec<u8>>>,
    /// Insertion order, oldest first
    order: VecDeque<CacheKey>,
}

/// Bounded cache of synthesized speech keyed by (text, language).
///
/// Eviction is first-in first-out: neither lookups nor re-insertions of an
/// existing key move it back in the eviction queue.
pub struct TtsCache {
    capacity: usize,
    inner: RwLock<CacheInner>,
}

impl TtsCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    /// Look up synthesized audio for an exact (text, language) pair
    pub async fn get(&self, text: &str, language: &str) -> Option<Arc<Vec<u8>>> {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(&(text.to_string(), language.to_string()))
            .cloned()
    }

    /// Store synthesized audio, evicting the oldest entries once capacity
    /// is exceeded. Re-inserting an existing key replaces its audio but
    /// keeps its original queue position.
    pub async fn put(&self, text: &str, language: &str, audio: Arc<Vec<u8>>) {
        let key = (text.to_string(), language.to_string());
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner.entries.get_mut(&key) {
            *existing = audio;
            return;
        }

        inner.entries.insert(key.clone(), audio);
        inner.order.push_back(key);

        while inner.entries.len() > self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                    debug!("Evicted cached utterance: {:?}", oldest);
                }
                None => break,
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}
