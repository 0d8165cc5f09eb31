use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Key-value cache for generated replies. Expiry is the backend's job:
/// a `get` past the entry's deadline reads as absent.
#[async_trait]
pub trait ReplyCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
}

/// Fingerprint for a cacheable (user, message) pair.
///
/// Normalizes case and collapses runs of whitespace so trivially different
/// inputs hit the same entry. Textual, not semantic.
pub fn fingerprint(user_id: Uuid, message: &str) -> String {
    let normalized = normalize(message);
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn normalize(message: &str) -> String {
    message
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

struct Entry {
    value: String,
    deadline: Instant,
}

/// In-process reply cache with per-entry TTL.
pub struct InMemoryReplyCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryReplyCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryReplyCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplyCache for InMemoryReplyCache {
    async fn get(&self, key: &str) -> Option<String> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.deadline > Instant::now() => {
                    return Some(entry.value.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Entry expired: drop it so the map does not grow unbounded.
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            if entry.deadline <= Instant::now() {
                entries.remove(key);
                debug!(key, "evicted expired cache entry");
            }
        }
        None
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.deadline > Instant::now());
        entries.insert(
            key.to_string(),
            Entry {
                value,
                deadline: Instant::now() + ttl,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_stable_under_whitespace_and_case() {
        let user = Uuid::new_v4();
        assert_eq!(fingerprint(user, "Log   Eggs"), fingerprint(user, "log eggs"));
        assert_eq!(
            fingerprint(user, "  what should\tI eat? "),
            fingerprint(user, "what should i eat?")
        );
    }

    #[test]
    fn fingerprint_differs_per_user_and_message() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(fingerprint(a, "log eggs"), fingerprint(b, "log eggs"));
        assert_ne!(fingerprint(a, "log eggs"), fingerprint(a, "log toast"));
    }

    #[tokio::test]
    async fn get_returns_stored_value_within_ttl() {
        let cache = InMemoryReplyCache::new();
        cache
            .set("k", "reply".into(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("k").await.as_deref(), Some("reply"));
    }

    #[tokio::test]
    async fn expired_entry_reads_as_absent() {
        let cache = InMemoryReplyCache::new();
        cache.set("k", "reply".into(), Duration::ZERO).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.get("k").await, None);
    }
}
