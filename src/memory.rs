use std::sync::Arc;

use axum::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::embeddings::EmbeddingClient;
use crate::vector::{ExchangePoint, ScoredExchange, VectorStore};

/// Matches below this similarity are noise, not memory.
const MIN_SIMILARITY: f32 = 0.38;

/// One user/AI exchange to remember.
#[derive(Debug, Clone)]
pub struct ExchangeRecord {
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub user_message_id: Uuid,
    pub ai_message_id: Uuid,
    pub user_text: String,
    pub ai_text: String,
}

impl ExchangeRecord {
    /// Both lines combined into the single document that gets embedded.
    pub fn document(&self) -> String {
        format!("User: {}\nAssistant: {}", self.user_text, self.ai_text)
    }
}

/// Long-term memory over past exchanges.
///
/// Writes are best-effort: the caller detaches them after the response is
/// sent and failures are logged, never surfaced. Reads degrade to empty.
#[async_trait]
pub trait ExchangeMemory: Send + Sync {
    async fn write(&self, record: ExchangeRecord) -> anyhow::Result<()>;
    async fn recall(&self, user_id: Uuid, text: &str, top_k: usize) -> Vec<String>;
}

/// Qdrant-backed semantic memory.
pub struct SemanticMemory {
    embeddings: Arc<EmbeddingClient>,
    vectors: Arc<VectorStore>,
}

impl SemanticMemory {
    pub fn new(embeddings: Arc<EmbeddingClient>, vectors: Arc<VectorStore>) -> Self {
        Self {
            embeddings,
            vectors,
        }
    }
}

#[async_trait]
impl ExchangeMemory for SemanticMemory {
    async fn write(&self, record: ExchangeRecord) -> anyhow::Result<()> {
        let document = record.document();
        let vector = self.embeddings.embed(&document).await?;
        self.vectors
            .upsert_exchange(
                ExchangePoint {
                    user_id: record.user_id,
                    conversation_id: record.conversation_id,
                    user_message_id: record.user_message_id,
                    ai_message_id: record.ai_message_id,
                    text: document,
                },
                vector,
            )
            .await?;
        debug!(user_id = %record.user_id, "exchange written to semantic memory");
        Ok(())
    }

    async fn recall(&self, user_id: Uuid, text: &str, top_k: usize) -> Vec<String> {
        let vector = match self.embeddings.embed(text).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "embedding query failed, no long-term context");
                return Vec::new();
            }
        };

        // Over-fetch so deduplication can still fill top_k.
        match self
            .vectors
            .search_exchanges(user_id, vector, top_k * 2)
            .await
        {
            Ok(results) => dedupe_snippets(results, top_k),
            Err(e) => {
                warn!(error = %e, "semantic memory search failed, no long-term context");
                Vec::new()
            }
        }
    }
}

/// Keep results above the similarity floor, deduplicated case-insensitively
/// by normalized text, at most `top_k`.
fn dedupe_snippets(results: Vec<ScoredExchange>, top_k: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut snippets = Vec::new();
    for result in results {
        if result.score < MIN_SIMILARITY {
            continue;
        }
        let key = result.text.trim().to_lowercase();
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        snippets.push(result.text);
        if snippets.len() == top_k {
            break;
        }
    }
    snippets
}

/// No-op memory for tests and for running without a vector backend.
pub struct NoopMemory;

#[async_trait]
impl ExchangeMemory for NoopMemory {
    async fn write(&self, _record: ExchangeRecord) -> anyhow::Result<()> {
        Ok(())
    }

    async fn recall(&self, _user_id: Uuid, _text: &str, _top_k: usize) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(text: &str, score: f32) -> ScoredExchange {
        ScoredExchange {
            text: text.to_string(),
            score,
        }
    }

    #[test]
    fn filters_results_below_similarity_floor() {
        let results = vec![
            scored("User: eggs\nAssistant: sure", 0.9),
            scored("User: pasta\nAssistant: ok", 0.2),
        ];
        let snippets = dedupe_snippets(results, 5);
        assert_eq!(snippets.len(), 1);
        assert!(snippets[0].contains("eggs"));
    }

    #[test]
    fn deduplicates_on_trimmed_lowercase_text() {
        let results = vec![
            scored("User: Eggs\nAssistant: Sure", 0.9),
            scored("user: eggs\nassistant: sure   ", 0.8),
            scored("User: toast\nAssistant: fine", 0.7),
        ];
        let snippets = dedupe_snippets(results, 5);
        assert_eq!(snippets.len(), 2);
    }

    #[test]
    fn respects_top_k_after_dedup() {
        let results = (0..10)
            .map(|i| scored(&format!("exchange {}", i), 0.9))
            .collect();
        let snippets = dedupe_snippets(results, 3);
        assert_eq!(snippets.len(), 3);
    }

    #[test]
    fn exchange_document_combines_both_lines() {
        let record = ExchangeRecord {
            user_id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            user_message_id: Uuid::new_v4(),
            ai_message_id: Uuid::new_v4(),
            user_text: "what should I eat?".into(),
            ai_text: "something with protein".into(),
        };
        assert_eq!(
            record.document(),
            "User: what should I eat?\nAssistant: something with protein"
        );
    }
}
