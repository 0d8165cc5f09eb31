use qdrant_client::qdrant::{
    condition::ConditionOneOf, r#match::MatchValue, Condition, CreateCollectionBuilder, Distance,
    FieldCondition, Filter, Match, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::QdrantConfig;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Vector store error: {0}")]
    VectorStore(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Payload key names on exchange points.
const KEY_USER_ID: &str = "user_id";
const KEY_CONVERSATION_ID: &str = "conversation_id";
const KEY_USER_MESSAGE_ID: &str = "user_message_id";
const KEY_AI_MESSAGE_ID: &str = "ai_message_id";
const KEY_TEXT: &str = "text";

/// One embedded user/AI exchange with traceability tags.
#[derive(Debug, Clone)]
pub struct ExchangePoint {
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    pub user_message_id: Uuid,
    pub ai_message_id: Uuid,
    pub text: String,
}

/// A scored exchange returned from similarity search.
#[derive(Debug, Clone)]
pub struct ScoredExchange {
    pub text: String,
    pub score: f32,
}

/// Vector storage for past exchanges, backed by Qdrant.
///
/// One collection holds every user's exchange documents; reads are always
/// filtered by `user_id` so users never see each other's history.
#[derive(Clone)]
pub struct VectorStore {
    client: std::sync::Arc<Qdrant>,
    collection: String,
}

impl VectorStore {
    pub async fn connect(config: &QdrantConfig, dimension: usize) -> Result<Self> {
        let client = Qdrant::from_url(&config.url)
            .build()
            .map_err(|e| Error::VectorStore(format!("Failed to connect to Qdrant: {}", e)))?;

        let store = Self {
            client: std::sync::Arc::new(client),
            collection: config.collection.clone(),
        };
        store.ensure_collection(dimension).await?;

        info!(url = %config.url, collection = %store.collection, "vector store connected");
        Ok(store)
    }

    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to check collection: {}", e)))?;

        if exists {
            debug!(collection = %self.collection, "collection already exists");
            return Ok(());
        }

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to create collection: {}", e)))?;

        info!(collection = %self.collection, dimension, "created Qdrant collection");
        Ok(())
    }

    /// Upsert one exchange document with its embedding.
    pub async fn upsert_exchange(&self, point: ExchangePoint, vector: Vec<f32>) -> Result<()> {
        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert(
            KEY_USER_ID.to_string(),
            QdrantValue::from(point.user_id.to_string()),
        );
        payload.insert(
            KEY_CONVERSATION_ID.to_string(),
            QdrantValue::from(point.conversation_id.to_string()),
        );
        payload.insert(
            KEY_USER_MESSAGE_ID.to_string(),
            QdrantValue::from(point.user_message_id.to_string()),
        );
        payload.insert(
            KEY_AI_MESSAGE_ID.to_string(),
            QdrantValue::from(point.ai_message_id.to_string()),
        );
        payload.insert(KEY_TEXT.to_string(), QdrantValue::from(point.text));

        let qdrant_point = PointStruct::new(Uuid::new_v4().to_string(), vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![qdrant_point]))
            .await
            .map_err(|e| Error::VectorStore(format!("Failed to upsert point: {}", e)))?;

        debug!(collection = %self.collection, "upserted exchange point");
        Ok(())
    }

    /// Search a user's exchanges by embedding similarity, best matches first.
    pub async fn search_exchanges(
        &self,
        user_id: Uuid,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredExchange>> {
        let filter = Filter {
            must: vec![Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: KEY_USER_ID.to_string(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(user_id.to_string())),
                    }),
                    ..Default::default()
                })),
            }],
            ..Default::default()
        };

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, limit as u64)
                    .filter(filter)
                    .with_payload(true),
            )
            .await
            .map_err(|e| Error::VectorStore(format!("Search failed: {}", e)))?;

        let results = response
            .result
            .into_iter()
            .filter_map(|point| {
                let text = point.payload.get(KEY_TEXT).and_then(|v| match v.kind.as_ref() {
                    Some(qdrant_client::qdrant::value::Kind::StringValue(s)) => Some(s.clone()),
                    _ => None,
                })?;
                Some(ScoredExchange {
                    text,
                    score: point.score,
                })
            })
            .collect();

        Ok(results)
    }
}
