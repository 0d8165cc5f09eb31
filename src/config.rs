use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Settings for the chat-completion backend (OpenAI-compatible wire format).
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

/// Settings for the embedding backend.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub reply_ttl_secs: u64,
    pub partial_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub qdrant: QdrantConfig,
    pub cache: CacheConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutricoach".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nutricoach-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let llm = LlmConfig {
            base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            api_key: std::env::var("LLM_API_KEY")?,
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            max_tokens: std::env::var("LLM_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(1024),
            timeout_secs: std::env::var("LLM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        };
        let embedding = EmbeddingConfig {
            base_url: std::env::var("EMBEDDING_BASE_URL").unwrap_or_else(|_| llm.base_url.clone()),
            api_key: std::env::var("EMBEDDING_API_KEY").unwrap_or_else(|_| llm.api_key.clone()),
            model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-3-small".into()),
            dimension: std::env::var("EMBEDDING_DIMENSION")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(1536),
            timeout_secs: std::env::var("EMBEDDING_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(10),
        };
        let qdrant = QdrantConfig {
            url: std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".into()),
            collection: std::env::var("QDRANT_COLLECTION")
                .unwrap_or_else(|_| "nutricoach_exchanges".into()),
        };
        let cache = CacheConfig {
            reply_ttl_secs: std::env::var("REPLY_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(600),
            partial_ttl_secs: std::env::var("PARTIAL_MEAL_TTL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(900),
        };
        Ok(Self {
            database_url,
            jwt,
            llm,
            embedding,
            qdrant,
            cache,
        })
    }
}
