use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::AuthUser,
    cache::fingerprint,
    conversation::{Conversation, ExchangeMeta},
    memory::ExchangeRecord,
    state::AppState,
};

use super::context::{assemble, ContextError};
use super::dto::{
    ClearResponse, ConversationBody, ConversationResponse, RecommendRequest, RecommendResponse,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recommend/ai", post(recommend_ai))
        .route("/recommend/conversation", get(get_conversation))
        .route("/recommend/conversation", delete(clear_conversation))
}

/// POST /recommend/ai: answer a user message with full assembled context,
/// short-circuiting on a cached reply.
#[instrument(skip(state, payload))]
pub async fn recommend_ai(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, (StatusCode, String)> {
    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".into()));
    }

    let key = fingerprint(user_id, &message);
    if let Some(reply) = state.reply_cache.get(&key).await {
        // The thread must exist so the client can attach the reply to it,
        // but cache hits are not persisted as new conversation turns.
        let conversation = Conversation::get_or_create(&state.db, user_id)
            .await
            .map_err(internal)?;
        info!(%user_id, "served recommendation from cache");
        return Ok(Json(RecommendResponse {
            reply,
            conversation_id: conversation.id,
            message_id: None,
            cached: true,
        }));
    }

    let context = assemble(&state, user_id, &message).await.map_err(|e| match e {
        ContextError::MissingData(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        ContextError::Other(e) => {
            error!(error = %e, %user_id, "context assembly failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to assemble context".into(),
            )
        }
    })?;

    let reply = state.llm.complete(&context.render()).await.map_err(|e| {
        error!(error = %e, %user_id, "recommendation generation failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Recommendation generation failed".into(),
        )
    })?;

    let conversation = Conversation::get_or_create(&state.db, user_id)
        .await
        .map_err(internal)?;
    let (user_message, ai_message) = Conversation::append_exchange(
        &state.db,
        conversation.id,
        &message,
        &reply,
        ExchangeMeta {
            model: Some(state.llm.model().to_string()),
            cached: false,
        },
    )
    .await
    .map_err(internal)?;

    state
        .reply_cache
        .set(&key, reply.clone(), Duration::from_secs(state.config.cache.reply_ttl_secs))
        .await;

    // Fire-and-forget: the reply must not wait on (or fail with) the
    // semantic memory write.
    let memory = state.memory.clone();
    let record = ExchangeRecord {
        user_id,
        conversation_id: conversation.id,
        user_message_id: user_message.id,
        ai_message_id: ai_message.id,
        user_text: message,
        ai_text: reply.clone(),
    };
    tokio::spawn(async move {
        if let Err(e) = memory.write(record).await {
            warn!(error = %e, "semantic memory write failed");
        }
    });

    info!(%user_id, conversation_id = %conversation.id, "recommendation generated");
    Ok(Json(RecommendResponse {
        reply,
        conversation_id: conversation.id,
        message_id: Some(ai_message.id),
        cached: false,
    }))
}

/// GET /recommend/conversation: the user's full thread.
#[instrument(skip(state))]
pub async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ConversationResponse>, (StatusCode, String)> {
    let conversation = Conversation::get_or_create(&state.db, user_id)
        .await
        .map_err(internal)?;
    let messages = Conversation::list_messages(&state.db, user_id)
        .await
        .map_err(internal)?;

    Ok(Json(ConversationResponse {
        conversation: ConversationBody {
            id: conversation.id,
            title: conversation.title,
            messages,
        },
    }))
}

/// DELETE /recommend/conversation: wipe messages, keep the thread.
#[instrument(skip(state))]
pub async fn clear_conversation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ClearResponse>, (StatusCode, String)> {
    Conversation::clear(&state.db, user_id)
        .await
        .map_err(internal)?;
    info!(%user_id, "conversation cleared");
    Ok(Json(ClearResponse { cleared: true }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "database error");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
}
