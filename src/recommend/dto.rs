use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::Message;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RecommendResponse {
    pub reply: String,
    pub conversation_id: Uuid,
    /// Id of the stored assistant message; absent on a cache hit, which
    /// appends nothing to the conversation.
    pub message_id: Option<Uuid>,
    pub cached: bool,
}

#[derive(Debug, Serialize)]
pub struct ConversationBody {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub conversation: ConversationBody,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}
