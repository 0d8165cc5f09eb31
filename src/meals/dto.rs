use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::resolve::ValidationIssue;
use super::types::ParsedMeal;

#[derive(Debug, Deserialize)]
pub struct LogMealRequest {
    pub message: String,
    /// Attempt to continue after a clarification round.
    #[serde(default)]
    pub attempt_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LogMealResponse {
    /// 201: structured meal ready to persist.
    Complete { meal: ParsedMeal },
    /// 200: one follow-up question; resubmit with `attempt_id` to continue.
    NeedsClarification {
        question: String,
        partial: ParsedMeal,
        issues: Vec<ValidationIssue>,
        attempt_id: Uuid,
    },
}
