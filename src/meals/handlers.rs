use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::{auth::AuthUser, state::AppState};

use super::dto::{LogMealRequest, LogMealResponse};
use super::extract::extract_meal;
use super::partial::merge;
use super::resolve::{clarification_question, validate};

pub fn ai_routes() -> Router<AppState> {
    Router::new().route("/meals/ai", post(log_meal_ai))
}

/// POST /meals/ai: parse free text into a structured meal, looping through
/// clarification until the extraction is plausible.
#[instrument(skip(state, payload))]
pub async fn log_meal_ai(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<LogMealRequest>,
) -> Result<(StatusCode, Json<LogMealResponse>), (StatusCode, String)> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".into()));
    }

    let mut meal = extract_meal(&state.llm, message).await.map_err(|e| {
        error!(error = %e, %user_id, "meal extraction failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Meal extraction failed".into(),
        )
    })?;

    if let Some(attempt_id) = payload.attempt_id {
        if let Some(prior) = state.partials.take(attempt_id).await {
            meal = merge(prior, meal);
        }
    }

    let issues = validate(&meal);
    if issues.is_empty() {
        info!(%user_id, name = meal.display_name(), "meal extraction complete");
        return Ok((
            StatusCode::CREATED,
            Json(LogMealResponse::Complete { meal }),
        ));
    }

    let question = clarification_question(&meal, &issues);
    let attempt_id = state.partials.store(meal.clone()).await;
    info!(%user_id, ?issues, "meal extraction needs clarification");

    Ok((
        StatusCode::OK,
        Json(LogMealResponse::NeedsClarification {
            question,
            partial: meal,
            issues,
            attempt_id,
        }),
    ))
}
