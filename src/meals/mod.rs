mod dto;
pub mod extract;
pub mod handlers;
pub mod partial;
pub mod repo;
pub mod resolve;
pub mod types;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::ai_routes()
}
