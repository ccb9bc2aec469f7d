pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::quiz::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Quiz API
        .route(
            "/api/v1/quiz/questions",
            get(handlers::handle_get_questions),
        )
        .route("/api/v1/quiz/start", post(handlers::handle_start))
        .route("/api/v1/quiz/submit", post(handlers::handle_submit))
        .route(
            "/api/v1/quiz/dream-career",
            post(handlers::handle_dream_career),
        )
        .route("/api/v1/quiz/results", get(handlers::handle_get_results))
        .with_state(state)
}
