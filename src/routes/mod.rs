pub mod health;
pub mod telegram;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/webhook/telegram/:role", post(telegram::handle_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
