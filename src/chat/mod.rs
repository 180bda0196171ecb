pub mod dto;
pub mod handlers;
pub mod service;

use axum::{routing::post, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat/message", post(handlers::message))
        .route("/chat/confirm", post(handlers::confirm))
        .route("/chat/cancel", post(handlers::cancel))
}
