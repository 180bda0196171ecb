pub mod dto;
pub mod handlers;

use axum::{
    routing::{get, put},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(handlers::list).post(handlers::create))
        .route("/transactions/summary", get(handlers::summary))
        .route("/transactions/report", get(handlers::report))
        .route("/transactions/search", get(handlers::search))
        .route(
            "/transactions/:row_index",
            put(handlers::update).delete(handlers::delete),
        )
}
