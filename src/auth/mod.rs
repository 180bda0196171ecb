pub mod dto;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod session;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub use repo::{Session, User, UserSpreadsheet};
pub use session::SessionUser;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/me", get(handlers::me))
        .route("/auth/cleanup", post(handlers::cleanup_sessions))
        .route(
            "/spreadsheets",
            get(handlers::list_spreadsheets).post(handlers::register_spreadsheet),
        )
        .route(
            "/spreadsheets/:spreadsheet_id",
            delete(handlers::delete_spreadsheet),
        )
}
