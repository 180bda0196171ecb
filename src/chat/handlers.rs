use axum::{extract::State, Json};
use tracing::instrument;

use super::dto::{ChatMessageRequest, ChatResponse};
use super::service;
use crate::auth::{SessionUser, UserSpreadsheet};
use crate::error::AppError;
use crate::state::AppState;

/// Chat only works against the user's most recently registered spreadsheet.
async fn active_spreadsheet(state: &AppState, session: &SessionUser) -> Result<String, AppError> {
    UserSpreadsheet::latest(&state.db, session.user.id)
        .await?
        .map(|s| s.spreadsheet_id)
        .ok_or_else(|| AppError::validation("register a spreadsheet before chatting"))
}

#[instrument(skip(state, session, payload))]
pub async fn message(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<ChatMessageRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err(AppError::validation("message text is required"));
    }
    let spreadsheet_id = active_spreadsheet(&state, &session).await?;
    let resp = service::handle_message(&state, &session.token, &spreadsheet_id, text).await;
    Ok(Json(resp))
}

#[instrument(skip(state, session))]
pub async fn confirm(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<ChatResponse>, AppError> {
    let spreadsheet_id = active_spreadsheet(&state, &session).await?;
    let resp = service::confirm(&state, &session.token, &spreadsheet_id).await?;
    Ok(Json(resp))
}

#[instrument(skip(state, session))]
pub async fn cancel(
    State(state): State<AppState>,
    session: SessionUser,
) -> Json<ChatResponse> {
    Json(service::cancel(&state, &session.token).await)
}
