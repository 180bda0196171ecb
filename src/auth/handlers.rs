use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{
        CleanupResponse, LoginRequest, PublicUser, RegisterRequest, RegisterSpreadsheetRequest,
        SpreadsheetResponse,
    },
    password::{hash_password, verify_password},
    repo::{Session, User, UserSpreadsheet},
    session::{build_cookie, clear_cookie, generate_token, session_ttl, SessionUser},
};
use crate::{error::AppError, state::AppState, utils::extract_spreadsheet_id};

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if User::exists(&state.db, &payload.username, &payload.email).await? {
        return Err(AppError::Conflict(
            "username or email already taken".into(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, &payload.username, &payload.email, &password_hash).await?;
    info!(user_id = %user.id, "user registered");

    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Same message for unknown user and wrong password.
    let invalid = || AppError::auth("invalid credentials");

    let user = User::find_by_username_or_email(&state.db, payload.username_or_email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "failed login attempt");
        return Err(invalid());
    }

    User::touch_last_login(&state.db, user.id).await?;

    let token = generate_token();
    let ttl = session_ttl(&state.config.session, payload.remember_me);
    Session::create(&state.db, user.id, &token, ttl).await?;
    info!(user_id = %user.id, remember_me = payload.remember_me, "login");

    let cookie = build_cookie(&token, payload.remember_me, &state.config.session);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(PublicUser::from(user)),
    ))
}

#[instrument(skip(state, session))]
pub async fn logout(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<impl IntoResponse, AppError> {
    Session::delete(&state.db, &session.token).await?;
    state.clear_pending(&session.token).await;
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_cookie())],
    ))
}

#[instrument(skip(session))]
pub async fn me(session: SessionUser) -> Json<PublicUser> {
    Json(PublicUser::from(session.user))
}

/// Maintenance hook for a scheduler; expired sessions are never purged
/// inline with request handling.
#[instrument(skip(state))]
pub async fn cleanup_sessions(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, AppError> {
    let removed = Session::cleanup_expired(&state.db).await?;
    info!(removed, "expired sessions purged");
    Ok(Json(CleanupResponse { removed }))
}

#[instrument(skip(state, session))]
pub async fn list_spreadsheets(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<Vec<SpreadsheetResponse>>, AppError> {
    let rows = UserSpreadsheet::list(&state.db, session.user.id).await?;
    Ok(Json(rows.into_iter().map(SpreadsheetResponse::from).collect()))
}

#[instrument(skip(state, session, payload))]
pub async fn register_spreadsheet(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<RegisterSpreadsheetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = payload.spreadsheet.trim();
    let spreadsheet_id = if input.contains('/') {
        extract_spreadsheet_id(input)
            .ok_or_else(|| AppError::validation("not a valid Google Sheets URL"))?
    } else if !input.is_empty() {
        input.to_string()
    } else {
        return Err(AppError::validation("spreadsheet is required"));
    };

    let row = UserSpreadsheet::upsert(
        &state.db,
        session.user.id,
        &spreadsheet_id,
        payload.name.as_deref(),
    )
    .await?;
    info!(user_id = %session.user.id, spreadsheet_id = %row.spreadsheet_id, "spreadsheet registered");

    Ok((StatusCode::CREATED, Json(SpreadsheetResponse::from(row))))
}

#[instrument(skip(state, session))]
pub async fn delete_spreadsheet(
    State(state): State<AppState>,
    session: SessionUser,
    Path(spreadsheet_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let deleted = UserSpreadsheet::delete(&state.db, session.user.id, &spreadsheet_id).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
