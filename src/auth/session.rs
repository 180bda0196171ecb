use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rand::{distributions::Alphanumeric, Rng};
use serde_json::json;
use time::Duration;
use tracing::warn;

use super::repo::{Session, User};
use crate::{config::SessionConfig, state::AppState};

pub const SESSION_COOKIE: &str = "session_token";

const TOKEN_LEN: usize = 43;

/// Opaque bearer token stored server side; carries no user data itself.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

pub fn session_ttl(config: &SessionConfig, remember_me: bool) -> Duration {
    if remember_me {
        Duration::days(config.remember_ttl_days)
    } else {
        Duration::hours(config.default_ttl_hours)
    }
}

/// A session cookie only persists across browser restarts when the caller
/// asked to be remembered; otherwise it stays a session-scoped cookie.
pub fn build_cookie(token: &str, remember_me: bool, config: &SessionConfig) -> String {
    let base = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if remember_me {
        let max_age = session_ttl(config, true).whole_seconds();
        format!("{base}; Max-Age={max_age}")
    } else {
        base
    }
}

pub fn clear_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Pull the session token out of a Cookie header value.
pub fn token_from_cookie_header(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then_some(value)
    })
}

/// Resolves the session cookie to an authenticated user, rejecting the
/// request when the cookie is missing, unknown, or expired.
pub struct SessionUser {
    pub user: User,
    pub token: String,
}

/// A rejection carrying a dead token also tells the browser to drop it.
fn reject(status: StatusCode, message: &str, clear: bool) -> Response {
    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if clear {
        if let Ok(value) = HeaderValue::try_from(clear_cookie()) {
            res.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    res
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(token_from_cookie_header)
            .ok_or_else(|| {
                reject(StatusCode::UNAUTHORIZED, "missing session cookie", false)
            })?;

        let user = Session::find_valid_user(&state.db, token)
            .await
            .map_err(|e| {
                warn!(error = %e, "session lookup failed");
                reject(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "session lookup failed",
                    false,
                )
            })?
            .ok_or_else(|| {
                reject(StatusCode::UNAUTHORIZED, "session invalid or expired", true)
            })?;

        Ok(SessionUser {
            user,
            token: token.to_string(),
        })
    }
}
