//! Authentication routes

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/check", get(check))
}

/// Request for admin login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Admin login endpoint
///
/// Failed verification feeds the throttle; the error body never reveals
/// whether the username exists.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let throttle_key = payload.username.trim().to_ascii_lowercase();

    if !state.login_throttle.check(&throttle_key) {
        return Err(ApiError::Throttled);
    }

    let admin = state
        .admin_repository
        .verify(&payload.username, &payload.password)
        .await
        .inspect_err(|err| {
            if matches!(err, ApiError::Unauthorized) {
                state.login_throttle.record_failure(&throttle_key);
            }
        })?;

    state.login_throttle.clear(&throttle_key);

    let token = state
        .sessions
        .create(admin.id)
        .await
        .map_err(ApiError::internal)?;

    info!("admin '{}' logged in", admin.username);

    Ok((
        AppendHeaders([(
            header::SET_COOKIE,
            session_cookie(&token, state.sessions.ttl_seconds()),
        )]),
        Json(json!({
            "success": true,
            "message": "Login successful",
            "redirectUrl": "/admin",
        })),
    ))
}

/// Logout endpoint; destroying an absent session still succeeds
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<impl IntoResponse> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state
            .sessions
            .destroy(cookie.value())
            .await
            .map_err(ApiError::internal)?;
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie())]),
        Json(json!({
            "success": true,
            "message": "Logout successful",
        })),
    ))
}

/// Report whether the request carries a live session
pub async fn check(State(state): State<AppState>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let is_authenticated = match jar.get(SESSION_COOKIE) {
        Some(cookie) => state
            .sessions
            .authenticate(cookie.value())
            .await
            .map_err(ApiError::internal)?
            .is_some(),
        None => false,
    };

    Ok(Json(json!({ "isAuthenticated": is_authenticated })))
}

fn session_cookie(token: &str, max_age_seconds: u64) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={max_age_seconds}"
    )
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}
