//! HTTP surface: page routes plus the JSON API under /api

pub mod auth;
pub mod images;

use axum::{
    Json, Router,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::CookieJar;
use serde_json::json;
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::middleware;
use crate::session::{SESSION_COOKIE, SessionData};
use crate::state::AppState;

/// Create the router for the portfolio service
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(index_page))
        .route("/home", get(index_page))
        .route("/gallery", get(gallery_page))
        .route("/login", get(legacy_login))
        .route("/admin-login-portal", get(login_portal_page))
        .route("/admin", get(admin_page))
        .route("/logout", get(logout_page))
        .nest("/api/auth", auth::router())
        .nest("/api/images", images::router(state.clone()))
        .layer(axum::middleware::from_fn(
            middleware::block_direct_page_access,
        ))
        .layer(axum::middleware::from_fn(middleware::security_headers))
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = common::database::health_check(&state.db_pool)
        .await
        .unwrap_or(false);

    Json(json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "service": "portfolio",
    }))
}

/// Session attached to the request cookie, if any
///
/// Page handlers treat a session-store outage as "not logged in" rather
/// than failing the page.
async fn current_session(state: &AppState, jar: &CookieJar) -> Option<SessionData> {
    let token = jar.get(SESSION_COOKIE)?.value().to_string();

    match state.sessions.authenticate(&token).await {
        Ok(session) => session,
        Err(e) => {
            error!("session check failed: {:#}", e);
            None
        }
    }
}

async fn serve_page(state: &AppState, name: &str) -> ApiResult<Html<String>> {
    let path = state.public_dir.join(name);

    match tokio::fs::read_to_string(&path).await {
        Ok(contents) => Ok(Html(contents)),
        Err(e) => {
            error!("failed to read page {}: {}", path.display(), e);
            Err(ApiError::Internal)
        }
    }
}

async fn index_page(State(state): State<AppState>) -> ApiResult<Html<String>> {
    serve_page(&state, "index.html").await
}

async fn gallery_page(State(state): State<AppState>) -> ApiResult<Html<String>> {
    serve_page(&state, "gallery.html").await
}

/// The login view moved behind /admin-login-portal; keep the old path working
async fn legacy_login() -> Redirect {
    Redirect::to("/admin-login-portal")
}

async fn login_portal_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if current_session(&state, &jar).await.is_some() {
        return Redirect::to("/admin").into_response();
    }

    serve_page(&state, "login.html").await.into_response()
}

/// Page-serving session gate: unauthenticated callers are redirected to the
/// login portal instead of receiving a 401
async fn admin_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    match current_session(&state, &jar).await {
        Some(_) => serve_page(&state, "admin.html").await.into_response(),
        None => Redirect::to("/admin-login-portal").into_response(),
    }
}

async fn logout_page(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = state.sessions.destroy(cookie.value()).await {
            error!("failed to destroy session on logout: {:#}", e);
        }
    }

    (
        axum::response::AppendHeaders([(
            axum::http::header::SET_COOKIE,
            auth::clear_session_cookie(),
        )]),
        Redirect::to("/"),
    )
        .into_response()
}
