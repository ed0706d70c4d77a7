//! Request-inspection middleware
//!
//! Three layers run in front of the route handlers: the access-control
//! filter that blocks direct requests for the admin and login page files,
//! a security-header layer, and the API session gate for protected routes.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::session::SESSION_COOKIE;
use crate::state::AppState;

/// Identity attached to a request that passed the session gate
#[derive(Debug, Clone, Copy)]
pub struct AuthAdmin {
    pub admin_id: Uuid,
}

/// Decide whether a path is a direct request for a gated page file
///
/// Returns the rejection code, or `None` when the path is allowed. The
/// admin and login views must be reached through their routes, never by
/// naming the underlying file.
pub fn blocked_page_code(path: &str) -> Option<&'static str> {
    let path = path.to_ascii_lowercase();

    if path.contains("admin.html") {
        return Some("ADMIN_ACCESS_BLOCKED");
    }

    if path.contains("login.html") {
        return Some("LOGIN_ACCESS_BLOCKED");
    }

    if path.contains(".html") && (path.contains("admin") || path.contains("login")) {
        return Some("FILE_ACCESS_BLOCKED");
    }

    None
}

/// Access-control filter, evaluated before any route handler
pub async fn block_direct_page_access(req: Request<Body>, next: Next) -> Response {
    if let Some(code) = blocked_page_code(req.uri().path()) {
        warn!("blocked direct page access to {}", req.uri().path());

        let body = Json(json!({
            "success": false,
            "message": "Direct access to this resource is not allowed",
            "code": code,
        }));

        return (StatusCode::FORBIDDEN, body).into_response();
    }

    next.run(req).await
}

/// Baseline security headers; admin responses are additionally uncacheable
pub async fn security_headers(req: Request<Body>, next: Next) -> Response {
    let is_admin_path = req.uri().path().starts_with("/admin");

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("1; mode=block"),
    );

    if is_admin_path {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        );
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    }

    response
}

/// API session gate
///
/// Protected API routes get a structured 401 instead of a redirect; the
/// underlying validity check is the same one the page gate uses.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let jar = CookieJar::from_headers(req.headers());

    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or(ApiError::Unauthorized)?;

    let session = state
        .sessions
        .authenticate(&token)
        .await
        .map_err(ApiError::internal)?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(AuthAdmin {
        admin_id: session.admin_id,
    });

    Ok(next.run(req).await)
}
