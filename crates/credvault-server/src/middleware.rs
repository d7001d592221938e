//! Session authentication and CSRF middleware.
//!
//! A request authenticates with either `Authorization: Bearer <token>` or the
//! `credvault_session` cookie. The resolved user and session are injected
//! into the request extensions as a [`CurrentUser`].
//!
//! Cookie-authenticated requests with an unsafe method must echo the
//! session's CSRF token in `X-CSRFToken`. Bearer requests carry no ambient
//! credential and are exempt.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use credvault_core::activity::ClientInfo;
use credvault_core::models::User;
use credvault_core::sessions::Session;

use crate::error::AppError;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "credvault_session";

/// Header carrying the CSRF token.
pub const CSRF_HEADER: &str = "x-csrftoken";

/// The authenticated caller, injected by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
    /// Plaintext token the request presented.
    pub token: String,
    /// Whether the token came from the cookie rather than a Bearer header.
    pub via_cookie: bool,
}

/// Middleware that resolves the session and enforces CSRF.
///
/// # Errors
///
/// - [`AppError::Unauthorized`] when no valid session is presented.
/// - [`AppError::Forbidden`] when a cookie-authenticated unsafe request lacks
///   a matching CSRF token.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (token, via_cookie) = if let Some(token) = bearer_token(req.headers()) {
        (token, false)
    } else if let Some(token) = cookie_value(req.headers(), SESSION_COOKIE) {
        (token, true)
    } else {
        return Err(AppError::Unauthorized(
            "Authentication credentials were not provided.".to_owned(),
        ));
    };

    let session = state.sessions.lookup(&token).await?;
    let user = state.users.get(session.user_id).await?;

    if via_cookie && !is_safe(req.method()) {
        let presented = req
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !session.csrf_matches(presented) {
            debug!(session = session.log_id(), "csrf check failed");
            return Err(AppError::Forbidden(
                "CSRF token missing or incorrect.".to_owned(),
            ));
        }
    }

    req.extensions_mut().insert(CurrentUser {
        user,
        session,
        token,
        via_cookie,
    });
    Ok(next.run(req).await)
}

fn is_safe(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Value of cookie `name` across all `Cookie` headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_owned())
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value opening a session.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the token is not a valid header value.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> Result<HeaderValue, AppError> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}{secure}"
    ))
    .map_err(|e| AppError::Internal(format!("invalid session cookie: {e}")))
}

/// `Set-Cookie` value removing the session cookie.
#[must_use]
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("credvault_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Client IP and user agent for activity entries.
///
/// The IP is the first `X-Forwarded-For` entry when present, otherwise the
/// socket peer address.
#[derive(Debug, Clone)]
pub struct Client(pub ClientInfo);

impl<S: Send + Sync> FromRequestParts<S> for Client {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_owned);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        Ok(Self(ClientInfo {
            ip: forwarded.or(peer),
            user_agent,
        }))
    }
}
