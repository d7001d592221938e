//! Account routes: `/auth/*`
//!
//! Register and login open a session, returned both as the
//! `credvault_session` cookie and in the body for API clients. Logout
//! revokes it.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use credvault_core::activity::ClientInfo;
use credvault_core::models::{ActivityAction, ActivityEntry, User, UserInfo};
use credvault_core::validate::RegisterInput;

use super::MessageBody;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::{Client, CurrentUser, clear_session_cookie, session_cookie};
use crate::state::AppState;

/// Routes that need no session: register and login.
pub fn public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Routes that need a session.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/profile", get(profile))
}

// ── Request / response types ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserInfo,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserInfo,
    pub recent_activities: Vec<ActivityEntry>,
}

// ── Handlers ─────────────────────────────────────────────────────────

/// Create an account and log it in.
async fn register(
    State(state): State<Arc<AppState>>,
    Client(client): Client,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<Response, AppError> {
    let user = state.users.register(input).await?;
    let message = format!(
        "Welcome to Credentials Manager, {}! Your account has been created successfully.",
        user.first_name
    );
    let description = format!(
        "New user registered and logged in from {}",
        client.ip_or_unknown()
    );
    open_session(&state, &user, &client, description, message, StatusCode::CREATED).await
}

/// Check a username and password and open a session.
async fn login(
    State(state): State<Arc<AppState>>,
    Client(client): Client,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    let user = state.users.authenticate(&req.username, &req.password).await?;
    let message = format!("Welcome back, {}!", user.first_name);
    let description = format!("User logged in from {}", client.ip_or_unknown());
    open_session(&state, &user, &client, description, message, StatusCode::OK).await
}

async fn open_session(
    state: &AppState,
    user: &User,
    client: &ClientInfo,
    description: String,
    message: String,
    status: StatusCode,
) -> Result<Response, AppError> {
    let opened = state.sessions.create(user.id, state.session_ttl).await?;
    state
        .activity
        .log(user.id, ActivityAction::Login, description, client)
        .await?;

    let cookie = session_cookie(
        &opened.token,
        state.session_ttl.num_seconds(),
        state.secure_cookies,
    )?;
    let body = SessionResponse {
        token: opened.token,
        csrf_token: opened.csrf_token,
        expires_at: opened.expires_at,
        user: UserInfo::from(user),
        message,
    };
    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Revoke the current session and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
) -> Result<Response, AppError> {
    state
        .activity
        .log(
            current.user.id,
            ActivityAction::Logout,
            format!("User logged out from {}", client.ip_or_unknown()),
            &client,
        )
        .await?;
    state.sessions.revoke(&current.token).await?;

    let body = MessageBody::ok("You have been logged out successfully.");
    Ok(([(header::SET_COOKIE, clear_session_cookie())], Json(body)).into_response())
}

/// The current user and the CSRF token the browser must echo.
async fn me(Extension(current): Extension<CurrentUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user: UserInfo::from(&current.user),
        csrf_token: current.session.csrf_token,
        expires_at: current.session.expires_at,
    })
}

/// The current user and their ten latest activities.
async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ProfileResponse>, AppError> {
    let recent_activities = state.activity.recent(current.user.id, 10).await?;
    Ok(Json(ProfileResponse {
        user: UserInfo::from(&current.user),
        recent_activities,
    }))
}
