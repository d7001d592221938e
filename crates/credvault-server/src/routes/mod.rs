//! HTTP route handlers for `CredVault`.
//!
//! Routes are organized by area:
//! - `auth`: register, login, logout, current user and profile
//! - `credentials`: credential CRUD
//! - `notes`: secure note CRUD
//! - `api`: stats, search, favorites, activity, export and type catalogues
//! - `ui`: landing page, health check and robots.txt

pub mod api;
pub mod auth;
pub mod credentials;
pub mod notes;
pub mod ui;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware as axum_mw;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use credvault_core::search::SearchParams;

use crate::error::AppError;
use crate::middleware::{CSRF_HEADER, auth_middleware};
use crate::state::AppState;

/// Query string accepted by the credential and note listings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub query: Option<String>,
    pub type_filter: Option<String>,
    /// Checkbox-style flag: `true`, `1` or `on`.
    pub favorites_only: Option<String>,
    pub page: Option<String>,
}

impl ListQuery {
    #[must_use]
    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            query: self.query.clone(),
            type_filter: self.type_filter.clone(),
            favorites_only: truthy(self.favorites_only.as_deref()),
        }
    }
}

/// Plain `{success, message}` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub success: bool,
    pub message: String,
}

impl MessageBody {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

pub(crate) fn truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "on" | "yes")
    )
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let authenticated_routes = Router::new()
        .nest("/auth", auth::router())
        .nest(
            "/api",
            api::router()
                .merge(credentials::router())
                .merge(notes::router()),
        )
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    // Concurrency-limit register/login: each request runs an Argon2 hash.
    let public_routes = Router::new()
        .nest("/auth", auth::public_router())
        .layer(tower::limit::ConcurrencyLimitLayer::new(10));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(CSRF_HEADER),
        ]);

    Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(ui::router())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found.".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkbox_values() {
        assert!(truthy(Some("on")));
        assert!(truthy(Some("TRUE")));
        assert!(truthy(Some("1")));
        assert!(!truthy(Some("false")));
        assert!(!truthy(Some("")));
        assert!(!truthy(None));
    }

    #[test]
    fn list_query_maps_to_search_params() {
        let q = ListQuery {
            query: Some("git".to_owned()),
            type_filter: Some("website".to_owned()),
            favorites_only: Some("on".to_owned()),
            page: Some("2".to_owned()),
        };
        let params = q.search_params();
        assert_eq!(params.query.as_deref(), Some("git"));
        assert_eq!(params.type_filter.as_deref(), Some("website"));
        assert!(params.favorites_only);
    }
}
