//! Cross-cutting API routes under `/api`.
//!
//! - `GET  /api/stats/`: dashboard statistics
//! - `GET  /api/search/`: paginated search (query string)
//! - `POST /api/search/`: search (JSON body)
//! - `POST /api/toggle-favorite/`: flip a credential or note favorite
//! - `GET  /api/favorites/`: favorite credentials and notes
//! - `GET  /api/activity/`: activity log, newest first
//! - `GET  /api/export/`: CSV download of credentials
//! - `GET  /api/types/`: credential and note type catalogues

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use credvault_core::dashboard::DashboardStats;
use credvault_core::export::{credentials_csv, export_filename};
use credvault_core::models::{
    ActivityAction, ActivityEntry, CredentialKind, CredentialSummary, NoteKind, NoteSummary,
};
use credvault_core::pagination::{PAGE_SIZE, Page};
use credvault_core::search::{SearchParams, SearchResults};

use super::truthy;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::middleware::{Client, CurrentUser};
use crate::state::AppState;

const DEFAULT_ACTIVITY_LIMIT: usize = 50;
const MAX_ACTIVITY_LIMIT: usize = 100;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats/", get(stats))
        .route("/search/", get(search_paged).post(search))
        .route("/toggle-favorite/", post(toggle_favorite))
        .route("/favorites/", get(favorites))
        .route("/activity/", get(activity))
        .route("/export/", get(export))
        .route("/types/", get(types))
}

// ── Request / response types ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub credentials: Vec<CredentialSummary>,
    pub notes: Vec<NoteSummary>,
    pub total_credentials: usize,
    pub total_notes: usize,
}

impl From<SearchResults> for SearchResponse {
    fn from(results: SearchResults) -> Self {
        Self {
            total_credentials: results.credentials.len(),
            total_notes: results.notes.len(),
            credentials: results.credentials.iter().map(CredentialSummary::from).collect(),
            notes: results.notes.iter().map(NoteSummary::from).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub type_filter: Option<String>,
    pub favorites_only: Option<String>,
    pub cred_page: Option<String>,
    pub note_page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PagedSearchResponse {
    pub query: String,
    pub credentials: Page<CredentialSummary>,
    pub notes: Page<NoteSummary>,
    pub total_results: usize,
}

#[derive(Debug, Deserialize)]
pub struct ToggleFavoriteRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleFavoriteResponse {
    pub success: bool,
    pub is_favorite: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ActivityQuery {
    pub limit: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TypeInfo {
    pub value: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TypesResponse {
    pub credential_types: Vec<TypeInfo>,
    pub note_types: Vec<TypeInfo>,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<DashboardStats>, AppError> {
    let stats = DashboardStats::gather(
        current.user.id,
        &state.credentials,
        &state.notes,
        &state.activity,
    )
    .await?;
    Ok(Json(stats))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(params): ApiJson<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let results = state.search.search_all(current.user.id, &params).await?;
    Ok(Json(SearchResponse::from(results)))
}

async fn search_paged(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<PagedSearchResponse>, AppError> {
    let params = SearchParams {
        query: query.query.clone(),
        type_filter: query.type_filter,
        favorites_only: truthy(query.favorites_only.as_deref()),
    };
    let results = state.search.search_all(current.user.id, &params).await?;
    let total_results = results.total();

    let credentials = Page::paginate(results.credentials, query.cred_page.as_deref(), PAGE_SIZE)
        .map(|c| CredentialSummary::from(&c));
    let notes = Page::paginate(results.notes, query.note_page.as_deref(), PAGE_SIZE)
        .map(|n| NoteSummary::from(&n));

    Ok(Json(PagedSearchResponse {
        query: query.query.unwrap_or_default(),
        credentials,
        notes,
        total_results,
    }))
}

async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ToggleFavoriteRequest>,
) -> Result<Json<ToggleFavoriteResponse>, AppError> {
    let user = current.user.id;
    let is_credential = match req.kind.as_str() {
        "credential" => true,
        "note" => false,
        _ => return Err(AppError::BadRequest("Invalid item type".to_owned())),
    };
    // An id that is not a UUID cannot name any record.
    let id = Uuid::parse_str(req.id.trim())
        .map_err(|_| AppError::NotFound("Not found.".to_owned()))?;
    let is_favorite = if is_credential {
        state.credentials.toggle_favorite(user, id).await?
    } else {
        state.notes.toggle_favorite(user, id).await?
    };
    Ok(Json(ToggleFavoriteResponse {
        success: true,
        is_favorite,
    }))
}

async fn favorites(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<SearchResponse>, AppError> {
    let results = state.search.favorites(current.user.id).await?;
    Ok(Json(SearchResponse::from(results)))
}

async fn activity(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Page<ActivityEntry>>, AppError> {
    let limit = query
        .limit
        .as_deref()
        .and_then(|l| l.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);
    let entries = state.activity.recent(current.user.id, limit).await?;
    Ok(Json(Page::paginate(entries, query.page.as_deref(), PAGE_SIZE)))
}

async fn export(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
) -> Result<Response, AppError> {
    let user = current.user.id;
    let credentials = state
        .credentials
        .list(user, &SearchParams::default())
        .await?;
    let csv = credentials_csv(&credentials)?;

    state
        .activity
        .log(user, ActivityAction::ExportData, "Exported user data", &client)
        .await?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        export_filename(Utc::now())
    ))
    .map_err(|e| AppError::Internal(format!("invalid content disposition: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

async fn types() -> Json<TypesResponse> {
    Json(TypesResponse {
        credential_types: CredentialKind::ALL
            .into_iter()
            .map(|k| TypeInfo {
                value: k.as_str(),
                label: k.label(),
                icon: k.icon(),
            })
            .collect(),
        note_types: NoteKind::ALL
            .into_iter()
            .map(|k| TypeInfo {
                value: k.as_str(),
                label: k.label(),
                icon: k.icon(),
            })
            .collect(),
    })
}
