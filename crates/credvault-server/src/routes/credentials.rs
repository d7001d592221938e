//! Credential routes: `/api/credentials/*`
//!
//! - `GET    /api/credentials/`: filtered, paginated list (no secrets)
//! - `POST   /api/credentials/`: create
//! - `GET    /api/credentials/{id}`: decrypted detail, logs a view
//! - `PUT    /api/credentials/{id}`: update
//! - `DELETE /api/credentials/{id}`: delete

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use credvault_core::models::{ActivityAction, CredentialDetail, CredentialSummary};
use credvault_core::pagination::{PAGE_SIZE, Page};
use credvault_core::validate::CredentialInput;

use super::{ListQuery, MessageBody};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{Client, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/credentials/", get(list_credentials).post(create_credential))
        .route(
            "/credentials/{id}",
            get(get_credential)
                .put(update_credential)
                .delete(delete_credential),
        )
}

#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub credential: CredentialSummary,
    pub message: String,
}

async fn list_credentials(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<CredentialSummary>>, AppError> {
    let found = state
        .credentials
        .list(current.user.id, &query.search_params())
        .await?;
    let page = Page::paginate(found, query.page.as_deref(), PAGE_SIZE);
    Ok(Json(page.map(|c| CredentialSummary::from(&c))))
}

async fn create_credential(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
    ApiJson(input): ApiJson<CredentialInput>,
) -> Result<(StatusCode, Json<CredentialResponse>), AppError> {
    let user = current.user.id;
    let credential = state.credentials.create(user, input).await?;
    state
        .activity
        .log(
            user,
            ActivityAction::CreateCredential,
            format!("Created credential: {}", credential.label),
            &client,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CredentialResponse {
            message: format!("Credential \"{}\" created successfully!", credential.label),
            credential: CredentialSummary::from(&credential),
        }),
    ))
}

async fn get_credential(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CredentialDetail>, AppError> {
    let user = current.user.id;
    let credential = state.credentials.touch(user, id).await?;
    state
        .activity
        .log(
            user,
            ActivityAction::ViewCredential,
            format!("Viewed credential: {}", credential.label),
            &client,
        )
        .await?;
    Ok(Json(state.credentials.reveal(&credential)))
}

async fn update_credential(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<CredentialInput>,
) -> Result<Json<CredentialResponse>, AppError> {
    let user = current.user.id;
    let credential = state.credentials.update(user, id, input).await?;
    state
        .activity
        .log(
            user,
            ActivityAction::UpdateCredential,
            format!("Updated credential: {}", credential.label),
            &client,
        )
        .await?;

    Ok(Json(CredentialResponse {
        message: format!("Credential \"{}\" updated successfully!", credential.label),
        credential: CredentialSummary::from(&credential),
    }))
}

async fn delete_credential(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageBody>, AppError> {
    let user = current.user.id;
    let removed = state.credentials.delete(user, id).await?;
    state
        .activity
        .log(
            user,
            ActivityAction::DeleteCredential,
            format!("Deleted credential: {}", removed.label),
            &client,
        )
        .await?;

    Ok(Json(MessageBody::ok(format!(
        "Credential \"{}\" deleted successfully!",
        removed.label
    ))))
}
