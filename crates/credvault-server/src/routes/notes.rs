//! Secure note routes: `/api/notes/*`
//!
//! Same shape as the credential routes. Text search matches title and tags
//! only; note bodies are never searched.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use credvault_core::models::{ActivityAction, NoteDetail, NoteSummary};
use credvault_core::pagination::{PAGE_SIZE, Page};
use credvault_core::validate::NoteInput;

use super::{ListQuery, MessageBody};
use crate::error::AppError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::{Client, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notes/", get(list_notes).post(create_note))
        .route("/notes/{id}", get(get_note).put(update_note).delete(delete_note))
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub note: NoteSummary,
    pub message: String,
}

async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<NoteSummary>>, AppError> {
    let found = state.notes.list(current.user.id, &query.search_params()).await?;
    let page = Page::paginate(found, query.page.as_deref(), PAGE_SIZE);
    Ok(Json(page.map(|n| NoteSummary::from(&n))))
}

async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
    ApiJson(input): ApiJson<NoteInput>,
) -> Result<(StatusCode, Json<NoteResponse>), AppError> {
    let user = current.user.id;
    let note = state.notes.create(user, input).await?;
    state
        .activity
        .log(
            user,
            ActivityAction::CreateNote,
            format!("Created note: {}", note.title),
            &client,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(NoteResponse {
            message: format!("Note \"{}\" created successfully!", note.title),
            note: NoteSummary::from(&note),
        }),
    ))
}

async fn get_note(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NoteDetail>, AppError> {
    let user = current.user.id;
    let note = state.notes.touch(user, id).await?;
    state
        .activity
        .log(
            user,
            ActivityAction::ViewNote,
            format!("Viewed note: {}", note.title),
            &client,
        )
        .await?;
    Ok(Json(state.notes.reveal(&note)))
}

async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<NoteInput>,
) -> Result<Json<NoteResponse>, AppError> {
    let user = current.user.id;
    let note = state.notes.update(user, id, input).await?;
    state
        .activity
        .log(
            user,
            ActivityAction::UpdateNote,
            format!("Updated note: {}", note.title),
            &client,
        )
        .await?;

    Ok(Json(NoteResponse {
        message: format!("Note \"{}\" updated successfully!", note.title),
        note: NoteSummary::from(&note),
    }))
}

async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Client(client): Client,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<MessageBody>, AppError> {
    let user = current.user.id;
    let removed = state.notes.delete(user, id).await?;
    state
        .activity
        .log(
            user,
            ActivityAction::DeleteNote,
            format!("Deleted note: {}", removed.title),
            &client,
        )
        .await?;

    Ok(Json(MessageBody::ok(format!(
        "Note \"{}\" deleted successfully!",
        removed.title
    ))))
}
