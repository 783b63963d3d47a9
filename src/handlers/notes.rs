use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    middleware::auth::AuthContext,
    models::{
        bank_account::OwnerQuery,
        note::{CreateNoteRequest, NoteResponse, UpdateNoteRequest},
    },
    services::{note_service, sql::Page},
    shared::NoteId,
};

/// The calling client becomes the note's author.
pub async fn create_note(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>), AppError> {
    let note = note_service::create_note(&pool, request, &auth.client_name).await?;
    Ok((StatusCode::CREATED, Json(note.into())))
}

pub async fn list_notes(
    State(pool): State<DbPool>,
    AppQuery(owner): AppQuery<OwnerQuery>,
    AppQuery(page): AppQuery<Page>,
) -> Result<Json<Vec<NoteResponse>>, AppError> {
    let notes = note_service::list_notes(&pool, &owner.owner_id, page).await?;
    Ok(Json(notes.into_iter().map(Into::into).collect()))
}

pub async fn get_note(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<NoteId>,
) -> Result<Json<NoteResponse>, AppError> {
    Ok(Json(note_service::get_note(&pool, id).await?.into()))
}

pub async fn update_note(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<NoteId>,
    AppJson(update): AppJson<UpdateNoteRequest>,
) -> Result<Json<NoteResponse>, AppError> {
    Ok(Json(note_service::update_note(&pool, id, update).await?.into()))
}

pub async fn delete_note(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<NoteId>,
) -> Result<StatusCode, AppError> {
    note_service::delete_note(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
