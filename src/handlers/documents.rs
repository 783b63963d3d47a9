//! Document HTTP handlers.
//!
//! Creating a document returns a presigned upload URL. The client PUTs the
//! bytes straight to storage; the document worker marks the row uploaded
//! when storage reports the object. Only then does the url endpoint hand
//! out a download link.

use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    middleware::auth::AuthContext,
    models::{
        bank_account::OwnerQuery,
        document::{CreateDocumentRequest, DocumentResponse},
    },
    services::{document_service, sql::Page},
    shared::DocumentId,
    state::AppState,
};

/// `POST /api/v1/documents`; the response carries the upload URL in `url`.
pub async fn create_document(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    AppJson(request): AppJson<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentResponse>), AppError> {
    let (document, upload_url) = document_service::create_document(
        &state.pool,
        state.documents.as_ref(),
        request,
        &auth.client_name,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DocumentResponse::from(document).with_url(upload_url)),
    ))
}

pub async fn list_documents(
    State(pool): State<DbPool>,
    AppQuery(owner): AppQuery<OwnerQuery>,
    AppQuery(page): AppQuery<Page>,
) -> Result<Json<Vec<DocumentResponse>>, AppError> {
    let documents = document_service::list_documents(&pool, &owner.owner_id, page).await?;
    Ok(Json(documents.into_iter().map(Into::into).collect()))
}

pub async fn get_document(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<DocumentId>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = document_service::get_document(&pool, id).await?;
    Ok(Json(document.into()))
}

/// Presigned download URL; 409 while the upload is still pending.
pub async fn get_document_url(
    State(state): State<AppState>,
    AppPath(id): AppPath<DocumentId>,
) -> Result<Json<DocumentResponse>, AppError> {
    let (document, url) =
        document_service::get_document_url(&state.pool, state.documents.as_ref(), id).await?;
    Ok(Json(DocumentResponse::from(document).with_url(url)))
}

pub async fn delete_document(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<DocumentId>,
) -> Result<StatusCode, AppError> {
    document_service::delete_document(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
