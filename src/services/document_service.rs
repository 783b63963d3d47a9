//! Document registration and upload tracking.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        document::{CreateDocumentRequest, Document, storage_key},
        status::DocumentStatus,
    },
    services::{owner_service, sql::Page},
    shared::{DocumentId, OwnerId},
    storage::DocumentStore,
};

/// Register a pending document and presign the URL its bytes are uploaded to.
///
/// Returns the row and the upload URL.
pub async fn create_document(
    pool: &DbPool,
    store: &dyn DocumentStore,
    request: CreateDocumentRequest,
    created_by: &str,
) -> Result<(Document, String), AppError> {
    if request.content_type.trim().is_empty() {
        return Err(AppError::invalid("contentType is required"));
    }

    owner_service::ensure_exists(pool, &request.owner_id).await?;

    let id = DocumentId::new();
    let key = storage_key(&request.owner_id, &id);
    let upload_url = store.presign_upload(&key, &request.content_type).await?;

    let document = sqlx::query_as::<_, Document>(
        r#"
        INSERT INTO documents
            (id, business_id, consumer_id, document_type, content_type, storage_key, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(request.owner_id.business_id())
    .bind(request.owner_id.consumer_id())
    .bind(request.document_type.as_str())
    .bind(request.content_type)
    .bind(key)
    .bind(created_by)
    .fetch_one(pool)
    .await?;

    tracing::info!(document_id = %document.id, owner = %request.owner_id, "Document registered");
    Ok((document, upload_url))
}

pub async fn get_document(pool: &DbPool, id: DocumentId) -> Result<Document, AppError> {
    sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = $1 AND deleted IS NULL")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Document"))
}

pub async fn list_documents(
    pool: &DbPool,
    owner: &OwnerId,
    page: Page,
) -> Result<Vec<Document>, AppError> {
    let documents = sqlx::query_as::<_, Document>(
        r#"
        SELECT * FROM documents
        WHERE (business_id = $1 OR consumer_id = $1) AND deleted IS NULL
        ORDER BY created DESC, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(owner.as_uuid())
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(documents)
}

/// Presigned download URL. Only uploaded documents have bytes to fetch.
pub async fn get_document_url(
    pool: &DbPool,
    store: &dyn DocumentStore,
    id: DocumentId,
) -> Result<(Document, String), AppError> {
    let document = get_document(pool, id).await?;

    if document.status != DocumentStatus::Uploaded {
        return Err(AppError::Conflict(
            "document has not been uploaded yet".to_string(),
        ));
    }

    let url = store.presign_download(&document.storage_key).await?;
    Ok((document, url))
}

pub async fn delete_document(pool: &DbPool, id: DocumentId) -> Result<(), AppError> {
    let affected = sqlx::query(
        "UPDATE documents SET deleted = NOW(), modified = NOW() WHERE id = $1 AND deleted IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound("Document"));
    }
    Ok(())
}

/// Flip the document stored under `key` to `uploaded`.
///
/// Returns `None` when no document owns the key. Repeated notifications for
/// the same object are harmless.
pub async fn mark_uploaded(
    pool: &DbPool,
    key: &str,
    size_bytes: Option<i64>,
) -> Result<Option<Document>, sqlx::Error> {
    sqlx::query_as::<_, Document>(
        r#"
        UPDATE documents
        SET status = $1, size_bytes = COALESCE($2, size_bytes), modified = NOW()
        WHERE storage_key = $3
        RETURNING *
        "#,
    )
    .bind(DocumentStatus::Uploaded.as_str())
    .bind(size_bytes)
    .bind(key)
    .fetch_optional(pool)
    .await
}
