use crate::{
    db::DbPool,
    error::AppError,
    models::note::{CreateNoteRequest, Note, UpdateNoteRequest},
    services::{
        owner_service,
        sql::{ColumnUpdate, Page, UpdateBuilder},
    },
    shared::{NoteId, OwnerId},
};

/// Attach a note to a business or consumer. `author` is the API client name.
pub async fn create_note(
    pool: &DbPool,
    request: CreateNoteRequest,
    author: &str,
) -> Result<Note, AppError> {
    if request.body.trim().is_empty() {
        return Err(AppError::invalid("body is required"));
    }

    owner_service::ensure_exists(pool, &request.owner_id).await?;

    let note = sqlx::query_as::<_, Note>(
        r#"
        INSERT INTO notes (id, business_id, consumer_id, author, body)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(NoteId::new())
    .bind(request.owner_id.business_id())
    .bind(request.owner_id.consumer_id())
    .bind(author)
    .bind(request.body)
    .fetch_one(pool)
    .await?;

    Ok(note)
}

pub async fn get_note(pool: &DbPool, id: NoteId) -> Result<Note, AppError> {
    sqlx::query_as::<_, Note>("SELECT * FROM notes WHERE id = $1 AND deleted IS NULL")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Note"))
}

pub async fn list_notes(pool: &DbPool, owner: &OwnerId, page: Page) -> Result<Vec<Note>, AppError> {
    let notes = sqlx::query_as::<_, Note>(
        r#"
        SELECT * FROM notes
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

    Ok(notes)
}

pub async fn update_note(
    pool: &DbPool,
    id: NoteId,
    update: UpdateNoteRequest,
) -> Result<Note, AppError> {
    if update.body.as_deref().is_some_and(|body| body.trim().is_empty()) {
        return Err(AppError::invalid("body cannot be blank"));
    }

    let mut builder = UpdateBuilder::new("notes");
    update.assign(&mut builder);

    let mut query = builder.finish(*id.as_uuid(), true)?;
    query
        .build_query_as::<Note>()
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Note"))
}

pub async fn delete_note(pool: &DbPool, id: NoteId) -> Result<(), AppError> {
    let affected = sqlx::query(
        "UPDATE notes SET deleted = NOW(), modified = NOW() WHERE id = $1 AND deleted IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if affected == 0 {
        return Err(AppError::NotFound("Note"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;

    #[tokio::test]
    async fn empty_update_is_rejected_before_querying() {
        let result =
            update_note(&fixtures::unconnected_pool(), NoteId::new(), UpdateNoteRequest::default()).await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
