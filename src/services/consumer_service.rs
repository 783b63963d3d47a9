//! Consumer (individual) customer persistence.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        consumer::{Consumer, CreateConsumerRequest, UpdateConsumerRequest},
        kyc::ReviewKycRequest,
    },
    services::{
        owner_service,
        sql::{ColumnUpdate, Page, UpdateBuilder},
    },
    shared::{ConsumerId, Date, OwnerId},
};

pub async fn create_consumer(
    pool: &DbPool,
    request: CreateConsumerRequest,
) -> Result<Consumer, AppError> {
    let request = request.validate(Date::today())?;

    let consumer = sqlx::query_as::<_, Consumer>(
        r#"
        INSERT INTO consumers (id, first_name, last_name, date_of_birth, tax_id, email, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(ConsumerId::new())
    .bind(request.first_name)
    .bind(request.last_name)
    .bind(request.date_of_birth)
    .bind(request.tax_id)
    .bind(request.email)
    .bind(request.phone)
    .fetch_one(pool)
    .await?;

    tracing::info!(consumer_id = %consumer.id, "Consumer created");
    Ok(consumer)
}

pub async fn get_consumer(pool: &DbPool, id: ConsumerId) -> Result<Consumer, AppError> {
    sqlx::query_as::<_, Consumer>("SELECT * FROM consumers WHERE id = $1 AND deleted IS NULL")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Consumer"))
}

pub async fn list_consumers(pool: &DbPool, page: Page) -> Result<Vec<Consumer>, AppError> {
    let consumers = sqlx::query_as::<_, Consumer>(
        r#"
        SELECT * FROM consumers
        WHERE deleted IS NULL
        ORDER BY created DESC, id
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(consumers)
}

pub async fn update_consumer(
    pool: &DbPool,
    id: ConsumerId,
    update: UpdateConsumerRequest,
) -> Result<Consumer, AppError> {
    let blank = |value: &Option<String>| value.as_deref().is_some_and(|v| v.trim().is_empty());
    if blank(&update.first_name) || blank(&update.last_name) {
        return Err(AppError::invalid("names cannot be blank"));
    }

    let mut builder = UpdateBuilder::new("consumers");
    update.assign(&mut builder);

    let mut query = builder.finish(*id.as_uuid(), true)?;
    query
        .build_query_as::<Consumer>()
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Consumer"))
}

pub async fn delete_consumer(pool: &DbPool, id: ConsumerId) -> Result<(), AppError> {
    owner_service::soft_delete(pool, &OwnerId::Consumer(id)).await
}

pub async fn submit_kyc(pool: &DbPool, id: ConsumerId) -> Result<Consumer, AppError> {
    owner_service::submit_kyc(pool, &OwnerId::Consumer(id)).await?;
    get_consumer(pool, id).await
}

pub async fn review_kyc(
    pool: &DbPool,
    id: ConsumerId,
    review: ReviewKycRequest,
    reviewer: &str,
) -> Result<Consumer, AppError> {
    let review = review.validate()?;
    owner_service::review_kyc(pool, &OwnerId::Consumer(id), &review, reviewer).await?;
    get_consumer(pool, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;

    #[tokio::test]
    async fn empty_update_is_rejected_before_querying() {
        let result = update_consumer(
            &fixtures::unconnected_pool(),
            ConsumerId::new(),
            UpdateConsumerRequest::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn blank_last_name_is_rejected() {
        let update = UpdateConsumerRequest {
            last_name: Some(String::new()),
            ..Default::default()
        };

        let result = update_consumer(&fixtures::unconnected_pool(), ConsumerId::new(), update).await;

        match result {
            Err(AppError::InvalidRequest(message)) => assert_eq!(message, "names cannot be blank"),
            other => panic!("expected invalid request, got {other:?}"),
        }
    }
}
