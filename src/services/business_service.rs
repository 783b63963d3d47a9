//! Business customer persistence.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        business::{Business, CreateBusinessRequest, UpdateBusinessRequest},
        kyc::ReviewKycRequest,
    },
    services::{
        owner_service,
        sql::{ColumnUpdate, Page, UpdateBuilder},
    },
    shared::{BusinessId, OwnerId},
};

pub async fn create_business(
    pool: &DbPool,
    request: CreateBusinessRequest,
) -> Result<Business, AppError> {
    let request = request.validate()?;

    let business = sqlx::query_as::<_, Business>(
        r#"
        INSERT INTO businesses (id, legal_name, dba, entity_type, tax_id, email, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(BusinessId::new())
    .bind(request.legal_name)
    .bind(request.dba)
    .bind(request.entity_type.as_str())
    .bind(request.tax_id)
    .bind(request.email)
    .bind(request.phone)
    .fetch_one(pool)
    .await?;

    tracing::info!(business_id = %business.id, "Business created");
    Ok(business)
}

pub async fn get_business(pool: &DbPool, id: BusinessId) -> Result<Business, AppError> {
    sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE id = $1 AND deleted IS NULL")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Business"))
}

/// Newest first.
pub async fn list_businesses(pool: &DbPool, page: Page) -> Result<Vec<Business>, AppError> {
    let businesses = sqlx::query_as::<_, Business>(
        r#"
        SELECT * FROM businesses
        WHERE deleted IS NULL
        ORDER BY created DESC, id
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(businesses)
}

pub async fn update_business(
    pool: &DbPool,
    id: BusinessId,
    update: UpdateBusinessRequest,
) -> Result<Business, AppError> {
    if update.legal_name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError::invalid("legalName cannot be blank"));
    }

    let mut builder = UpdateBuilder::new("businesses");
    update.assign(&mut builder);

    let mut query = builder.finish(*id.as_uuid(), true)?;
    query
        .build_query_as::<Business>()
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Business"))
}

pub async fn delete_business(pool: &DbPool, id: BusinessId) -> Result<(), AppError> {
    owner_service::soft_delete(pool, &OwnerId::Business(id)).await
}

pub async fn submit_kyc(pool: &DbPool, id: BusinessId) -> Result<Business, AppError> {
    owner_service::submit_kyc(pool, &OwnerId::Business(id)).await?;
    get_business(pool, id).await
}

pub async fn review_kyc(
    pool: &DbPool,
    id: BusinessId,
    review: ReviewKycRequest,
    reviewer: &str,
) -> Result<Business, AppError> {
    let review = review.validate()?;
    owner_service::review_kyc(pool, &OwnerId::Business(id), &review, reviewer).await?;
    get_business(pool, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::status::KycStatus, services::fixtures};

    #[tokio::test]
    async fn empty_update_is_rejected_before_querying() {
        let pool = fixtures::unconnected_pool();

        let result = update_business(&pool, BusinessId::new(), UpdateBusinessRequest::default()).await;

        match result {
            Err(AppError::InvalidRequest(message)) => assert_eq!(message, "no fields to update"),
            other => panic!("expected invalid request, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_legal_name_is_rejected() {
        let update = UpdateBusinessRequest {
            legal_name: Some("  ".to_string()),
            ..Default::default()
        };

        let result = update_business(&fixtures::unconnected_pool(), BusinessId::new(), update).await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn deleted_business_is_not_found(pool: sqlx::PgPool) {
        let business = fixtures::business(&pool, KycStatus::NotStarted).await;

        delete_business(&pool, business.id).await.unwrap();

        assert!(matches!(
            get_business(&pool, business.id).await,
            Err(AppError::NotFound("Business"))
        ));
        let update = UpdateBusinessRequest {
            dba: Some("Acme".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_business(&pool, business.id, update).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            delete_business(&pool, business.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
