//! Consumer customer HTTP handlers.

use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    middleware::auth::AuthContext,
    models::{
        consumer::{ConsumerResponse, CreateConsumerRequest, UpdateConsumerRequest},
        kyc::ReviewKycRequest,
    },
    services::{consumer_service, sql::Page},
    shared::ConsumerId,
};

/// `POST /api/v1/consumers`. Consumers must be at least 18 years old.
pub async fn create_consumer(
    State(pool): State<DbPool>,
    AppJson(request): AppJson<CreateConsumerRequest>,
) -> Result<(StatusCode, Json<ConsumerResponse>), AppError> {
    let consumer = consumer_service::create_consumer(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(consumer.into())))
}

pub async fn list_consumers(
    State(pool): State<DbPool>,
    AppQuery(page): AppQuery<Page>,
) -> Result<Json<Vec<ConsumerResponse>>, AppError> {
    let consumers = consumer_service::list_consumers(&pool, page).await?;
    Ok(Json(consumers.into_iter().map(Into::into).collect()))
}

pub async fn get_consumer(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<ConsumerId>,
) -> Result<Json<ConsumerResponse>, AppError> {
    let consumer = consumer_service::get_consumer(&pool, id).await?;
    Ok(Json(consumer.into()))
}

pub async fn update_consumer(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<ConsumerId>,
    AppJson(update): AppJson<UpdateConsumerRequest>,
) -> Result<Json<ConsumerResponse>, AppError> {
    let consumer = consumer_service::update_consumer(&pool, id, update).await?;
    Ok(Json(consumer.into()))
}

pub async fn delete_consumer(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<ConsumerId>,
) -> Result<StatusCode, AppError> {
    consumer_service::delete_consumer(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_kyc(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<ConsumerId>,
) -> Result<Json<ConsumerResponse>, AppError> {
    let consumer = consumer_service::submit_kyc(&pool, id).await?;
    Ok(Json(consumer.into()))
}

pub async fn review_kyc(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<ConsumerId>,
    AppJson(review): AppJson<ReviewKycRequest>,
) -> Result<Json<ConsumerResponse>, AppError> {
    let consumer = consumer_service::review_kyc(&pool, id, review, &auth.client_name).await?;
    Ok(Json(consumer.into()))
}
