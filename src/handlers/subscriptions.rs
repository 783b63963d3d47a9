//! Subscription HTTP handlers.

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    models::subscription::{CreateSubscriptionRequest, Subscription, UpdateSubscriptionRequest},
    services::{sql::Page, subscription_service},
    shared::{BusinessId, SubscriptionId},
};

pub async fn create_subscription(
    State(pool): State<DbPool>,
    AppPath(business_id): AppPath<BusinessId>,
    AppJson(request): AppJson<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<Subscription>), AppError> {
    let subscription =
        subscription_service::create_subscription(&pool, business_id, request).await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn list_subscriptions(
    State(pool): State<DbPool>,
    AppPath(business_id): AppPath<BusinessId>,
    AppQuery(page): AppQuery<Page>,
) -> Result<Json<Vec<Subscription>>, AppError> {
    Ok(Json(
        subscription_service::list_subscriptions(&pool, business_id, page).await?,
    ))
}

pub async fn get_subscription(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<SubscriptionId>,
) -> Result<Json<Subscription>, AppError> {
    Ok(Json(subscription_service::get_subscription(&pool, id).await?))
}

pub async fn update_subscription(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<SubscriptionId>,
    AppJson(update): AppJson<UpdateSubscriptionRequest>,
) -> Result<Json<Subscription>, AppError> {
    Ok(Json(
        subscription_service::update_subscription(&pool, id, update).await?,
    ))
}

pub async fn cancel_subscription(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<SubscriptionId>,
) -> Result<Json<Subscription>, AppError> {
    Ok(Json(subscription_service::cancel_subscription(&pool, id).await?))
}
