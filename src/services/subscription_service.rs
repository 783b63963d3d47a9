//! Platform subscriptions billed to businesses.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        status::SubscriptionStatus,
        subscription::{CreateSubscriptionRequest, Subscription, UpdateSubscriptionRequest},
    },
    services::{
        owner_service,
        sql::{ColumnUpdate, Page, UpdateBuilder},
    },
    shared::{BusinessId, OwnerId, SubscriptionId},
};

pub async fn create_subscription(
    pool: &DbPool,
    business_id: BusinessId,
    request: CreateSubscriptionRequest,
) -> Result<Subscription, AppError> {
    let request = request.validate()?;
    owner_service::ensure_exists(pool, &OwnerId::Business(business_id)).await?;

    let subscription = sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (id, business_id, plan, amount, billing_interval)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(SubscriptionId::new())
    .bind(business_id)
    .bind(request.plan)
    .bind(request.amount)
    .bind(request.billing_interval.as_str())
    .fetch_one(pool)
    .await?;

    tracing::info!(
        subscription_id = %subscription.id,
        business_id = %business_id,
        plan = %subscription.plan,
        "Subscription created"
    );
    Ok(subscription)
}

pub async fn get_subscription(pool: &DbPool, id: SubscriptionId) -> Result<Subscription, AppError> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Subscription"))
}

pub async fn list_subscriptions(
    pool: &DbPool,
    business_id: BusinessId,
    page: Page,
) -> Result<Vec<Subscription>, AppError> {
    let subscriptions = sqlx::query_as::<_, Subscription>(
        r#"
        SELECT * FROM subscriptions
        WHERE business_id = $1
        ORDER BY created DESC, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(business_id)
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(subscriptions)
}

/// Change plan, price or interval of an active subscription.
pub async fn update_subscription(
    pool: &DbPool,
    id: SubscriptionId,
    update: UpdateSubscriptionRequest,
) -> Result<Subscription, AppError> {
    let update = update.validate()?;

    let mut builder = UpdateBuilder::new("subscriptions");
    update.assign(&mut builder);
    let mut query = builder.finish(*id.as_uuid(), false)?;

    let current = get_subscription(pool, id).await?;
    if current.status == SubscriptionStatus::Canceled {
        return Err(AppError::Conflict(
            "canceled subscriptions cannot be changed".to_string(),
        ));
    }

    query
        .build_query_as::<Subscription>()
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Subscription"))
}

/// Cancel a subscription. Canceling twice is a conflict.
pub async fn cancel_subscription(pool: &DbPool, id: SubscriptionId) -> Result<Subscription, AppError> {
    let canceled = sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions
        SET status = $1, canceled = NOW(), modified = NOW()
        WHERE id = $2 AND status <> $1
        RETURNING *
        "#,
    )
    .bind(SubscriptionStatus::Canceled.as_str())
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match canceled {
        Some(subscription) => {
            tracing::info!(subscription_id = %id, "Subscription canceled");
            Ok(subscription)
        }
        None => {
            // Distinguish a missing row from one that was already canceled
            get_subscription(pool, id).await?;
            Err(AppError::Conflict(
                "subscription is already canceled".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;

    #[tokio::test]
    async fn empty_update_is_rejected_before_querying() {
        let result = update_subscription(
            &fixtures::unconnected_pool(),
            SubscriptionId::new(),
            UpdateSubscriptionRequest::default(),
        )
        .await;

        assert!(matches!(result, Err(AppError::InvalidRequest(_))));
    }
}
