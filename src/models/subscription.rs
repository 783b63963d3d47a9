//! Platform subscription plans billed to a business.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::status::{BillingInterval, SubscriptionStatus},
    services::sql::{ColumnUpdate, UpdateBuilder},
    shared::{BusinessId, Money, SubscriptionId},
};

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub business_id: BusinessId,
    pub plan: String,
    pub amount: Money,

    #[sqlx(try_from = "String")]
    pub billing_interval: BillingInterval,

    #[sqlx(try_from = "String")]
    pub status: SubscriptionStatus,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub canceled: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub plan: String,
    pub amount: Money,
    pub billing_interval: BillingInterval,
}

impl CreateSubscriptionRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        if self.plan.trim().is_empty() {
            return Err(AppError::invalid("plan is required"));
        }
        if self.amount.is_negative() {
            return Err(AppError::invalid("amount cannot be negative"));
        }
        Ok(self)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubscriptionRequest {
    pub plan: Option<String>,
    pub amount: Option<Money>,
    pub billing_interval: Option<BillingInterval>,
}

impl UpdateSubscriptionRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        if self.amount.is_some_and(|amount| amount.is_negative()) {
            return Err(AppError::invalid("amount cannot be negative"));
        }
        Ok(self)
    }
}

impl ColumnUpdate for UpdateSubscriptionRequest {
    fn assign<'a>(self, builder: &mut UpdateBuilder<'a>) {
        builder
            .set("plan", self.plan)
            .set("amount", self.amount)
            .set("billing_interval", self.billing_interval.map(|i| i.as_str()));
    }
}
