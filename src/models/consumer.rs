//! Consumer (individual) customer models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{
        business::{last_four, normalize_tax_id},
        status::KycStatus,
    },
    services::sql::{ColumnUpdate, UpdateBuilder},
    shared::{ConsumerId, Date},
};

/// Consumers must be adults to hold an account.
pub const MINIMUM_AGE: i32 = 18;

/// Represents a row of the `consumers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Consumer {
    pub id: ConsumerId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,

    /// Social security number, nine digits without separators
    pub tax_id: String,

    pub email: Option<String>,
    pub phone: Option<String>,

    #[sqlx(try_from = "String")]
    pub kyc_status: KycStatus,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub deleted: Option<DateTime<Utc>>,
}

impl Consumer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConsumerRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub tax_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CreateConsumerRequest {
    /// Check names, age on `today`, and normalize the tax id.
    pub fn validate(mut self, today: Date) -> Result<Self, AppError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AppError::invalid("firstName and lastName are required"));
        }
        if self.date_of_birth.years_until(today) < MINIMUM_AGE {
            return Err(AppError::invalid(format!(
                "consumer must be at least {MINIMUM_AGE} years old"
            )));
        }
        self.tax_id = normalize_tax_id(&self.tax_id)?;
        Ok(self)
    }
}

/// Partial update of a consumer. Identity fields (birth date, tax id) are fixed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConsumerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ColumnUpdate for UpdateConsumerRequest {
    fn assign<'a>(self, builder: &mut UpdateBuilder<'a>) {
        builder
            .set("first_name", self.first_name)
            .set("last_name", self.last_name)
            .set("email", self.email)
            .set("phone", self.phone);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerResponse {
    pub id: ConsumerId,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub tax_id_last_four: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub kyc_status: KycStatus,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<Consumer> for ConsumerResponse {
    fn from(consumer: Consumer) -> Self {
        Self {
            id: consumer.id,
            tax_id_last_four: last_four(&consumer.tax_id),
            first_name: consumer.first_name,
            last_name: consumer.last_name,
            date_of_birth: consumer.date_of_birth,
            email: consumer.email,
            phone: consumer.phone,
            kyc_status: consumer.kyc_status,
            created: consumer.created,
            modified: consumer.modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(date_of_birth: &str) -> CreateConsumerRequest {
        serde_json::from_value(serde_json::json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "dateOfBirth": date_of_birth,
            "taxId": "123-45-6789"
        }))
        .unwrap()
    }

    #[rstest]
    #[case("2000-01-01", true)]
    #[case("2007-06-02", true)]
    #[case("2007-06-03", false)]
    fn minors_are_rejected(#[case] date_of_birth: &str, #[case] accepted: bool) {
        let today = Date::from_ymd(2025, 6, 2).unwrap();
        assert_eq!(request(date_of_birth).validate(today).is_ok(), accepted);
    }

    #[rstest]
    fn validate_normalizes_tax_id() {
        let today = Date::from_ymd(2025, 1, 1).unwrap();
        let validated = request("1990-05-05").validate(today).unwrap();
        assert_eq!(validated.tax_id, "123456789");
    }
}
