//! Business customer models and API request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::status::{EntityType, KycStatus},
    services::sql::{ColumnUpdate, UpdateBuilder},
    shared::BusinessId,
};

/// Represents a row of the `businesses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Business {
    pub id: BusinessId,
    pub legal_name: String,
    pub dba: Option<String>,

    #[sqlx(try_from = "String")]
    pub entity_type: EntityType,

    /// Employer identification number, nine digits without separators
    pub tax_id: String,

    pub email: Option<String>,
    pub phone: Option<String>,

    #[sqlx(try_from = "String")]
    pub kyc_status: KycStatus,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,

    /// Set when the business is soft deleted
    pub deleted: Option<DateTime<Utc>>,
}

/// Request body for creating a business.
///
/// # JSON Example
///
/// ```json
/// {
///   "legalName": "Acme Widgets LLC",
///   "entityType": "llc",
///   "taxId": "12-3456789",
///   "email": "ops@acme.test"
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessRequest {
    pub legal_name: String,
    pub dba: Option<String>,
    pub entity_type: EntityType,
    pub tax_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl CreateBusinessRequest {
    /// Check required fields and normalize the tax id to bare digits.
    pub fn validate(mut self) -> Result<Self, AppError> {
        if self.legal_name.trim().is_empty() {
            return Err(AppError::invalid("legalName is required"));
        }
        self.tax_id = normalize_tax_id(&self.tax_id)?;
        Ok(self)
    }
}

/// Partial update of a business. The tax id cannot change.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBusinessRequest {
    pub legal_name: Option<String>,
    pub dba: Option<String>,
    pub entity_type: Option<EntityType>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ColumnUpdate for UpdateBusinessRequest {
    fn assign<'a>(self, builder: &mut UpdateBuilder<'a>) {
        builder
            .set("legal_name", self.legal_name)
            .set("dba", self.dba)
            .set("entity_type", self.entity_type.map(|t| t.as_str()))
            .set("email", self.email)
            .set("phone", self.phone);
    }
}

/// Response body for business endpoints. Only the last four digits of the
/// tax id leave the service.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessResponse {
    pub id: BusinessId,
    pub legal_name: String,
    pub dba: Option<String>,
    pub entity_type: EntityType,
    pub tax_id_last_four: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub kyc_status: KycStatus,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<Business> for BusinessResponse {
    fn from(business: Business) -> Self {
        Self {
            id: business.id,
            tax_id_last_four: last_four(&business.tax_id),
            legal_name: business.legal_name,
            dba: business.dba,
            entity_type: business.entity_type,
            email: business.email,
            phone: business.phone,
            kyc_status: business.kyc_status,
            created: business.created,
            modified: business.modified,
        }
    }
}

/// Strip separators from an EIN/SSN and require exactly nine digits.
pub fn normalize_tax_id(raw: &str) -> Result<String, AppError> {
    let digits: String = raw.chars().filter(|c| !matches!(c, '-' | ' ')).collect();
    if digits.len() != 9 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::invalid("taxId must contain exactly nine digits"));
    }
    Ok(digits)
}

/// Last four characters of a sensitive number.
pub fn last_four(value: &str) -> String {
    let skip = value.chars().count().saturating_sub(4);
    value.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("12-3456789", "123456789")]
    #[case("123 45 6789", "123456789")]
    #[case("123456789", "123456789")]
    fn tax_ids_are_normalized(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_tax_id(raw).unwrap(), expected);
    }

    #[rstest]
    #[case("12345678")]
    #[case("12-345678X")]
    #[case("")]
    fn bad_tax_ids_are_rejected(#[case] raw: &str) {
        assert!(normalize_tax_id(raw).is_err());
    }

    #[rstest]
    fn last_four_handles_short_values() {
        assert_eq!(last_four("123456789"), "6789");
        assert_eq!(last_four("12"), "12");
    }

    #[rstest]
    fn create_request_requires_name() {
        let request: CreateBusinessRequest = serde_json::from_value(serde_json::json!({
            "legalName": "  ",
            "entityType": "llc",
            "taxId": "12-3456789"
        }))
        .unwrap();

        assert!(request.validate().is_err());
    }
}
