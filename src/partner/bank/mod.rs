//! Partner bank adapter.
//!
//! Accounts and cards are issued by the partner bank. This module defines
//! the partner-facing model, the [`BankPartner`] trait implemented by the
//! REST client, and the [`BankAdapter`] that registers platform customers
//! with the partner and records every partner id in the `bank_shadow`
//! schema.

pub mod bbva;
pub mod shadow;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    db::DbPool,
    error::AppError,
    models::{business::Business, consumer::Consumer, status::CardStatus},
    services::owner_service,
    shared::{Date, Money, OwnerId, oauth::OAuthError},
};

#[derive(Debug, thiserror::Error)]
pub enum PartnerError {
    #[error("partner returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("partner request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("partner authentication failed: {0}")]
    Auth(#[from] OAuthError),

    #[error("partner rejected a freshly issued token")]
    Unauthorized,

    #[error("invalid partner url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unexpected partner response: {0}")]
    Unexpected(String),
}

/// Individual customer as registered with the partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerConsumer {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub ssn: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<&Consumer> for PartnerConsumer {
    fn from(consumer: &Consumer) -> Self {
        Self {
            first_name: consumer.first_name.clone(),
            last_name: consumer.last_name.clone(),
            date_of_birth: consumer.date_of_birth,
            ssn: consumer.tax_id.clone(),
            email: consumer.email.clone(),
            phone: consumer.phone.clone(),
        }
    }
}

/// Business customer as registered with the partner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerBusiness {
    pub legal_name: String,
    pub doing_business_as: Option<String>,
    pub entity_type: String,
    pub ein: String,
    pub email: Option<String>,
}

impl From<&Business> for PartnerBusiness {
    fn from(business: &Business) -> Self {
        Self {
            legal_name: business.legal_name.clone(),
            doing_business_as: business.dba.clone(),
            entity_type: business.entity_type.as_str().to_string(),
            ein: business.tax_id.clone(),
            email: business.email.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerAccount {
    pub id: String,
    pub account_number: String,
    pub routing_number: String,
    pub available_balance: Money,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartnerCard {
    pub id: String,
    pub last_four: String,
    pub status: CardStatus,
}

/// Operations the platform needs from the partner bank.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BankPartner: Send + Sync {
    /// Register an individual; returns the partner customer id.
    async fn create_consumer(&self, consumer: &PartnerConsumer) -> Result<String, PartnerError>;

    /// Register a business; returns the partner customer id.
    async fn create_business(&self, business: &PartnerBusiness) -> Result<String, PartnerError>;

    async fn open_account(&self, customer_id: &str) -> Result<PartnerAccount, PartnerError>;

    async fn get_account(&self, account_id: &str) -> Result<PartnerAccount, PartnerError>;

    async fn issue_card(
        &self,
        account_id: &str,
        cardholder_name: &str,
    ) -> Result<PartnerCard, PartnerError>;

    async fn set_card_status(
        &self,
        card_id: &str,
        status: CardStatus,
    ) -> Result<PartnerCard, PartnerError>;
}

/// A platform customer that can be registered with the partner.
#[derive(Debug, Clone, Copy)]
pub enum Customer<'a> {
    Business(&'a Business),
    Consumer(&'a Consumer),
}

impl Customer<'_> {
    pub fn owner_id(&self) -> OwnerId {
        match self {
            Customer::Business(business) => OwnerId::Business(business.id),
            Customer::Consumer(consumer) => OwnerId::Consumer(consumer.id),
        }
    }

    /// Name printed on cards issued to this customer.
    pub fn display_name(&self) -> String {
        match self {
            Customer::Business(business) => business
                .dba
                .clone()
                .unwrap_or_else(|| business.legal_name.clone()),
            Customer::Consumer(consumer) => consumer.full_name(),
        }
    }
}

/// Partner client plus shadow-schema bookkeeping.
#[derive(Clone)]
pub struct BankAdapter {
    partner: Arc<dyn BankPartner>,
}

impl BankAdapter {
    pub fn new(partner: Arc<dyn BankPartner>) -> Self {
        Self { partner }
    }

    pub fn partner(&self) -> &dyn BankPartner {
        self.partner.as_ref()
    }

    /// Partner customer id of `customer`, registering the customer on first use.
    ///
    /// The shadow row makes registration idempotent: a second account for the
    /// same owner reuses the existing partner customer. The owner row stays
    /// locked from the shadow lookup until the shadow row is written, so
    /// concurrent callers for one owner register it with the partner once.
    pub async fn ensure_customer(
        &self,
        pool: &DbPool,
        customer: Customer<'_>,
    ) -> Result<String, AppError> {
        let owner = customer.owner_id();

        let mut tx = pool.begin().await?;
        owner_service::lock(&mut tx, &owner).await?;

        if let Some(existing) = shadow::find_customer(&mut *tx, &owner).await? {
            return Ok(existing);
        }

        let partner_id = match customer {
            Customer::Business(business) => {
                self.partner
                    .create_business(&PartnerBusiness::from(business))
                    .await?
            }
            Customer::Consumer(consumer) => {
                self.partner
                    .create_consumer(&PartnerConsumer::from(consumer))
                    .await?
            }
        };

        shadow::insert_customer(&mut *tx, &owner, &partner_id).await?;
        tx.commit().await?;

        tracing::info!(owner = %owner, partner_customer_id = %partner_id, "Registered customer with partner bank");
        Ok(partner_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::status::{EntityType, KycStatus},
        shared::{BusinessId, ConsumerId},
    };
    use chrono::Utc;

    fn business(dba: Option<&str>) -> Business {
        Business {
            id: BusinessId::new(),
            legal_name: "Acme Widgets LLC".to_string(),
            dba: dba.map(str::to_string),
            entity_type: EntityType::Llc,
            tax_id: "123456789".to_string(),
            email: None,
            phone: None,
            kyc_status: KycStatus::Approved,
            created: Utc::now(),
            modified: Utc::now(),
            deleted: None,
        }
    }

    fn consumer() -> Consumer {
        Consumer {
            id: ConsumerId::new(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            date_of_birth: Date::from_ymd(1990, 12, 10).unwrap(),
            tax_id: "987654321".to_string(),
            email: Some("ada@example.test".to_string()),
            phone: None,
            kyc_status: KycStatus::Approved,
            created: Utc::now(),
            modified: Utc::now(),
            deleted: None,
        }
    }

    #[test]
    fn business_translation_uses_ein_and_entity_text() {
        let partner = PartnerBusiness::from(&business(Some("Acme")));
        assert_eq!(partner.ein, "123456789");
        assert_eq!(partner.entity_type, "llc");
        assert_eq!(partner.doing_business_as.as_deref(), Some("Acme"));
    }

    #[test]
    fn consumer_translation_carries_ssn() {
        let source = consumer();
        let partner = PartnerConsumer::from(&source);
        assert_eq!(partner.ssn, "987654321");
        assert_eq!(partner.date_of_birth, source.date_of_birth);
    }

    #[test]
    fn display_name_prefers_dba() {
        let with_dba = business(Some("Acme"));
        let without_dba = business(None);
        let person = consumer();

        assert_eq!(Customer::Business(&with_dba).display_name(), "Acme");
        assert_eq!(
            Customer::Business(&without_dba).display_name(),
            "Acme Widgets LLC"
        );
        assert_eq!(Customer::Consumer(&person).display_name(), "Ada Lovelace");
    }

    #[tokio::test]
    async fn adapter_exposes_partner_calls() {
        let mut partner = MockBankPartner::new();
        partner
            .expect_get_account()
            .withf(|id| id == "acct-1")
            .returning(|id| {
                Ok(PartnerAccount {
                    id: id.to_string(),
                    account_number: "000123456789".to_string(),
                    routing_number: "062001186".to_string(),
                    available_balance: Money::from_cents(12_500),
                    currency: "USD".to_string(),
                })
            });

        let adapter = BankAdapter::new(Arc::new(partner));
        let account = adapter.partner().get_account("acct-1").await.unwrap();

        assert_eq!(account.available_balance, Money::from_cents(12_500));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn concurrent_registrations_create_one_partner_customer(pool: sqlx::PgPool) {
        let owner = crate::services::fixtures::business(&pool, KycStatus::Approved).await;

        let mut partner = MockBankPartner::new();
        partner
            .expect_create_business()
            .times(1)
            .returning(|_| Ok("cust-1".to_string()));
        let adapter = BankAdapter::new(Arc::new(partner));

        let (first, second) = tokio::join!(
            adapter.ensure_customer(&pool, Customer::Business(&owner)),
            adapter.ensure_customer(&pool, Customer::Business(&owner)),
        );

        assert_eq!(first.unwrap(), "cust-1");
        assert_eq!(second.unwrap(), "cust-1");
    }
}
