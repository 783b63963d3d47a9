//! REST client for the BBVA partner banking API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use super::{BankPartner, PartnerAccount, PartnerBusiness, PartnerCard, PartnerConsumer, PartnerError};
use crate::{models::status::CardStatus, shared::{Money, oauth::TokenSource}};

#[derive(Debug, Serialize)]
struct ConsumerPayload<'a> {
    first_name: &'a str,
    last_name: &'a str,
    date_of_birth: String,
    ssn: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct BusinessPayload<'a> {
    legal_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    doing_business_as: Option<&'a str>,
    entity_type: &'a str,
    ein: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CustomerCreated {
    id: String,
}

#[derive(Debug, Serialize)]
struct OpenAccountPayload<'a> {
    customer_id: &'a str,
    product: &'static str,
}

#[derive(Debug, Deserialize)]
struct AccountPayload {
    id: String,
    account_number: String,
    routing_number: String,
    #[serde(with = "rust_decimal::serde::str")]
    available_balance: Decimal,
    currency: String,
}

impl From<AccountPayload> for PartnerAccount {
    fn from(payload: AccountPayload) -> Self {
        Self {
            id: payload.id,
            account_number: payload.account_number,
            routing_number: payload.routing_number,
            available_balance: Money::new(payload.available_balance),
            currency: payload.currency,
        }
    }
}

#[derive(Debug, Serialize)]
struct IssueCardPayload<'a> {
    account_id: &'a str,
    cardholder_name: &'a str,
    card_type: &'static str,
}

#[derive(Debug, Serialize)]
struct CardStatusPayload {
    status: &'static str,
}

#[derive(Debug, Deserialize)]
struct CardPayload {
    id: String,
    last_four: String,
    status: String,
}

impl TryFrom<CardPayload> for PartnerCard {
    type Error = PartnerError;

    fn try_from(payload: CardPayload) -> Result<Self, Self::Error> {
        Ok(Self {
            status: card_status_from_partner(&payload.status)?,
            id: payload.id,
            last_four: payload.last_four,
        })
    }
}

/// Partner spelling of a card status.
fn card_status_to_partner(status: CardStatus) -> &'static str {
    match status {
        CardStatus::Active => "ACTIVE",
        CardStatus::Blocked => "LOCKED",
        CardStatus::Canceled => "CANCELED",
    }
}

fn card_status_from_partner(value: &str) -> Result<CardStatus, PartnerError> {
    match value {
        "ACTIVE" => Ok(CardStatus::Active),
        "LOCKED" => Ok(CardStatus::Blocked),
        "CANCELED" | "CLOSED" => Ok(CardStatus::Canceled),
        other => Err(PartnerError::Unexpected(format!("card status `{other}`"))),
    }
}

/// BBVA API client authenticated with a shared client-credentials token.
pub struct BbvaClient {
    http: reqwest::Client,
    base_url: Url,
    tokens: Arc<TokenSource>,
}

impl BbvaClient {
    /// `base_url` is the versioned API root, e.g. `https://sandbox.bbva.test/v1`.
    pub fn new(http: reqwest::Client, mut base_url: Url, tokens: Arc<TokenSource>) -> Self {
        // Url::join drops the last segment unless the path ends in a slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            http,
            base_url,
            tokens,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, PartnerError> {
        Ok(self.base_url.join(path)?)
    }

    /// Send one JSON request, refreshing the token once if the partner
    /// answers 401.
    async fn call<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, PartnerError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;

        for attempt in 0..2 {
            let token = self.tokens.token().await?;

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .bearer_auth(&token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                tracing::warn!(%method, path, "Partner rejected access token, refreshing");
                self.tokens.invalidate().await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::warn!(%method, path, status = status.as_u16(), "Partner request failed");
                return Err(PartnerError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            tracing::debug!(%method, path, status = status.as_u16(), "Partner request succeeded");
            return Ok(response.json::<T>().await?);
        }

        Err(PartnerError::Unauthorized)
    }
}

#[async_trait]
impl BankPartner for BbvaClient {
    async fn create_consumer(&self, consumer: &PartnerConsumer) -> Result<String, PartnerError> {
        let payload = ConsumerPayload {
            first_name: &consumer.first_name,
            last_name: &consumer.last_name,
            date_of_birth: consumer.date_of_birth.to_string(),
            ssn: &consumer.ssn,
            email: consumer.email.as_deref(),
            phone: consumer.phone.as_deref(),
        };

        let created: CustomerCreated = self.call(Method::POST, "consumers", Some(&payload)).await?;
        Ok(created.id)
    }

    async fn create_business(&self, business: &PartnerBusiness) -> Result<String, PartnerError> {
        let payload = BusinessPayload {
            legal_name: &business.legal_name,
            doing_business_as: business.doing_business_as.as_deref(),
            entity_type: &business.entity_type,
            ein: &business.ein,
            email: business.email.as_deref(),
        };

        let created: CustomerCreated = self.call(Method::POST, "businesses", Some(&payload)).await?;
        Ok(created.id)
    }

    async fn open_account(&self, customer_id: &str) -> Result<PartnerAccount, PartnerError> {
        let payload = OpenAccountPayload {
            customer_id,
            product: "checking",
        };

        let account: AccountPayload = self.call(Method::POST, "accounts", Some(&payload)).await?;
        Ok(account.into())
    }

    async fn get_account(&self, account_id: &str) -> Result<PartnerAccount, PartnerError> {
        let account: AccountPayload = self
            .call::<(), _>(Method::GET, &format!("accounts/{account_id}"), None)
            .await?;
        Ok(account.into())
    }

    async fn issue_card(
        &self,
        account_id: &str,
        cardholder_name: &str,
    ) -> Result<PartnerCard, PartnerError> {
        let payload = IssueCardPayload {
            account_id,
            cardholder_name,
            card_type: "debit",
        };

        let card: CardPayload = self.call(Method::POST, "cards", Some(&payload)).await?;
        card.try_into()
    }

    async fn set_card_status(
        &self,
        card_id: &str,
        status: CardStatus,
    ) -> Result<PartnerCard, PartnerError> {
        let payload = CardStatusPayload {
            status: card_status_to_partner(status),
        };

        let card: CardPayload = self
            .call(Method::PUT, &format!("cards/{card_id}/status"), Some(&payload))
            .await?;
        card.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn client(base: &str) -> BbvaClient {
        let http = reqwest::Client::new();
        let tokens = Arc::new(TokenSource::new(
            http.clone(),
            Url::parse("https://auth.bbva.test/token").unwrap(),
            "client".to_string(),
            "secret".to_string(),
        ));
        BbvaClient::new(http, Url::parse(base).unwrap(), tokens)
    }

    #[rstest]
    #[case("https://api.bbva.test/v1")]
    #[case("https://api.bbva.test/v1/")]
    fn endpoints_stay_under_the_versioned_root(#[case] base: &str) {
        let url = client(base).endpoint("accounts/acct-1").unwrap();
        assert_eq!(url.as_str(), "https://api.bbva.test/v1/accounts/acct-1");
    }

    #[rstest]
    #[case(CardStatus::Active)]
    #[case(CardStatus::Blocked)]
    #[case(CardStatus::Canceled)]
    fn card_statuses_map_both_ways(#[case] status: CardStatus) {
        let wire = card_status_to_partner(status);
        assert_eq!(card_status_from_partner(wire).unwrap(), status);
    }

    #[test]
    fn unknown_card_status_is_unexpected() {
        assert!(matches!(
            card_status_from_partner("SHREDDED"),
            Err(PartnerError::Unexpected(_))
        ));
    }

    #[test]
    fn account_payload_balance_is_rounded_money() {
        let payload: AccountPayload = serde_json::from_value(serde_json::json!({
            "id": "acct-9",
            "account_number": "000111222333",
            "routing_number": "062001186",
            "available_balance": "1250.505",
            "currency": "USD"
        }))
        .unwrap();

        let account = PartnerAccount::from(payload);
        assert_eq!(account.available_balance.to_string(), "1250.50");
    }

    #[test]
    fn consumer_payload_omits_missing_contact_fields() {
        let payload = ConsumerPayload {
            first_name: "Ada",
            last_name: "Lovelace",
            date_of_birth: "1990-12-10".to_string(),
            ssn: "987654321",
            email: None,
            phone: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["date_of_birth"], "1990-12-10");
        assert!(json.get("email").is_none());
    }
}
