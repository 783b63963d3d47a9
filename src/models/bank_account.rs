//! Bank account and debit card models.
//!
//! Accounts are held at the partner bank; the platform keeps a row per
//! account with the owner, the masked account number and the last known
//! available balance. The full account number lives only in the bank
//! shadow schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    models::status::{AccountStatus, CardStatus},
    shared::{BankAccountId, BusinessId, CardId, ConsumerId, Money, OwnerId},
};

/// Represents a row of the `bank_accounts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BankAccount {
    pub id: BankAccountId,

    /// Exactly one of `business_id` / `consumer_id` is set
    pub business_id: Option<BusinessId>,
    pub consumer_id: Option<ConsumerId>,

    pub nickname: Option<String>,
    pub account_number_last_four: String,
    pub routing_number: String,
    pub available_balance: Money,
    pub currency: String,

    #[sqlx(try_from = "String")]
    pub status: AccountStatus,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl BankAccount {
    pub fn owner(&self) -> Option<OwnerId> {
        OwnerId::from_columns(self.business_id, self.consumer_id)
    }
}

/// Request body for opening an account.
///
/// ```json
/// { "ownerId": "bus-550e8400-e29b-41d4-a716-446655440000", "nickname": "Operating" }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountRequest {
    pub owner_id: OwnerId,
    pub nickname: Option<String>,
}

/// `?ownerId=` filter of the account list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub owner_id: OwnerId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountResponse {
    pub id: BankAccountId,
    pub owner_id: Option<OwnerId>,
    pub nickname: Option<String>,
    pub account_number_last_four: String,
    pub routing_number: String,
    pub available_balance: Money,
    pub currency: String,
    pub status: AccountStatus,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<BankAccount> for BankAccountResponse {
    fn from(account: BankAccount) -> Self {
        Self {
            id: account.id,
            owner_id: account.owner(),
            nickname: account.nickname,
            account_number_last_four: account.account_number_last_four,
            routing_number: account.routing_number,
            available_balance: account.available_balance,
            currency: account.currency,
            status: account.status,
            created: account.created,
            modified: account.modified,
        }
    }
}

/// Live balance fetched from the partner bank.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub account_id: BankAccountId,
    pub available_balance: Money,
    pub currency: String,
}

/// Represents a row of the `debit_cards` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebitCard {
    pub id: CardId,
    pub bank_account_id: BankAccountId,
    pub cardholder_name: String,
    pub last_four: String,

    #[sqlx(try_from = "String")]
    pub status: CardStatus,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Request body for issuing a card. The cardholder name defaults to the
/// account owner's name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCardRequest {
    pub cardholder_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CardStatusRequest {
    pub status: CardStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_request_rejects_ambiguous_owner() {
        let result = serde_json::from_value::<OpenAccountRequest>(serde_json::json!({
            "ownerId": "550e8400-e29b-41d4-a716-446655440000"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn card_serializes_camel_case() {
        let card = DebitCard {
            id: CardId::new(),
            bank_account_id: BankAccountId::new(),
            cardholder_name: "Ada Lovelace".to_string(),
            last_four: "4242".to_string(),
            status: CardStatus::Active,
            created: Utc::now(),
            modified: Utc::now(),
        };

        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["lastFour"], "4242");
        assert_eq!(json["status"], "active");
        assert!(json["bankAccountId"].as_str().unwrap().starts_with("bac-"));
    }
}
