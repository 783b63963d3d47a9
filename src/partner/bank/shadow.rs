//! Persistence of partner identifiers in the `bank_shadow` schema.
//!
//! Every partner-side object the platform creates gets a shadow row keyed
//! by the platform id. Functions take any executor so callers can write
//! shadow rows inside the transaction that creates the platform row.

use sqlx::PgExecutor;

use crate::shared::{BankAccountId, CardId, OwnerId};

/// Partner identifiers of one bank account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShadowAccount {
    pub partner_account_id: String,
    pub account_number: String,
    pub routing_number: String,
}

pub async fn find_customer(
    executor: impl PgExecutor<'_>,
    owner: &OwnerId,
) -> Result<Option<String>, sqlx::Error> {
    let sql = match owner {
        OwnerId::Business(_) => {
            "SELECT partner_customer_id FROM bank_shadow.business WHERE business_id = $1"
        }
        OwnerId::Consumer(_) => {
            "SELECT partner_customer_id FROM bank_shadow.consumer WHERE consumer_id = $1"
        }
    };

    sqlx::query_scalar::<_, String>(sql)
        .bind(owner.as_uuid())
        .fetch_optional(executor)
        .await
}

pub async fn insert_customer(
    executor: impl PgExecutor<'_>,
    owner: &OwnerId,
    partner_customer_id: &str,
) -> Result<(), sqlx::Error> {
    let sql = match owner {
        OwnerId::Business(_) => {
            "INSERT INTO bank_shadow.business (business_id, partner_customer_id) VALUES ($1, $2)"
        }
        OwnerId::Consumer(_) => {
            "INSERT INTO bank_shadow.consumer (consumer_id, partner_customer_id) VALUES ($1, $2)"
        }
    };

    sqlx::query(sql)
        .bind(owner.as_uuid())
        .bind(partner_customer_id)
        .execute(executor)
        .await?;

    Ok(())
}

pub async fn find_account(
    executor: impl PgExecutor<'_>,
    id: BankAccountId,
) -> Result<Option<ShadowAccount>, sqlx::Error> {
    sqlx::query_as::<_, ShadowAccount>(
        "SELECT partner_account_id, account_number, routing_number
         FROM bank_shadow.account WHERE bank_account_id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_account(
    executor: impl PgExecutor<'_>,
    id: BankAccountId,
    account: &ShadowAccount,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO bank_shadow.account
             (bank_account_id, partner_account_id, account_number, routing_number)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(id)
    .bind(&account.partner_account_id)
    .bind(&account.account_number)
    .bind(&account.routing_number)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn find_card(
    executor: impl PgExecutor<'_>,
    id: CardId,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT partner_card_id FROM bank_shadow.card WHERE card_id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_card(
    executor: impl PgExecutor<'_>,
    id: CardId,
    partner_card_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO bank_shadow.card (card_id, partner_card_id) VALUES ($1, $2)")
        .bind(id)
        .bind(partner_card_id)
        .execute(executor)
        .await?;

    Ok(())
}
