//! Bank accounts and debit cards held at the partner bank.
//!
//! Every operation that creates or changes a partner-side object calls the
//! partner first and only then writes the platform row and its shadow row
//! in one database transaction. A partner failure therefore leaves no
//! platform state behind.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        bank_account::{BankAccount, BalanceResponse, DebitCard, OpenAccountRequest},
        business::last_four,
        status::{AccountStatus, CardStatus, KycStatus},
    },
    partner::bank::{BankAdapter, Customer, shadow},
    services::{business_service, consumer_service, sql::Page},
    shared::{BankAccountId, CardId, OwnerId},
};

/// Accounts are only opened for owners whose KYC was approved.
fn require_approved(kyc_status: KycStatus) -> Result<(), AppError> {
    if kyc_status != KycStatus::Approved {
        return Err(AppError::Conflict(format!(
            "accounts require approved KYC, owner is {kyc_status}"
        )));
    }
    Ok(())
}

/// Whether moving a card from `current` to `next` needs a partner call.
///
/// Canceled cards are final; asking for the status a card already has is
/// a no-op.
fn card_change_required(current: CardStatus, next: CardStatus) -> Result<bool, AppError> {
    if current == CardStatus::Canceled {
        return Err(AppError::Conflict("card has been canceled".to_string()));
    }
    Ok(current != next)
}

/// Open a checking account for an approved business or consumer.
pub async fn open_account(
    pool: &DbPool,
    bank: &BankAdapter,
    request: OpenAccountRequest,
) -> Result<BankAccount, AppError> {
    let owner = request.owner_id;

    let business;
    let consumer;
    let (customer, kyc_status) = match owner {
        OwnerId::Business(id) => {
            business = business_service::get_business(pool, id).await?;
            (Customer::Business(&business), business.kyc_status)
        }
        OwnerId::Consumer(id) => {
            consumer = consumer_service::get_consumer(pool, id).await?;
            (Customer::Consumer(&consumer), consumer.kyc_status)
        }
    };

    require_approved(kyc_status)?;

    let customer_id = bank.ensure_customer(pool, customer).await?;
    let partner_account = bank.partner().open_account(&customer_id).await?;

    let id = BankAccountId::new();
    let mut tx = pool.begin().await?;

    let account = sqlx::query_as::<_, BankAccount>(
        r#"
        INSERT INTO bank_accounts (
            id, business_id, consumer_id, nickname,
            account_number_last_four, routing_number, available_balance, currency
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(owner.business_id())
    .bind(owner.consumer_id())
    .bind(request.nickname)
    .bind(last_four(&partner_account.account_number))
    .bind(&partner_account.routing_number)
    .bind(partner_account.available_balance)
    .bind(&partner_account.currency)
    .fetch_one(&mut *tx)
    .await?;

    shadow::insert_account(
        &mut *tx,
        id,
        &shadow::ShadowAccount {
            partner_account_id: partner_account.id.clone(),
            account_number: partner_account.account_number,
            routing_number: partner_account.routing_number,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        account_id = %account.id,
        owner = %owner,
        partner_account_id = %partner_account.id,
        "Bank account opened"
    );
    Ok(account)
}

pub async fn get_account(pool: &DbPool, id: BankAccountId) -> Result<BankAccount, AppError> {
    sqlx::query_as::<_, BankAccount>("SELECT * FROM bank_accounts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Bank account"))
}

pub async fn list_accounts(
    pool: &DbPool,
    owner: &OwnerId,
    page: Page,
) -> Result<Vec<BankAccount>, AppError> {
    let accounts = sqlx::query_as::<_, BankAccount>(
        r#"
        SELECT * FROM bank_accounts
        WHERE business_id = $1 OR consumer_id = $1
        ORDER BY created DESC, id
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(owner.as_uuid())
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok(accounts)
}

async fn partner_account_id(pool: &DbPool, id: BankAccountId) -> Result<String, AppError> {
    shadow::find_account(pool, id)
        .await?
        .map(|shadow| shadow.partner_account_id)
        .ok_or(AppError::NotFound("Bank account"))
}

/// Live balance from the partner. The cached balance on the account row is
/// refreshed as a side effect.
pub async fn get_balance(
    pool: &DbPool,
    bank: &BankAdapter,
    id: BankAccountId,
) -> Result<BalanceResponse, AppError> {
    let partner_id = partner_account_id(pool, id).await?;
    let partner_account = bank.partner().get_account(&partner_id).await?;

    sqlx::query(
        "UPDATE bank_accounts SET available_balance = $1, modified = NOW() WHERE id = $2",
    )
    .bind(partner_account.available_balance)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(BalanceResponse {
        account_id: id,
        available_balance: partner_account.available_balance,
        currency: partner_account.currency,
    })
}

pub async fn close_account(pool: &DbPool, id: BankAccountId) -> Result<BankAccount, AppError> {
    let closed = sqlx::query_as::<_, BankAccount>(
        r#"
        UPDATE bank_accounts
        SET status = $1, modified = NOW()
        WHERE id = $2 AND status <> $1
        RETURNING *
        "#,
    )
    .bind(AccountStatus::Closed.as_str())
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match closed {
        Some(account) => {
            tracing::info!(account_id = %id, "Bank account closed");
            Ok(account)
        }
        None => {
            get_account(pool, id).await?;
            Err(AppError::Conflict("account is already closed".to_string()))
        }
    }
}

/// Issue a debit card on an active account.
///
/// The cardholder name defaults to the account owner's display name.
pub async fn issue_card(
    pool: &DbPool,
    bank: &BankAdapter,
    account_id: BankAccountId,
    cardholder_name: Option<String>,
) -> Result<DebitCard, AppError> {
    let account = get_account(pool, account_id).await?;
    if account.status != AccountStatus::Active {
        return Err(AppError::Conflict(
            "cards can only be issued on active accounts".to_string(),
        ));
    }

    let cardholder_name = match cardholder_name.filter(|name| !name.trim().is_empty()) {
        Some(name) => name,
        None => owner_display_name(pool, &account).await?,
    };

    let partner_id = partner_account_id(pool, account_id).await?;
    let partner_card = bank
        .partner()
        .issue_card(&partner_id, &cardholder_name)
        .await?;

    let id = CardId::new();
    let mut tx = pool.begin().await?;

    let card = sqlx::query_as::<_, DebitCard>(
        r#"
        INSERT INTO debit_cards (id, bank_account_id, cardholder_name, last_four, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(account_id)
    .bind(cardholder_name)
    .bind(&partner_card.last_four)
    .bind(partner_card.status.as_str())
    .fetch_one(&mut *tx)
    .await?;

    shadow::insert_card(&mut *tx, id, &partner_card.id).await?;
    tx.commit().await?;

    tracing::info!(card_id = %card.id, account_id = %account_id, "Debit card issued");
    Ok(card)
}

async fn owner_display_name(pool: &DbPool, account: &BankAccount) -> Result<String, AppError> {
    match account.owner() {
        Some(OwnerId::Business(id)) => {
            let business = business_service::get_business(pool, id).await?;
            Ok(Customer::Business(&business).display_name())
        }
        Some(OwnerId::Consumer(id)) => {
            let consumer = consumer_service::get_consumer(pool, id).await?;
            Ok(Customer::Consumer(&consumer).display_name())
        }
        None => Err(AppError::invalid("cardholderName is required")),
    }
}

pub async fn get_card(pool: &DbPool, id: CardId) -> Result<DebitCard, AppError> {
    sqlx::query_as::<_, DebitCard>("SELECT * FROM debit_cards WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Card"))
}

pub async fn list_cards(
    pool: &DbPool,
    account_id: BankAccountId,
) -> Result<Vec<DebitCard>, AppError> {
    get_account(pool, account_id).await?;

    let cards = sqlx::query_as::<_, DebitCard>(
        "SELECT * FROM debit_cards WHERE bank_account_id = $1 ORDER BY created DESC, id",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await?;

    Ok(cards)
}

/// Block, unblock or cancel a card. Canceled cards are final.
pub async fn set_card_status(
    pool: &DbPool,
    bank: &BankAdapter,
    id: CardId,
    status: CardStatus,
) -> Result<DebitCard, AppError> {
    let card = get_card(pool, id).await?;

    if !card_change_required(card.status, status)? {
        return Ok(card);
    }

    let partner_id = shadow::find_card(pool, id)
        .await?
        .ok_or(AppError::NotFound("Card"))?;
    let partner_card = bank.partner().set_card_status(&partner_id, status).await?;

    let updated = sqlx::query_as::<_, DebitCard>(
        "UPDATE debit_cards SET status = $1, modified = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(partner_card.status.as_str())
    .bind(id)
    .fetch_one(pool)
    .await?;

    tracing::info!(card_id = %id, from = %card.status, to = %updated.status, "Card status changed");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        partner::bank::MockBankPartner,
        services::fixtures,
        shared::Money,
    };
    use rstest::rstest;
    use sqlx::PgPool;
    use std::sync::Arc;

    #[rstest]
    #[case(KycStatus::NotStarted)]
    #[case(KycStatus::Submitted)]
    #[case(KycStatus::Review)]
    #[case(KycStatus::Declined)]
    fn accounts_need_approved_kyc(#[case] status: KycStatus) {
        assert!(require_approved(KycStatus::Approved).is_ok());
        assert!(matches!(require_approved(status), Err(AppError::Conflict(_))));
    }

    #[rstest]
    #[case(CardStatus::Active, CardStatus::Blocked, true)]
    #[case(CardStatus::Blocked, CardStatus::Active, true)]
    #[case(CardStatus::Active, CardStatus::Canceled, true)]
    #[case(CardStatus::Blocked, CardStatus::Blocked, false)]
    fn card_changes_skip_the_current_status(
        #[case] current: CardStatus,
        #[case] next: CardStatus,
        #[case] required: bool,
    ) {
        assert_eq!(card_change_required(current, next).unwrap(), required);
    }

    #[rstest]
    #[case(CardStatus::Active)]
    #[case(CardStatus::Canceled)]
    fn canceled_cards_are_final(#[case] next: CardStatus) {
        assert!(matches!(
            card_change_required(CardStatus::Canceled, next),
            Err(AppError::Conflict(_))
        ));
    }

    /// A partner that fails the test on any call.
    fn silent_bank() -> BankAdapter {
        BankAdapter::new(Arc::new(MockBankPartner::new()))
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn unapproved_owner_cannot_open_an_account(pool: PgPool) {
        let business = fixtures::business(&pool, KycStatus::NotStarted).await;
        let request = OpenAccountRequest {
            owner_id: OwnerId::Business(business.id),
            nickname: None,
        };

        let result = open_account(&pool, &silent_bank(), request).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        let accounts = list_accounts(&pool, &OwnerId::Business(business.id), Page::default())
            .await
            .unwrap();
        assert!(accounts.is_empty());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn canceled_card_rejects_status_changes(pool: PgPool) {
        let business = fixtures::business(&pool, KycStatus::Approved).await;
        let account = fixtures::account(&pool, business.id, Money::from_cents(0)).await;
        let card = fixtures::card(&pool, account, CardStatus::Canceled).await;

        let result = set_card_status(&pool, &silent_bank(), card, CardStatus::Active).await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(get_card(&pool, card).await.unwrap().status, CardStatus::Canceled);
    }
}
