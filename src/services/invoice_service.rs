//! Invoices issued by businesses and their payment from a bank account.
//!
//! # Atomicity Guarantees
//!
//! Paying an invoice locks the invoice and the paying account, debits the
//! account, marks the invoice paid and records the payment inside one
//! PostgreSQL transaction. Either all of it happens or none of it does.

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        invoice::{CreateInvoiceRequest, Invoice, PayInvoiceRequest, Payment},
        status::{AccountStatus, InvoiceStatus},
    },
    services::{owner_service, sql::Page},
    shared::{BusinessId, InvoiceId, Money, OwnerId, PaymentId},
};

pub async fn create_invoice(
    pool: &DbPool,
    business_id: BusinessId,
    request: CreateInvoiceRequest,
) -> Result<Invoice, AppError> {
    let request = request.validate()?;
    owner_service::ensure_exists(pool, &OwnerId::Business(business_id)).await?;

    let status = request.initial_status();
    let result = sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO invoices
            (id, business_id, invoice_number, payer_email, amount, currency, description, due_date, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(InvoiceId::new())
    .bind(business_id)
    .bind(&request.invoice_number)
    .bind(request.payer_email)
    .bind(request.amount)
    .bind(request.currency.to_uppercase())
    .bind(request.description)
    .bind(request.due_date)
    .bind(status.as_str())
    .fetch_one(pool)
    .await;

    match result {
        Ok(invoice) => {
            tracing::info!(invoice_id = %invoice.id, business_id = %business_id, "Invoice created");
            Ok(invoice)
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(AppError::Conflict(
            format!("invoice number {} already exists", request.invoice_number),
        )),
        Err(err) => Err(err.into()),
    }
}

pub async fn get_invoice(pool: &DbPool, id: InvoiceId) -> Result<Invoice, AppError> {
    sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Invoice"))
}

pub async fn list_invoices(
    pool: &DbPool,
    business_id: BusinessId,
    page: Page,
) -> Result<Vec<Invoice>, AppError> {
    let invoices = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT * FROM invoices
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

    Ok(invoices)
}

/// Issue a draft invoice, making it payable.
pub async fn open_invoice(pool: &DbPool, id: InvoiceId) -> Result<Invoice, AppError> {
    let opened = sqlx::query_as::<_, Invoice>(
        "UPDATE invoices SET status = $1, modified = NOW() WHERE id = $2 AND status = $3 RETURNING *",
    )
    .bind(InvoiceStatus::Open.as_str())
    .bind(id)
    .bind(InvoiceStatus::Draft.as_str())
    .fetch_optional(pool)
    .await?;

    match opened {
        Some(invoice) => {
            tracing::info!(invoice_id = %id, "Invoice opened");
            Ok(invoice)
        }
        None => {
            let current = get_invoice(pool, id).await?;
            Err(AppError::Conflict(format!(
                "only draft invoices can be opened, invoice is {}",
                current.status
            )))
        }
    }
}

/// Void an unpaid invoice.
pub async fn void_invoice(pool: &DbPool, id: InvoiceId) -> Result<Invoice, AppError> {
    let mut tx = pool.begin().await?;

    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Invoice"))?;

    match invoice.status {
        InvoiceStatus::Paid => {
            return Err(AppError::Conflict("paid invoices cannot be voided".to_string()));
        }
        InvoiceStatus::Void => return Ok(invoice),
        InvoiceStatus::Draft | InvoiceStatus::Open => {}
    }

    let voided = sqlx::query_as::<_, Invoice>(
        "UPDATE invoices SET status = $1, modified = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(InvoiceStatus::Void.as_str())
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(invoice_id = %id, "Invoice voided");
    Ok(voided)
}

async fn find_payment_by_key(pool: &DbPool, key: &str) -> Result<Option<Payment>, AppError> {
    let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE idempotency_key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(payment)
}

/// The columns of the paying account that decide whether a payment goes through.
#[derive(Debug, sqlx::FromRow)]
struct PayingAccount {
    available_balance: Money,
    currency: String,
    #[sqlx(try_from = "String")]
    status: AccountStatus,
}

/// Only open invoices can be paid.
fn check_payable(status: InvoiceStatus) -> Result<(), AppError> {
    match status {
        InvoiceStatus::Open => Ok(()),
        InvoiceStatus::Paid => Err(AppError::Conflict("invoice is already paid".to_string())),
        InvoiceStatus::Void => Err(AppError::Conflict("invoice is void".to_string())),
        InvoiceStatus::Draft => Err(AppError::Conflict(
            "draft invoices must be opened before they can be paid".to_string(),
        )),
    }
}

fn check_account(invoice: &Invoice, account: &PayingAccount) -> Result<(), AppError> {
    if account.status != AccountStatus::Active {
        return Err(AppError::Conflict("bank account is closed".to_string()));
    }
    if !account.currency.eq_ignore_ascii_case(&invoice.currency) {
        return Err(AppError::Conflict(format!(
            "account currency {} does not match invoice currency {}",
            account.currency, invoice.currency
        )));
    }
    if account.available_balance < invoice.amount {
        return Err(AppError::InsufficientBalance);
    }
    Ok(())
}

/// A previously recorded payment may only be replayed for the same invoice.
fn replay(payment: Payment, invoice_id: InvoiceId) -> Result<Payment, AppError> {
    if payment.invoice_id != invoice_id {
        return Err(AppError::Conflict(
            "idempotency key was used for another invoice".to_string(),
        ));
    }
    Ok(payment)
}

/// Pay an open invoice from a bank account.
///
/// # Process
///
/// 1. Return the earlier payment if the idempotency key was seen before
/// 2. Lock the invoice and require it to be open
/// 3. Lock the account and require enough available balance
/// 4. Debit the account, mark the invoice paid, record the payment
/// 5. Commit (or rollback on error)
///
/// # Errors
///
/// - `NotFound`: invoice or account doesn't exist
/// - `Conflict`: invoice already paid, void or still a draft; account closed;
///   currency mismatch
/// - `InsufficientBalance`: account balance below the invoice amount
pub async fn pay_invoice(
    pool: &DbPool,
    invoice_id: InvoiceId,
    request: PayInvoiceRequest,
) -> Result<Payment, AppError> {
    if let Some(ref key) = request.idempotency_key {
        if let Some(existing) = find_payment_by_key(pool, key).await? {
            return replay(existing, invoice_id);
        }
    }

    let mut tx = pool.begin().await?;

    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Invoice"))?;

    check_payable(invoice.status)?;

    // FOR UPDATE keeps concurrent payments from reading the same balance
    let account = sqlx::query_as::<_, PayingAccount>(
        "SELECT available_balance, currency, status FROM bank_accounts WHERE id = $1 FOR UPDATE",
    )
    .bind(request.bank_account_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Bank account"))?;

    check_account(&invoice, &account)?;

    sqlx::query(
        r#"
        UPDATE bank_accounts
        SET available_balance = available_balance - $1,
            modified = NOW()
        WHERE id = $2
        "#,
    )
    .bind(invoice.amount)
    .bind(request.bank_account_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE invoices SET status = $1, modified = NOW() WHERE id = $2")
        .bind(InvoiceStatus::Paid.as_str())
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

    let inserted = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO payments (id, invoice_id, bank_account_id, amount, idempotency_key, status)
        VALUES ($1, $2, $3, $4, $5, 'completed')
        RETURNING *
        "#,
    )
    .bind(PaymentId::new())
    .bind(invoice_id)
    .bind(request.bank_account_id)
    .bind(invoice.amount)
    .bind(&request.idempotency_key)
    .fetch_one(&mut *tx)
    .await;

    let payment = match inserted {
        Ok(payment) => payment,
        // A concurrent request with the same key committed first
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            tx.rollback().await?;
            let key = request.idempotency_key.as_deref().unwrap_or_default();
            let existing = find_payment_by_key(pool, key)
                .await?
                .ok_or(AppError::Conflict("payment is already in progress".to_string()))?;
            return replay(existing, invoice_id);
        }
        Err(err) => return Err(err.into()),
    };

    // Commit all changes atomically
    tx.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        invoice_id = %invoice_id,
        account_id = %request.bank_account_id,
        amount = %payment.amount,
        "Invoice paid"
    );
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::status::KycStatus,
        services::fixtures,
        shared::{BankAccountId, Date},
    };
    use chrono::Utc;
    use rstest::rstest;
    use sqlx::PgPool;

    fn invoice(amount: Money, currency: &str) -> Invoice {
        Invoice {
            id: InvoiceId::new(),
            business_id: BusinessId::new(),
            invoice_number: "INV-1".to_string(),
            payer_email: "ap@customer.test".to_string(),
            amount,
            currency: currency.to_string(),
            description: None,
            due_date: Date::from_ymd(2026, 12, 1).unwrap(),
            status: InvoiceStatus::Open,
            created: Utc::now(),
            modified: Utc::now(),
        }
    }

    fn paying_account(cents: i64, currency: &str, status: AccountStatus) -> PayingAccount {
        PayingAccount {
            available_balance: Money::from_cents(cents),
            currency: currency.to_string(),
            status,
        }
    }

    fn payment_for(invoice_id: InvoiceId) -> Payment {
        Payment {
            id: PaymentId::new(),
            invoice_id,
            bank_account_id: BankAccountId::new(),
            amount: Money::from_cents(1_000),
            idempotency_key: Some("key-1".to_string()),
            status: "completed".to_string(),
            created: Utc::now(),
        }
    }

    #[test]
    fn replay_returns_payment_for_same_invoice() {
        let invoice_id = InvoiceId::new();
        let payment = payment_for(invoice_id);
        let payment_id = payment.id;

        assert_eq!(replay(payment, invoice_id).unwrap().id, payment_id);
    }

    #[test]
    fn replay_rejects_key_reuse_across_invoices() {
        let payment = payment_for(InvoiceId::new());
        assert!(matches!(
            replay(payment, InvoiceId::new()),
            Err(AppError::Conflict(_))
        ));
    }

    #[rstest]
    #[case(InvoiceStatus::Paid)]
    #[case(InvoiceStatus::Void)]
    #[case(InvoiceStatus::Draft)]
    fn only_open_invoices_are_payable(#[case] status: InvoiceStatus) {
        assert!(check_payable(InvoiceStatus::Open).is_ok());
        assert!(matches!(check_payable(status), Err(AppError::Conflict(_))));
    }

    #[test]
    fn short_balance_is_insufficient() {
        let invoice = invoice(Money::from_cents(10_000), "USD");
        let account = paying_account(9_999, "USD", AccountStatus::Active);

        assert!(matches!(
            check_account(&invoice, &account),
            Err(AppError::InsufficientBalance)
        ));
    }

    #[test]
    fn exact_balance_covers_the_invoice() {
        let invoice = invoice(Money::from_cents(10_000), "USD");
        let account = paying_account(10_000, "usd", AccountStatus::Active);

        assert!(check_account(&invoice, &account).is_ok());
    }

    #[rstest]
    #[case(paying_account(50_000, "USD", AccountStatus::Closed))]
    #[case(paying_account(50_000, "EUR", AccountStatus::Active))]
    fn closed_or_foreign_accounts_conflict(#[case] account: PayingAccount) {
        let invoice = invoice(Money::from_cents(10_000), "USD");
        assert!(matches!(
            check_account(&invoice, &account),
            Err(AppError::Conflict(_))
        ));
    }

    fn pay_from(account: BankAccountId, key: &str) -> PayInvoiceRequest {
        PayInvoiceRequest {
            bank_account_id: account,
            idempotency_key: Some(key.to_string()),
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn paying_debits_the_account_once_per_key(pool: PgPool) {
        let business = fixtures::business(&pool, KycStatus::Approved).await;
        let account = fixtures::account(&pool, business.id, Money::from_cents(50_000)).await;
        let invoice = fixtures::invoice(&pool, business.id, Money::from_cents(12_550), InvoiceStatus::Open).await;

        let first = pay_invoice(&pool, invoice.id, pay_from(account, "pay-1")).await.unwrap();
        let replayed = pay_invoice(&pool, invoice.id, pay_from(account, "pay-1")).await.unwrap();

        assert_eq!(first.id, replayed.id);
        assert_eq!(first.amount, Money::from_cents(12_550));
        assert_eq!(fixtures::balance(&pool, account).await, Money::from_cents(37_450));
        assert_eq!(get_invoice(&pool, invoice.id).await.unwrap().status, InvoiceStatus::Paid);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn paid_invoice_cannot_be_paid_again(pool: PgPool) {
        let business = fixtures::business(&pool, KycStatus::Approved).await;
        let account = fixtures::account(&pool, business.id, Money::from_cents(50_000)).await;
        let invoice = fixtures::invoice(&pool, business.id, Money::from_cents(1_000), InvoiceStatus::Open).await;

        pay_invoice(&pool, invoice.id, pay_from(account, "pay-1")).await.unwrap();
        let second = pay_invoice(&pool, invoice.id, pay_from(account, "pay-2")).await;

        assert!(matches!(second, Err(AppError::Conflict(_))));
        assert_eq!(fixtures::balance(&pool, account).await, Money::from_cents(49_000));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn insufficient_balance_leaves_everything_untouched(pool: PgPool) {
        let business = fixtures::business(&pool, KycStatus::Approved).await;
        let account = fixtures::account(&pool, business.id, Money::from_cents(500)).await;
        let invoice = fixtures::invoice(&pool, business.id, Money::from_cents(1_000), InvoiceStatus::Open).await;

        let result = pay_invoice(&pool, invoice.id, pay_from(account, "pay-1")).await;

        assert!(matches!(result, Err(AppError::InsufficientBalance)));
        assert_eq!(fixtures::balance(&pool, account).await, Money::from_cents(500));
        assert_eq!(get_invoice(&pool, invoice.id).await.unwrap().status, InvoiceStatus::Open);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn drafts_are_paid_only_after_opening(pool: PgPool) {
        let business = fixtures::business(&pool, KycStatus::Approved).await;
        let account = fixtures::account(&pool, business.id, Money::from_cents(5_000)).await;
        let draft = fixtures::invoice(&pool, business.id, Money::from_cents(1_000), InvoiceStatus::Draft).await;

        let early = pay_invoice(&pool, draft.id, pay_from(account, "pay-1")).await;
        assert!(matches!(early, Err(AppError::Conflict(_))));

        let opened = open_invoice(&pool, draft.id).await.unwrap();
        assert_eq!(opened.status, InvoiceStatus::Open);
        assert!(matches!(open_invoice(&pool, draft.id).await, Err(AppError::Conflict(_))));

        pay_invoice(&pool, draft.id, pay_from(account, "pay-2")).await.unwrap();
        assert_eq!(fixtures::balance(&pool, account).await, Money::from_cents(4_000));
    }
}
