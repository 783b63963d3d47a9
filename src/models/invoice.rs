//! Invoice and payment models.
//!
//! A business issues invoices; paying an invoice debits one of the payer's
//! bank accounts and records a payment row in the same database
//! transaction that marks the invoice paid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::status::InvoiceStatus,
    shared::{BankAccountId, BusinessId, Date, InvoiceId, Money, PaymentId},
};

/// Represents a row of the `invoices` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: InvoiceId,
    pub business_id: BusinessId,

    /// Business-chosen number, unique per business
    pub invoice_number: String,

    pub payer_email: String,
    pub amount: Money,
    pub currency: String,
    pub description: Option<String>,
    pub due_date: Date,

    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,

    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Request body for creating an invoice.
///
/// ```json
/// {
///   "invoiceNumber": "INV-0042",
///   "payerEmail": "ap@customer.test",
///   "amount": "250.00",
///   "dueDate": "2025-07-01",
///   "draft": false
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    pub invoice_number: String,
    pub payer_email: String,
    pub amount: Money,

    #[serde(default = "default_currency")]
    pub currency: String,

    pub description: Option<String>,
    pub due_date: Date,

    /// Drafts cannot be paid until opened with `POST /invoices/{id}/open`
    #[serde(default)]
    pub draft: bool,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl CreateInvoiceRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        if self.invoice_number.trim().is_empty() {
            return Err(AppError::invalid("invoiceNumber is required"));
        }
        if !self.payer_email.contains('@') {
            return Err(AppError::invalid("payerEmail must be an email address"));
        }
        if !self.amount.is_positive() {
            return Err(AppError::invalid("amount must be positive"));
        }
        if self.currency.len() != 3 {
            return Err(AppError::invalid("currency must be an ISO 4217 code"));
        }
        Ok(self)
    }

    pub fn initial_status(&self) -> InvoiceStatus {
        if self.draft {
            InvoiceStatus::Draft
        } else {
            InvoiceStatus::Open
        }
    }
}

/// Represents a row of the `payments` table.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub invoice_id: InvoiceId,
    pub bank_account_id: BankAccountId,
    pub amount: Money,

    #[serde(skip_serializing)]
    pub idempotency_key: Option<String>,

    pub status: String,
    pub created: DateTime<Utc>,
}

/// Request to pay an invoice from a bank account.
///
/// Sending the same `idempotencyKey` twice returns the original payment
/// instead of charging again.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayInvoiceRequest {
    pub bank_account_id: BankAccountId,
    pub idempotency_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(amount: &str, email: &str) -> CreateInvoiceRequest {
        serde_json::from_value(serde_json::json!({
            "invoiceNumber": "INV-1",
            "payerEmail": email,
            "amount": amount,
            "dueDate": "2025-07-01"
        }))
        .unwrap()
    }

    #[rstest]
    #[case("100.00", "ap@customer.test", true)]
    #[case("0", "ap@customer.test", false)]
    #[case("-5", "ap@customer.test", false)]
    #[case("10", "not-an-email", false)]
    fn validation(#[case] amount: &str, #[case] email: &str, #[case] valid: bool) {
        assert_eq!(request(amount, email).validate().is_ok(), valid);
    }

    #[rstest]
    fn defaults_to_open_usd() {
        let invoice = request("1", "a@b.c");
        assert_eq!(invoice.currency, "USD");
        assert_eq!(invoice.initial_status(), InvoiceStatus::Open);
    }
}
