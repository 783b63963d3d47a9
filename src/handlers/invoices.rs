//! Invoice HTTP handlers.
//!
//! This module implements the invoice-related API endpoints:
//! - POST /api/v1/businesses/{businessId}/invoices - Issue an invoice
//! - GET /api/v1/businesses/{businessId}/invoices - List a business's invoices
//! - GET /api/v1/invoices/{invoiceId} - Get invoice by ID
//! - POST /api/v1/invoices/{invoiceId}/open - Issue a draft invoice
//! - POST /api/v1/invoices/{invoiceId}/void - Void an unpaid invoice
//! - POST /api/v1/invoices/{invoiceId}/pay - Pay from a bank account

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    models::invoice::{CreateInvoiceRequest, Invoice, PayInvoiceRequest, Payment},
    services::{invoice_service, sql::Page},
    shared::{BusinessId, InvoiceId},
};

pub async fn create_invoice(
    State(pool): State<DbPool>,
    AppPath(business_id): AppPath<BusinessId>,
    AppJson(request): AppJson<CreateInvoiceRequest>,
) -> Result<(StatusCode, Json<Invoice>), AppError> {
    let invoice = invoice_service::create_invoice(&pool, business_id, request).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

pub async fn list_invoices(
    State(pool): State<DbPool>,
    AppPath(business_id): AppPath<BusinessId>,
    AppQuery(page): AppQuery<Page>,
) -> Result<Json<Vec<Invoice>>, AppError> {
    Ok(Json(
        invoice_service::list_invoices(&pool, business_id, page).await?,
    ))
}

pub async fn get_invoice(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<InvoiceId>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(invoice_service::get_invoice(&pool, id).await?))
}

/// Draft to open; 409 for any other status.
pub async fn open_invoice(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<InvoiceId>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(invoice_service::open_invoice(&pool, id).await?))
}

pub async fn void_invoice(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<InvoiceId>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(invoice_service::void_invoice(&pool, id).await?))
}

/// Pay an invoice.
///
/// # Endpoint
///
/// `POST /api/v1/invoices/{invoiceId}/pay`
///
/// # Request Body
///
/// ```json
/// {
///   "bankAccountId": "bac-7c9e6679-7425-40de-944b-e07fc1f90ae7",
///   "idempotencyKey": "pay-inv-0042"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the payment; a repeated idempotency key
///   returns the original payment
/// - **Error (404)**: invoice or account doesn't exist
/// - **Error (409)**: invoice already paid, void or draft
/// - **Error (422)**: insufficient balance
pub async fn pay_invoice(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<InvoiceId>,
    AppJson(request): AppJson<PayInvoiceRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    let payment = invoice_service::pay_invoice(&pool, id, request).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}
