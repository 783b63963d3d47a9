//! Bank account HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /api/v1/accounts - Open an account at the partner bank
//! - GET /api/v1/accounts?ownerId= - List an owner's accounts
//! - GET /api/v1/accounts/{accountId} - Get account by ID
//! - GET /api/v1/accounts/{accountId}/balance - Live partner balance
//! - POST /api/v1/accounts/{accountId}/close - Close an account

use axum::{Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    models::bank_account::{BalanceResponse, BankAccountResponse, OpenAccountRequest, OwnerQuery},
    services::{account_service, sql::Page},
    shared::BankAccountId,
    state::AppState,
};

/// Open a new account.
///
/// # Endpoint
///
/// `POST /api/v1/accounts`
///
/// # Request Body
///
/// ```json
/// {
///   "ownerId": "bus-550e8400-e29b-41d4-a716-446655440000",
///   "nickname": "Operating"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the account with masked account number
/// - **Error (404)**: owner doesn't exist
/// - **Error (409)**: owner KYC is not approved
/// - **Error (500)**: partner bank or database failure
///
/// # Partner Operation
///
/// The owner is registered with the partner on its first account; later
/// accounts reuse that registration.
pub async fn open_account(
    State(state): State<AppState>,
    AppJson(request): AppJson<OpenAccountRequest>,
) -> Result<(StatusCode, Json<BankAccountResponse>), AppError> {
    let account = account_service::open_account(&state.pool, &state.bank, request).await?;
    Ok((StatusCode::CREATED, Json(account.into())))
}

pub async fn list_accounts(
    State(pool): State<DbPool>,
    AppQuery(owner): AppQuery<OwnerQuery>,
    AppQuery(page): AppQuery<Page>,
) -> Result<Json<Vec<BankAccountResponse>>, AppError> {
    let accounts = account_service::list_accounts(&pool, &owner.owner_id, page).await?;
    Ok(Json(accounts.into_iter().map(Into::into).collect()))
}

pub async fn get_account(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<BankAccountId>,
) -> Result<Json<BankAccountResponse>, AppError> {
    let account = account_service::get_account(&pool, id).await?;
    Ok(Json(account.into()))
}

/// Balance as reported by the partner bank right now.
pub async fn get_balance(
    State(state): State<AppState>,
    AppPath(id): AppPath<BankAccountId>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = account_service::get_balance(&state.pool, &state.bank, id).await?;
    Ok(Json(balance))
}

pub async fn close_account(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<BankAccountId>,
) -> Result<Json<BankAccountResponse>, AppError> {
    let account = account_service::close_account(&pool, id).await?;
    Ok(Json(account.into()))
}
