//! Debit card HTTP handlers.

use axum::{Json, body::Bytes, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::extract::{AppJson, AppPath},
    models::bank_account::{CardStatusRequest, DebitCard, IssueCardRequest},
    services::account_service,
    shared::{BankAccountId, CardId},
    state::AppState,
};

/// `POST /api/v1/accounts/{accountId}/cards`. An empty body issues the card
/// in the account owner's name.
pub async fn issue_card(
    State(state): State<AppState>,
    AppPath(account_id): AppPath<BankAccountId>,
    body: Bytes,
) -> Result<(StatusCode, Json<DebitCard>), AppError> {
    let request: IssueCardRequest = if body.is_empty() {
        IssueCardRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| AppError::invalid(err.to_string()))?
    };

    let card = account_service::issue_card(
        &state.pool,
        &state.bank,
        account_id,
        request.cardholder_name,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn list_cards(
    State(pool): State<DbPool>,
    AppPath(account_id): AppPath<BankAccountId>,
) -> Result<Json<Vec<DebitCard>>, AppError> {
    Ok(Json(account_service::list_cards(&pool, account_id).await?))
}

pub async fn get_card(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<CardId>,
) -> Result<Json<DebitCard>, AppError> {
    Ok(Json(account_service::get_card(&pool, id).await?))
}

/// Block, unblock or cancel a card through the partner bank.
pub async fn set_card_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<CardId>,
    AppJson(request): AppJson<CardStatusRequest>,
) -> Result<Json<DebitCard>, AppError> {
    let card = account_service::set_card_status(&state.pool, &state.bank, id, request.status).await?;
    Ok(Json(card))
}
