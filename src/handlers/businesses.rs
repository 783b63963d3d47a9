//! Business customer HTTP handlers.
//!
//! This module implements the business-related API endpoints:
//! - POST /api/v1/businesses - Create a business
//! - GET /api/v1/businesses - List businesses, newest first
//! - GET|PATCH|DELETE /api/v1/businesses/{businessId}
//! - POST /api/v1/businesses/{businessId}/kyc - Submit KYC
//! - POST /api/v1/csp/businesses/{businessId}/review - Compliance decision

use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    db::DbPool,
    error::AppError,
    handlers::extract::{AppJson, AppPath, AppQuery},
    middleware::auth::AuthContext,
    models::{
        business::{BusinessResponse, CreateBusinessRequest, UpdateBusinessRequest},
        kyc::ReviewKycRequest,
    },
    services::{business_service, sql::Page},
    shared::BusinessId,
};

/// Create a new business.
///
/// # Endpoint
///
/// `POST /api/v1/businesses`
///
/// # Request Body
///
/// ```json
/// {
///   "legalName": "Acme Widgets LLC",
///   "dba": "Acme",
///   "entityType": "llc",
///   "taxId": "12-3456789"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the business, KYC status `notStarted`
/// - **Error (400)**: missing name, malformed tax id or unknown entity type
/// - **Error (401)**: Invalid API key
pub async fn create_business(
    State(pool): State<DbPool>,
    AppJson(request): AppJson<CreateBusinessRequest>,
) -> Result<(StatusCode, Json<BusinessResponse>), AppError> {
    let business = business_service::create_business(&pool, request).await?;
    Ok((StatusCode::CREATED, Json(business.into())))
}

pub async fn list_businesses(
    State(pool): State<DbPool>,
    AppQuery(page): AppQuery<Page>,
) -> Result<Json<Vec<BusinessResponse>>, AppError> {
    let businesses = business_service::list_businesses(&pool, page).await?;
    Ok(Json(businesses.into_iter().map(Into::into).collect()))
}

pub async fn get_business(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<BusinessId>,
) -> Result<Json<BusinessResponse>, AppError> {
    let business = business_service::get_business(&pool, id).await?;
    Ok(Json(business.into()))
}

/// Partially update a business. Only the fields present in the body change.
pub async fn update_business(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<BusinessId>,
    AppJson(update): AppJson<UpdateBusinessRequest>,
) -> Result<Json<BusinessResponse>, AppError> {
    let business = business_service::update_business(&pool, id, update).await?;
    Ok(Json(business.into()))
}

pub async fn delete_business(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<BusinessId>,
) -> Result<StatusCode, AppError> {
    business_service::delete_business(&pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_kyc(
    State(pool): State<DbPool>,
    AppPath(id): AppPath<BusinessId>,
) -> Result<Json<BusinessResponse>, AppError> {
    let business = business_service::submit_kyc(&pool, id).await?;
    Ok(Json(business.into()))
}

/// Record a compliance decision. The calling client is recorded as reviewer
/// on the note written with the decision.
pub async fn review_kyc(
    State(pool): State<DbPool>,
    Extension(auth): Extension<AuthContext>,
    AppPath(id): AppPath<BusinessId>,
    AppJson(review): AppJson<ReviewKycRequest>,
) -> Result<Json<BusinessResponse>, AppError> {
    let business = business_service::review_kyc(&pool, id, review, &auth.client_name).await?;
    Ok(Json(business.into()))
}
