//! Health check endpoint for load balancers and uptime checks.

use crate::{db::DbPool, error::AppError};
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// `GET /health`, the only route served without an API key.
///
/// ```json
/// {
///   "status": "healthy",
///   "database": "connected",
///   "version": "0.1.0",
///   "timestamp": "2026-03-02T19:00:00Z"
/// }
/// ```
///
/// An unreachable database surfaces as the standard 500 error body.
pub async fn health_check(State(pool): State<DbPool>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        database: "connected",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    }))
}
