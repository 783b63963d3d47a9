//! API key authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the API key from the Authorization header
//! 2. Hash it and verify it exists in the database
//! 3. Inject authentication context into the request
//! 4. Reject unauthorized requests with HTTP 401

use crate::{
    db::DbPool,
    error::AppError,
    models::api_key::{ApiKey, hash_api_key},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Authentication context attached to authenticated requests.
///
/// Handlers extract it with `Extension<AuthContext>` to learn which client
/// is calling.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Name of the calling client; recorded as note author, document
    /// creator and KYC reviewer
    pub client_name: String,
}

/// Pull the key out of an `Authorization: Bearer <key>` header value.
fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// API key authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <key>` header from request
/// 2. Hash the `<key>` using SHA-256
/// 3. Query database for matching hash where `is_active = true`
/// 4. If found: inject `AuthContext` into request, call next handler
/// 5. If not found: return 401 Unauthorized error
pub async fn auth_middleware(
    State(pool): State<DbPool>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let api_key = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .ok_or(AppError::InvalidApiKey)?;

    let key_hash = hash_api_key(api_key);

    let api_key_record = sqlx::query_as::<_, ApiKey>(
        "SELECT id, key_hash, client_name, created_at, is_active
         FROM api_keys
         WHERE key_hash = $1 AND is_active = true",
    )
    .bind(&key_hash)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::InvalidApiKey)?;

    tracing::debug!(api_key_id = %api_key_record.id, client = %api_key_record.client_name, "Request authenticated");

    let auth_context = AuthContext {
        client_name: api_key_record.client_name,
    };

    // Route handlers can now extract this using Extension<AuthContext>
    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Bearer abc123", Some("abc123"))]
    #[case("Bearer   padded  ", Some("padded"))]
    #[case("Bearer ", None)]
    #[case("Basic abc123", None)]
    #[case("abc123", None)]
    fn bearer_tokens(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(bearer_token(header), expected);
    }
}
