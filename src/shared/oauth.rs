//! Cached OAuth2 client-credentials token.
//!
//! The partner bank hands out short-lived bearer tokens. One `TokenSource`
//! is shared by every request; the cached token sits behind a single async
//! mutex so concurrent callers wait for one refresh instead of stampeding
//! the token endpoint.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

/// Tokens this close to expiry are treated as already expired.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_SKEW < self.expires_at
    }
}

pub struct TokenSource {
    http: reqwest::Client,
    token_url: Url,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(http: reqwest::Client, token_url: Url, client_id: String, client_secret: String) -> Self {
        Self {
            http,
            token_url,
            client_id,
            client_secret,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, fetching a new one if the cached token
    /// is missing or about to expire.
    pub async fn token(&self) -> Result<String, OAuthError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.access_token.clone());
        }

        let fresh = self.fetch().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);

        Ok(access_token)
    }

    /// Drop the cached token so the next call refreshes. Used after the
    /// partner answers 401 to a token we believed was valid.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn fetch(&self) -> Result<CachedToken, OAuthError> {
        let requested_at = Instant::now();

        let response = self
            .http
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        tracing::debug!(expires_in = token.expires_in, "Partner access token refreshed");

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: requested_at + Duration::from_secs(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_expiring_in(secs: u64, now: Instant) -> CachedToken {
        CachedToken {
            access_token: "abc".to_string(),
            expires_at: now + Duration::from_secs(secs),
        }
    }

    #[test]
    fn token_is_fresh_outside_the_skew_window() {
        let now = Instant::now();
        assert!(token_expiring_in(3600, now).is_fresh(now));
        assert!(!token_expiring_in(60, now).is_fresh(now));
        assert!(!token_expiring_in(10, now).is_fresh(now));
    }

    #[tokio::test]
    async fn invalidate_clears_cache() {
        let source = TokenSource::new(
            reqwest::Client::new(),
            Url::parse("http://localhost/token").unwrap(),
            "id".to_string(),
            "secret".to_string(),
        );
        *source.cached.lock().await = Some(token_expiring_in(3600, Instant::now()));

        assert_eq!(source.token().await.unwrap(), "abc");
        source.invalidate().await;
        assert!(source.cached.lock().await.is_none());
    }
}
