//! Core platform HTTP API.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Wire the partner bank client and the document store
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use core_platform::{
    config::{self, ServerConfig},
    db,
    partner::bank::{BankAdapter, bbva::BbvaClient},
    routes,
    shared::oauth::TokenSource,
    state::AppState,
    storage::s3::S3DocumentStore,
};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config: ServerConfig = config::from_env().context("loading server configuration")?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let tokens = Arc::new(TokenSource::new(
        http.clone(),
        Url::parse(&config.bank_token_url).context("BANK_TOKEN_URL")?,
        config.bank_client_id.clone(),
        config.bank_client_secret.clone(),
    ));
    let bank_client = BbvaClient::new(
        http,
        Url::parse(&config.bank_api_url).context("BANK_API_URL")?,
        tokens,
    );
    let bank = BankAdapter::new(Arc::new(bank_client));

    let aws = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;
    let s3 = S3DocumentStore::client_from_config(&aws, config.s3_endpoint_url.as_deref());
    let documents = S3DocumentStore::new(
        s3,
        config.document_bucket.clone(),
        Duration::from_secs(config.presign_ttl_seconds),
    )?;
    tracing::info!(bucket = %config.document_bucket, "Document store ready");

    let app = routes::create_router(AppState::new(pool, bank, Arc::new(documents)));

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
