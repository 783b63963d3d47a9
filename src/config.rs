//! Application configuration management.
//!
//! Each binary loads its own configuration struct from environment variables
//! with the `envy` crate. A `.env` file is read first if present.

use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Configuration for the HTTP API server.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `BANK_API_URL`, `BANK_TOKEN_URL`, `BANK_CLIENT_ID`, `BANK_CLIENT_SECRET` (required):
///   partner bank REST API and its OAuth client credentials
/// - `DOCUMENT_BUCKET` (required): S3 bucket holding uploaded documents
/// - `PRESIGN_TTL_SECONDS` (optional): lifetime of presigned URLs, defaults to 900
/// - `AWS_REGION` (optional): defaults to `us-east-1`
/// - `S3_ENDPOINT_URL` (optional): endpoint override for local testing
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub bank_api_url: String,
    pub bank_token_url: String,
    pub bank_client_id: String,
    pub bank_client_secret: String,

    pub document_bucket: String,

    #[serde(default = "default_presign_ttl")]
    pub presign_ttl_seconds: u64,

    #[serde(default = "default_region")]
    pub aws_region: String,

    pub s3_endpoint_url: Option<String>,
}

/// Configuration for the document-upload queue worker.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required)
/// - `DOCUMENT_QUEUE_URL` (required): SQS queue receiving S3 upload notifications
/// - `AWS_REGION` (optional): defaults to `us-east-1`
/// - `SQS_ENDPOINT_URL` (optional): endpoint override for local testing
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    pub database_url: String,

    pub document_queue_url: String,

    #[serde(default = "default_region")]
    pub aws_region: String,

    pub sqs_endpoint_url: Option<String>,
}

/// Configuration for the nightly monitor job.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required)
/// - `MONITOR_SINK_URL` (required): endpoint receiving changed records
/// - `MONITOR_BATCH_SIZE` (optional): rows pushed concurrently, defaults to 10
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub database_url: String,

    pub monitor_sink_url: String,

    #[serde(default = "default_batch_size")]
    pub monitor_batch_size: usize,
}

fn default_port() -> u16 {
    3000
}

fn default_presign_ttl() -> u64 {
    900
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_batch_size() -> usize {
    10
}

/// Load a configuration struct from the environment.
///
/// Field names map to upper-case variables: `database_url` -> `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if required variables are missing or cannot be parsed.
pub fn from_env<T: DeserializeOwned>() -> Result<T, envy::Error> {
    // Try to load .env file if it exists (does nothing if not found)
    dotenvy::dotenv().ok();

    envy::from_env::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn worker_config_applies_defaults() {
        let config: WorkerConfig = envy::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/core"),
            ("DOCUMENT_QUEUE_URL", "https://sqs.us-east-1.amazonaws.com/1/docs.fifo"),
        ]))
        .unwrap();

        assert_eq!(config.aws_region, "us-east-1");
        assert!(config.sqs_endpoint_url.is_none());
    }

    #[test]
    fn monitor_config_reads_batch_size() {
        let config: MonitorConfig = envy::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/core"),
            ("MONITOR_SINK_URL", "http://monitor.internal/records"),
            ("MONITOR_BATCH_SIZE", "5"),
        ]))
        .unwrap();

        assert_eq!(config.monitor_batch_size, 5);
    }

    #[test]
    fn server_config_requires_bank_credentials() {
        let result: Result<ServerConfig, _> = envy::from_iter(vars(&[
            ("DATABASE_URL", "postgres://localhost/core"),
            ("DOCUMENT_BUCKET", "documents"),
        ]));

        assert!(result.is_err());
    }
}
