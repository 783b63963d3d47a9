//! Document upload worker.
//!
//! Consumes S3 upload notifications from SQS and marks the matching
//! documents as uploaded. Runs until Ctrl-C or a fatal queue error.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use core_platform::{
    config::{self, WorkerConfig},
    db::{self, DbPool},
    queue::{Consumer, ConsumerOptions, MessageHandler, QueueMessage, sqs::SqsQueue},
    services::document_service,
    storage::events::parse_uploaded_objects,
};
use tracing_subscriber::EnvFilter;

/// Marks documents uploaded as their objects land in the bucket.
struct DocumentUploadHandler {
    pool: DbPool,
}

#[async_trait]
impl MessageHandler for DocumentUploadHandler {
    async fn handle(&self, message: &QueueMessage) -> anyhow::Result<()> {
        let objects = match parse_uploaded_objects(&message.body) {
            Ok(objects) => objects,
            Err(err) => {
                // Redelivery can't fix a body that doesn't parse
                tracing::warn!(message_id = %message.id, error = %err, "Dropping unreadable upload notification");
                return Ok(());
            }
        };

        for object in objects {
            let updated = document_service::mark_uploaded(&self.pool, &object.key, object.size)
                .await
                .with_context(|| format!("marking {} uploaded", object.key))?;

            match updated {
                Some(document) => {
                    tracing::info!(document_id = %document.id, key = %object.key, "Document uploaded")
                }
                None => tracing::warn!(key = %object.key, "Upload has no matching document"),
            }
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config: WorkerConfig = config::from_env().context("loading worker configuration")?;
    let pool = db::create_pool(&config.database_url).await?;

    let aws = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;
    let client = SqsQueue::client_from_config(&aws, config.sqs_endpoint_url.as_deref());
    let queue = SqsQueue::new(client, config.document_queue_url.clone());

    let consumer = Arc::new(Consumer::new(Arc::new(queue), ConsumerOptions::default()));
    let handler = Arc::new(DocumentUploadHandler { pool });

    let shutdown = Arc::clone(&consumer);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            shutdown.close();
        }
    });

    tracing::info!(queue_url = %config.document_queue_url, fifo = consumer.is_fifo(), "Document worker started");
    consumer.receive_messages(handler).await?;
    tracing::info!("Document worker stopped");

    Ok(())
}
