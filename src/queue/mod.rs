//! Message queue plumbing.
//!
//! [`QueueClient`] is the narrow slice of SQS the platform uses: long-poll
//! receive, batch acknowledge (delete), batch negative-acknowledge
//! (visibility reset to zero) and send. [`consumer::Consumer`] drives a
//! client in a loop and fans received messages out to a handler.

pub mod consumer;
pub mod sqs;

use std::collections::HashMap;

use async_trait::async_trait;

pub use consumer::{Consumer, ConsumerOptions, MessageHandler};

/// Errors surfaced by a queue client.
///
/// Throttling and configuration errors end a consumer loop; everything else
/// is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("queue throttled the request: {0}")]
    Throttled(String),

    #[error("queue is misconfigured: {0}")]
    Configuration(String),

    #[error("queue request failed: {0}")]
    Transient(String),
}

impl QueueError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Configuration(_))
    }
}

/// A received message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueueMessage {
    pub id: String,
    pub receipt_handle: String,
    pub body: String,

    /// FIFO message group; `None` on standard queues
    pub group_id: Option<String>,

    /// System attributes returned with the message
    pub attributes: HashMap<String, String>,
}

/// Parameters of one receive call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub max_messages: i32,
    pub wait_time_seconds: i32,
    pub visibility_timeout_seconds: i32,

    /// Receive-deduplication token; only meaningful on FIFO queues
    pub attempt_id: Option<String>,
}

/// One entry a batch call could not apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Id of the message the entry referred to
    pub id: String,
    pub code: String,
    pub message: Option<String>,
}

/// FIFO queue URLs end in `.fifo`.
pub fn is_fifo(queue_url: &str) -> bool {
    queue_url.ends_with(".fifo")
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    fn queue_url(&self) -> &str;

    async fn receive(&self, request: ReceiveRequest) -> Result<Vec<QueueMessage>, QueueError>;

    /// Delete processed messages. Returns the entries that failed.
    async fn delete_batch(&self, messages: &[QueueMessage]) -> Result<Vec<BatchFailure>, QueueError>;

    /// Make failed messages visible again immediately. Returns the entries
    /// that failed.
    async fn reset_visibility_batch(
        &self,
        messages: &[QueueMessage],
    ) -> Result<Vec<BatchFailure>, QueueError>;

    /// Send a message; returns the queue-assigned message id.
    async fn send(
        &self,
        body: &str,
        group_id: Option<&str>,
        dedup_id: Option<&str>,
    ) -> Result<String, QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://sqs.us-east-1.amazonaws.com/123456789012/uploads.fifo", true)]
    #[case("https://sqs.us-east-1.amazonaws.com/123456789012/uploads", false)]
    #[case("https://sqs.us-east-1.amazonaws.com/123456789012/fifo-uploads", false)]
    fn fifo_detection(#[case] url: &str, #[case] fifo: bool) {
        assert_eq!(is_fifo(url), fifo);
    }

    #[rstest]
    #[case(QueueError::Throttled("slow down".into()), true)]
    #[case(QueueError::Configuration("no queue".into()), true)]
    #[case(QueueError::Transient("reset".into()), false)]
    fn fatal_errors(#[case] error: QueueError, #[case] fatal: bool) {
        assert_eq!(error.is_fatal(), fatal);
    }
}
