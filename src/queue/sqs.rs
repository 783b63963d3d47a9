//! [`QueueClient`] backed by Amazon SQS.

use std::fmt;

use async_trait::async_trait;
use aws_sdk_sqs::{
    Client as SqsClient,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    types::{
        BatchResultErrorEntry, ChangeMessageVisibilityBatchRequestEntry,
        DeleteMessageBatchRequestEntry, Message, MessageSystemAttributeName,
    },
};
use tracing::{debug, error};

use super::{BatchFailure, QueueClient, QueueError, QueueMessage, ReceiveRequest};

/// Error codes SQS uses when a caller exceeds its request rate.
const THROTTLING_CODES: &[&str] = &[
    "ThrottlingException",
    "RequestThrottled",
    "AWS.SimpleQueueService.RequestThrottled",
    "OverLimit",
];

/// Error codes that no amount of retrying will fix.
const CONFIGURATION_CODES: &[&str] = &[
    "AWS.SimpleQueueService.NonExistentQueue",
    "QueueDoesNotExist",
    "InvalidAddress",
    "InvalidClientTokenId",
    "UnrecognizedClientException",
    "AccessDenied",
    "AccessDeniedException",
    "InvalidSecurity",
    "SignatureDoesNotMatch",
];

fn classify_code(code: Option<&str>, detail: String) -> QueueError {
    match code {
        Some(code) if THROTTLING_CODES.contains(&code) => QueueError::Throttled(detail),
        Some(code) if CONFIGURATION_CODES.contains(&code) => QueueError::Configuration(detail),
        _ => QueueError::Transient(detail),
    }
}

fn classify<E, R>(operation: &'static str, err: SdkError<E, R>) -> QueueError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    let detail = format!("{operation}: {}", DisplayErrorContext(&err));

    // Missing region or credentials fail before any request is sent
    if matches!(err, SdkError::ConstructionFailure(_)) {
        return QueueError::Configuration(detail);
    }

    classify_code(err.code(), detail)
}

fn failures(entries: &[BatchResultErrorEntry]) -> Vec<BatchFailure> {
    entries
        .iter()
        .map(|entry| BatchFailure {
            id: entry.id().to_string(),
            code: entry.code().to_string(),
            message: entry.message().map(str::to_string),
        })
        .collect()
}

fn to_queue_message(message: &Message) -> Option<QueueMessage> {
    let receipt_handle = message.receipt_handle()?.to_string();

    let attributes = message
        .attributes()
        .map(|attributes| {
            attributes
                .iter()
                .map(|(name, value)| (name.as_str().to_string(), value.clone()))
                .collect()
        })
        .unwrap_or_default();

    let group_id = message
        .attributes()
        .and_then(|attributes| attributes.get(&MessageSystemAttributeName::MessageGroupId))
        .cloned();

    Some(QueueMessage {
        id: message.message_id().unwrap_or_default().to_string(),
        receipt_handle,
        body: message.body().unwrap_or_default().to_string(),
        group_id,
        attributes,
    })
}

/// One SQS queue.
#[derive(Clone)]
pub struct SqsQueue {
    client: SqsClient,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: SqsClient, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
        }
    }

    /// Build a client from the shared AWS config, optionally pointed at a
    /// local SQS-compatible endpoint.
    pub fn client_from_config(config: &aws_config::SdkConfig, endpoint_url: Option<&str>) -> SqsClient {
        let mut builder = aws_sdk_sqs::config::Builder::from(config);
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        SqsClient::from_conf(builder.build())
    }
}

#[async_trait]
impl QueueClient for SqsQueue {
    fn queue_url(&self) -> &str {
        &self.queue_url
    }

    async fn receive(&self, request: ReceiveRequest) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(request.max_messages)
            .wait_time_seconds(request.wait_time_seconds)
            .visibility_timeout(request.visibility_timeout_seconds)
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .set_receive_request_attempt_id(request.attempt_id)
            .send()
            .await
            .map_err(|err| classify("receive_message", err))?;

        let messages: Vec<QueueMessage> = output
            .messages()
            .iter()
            .filter_map(to_queue_message)
            .collect();

        debug!(queue_url = %self.queue_url, message_count = messages.len(), "Messages received");
        Ok(messages)
    }

    async fn delete_batch(&self, messages: &[QueueMessage]) -> Result<Vec<BatchFailure>, QueueError> {
        let entries = messages
            .iter()
            .map(|message| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(&message.id)
                    .receipt_handle(&message.receipt_handle)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| QueueError::Configuration(format!("delete_message_batch: {err}")))?;

        let output = self
            .client
            .delete_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|err| classify("delete_message_batch", err))?;

        Ok(failures(output.failed()))
    }

    async fn reset_visibility_batch(
        &self,
        messages: &[QueueMessage],
    ) -> Result<Vec<BatchFailure>, QueueError> {
        let entries = messages
            .iter()
            .map(|message| {
                ChangeMessageVisibilityBatchRequestEntry::builder()
                    .id(&message.id)
                    .receipt_handle(&message.receipt_handle)
                    .visibility_timeout(0)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                QueueError::Configuration(format!("change_message_visibility_batch: {err}"))
            })?;

        let output = self
            .client
            .change_message_visibility_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|err| classify("change_message_visibility_batch", err))?;

        Ok(failures(output.failed()))
    }

    async fn send(
        &self,
        body: &str,
        group_id: Option<&str>,
        dedup_id: Option<&str>,
    ) -> Result<String, QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .set_message_group_id(group_id.map(str::to_string))
            .set_message_deduplication_id(dedup_id.map(str::to_string))
            .send()
            .await
            .map_err(|err| {
                let err = classify("send_message", err);
                error!(error = %err, queue_url = %self.queue_url, "Failed to send message");
                err
            })?;

        Ok(output.message_id().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    #[rstest]
    #[case(Some("ThrottlingException"), "throttled")]
    #[case(Some("AWS.SimpleQueueService.RequestThrottled"), "throttled")]
    #[case(Some("AWS.SimpleQueueService.NonExistentQueue"), "configuration")]
    #[case(Some("InvalidClientTokenId"), "configuration")]
    #[case(Some("InternalError"), "transient")]
    #[case(None, "transient")]
    fn error_codes_are_classified(#[case] code: Option<&str>, #[case] expected: &str) {
        let kind = match classify_code(code, String::new()) {
            QueueError::Throttled(_) => "throttled",
            QueueError::Configuration(_) => "configuration",
            QueueError::Transient(_) => "transient",
        };
        assert_eq!(kind, expected);
    }

    #[test]
    fn sdk_message_keeps_group_and_attributes() {
        let message = Message::builder()
            .message_id("m-1")
            .receipt_handle("rh-1")
            .body("{}")
            .set_attributes(Some(HashMap::from([
                (MessageSystemAttributeName::MessageGroupId, "owner-7".to_string()),
                (MessageSystemAttributeName::ApproximateReceiveCount, "2".to_string()),
            ])))
            .build();

        let converted = to_queue_message(&message).unwrap();

        assert_eq!(converted.group_id.as_deref(), Some("owner-7"));
        assert_eq!(converted.attributes["ApproximateReceiveCount"], "2");
        assert_eq!(converted.receipt_handle, "rh-1");
    }

    #[test]
    fn messages_without_receipt_handle_are_dropped() {
        let message = Message::builder().message_id("m-2").body("{}").build();
        assert!(to_queue_message(&message).is_none());
    }
}
