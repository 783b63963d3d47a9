//! Grouped queue consumer.
//!
//! Each iteration long-polls for up to ten messages and splits them into
//! units of work. On a FIFO queue a unit is a message group: its messages
//! run one after another on a single task, in receive order. Messages
//! without a group id share one synthetic group. On a standard queue every
//! message is its own unit. Units run concurrently.
//!
//! Outcomes flow back over a channel. Successes are deleted with one batch
//! call, failures have their visibility reset to zero with another, so the
//! queue redelivers them. Handlers are never retried in-process.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{QueueClient, QueueError, QueueMessage, ReceiveRequest, is_fifo};

/// SQS returns at most ten messages per receive.
pub const MAX_MESSAGES: i32 = 10;

/// After this long without a successful receive, a retry uses a fresh
/// receive-deduplication token instead of replaying the old one.
pub const ATTEMPT_ID_TTL: Duration = Duration::from_secs(5 * 60);

/// Longest long-poll SQS accepts.
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);

/// Longest visibility timeout SQS accepts (12 hours).
pub const MAX_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

/// Whole seconds of `duration`, capped at `max`.
fn capped_seconds(duration: Duration, max: Duration) -> i32 {
    i32::try_from(duration.min(max).as_secs()).unwrap_or(i32::MAX)
}

/// Processes one message. An `Err` leaves the message on the queue.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, message: &QueueMessage) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    /// Long-poll duration of each receive
    pub wait_time: Duration,
    /// How long received messages stay hidden from other consumers
    pub visibility_timeout: Duration,
    /// Pause before retrying a failed receive
    pub retry_delay: Duration,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            wait_time: Duration::from_secs(20),
            visibility_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Messages that share a processing task.
#[derive(Debug)]
pub struct WorkUnit {
    pub group_id: Option<String>,
    pub messages: Vec<QueueMessage>,
}

/// Split a received batch into work units.
///
/// FIFO: one unit per message group in first-seen order, each keeping the
/// receive order of its messages. Ungrouped messages go into one unit keyed
/// by a random id. Standard: one unit per message.
pub fn group_messages(messages: Vec<QueueMessage>, fifo: bool) -> Vec<WorkUnit> {
    if !fifo {
        return messages
            .into_iter()
            .map(|message| WorkUnit {
                group_id: None,
                messages: vec![message],
            })
            .collect();
    }

    let ungrouped = Uuid::new_v4().to_string();
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<QueueMessage>> = HashMap::new();

    for message in messages {
        let key = message.group_id.clone().unwrap_or_else(|| ungrouped.clone());
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(message);
    }

    order
        .into_iter()
        .filter_map(|key| {
            groups.remove(&key).map(|messages| WorkUnit {
                group_id: Some(key),
                messages,
            })
        })
        .collect()
}

struct Outcome {
    message: QueueMessage,
    succeeded: bool,
}

fn new_attempt_id() -> String {
    Uuid::new_v4().to_string()
}

pub struct Consumer {
    client: Arc<dyn QueueClient>,
    fifo: bool,
    options: ConsumerOptions,
    closed: AtomicBool,
}

impl Consumer {
    pub fn new(client: Arc<dyn QueueClient>, options: ConsumerOptions) -> Self {
        let fifo = is_fifo(client.queue_url());

        Self {
            client,
            fifo,
            options,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_fifo(&self) -> bool {
        self.fifo
    }

    /// Ask the receive loop to stop. The loop finishes the batch in hand
    /// and returns before its next receive.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn receive_request(&self, attempt_id: &str) -> ReceiveRequest {
        ReceiveRequest {
            max_messages: MAX_MESSAGES,
            wait_time_seconds: capped_seconds(self.options.wait_time, MAX_WAIT_TIME),
            visibility_timeout_seconds: capped_seconds(
                self.options.visibility_timeout,
                MAX_VISIBILITY_TIMEOUT,
            ),
            attempt_id: self.fifo.then(|| attempt_id.to_string()),
        }
    }

    /// Receive and process messages until closed.
    ///
    /// # Errors
    ///
    /// Returns throttling and configuration errors from the queue. Other
    /// receive errors are logged and retried after `retry_delay`.
    pub async fn receive_messages<H: MessageHandler>(&self, handler: Arc<H>) -> Result<(), QueueError> {
        let queue_url = self.client.queue_url().to_string();
        let mut attempt_id = new_attempt_id();
        let mut last_success = Instant::now();

        info!(queue_url = %queue_url, fifo = self.fifo, "Queue consumer started");

        loop {
            if self.is_closed() {
                info!(queue_url = %queue_url, "Queue consumer closed");
                return Ok(());
            }

            match self.client.receive(self.receive_request(&attempt_id)).await {
                Ok(messages) => {
                    last_success = Instant::now();
                    attempt_id = new_attempt_id();

                    if !messages.is_empty() {
                        self.process_batch(messages, &handler).await;
                    }
                }
                Err(err) if err.is_fatal() => {
                    error!(error = %err, queue_url = %queue_url, "Queue consumer stopping");
                    return Err(err);
                }
                Err(err) => {
                    if last_success.elapsed() > ATTEMPT_ID_TTL {
                        attempt_id = new_attempt_id();
                    }
                    warn!(
                        error = %err,
                        queue_url = %queue_url,
                        retry_in_ms = self.options.retry_delay.as_millis() as u64,
                        "Receive failed, retrying"
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                }
            }
        }
    }

    /// Run every unit of a batch and settle the outcomes with the queue.
    async fn process_batch<H: MessageHandler>(&self, messages: Vec<QueueMessage>, handler: &Arc<H>) {
        let received = messages.len();
        let units = group_messages(messages, self.fifo);
        debug!(received, units = units.len(), "Dispatching batch");

        let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();

        for unit in units {
            let tx = tx.clone();
            let handler = Arc::clone(handler);

            tokio::spawn(async move {
                for message in unit.messages {
                    let result = handler.handle(&message).await;
                    if let Err(err) = &result {
                        warn!(
                            error = %err,
                            message_id = %message.id,
                            group_id = unit.group_id.as_deref().unwrap_or_default(),
                            "Message handler failed"
                        );
                    }

                    let outcome = Outcome {
                        message,
                        succeeded: result.is_ok(),
                    };
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }

        // The channel closes once every worker has finished or panicked
        drop(tx);

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        while let Some(outcome) = rx.recv().await {
            if outcome.succeeded {
                succeeded.push(outcome.message);
            } else {
                failed.push(outcome.message);
            }
        }

        if received > succeeded.len() + failed.len() {
            error!(
                missing = received - succeeded.len() - failed.len(),
                "Workers exited without reporting; messages will reappear after the visibility timeout"
            );
        }

        if !succeeded.is_empty() {
            let result = self.client.delete_batch(&succeeded).await;
            log_batch_result("delete", succeeded.len(), result);
        }

        if !failed.is_empty() {
            let result = self.client.reset_visibility_batch(&failed).await;
            log_batch_result("reset_visibility", failed.len(), result);
        }
    }

    /// Send a message. Group and deduplication ids are only attached on
    /// FIFO queues, where a group id is mandatory.
    pub async fn send_message(
        &self,
        body: &str,
        group_id: Option<&str>,
        dedup_id: Option<&str>,
    ) -> Result<String, QueueError> {
        if !self.fifo {
            return self.client.send(body, None, None).await;
        }

        let group_id = group_id.ok_or_else(|| {
            QueueError::Configuration("FIFO queues require a message group id".to_string())
        })?;

        self.client.send(body, Some(group_id), dedup_id).await
    }
}

fn log_batch_result(
    operation: &'static str,
    attempted: usize,
    result: Result<Vec<super::BatchFailure>, QueueError>,
) {
    match result {
        Ok(failures) => {
            for failure in &failures {
                warn!(
                    operation,
                    message_id = %failure.id,
                    code = %failure.code,
                    reason = failure.message.as_deref().unwrap_or_default(),
                    "Batch entry failed"
                );
            }
            debug!(operation, attempted, failed = failures.len(), "Batch settled");
        }
        Err(err) => {
            error!(operation, attempted, error = %err, "Batch call failed");
        }
    }
}
