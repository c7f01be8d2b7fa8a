//! Queue consumption: long-polling loop, per-message workers, and
//! acknowledgement.
//!
//! The consumer binds a [`Router`] to an abstract queue transport. Each
//! received message is processed on its own worker task under a fresh
//! deadline that is deliberately independent of the polling loop: when
//! shutdown is requested, in-flight handlers run to their own deadline
//! instead of being cancelled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::task::JoinSet;

use courier_core::RouteContext;

use crate::router::Router;
use crate::shutdown::ShutdownController;

// ---------------------------------------------------------------------------
// QueueClient
// ---------------------------------------------------------------------------

/// Abstract queue transport: the two cancellable operations the consumer
/// needs. Implementations (SQS, a test double) must be safe for concurrent
/// use, since delete calls run on worker tasks while the loop keeps polling.
#[async_trait]
pub trait QueueClient: Send + Sync {
    type Error: std::fmt::Display + std::fmt::Debug + Send + Sync + 'static;

    /// Long-polls the queue for up to `max_messages` messages, waiting up to
    /// `wait_time` queue-side before returning an empty batch.
    async fn receive(
        &self,
        queue_url: &str,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<QueueMessage>, Self::Error>;

    /// Acknowledges (deletes) a message by its receipt handle.
    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), Self::Error>;
}

/// One message as returned by the queue transport. Fields mirror the
/// optionality of SQS message attributes.
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub message_id: Option<String>,
    pub receipt_handle: Option<String>,
    pub body: Option<String>,
}

// ---------------------------------------------------------------------------
// ConsumerConfig
// ---------------------------------------------------------------------------

/// Consumer runtime knobs.
///
/// The defaults are the library's operational contract. Whatever the values,
/// the queue's visibility timeout must exceed `processing_timeout`, or a
/// message can be redelivered while its first worker is still running.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Maximum messages fetched per receive call.
    pub max_messages: u32,
    /// Queue-side long-poll wait.
    pub wait_time: Duration,
    /// Deadline for routing a single message.
    pub processing_timeout: Duration,
    /// Client-side deadline for the delete call.
    pub delete_timeout: Duration,
    /// Pause after a failed receive before polling again.
    pub receive_retry_delay: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_messages: 5,
            wait_time: Duration::from_secs(10),
            processing_timeout: Duration::from_secs(30),
            delete_timeout: Duration::from_secs(5),
            receive_retry_delay: Duration::from_secs(2),
        }
    }
}

// ---------------------------------------------------------------------------
// Consumer
// ---------------------------------------------------------------------------

/// Polls a queue and dispatches each message through the router on its own
/// worker task.
pub struct Consumer<C> {
    client: Arc<C>,
    queue_url: String,
    router: Arc<Router>,
    config: ConsumerConfig,
}

impl<C> Consumer<C>
where
    C: QueueClient + 'static,
{
    /// Creates a consumer with the default configuration.
    pub fn new(client: C, queue_url: impl Into<String>, router: Arc<Router>) -> Self {
        Self::with_config(client, queue_url, router, ConsumerConfig::default())
    }

    /// Creates a consumer with an explicit configuration.
    pub fn with_config(
        client: C,
        queue_url: impl Into<String>,
        router: Arc<Router>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            client: Arc::new(client),
            queue_url: queue_url.into(),
            router,
            config,
        }
    }

    /// Runs the polling loop until shutdown is triggered, then waits for
    /// every in-flight worker before returning.
    ///
    /// Receive errors are logged and retried after
    /// `config.receive_retry_delay`; they never end the loop.
    pub async fn start(&self, shutdown: &ShutdownController) {
        let mut signal = shutdown.subscribe();
        shutdown.mark_polling();
        tracing::info!(queue_url = %self.queue_url, "consumer started, polling queue");

        let mut workers: JoinSet<()> = JoinSet::new();

        loop {
            // The watch value covers triggers that raced `start`.
            if *signal.borrow() {
                tracing::info!("shutdown initiated, no longer polling for new messages");
                break;
            }

            let received = tokio::select! {
                _ = signal.changed() => {
                    tracing::info!("shutdown signal observed, stopping poller");
                    break;
                }
                received = self.client.receive(
                    &self.queue_url,
                    self.config.max_messages,
                    self.config.wait_time,
                ) => received,
            };

            // Reap finished workers so the set does not grow unbounded.
            while workers.try_join_next().is_some() {}

            match received {
                Ok(messages) => {
                    if messages.is_empty() {
                        continue;
                    }
                    tracing::debug!(count = messages.len(), "received messages");
                    for message in messages {
                        let client = Arc::clone(&self.client);
                        let router = Arc::clone(&self.router);
                        let queue_url = self.queue_url.clone();
                        let config = self.config.clone();
                        workers.spawn(process_message(client, router, queue_url, config, message));
                    }
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to receive messages, retrying");
                    tokio::select! {
                        _ = signal.changed() => break,
                        () = tokio::time::sleep(self.config.receive_retry_delay) => {}
                    }
                }
            }
        }

        tracing::info!("waiting for in-flight messages to be processed");
        while workers.join_next().await.is_some() {}
        shutdown.mark_stopped();
        tracing::info!("graceful shutdown complete");
    }
}

/// Routes one message and acknowledges it per the routed decision.
async fn process_message<C: QueueClient>(
    client: Arc<C>,
    router: Arc<Router>,
    queue_url: String,
    config: ConsumerConfig,
    message: QueueMessage,
) {
    let queue_message_id = message.message_id.unwrap_or_default();
    let Some(body) = message.body else {
        tracing::error!(message_id = %queue_message_id, "received message with empty body");
        return;
    };

    // Fresh deadline, not tied to the polling loop: shutdown lets in-flight
    // messages run to completion.
    let ctx = RouteContext::with_timeout(config.processing_timeout);
    let routed = match tokio::time::timeout(
        config.processing_timeout,
        router.route(&ctx, Bytes::from(body)),
    )
    .await
    {
        Ok(routed) => routed,
        Err(_) => {
            tracing::error!(
                message_id = %queue_message_id,
                timeout_secs = config.processing_timeout.as_secs(),
                "message processing timed out, leaving for redelivery"
            );
            return;
        }
    };

    match &routed.handler_result.error {
        Some(err) => tracing::error!(
            message_type = %routed.message_type,
            message_version = %routed.message_version,
            message_id = %routed.message_id,
            timestamp = %routed.timestamp,
            error = %err,
            "message handling failed"
        ),
        None => tracing::info!(
            message_type = %routed.message_type,
            message_version = %routed.message_version,
            message_id = %routed.message_id,
            timestamp = %routed.timestamp,
            "message handled"
        ),
    }

    if routed.handler_result.should_delete {
        let Some(receipt_handle) = message.receipt_handle else {
            tracing::warn!(message_id = %queue_message_id, "cannot delete message without receipt handle");
            return;
        };
        // Independent short deadline. A failed delete is not retried here:
        // the message reappears after its visibility timeout and the
        // idempotent handler absorbs the duplicate.
        match tokio::time::timeout(
            config.delete_timeout,
            client.delete(&queue_url, &receipt_handle),
        )
        .await
        {
            Ok(Ok(())) => tracing::debug!(message_id = %routed.message_id, "message deleted"),
            Ok(Err(err)) => tracing::error!(
                message_id = %routed.message_id,
                error = %err,
                "failed to delete message"
            ),
            Err(_) => tracing::error!(
                message_id = %routed.message_id,
                timeout_secs = config.delete_timeout.as_secs(),
                "delete call timed out"
            ),
        }
    } else {
        tracing::info!(
            message_id = %routed.message_id,
            "message left for redelivery after visibility timeout"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
