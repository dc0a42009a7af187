//! Producer pipeline: typed record → registered schema → envelope → log.
//!
//! `publish` never waits for the broker. It encodes, hands the envelope to
//! the transport and returns a [`DeliveryHandle`]; a spawned task records the
//! outcome in shared counters and completes the handle.
//!
//! ```ignore
//! let pipeline = ProducerPipeline::<UserEvent>::new(
//!     Arc::new(log.producer()),
//!     client,
//!     "user_events",
//!     &definition,
//! )?;
//!
//! let mut handle = pipeline.publish(None, &event).await?;
//! match handle.wait().await? {
//!     DeliveryOutcome::Delivered { partition, offset } => { /* ... */ }
//!     DeliveryOutcome::Failed(reason) => { /* ... */ }
//! }
//! ```

use crate::error::{ClientError, Result};
use crate::transport::{DeliveryOutcome, LogProducer};
use bytes::Bytes;
use schemaflow_codec::{AvroSerializer, SubjectNameStrategy};
use schemaflow_registry::{RegisteredSchema, SchemaRegistryClient};
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Snapshot of producer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProducerStats {
    /// Envelopes accepted by the transport
    pub published: u64,
    pub delivered: u64,
    /// Delivery failures plus transport refusals
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ProducerStats {
        ProducerStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of one `publish`, available once the transport reports it.
///
/// Dropping the handle is fine; the outcome is still counted and logged.
#[derive(Debug)]
pub struct DeliveryHandle {
    receiver: Option<oneshot::Receiver<DeliveryOutcome>>,
}

impl DeliveryHandle {
    /// Wait for the delivery outcome.
    ///
    /// # Errors
    ///
    /// - `ClientError::OutcomeAlreadyConsumed`: called twice on the same handle
    pub async fn wait(&mut self) -> Result<DeliveryOutcome> {
        let receiver = self
            .receiver
            .take()
            .ok_or(ClientError::OutcomeAlreadyConsumed)?;
        Ok(receiver
            .await
            .unwrap_or_else(|_| DeliveryOutcome::Failed("delivery task aborted".to_string())))
    }
}

/// Publishes records of type `T` to one topic under `{topic}-value`.
pub struct ProducerPipeline<T> {
    transport: Arc<dyn LogProducer>,
    serializer: AvroSerializer,
    topic: String,
    counters: Arc<Counters>,
    _record: PhantomData<fn(&T)>,
}

impl<T: Serialize + Sync> ProducerPipeline<T> {
    /// Build a pipeline for `topic` with the schema `definition`.
    ///
    /// The definition is parsed here; registration happens on first publish
    /// (or [`ProducerPipeline::register`]).
    pub fn new(
        transport: Arc<dyn LogProducer>,
        client: Arc<SchemaRegistryClient>,
        topic: impl Into<String>,
        definition: &str,
    ) -> Result<Self> {
        let topic = topic.into();
        if topic.trim().is_empty() {
            return Err(ClientError::ConfigError("topic must not be empty".to_string()));
        }
        let serializer =
            AvroSerializer::new(client, &SubjectNameStrategy::topic_value(&topic), definition)?;

        Ok(Self {
            transport,
            serializer,
            topic,
            counters: Arc::new(Counters::default()),
            _record: PhantomData,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subject(&self) -> &str {
        self.serializer.subject()
    }

    /// Registered schema, once the first publish (or `register`) succeeded.
    pub fn registered(&self) -> Option<RegisteredSchema> {
        self.serializer.registered()
    }

    /// Register the schema now instead of on the first publish.
    pub async fn register(&self) -> Result<RegisteredSchema> {
        Ok(self.serializer.register().await?)
    }

    /// Encode `record` and hand it to the transport.
    ///
    /// Returns as soon as the transport accepted the envelope. Encoding and
    /// registration errors are returned here; delivery failures arrive
    /// through the handle.
    pub async fn publish(&self, key: Option<Bytes>, record: &T) -> Result<DeliveryHandle> {
        let envelope = self.serializer.serialize(record).await?;

        let receipt = match self.transport.publish(&self.topic, key, envelope).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(topic = %self.topic, error = %e, "Transport rejected message");
                return Err(e.into());
            }
        };
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        let (sender, receiver) = oneshot::channel();
        let counters = Arc::clone(&self.counters);
        let topic = self.topic.clone();
        tokio::spawn(async move {
            let outcome = receipt.outcome().await;
            match &outcome {
                DeliveryOutcome::Delivered { partition, offset } => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(topic = %topic, partition, offset, "Message delivered");
                }
                DeliveryOutcome::Failed(reason) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(topic = %topic, reason = %reason, "Message delivery failed");
                }
            }
            let _ = sender.send(outcome);
        });

        Ok(DeliveryHandle {
            receiver: Some(receiver),
        })
    }

    /// Wait up to `timeout` for queued messages to reach the log.
    pub async fn flush(&self, timeout: Duration) -> Result<()> {
        self.transport.flush(timeout).await?;
        Ok(())
    }

    pub fn stats(&self) -> ProducerStats {
        self.counters.snapshot()
    }
}
