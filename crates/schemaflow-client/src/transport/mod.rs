//! Log transport abstraction.
//!
//! The pipelines treat the log as a reliable, partitioned, offset-ordered
//! append log. Two implementations exist:
//!
//! - [`memory::MemoryLog`]: in-process log for tests and demos
//! - `kafka::KafkaLog` (feature `kafka`): librdkafka through `rdkafka`

pub mod memory;

#[cfg(feature = "kafka")]
pub mod kafka;

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::time::Duration;
use tokio::sync::oneshot;

/// Final result of one publish attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { partition: i32, offset: i64 },
    Failed(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryOutcome::Delivered { partition, offset } => {
                write!(f, "delivered to partition {} at offset {}", partition, offset)
            }
            DeliveryOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Transport-side delivery report, fulfilled exactly once.
#[derive(Debug)]
pub struct DeliveryReceipt {
    receiver: oneshot::Receiver<DeliveryOutcome>,
}

impl DeliveryReceipt {
    /// A receipt and the sender the transport completes it with.
    pub fn channel() -> (oneshot::Sender<DeliveryOutcome>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    /// Wait for the report. A transport that drops the sender counts as a failure.
    pub async fn outcome(self) -> DeliveryOutcome {
        self.receiver
            .await
            .unwrap_or_else(|_| DeliveryOutcome::Failed("delivery report dropped".to_string()))
    }
}

/// Where in the log something happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPosition {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]@{}", self.topic, self.partition, self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Reached the current end of a partition; informational.
    PartitionEof,
    /// The transport cannot continue (consumer loop stops).
    Fatal,
    Other,
}

/// Error reported by a log transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    pub position: Option<LogPosition>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            position: None,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Other, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Fatal, message)
    }

    /// `position.offset` is the next offset the consumer would read.
    pub fn partition_eof(position: LogPosition) -> Self {
        Self {
            kind: TransportErrorKind::PartitionEof,
            message: format!("End of partition reached: {}", position),
            position: Some(position),
        }
    }

    pub fn at(mut self, position: LogPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn is_partition_eof(&self) -> bool {
        self.kind == TransportErrorKind::PartitionEof
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == TransportErrorKind::Fatal
    }
}

/// One record read from the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

impl LogRecord {
    pub fn position(&self) -> LogPosition {
        LogPosition {
            topic: self.topic.clone(),
            partition: self.partition,
            offset: self.offset,
        }
    }
}

/// Producing side of a log.
#[async_trait]
pub trait LogProducer: Send + Sync {
    /// Enqueue `payload` and return without waiting for the broker.
    ///
    /// The receipt completes from a transport-owned task, never from the
    /// caller's.
    async fn publish(
        &self,
        topic: &str,
        key: Option<Bytes>,
        payload: Bytes,
    ) -> Result<DeliveryReceipt, TransportError>;

    /// Wait for queued messages to be delivered, up to `timeout`.
    async fn flush(&self, timeout: Duration) -> Result<(), TransportError>;
}

/// Consuming side of a log. Offsets are committed automatically.
#[async_trait]
pub trait LogConsumer: Send {
    async fn subscribe(&mut self, topics: &[String]) -> Result<(), TransportError>;

    /// Next record or transport error, or `None` when `timeout` passes first.
    async fn poll(&mut self, timeout: Duration) -> Option<Result<LogRecord, TransportError>>;

    /// Leave the group and release the subscription.
    async fn close(&mut self);
}
