//! Kafka transport over librdkafka.
//!
//! Producers enqueue through a `FutureProducer` and resolve delivery reports
//! on a spawned task. Consumers read through a `StreamConsumer` with
//! automatic offset commits and partition EOF reporting enabled.

use super::{
    DeliveryOutcome, DeliveryReceipt, LogConsumer, LogPosition, LogProducer, LogRecord,
    TransportError,
};
use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::config::{ClientConfig, RDKafkaLogLevel};
use rdkafka::consumer::{Consumer, ConsumerContext, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::{ClientContext, Offset};
use std::collections::HashMap;
use std::time::Duration;

/// Forwards librdkafka's own log lines and client errors into `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingContext;

impl ClientContext for TracingContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        match level {
            RDKafkaLogLevel::Emerg
            | RDKafkaLogLevel::Alert
            | RDKafkaLogLevel::Critical
            | RDKafkaLogLevel::Error => tracing::error!(target: "librdkafka", fac, "{}", log_message),
            RDKafkaLogLevel::Warning => tracing::warn!(target: "librdkafka", fac, "{}", log_message),
            RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => {
                tracing::info!(target: "librdkafka", fac, "{}", log_message)
            }
            RDKafkaLogLevel::Debug => tracing::debug!(target: "librdkafka", fac, "{}", log_message),
        }
    }

    fn error(&self, error: KafkaError, reason: &str) {
        tracing::error!(target: "librdkafka", error = %error, "{}", reason);
    }
}

impl ConsumerContext for TracingContext {}

/// Connection settings shared by producers and consumers.
#[derive(Debug, Clone)]
pub struct KafkaLog {
    bootstrap_servers: String,
    client_id: Option<String>,
    message_timeout: Duration,
}

impl KafkaLog {
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            client_id: None,
            message_timeout: Duration::from_secs(5),
        }
    }

    /// How long librdkafka keeps retrying a message before reporting failure.
    pub fn message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout = timeout;
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn bootstrap_servers(&self) -> &str {
        &self.bootstrap_servers
    }

    fn base_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        if let Some(client_id) = &self.client_id {
            config.set("client.id", client_id);
        }
        config
    }

    pub fn producer(&self) -> Result<KafkaProducer, TransportError> {
        let producer: FutureProducer<TracingContext> = self
            .base_config()
            .set(
                "message.timeout.ms",
                self.message_timeout.as_millis().to_string(),
            )
            .create_with_context(TracingContext)
            .map_err(|e| TransportError::fatal(format!("Failed to create producer: {}", e)))?;

        tracing::info!(brokers = %self.bootstrap_servers, "Kafka producer created");
        Ok(KafkaProducer { producer })
    }

    pub fn consumer(&self, group_id: &str) -> Result<KafkaConsumer, TransportError> {
        let consumer: StreamConsumer<TracingContext> = self
            .base_config()
            .set("group.id", group_id)
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "true")
            .set("enable.partition.eof", "true")
            .create_with_context(TracingContext)
            .map_err(|e| TransportError::fatal(format!("Failed to create consumer: {}", e)))?;

        tracing::info!(brokers = %self.bootstrap_servers, group = %group_id, "Kafka consumer created");
        Ok(KafkaConsumer {
            consumer,
            topics: Vec::new(),
            progress: ReadProgress::default(),
        })
    }
}

pub struct KafkaProducer {
    producer: FutureProducer<TracingContext>,
}

#[async_trait]
impl LogProducer for KafkaProducer {
    async fn publish(
        &self,
        topic: &str,
        key: Option<Bytes>,
        payload: Bytes,
    ) -> Result<DeliveryReceipt, TransportError> {
        let mut record = FutureRecord::<[u8], [u8]>::to(topic).payload(&payload[..]);
        if let Some(key) = key.as_deref() {
            record = record.key(key);
        }

        let delivery = self
            .producer
            .send_result(record)
            .map_err(|(e, _)| TransportError::other(format!("Failed to enqueue message: {}", e)))?;

        let (sender, receipt) = DeliveryReceipt::channel();
        tokio::spawn(async move {
            let outcome = match delivery.await {
                Ok(Ok((partition, offset))) => DeliveryOutcome::Delivered { partition, offset },
                Ok(Err((e, _))) => DeliveryOutcome::Failed(e.to_string()),
                Err(_) => DeliveryOutcome::Failed("producer dropped before delivery".to_string()),
            };
            let _ = sender.send(outcome);
        });

        Ok(receipt)
    }

    async fn flush(&self, timeout: Duration) -> Result<(), TransportError> {
        let producer = self.producer.clone();
        tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| TransportError::other(format!("Flush task failed: {}", e)))?
            .map_err(|e| TransportError::other(format!("Flush failed: {}", e)))
    }
}

/// Next offset per partition read so far, in read order.
///
/// librdkafka reports partition EOF with the partition number only, so the
/// topic and offset of an EOF are recovered from here.
#[derive(Debug, Default)]
struct ReadProgress {
    next: HashMap<(String, i32), (i64, u64)>,
    reads: u64,
}

impl ReadProgress {
    fn record(&mut self, topic: &str, partition: i32, offset: i64) {
        self.reads += 1;
        self.next
            .insert((topic.to_string(), partition), (offset + 1, self.reads));
    }

    /// The candidate topic whose `partition` was read most recently, with the
    /// next offset when anything was read from it.
    ///
    /// Several topics can share a partition number; the one read last is the
    /// one that just drained.
    fn drained(&self, candidates: &[String], partition: i32) -> Option<(String, Option<i64>)> {
        let progress = |topic: &String| self.next.get(&(topic.clone(), partition)).copied();
        let topic = candidates
            .iter()
            .max_by_key(|topic| progress(topic).map(|(_, seq)| seq))?;
        Some((topic.clone(), progress(topic).map(|(next, _)| next)))
    }

    fn clear(&mut self) {
        self.next.clear();
        self.reads = 0;
    }
}

pub struct KafkaConsumer {
    consumer: StreamConsumer<TracingContext>,
    topics: Vec<String>,
    progress: ReadProgress,
}

impl KafkaConsumer {
    fn classify(&self, err: KafkaError) -> TransportError {
        match err {
            KafkaError::PartitionEOF(partition) => {
                TransportError::partition_eof(self.eof_position(partition))
            }
            KafkaError::MessageConsumption(RDKafkaErrorCode::Fatal) => {
                TransportError::fatal(err.to_string())
            }
            other => TransportError::other(other.to_string()),
        }
    }

    /// Topics currently assigned to this consumer with the given partition.
    fn assigned_topics(&self, partition: i32) -> Vec<String> {
        match self.consumer.assignment() {
            Ok(list) => list
                .elements()
                .iter()
                .filter(|elem| elem.partition() == partition)
                .map(|elem| elem.topic().to_string())
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "Could not read consumer assignment");
                Vec::new()
            }
        }
    }

    /// Position librdkafka holds for a partition nothing was read from yet.
    fn fetch_position(&self, topic: &str, partition: i32) -> i64 {
        let list = match self.consumer.position() {
            Ok(list) => list,
            Err(_) => return 0,
        };
        let offset = list
            .find_partition(topic, partition)
            .map(|elem| elem.offset());
        match offset {
            Some(Offset::Offset(next)) => next,
            _ => 0,
        }
    }

    /// Where `partition` ran dry: its topic and the next offset to read.
    fn eof_position(&self, partition: i32) -> LogPosition {
        let mut candidates = self.assigned_topics(partition);
        if candidates.is_empty() {
            candidates = self.topics.clone();
        }

        match self.progress.drained(&candidates, partition) {
            Some((topic, Some(offset))) => LogPosition {
                topic,
                partition,
                offset,
            },
            Some((topic, None)) => {
                let offset = self.fetch_position(&topic, partition);
                LogPosition {
                    topic,
                    partition,
                    offset,
                }
            }
            None => LogPosition {
                topic: String::new(),
                partition,
                offset: 0,
            },
        }
    }
}

#[async_trait]
impl LogConsumer for KafkaConsumer {
    async fn subscribe(&mut self, topics: &[String]) -> Result<(), TransportError> {
        let names: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.consumer
            .subscribe(&names)
            .map_err(|e| TransportError::fatal(format!("Failed to subscribe: {}", e)))?;
        self.topics = topics.to_vec();
        self.progress.clear();
        Ok(())
    }

    async fn poll(&mut self, timeout: Duration) -> Option<Result<LogRecord, TransportError>> {
        let received = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Ok(received) => received,
            Err(_) => return None,
        };

        Some(match received {
            Ok(message) => {
                self.progress
                    .record(message.topic(), message.partition(), message.offset());
                Ok(LogRecord {
                    topic: message.topic().to_string(),
                    partition: message.partition(),
                    offset: message.offset(),
                    key: message.key().map(Bytes::copy_from_slice),
                    value: message.payload().map(Bytes::copy_from_slice),
                })
            }
            Err(e) => Err(self.classify(e)),
        })
    }

    async fn close(&mut self) {
        self.consumer.unsubscribe();
        tracing::info!(topics = ?self.topics, "Kafka consumer closed");
    }
}
