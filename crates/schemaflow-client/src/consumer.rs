//! Consumer pipeline: log → envelope → schema lookup → typed record.
//!
//! ## State machine
//!
//! ```text
//! Idle ──start──▶ Polling ──record──▶ Delivering ──ok──▶ Polling
//!                    │                    │
//!                    │                    └──decode error──▶ Skipping ──▶ Polling
//!                    └──shutdown / fatal──▶ Stopped
//! ```
//!
//! A record that cannot be decoded never stops the loop: it surfaces as
//! [`ConsumerEvent::DecodeError`] and the next record is polled. Offsets are
//! committed by the transport, so delivery is at-least-once.

use crate::error::{ClientError, Result};
use crate::shutdown::ShutdownHandle;
use crate::transport::{LogConsumer, LogPosition, LogRecord, TransportError};
use bytes::Bytes;
use schemaflow_codec::{AvroDeserializer, CodecError, SchemaResolver};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Default wait per poll inside [`ConsumerPipeline::run`]
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Idle,
    Polling,
    Delivering,
    Skipping,
    Stopped,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsumerState::Idle => "idle",
            ConsumerState::Polling => "polling",
            ConsumerState::Delivering => "delivering",
            ConsumerState::Skipping => "skipping",
            ConsumerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A decoded record and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedEvent<T> {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub schema_id: u32,
    pub key: Option<Bytes>,
    pub record: T,
}

impl<T> ConsumedEvent<T> {
    pub fn position(&self) -> LogPosition {
        LogPosition {
            topic: self.topic.clone(),
            partition: self.partition,
            offset: self.offset,
        }
    }
}

/// A record that was read but could not be decoded.
#[derive(Debug)]
pub struct DecodeError {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub source: CodecError,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to decode {}[{}]@{}: {}",
            self.topic, self.partition, self.offset, self.source
        )
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// What one poll produced
#[derive(Debug)]
pub enum ConsumerEvent<T> {
    Record(ConsumedEvent<T>),
    DecodeError(DecodeError),
    TransportError(TransportError),
    /// Reached the current end of a partition. `run` does not hand these to
    /// the handler.
    EndOfPartition(LogPosition),
}

/// Consumer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    pub delivered: u64,
    pub decode_errors: u64,
    pub transport_errors: u64,
    pub end_of_partition: u64,
}

/// Reads records of type `T` from the subscribed topics.
pub struct ConsumerPipeline<T> {
    transport: Box<dyn LogConsumer>,
    deserializer: AvroDeserializer,
    topics: Vec<String>,
    poll_timeout: Duration,
    state: ConsumerState,
    stats: ConsumerStats,
    _record: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ConsumerPipeline<T> {
    pub fn new(
        transport: Box<dyn LogConsumer>,
        resolver: Arc<dyn SchemaResolver>,
        topics: Vec<String>,
    ) -> Self {
        Self {
            transport,
            deserializer: AvroDeserializer::new(resolver),
            topics,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            state: ConsumerState::Idle,
            stats: ConsumerStats::default(),
            _record: PhantomData,
        }
    }

    /// Decode every record into `definition` (reader schema).
    pub fn with_reader_schema(mut self, definition: &str) -> Result<Self> {
        self.deserializer = self.deserializer.with_reader_schema(definition)?;
        Ok(self)
    }

    /// Wait per poll used by `run`; also bounds how long shutdown takes.
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    fn transition(&mut self, next: ConsumerState) {
        if self.state != next {
            tracing::trace!(from = %self.state, to = %next, "Consumer state change");
            self.state = next;
        }
    }

    /// Subscribe to the configured topics.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != ConsumerState::Idle {
            return Err(ClientError::InvalidState(format!(
                "cannot start a consumer that is {}",
                self.state
            )));
        }
        if self.topics.is_empty() {
            return Err(ClientError::ConfigError(
                "consumer needs at least one topic".to_string(),
            ));
        }

        self.transport.subscribe(&self.topics).await?;
        tracing::info!(topics = ?self.topics, "Consumer subscribed");
        self.transition(ConsumerState::Polling);
        Ok(())
    }

    /// Wait up to `timeout` for the next event.
    ///
    /// `Ok(None)` means nothing arrived in time. Decode and transport
    /// failures are events, not errors; `Err` is only returned when the
    /// pipeline is not polling.
    pub async fn poll_event(&mut self, timeout: Duration) -> Result<Option<ConsumerEvent<T>>> {
        if self.state != ConsumerState::Polling {
            return Err(ClientError::InvalidState(format!(
                "cannot poll a consumer that is {}",
                self.state
            )));
        }

        let event = match self.transport.poll(timeout).await {
            None => return Ok(None),
            Some(Ok(record)) => self.deliver(record).await,
            Some(Err(e)) if e.is_partition_eof() => {
                self.stats.end_of_partition += 1;
                tracing::debug!(position = ?e.position, "{}", e);
                let position = e.position.unwrap_or_else(|| LogPosition {
                    topic: String::new(),
                    partition: -1,
                    offset: -1,
                });
                ConsumerEvent::EndOfPartition(position)
            }
            Some(Err(e)) => {
                self.stats.transport_errors += 1;
                tracing::warn!(fatal = e.is_fatal(), error = %e, "Consumer transport error");
                ConsumerEvent::TransportError(e)
            }
        };
        Ok(Some(event))
    }

    async fn deliver(&mut self, record: LogRecord) -> ConsumerEvent<T> {
        self.transition(ConsumerState::Delivering);

        let decoded = match record.value.as_deref() {
            Some(value) => self.deserializer.deserialize::<T>(value).await,
            None => Err(CodecError::Corrupt("record has no value".to_string())),
        };

        let event = match decoded {
            Ok(decoded) => {
                self.stats.delivered += 1;
                tracing::debug!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    schema_id = decoded.schema_id,
                    "Record decoded"
                );
                ConsumerEvent::Record(ConsumedEvent {
                    topic: record.topic,
                    partition: record.partition,
                    offset: record.offset,
                    schema_id: decoded.schema_id,
                    key: record.key,
                    record: decoded.record,
                })
            }
            Err(source) => {
                self.transition(ConsumerState::Skipping);
                self.stats.decode_errors += 1;
                tracing::warn!(
                    topic = %record.topic,
                    partition = record.partition,
                    offset = record.offset,
                    error = %source,
                    "Skipping undecodable record"
                );
                ConsumerEvent::DecodeError(DecodeError {
                    topic: record.topic,
                    partition: record.partition,
                    offset: record.offset,
                    source,
                })
            }
        };

        self.transition(ConsumerState::Polling);
        event
    }

    /// Poll and hand events to `handler` until `shutdown` fires or the
    /// transport fails fatally. Starts the pipeline if needed and always
    /// releases the subscription before returning.
    ///
    /// End-of-partition events are counted but not handed to `handler`.
    pub async fn run<F>(&mut self, shutdown: ShutdownHandle, mut handler: F) -> Result<ConsumerStats>
    where
        F: FnMut(ConsumerEvent<T>) + Send,
    {
        if self.state == ConsumerState::Idle {
            self.start().await?;
        }

        loop {
            if shutdown.is_shutdown() {
                tracing::info!(signal = ?shutdown.signal(), "Consumer shutting down");
                break;
            }

            match self.poll_event(self.poll_timeout).await {
                Ok(None) | Ok(Some(ConsumerEvent::EndOfPartition(_))) => {}
                Ok(Some(ConsumerEvent::TransportError(e))) if e.is_fatal() => {
                    tracing::error!(error = %e, "Fatal transport error, stopping consumer");
                    handler(ConsumerEvent::TransportError(e));
                    break;
                }
                Ok(Some(event)) => handler(event),
                Err(e) => {
                    self.close().await;
                    return Err(e);
                }
            }
        }

        self.close().await;
        Ok(self.stats)
    }

    /// Release the subscription. Idempotent.
    pub async fn close(&mut self) {
        if self.state == ConsumerState::Stopped {
            return;
        }
        if self.state != ConsumerState::Idle {
            self.transport.close().await;
        }
        self.transition(ConsumerState::Stopped);
        tracing::info!(
            delivered = self.stats.delivered,
            decode_errors = self.stats.decode_errors,
            transport_errors = self.stats.transport_errors,
            "Consumer stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::MemoryLog;
    use schemaflow_codec::{encode, ParsedSchema, StaticResolver};
    use serde::Deserialize;

    const PAGE_VIEW: &str = r#"{"type":"record","name":"PageView","fields":[
        {"name":"user_id","type":"int"},
        {"name":"page","type":"string"}]}"#;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct PageView {
        user_id: i32,
        page: String,
    }

    fn resolver() -> Arc<StaticResolver> {
        Arc::new(StaticResolver::new().with_schema(1, ParsedSchema::parse(PAGE_VIEW).unwrap()))
    }

    fn envelope(user_id: i32) -> Bytes {
        let schema = ParsedSchema::parse(PAGE_VIEW).unwrap();
        let view = PageView {
            user_id,
            page: "/".to_string(),
        };
        encode(&schema, 1, &view).unwrap()
    }

    fn pipeline(log: &MemoryLog) -> ConsumerPipeline<PageView> {
        ConsumerPipeline::new(
            Box::new(log.consumer("views-group")),
            resolver(),
            vec!["views".to_string()],
        )
        .poll_timeout(Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_poll_before_start_is_rejected() {
        let log = MemoryLog::new();
        let mut consumer = pipeline(&log);
        assert_eq!(consumer.state(), ConsumerState::Idle);

        let err = consumer.poll_event(Duration::from_millis(10)).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_decode_error_does_not_stop_polling() {
        let log = MemoryLog::new();
        log.append_raw("views", 0, envelope(1)).await;
        log.append_raw("views", 0, &b"\x00\x00\x00\x00\x01\xff\xff"[..]).await;
        log.append_raw("views", 0, envelope(2)).await;

        let mut consumer = pipeline(&log);
        consumer.start().await.unwrap();
        assert_eq!(consumer.state(), ConsumerState::Polling);

        let timeout = Duration::from_millis(50);
        let first = consumer.poll_event(timeout).await.unwrap().unwrap();
        assert!(matches!(first, ConsumerEvent::Record(ref e) if e.record.user_id == 1));

        match consumer.poll_event(timeout).await.unwrap().unwrap() {
            ConsumerEvent::DecodeError(e) => {
                assert_eq!(e.offset, 1);
                assert!(e.source.is_record_error());
            }
            other => panic!("expected decode error, got {:?}", other),
        }
        assert_eq!(consumer.state(), ConsumerState::Polling);

        let third = consumer.poll_event(timeout).await.unwrap().unwrap();
        assert!(matches!(third, ConsumerEvent::Record(ref e) if e.record.user_id == 2));

        let eof = consumer.poll_event(timeout).await.unwrap().unwrap();
        assert!(matches!(eof, ConsumerEvent::EndOfPartition(ref p) if p.offset == 3));

        let stats = consumer.stats();
        assert_eq!((stats.delivered, stats.decode_errors, stats.end_of_partition), (2, 1, 1));
    }

    #[tokio::test]
    async fn test_unknown_schema_and_foreign_marker_are_skipped() {
        let log = MemoryLog::new();
        let mut unknown = envelope(1).to_vec();
        unknown[4] = 9;
        log.append_raw("views", 0, unknown).await;
        log.append_raw("views", 0, &b"{\"user_id\":1}"[..]).await;

        let mut consumer = pipeline(&log);
        consumer.start().await.unwrap();

        let timeout = Duration::from_millis(50);
        let mut sources = Vec::new();
        for _ in 0..2 {
            if let Some(ConsumerEvent::DecodeError(e)) = consumer.poll_event(timeout).await.unwrap() {
                sources.push(e.source);
            }
        }
        assert!(matches!(sources[0], CodecError::SchemaNotFound { id: 9, .. }));
        assert!(matches!(sources[1], CodecError::UnsupportedEnvelope(b'{')));
    }

    #[tokio::test]
    async fn test_run_stops_on_fatal_transport_error() {
        let log = MemoryLog::new();
        log.append_raw("views", 0, envelope(1)).await;
        log.inject_error("views-group", TransportError::fatal("broker connection lost"))
            .await;

        let mut consumer = pipeline(&log);
        let mut events = Vec::new();
        let stats = consumer
            .run(ShutdownHandle::new(), |event| events.push(event))
            .await
            .unwrap();

        assert_eq!(consumer.state(), ConsumerState::Stopped);
        assert_eq!(stats.transport_errors, 1);
        assert!(matches!(events.last(), Some(ConsumerEvent::TransportError(e)) if e.is_fatal()));
    }

    #[tokio::test]
    async fn test_run_returns_promptly_after_shutdown() {
        let log = MemoryLog::new();
        let shutdown = ShutdownHandle::new();
        shutdown.shutdown();

        let mut consumer = pipeline(&log);
        let stats = consumer.run(shutdown, |_| {}).await.unwrap();
        assert_eq!(stats, ConsumerStats::default());
        assert_eq!(consumer.state(), ConsumerState::Stopped);

        let err = consumer.start().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
    }
}
