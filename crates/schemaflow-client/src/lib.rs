//! SchemaFlow Client - Producer and Consumer Pipelines
//!
//! Typed, schema-governed publishing and consuming over a partitioned log.
//! Records are encoded with a registered Avro schema and framed with its ID
//! (see `schemaflow-codec`); consumers resolve that ID and decode.
//!
//! # Examples
//!
//! ## Producer
//!
//! ```ignore
//! use schemaflow_client::{ProducerPipeline, transport::memory::MemoryLog};
//!
//! let log = MemoryLog::new();
//! let pipeline = ProducerPipeline::<UserEvent>::new(
//!     Arc::new(log.producer()),
//!     registry_client,
//!     "user_events",
//!     &definition,
//! )?;
//! let handle = pipeline.publish(None, &event).await?;
//! ```
//!
//! ## Consumer
//!
//! ```ignore
//! use schemaflow_client::{ConsumerEvent, ConsumerPipeline, ShutdownHandle};
//!
//! let mut consumer = ConsumerPipeline::<UserEvent>::new(
//!     Box::new(log.consumer("consumer_group")),
//!     Arc::new(RegistryResolver::new(registry_client)),
//!     vec!["user_events".to_string()],
//! );
//! consumer.run(shutdown, |event| match event {
//!     ConsumerEvent::Record(e) => println!("{:?}", e.record),
//!     other => eprintln!("{:?}", other),
//! }).await?;
//! ```

pub mod consumer;
pub mod error;
pub mod producer;
pub mod shutdown;
pub mod transport;

pub use consumer::{
    ConsumedEvent, ConsumerEvent, ConsumerPipeline, ConsumerState, ConsumerStats, DecodeError,
    DEFAULT_POLL_TIMEOUT,
};
pub use error::{ClientError, Result};
pub use producer::{DeliveryHandle, ProducerPipeline, ProducerStats};
pub use shutdown::{shutdown_signal, ShutdownHandle, ShutdownSignal};
pub use transport::{
    DeliveryOutcome, DeliveryReceipt, LogConsumer, LogPosition, LogProducer, LogRecord,
    TransportError, TransportErrorKind,
};
