//! Wiring from `AppConfig` to running pipelines.

use crate::config::{AppConfig, ConfigError, TransportKind};
use crate::models::UserEvent;
use schemaflow_client::transport::memory::MemoryLog;
use schemaflow_client::{ConsumerPipeline, LogConsumer, LogProducer, ProducerPipeline, Result};
use schemaflow_codec::RegistryResolver;
use schemaflow_registry::{load_schema_file, SchemaRegistryClient};
use std::sync::Arc;

#[cfg(feature = "kafka")]
use schemaflow_client::transport::kafka::KafkaLog;

/// The log both pipelines run over
#[derive(Clone)]
pub enum LogBackend {
    Memory(MemoryLog),
    #[cfg(feature = "kafka")]
    Kafka(KafkaLog),
}

impl LogBackend {
    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, ConfigError> {
        match config.transport {
            TransportKind::Memory => Ok(LogBackend::Memory(MemoryLog::new())),
            #[cfg(feature = "kafka")]
            TransportKind::Kafka => Ok(LogBackend::Kafka(
                KafkaLog::new(&config.bootstrap_servers).client_id(&config.client_id),
            )),
            #[cfg(not(feature = "kafka"))]
            TransportKind::Kafka => Err(ConfigError::Invalid(
                "transport 'kafka' needs a build with the `kafka` feature".to_string(),
            )),
        }
    }

    pub fn producer(&self) -> Result<Arc<dyn LogProducer>> {
        match self {
            LogBackend::Memory(log) => Ok(Arc::new(log.producer())),
            #[cfg(feature = "kafka")]
            LogBackend::Kafka(log) => Ok(Arc::new(log.producer()?)),
        }
    }

    pub fn consumer(&self, group_id: &str) -> Result<Box<dyn LogConsumer>> {
        match self {
            LogBackend::Memory(log) => Ok(Box::new(log.consumer(group_id))),
            #[cfg(feature = "kafka")]
            LogBackend::Kafka(log) => Ok(Box::new(log.consumer(group_id)?)),
        }
    }
}

/// Registry client plus the parsed-and-validated event schema.
pub struct Registry {
    pub client: Arc<SchemaRegistryClient>,
    pub definition: String,
}

impl Registry {
    pub fn connect(config: &AppConfig) -> Result<Self> {
        let client = Arc::new(SchemaRegistryClient::new(&config.registry_url)?);
        let definition = load_schema_file(&config.schema_file)?;
        Ok(Self { client, definition })
    }
}

pub fn user_event_producer(
    config: &AppConfig,
    backend: &LogBackend,
    registry: &Registry,
) -> Result<ProducerPipeline<UserEvent>> {
    ProducerPipeline::new(
        backend.producer()?,
        Arc::clone(&registry.client),
        &config.topic,
        &registry.definition,
    )
}

/// Consumer that decodes into the local schema file, so older writer
/// versions resolve into the current `UserEvent` shape.
pub fn user_event_consumer(
    config: &AppConfig,
    backend: &LogBackend,
    registry: &Registry,
) -> Result<ConsumerPipeline<UserEvent>> {
    let consumer = ConsumerPipeline::new(
        backend.consumer(&config.consumer_group)?,
        Arc::new(RegistryResolver::new(Arc::clone(&registry.client))),
        vec![config.topic.clone()],
    )
    .with_reader_schema(&registry.definition)?
    .poll_timeout(config.poll_timeout());
    Ok(consumer)
}
