//! Record ⇄ envelope conversion.
//!
//! [`encode`] and [`decode`] are the stateless primitives; [`AvroSerializer`]
//! and [`AvroDeserializer`] bind them to a registry subject and resolver.

use crate::avro::{self, ParsedSchema};
use crate::envelope;
use crate::error::{CodecError, Result};
use crate::resolver::SchemaResolver;
use crate::subject::SubjectNameStrategy;
use apache_avro::types::Value;
use apache_avro::Schema;
use bytes::Bytes;
use schemaflow_registry::{RegisteredSchema, SchemaRegistryClient};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A decoded record and the schema ID it was written with
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub schema_id: u32,
    pub record: T,
}

impl Decoded<Value> {
    /// Convert the Avro value into an application type.
    pub fn into_record<T: DeserializeOwned>(self) -> Result<Decoded<T>> {
        Ok(Decoded {
            schema_id: self.schema_id,
            record: avro::from_value(&self.record)?,
        })
    }
}

/// Encode `record` against `schema` and frame it with `schema_id`.
pub fn encode<T: Serialize>(schema: &ParsedSchema, schema_id: u32, record: &T) -> Result<Bytes> {
    let payload = avro::encode_record(schema.schema(), record)?;
    Ok(envelope::frame(schema_id, &payload))
}

/// Decode an envelope with the writer schema from `resolver`.
pub async fn decode(data: &[u8], resolver: &dyn SchemaResolver) -> Result<Decoded<Value>> {
    decode_with_reader(data, resolver, None).await
}

/// Decode an envelope, resolving into `reader` when given.
///
/// A payload that does not decode with a cached writer schema evicts that
/// entry and is retried once with a freshly resolved one.
pub async fn decode_with_reader(
    data: &[u8],
    resolver: &dyn SchemaResolver,
    reader: Option<&Schema>,
) -> Result<Decoded<Value>> {
    let envelope = envelope::parse(data)?;
    let writer = resolver.resolve(envelope.schema_id).await?;
    let value = match avro::decode_value(writer.schema(), reader, envelope.payload) {
        Err(CodecError::Corrupt(reason)) => {
            if !resolver.evict(envelope.schema_id).await {
                return Err(CodecError::Corrupt(reason));
            }
            tracing::debug!(
                schema_id = envelope.schema_id,
                %reason,
                "Retrying decode with a fresh writer schema"
            );
            let writer = resolver.resolve(envelope.schema_id).await?;
            avro::decode_value(writer.schema(), reader, envelope.payload)?
        }
        decoded => decoded?,
    };
    Ok(Decoded {
        schema_id: envelope.schema_id,
        record: value,
    })
}

/// Encoder bound to one subject; registers its schema on first use.
///
/// The registration is cached for the lifetime of the serializer, so the
/// registry sees one request per process, not one per record.
pub struct AvroSerializer {
    client: Arc<SchemaRegistryClient>,
    subject: String,
    schema: ParsedSchema,
    registered: OnceCell<RegisteredSchema>,
}

impl AvroSerializer {
    pub fn new(
        client: Arc<SchemaRegistryClient>,
        strategy: &SubjectNameStrategy,
        definition: &str,
    ) -> Result<Self> {
        let schema = ParsedSchema::parse(definition)?;
        let subject = strategy.subject(&schema)?;
        Ok(Self {
            client,
            subject,
            schema,
            registered: OnceCell::new(),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn schema(&self) -> &ParsedSchema {
        &self.schema
    }

    /// Registration result, if the schema has been registered already.
    pub fn registered(&self) -> Option<RegisteredSchema> {
        self.registered.get().copied()
    }

    /// Register (once) and return the schema.
    pub async fn register(&self) -> Result<RegisteredSchema> {
        let registered = self
            .registered
            .get_or_try_init(|| async {
                let registered = self
                    .client
                    .register_schema(&self.subject, self.schema.definition())
                    .await?;
                tracing::info!(
                    subject = %self.subject,
                    schema_id = registered.id,
                    version = registered.version,
                    "Using registered schema"
                );
                Ok::<_, CodecError>(registered)
            })
            .await?;
        Ok(*registered)
    }

    /// Validate and encode `record`, then frame it with the registered ID.
    ///
    /// A record that does not fit the schema fails before anything is
    /// registered.
    pub async fn serialize<T: Serialize>(&self, record: &T) -> Result<Bytes> {
        let payload = avro::encode_record(self.schema.schema(), record)?;
        let registered = self.register().await?;
        Ok(envelope::frame(registered.id, &payload))
    }
}

/// Decoder resolving writer schemas by envelope ID.
pub struct AvroDeserializer {
    resolver: Arc<dyn SchemaResolver>,
    reader: Option<ParsedSchema>,
}

impl AvroDeserializer {
    pub fn new(resolver: Arc<dyn SchemaResolver>) -> Self {
        Self {
            resolver,
            reader: None,
        }
    }

    /// Resolve every record into `definition`, whatever version wrote it.
    pub fn with_reader_schema(mut self, definition: &str) -> Result<Self> {
        self.reader = Some(ParsedSchema::parse(definition)?);
        Ok(self)
    }

    pub async fn deserialize_value(&self, data: &[u8]) -> Result<Decoded<Value>> {
        let reader = self.reader.as_ref().map(ParsedSchema::schema);
        decode_with_reader(data, self.resolver.as_ref(), reader).await
    }

    pub async fn deserialize<T: DeserializeOwned>(&self, data: &[u8]) -> Result<Decoded<T>> {
        self.deserialize_value(data).await?.into_record()
    }
}
