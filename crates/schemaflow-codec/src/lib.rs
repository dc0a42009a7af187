//! SchemaFlow Wire Codec
//!
//! Turns application records into schema-tagged Avro envelopes and back.
//!
//! ```text
//! ┌────────┬──────────────────────┬───────────────────────┐
//! │ 0x00   │ schema id (u32, BE)  │ Avro binary payload   │
//! └────────┴──────────────────────┴───────────────────────┘
//! ```
//!
//! The schema ID ties every record to the exact definition it was written
//! with; consumers resolve that ID (through a bounded cache) and decode, and
//! may resolve into a newer reader schema.
//!
//! # Usage
//!
//! ```ignore
//! use schemaflow_codec::{AvroSerializer, AvroDeserializer, RegistryResolver, SubjectNameStrategy};
//!
//! let serializer = AvroSerializer::new(
//!     client.clone(),
//!     &SubjectNameStrategy::topic_value("user_events"),
//!     &definition,
//! )?;
//! let bytes = serializer.serialize(&event).await?;
//!
//! let deserializer = AvroDeserializer::new(Arc::new(RegistryResolver::new(client)));
//! let decoded: Decoded<UserEvent> = deserializer.deserialize(&bytes).await?;
//! ```

pub mod avro;
pub mod cache;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod resolver;
pub mod subject;

pub use avro::ParsedSchema;
pub use cache::{CacheStats, SchemaCache};
pub use codec::{decode, decode_with_reader, encode, AvroDeserializer, AvroSerializer, Decoded};
pub use envelope::{Envelope, HEADER_LEN, MAGIC_BYTE};
pub use error::{CodecError, Result};
pub use resolver::{RegistryResolver, SchemaResolver, StaticResolver};
pub use subject::SubjectNameStrategy;

pub use apache_avro::types::Value as AvroValue;
