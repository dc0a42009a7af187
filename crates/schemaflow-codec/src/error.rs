//! Codec errors.
//!
//! Decode failures (`UnsupportedEnvelope`, `Corrupt`, `SchemaNotFound`) are
//! per-record: a consumer logs them and moves on to the next record.

use schemaflow_registry::RegistryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Debug, Error)]
pub enum CodecError {
    /// First byte is not a known envelope marker.
    #[error("Unsupported envelope marker 0x{0:02x}")]
    UnsupportedEnvelope(u8),

    /// Envelope or payload bytes are damaged (short header, truncated or
    /// trailing payload, value not matching the writer schema).
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    /// The schema ID in the envelope could not be resolved.
    #[error("Schema {id} not found: {reason}")]
    SchemaNotFound { id: u32, reason: String },

    /// A record did not fit the schema it was being encoded with.
    #[error("Record does not match schema: {0}")]
    SchemaMismatch(String),

    /// A definition could not be parsed as Avro.
    #[error("Invalid Avro schema: {0}")]
    InvalidSchema(String),

    /// Registry call failed while registering or resolving a schema.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl CodecError {
    /// True for failures tied to one record's bytes rather than to the codec setup.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self,
            CodecError::UnsupportedEnvelope(_)
                | CodecError::Corrupt(_)
                | CodecError::SchemaNotFound { .. }
        )
    }
}
