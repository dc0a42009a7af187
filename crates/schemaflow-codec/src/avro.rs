//! Avro payload encoding.

use crate::error::{CodecError, Result};
use apache_avro::types::Value;
use apache_avro::Schema;
use serde::{de::DeserializeOwned, Serialize};

/// A definition together with its parsed Avro schema
#[derive(Debug, Clone)]
pub struct ParsedSchema {
    definition: String,
    schema: Schema,
}

impl ParsedSchema {
    pub fn parse(definition: &str) -> Result<Self> {
        let schema =
            Schema::parse_str(definition).map_err(|e| CodecError::InvalidSchema(e.to_string()))?;
        Ok(Self {
            definition: definition.to_string(),
            schema,
        })
    }

    /// The definition as it was written (not canonicalized)
    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Fully qualified name for named top-level types (record, enum, fixed).
    pub fn full_name(&self) -> Option<String> {
        let name = match &self.schema {
            Schema::Record(r) => &r.name,
            Schema::Enum(e) => &e.name,
            Schema::Fixed(f) => &f.name,
            _ => return None,
        };
        Some(name.fullname(None))
    }
}

/// Serialize `record` against `schema`.
///
/// The record is first resolved against the schema, so missing fields and
/// type mismatches fail here with `SchemaMismatch` instead of producing bytes
/// no consumer can read.
pub fn encode_record<T: Serialize>(schema: &Schema, record: &T) -> Result<Vec<u8>> {
    let value =
        apache_avro::to_value(record).map_err(|e| CodecError::SchemaMismatch(e.to_string()))?;
    encode_value(schema, value)
}

pub fn encode_value(schema: &Schema, value: Value) -> Result<Vec<u8>> {
    let resolved = value
        .resolve(schema)
        .map_err(|e| CodecError::SchemaMismatch(e.to_string()))?;
    apache_avro::to_avro_datum(schema, resolved)
        .map_err(|e| CodecError::SchemaMismatch(e.to_string()))
}

/// Decode one payload written with `writer`, optionally resolved into `reader`.
///
/// The payload must be consumed exactly; leftover bytes mean the record was
/// not written with `writer`.
pub fn decode_value(writer: &Schema, reader: Option<&Schema>, payload: &[u8]) -> Result<Value> {
    let mut cursor = payload;
    let value = apache_avro::from_avro_datum(writer, &mut cursor, reader)
        .map_err(|e| CodecError::Corrupt(e.to_string()))?;

    if !cursor.is_empty() {
        return Err(CodecError::Corrupt(format!(
            "{} trailing bytes after payload",
            cursor.len()
        )));
    }
    Ok(value)
}

/// Convert a decoded value into an application type.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    apache_avro::from_value(value).map_err(|e| CodecError::Corrupt(e.to_string()))
}
