//! Subject naming for registered schemas.

use crate::avro::ParsedSchema;
use crate::error::{CodecError, Result};

/// How the registry subject is derived for a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectNameStrategy {
    /// `{topic}-value` or `{topic}-key`
    TopicName { topic: String, is_key: bool },
    /// The record's fully qualified name
    RecordName,
    /// `{topic}-{record full name}`
    TopicRecordName { topic: String },
}

impl SubjectNameStrategy {
    /// Value subject for `topic`, the default for producers
    pub fn topic_value(topic: impl Into<String>) -> Self {
        SubjectNameStrategy::TopicName {
            topic: topic.into(),
            is_key: false,
        }
    }

    pub fn topic_key(topic: impl Into<String>) -> Self {
        SubjectNameStrategy::TopicName {
            topic: topic.into(),
            is_key: true,
        }
    }

    /// Subject for `schema` under this strategy.
    ///
    /// Record-based strategies need a named top-level type.
    pub fn subject(&self, schema: &ParsedSchema) -> Result<String> {
        match self {
            SubjectNameStrategy::TopicName { topic, is_key } => {
                let suffix = if *is_key { "key" } else { "value" };
                Ok(format!("{}-{}", topic, suffix))
            }
            SubjectNameStrategy::RecordName => record_name(schema),
            SubjectNameStrategy::TopicRecordName { topic } => {
                Ok(format!("{}-{}", topic, record_name(schema)?))
            }
        }
    }
}

fn record_name(schema: &ParsedSchema) -> Result<String> {
    schema.full_name().ok_or_else(|| {
        CodecError::SchemaMismatch(
            "record-based subject naming needs a named top-level schema".to_string(),
        )
    })
}
