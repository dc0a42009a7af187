//! Error types for producer and consumer pipelines.
//!
//! ## Error Handling Strategy
//!
//! - **Per-record, never fatal to a consumer**: decode failures surface as
//!   `ConsumerEvent::DecodeError`, not as `ClientError`
//! - **Producer setup**: `Codec`, `Registry` (schema registration failed)
//! - **Log transport**: `Transport`
//! - **Lifecycle misuse**: `InvalidState`, `OutcomeAlreadyConsumed`
//!
//! ## Examples
//!
//! ```ignore
//! match pipeline.publish(None, &event).await {
//!     Ok(handle) => { /* delivery reported later */ }
//!     Err(ClientError::Codec(e)) => eprintln!("event rejected: {}", e),
//!     Err(e) => eprintln!("publish failed: {}", e),
//! }
//! ```

use crate::transport::TransportError;
use schemaflow_codec::CodecError;
use schemaflow_registry::RegistryError;
use thiserror::Error;

/// Convenience type alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Encoding or decoding failed.
    ///
    /// ## Causes
    /// - The record does not match the schema (`SchemaMismatch`)
    /// - The schema could not be registered or resolved
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Registry call failed outside the codec.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The log transport refused or failed an operation.
    ///
    /// ## Resolution
    /// - Check broker connectivity (`bootstrap.servers`)
    /// - Check that the topic exists
    #[error("Log transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Operation not allowed in the pipeline's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// `DeliveryHandle::wait` called twice.
    #[error("Delivery outcome already consumed")]
    OutcomeAlreadyConsumed,
}
