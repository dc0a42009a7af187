//! SchemaFlow Schema Registry Client
//!
//! Typed access to a Confluent-compatible schema registry: subjects, versions,
//! compatibility levels, and schema lookup by global ID.
//!
//! # Features
//!
//! - **Typed operations**: register, look up, list, check, delete, configure
//! - **Classified errors**: 404s are distinguishable from rejections and outages
//! - **Local validation**: compatibility levels and schema files are checked
//!   before any request is sent
//! - **Local registry** (`server` feature): in-memory server speaking the same
//!   REST dialect, for tests and demos
//!
//! # Usage
//!
//! ```ignore
//! use schemaflow_registry::{load_schema_file, SchemaRegistryClient, VersionSelector};
//!
//! let client = SchemaRegistryClient::new("http://localhost:8081")?;
//! let definition = load_schema_file("schema/user_event.avsc")?;
//!
//! let registered = client.register_schema("user_events-value", &definition).await?;
//! let check = client
//!     .check_compatibility("user_events-value", &definition, VersionSelector::Latest)
//!     .await?;
//! assert!(check.is_compatible);
//! ```

pub mod client;
pub mod error;
pub mod source;
pub mod transport;
pub mod types;

#[cfg(feature = "server")]
pub mod server;

pub use client::SchemaRegistryClient;
pub use error::{error_codes, ApiError, RegistryError, Result};
pub use source::load_schema_file;
pub use transport::{RegistryClientConfig, SCHEMA_REGISTRY_CONTENT_TYPE};
pub use types::*;
