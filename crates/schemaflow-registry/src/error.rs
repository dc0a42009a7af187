//! Error types for schema registry operations.
//!
//! Every failed registry call lands in [`RegistryError`]. Non-2xx responses keep
//! the HTTP status, the registry's numeric `error_code` and its message in an
//! [`ApiError`], and are classified into the variant callers branch on.
//!
//! ## Error Handling Strategy
//!
//! - **Absent, not fatal**: `NotFound` (use [`RegistryError::is_not_found`])
//! - **Transient**: `Unavailable`
//! - **Rejected content**: `IncompatibleSchema`, `InvalidSchema`
//! - **Caller mistakes**: `InvalidArgument`, `Io`, `MalformedDefinition`
//! - **Everything else**: `Http`, `Protocol`
//!
//! ## Examples
//!
//! ```ignore
//! match client.get_schema("orders-value", VersionSelector::Latest).await {
//!     Ok(version) => println!("latest is v{}", version.version),
//!     Err(e) if e.is_not_found() => println!("no schema yet"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience type alias for `Result<T, RegistryError>`.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Numeric error codes used in registry error bodies.
pub mod error_codes {
    pub const SUBJECT_NOT_FOUND: u32 = 40401;
    pub const VERSION_NOT_FOUND: u32 = 40402;
    pub const SCHEMA_NOT_FOUND: u32 = 40403;
    pub const INCOMPATIBLE_SCHEMA: u32 = 409;
    pub const INVALID_SCHEMA: u32 = 42201;
    pub const INVALID_VERSION: u32 = 42202;
    pub const INVALID_COMPATIBILITY_LEVEL: u32 = 42203;
    pub const INTERNAL_ERROR: u32 = 50001;
}

/// Details of a non-2xx registry response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Registry-specific error code from the response body, when present
    pub error_code: Option<u32>,
    /// Human-readable message (response body text when it was not JSON)
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    error_code: Option<u32>,
    message: Option<String>,
}

impl ApiError {
    /// Build from a status code and the raw response body.
    pub fn from_body(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self {
                status,
                error_code: parsed.error_code,
                message: parsed.message.unwrap_or_else(|| body.to_string()),
            },
            Err(_) => Self {
                status,
                error_code: None,
                message: body.trim().to_string(),
            },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_code {
            Some(code) => write!(f, "HTTP {} (error {}): {}", self.status, code, self.message),
            None => write!(f, "HTTP {}: {}", self.status, self.message),
        }
    }
}

/// Error type for registry client operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry could not be reached (connection refused, DNS, timeout).
    ///
    /// ## Resolution
    /// - Verify the registry URL
    /// - Retry; the client never retries on its own
    #[error("Schema registry unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),

    /// Subject, version or schema ID does not exist (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(ApiError),

    /// Content rejected against the active compatibility level (HTTP 409).
    ///
    /// `messages` carries the registry's explanation when it gave one.
    #[error("Schema is incompatible: {}", .messages.join("; "))]
    IncompatibleSchema { messages: Vec<String> },

    /// Malformed schema definition (HTTP 422 / 42201).
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// A caller-supplied value was rejected, locally or by the registry.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Any other non-2xx response.
    #[error("Registry request failed: {0}")]
    Http(ApiError),

    /// A 2xx response whose body did not match the expected shape.
    #[error("Unexpected registry response: {0}")]
    Protocol(String),

    /// A schema source file could not be read.
    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A schema source file is not valid JSON.
    #[error("Schema file {path} is not valid JSON: {source}")]
    MalformedDefinition {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl RegistryError {
    /// Classify a non-2xx response.
    pub fn from_api(api: ApiError) -> Self {
        match (api.status, api.error_code) {
            (404, _) => RegistryError::NotFound(api),
            (409, _) => RegistryError::IncompatibleSchema {
                messages: vec![api.message],
            },
            (_, Some(error_codes::INVALID_SCHEMA)) => RegistryError::InvalidSchema(api.message),
            (
                _,
                Some(error_codes::INVALID_VERSION | error_codes::INVALID_COMPATIBILITY_LEVEL),
            ) => RegistryError::InvalidArgument(api.message),
            (422, None) => RegistryError::InvalidSchema(api.message),
            // Some registries answer a schema that fails to parse with a bare 400.
            (400, _) if api.message.to_ascii_lowercase().contains("invalid schema") => {
                RegistryError::InvalidSchema(api.message)
            }
            _ => RegistryError::Http(api),
        }
    }

    /// True when the registry answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound(_))
    }

    /// True for failures worth retrying by the caller.
    pub fn is_transient(&self) -> bool {
        match self {
            RegistryError::Unavailable(_) => true,
            RegistryError::Http(api) => api.status >= 500,
            _ => false,
        }
    }

    /// HTTP status behind this error, if it came from a response.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            RegistryError::NotFound(api) | RegistryError::Http(api) => Some(api.status),
            RegistryError::IncompatibleSchema { .. } => Some(409),
            RegistryError::InvalidSchema(_) => Some(422),
            _ => None,
        }
    }

    /// Registry error code behind this error, if any.
    pub fn error_code(&self) -> Option<u32> {
        match self {
            RegistryError::NotFound(api) | RegistryError::Http(api) => api.error_code,
            RegistryError::IncompatibleSchema { .. } => Some(error_codes::INCOMPATIBLE_SCHEMA),
            RegistryError::InvalidSchema(_) => Some(error_codes::INVALID_SCHEMA),
            _ => None,
        }
    }
}
