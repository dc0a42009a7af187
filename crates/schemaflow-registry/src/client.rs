//! Typed schema registry client.
//!
//! [`SchemaRegistryClient`] is a cache-free proxy over the registry REST API:
//! every call goes to the registry, and the only state it holds is the base
//! URL and the HTTP connection pool. It is `Send + Sync`; share it behind an
//! `Arc`.
//!
//! ```ignore
//! let client = SchemaRegistryClient::new("http://localhost:8081")?;
//! let registered = client.register_schema("user_events-value", &definition).await?;
//! let latest = client.get_schema("user_events-value", VersionSelector::Latest).await?;
//! assert_eq!(latest.id, registered.id);
//! ```

use crate::error::{RegistryError, Result};
use crate::transport::{RegistryClientConfig, RestClient};
use crate::types::*;
use std::collections::BTreeSet;

/// Client for a Confluent-compatible schema registry
#[derive(Debug, Clone)]
pub struct SchemaRegistryClient {
    rest: RestClient,
}

impl SchemaRegistryClient {
    /// Create a client with default settings (10s timeout).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_config(RegistryClientConfig::new(base_url))
    }

    pub fn with_config(config: RegistryClientConfig) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(&config)?,
        })
    }

    pub fn base_url(&self) -> &str {
        self.rest.base_url().as_str()
    }

    /// Register a definition under `subject`.
    ///
    /// Registering byte-identical content again returns the existing ID and
    /// version. When the registry leaves `version` out of its answer, the
    /// version is looked up with [`Self::lookup_schema`].
    pub async fn register_schema(
        &self,
        subject: &str,
        definition: &str,
    ) -> Result<RegisteredSchema> {
        validate_subject(subject)?;
        let url = self.rest.url(&["subjects", subject, "versions"], &[]);
        let response: RegisterSchemaResponse = self
            .rest
            .post(url, &RegisterSchemaRequest::avro(definition))
            .await?;

        let version = match response.version {
            Some(version) => version,
            None => self.lookup_schema(subject, definition).await?.version,
        };

        tracing::debug!(
            schema_id = response.id,
            subject = subject,
            version = version,
            "Schema registered"
        );

        Ok(RegisteredSchema {
            id: response.id,
            version,
        })
    }

    /// Find the version of `subject` holding exactly `definition`.
    pub async fn lookup_schema(&self, subject: &str, definition: &str) -> Result<SchemaVersion> {
        validate_subject(subject)?;
        let url = self.rest.url(&["subjects", subject], &[]);
        self.rest
            .post(url, &RegisterSchemaRequest::avro(definition))
            .await
    }

    /// Fetch one version of a subject.
    pub async fn get_schema(
        &self,
        subject: &str,
        version: VersionSelector,
    ) -> Result<SchemaVersion> {
        validate_subject(subject)?;
        let version = version.to_string();
        let url = self.rest.url(&["subjects", subject, "versions", &version], &[]);
        self.rest.get(url).await
    }

    /// Fetch a definition by its global ID. Used on the decode path.
    pub async fn get_schema_by_id(&self, id: u32) -> Result<SchemaDefinition> {
        let id = id.to_string();
        let url = self.rest.url(&["schemas", "ids", &id], &[]);
        self.rest.get(url).await
    }

    pub async fn list_subjects(&self) -> Result<BTreeSet<String>> {
        let url = self.rest.url(&["subjects"], &[]);
        let subjects: Vec<String> = self.rest.get(url).await?;
        Ok(subjects.into_iter().collect())
    }

    /// Versions of `subject`, ascending.
    pub async fn list_versions(&self, subject: &str) -> Result<Vec<i32>> {
        validate_subject(subject)?;
        let url = self.rest.url(&["subjects", subject, "versions"], &[]);
        let mut versions: Vec<i32> = self.rest.get(url).await?;
        versions.sort_unstable();
        Ok(versions)
    }

    /// Test `definition` against a version of `subject` without registering it.
    pub async fn check_compatibility(
        &self,
        subject: &str,
        definition: &str,
        against: VersionSelector,
    ) -> Result<CompatibilityCheck> {
        validate_subject(subject)?;
        let version = against.to_string();
        let url = self.rest.url(
            &["compatibility", "subjects", subject, "versions", &version],
            &[("verbose", "true")],
        );
        let response: CompatibilityResponse = self
            .rest
            .post(url, &RegisterSchemaRequest::avro(definition))
            .await?;

        tracing::debug!(
            subject = subject,
            against = %against,
            is_compatible = response.is_compatible,
            "Compatibility checked"
        );

        Ok(CompatibilityCheck {
            is_compatible: response.is_compatible,
            messages: response.messages,
        })
    }

    /// Delete every version of a subject. Returns the removed versions.
    ///
    /// `permanent` hard-deletes history; registries usually require a soft
    /// delete first.
    pub async fn delete_subject(&self, subject: &str, permanent: bool) -> Result<Vec<i32>> {
        validate_subject(subject)?;
        let query: &[(&str, &str)] = if permanent { &[("permanent", "true")] } else { &[] };
        let url = self.rest.url(&["subjects", subject], query);
        let removed: Vec<i32> = self.rest.delete_json(url).await?;
        tracing::info!(subject = subject, permanent = permanent, versions = ?removed, "Subject deleted");
        Ok(removed)
    }

    /// Delete one version. Returns the removed version number.
    pub async fn delete_version(&self, subject: &str, version: i32) -> Result<i32> {
        validate_subject(subject)?;
        let version = version.to_string();
        let url = self.rest.url(&["subjects", subject, "versions", &version], &[]);
        let removed: i32 = self.rest.delete_json(url).await?;
        tracing::info!(subject = subject, version = removed, "Schema version deleted");
        Ok(removed)
    }

    pub async fn get_global_compatibility(&self) -> Result<CompatibilityLevel> {
        let url = self.rest.url(&["config"], &[]);
        let config: ConfigResponse = self.rest.get(url).await?;
        Ok(config.compatibility_level)
    }

    /// Set the global level from user input.
    ///
    /// `level` is validated locally (case-insensitively) first; an unknown
    /// value fails with `InvalidArgument` without touching the network.
    pub async fn set_global_compatibility(&self, level: &str) -> Result<CompatibilityLevel> {
        let level: CompatibilityLevel = level.parse()?;
        self.set_global_compatibility_level(level).await
    }

    pub async fn set_global_compatibility_level(
        &self,
        level: CompatibilityLevel,
    ) -> Result<CompatibilityLevel> {
        let url = self.rest.url(&["config"], &[]);
        let update: ConfigUpdate = self
            .rest
            .put(url, &ConfigUpdate { compatibility: level })
            .await?;
        tracing::info!(level = %update.compatibility, "Global compatibility updated");
        Ok(update.compatibility)
    }

    /// Subject-level override; `NotFound` when the subject has none.
    pub async fn get_subject_compatibility(&self, subject: &str) -> Result<CompatibilityLevel> {
        validate_subject(subject)?;
        let url = self.rest.url(&["config", subject], &[]);
        let config: ConfigResponse = self.rest.get(url).await?;
        Ok(config.compatibility_level)
    }

    pub async fn set_subject_compatibility(
        &self,
        subject: &str,
        level: CompatibilityLevel,
    ) -> Result<CompatibilityLevel> {
        validate_subject(subject)?;
        let url = self.rest.url(&["config", subject], &[]);
        let update: ConfigUpdate = self
            .rest
            .put(url, &ConfigUpdate { compatibility: level })
            .await?;
        tracing::info!(subject = subject, level = %update.compatibility, "Subject compatibility updated");
        Ok(update.compatibility)
    }

    /// Whether the registry answers at all. Never fails.
    pub async fn health_check(&self) -> bool {
        self.rest.reachable(self.rest.url(&["subjects"], &[])).await
    }

    /// Check against `latest`, then register.
    ///
    /// - a subject with no versions is registered directly (`first_version`)
    /// - an incompatible result fails with `IncompatibleSchema` unless `force`
    /// - any other pre-check failure is kept as a warning and registration
    ///   proceeds, leaving the final say to the registry
    pub async fn update_schema(
        &self,
        subject: &str,
        definition: &str,
        force: bool,
    ) -> Result<SchemaUpdate> {
        let check = self.precheck_update(subject, definition).await?;
        match check {
            UpdateCheck::Incompatible(messages) if !force => {
                Err(RegistryError::IncompatibleSchema { messages })
            }
            check => self.apply_update(subject, definition, check).await,
        }
    }

    /// First half of [`Self::update_schema`]: check `definition` against
    /// `latest` without registering. Fails only on invalid arguments.
    pub async fn precheck_update(&self, subject: &str, definition: &str) -> Result<UpdateCheck> {
        match self
            .check_compatibility(subject, definition, VersionSelector::Latest)
            .await
        {
            Ok(check) if check.is_compatible => Ok(UpdateCheck::Compatible),
            Ok(check) => Ok(UpdateCheck::Incompatible(check.messages)),
            Err(e) if e.is_not_found() => Ok(UpdateCheck::FirstVersion),
            Err(e @ RegistryError::InvalidArgument(_)) => Err(e),
            Err(e) => {
                tracing::warn!(subject = subject, error = %e, "Compatibility pre-check failed");
                Ok(UpdateCheck::Unchecked(e.to_string()))
            }
        }
    }

    /// Second half of [`Self::update_schema`]: register under the verdict of
    /// an earlier pre-check. An `Incompatible` verdict registers as forced.
    /// Whatever the registry answers here is returned as is.
    pub async fn apply_update(
        &self,
        subject: &str,
        definition: &str,
        check: UpdateCheck,
    ) -> Result<SchemaUpdate> {
        let forced = matches!(check, UpdateCheck::Incompatible(_));
        if forced {
            tracing::warn!(subject = subject, "Registering incompatible schema (forced)");
        }

        let registered = self.register_schema(subject, definition).await?;
        Ok(SchemaUpdate {
            registered,
            first_version: check == UpdateCheck::FirstVersion,
            forced,
            warnings: match check {
                UpdateCheck::Unchecked(warning) => vec![warning],
                _ => Vec::new(),
            },
        })
    }
}

fn validate_subject(subject: &str) -> Result<()> {
    if subject.trim().is_empty() {
        return Err(RegistryError::InvalidArgument(
            "subject name must not be empty".to_string(),
        ));
    }
    Ok(())
}
