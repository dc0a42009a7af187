//! In-memory state of the local registry.
//!
//! IDs are global and content-addressed (canonical Avro form), versions are
//! per subject and never reused, even after a permanent delete.

use super::compatibility::check_compatibility;
use crate::error::error_codes;
use crate::types::{CompatibilityLevel, SchemaDefinition, SchemaType, SchemaVersion};
use apache_avro::Schema;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

const SUBJECT_NOT_SOFT_DELETED: u32 = 40405;
const SUBJECT_LEVEL_NOT_CONFIGURED: u32 = 40408;

/// Error answered by the local registry, rendered as `{"error_code","message"}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub status: u16,
    pub error_code: u32,
    pub message: String,
}

impl StoreError {
    fn new(status: u16, error_code: u32, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code,
            message: message.into(),
        }
    }

    pub fn subject_not_found(subject: &str) -> Self {
        Self::new(404, error_codes::SUBJECT_NOT_FOUND, format!("Subject '{}' not found.", subject))
    }

    pub fn version_not_found(version: &str) -> Self {
        Self::new(404, error_codes::VERSION_NOT_FOUND, format!("Version {} not found.", version))
    }

    pub fn schema_not_found() -> Self {
        Self::new(404, error_codes::SCHEMA_NOT_FOUND, "Schema not found")
    }

    pub fn invalid_schema(detail: impl std::fmt::Display) -> Self {
        Self::new(422, error_codes::INVALID_SCHEMA, format!("Invalid schema: {}", detail))
    }

    pub fn invalid_version(version: &str) -> Self {
        Self::new(
            422,
            error_codes::INVALID_VERSION,
            format!("The specified version '{}' is not a valid version id.", version),
        )
    }

    pub fn invalid_compatibility_level(level: &str) -> Self {
        Self::new(
            422,
            error_codes::INVALID_COMPATIBILITY_LEVEL,
            format!("Invalid compatibility level '{}'.", level),
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy)]
struct VersionEntry {
    version: i32,
    id: u32,
    deleted: bool,
}

#[derive(Debug, Default)]
struct SubjectEntry {
    versions: Vec<VersionEntry>,
    last_version: i32,
}

impl SubjectEntry {
    fn live(&self) -> impl Iterator<Item = &VersionEntry> {
        self.versions.iter().filter(|v| !v.deleted)
    }
}

struct StoredSchema {
    definition: String,
    parsed: Schema,
}

#[derive(Default)]
struct State {
    next_id: u32,
    ids_by_canonical: HashMap<String, u32>,
    schemas: HashMap<u32, StoredSchema>,
    subjects: BTreeMap<String, SubjectEntry>,
    global: CompatibilityLevel,
    subject_levels: HashMap<String, CompatibilityLevel>,
}

impl State {
    fn level_for(&self, subject: &str) -> CompatibilityLevel {
        self.subject_levels
            .get(subject)
            .copied()
            .unwrap_or(self.global)
    }

    fn live_subject(&self, subject: &str) -> StoreResult<&SubjectEntry> {
        self.subjects
            .get(subject)
            .filter(|entry| entry.live().next().is_some())
            .ok_or_else(|| StoreError::subject_not_found(subject))
    }

    fn select(&self, subject: &str, version: &str) -> StoreResult<VersionEntry> {
        let entry = self.live_subject(subject)?;
        let wanted = parse_version(version)?;
        let found = match wanted {
            None => entry.live().last(),
            Some(n) => entry.live().find(|v| v.version == n),
        };
        found.copied().ok_or_else(|| StoreError::version_not_found(version))
    }

    fn to_version(&self, subject: &str, entry: VersionEntry) -> StoreResult<SchemaVersion> {
        let stored = self.schemas.get(&entry.id).ok_or_else(StoreError::schema_not_found)?;
        Ok(SchemaVersion {
            subject: subject.to_string(),
            version: entry.version,
            id: entry.id,
            schema: stored.definition.clone(),
            schema_type: SchemaType::Avro,
        })
    }
}

/// `None` means latest.
fn parse_version(version: &str) -> StoreResult<Option<i32>> {
    if version == "latest" || version == "-1" {
        return Ok(None);
    }
    match version.parse::<i32>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(StoreError::invalid_version(version)),
    }
}

fn parse_schema(definition: &str) -> StoreResult<(Schema, String)> {
    let parsed = Schema::parse_str(definition).map_err(StoreError::invalid_schema)?;
    let canonical = parsed.canonical_form();
    Ok((parsed, canonical))
}

/// Registry state shared by the HTTP handlers
pub struct RegistryStore {
    state: RwLock<State>,
}

impl Default for RegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Register a definition, returning `(id, version)`.
    pub async fn register(&self, subject: &str, definition: &str) -> StoreResult<(u32, i32)> {
        let (parsed, canonical) = parse_schema(definition)?;
        let mut state = self.state.write().await;

        if let Some(entry) = state.subjects.get(subject) {
            let existing_id = state.ids_by_canonical.get(&canonical).copied();
            if let Some(hit) = entry.live().find(|v| Some(v.id) == existing_id) {
                return Ok((hit.id, hit.version));
            }

            let level = state.level_for(subject);
            let previous: Vec<&Schema> = entry
                .live()
                .filter_map(|v| state.schemas.get(&v.id).map(|s| &s.parsed))
                .collect();
            let messages = check_compatibility(level, &previous, &parsed);
            if !messages.is_empty() {
                return Err(StoreError::new(
                    409,
                    error_codes::INCOMPATIBLE_SCHEMA,
                    format!(
                        "Schema being registered is incompatible with an earlier schema for subject \"{}\": {}",
                        subject,
                        messages.join("; ")
                    ),
                ));
            }
        }

        let known_id = state.ids_by_canonical.get(&canonical).copied();
        let id = match known_id {
            Some(id) => id,
            None => {
                let id = state.next_id;
                state.next_id += 1;
                state.ids_by_canonical.insert(canonical, id);
                state.schemas.insert(
                    id,
                    StoredSchema {
                        definition: definition.to_string(),
                        parsed,
                    },
                );
                id
            }
        };

        let entry = state.subjects.entry(subject.to_string()).or_default();
        entry.last_version += 1;
        let version = entry.last_version;
        entry.versions.push(VersionEntry {
            version,
            id,
            deleted: false,
        });

        tracing::info!(id = id, subject = %subject, version = version, "Schema registered");
        Ok((id, version))
    }

    /// Find the live version of `subject` holding `definition`.
    pub async fn lookup(&self, subject: &str, definition: &str) -> StoreResult<SchemaVersion> {
        let (_, canonical) = parse_schema(definition)?;
        let state = self.state.read().await;
        let entry = state.live_subject(subject)?;
        let id = state
            .ids_by_canonical
            .get(&canonical)
            .copied()
            .ok_or_else(StoreError::schema_not_found)?;
        let hit = entry
            .live()
            .find(|v| v.id == id)
            .copied()
            .ok_or_else(StoreError::schema_not_found)?;
        state.to_version(subject, hit)
    }

    pub async fn get_version(&self, subject: &str, version: &str) -> StoreResult<SchemaVersion> {
        let state = self.state.read().await;
        let entry = state.select(subject, version)?;
        state.to_version(subject, entry)
    }

    pub async fn get_by_id(&self, id: u32) -> StoreResult<SchemaDefinition> {
        let state = self.state.read().await;
        state
            .schemas
            .get(&id)
            .map(|stored| SchemaDefinition {
                schema: stored.definition.clone(),
                schema_type: SchemaType::Avro,
            })
            .ok_or_else(StoreError::schema_not_found)
    }

    pub async fn subjects(&self) -> Vec<String> {
        let state = self.state.read().await;
        state
            .subjects
            .iter()
            .filter(|(_, entry)| entry.live().next().is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub async fn versions(&self, subject: &str) -> StoreResult<Vec<i32>> {
        let state = self.state.read().await;
        Ok(state.live_subject(subject)?.live().map(|v| v.version).collect())
    }

    /// Check without registering. Transitive levels against `latest` look at
    /// every live version.
    pub async fn test_compatibility(
        &self,
        subject: &str,
        version: &str,
        definition: &str,
    ) -> StoreResult<Vec<String>> {
        let (parsed, _) = parse_schema(definition)?;
        let state = self.state.read().await;
        let level = state.level_for(subject);
        let entry = state.live_subject(subject)?;

        let against: Vec<&Schema> = match parse_version(version)? {
            None if level.is_transitive() => entry
                .live()
                .filter_map(|v| state.schemas.get(&v.id).map(|s| &s.parsed))
                .collect(),
            _ => {
                let selected = state.select(subject, version)?;
                state
                    .schemas
                    .get(&selected.id)
                    .map(|s| &s.parsed)
                    .into_iter()
                    .collect()
            }
        };

        Ok(check_compatibility(level, &against, &parsed))
    }

    /// Soft delete hides versions; permanent delete drops already soft-deleted ones.
    pub async fn delete_subject(&self, subject: &str, permanent: bool) -> StoreResult<Vec<i32>> {
        let mut state = self.state.write().await;
        let entry = state
            .subjects
            .get_mut(subject)
            .filter(|entry| !entry.versions.is_empty())
            .ok_or_else(|| StoreError::subject_not_found(subject))?;

        let removed: Vec<i32> = if permanent {
            if entry.live().next().is_some() {
                return Err(StoreError::new(
                    404,
                    SUBJECT_NOT_SOFT_DELETED,
                    format!("Subject '{}' was not deleted first before being permanently deleted", subject),
                ));
            }
            entry.versions.drain(..).map(|v| v.version).collect()
        } else {
            let live: Vec<i32> = entry.live().map(|v| v.version).collect();
            if live.is_empty() {
                return Err(StoreError::subject_not_found(subject));
            }
            for v in entry.versions.iter_mut() {
                v.deleted = true;
            }
            live
        };

        if permanent {
            state.subject_levels.remove(subject);
        }
        tracing::info!(subject = %subject, permanent = permanent, versions = ?removed, "Subject deleted");
        Ok(removed)
    }

    pub async fn delete_version(&self, subject: &str, version: &str) -> StoreResult<i32> {
        let mut state = self.state.write().await;
        let selected = state.select(subject, version)?;
        if let Some(entry) = state.subjects.get_mut(subject) {
            for v in entry.versions.iter_mut().filter(|v| v.version == selected.version) {
                v.deleted = true;
            }
        }
        tracing::info!(subject = %subject, version = selected.version, "Schema version deleted");
        Ok(selected.version)
    }

    pub async fn global_level(&self) -> CompatibilityLevel {
        self.state.read().await.global
    }

    pub async fn set_global_level(&self, level: CompatibilityLevel) {
        self.state.write().await.global = level;
    }

    pub async fn subject_level(&self, subject: &str) -> StoreResult<CompatibilityLevel> {
        let state = self.state.read().await;
        state.subject_levels.get(subject).copied().ok_or_else(|| {
            StoreError::new(
                404,
                SUBJECT_LEVEL_NOT_CONFIGURED,
                format!("Subject '{}' does not have subject-level compatibility configured", subject),
            )
        })
    }

    pub async fn set_subject_level(&self, subject: &str, level: CompatibilityLevel) {
        self.state
            .write()
            .await
            .subject_levels
            .insert(subject.to_string(), level);
    }
}
