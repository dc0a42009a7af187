//! Schema lookup by envelope ID.

use crate::avro::ParsedSchema;
use crate::cache::SchemaCache;
use crate::error::{CodecError, Result};
use async_trait::async_trait;
use schemaflow_registry::SchemaRegistryClient;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves the schema ID carried in an envelope to a parsed writer schema.
#[async_trait]
pub trait SchemaResolver: Send + Sync {
    /// Fails with `SchemaNotFound` when the ID cannot be resolved, including
    /// when the definition behind it does not parse.
    async fn resolve(&self, id: u32) -> Result<Arc<ParsedSchema>>;

    /// Drop any cached schema for `id`; returns whether one was held.
    async fn evict(&self, _id: u32) -> bool {
        false
    }
}

/// Resolver backed by the registry with a bounded cache in front.
pub struct RegistryResolver {
    client: Arc<SchemaRegistryClient>,
    cache: SchemaCache,
}

impl RegistryResolver {
    pub fn new(client: Arc<SchemaRegistryClient>) -> Self {
        Self::with_cache(client, SchemaCache::default())
    }

    pub fn with_cache(client: Arc<SchemaRegistryClient>, cache: SchemaCache) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }
}

#[async_trait]
impl SchemaResolver for RegistryResolver {
    async fn resolve(&self, id: u32) -> Result<Arc<ParsedSchema>> {
        if let Some(schema) = self.cache.get(id).await {
            return Ok(schema);
        }

        let definition = match self.client.get_schema_by_id(id).await {
            Ok(definition) => definition,
            Err(e) => {
                if e.is_not_found() {
                    self.cache.invalidate(id).await;
                }
                tracing::warn!(schema_id = id, error = %e, "Schema lookup failed");
                return Err(CodecError::SchemaNotFound {
                    id,
                    reason: e.to_string(),
                });
            }
        };

        let parsed = match ParsedSchema::parse(&definition.schema) {
            Ok(parsed) => Arc::new(parsed),
            Err(e) => {
                tracing::warn!(schema_id = id, error = %e, "Registry returned an unusable schema");
                return Err(CodecError::SchemaNotFound {
                    id,
                    reason: e.to_string(),
                });
            }
        };
        self.cache.insert(id, Arc::clone(&parsed)).await;
        tracing::debug!(schema_id = id, "Schema fetched from registry");
        Ok(parsed)
    }

    async fn evict(&self, id: u32) -> bool {
        self.cache.invalidate(id).await
    }
}

/// Fixed ID → schema table, for tests and deployments with pinned schemas.
#[derive(Default)]
pub struct StaticResolver {
    schemas: HashMap<u32, Arc<ParsedSchema>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, id: u32, schema: ParsedSchema) -> Self {
        self.schemas.insert(id, Arc::new(schema));
        self
    }
}

#[async_trait]
impl SchemaResolver for StaticResolver {
    async fn resolve(&self, id: u32) -> Result<Arc<ParsedSchema>> {
        self.schemas
            .get(&id)
            .cloned()
            .ok_or_else(|| CodecError::SchemaNotFound {
                id,
                reason: "not in static schema table".to_string(),
            })
    }
}
