//! Serializer / deserializer against the local registry.

use schemaflow_codec::{
    encode, AvroDeserializer, AvroSerializer, CodecError, Decoded, ParsedSchema,
    RegistryResolver, SchemaCache, SchemaResolver, SubjectNameStrategy,
};
use schemaflow_registry::server::LocalRegistry;
use schemaflow_registry::{SchemaRegistryClient, VersionSelector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const USER_EVENT: &str = r#"{"type":"record","name":"UserEvent","fields":[
    {"name":"user_id","type":"int"},
    {"name":"action","type":"string"},
    {"name":"page","type":"string"},
    {"name":"timestamp","type":"long"}]}"#;

const TICK: &str = r#"{"type":"record","name":"Tick","fields":[{"name":"n","type":"long"}]}"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct UserEvent {
    user_id: i32,
    action: String,
    page: String,
    timestamp: i64,
}

#[derive(Serialize)]
struct Incomplete {
    user_id: i32,
}

fn event() -> UserEvent {
    UserEvent {
        user_id: 123,
        action: "click".to_string(),
        page: "/home".to_string(),
        timestamp: 1_700_000_000_000,
    }
}

#[tokio::test]
async fn test_serializer_registers_once_and_tags_envelope() {
    let registry = LocalRegistry::start().await.unwrap();
    let client = Arc::new(SchemaRegistryClient::new(registry.url()).unwrap());
    let serializer = AvroSerializer::new(
        Arc::clone(&client),
        &SubjectNameStrategy::topic_value("user_events"),
        USER_EVENT,
    )
    .unwrap();
    assert_eq!(serializer.subject(), "user_events-value");
    assert!(serializer.registered().is_none());

    let first = serializer.serialize(&event()).await.unwrap();
    let second = serializer.serialize(&event()).await.unwrap();
    assert_eq!(first, second);

    let latest = client
        .get_schema("user_events-value", VersionSelector::Latest)
        .await
        .unwrap();
    assert_eq!(&first[1..5], &latest.id.to_be_bytes());
    assert_eq!(client.list_versions("user_events-value").await.unwrap(), vec![1]);

    let deserializer = AvroDeserializer::new(Arc::new(RegistryResolver::new(client)));
    let decoded: Decoded<UserEvent> = deserializer.deserialize(&first).await.unwrap();
    assert_eq!(decoded.schema_id, latest.id);
    assert_eq!(decoded.record, event());
}

#[tokio::test]
async fn test_invalid_record_is_rejected_before_registration() {
    let registry = LocalRegistry::start().await.unwrap();
    let client = Arc::new(SchemaRegistryClient::new(registry.url()).unwrap());
    let serializer = AvroSerializer::new(
        Arc::clone(&client),
        &SubjectNameStrategy::topic_value("user_events"),
        USER_EVENT,
    )
    .unwrap();

    let err = serializer
        .serialize(&Incomplete { user_id: 1 })
        .await
        .unwrap_err();
    assert!(matches!(err, CodecError::SchemaMismatch(_)));
    assert!(client.list_subjects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_resolver_caches_and_reports_unknown_ids() {
    let registry = LocalRegistry::start().await.unwrap();
    let client = Arc::new(SchemaRegistryClient::new(registry.url()).unwrap());
    let registered = client
        .register_schema("user_events-value", USER_EVENT)
        .await
        .unwrap();

    let resolver = RegistryResolver::new(Arc::clone(&client));
    resolver.resolve(registered.id).await.unwrap();
    resolver.resolve(registered.id).await.unwrap();

    let stats = resolver.cache().stats().await;
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);

    let err = resolver.resolve(9999).await.unwrap_err();
    assert!(matches!(err, CodecError::SchemaNotFound { id: 9999, .. }));
}

async fn seeded_resolver(client: Arc<SchemaRegistryClient>, id: u32) -> Arc<RegistryResolver> {
    let cache = SchemaCache::new(8);
    cache
        .insert(id, Arc::new(ParsedSchema::parse(TICK).unwrap()))
        .await;
    Arc::new(RegistryResolver::with_cache(client, cache))
}

#[tokio::test]
async fn test_stale_cache_entry_for_unknown_id_is_invalidated() {
    let registry = LocalRegistry::start().await.unwrap();
    let client = Arc::new(SchemaRegistryClient::new(registry.url()).unwrap());
    let resolver = seeded_resolver(client, 4242).await;
    let deserializer = AvroDeserializer::new(resolver.clone());

    let schema = ParsedSchema::parse(USER_EVENT).unwrap();
    let bytes = encode(&schema, 4242, &event()).unwrap();

    let err = deserializer.deserialize::<UserEvent>(&bytes).await.unwrap_err();
    assert!(matches!(err, CodecError::SchemaNotFound { id: 4242, .. }));
    assert_eq!(resolver.cache().stats().await.invalidations, 1);

    // The registry does not know 4242, so the stale entry is gone for good.
    let err = resolver.resolve(4242).await.unwrap_err();
    assert!(matches!(err, CodecError::SchemaNotFound { id: 4242, .. }));
    assert_eq!(resolver.cache().stats().await.entries, 0);
}

#[tokio::test]
async fn test_stale_cache_entry_is_replaced_by_registry_definition() {
    let registry = LocalRegistry::start().await.unwrap();
    let client = Arc::new(SchemaRegistryClient::new(registry.url()).unwrap());
    let registered = client
        .register_schema("user_events-value", USER_EVENT)
        .await
        .unwrap();
    let resolver = seeded_resolver(Arc::clone(&client), registered.id).await;
    let deserializer = AvroDeserializer::new(resolver.clone());

    let schema = ParsedSchema::parse(USER_EVENT).unwrap();
    let bytes = encode(&schema, registered.id, &event()).unwrap();

    let decoded: Decoded<UserEvent> = deserializer.deserialize(&bytes).await.unwrap();
    assert_eq!(decoded.record, event());
    assert_eq!(resolver.cache().stats().await.invalidations, 1);

    let cached = resolver.resolve(registered.id).await.unwrap();
    assert_eq!(cached.full_name().as_deref(), Some("UserEvent"));
}

#[tokio::test]
async fn test_corrupt_payload_is_retried_once_then_reported() {
    let registry = LocalRegistry::start().await.unwrap();
    let client = Arc::new(SchemaRegistryClient::new(registry.url()).unwrap());
    let registered = client
        .register_schema("user_events-value", USER_EVENT)
        .await
        .unwrap();
    let resolver = Arc::new(RegistryResolver::new(client));
    let deserializer = AvroDeserializer::new(resolver.clone());

    let schema = ParsedSchema::parse(USER_EVENT).unwrap();
    let mut bytes = encode(&schema, registered.id, &event()).unwrap().to_vec();
    bytes.push(0x01);

    let err = deserializer.deserialize::<UserEvent>(&bytes).await.unwrap_err();
    assert!(matches!(err, CodecError::Corrupt(_)));
    // Evicted once, refetched once, still corrupt.
    let stats = resolver.cache().stats().await;
    assert_eq!(stats.invalidations, 1);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn test_resolver_cache_is_bounded() {
    let registry = LocalRegistry::start().await.unwrap();
    let client = Arc::new(SchemaRegistryClient::new(registry.url()).unwrap());
    let user_event = client
        .register_schema("user_events-value", USER_EVENT)
        .await
        .unwrap();
    let tick = client.register_schema("ticks-value", TICK).await.unwrap();
    assert_ne!(user_event.id, tick.id);

    let resolver = RegistryResolver::with_cache(client, SchemaCache::new(1));
    resolver.resolve(user_event.id).await.unwrap();
    resolver.resolve(tick.id).await.unwrap();
    resolver.resolve(user_event.id).await.unwrap();

    let stats = resolver.cache().stats().await;
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.capacity, 1);
    assert_eq!(stats.misses, 3);
    assert_eq!(stats.hits, 0);
}
