//! Registry client against the in-process local registry.

use schemaflow_registry::server::LocalRegistry;
use schemaflow_registry::{
    CompatibilityLevel, RegistryClientConfig, RegistryError, SchemaRegistryClient, UpdateCheck,
    VersionSelector,
};
use std::time::Duration;

const USER_EVENT_V1: &str = r#"{
  "type": "record",
  "name": "UserEvent",
  "namespace": "com.example.events",
  "fields": [
    {"name": "user_id", "type": "int"},
    {"name": "action", "type": "string"},
    {"name": "page", "type": "string"},
    {"name": "timestamp", "type": "long"}
  ]
}"#;

const USER_EVENT_NO_PAGE: &str = r#"{
  "type": "record",
  "name": "UserEvent",
  "namespace": "com.example.events",
  "fields": [
    {"name": "user_id", "type": "int"},
    {"name": "action", "type": "string"},
    {"name": "timestamp", "type": "long"}
  ]
}"#;

const USER_EVENT_WITH_REFERRER: &str = r#"{
  "type": "record",
  "name": "UserEvent",
  "namespace": "com.example.events",
  "fields": [
    {"name": "user_id", "type": "int"},
    {"name": "action", "type": "string"},
    {"name": "page", "type": "string"},
    {"name": "timestamp", "type": "long"},
    {"name": "referrer", "type": ["null", "string"], "default": null}
  ]
}"#;

const SUBJECT: &str = "user_events-value";

async fn setup() -> (LocalRegistry, SchemaRegistryClient) {
    let registry = LocalRegistry::start().await.unwrap();
    let client = SchemaRegistryClient::new(registry.url()).unwrap();
    (registry, client)
}

#[tokio::test]
async fn test_registration_is_idempotent() {
    let (_registry, client) = setup().await;

    let first = client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();
    let second = client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.version, 1);
    assert_eq!(client.list_versions(SUBJECT).await.unwrap(), vec![1]);
}

#[tokio::test]
async fn test_get_schema_and_by_id() {
    let (_registry, client) = setup().await;
    let registered = client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();

    let latest = client.get_schema(SUBJECT, VersionSelector::Latest).await.unwrap();
    assert_eq!(latest.id, registered.id);
    assert_eq!(latest.version, 1);
    assert_eq!(latest.subject, SUBJECT);

    let by_id = client.get_schema_by_id(registered.id).await.unwrap();
    assert_eq!(by_id.schema, latest.schema);

    let looked_up = client.lookup_schema(SUBJECT, USER_EVENT_V1).await.unwrap();
    assert_eq!(looked_up.version, 1);

    let subjects = client.list_subjects().await.unwrap();
    assert!(subjects.contains(SUBJECT));
}

#[tokio::test]
async fn test_missing_things_are_not_found() {
    let (_registry, client) = setup().await;

    let err = client
        .get_schema("nope-value", VersionSelector::Latest)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.error_code(), Some(40401));

    let err = client.get_schema_by_id(4242).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.error_code(), Some(40403));
}

#[tokio::test]
async fn test_backward_gate_rejects_dropping_page() {
    let (_registry, client) = setup().await;
    client
        .set_global_compatibility_level(CompatibilityLevel::Backward)
        .await
        .unwrap();
    client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();

    let check = client
        .check_compatibility(SUBJECT, USER_EVENT_NO_PAGE, VersionSelector::Latest)
        .await
        .unwrap();
    assert!(!check.is_compatible);
    assert!(check.messages.iter().any(|m| m.contains("page")));

    let err = client
        .register_schema(SUBJECT, USER_EVENT_NO_PAGE)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::IncompatibleSchema { .. }));
    assert_eq!(client.list_versions(SUBJECT).await.unwrap(), vec![1]);
}

#[tokio::test]
async fn test_backward_gate_accepts_optional_field() {
    let (_registry, client) = setup().await;
    client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();

    let check = client
        .check_compatibility(SUBJECT, USER_EVENT_WITH_REFERRER, VersionSelector::Latest)
        .await
        .unwrap();
    assert!(check.is_compatible);

    let registered = client
        .register_schema(SUBJECT, USER_EVENT_WITH_REFERRER)
        .await
        .unwrap();
    assert_eq!(registered.version, 2);
    assert_eq!(client.list_versions(SUBJECT).await.unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_delete_version() {
    let (_registry, client) = setup().await;
    client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();
    client
        .register_schema(SUBJECT, USER_EVENT_WITH_REFERRER)
        .await
        .unwrap();

    assert_eq!(client.delete_version(SUBJECT, 1).await.unwrap(), 1);
    assert_eq!(client.list_versions(SUBJECT).await.unwrap(), vec![2]);

    let err = client
        .get_schema(SUBJECT, VersionSelector::Number(1))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_subject_soft_then_permanent() {
    let (_registry, client) = setup().await;
    client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();

    assert!(client.delete_subject(SUBJECT, true).await.is_err());
    assert_eq!(client.delete_subject(SUBJECT, false).await.unwrap(), vec![1]);
    assert_eq!(client.delete_subject(SUBJECT, true).await.unwrap(), vec![1]);
    assert!(client.list_subjects().await.unwrap().is_empty());

    // Version numbers are not reused.
    let registered = client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();
    assert_eq!(registered.version, 2);
}

#[tokio::test]
async fn test_global_compatibility_round_trip() {
    let (_registry, client) = setup().await;
    assert_eq!(
        client.get_global_compatibility().await.unwrap(),
        CompatibilityLevel::Backward
    );

    let level = client.set_global_compatibility("full_transitive").await.unwrap();
    assert_eq!(level, CompatibilityLevel::FullTransitive);
    assert_eq!(client.get_global_compatibility().await.unwrap(), level);
}

#[tokio::test]
async fn test_subject_compatibility_override() {
    let (_registry, client) = setup().await;
    client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();

    assert!(client
        .get_subject_compatibility(SUBJECT)
        .await
        .unwrap_err()
        .is_not_found());

    client
        .set_subject_compatibility(SUBJECT, CompatibilityLevel::None)
        .await
        .unwrap();
    // NONE lets the incompatible change through for this subject only.
    let registered = client
        .register_schema(SUBJECT, USER_EVENT_NO_PAGE)
        .await
        .unwrap();
    assert_eq!(registered.version, 2);
}

#[tokio::test]
async fn test_invalid_level_never_reaches_network() {
    // Nothing listens on this port; a request would fail as Unavailable.
    let client = SchemaRegistryClient::new("http://127.0.0.1:9").unwrap();
    let err = client.set_global_compatibility("SIDEWAYS").await.unwrap_err();
    assert!(matches!(err, RegistryError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_health_check() {
    let (registry, client) = setup().await;
    assert!(client.health_check().await);
    drop(registry);

    let client = SchemaRegistryClient::with_config(
        RegistryClientConfig::new("http://127.0.0.1:9").timeout(Duration::from_millis(500)),
    )
    .unwrap();
    assert!(!client.health_check().await);
}

#[tokio::test]
async fn test_unavailable_registry() {
    let client = SchemaRegistryClient::with_config(
        RegistryClientConfig::new("http://127.0.0.1:9").timeout(Duration::from_millis(500)),
    )
    .unwrap();
    let err = client.list_subjects().await.unwrap_err();
    assert!(matches!(err, RegistryError::Unavailable(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_update_schema() {
    let (_registry, client) = setup().await;

    let first = client
        .update_schema(SUBJECT, USER_EVENT_V1, false)
        .await
        .unwrap();
    assert!(first.first_version);
    assert_eq!(first.registered.version, 1);

    let err = client
        .update_schema(SUBJECT, USER_EVENT_NO_PAGE, false)
        .await
        .unwrap_err();
    match err {
        RegistryError::IncompatibleSchema { messages } => assert!(!messages.is_empty()),
        other => panic!("expected IncompatibleSchema, got {other:?}"),
    }

    let compatible = client
        .update_schema(SUBJECT, USER_EVENT_WITH_REFERRER, false)
        .await
        .unwrap();
    assert!(!compatible.first_version);
    assert!(!compatible.forced);
    assert_eq!(compatible.registered.version, 2);
}

#[tokio::test]
async fn test_forced_update_still_subject_to_registry() {
    let (_registry, client) = setup().await;
    client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();

    // The registry enforces the level on registration too.
    let err = client
        .update_schema(SUBJECT, USER_EVENT_NO_PAGE, true)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::IncompatibleSchema { .. }));
}

#[tokio::test]
async fn test_registration_rejection_is_not_a_precheck_verdict() {
    let (_registry, client) = setup().await;
    client.register_schema(SUBJECT, USER_EVENT_V1).await.unwrap();
    client
        .set_subject_compatibility(SUBJECT, CompatibilityLevel::None)
        .await
        .unwrap();

    let check = client
        .precheck_update(SUBJECT, USER_EVENT_NO_PAGE)
        .await
        .unwrap();
    assert_eq!(check, UpdateCheck::Compatible);

    // Level tightened between the check and the registration.
    client
        .set_subject_compatibility(SUBJECT, CompatibilityLevel::Backward)
        .await
        .unwrap();
    let err = client
        .apply_update(SUBJECT, USER_EVENT_NO_PAGE, check)
        .await
        .unwrap_err();
    assert!(matches!(err, RegistryError::IncompatibleSchema { .. }));
    assert_eq!(client.list_versions(SUBJECT).await.unwrap(), vec![1]);
}

#[tokio::test]
async fn test_precheck_verdicts() {
    let (_registry, client) = setup().await;

    let check = client.precheck_update(SUBJECT, USER_EVENT_V1).await.unwrap();
    assert_eq!(check, UpdateCheck::FirstVersion);
    let first = client
        .apply_update(SUBJECT, USER_EVENT_V1, check)
        .await
        .unwrap();
    assert!(first.first_version);
    assert!(!first.forced);

    match client
        .precheck_update(SUBJECT, USER_EVENT_NO_PAGE)
        .await
        .unwrap()
    {
        UpdateCheck::Incompatible(messages) => assert!(!messages.is_empty()),
        other => panic!("expected Incompatible, got {other:?}"),
    }
    assert_eq!(client.list_versions(SUBJECT).await.unwrap(), vec![1]);
}
