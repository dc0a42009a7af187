//! CLI integration tests
//!
//! Runs the schemactl binary against an in-process registry.

use schemaflow_registry::server::LocalRegistry;
use schemaflow_registry::{SchemaRegistryClient, VersionSelector};
use std::path::PathBuf;
use std::process::{Output, Stdio};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const USER_EVENT: &str = r#"{"type":"record","name":"UserEvent","fields":[
    {"name":"user_id","type":"int"},
    {"name":"action","type":"string"},
    {"name":"page","type":"string"},
    {"name":"timestamp","type":"long"}]}"#;

const USER_EVENT_NO_PAGE: &str = r#"{"type":"record","name":"UserEvent","fields":[
    {"name":"user_id","type":"int"},
    {"name":"action","type":"string"},
    {"name":"timestamp","type":"long"}]}"#;

struct Harness {
    registry: LocalRegistry,
    home: TempDir,
}

impl Harness {
    async fn start() -> Self {
        Self {
            registry: LocalRegistry::start().await.unwrap(),
            home: tempfile::tempdir().unwrap(),
        }
    }

    fn schema_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.home.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn client(&self) -> SchemaRegistryClient {
        SchemaRegistryClient::new(self.registry.url()).unwrap()
    }

    async fn run(&self, args: &[&str]) -> Output {
        schemactl()
            .env("HOME", self.home.path())
            .arg("--registry-url")
            .arg(self.registry.url())
            .arg("--no-color")
            .args(args)
            .output()
            .await
            .expect("Failed to execute schemactl")
    }

    async fn run_answering(&self, args: &[&str], answer: &str) -> Output {
        let mut child = schemactl()
            .env("HOME", self.home.path())
            .arg("--registry-url")
            .arg(self.registry.url())
            .arg("--no-color")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("Failed to spawn schemactl");
        let mut stdin = child.stdin.take().unwrap();
        stdin.write_all(answer.as_bytes()).await.unwrap();
        drop(stdin);
        child.wait_with_output().await.unwrap()
    }
}

fn schemactl() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_schemactl"));
    command.env_remove("SCHEMA_REGISTRY_URL").env_remove("RUST_LOG");
    command
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[tokio::test]
async fn test_help_lists_commands() {
    let output = schemactl().arg("--help").output().await.unwrap();
    assert!(output.status.success());

    let help = stdout(&output);
    for command in [
        "register",
        "update",
        "list",
        "get",
        "check-compatibility",
        "delete",
        "config",
    ] {
        assert!(help.contains(command), "help should list '{}'", command);
    }
}

#[tokio::test]
async fn test_unreachable_registry_exits_with_failure() {
    let home = tempfile::tempdir().unwrap();
    let output = schemactl()
        .env("HOME", home.path())
        .args(["--registry-url", "http://127.0.0.1:1", "--no-color", "list"])
        .output()
        .await
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("❌ Cannot connect to Schema Registry"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_register_then_list_and_get() {
    let harness = Harness::start().await;
    let file = harness.schema_file("user_event.avsc", USER_EVENT);

    let output = harness
        .run(&["register", "user_events-value", file.to_str().unwrap()])
        .await;
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Schema registered successfully!"));

    let output = harness.run(&["list", "-o", "json"]).await;
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(rows[0]["subject"], "user_events-value");
    assert_eq!(rows[0]["versions"], "1");

    let output = harness.run(&["get", "user_events-value", "1", "-o", "json"]).await;
    assert!(output.status.success());
    let schema: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(schema["version"], 1);
    assert!(schema["schema"].as_str().unwrap().contains("UserEvent"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_malformed_schema_file_fails_before_registering() {
    let harness = Harness::start().await;
    let file = harness.schema_file("broken.avsc", "{\"type\": \"record\"");

    let output = harness
        .run(&["register", "user_events-value", file.to_str().unwrap()])
        .await;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not valid JSON"));
    assert!(harness.client().list_subjects().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_incompatible_update_needs_confirmation() {
    let harness = Harness::start().await;
    let client = harness.client();
    client
        .register_schema("user_events-value", USER_EVENT)
        .await
        .unwrap();
    let file = harness.schema_file("no_page.avsc", USER_EVENT_NO_PAGE);
    let path = file.to_str().unwrap();

    // stdin is closed, so the prompt is answered with "no"
    let output = harness.run(&["update", "user_events-value", path]).await;
    assert!(output.status.success());
    assert!(stdout(&output).contains("Schema update cancelled."));
    assert_eq!(client.list_versions("user_events-value").await.unwrap(), vec![1]);

    let check = harness
        .run(&["check-compatibility", "user_events-value", path])
        .await;
    assert_eq!(check.status.code(), Some(1));
    assert!(stderr(&check).contains("NOT compatible"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_confirmed_update_rejected_by_registry_asks_once() {
    let harness = Harness::start().await;
    let client = harness.client();
    client
        .register_schema("user_events-value", USER_EVENT)
        .await
        .unwrap();
    let file = harness.schema_file("no_page.avsc", USER_EVENT_NO_PAGE);

    let output = harness
        .run_answering(
            &["update", "user_events-value", file.to_str().unwrap()],
            "y\ny\n",
        )
        .await;
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(
        stdout(&output).matches("Do you want to continue anyway?").count(),
        1
    );
    assert!(stderr(&output).contains("Failed to update schema"));
    assert_eq!(client.list_versions("user_events-value").await.unwrap(), vec![1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_version_with_yes() {
    let harness = Harness::start().await;
    let client = harness.client();
    client
        .register_schema("user_events-value", USER_EVENT)
        .await
        .unwrap();

    let output = harness
        .run(&["delete", "user_events-value", "--version", "1", "--yes"])
        .await;
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Deleted version 1 of subject 'user_events-value'"));

    let err = client
        .get_schema("user_events-value", VersionSelector::Number(1))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_config_get_and_set() {
    let harness = Harness::start().await;

    let output = harness.run(&["config"]).await;
    assert!(stdout(&output).contains("Current global compatibility level: BACKWARD"));

    let output = harness.run(&["config", "full"]).await;
    assert!(output.status.success());
    assert!(stdout(&output).contains("FULL"));

    let output = harness.run(&["config", "SIDEWAYS"]).await;
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("invalid compatibility level"));
}
