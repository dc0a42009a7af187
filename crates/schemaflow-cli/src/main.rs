//! SchemaFlow CLI (schemactl)
//!
//! Manage schemas in a Confluent-compatible schema registry.
//!
//! ## Quick Start
//!
//! ```bash
//! export SCHEMA_REGISTRY_URL=http://localhost:8081
//!
//! schemactl register user_events-value ./schema/user_event.avsc
//! schemactl update user_events-value ./schema/user_event.avsc
//! schemactl list
//! schemactl get user_events-value 1
//! schemactl check-compatibility user_events-value ./schema/user_event.avsc
//! schemactl delete user_events-value --version 1
//! schemactl config FULL
//! ```
//!
//! ## Configuration
//!
//! - `--registry-url` / `SCHEMA_REGISTRY_URL`
//! - `~/.schemaflow/config.toml` (`registry_url`, `output_format`, `colored`)
//! - `RUST_LOG` for diagnostics (default: warn)
//!
//! Every command checks that the registry answers before doing anything
//! else. Failures print a `❌` line and exit with status 1.

use anyhow::Result;
use clap::{Parser, Subcommand};
use schemaflow_registry::{RegistryClientConfig, SchemaRegistryClient, VersionSelector};
use std::process::ExitCode;
use std::time::Duration;

mod commands;
mod config;
mod format;

use commands::Context;
use config::{Config, OutputFormat};
use format::Formatter;

#[derive(Parser)]
#[command(name = "schemactl")]
#[command(about = "SchemaFlow schema registry management tool", version, long_about = None)]
struct Cli {
    /// Schema Registry URL
    #[arg(long, env = "SCHEMA_REGISTRY_URL", global = true)]
    registry_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    yes: bool,

    /// Request timeout in seconds
    #[arg(long, default_value = "10", global = true)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new schema
    Register {
        /// Subject name (e.g., "user_events-value")
        subject: String,
        /// Path to the schema file
        schema_file: String,
    },
    /// Register a new version after checking compatibility with the latest
    Update {
        subject: String,
        schema_file: String,
        /// Register even if the registry reports it incompatible
        #[arg(short, long)]
        force: bool,
    },
    /// List all subjects, or the versions of one subject
    List { subject: Option<String> },
    /// Get and display a schema
    Get {
        #[arg(required_unless_present = "id")]
        subject: Option<String>,
        /// Version number or "latest"
        #[arg(default_value = "latest")]
        version: VersionSelector,
        /// Look up by global schema ID instead
        #[arg(long, conflicts_with = "subject")]
        id: Option<u32>,
    },
    /// Check a schema against a registered version without registering it
    CheckCompatibility {
        subject: String,
        schema_file: String,
        /// Version to check against
        #[arg(short, long, default_value = "latest")]
        version: VersionSelector,
    },
    /// Delete a subject or one of its versions
    Delete {
        subject: String,
        /// Version to delete (default: the whole subject)
        #[arg(short, long)]
        version: Option<i32>,
        /// Hard delete a previously soft-deleted subject
        #[arg(long, conflicts_with = "version")]
        permanent: bool,
    },
    /// Get or set the compatibility level
    Config {
        /// New level: NONE, BACKWARD, BACKWARD_TRANSITIVE, FORWARD,
        /// FORWARD_TRANSITIVE, FULL, FULL_TRANSITIVE
        level: Option<String>,
        /// Address a subject-level override instead of the global level
        #[arg(short, long)]
        subject: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            Formatter::new(OutputFormat::Table, false).print_error(&format!("{:#}", e));
            return ExitCode::FAILURE;
        }
    };
    let formatter = Formatter::new(
        cli.output.unwrap_or(config.output_format),
        config.colored && !cli.no_color,
    );
    let registry_url = cli
        .registry_url
        .clone()
        .unwrap_or_else(|| config.registry_url.clone());

    let client = match SchemaRegistryClient::with_config(
        RegistryClientConfig::new(&registry_url).timeout(Duration::from_secs(cli.timeout)),
    ) {
        Ok(client) => client,
        Err(e) => {
            formatter.print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    if !client.health_check().await {
        formatter.print_error(&format!(
            "Cannot connect to Schema Registry at {}",
            registry_url
        ));
        eprintln!("Make sure the Schema Registry is running and SCHEMA_REGISTRY_URL is correct.");
        return ExitCode::FAILURE;
    }

    let ctx = Context {
        client,
        formatter,
        assume_yes: cli.yes,
    };

    match run(&ctx, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ctx.formatter.print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(ctx: &Context, command: Commands) -> Result<()> {
    match command {
        Commands::Register {
            subject,
            schema_file,
        } => commands::schema::register(ctx, &subject, &schema_file).await,
        Commands::Update {
            subject,
            schema_file,
            force,
        } => commands::schema::update(ctx, &subject, &schema_file, force).await,
        Commands::List { subject } => commands::schema::list(ctx, subject.as_deref()).await,
        Commands::Get {
            subject,
            version,
            id,
        } => commands::schema::get(ctx, subject.as_deref(), version, id).await,
        Commands::CheckCompatibility {
            subject,
            schema_file,
            version,
        } => commands::schema::check_compatibility(ctx, &subject, &schema_file, version).await,
        Commands::Delete {
            subject,
            version,
            permanent,
        } => commands::schema::delete(ctx, &subject, version, permanent).await,
        Commands::Config { level, subject } => {
            commands::compatibility::config(ctx, level.as_deref(), subject.as_deref()).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_get_defaults_to_latest() {
        let cli = Cli::parse_from(["schemactl", "get", "user_events-value"]);
        match cli.command {
            Commands::Get { version, id, .. } => {
                assert_eq!(version, VersionSelector::Latest);
                assert!(id.is_none());
            }
            _ => panic!("expected get"),
        }
    }

    #[test]
    fn test_get_by_id_needs_no_subject() {
        let cli = Cli::parse_from(["schemactl", "get", "--id", "7"]);
        assert!(matches!(cli.command, Commands::Get { id: Some(7), .. }));
    }

    #[test]
    fn test_invalid_version_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["schemactl", "get", "orders-value", "zero"]).is_err());
    }

    #[test]
    fn test_permanent_conflicts_with_version() {
        let result = Cli::try_parse_from([
            "schemactl",
            "delete",
            "orders-value",
            "--version",
            "1",
            "--permanent",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["schemactl", "list", "-o", "json", "--yes"]);
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(cli.yes);
    }
}
