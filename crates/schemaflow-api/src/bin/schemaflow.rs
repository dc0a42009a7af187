//! SchemaFlow binary
//!
//! ```bash
//! schemaflow producer            # HTTP endpoint on 0.0.0.0:8000
//! schemaflow consumer            # log every user event
//! schemaflow demo                # everything in one process, no Kafka needed
//! schemaflow registry            # standalone in-memory schema registry
//! ```
//!
//! # Environment Variables
//!
//! - `SCHEMAFLOW_CONFIG`: TOML config file (see `AppConfig`)
//! - `SCHEMA_REGISTRY_URL`: registry base URL (default: http://localhost:8081)
//! - `KAFKA_BOOTSTRAP_SERVERS`: brokers (default: localhost:9092)
//! - `RUST_LOG`: log level (default: info)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use schemaflow_api::runtime::{user_event_consumer, user_event_producer, LogBackend, Registry};
use schemaflow_api::{create_router, serve, AppConfig, AppState, TransportKind, UserEvent};
use schemaflow_client::{shutdown_signal, ConsumerEvent, ProducerPipeline, ShutdownHandle};
use schemaflow_registry::server::LocalRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

#[derive(Parser)]
#[command(name = "schemaflow")]
#[command(about = "Schema-governed user event pipelines", version, long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, env = "SCHEMAFLOW_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[arg(long, env = "SCHEMA_REGISTRY_URL", global = true)]
    registry_url: Option<String>,

    #[arg(long, env = "KAFKA_BOOTSTRAP_SERVERS", global = true)]
    bootstrap_servers: Option<String>,

    /// Log transport: memory or kafka
    #[arg(long, global = true)]
    transport: Option<TransportKind>,

    #[arg(long, global = true)]
    topic: Option<String>,

    /// Avro schema of the events
    #[arg(long, global = true)]
    schema_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP producer endpoint
    Producer {
        /// Listen address (default from config: 0.0.0.0:8000)
        #[arg(long)]
        listen: Option<String>,
    },
    /// Consume and log user events until interrupted
    Consumer,
    /// Local registry, in-memory log, producer endpoint and consumer in one process
    Demo {
        #[arg(long)]
        listen: Option<String>,
    },
    /// Run a standalone in-memory schema registry
    Registry {
        #[arg(long, default_value = "0.0.0.0:8081")]
        listen: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(url) = cli.registry_url {
        config.registry_url = url;
    }
    if let Some(servers) = cli.bootstrap_servers {
        config.bootstrap_servers = servers;
    }
    if let Some(transport) = cli.transport {
        config.transport = transport;
    }
    if let Some(topic) = cli.topic {
        config.topic = topic;
    }
    if let Some(schema_file) = cli.schema_file {
        config.schema_file = schema_file;
    }

    match cli.command {
        Command::Producer { listen } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            config.validate()?;
            run_producer(config).await
        }
        Command::Consumer => {
            config.validate()?;
            run_consumer(config).await
        }
        Command::Demo { listen } => {
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            config.transport = TransportKind::Memory;
            config.validate()?;
            run_demo(config).await
        }
        Command::Registry { listen } => run_registry(&listen).await,
    }
}

fn log_configuration(config: &AppConfig) {
    info!("Configuration:");
    info!("  Topic: {}", config.topic);
    info!("  Transport: {:?}", config.transport);
    if config.transport == TransportKind::Kafka {
        info!("  Bootstrap servers: {}", config.bootstrap_servers);
    }
    info!("  Schema Registry: {}", config.registry_url);
    info!("  Schema file: {}", config.schema_file.display());
}

/// Register up front so a broken registry shows at startup. Not fatal:
/// the first publish retries.
async fn warm_up(pipeline: &ProducerPipeline<UserEvent>) {
    match pipeline.register().await {
        Ok(registered) => info!(
            subject = pipeline.subject(),
            schema_id = registered.id,
            version = registered.version,
            "✓ Schema registered"
        ),
        Err(e) => warn!(
            subject = pipeline.subject(),
            error = %e,
            "Schema registration failed; retrying on first publish"
        ),
    }
}

async fn serve_events(config: &AppConfig, state: AppState, shutdown: ShutdownHandle) -> Result<()> {
    let pipeline = Arc::clone(&state.pipeline);
    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    let mut wait = shutdown.clone();
    serve(listener, create_router(state), async move {
        wait.wait().await;
    })
    .await?;

    if let Err(e) = pipeline.flush(config.flush_timeout()).await {
        warn!(error = %e, "Flush on shutdown did not complete");
    }
    let stats = pipeline.stats();
    info!(
        published = stats.published,
        delivered = stats.delivered,
        failed = stats.failed,
        "Producer shut down"
    );
    Ok(())
}

fn shutdown_on_signal() -> ShutdownHandle {
    let shutdown = ShutdownHandle::new();
    let handle = shutdown.clone();
    tokio::spawn(async move {
        let signal = shutdown_signal().await;
        info!("📴 Received {}, initiating graceful shutdown...", signal);
        handle.trigger(signal);
    });
    shutdown
}

async fn run_producer(config: AppConfig) -> Result<()> {
    info!("🚀 SchemaFlow producer starting...");
    log_configuration(&config);

    let backend = LogBackend::from_config(&config)?;
    let registry = Registry::connect(&config).context("Failed to initialize schema registry")?;
    let pipeline = user_event_producer(&config, &backend, &registry)?;
    warm_up(&pipeline).await;

    let state = AppState::new(pipeline, config.transport);
    serve_events(&config, state, shutdown_on_signal()).await
}

async fn run_consumer(config: AppConfig) -> Result<()> {
    info!("🚀 SchemaFlow consumer starting...");
    log_configuration(&config);
    if config.transport == TransportKind::Memory {
        warn!("Memory transport only sees events produced in this process");
    }

    let backend = LogBackend::from_config(&config)?;
    let registry = Registry::connect(&config).context("Failed to initialize schema registry")?;
    let mut consumer = user_event_consumer(&config, &backend, &registry)?;

    info!("Listening for Avro messages on topic: {}...", config.topic);
    let stats = consumer.run(shutdown_on_signal(), log_event).await?;
    info!(
        delivered = stats.delivered,
        decode_errors = stats.decode_errors,
        "Consumer closed"
    );
    Ok(())
}

async fn run_demo(mut config: AppConfig) -> Result<()> {
    info!("🚀 SchemaFlow demo starting (in-process registry and log)...");
    let registry_server = LocalRegistry::start()
        .await
        .context("Failed to start local schema registry")?;
    config.registry_url = registry_server.url();
    log_configuration(&config);

    let backend = LogBackend::from_config(&config)?;
    let registry = Registry::connect(&config).context("Failed to initialize schema registry")?;
    let pipeline = user_event_producer(&config, &backend, &registry)?;
    warm_up(&pipeline).await;
    let mut consumer = user_event_consumer(&config, &backend, &registry)?;

    let shutdown = shutdown_on_signal();
    let consumer_shutdown = shutdown.clone();
    let consumer_task =
        tokio::spawn(async move { consumer.run(consumer_shutdown, log_event).await });

    let state = AppState::new(pipeline, config.transport);
    let served = serve_events(&config, state, shutdown.clone()).await;
    shutdown.shutdown();

    let stats = consumer_task.await??;
    info!(delivered = stats.delivered, "Demo consumer closed");
    served
}

async fn run_registry(listen: &str) -> Result<()> {
    let server = LocalRegistry::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;

    info!("Schema Registry is now running");
    info!("  HTTP API: {}", server.url());
    info!("  Storage: in-memory (lost on exit)");

    let signal = shutdown_signal().await;
    info!("📴 Received {}, stopping registry", signal);
    Ok(())
}

fn log_event(event: ConsumerEvent<UserEvent>) {
    match event {
        ConsumerEvent::Record(consumed) => {
            let event = &consumed.record;
            info!(
                topic = %consumed.topic,
                partition = consumed.partition,
                offset = consumed.offset,
                schema_id = consumed.schema_id,
                user_id = event.user_id,
                page = %event.page,
                timestamp = event.timestamp,
                "Received Event: {}",
                event.action
            );
        }
        ConsumerEvent::DecodeError(e) => warn!("{}", e),
        ConsumerEvent::TransportError(e) => error!(error = %e, "Consumer error"),
        ConsumerEvent::EndOfPartition(position) => debug!("End of partition reached {}", position),
    }
}
