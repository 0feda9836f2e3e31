//! BankFlow service binary
//!
//! Roles:
//! - `--api`: gateway, transfer executor and outbox dispatcher
//! - `--consumer`: event consumers for the completed and failed topics
//! - neither flag: both roles in one process
//!
//! Other flags: `--env/-e <name>` (loads `config/<name>.yaml`), `--port <n>`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use bankflow::broker::{self, BrokerError, EventSource};
use bankflow::config::{AppConfig, ConsumerConfig, DedupBackend, KafkaConfig};
use bankflow::consumer::{
    DedupStore, EventConsumer, LoggingSideEffects, MemoryDedupStore, PgDedupStore,
    TransactionProcessor,
};
use bankflow::db::{Database, schema};
use bankflow::events::{EventPublisher, OutboxDispatcher};
use bankflow::gateway::{self, AppState};
use bankflow::ledger::{LedgerStore, PgLedger};
use bankflow::transfer::{SnowflakeIds, TransferExecutor};

const DEDUP_PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn use_api_mode() -> bool {
    std::env::args().any(|a| a == "--api")
}

fn use_consumer_mode() -> bool {
    std::env::args().any(|a| a == "--consumer")
}

fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = bankflow::logging::init_logging(&app_config);

    let (api, consumer) = match (use_api_mode(), use_consumer_mode()) {
        (false, false) => (true, true),
        roles => roles,
    };
    info!(env = %env, api, consumer, "Starting BankFlow");

    let db = Database::connect(&app_config.postgres)
        .await
        .context("Failed to connect to PostgreSQL")?;
    if app_config.postgres.init_schema {
        schema::init_schema(db.pool()).await?;
    }
    let ledger: Arc<dyn LedgerStore> = Arc::new(PgLedger::new(db.pool().clone()));
    let publisher = build_publisher(&app_config.kafka)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    if api {
        tasks.extend(start_api(&app_config, ledger.clone(), publisher.clone(), &shutdown_rx));
    }
    if consumer {
        tasks.extend(start_consumers(
            &app_config,
            &db,
            ledger.clone(),
            publisher.clone(),
            &shutdown_rx,
        )?);
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    for result in futures::future::join_all(tasks).await {
        if let Err(e) = result {
            error!(error = %e, "Task ended abnormally");
        }
    }
    info!("BankFlow stopped");
    Ok(())
}

fn start_api(
    app_config: &AppConfig,
    ledger: Arc<dyn LedgerStore>,
    publisher: EventPublisher,
    shutdown_rx: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();

    let dispatcher = OutboxDispatcher::new(ledger.clone(), publisher.clone(), &app_config.outbox);
    let rx = shutdown_rx.clone();
    tasks.push(tokio::spawn(async move { dispatcher.run(rx).await }));

    let executor = Arc::new(TransferExecutor::new(
        ledger.clone(),
        publisher.clone(),
        Arc::new(SnowflakeIds::new(app_config.transfer.machine_id)),
        app_config.transfer.clone(),
    ));
    let state = Arc::new(AppState::new(executor, ledger, publisher));
    let gateway_config = app_config.gateway.clone();
    let mut rx = shutdown_rx.clone();
    tasks.push(tokio::spawn(async move {
        let shutdown = async move {
            let _ = rx.wait_for(|stop| *stop).await;
        };
        if let Err(e) = gateway::run_server(state, &gateway_config, shutdown).await {
            error!(error = %e, "Gateway failed");
        }
    }));

    tasks
}

fn start_consumers(
    app_config: &AppConfig,
    db: &Database,
    ledger: Arc<dyn LedgerStore>,
    publisher: EventPublisher,
    shutdown_rx: &watch::Receiver<bool>,
) -> Result<Vec<JoinHandle<()>>> {
    let mut tasks = Vec::new();
    let kafka = &app_config.kafka;

    let dedup: Arc<dyn DedupStore> = match app_config.consumer.dedup {
        DedupBackend::Memory => Arc::new(MemoryDedupStore::new(
            app_config.consumer.dedup_capacity,
            app_config.consumer.dedup_ttl(),
        )),
        DedupBackend::Postgres => {
            let store = Arc::new(PgDedupStore::new(
                db.pool().clone(),
                app_config.consumer.dedup_ttl(),
            ));
            tasks.push(spawn_dedup_pruner(store.clone(), shutdown_rx.clone()));
            store
        }
    };
    let effects = Arc::new(LoggingSideEffects::with_ledger(ledger));

    for topic in [&kafka.topics.completed, &kafka.topics.failed] {
        let processor = TransactionProcessor::new(
            dedup.clone(),
            effects.clone(),
            app_config.consumer.max_retries,
        );
        let mut consumer =
            EventConsumer::new(build_source(kafka, topic)?, processor, publisher.clone(), kafka);
        let rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move { consumer.run(rx).await }));
    }

    log_consumer_settings(kafka, &app_config.consumer);
    Ok(tasks)
}

fn log_consumer_settings(kafka: &KafkaConfig, consumer: &ConsumerConfig) {
    info!(
        group_id = %kafka.group_id,
        completed = %kafka.topics.completed,
        failed = %kafka.topics.failed,
        max_retries = consumer.max_retries,
        dedup = ?consumer.dedup,
        "Consumers started"
    );
}

fn spawn_dedup_pruner(store: Arc<PgDedupStore>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(DEDUP_PRUNE_INTERVAL);
        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => match store.prune().await {
                    Ok(0) => {}
                    Ok(n) => info!(removed = n, "Pruned expired idempotency keys"),
                    Err(e) => warn!(error = %e, "Idempotency key prune failed"),
                },
                _ = shutdown.changed() => {}
            }
        }
    })
}

fn build_publisher(config: &KafkaConfig) -> Result<EventPublisher> {
    match broker::producer_from_config(config) {
        Ok(Some(producer)) => Ok(EventPublisher::new(producer, config.topics.clone())),
        Ok(None) => {
            warn!("Kafka disabled, running ledger-only");
            Ok(EventPublisher::disabled(config.topics.clone()))
        }
        Err(e @ BrokerError::NotCompiledIn) => Err(e.into()),
        Err(e) => {
            warn!(error = %e, "Kafka producer unavailable, running ledger-only");
            Ok(EventPublisher::disabled(config.topics.clone()))
        }
    }
}

fn build_source(config: &KafkaConfig, topic: &str) -> Result<Option<Box<dyn EventSource>>> {
    match broker::source_from_config(config, topic) {
        Ok(source) => Ok(source),
        Err(e @ BrokerError::NotCompiledIn) => Err(e.into()),
        Err(e) => {
            warn!(topic, error = %e, "Kafka consumer unavailable");
            Ok(None)
        }
    }
}
