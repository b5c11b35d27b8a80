mod config;
mod demo;
mod workers;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};
use crate::config::ServiceConfig;
use demo::DemoSampleSource;
use harrow_clickhouse::{
    ensure_schema, ClickHouseClient, ClickHouseConfig, ClickHouseIssueRepository,
    ClickHouseTelemetryStore,
};
use harrow_domain::{
    FaultService, IssueRepository, QueryService, SampleSource, SyncService, TelemetryStore,
};
use harrow_runner::Runner;
use harrow_sqlite::SqliteQueue;
use workers::{DrainWorker, IngestWorker, StatusWorker};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            std::process::exit(1);
        }
    };

    let telemetry_providers = match init_telemetry(&TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
    }) {
        Ok(providers) => providers,
        Err(err) => {
            eprintln!("Failed to initialize telemetry: {}", err);
            std::process::exit(1);
        }
    };

    info!(
        demo_mode = config.demo_mode,
        otel_enabled = config.otel_enabled,
        "Starting harrow agent"
    );
    debug!("Configuration: {:?}", config);

    let clickhouse_config = ClickHouseConfig {
        url: config.clickhouse_url.clone(),
        database: config.clickhouse_database.clone(),
        username: config.clickhouse_username.clone(),
        password: config.clickhouse_password.clone(),
        telemetry_table: config.telemetry_table.clone(),
        issues_table: config.issues_table.clone(),
        request_timeout_secs: config.request_timeout_secs,
    };
    let client = ClickHouseClient::new(
        &clickhouse_config.url,
        &clickhouse_config.database,
        &clickhouse_config.username,
        &clickhouse_config.password,
    );

    let request_timeout = Duration::from_secs(config.request_timeout_secs);
    match tokio::time::timeout(request_timeout, ensure_schema(&client, &clickhouse_config)).await
    {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            // The store may simply be unreachable at boot; samples
            // buffer locally until it comes back.
            warn!(
                error = %format!("{:#}", err),
                "Could not prepare ClickHouse schema, continuing offline"
            );
        }
        Err(_) => {
            warn!("Schema preparation timed out, continuing offline");
        }
    }

    let queue = match SqliteQueue::open(&config.queue_path) {
        Ok(queue) => Arc::new(queue.with_max_pending(config.max_pending_samples)),
        Err(err) => {
            error!(error = %err, path = %config.queue_path, "Failed to open local queue");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn TelemetryStore> = Arc::new(ClickHouseTelemetryStore::new(
        client.clone(),
        config.telemetry_table.clone(),
        request_timeout,
    ));
    let issues: Arc<dyn IssueRepository> = Arc::new(ClickHouseIssueRepository::new(
        client.clone(),
        config.issues_table.clone(),
        request_timeout,
    ));

    let sync = Arc::new(SyncService::new(store.clone(), queue.clone()));
    let faults = Arc::new(FaultService::new(issues.clone()));
    let queries = Arc::new(QueryService::new(
        store.clone(),
        issues.clone(),
        config.query_scan_depth,
    ));

    let source: Box<dyn SampleSource> = if config.demo_mode {
        info!("Demo mode enabled, generating simulated samples");
        Box::new(DemoSampleSource::new())
    } else {
        error!("No sample source available; set DEMO_MODE=true or integrate a bus reader");
        std::process::exit(1);
    };

    let ingest = IngestWorker::new(
        source,
        sync.clone(),
        faults.clone(),
        Duration::from_secs(config.sample_interval_secs),
    );
    let drain = DrainWorker::new(sync.clone(), Duration::from_secs(config.drain_interval_secs));
    let status = StatusWorker::new(
        queries,
        faults.clone(),
        Duration::from_secs(config.status_interval_secs),
    );

    let runner = Runner::new()
        .with_named_process("ingest", move |token| ingest.run(token))
        .with_named_process("drain", move |token| drain.run(token))
        .with_named_process("status", move |token| status.run(token))
        .with_closer(move || async move {
            info!("Flushing telemetry");
            shutdown_telemetry(telemetry_providers);
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10));

    if let Err(err) = runner.run().await {
        error!("Agent exiting with error: {:#}", err);
        std::process::exit(1);
    }
    info!("Agent exiting normally");
}
