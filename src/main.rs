use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use buckettail::config::Config;
use buckettail::geo::{self, GeoClient};
use buckettail::ingest::{self, IngestOptions};
use buckettail::object_store::S3ObjectStore;
use buckettail::report;
use buckettail::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    init_tracing();

    let cfg_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = Config::load(cfg_path)?;
    info!(
        "starting buckettail: bucket={} prefix={} concurrency={}",
        cfg.bucket, cfg.log_prefix, cfg.fetch_concurrency
    );

    let run_started = Instant::now();

    // A store that cannot be opened is the one fatal condition: neither
    // ingestion nor the later stages can proceed without it.
    let store = Store::open(&cfg.db_path)?;
    let objects = S3ObjectStore::connect(&cfg).await?;

    let stage = Instant::now();
    let opts = IngestOptions {
        delete_source_objects: cfg.delete_source_objects,
        exclude_internal: cfg.exclude_internal,
        fetch_concurrency: cfg.fetch_concurrency,
    };
    let summary = ingest::run(&objects, &store, &cfg.internal_agents, &opts, &cfg.log_prefix).await?;
    info!(
        "ingestion finished in {:?}: {} rows written, {} rows failed",
        stage.elapsed(),
        summary.rows_written,
        summary.rows_failed
    );

    if cfg.add_geolocation {
        let stage = Instant::now();
        let client = GeoClient::new(cfg.geo_endpoint.clone(), cfg.http_timeout(), cfg.geo_delay())?;
        let stats = geo::enrich(&store, &client, cfg.geo_window_days).await?;
        info!(
            "geolocation finished in {:?}: {} resolved, {} unresolved, {} failed",
            stage.elapsed(),
            stats.resolved,
            stats.unresolved,
            stats.failed
        );
    }

    if let Some(report_path) = &cfg.report_path {
        let stage = Instant::now();
        let rows = report::write_report(&store, report_path, cfg.report_window_days)?;
        info!(
            "report with {} rows written to {} in {:?}",
            rows,
            report_path.display(),
            stage.elapsed()
        );
    }

    info!("run complete in {:?}", run_started.elapsed());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
