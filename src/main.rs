use std::sync::Arc;

use transit_snapper::config::AppConfig;
use transit_snapper::ingestion::load_gtfs;
use transit_snapper::persistence::{load_snapshot, save_snapshot};
use transit_snapper::registry::SnapshotRegistry;
use transit_snapper::web;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config_path = std::env::var("TRANSIT_SNAPPER_CONFIG").unwrap_or_default();
    let config = if config_path.is_empty() {
        AppConfig::default()
    } else {
        match AppConfig::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("falling back to default config ({config_path}): {e}");
                AppConfig::default()
            }
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(config.matching.log_filter.clone()))
        .init();

    let registry = Arc::new(SnapshotRegistry::new());

    let ingest_span = tracing::info_span!("ingest_gtfs", path = %config.build.gtfs_path);
    let _enter = ingest_span.enter();

    let timetable = match load_snapshot(&config.build.output) {
        Ok(timetable) => {
            tracing::info!(path = %config.build.output, "loaded persisted timetable snapshot");
            Some(timetable)
        }
        Err(e) => {
            tracing::info!(error = %e, "no usable persisted snapshot, ingesting GTFS feed");
            match load_gtfs(&config.build.gtfs_path, config.matching.timezone_tz()) {
                Ok(timetable) => {
                    if let Err(e) = save_snapshot(&timetable, &config.build.output) {
                        tracing::warn!(error = %e, path = %config.build.output, "failed to persist timetable snapshot");
                    }
                    Some(timetable)
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to load GTFS feed; serving without a snapshot");
                    None
                }
            }
        }
    };
    drop(_enter);

    if let Some(timetable) = timetable {
        let swap_span = tracing::info_span!("swap_snapshot");
        let _enter = swap_span.enter();
        registry.publish_timetable(timetable);
        tracing::info!("timetable snapshot published");
    }

    let bind = config.matching.bind_address.clone();
    web::serve(registry, Arc::new(config.matching), &bind).await
}
