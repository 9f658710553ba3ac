use std::sync::Arc;

use tracing::info;

use seatline::catalog::{self, CatalogSeed};
use seatline::config::Config;
use seatline::engine::Engine;
use seatline::journal::Journal;
use seatline::snapshotter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    seatline::observability::init(config.metrics_port);

    let seed = match &config.catalog_path {
        Some(path) => catalog::load_catalog(path)?,
        None => {
            tracing::warn!("SEATLINE_CATALOG not set, starting with an empty catalog");
            CatalogSeed::default()
        }
    };

    let mut engine = Engine::new(Arc::new(seed.student_records()));
    if let Some(path) = &config.journal_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        engine = engine.with_journal(Journal::spawn(path)?);
    }
    let engine = Arc::new(engine);

    let registered = seed.register_all(&engine).await?;
    info!("seatline ready");
    info!("  courses: {registered}");
    info!("  students: {}", seed.students.len());
    info!(
        "  journal: {}",
        config
            .journal_path
            .as_ref()
            .map_or("disabled".to_string(), |p| p.display().to_string())
    );
    info!("  snapshot interval: {}s", config.snapshot_interval.as_secs());

    if let Some(path) = &config.rosters_path {
        for import in catalog::load_rosters(path)? {
            match engine.process_batch(&import.course_id, &import.students).await {
                Ok(result) => {
                    for (student_id, reason) in result.rejected() {
                        tracing::warn!("roster {}: {student_id} rejected: {reason}", import.course_id);
                    }
                }
                Err(e) => tracing::error!("roster {} failed: {e}", import.course_id),
            }
        }
    }

    let snapshots = tokio::spawn(snapshotter::run_snapshotter(engine.clone(), config.snapshot_interval));

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    shutdown.await;
    info!("shutdown signal received");

    snapshots.abort();
    let recorded = snapshotter::record_all(&engine).await;
    info!("recorded {recorded} final snapshots");
    info!("seatline stopped");
    Ok(())
}
