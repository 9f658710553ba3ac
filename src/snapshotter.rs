use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::engine::Engine;

/// Background task that periodically snapshots every course for trend analytics.
pub async fn run_snapshotter(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // The first tick completes immediately; skip it so startup doesn't record a point.
    interval.tick().await;
    loop {
        interval.tick().await;
        let recorded = record_all(&engine).await;
        info!("recorded {recorded} enrollment snapshots");
    }
}

/// Snapshot every registered course once. Returns how many were recorded.
pub async fn record_all(engine: &Engine) -> usize {
    let mut recorded = 0;
    for course_id in engine.course_ids() {
        match engine.record_snapshot(&course_id).await {
            Ok(_) => recorded += 1,
            Err(e) => {
                // Course may have been retired since the id list was taken
                tracing::debug!("snapshot skip {course_id}: {e}");
            }
        }
    }
    recorded
}
