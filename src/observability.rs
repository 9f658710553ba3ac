use std::net::SocketAddr;

// ── Admission flow ──────────────────────────────────────────────

/// Counter: admission attempts. Labels: outcome, reason.
pub const ADMISSIONS_TOTAL: &str = "seatline_admissions_total";

/// Counter: waitlist entries promoted into a freed seat.
pub const PROMOTIONS_TOTAL: &str = "seatline_promotions_total";

/// Counter: enrolled students dropped.
pub const DROPS_TOTAL: &str = "seatline_drops_total";

/// Counter: waitlist entries withdrawn.
pub const WITHDRAWALS_TOTAL: &str = "seatline_withdrawals_total";

/// Histogram: students per roster import.
pub const BATCH_SIZE: &str = "seatline_batch_size";

/// Histogram: roster import duration in seconds.
pub const BATCH_DURATION_SECONDS: &str = "seatline_batch_duration_seconds";

// ── Registry ────────────────────────────────────────────────────

/// Gauge: registered courses.
pub const COURSES_ACTIVE: &str = "seatline_courses_active";

/// Counter: snapshots recorded.
pub const SNAPSHOTS_TOTAL: &str = "seatline_snapshots_total";

// ── Audit journal ───────────────────────────────────────────────

/// Histogram: journal group-commit flush duration in seconds.
pub const JOURNAL_FLUSH_DURATION_SECONDS: &str = "seatline_journal_flush_duration_seconds";

/// Histogram: journal group-commit batch size (events per flush).
pub const JOURNAL_FLUSH_BATCH_SIZE: &str = "seatline_journal_flush_batch_size";

/// Counter: events that could not be journaled.
pub const JOURNAL_FAILURES_TOTAL: &str = "seatline_journal_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
