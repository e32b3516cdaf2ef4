//! Prometheus metrics for the location channel.
//!
//! Every recorder is a no-op until [`start_metrics_server`] installs the
//! exporter, so sessions can record unconditionally.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;

/// Metric names.
pub mod names {
    pub const SESSIONS_TOTAL: &str = "shuttle_sessions_total";
    pub const SESSIONS_ACTIVE: &str = "shuttle_sessions_active";
    pub const SESSION_DURATION_SECONDS: &str = "shuttle_session_duration_seconds";
    pub const SESSION_ENDS_TOTAL: &str = "shuttle_session_ends_total";
    pub const EVICTIONS_TOTAL: &str = "shuttle_evictions_total";
    pub const PINGS_TOTAL: &str = "shuttle_pings_total";
    pub const PING_LATENCY_SECONDS: &str = "shuttle_ping_latency_seconds";
    pub const FRAME_BYTES: &str = "shuttle_frame_bytes";
    pub const ERRORS_TOTAL: &str = "shuttle_errors_total";
}

/// Register metric descriptions.
pub fn init_metrics() {
    metrics::describe_counter!(names::SESSIONS_TOTAL, "Upgraded connections since start");
    metrics::describe_gauge!(names::SESSIONS_ACTIVE, "Sessions currently running");
    metrics::describe_histogram!(
        names::SESSION_DURATION_SECONDS,
        "Time from upgrade to teardown"
    );
    metrics::describe_counter!(names::SESSION_ENDS_TOTAL, "Finished sessions by reason");
    metrics::describe_counter!(
        names::EVICTIONS_TOTAL,
        "Sessions closed because the same user connected again"
    );
    metrics::describe_counter!(names::PINGS_TOTAL, "Location pings accepted");
    metrics::describe_histogram!(
        names::PING_LATENCY_SECONDS,
        "Time from receiving a ping to writing its acknowledgement"
    );
    metrics::describe_counter!(names::FRAME_BYTES, "Data frame bytes by direction");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Errors by kind");

    info!("Metrics initialized");
}

/// Install the Prometheus exporter listening on `port`.
///
/// # Errors
///
/// Returns an error if the exporter cannot bind or a recorder is
/// already installed.
pub fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new().with_http_listener(addr).install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

pub fn record_eviction() {
    counter!(names::EVICTIONS_TOTAL).increment(1);
}

/// Record an acknowledged ping and how long it took to answer.
pub fn record_ping(latency_seconds: f64) {
    counter!(names::PINGS_TOTAL).increment(1);
    histogram!(names::PING_LATENCY_SECONDS).record(latency_seconds);
}

/// Record the size of a data frame; `direction` is `inbound` or `outbound`.
pub fn record_frame(bytes: usize, direction: &'static str) {
    counter!(names::FRAME_BYTES, "direction" => direction).increment(bytes as u64);
}

pub fn record_error(kind: &'static str) {
    counter!(names::ERRORS_TOTAL, "kind" => kind).increment(1);
}

/// Tracks one session from upgrade to teardown.
///
/// Dropping the guard without calling [`finish`](Self::finish) still
/// releases the active gauge, but records no end reason.
pub struct SessionMetricsGuard {
    started: Instant,
}

impl SessionMetricsGuard {
    #[must_use]
    pub fn start() -> Self {
        counter!(names::SESSIONS_TOTAL).increment(1);
        gauge!(names::SESSIONS_ACTIVE).increment(1.0);
        Self {
            started: Instant::now(),
        }
    }

    /// Record how the session ended.
    pub fn finish(self, reason: &'static str) {
        counter!(names::SESSION_ENDS_TOTAL, "reason" => reason).increment(1);
        histogram!(names::SESSION_DURATION_SECONDS, "reason" => reason)
            .record(self.started.elapsed().as_secs_f64());
    }
}

impl Drop for SessionMetricsGuard {
    fn drop(&mut self) {
        gauge!(names::SESSIONS_ACTIVE).decrement(1.0);
    }
}
