//! Prometheus metrics recorder and metric name constants.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render the metrics text format.
/// Must be called once at server startup before any metrics are recorded.
pub fn install_recorder() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install metrics recorder");
    info!("prometheus metrics recorder installed");
    handle
}

// Metric name constants to avoid typos across modules.

/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// WebSocket connection duration seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Broadcast events fanned out total (counter, labels: event).
pub const BROADCAST_EVENTS_TOTAL: &str = "broadcast_events_total";
/// Broadcast deliveries dropped total (counter).
pub const BROADCAST_DROPS_TOTAL: &str = "broadcast_drops_total";
/// Successful validations total (counter).
pub const VALIDATIONS_TOTAL: &str = "validations_total";
/// Successful rejoins total (counter).
pub const REJOINS_TOTAL: &str = "rejoins_total";
/// Score updates total (counter).
pub const SCORE_UPDATES_TOTAL: &str = "score_updates_total";
/// Refused transitions total (counter, labels: code).
pub const TRANSITION_ERRORS_TOTAL: &str = "transition_errors_total";
/// Superseded connections force-closed total (counter).
pub const SUPERSEDED_CONNECTIONS_TOTAL: &str = "superseded_connections_total";
/// Sessions evicted by the sweeper total (counter).
pub const SESSIONS_EVICTED_TOTAL: &str = "sessions_evicted_total";
/// Sessions currently active (gauge).
pub const SESSIONS_ACTIVE: &str = "sessions_active";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_without_global_install() {
        // Build a recorder + handle (no global install to avoid test conflicts).
        let handle = PrometheusBuilder::new().build_recorder().handle();
        let output = handle.render();
        assert!(output.is_empty() || output.contains('#') || output.contains('\n'));
    }

    #[test]
    fn metric_constants_are_snake_case() {
        let names = [
            WS_CONNECTIONS_TOTAL,
            WS_DISCONNECTIONS_TOTAL,
            WS_CONNECTIONS_ACTIVE,
            WS_CONNECTION_DURATION_SECONDS,
            BROADCAST_EVENTS_TOTAL,
            BROADCAST_DROPS_TOTAL,
            VALIDATIONS_TOTAL,
            REJOINS_TOTAL,
            SCORE_UPDATES_TOTAL,
            TRANSITION_ERRORS_TOTAL,
            SUPERSEDED_CONNECTIONS_TOTAL,
            SESSIONS_EVICTED_TOTAL,
            SESSIONS_ACTIVE,
        ];
        for name in names {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "metric name '{name}' must be snake_case"
            );
        }
    }
}
