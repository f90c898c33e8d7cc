//! Metrics for the solver service.

use std::sync::OnceLock;

#[derive(Debug, Clone, prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "solver")]
struct Metrics {
    /// Intents decoded from the pending transaction stream.
    #[metric(labels("origin"))]
    intents_seen: prometheus::IntCounterVec,

    /// Solve attempts started, by protocol.
    #[metric(labels("protocol"))]
    solves: prometheus::IntCounterVec,

    /// Solve attempts that ended early, by reason.
    #[metric(labels("reason"))]
    skips: prometheus::IntCounterVec,

    /// Errors raised from solve attempts, by reason.
    #[metric(labels("reason"))]
    solve_errors: prometheus::IntCounterVec,

    /// Fills that landed on-chain.
    #[metric(labels("protocol"))]
    fills: prometheus::IntCounterVec,

    /// Relay submissions, by strategy and result.
    #[metric(labels("strategy", "result"))]
    relays: prometheus::IntCounterVec,

    /// Quote API requests sent.
    quote_requests: prometheus::IntCounter,
}

pub fn intent_seen(origin: &'static str) {
    get().intents_seen.with_label_values(&[origin]).inc();
}

pub fn solve(protocol: &'static str) {
    get().solves.with_label_values(&[protocol]).inc();
}

pub fn skip(reason: &'static str) {
    get().skips.with_label_values(&[reason]).inc();
}

pub fn solve_error(reason: &str) {
    get().solve_errors.with_label_values(&[reason]).inc();
}

pub fn fill(protocol: &'static str) {
    get().fills.with_label_values(&[protocol]).inc();
}

pub fn relay(strategy: &'static str, result: &'static str) {
    get().relays.with_label_values(&[strategy, result]).inc();
}

pub fn quote_request() {
    get().quote_requests.inc();
}

/// Renders all registered metrics in the Prometheus text exposition format.
pub fn encode() -> String {
    let metrics = registry().registry().gather();
    prometheus::TextEncoder::new()
        .encode_to_string(&metrics)
        .unwrap_or_default()
}

fn registry() -> &'static prometheus_metric_storage::StorageRegistry {
    static REGISTRY: OnceLock<prometheus_metric_storage::StorageRegistry> = OnceLock::new();
    REGISTRY.get_or_init(Default::default)
}

/// Get the metrics instance.
fn get() -> &'static Metrics {
    Metrics::instance(registry()).expect("unexpected error getting metrics instance")
}
