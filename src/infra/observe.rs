//! Tracing initialization and panic observability.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes the global tracing subscriber from the configured filter.
/// Re-initialization (e.g. several services booting inside one test binary)
/// is a no-op.
pub fn init(filter: &str, use_json: bool) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        panic!("invalid log filter {filter:?}: {err}");
    });
    let result = if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already initialized");
    }
}

/// Installs a panic hook that reports panics through tracing so they show up
/// in the structured log stream.
pub fn install_panic_hook() {
    static INSTALLED: std::sync::Once = std::sync::Once::new();
    INSTALLED.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!("{info}");
            previous(info);
        }));
    });
}
