use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,booster_race=info";

/// Install the global subscriber; `RUST_LOG` overrides the default filter.
///
/// Logs go to stderr so stdout carries only the race summary.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init();
}
