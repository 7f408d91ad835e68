//! tracing-subscriber setup.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "coldstart=info";
pub const VERBOSE_FILTER: &str = "coldstart=debug";

/// Pick the filter directive: `RUST_LOG`, then the config file, then the default.
pub fn filter_directive(env: Option<&str>, configured: Option<&str>, verbose: bool) -> String {
    if let Some(env) = env.filter(|value| !value.trim().is_empty()) {
        return env.to_string();
    }
    if verbose {
        return VERBOSE_FILTER.to_string();
    }
    configured.unwrap_or(DEFAULT_FILTER).to_string()
}

/// Install the global subscriber, writing to stderr so stdout stays machine-readable.
pub fn init(configured: Option<&str>, verbose: bool) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = filter_directive(env.as_deref(), configured, verbose);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
