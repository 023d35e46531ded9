// tracing-subscriber bootstrap, mirroring the teacher's own `env-filter` +
// `fmt` feature selection (see Cargo.toml).

use tracing_subscriber::EnvFilter;

/// Initialize global tracing. Safe to call more than once — subsequent
/// calls are no-ops (tracing_subscriber returns an error we swallow).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
