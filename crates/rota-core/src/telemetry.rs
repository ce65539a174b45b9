use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filtering follows `RUST_LOG` when set; otherwise `rota_core` spans and
/// events pass at `debug` and everything else at `info`. Debug builds log
/// human-readable lines with targets, release builds emit JSON.
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rota_core=debug"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if cfg!(debug_assertions) {
        builder.with_target(true).init();
    } else {
        builder.json().init();
    }
}
