use tracing_subscriber::EnvFilter;

/// Initialise the global tracing subscriber.
///
/// The default level is `info`; passing `verbose` raises it to `debug` and
/// additionally lets the `RUST_LOG` environment variable override the filter.
/// Safe to call more than once, later calls are no-ops.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
