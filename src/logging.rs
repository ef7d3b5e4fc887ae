use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "info,skymap_tools=debug"
    } else {
        "warn"
    }
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins when set. Otherwise only warnings and errors are shown,
/// or progress and debug output from this crate in verbose mode.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    // A subscriber may already be installed (tests, embedding); keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
