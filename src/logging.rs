use tracing_subscriber::EnvFilter;

/// Initialise logging for the overlay process.
///
/// The default level is `info`; enabling debug logging in the settings file
/// switches to `debug` and additionally lets `RUST_LOG` override the filter.
/// With debug logging off the environment variable is ignored so a stray
/// `RUST_LOG` in the user's shell cannot make the overlay verbose.
pub fn init(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
