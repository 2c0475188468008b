use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global fmt subscriber, writing to stderr.
///
/// `RUST_LOG` is honoured; `default_directive` (e.g. `robofleet=info`)
/// applies on top of it. Calling this twice is harmless.
pub fn init_logging(default_directive: &str) {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(d) = default_directive.parse() {
        filter = filter.add_directive(d);
    }

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
