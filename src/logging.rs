use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber.
///
/// `filter` takes precedence; otherwise `RUST_LOG` is used, falling back to `info`.
/// Calling it again is a no-op.
pub fn init_tracing(filter: Option<&str>) {
    let env_filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .try_init();
}
