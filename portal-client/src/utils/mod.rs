use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

pub mod jwt;

/// Install the process-wide tracing subscriber. `RUST_LOG` wins over the
/// caller's default. Calling it twice is a no-op, so tests can share it.
pub fn init_tracing(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = fmt::layer().with_file(true).with_line_number(true);

    Registry::default()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
        .ok();
}
