use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use crate::config::LoggingSettings;

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Output goes to stderr so the
/// report on stdout stays machine-readable.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let registry = tracing_subscriber::registry().with(filter);
    let layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr);

    match settings.format.as_str() {
        "pretty" => registry.with(layer.pretty()).init(),
        "compact" => registry.with(layer.compact()).init(),
        _ => registry.with(layer.json()).init(),
    }
}
