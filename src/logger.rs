use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// chromiumoxide logs every unknown CDP event at warn; keep it quiet by default
const DEFAULT_FILTER: &str = "result_harvester=info,chromiumoxide=error";

/// `RUST_LOG` wins when set
pub fn init() {
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(true))
        .with(filter_layer)
        .try_init();
}
