//! Tracing initialization: JSON lines, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Install the process-wide subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Output is one
/// JSON object per event; spans additionally log on close, which is where
/// the per-operation timings of the instrumented engines and stores show
/// up. Only the first call installs anything.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .try_init();
}
