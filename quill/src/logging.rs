//! Log output setup.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber and routes `log` records into it.
///
/// `RUST_LOG` overrides `default_filter` when set.
pub fn init(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("invalid log filter")?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting global subscriber")?;
    tracing_log::LogTracer::init().context("bridging log records")?;
    Ok(())
}
