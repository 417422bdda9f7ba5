use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber on stderr. `RUST_LOG` takes precedence over
/// `filter`.
pub fn setup_logging(filter: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(filter)
            .with_context(|| format!("invalid log filter `{}`", filter))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install subscriber: {}", e))
}
