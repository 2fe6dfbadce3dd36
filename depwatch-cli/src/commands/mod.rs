//! Command handlers -- one module per subcommand

pub mod check;
pub mod config;
pub mod resolve;

use std::path::Path;

use tracing::debug;

use depwatch_core::config::DepwatchConfig;
use depwatch_core::error::DepwatchError;

use crate::error::CliError;

/// Load the configuration file, falling back to built-in defaults (plus
/// `DEPWATCH_*` env overrides) when the file is absent.
///
/// `check` runs fine without a config file; `config validate` and
/// `config show` load strictly instead so a missing file surfaces as an
/// error. Parse and validation failures are always propagated.
pub(crate) async fn load_config_or_default(path: &Path) -> Result<DepwatchConfig, CliError> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "config file not found, using defaults");
        let mut config = DepwatchConfig::default();
        config.apply_env_overrides();
        config.validate().map_err(DepwatchError::Config)?;
        return Ok(config);
    }
    Ok(DepwatchConfig::load(path).await?)
}
