//! Subcommands.

pub mod batch;
pub mod config;
pub mod process;

use std::path::Path;

use tracing::debug;

use docgrid_core::DocgridConfig;

/// Load the configuration from an explicit path, the default location, or
/// fall back to defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<DocgridConfig> {
    let config = match path {
        Some(path) => {
            debug!("Loading config from {}", path);
            DocgridConfig::from_file(Path::new(path))?
        }
        None => {
            let default_path = config::default_config_path();
            if default_path.exists() {
                debug!("Loading config from {}", default_path.display());
                DocgridConfig::from_file(&default_path)?
            } else {
                DocgridConfig::default()
            }
        }
    };

    config.reconstruction.validate()?;
    Ok(config)
}
