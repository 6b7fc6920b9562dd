//! User configuration (`config.toml` in the platform config directory).
//!
//! ```toml
//! [eval]
//! error_policy = "propagate"
//! max_range_cells = 100000
//! ```

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;
use sheetcalc_core::EvalOptions;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub eval: EvalOptions,
}

impl Config {
    /// Load `explicit`, or the user config file when none is given.
    ///
    /// A missing user config file yields defaults; an explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match user_config_path() {
                Some(path) if path.is_file() => path,
                _ => return Ok(Config::default()),
            },
        };
        Self::load_from(&path)
    }

    fn load_from(path: &Path) -> Result<Config> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if meta.len() > MAX_CONFIG_FILE_BYTES {
            bail!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            );
        }
        debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn parse(content: &str) -> Result<Config> {
        Ok(toml::from_str(content)?)
    }
}

fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "sheetcalc")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}
