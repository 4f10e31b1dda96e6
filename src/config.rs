//! Optional config file loading. Search order: ./gutscrape.toml, then
//! $XDG_CONFIG_HOME/gutscrape/config.toml (or ~/.config/gutscrape/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default, deny_unknown_fields)]
pub struct Config {
    /// Directory for cached raw book texts.
    pub cache_dir: Option<PathBuf>,
    /// Gutenberg site or mirror root, e.g. https://www.gutenberg.org.
    pub base_url: Option<String>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Delay in seconds between downloads. Fractions allowed.
    pub request_delay_secs: Option<f64>,
}

/// Search order: (1) ./gutscrape.toml, (2) $XDG_CONFIG_HOME/gutscrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("gutscrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("gutscrape").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            return load_config_file(path).map(Some);
        }
    }
    Ok(None)
}

/// Read and parse one config file.
pub fn load_config_file(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    let config: Config =
        toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(config)
}
