//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for doiline
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub crossref: CrossrefConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub checkpoint: PathBuf,
    pub gzip_level: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        let defaults = doiline_crossref::Config::default();
        Self {
            dir: defaults.output_dir,
            checkpoint: defaults.checkpoint,
            gzip_level: defaults.gzip_level,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrossrefConfig {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub mailto: Option<String>,
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            base_url: doiline_crossref::Config::default().base_url,
            mailto: std::env::var("CROSSREF_MAILTO").ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub batch_size: usize,
    pub max_retries: u32,
    pub id_field: String,
    pub dedupe: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        let defaults = doiline_crossref::Config::default();
        Self {
            batch_size: defaults.batch_size,
            max_retries: defaults.max_retries,
            id_field: defaults.id_field,
            dedupe: defaults.dedupe,
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    match s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name).ok(),
        None => Some(s.to_string()),
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./doiline.toml (current directory)
    /// 2. ~/.config/doiline/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("doiline.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(dirs) = directories::ProjectDirs::from("", "", "doiline") {
            let user_config = dirs.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
