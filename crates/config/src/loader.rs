use std::path::{Path, PathBuf};

use {
    serde::de::DeserializeOwned,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::TempVoiceConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "tempvoice.toml",
    "tempvoice.yaml",
    "tempvoice.yml",
    "tempvoice.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<TempVoiceConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./tempvoice.{toml,yaml,yml,json}`
/// 2. `~/.config/tempvoice/tempvoice.{toml,yaml,yml,json}`
///
/// Returns `TempVoiceConfig::default()` if no config file is found or the
/// file fails to parse.
pub fn discover_and_load() -> TempVoiceConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    TempVoiceConfig::default()
}

/// Load an explicitly requested file strictly, or fall back to discovery.
pub fn load_or_discover(path: Option<&Path>) -> anyhow::Result<TempVoiceConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(discover_and_load()),
    }
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/tempvoice/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tempvoice").map(|d| d.config_dir().to_path_buf())
}

/// Returns the data directory holding the record database.
///
/// Falls back to `./.tempvoice` when no home directory can be determined
/// (containers running as a bare uid).
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "tempvoice")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".tempvoice"))
}

/// Config file syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Files without an extension are read as TOML.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()).unwrap_or("toml") {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn parse<T: DeserializeOwned>(self, raw: &str) -> anyhow::Result<T> {
        Ok(match self {
            Self::Toml => toml::from_str(raw)?,
            Self::Yaml => serde_yaml::from_str(raw)?,
            Self::Json => serde_json::from_str(raw)?,
        })
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Toml => "TOML",
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        })
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<TempVoiceConfig> {
    match ConfigFormat::from_path(path) {
        Some(format) => format.parse(raw),
        None => anyhow::bail!("unsupported config format: {}", path.display()),
    }
}
