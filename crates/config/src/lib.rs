//! Configuration loading, env substitution, and validation.
//!
//! Config files: `tempvoice.toml`, `tempvoice.yaml`, or `tempvoice.json`
//! Searched in `./` then `~/.config/tempvoice/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution anywhere in
//! the file.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{ConfigFormat, config_dir, data_dir, discover_and_load, load_config, load_or_discover},
    schema::{
        DiscordConfig, LocalesConfig, PanelConfig, PermissionName, RateLimitConfig, RoomsConfig,
        StorageConfig, TempVoiceConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
