//! Configuration validation engine.
//!
//! Validates configuration files against the known schema, detects
//! unknown/misspelled fields, and reports values the bot cannot run with.

use std::{collections::HashMap, path::Path};

use crate::{loader::ConfigFormat, schema::TempVoiceConfig};

/// Languages shipped inside the binary.
pub const BUNDLED_LANGUAGES: &[&str] = &["en", "ar"];

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error", "required", "semantic", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "rooms.lobby_channel_id"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Struct};

    Struct(HashMap::from([
        ("discord", Struct(HashMap::from([("token", Leaf)]))),
        (
            "rooms",
            Struct(HashMap::from([
                ("lobby_channel_id", Leaf),
                ("category_id", Leaf),
                ("language", Leaf),
                ("bot_permissions", Leaf),
                ("user_permissions", Leaf),
                ("voice_name_template", Leaf),
                ("text_name_template", Leaf),
            ])),
        ),
        (
            "panel",
            Struct(HashMap::from([("color", Leaf), ("image_url", Leaf)])),
        ),
        (
            "rate_limit",
            Struct(HashMap::from([("max_actions", Leaf), ("window_secs", Leaf)])),
        ),
        (
            "storage",
            Struct(HashMap::from([("database_path", Leaf)])),
        ),
        ("locales", Struct(HashMap::from([("directory", Leaf)]))),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file (TOML, YAML or JSON) at the given path, or the discovered default
/// location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let Some(format) = ConfigFormat::from_path(actual_path) else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "file-ref",
                "",
                format!("unsupported config format: {}", actual_path.display()),
            )],
            config_path: Some(actual_path.clone()),
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let content = crate::env_subst::substitute_env(&content);
            let mut result = validate_str(&content, format);
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    validate_str(toml_str, ConfigFormat::Toml)
}

/// Validate config text in the given format without file-system side
/// effects.
#[must_use]
pub fn validate_str(raw: &str, format: ConfigFormat) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let value: serde_json::Value = match format.parse(raw) {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("{format} syntax error: {e}"),
            ));
            return ValidationResult {
                diagnostics,
                config_path: None,
            };
        },
    };

    let schema = build_schema_map();
    check_unknown_fields(&value, &schema, "", &mut diagnostics);

    match format.parse::<TempVoiceConfig>(raw) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (serde_json::Value::Object(table), KnownKeys::Struct(fields)) = (value, schema) else {
        return;
    };

    let known_keys: Vec<&str> = fields.keys().copied().collect();
    for (key, child_value) in table {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        if let Some(child_schema) = fields.get(key.as_str()) {
            check_unknown_fields(child_value, child_schema, &path, diagnostics);
            continue;
        }
        let level = if prefix.is_empty() {
            "at top level "
        } else {
            ""
        };
        let msg = match suggest(key, &known_keys, 3) {
            Some(s) => format!("unknown field {level}(did you mean \"{s}\"?)"),
            None => format!("unknown field {level}"),
        };
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "unknown-field",
            path,
            msg.trim(),
        ));
    }
}

/// Checks on a config that deserialized cleanly.
fn check_semantics(config: &TempVoiceConfig, diagnostics: &mut Vec<Diagnostic>) {
    if !config.discord.has_token() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "required",
            "discord.token",
            "bot token is empty (set it directly or via ${DISCORD_TOKEN})",
        ));
    }

    let rooms = &config.rooms;
    if rooms.lobby_channel_id == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "required",
            "rooms.lobby_channel_id",
            "lobby voice channel id is not set",
        ));
    }
    if rooms.category_id == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "required",
            "rooms.category_id",
            "category id is not set",
        ));
    }
    if rooms.lobby_channel_id != 0 && rooms.lobby_channel_id == rooms.category_id {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "semantic",
            "rooms.category_id",
            "category id equals the lobby channel id",
        ));
    }

    let language_available = BUNDLED_LANGUAGES.contains(&rooms.language.as_str())
        || config
            .locales
            .directory
            .as_ref()
            .is_some_and(|dir| dir.join(format!("{}.json", rooms.language)).exists());
    if !language_available {
        let hint = suggest(&rooms.language, BUNDLED_LANGUAGES, 1)
            .map(|s| format!(" (did you mean \"{s}\"?)"))
            .unwrap_or_default();
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "rooms.language",
            format!(
                "no locale bundle for \"{}\", falling back to \"en\"{hint}",
                rooms.language
            ),
        ));
    }

    for (path, list) in [
        ("rooms.bot_permissions", &rooms.bot_permissions),
        ("rooms.user_permissions", &rooms.user_permissions),
    ] {
        if list.is_empty() {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "semantic",
                path,
                "permission list is empty",
            ));
        }
    }

    for (path, template) in [
        ("rooms.voice_name_template", &rooms.voice_name_template),
        ("rooms.text_name_template", &rooms.text_name_template),
    ] {
        if template.trim().is_empty() {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "semantic",
                path,
                "channel name template is empty",
            ));
        } else if !template.contains("{user}") {
            diagnostics.push(Diagnostic::new(
                Severity::Info,
                "semantic",
                path,
                "template has no {user} placeholder; every channel gets the same name",
            ));
        }
    }

    if config.panel.color > 0xFF_FFFF {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "panel.color",
            "color is larger than 0xFFFFFF",
        ));
    }

    if config.rate_limit.max_actions > 0 && config.rate_limit.window_secs == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "semantic",
            "rate_limit.window_secs",
            "window is 0; rate limiting is disabled",
        ));
    }

    if let Some(dir) = &config.locales.directory
        && !dir.is_dir()
    {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "file-ref",
            "locales.directory",
            format!("directory not found: {}", dir.display()),
        ));
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
