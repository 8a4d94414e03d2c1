use std::path::Path;

use {serde_json::Value, tracing::warn};

/// Returned for keys missing from every catalog.
pub const UNKNOWN_MESSAGE: &str = "❓ Unknown message key.";

const DEFAULT_LANGUAGE: &str = "en";

const BUNDLED: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en.json")),
    ("ar", include_str!("../locales/ar.json")),
];

/// A message catalog for one language, with English as fallback.
///
/// Keys are dotted paths (`addUser.addedSuccessfully`); `[name]`
/// placeholders are replaced on lookup.
#[derive(Debug, Clone)]
pub struct Localizer {
    language: String,
    messages: Value,
    fallback: Value,
}

impl Localizer {
    /// Catalog for a bundled language. Unknown languages fall back to English.
    #[must_use]
    pub fn bundled(language: &str) -> Self {
        Self::load(language, None)
    }

    /// Load `language`, layering `<dir>/<language>.json` over the bundled
    /// catalog when a directory is given. Never fails: unreadable files are
    /// logged and skipped.
    #[must_use]
    pub fn load(language: &str, dir: Option<&Path>) -> Self {
        let fallback = bundled_catalog(DEFAULT_LANGUAGE).unwrap_or(Value::Null);
        let mut messages = bundled_catalog(language);

        if let Some(dir) = dir {
            let path = dir.join(format!("{language}.json"));
            if path.exists() {
                match read_catalog(&path) {
                    Ok(custom) => {
                        let mut merged = messages.take().unwrap_or_else(|| fallback.clone());
                        merge(&mut merged, custom);
                        messages = Some(merged);
                    },
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "ignoring unreadable locale file");
                    },
                }
            }
        }

        let (language, messages) = match messages {
            Some(messages) => (language.to_string(), messages),
            None => {
                warn!(language, "no catalog for language, using {DEFAULT_LANGUAGE}");
                (DEFAULT_LANGUAGE.to_string(), fallback.clone())
            },
        };

        Self {
            language,
            messages,
            fallback,
        }
    }

    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    #[must_use]
    pub fn get(&self, key: &str) -> String {
        self.format(key, &[])
    }

    /// Look up `key` and replace every `[name]` with its value.
    #[must_use]
    pub fn format(&self, key: &str, replacements: &[(&str, &str)]) -> String {
        let template = match lookup(&self.messages, key) {
            Some(found) => found,
            None => match lookup(&self.fallback, key) {
                Some(found) => {
                    warn!(key, language = %self.language, "message key missing, using {DEFAULT_LANGUAGE}");
                    found
                },
                None => {
                    warn!(key, "missing localization key");
                    return UNKNOWN_MESSAGE.to_string();
                },
            },
        };

        replacements
            .iter()
            .fold(template.to_string(), |acc, (name, value)| {
                acc.replace(&format!("[{name}]"), value)
            })
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::bundled(DEFAULT_LANGUAGE)
    }
}

/// Whether a catalog ships inside the binary.
#[must_use]
pub fn is_bundled(language: &str) -> bool {
    BUNDLED.iter().any(|(lang, _)| *lang == language)
}

fn bundled_catalog(language: &str) -> Option<Value> {
    let (_, raw) = BUNDLED.iter().find(|(lang, _)| *lang == language)?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(language, error = %e, "bundled catalog is not valid JSON");
            None
        },
    }
}

#[derive(Debug, thiserror::Error)]
enum CatalogError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn read_catalog(path: &Path) -> Result<Value, CatalogError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn lookup<'a>(catalog: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(catalog, |node, part| node.get(part))?
        .as_str()
        .filter(|s| !s.is_empty())
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    },
                }
            }
        },
        (base, overlay) => *base = overlay,
    }
}
