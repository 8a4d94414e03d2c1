/// Config schema types (discord credentials, rooms, panel, rate limit, storage).
use std::path::{Path, PathBuf};

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Deserializer, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TempVoiceConfig {
    pub discord: DiscordConfig,
    pub rooms: RoomsConfig,
    pub panel: PanelConfig,
    pub rate_limit: RateLimitConfig,
    pub storage: StorageConfig,
    pub locales: LocalesConfig,
}

/// Discord bot credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token from the developer portal. Usually `${DISCORD_TOKEN}`.
    #[serde(serialize_with = "serialize_redacted")]
    pub token: Secret<String>,
}

impl DiscordConfig {
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
        }
    }
}

/// The token never leaves the process through serialization.
fn serialize_redacted<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if secret.expose_secret().is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("[REDACTED]")
    }
}

/// Temporary channel provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    /// Voice channel whose entry provisions a new temporary pair.
    #[serde(deserialize_with = "deserialize_snowflake")]
    pub lobby_channel_id: u64,

    /// Category the temporary channels are created under.
    #[serde(deserialize_with = "deserialize_snowflake")]
    pub category_id: u64,

    /// Display language for every user-facing string (`en`, `ar`, ...).
    pub language: String,

    /// Permissions the bot grants itself on every temporary channel.
    pub bot_permissions: Vec<PermissionName>,

    /// Permissions the owner receives on the voice channel, on top of the
    /// manage permissions every owner holds.
    pub user_permissions: Vec<PermissionName>,

    /// Voice channel name; `{user}` is replaced by the owner's username.
    pub voice_name_template: String,

    /// Text channel name; `{user}` is replaced by the owner's username.
    pub text_name_template: String,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            lobby_channel_id: 0,
            category_id: 0,
            language: "en".into(),
            bot_permissions: vec![
                PermissionName::Connect,
                PermissionName::Speak,
                PermissionName::ManageChannels,
                PermissionName::MoveMembers,
                PermissionName::ViewChannel,
                PermissionName::ManageRoles,
            ],
            user_permissions: vec![
                PermissionName::ViewChannel,
                PermissionName::Connect,
                PermissionName::Speak,
                PermissionName::MoveMembers,
            ],
            voice_name_template: "{user}'s Channel".into(),
            text_name_template: "{user}-text".into(),
        }
    }
}

/// Channel permission names as the Discord client spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionName {
    ViewChannel,
    Connect,
    Speak,
    MoveMembers,
    ManageChannels,
    ManageRoles,
    SendMessages,
    ReadMessageHistory,
    EmbedLinks,
    AttachFiles,
    UseVoiceActivity,
    Stream,
}

impl PermissionName {
    pub const ALL: &[Self] = &[
        Self::ViewChannel,
        Self::Connect,
        Self::Speak,
        Self::MoveMembers,
        Self::ManageChannels,
        Self::ManageRoles,
        Self::SendMessages,
        Self::ReadMessageHistory,
        Self::EmbedLinks,
        Self::AttachFiles,
        Self::UseVoiceActivity,
        Self::Stream,
    ];
}

/// Control panel appearance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Embed accent color as `0xRRGGBB`.
    pub color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            color: 0x0099ff,
            image_url: Some("https://i.imgur.com/jaeJlPC.png".into()),
        }
    }
}

/// Per-user, per-action interaction throttle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Actions allowed per window. `0` disables throttling.
    pub max_actions: u32,
    pub window_secs: u64,
}

impl RateLimitConfig {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.max_actions > 0 && self.window_secs > 0
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_actions: 5,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file. Defaults to `<data dir>/tempvoice.db`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the database file, preferring the configured path, then
    /// `data_dir`.
    #[must_use]
    pub fn resolve_database_path(&self, data_dir: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| data_dir.join("tempvoice.db"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalesConfig {
    /// Directory of `<lang>.json` files overriding the bundled locales.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

/// Snowflakes arrive as integers from TOML and usually as strings from
/// JSON/YAML or env substitution inside quotes.
fn deserialize_snowflake<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => Ok(v),
        Raw::Str(s) if s.trim().is_empty() => Ok(0),
        Raw::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid snowflake id: {s:?}"))),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_bot() {
        let cfg = TempVoiceConfig::default();
        assert_eq!(cfg.rooms.language, "en");
        assert_eq!(cfg.rooms.bot_permissions.len(), 6);
        assert_eq!(cfg.rooms.user_permissions, vec![
            PermissionName::ViewChannel,
            PermissionName::Connect,
            PermissionName::Speak,
            PermissionName::MoveMembers,
        ]);
        assert_eq!(cfg.rate_limit.max_actions, 5);
        assert!(cfg.rate_limit.is_enabled());
        assert!(!cfg.discord.has_token());
    }

    #[test]
    fn snowflakes_accept_int_and_string() {
        let cfg: TempVoiceConfig = toml::from_str(
            r#"
[rooms]
lobby_channel_id = 1200000000000000001
category_id = "1200000000000000002"
"#,
        )
        .unwrap();
        assert_eq!(cfg.rooms.lobby_channel_id, 1_200_000_000_000_000_001);
        assert_eq!(cfg.rooms.category_id, 1_200_000_000_000_000_002);
    }

    #[test]
    fn bad_snowflake_is_rejected() {
        let err = toml::from_str::<TempVoiceConfig>("[rooms]\nlobby_channel_id = \"abc\"\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid snowflake"), "{err}");
    }

    #[test]
    fn unknown_permission_name_is_rejected() {
        assert!(
            toml::from_str::<TempVoiceConfig>("[rooms]\nbot_permissions = [\"Fly\"]\n").is_err()
        );
    }

    #[test]
    fn token_is_redacted_when_serialized() {
        let cfg = TempVoiceConfig {
            discord: DiscordConfig {
                token: Secret::new("abc.def".into()),
            },
            ..Default::default()
        };
        let out = toml::to_string(&cfg).unwrap();
        assert!(!out.contains("abc.def"));
        assert!(out.contains("[REDACTED]"));
        assert!(!format!("{:?}", cfg.discord).contains("abc.def"));
    }

    #[test]
    fn database_path_falls_back_to_data_dir() {
        let storage = StorageConfig::default();
        assert_eq!(
            storage.resolve_database_path(Path::new("/var/lib/tv")),
            PathBuf::from("/var/lib/tv/tempvoice.db")
        );
        let storage = StorageConfig {
            database_path: Some("/tmp/x.db".into()),
        };
        assert_eq!(
            storage.resolve_database_path(Path::new("/var/lib/tv")),
            PathBuf::from("/tmp/x.db")
        );
    }
}
