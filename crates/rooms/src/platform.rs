//! The chat-platform seam.
//!
//! Lifecycle and dispatcher logic talk to the platform only through
//! [`Platform`], so they run unchanged against the gateway client or an
//! in-memory fake.

use {
    async_trait::async_trait,
    serenity::all::{ChannelId, GuildId, Permissions, UserId},
};

use crate::error::PlatformError;

pub type Result<T> = std::result::Result<T, PlatformError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Voice,
    Text,
}

/// Who a permission overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverwriteTarget {
    /// The guild's default role.
    Everyone,
    Member(UserId),
}

/// A partial overwrite change. Bits in neither set keep their current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverwriteEdit {
    pub allow: Permissions,
    pub deny: Permissions,
}

impl OverwriteEdit {
    #[must_use]
    pub fn allow(permissions: Permissions) -> Self {
        Self {
            allow: permissions,
            deny: Permissions::empty(),
        }
    }

    #[must_use]
    pub fn deny(permissions: Permissions) -> Self {
        Self {
            allow: Permissions::empty(),
            deny: permissions,
        }
    }

    /// Merge into an existing `(allow, deny)` pair.
    #[must_use]
    pub fn apply(self, allow: Permissions, deny: Permissions) -> (Permissions, Permissions) {
        ((allow - self.deny) | self.allow, (deny - self.allow) | self.deny)
    }
}

#[derive(Debug, Clone)]
pub struct NewChannel {
    pub name: String,
    pub kind: ChannelKind,
    pub category: ChannelId,
    pub overwrites: Vec<(OverwriteTarget, OverwriteEdit)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub id: UserId,
    pub username: String,
    /// Display tag used in replies and the panel footer.
    pub tag: String,
    pub avatar_url: Option<String>,
}

/// Content of the embed posted into a fresh text channel.
#[derive(Debug, Clone)]
pub struct ControlPanel {
    pub voice_channel_id: ChannelId,
    pub channel_name: String,
    pub owner: MemberInfo,
}

/// Operations the room logic needs from the chat platform.
///
/// Synchronous methods read local (cached) state; async ones hit the
/// network.
#[async_trait]
pub trait Platform: Send + Sync {
    /// The bot's own user, if known yet.
    fn bot_user_id(&self) -> Option<UserId>;

    fn guild_name(&self, guild_id: GuildId) -> Option<String>;

    fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> bool;

    /// Users currently connected to a voice channel.
    fn voice_members(&self, guild_id: GuildId, channel_id: ChannelId) -> Vec<UserId>;

    /// The voice channel a member is connected to, if any.
    fn member_voice_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId>;

    /// `Ok(None)` when the user is not a member of the guild.
    async fn fetch_member(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<MemberInfo>>;

    /// Effective view permission of a member on a channel.
    async fn can_view(&self, guild_id: GuildId, channel_id: ChannelId, user_id: UserId) -> Result<bool>;

    async fn create_channel(&self, guild_id: GuildId, channel: NewChannel) -> Result<ChannelId>;

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<()>;

    async fn edit_overwrite(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        target: OverwriteTarget,
        edit: OverwriteEdit,
    ) -> Result<()>;

    async fn rename_channel(&self, channel_id: ChannelId, name: &str) -> Result<()>;

    async fn set_user_limit(&self, channel_id: ChannelId, limit: u32) -> Result<()>;

    async fn move_member(&self, guild_id: GuildId, user_id: UserId, channel_id: ChannelId) -> Result<()>;

    async fn disconnect_member(&self, guild_id: GuildId, user_id: UserId) -> Result<()>;

    async fn post_control_panel(&self, text_channel_id: ChannelId, panel: &ControlPanel) -> Result<()>;

    async fn send_direct_message(&self, user_id: UserId, content: &str) -> Result<()>;
}
