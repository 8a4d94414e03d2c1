//! [`Platform`] over serenity's HTTP client and gateway cache.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serenity::{
        all::{
            Cache, ChannelId, ChannelType, CreateChannel, CreateMessage, EditChannel, GuildId,
            Http, HttpError, Member, PermissionOverwrite, PermissionOverwriteType, Permissions,
            RoleId, UserId,
        },
        Error as SerenityError,
    },
    tempvoice_config::PanelConfig,
    tempvoice_rooms::{
        ControlPanel, Localizer, MemberInfo, Platform, PlatformError,
        platform::{ChannelKind, NewChannel, OverwriteEdit, OverwriteTarget, Result},
    },
    tracing::debug,
};

use crate::ui;

/// Discord error code for "Unknown Member".
const UNKNOWN_MEMBER: isize = 10007;
/// Discord error code for "Unknown User".
const UNKNOWN_USER: isize = 10013;

pub struct SerenityPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    bot_user_id: UserId,
    locale: Arc<Localizer>,
    panel: PanelConfig,
}

impl SerenityPlatform {
    pub fn new(
        http: Arc<Http>,
        cache: Arc<Cache>,
        bot_user_id: UserId,
        locale: Arc<Localizer>,
        panel: PanelConfig,
    ) -> Self {
        Self {
            http,
            cache,
            bot_user_id,
            locale,
            panel,
        }
    }

    fn http(&self) -> &Http {
        &self.http
    }

    fn cached_member(&self, guild_id: GuildId, user_id: UserId) -> Option<Member> {
        self.cache
            .guild(guild_id)
            .and_then(|guild| guild.members.get(&user_id).cloned())
    }

    /// Existing overwrite for `kind`, read fresh so back-to-back edits
    /// don't clobber each other through a stale cache.
    async fn current_overwrite(
        &self,
        channel_id: ChannelId,
        kind: PermissionOverwriteType,
    ) -> Result<(Permissions, Permissions)> {
        let channel = channel_id
            .to_channel(self.http())
            .await
            .map_err(|e| PlatformError::external("fetch channel", e))?
            .guild()
            .ok_or_else(|| PlatformError::not_found(format!("guild channel {channel_id}")))?;
        Ok(channel
            .permission_overwrites
            .iter()
            .find(|o| o.kind == kind)
            .map_or((Permissions::empty(), Permissions::empty()), |o| (o.allow, o.deny)))
    }
}

pub fn member_info(member: &Member) -> MemberInfo {
    MemberInfo {
        id: member.user.id,
        username: member.user.name.clone(),
        tag: member.user.tag(),
        avatar_url: Some(member.face()),
    }
}

fn overwrite_kind(guild_id: GuildId, target: OverwriteTarget) -> PermissionOverwriteType {
    match target {
        OverwriteTarget::Everyone => PermissionOverwriteType::Role(RoleId::new(guild_id.get())),
        OverwriteTarget::Member(user_id) => PermissionOverwriteType::Member(user_id),
    }
}

fn is_unknown_member(err: &SerenityError) -> bool {
    match err {
        SerenityError::Http(HttpError::UnsuccessfulRequest(response)) => {
            response.status_code.as_u16() == 404
                || matches!(response.error.code, UNKNOWN_MEMBER | UNKNOWN_USER)
        },
        _ => false,
    }
}

#[async_trait]
impl Platform for SerenityPlatform {
    fn bot_user_id(&self) -> Option<UserId> {
        Some(self.bot_user_id)
    }

    fn guild_name(&self, guild_id: GuildId) -> Option<String> {
        self.cache.guild(guild_id).map(|guild| guild.name.clone())
    }

    fn channel_exists(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.cache
            .guild(guild_id)
            .is_some_and(|guild| guild.channels.contains_key(&channel_id))
    }

    fn voice_members(&self, guild_id: GuildId, channel_id: ChannelId) -> Vec<UserId> {
        self.cache
            .guild(guild_id)
            .map(|guild| {
                guild
                    .voice_states
                    .values()
                    .filter(|state| state.channel_id == Some(channel_id))
                    .map(|state| state.user_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn member_voice_channel(&self, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        self.cache
            .guild(guild_id)?
            .voice_states
            .get(&user_id)
            .and_then(|state| state.channel_id)
    }

    async fn fetch_member(&self, guild_id: GuildId, user_id: UserId) -> Result<Option<MemberInfo>> {
        if let Some(member) = self.cached_member(guild_id, user_id) {
            return Ok(Some(member_info(&member)));
        }
        match guild_id.member(self.http(), user_id).await {
            Ok(member) => Ok(Some(member_info(&member))),
            Err(e) if is_unknown_member(&e) => Ok(None),
            Err(e) => Err(PlatformError::external("fetch member", e)),
        }
    }

    async fn can_view(&self, guild_id: GuildId, channel_id: ChannelId, user_id: UserId) -> Result<bool> {
        let member = match self.cached_member(guild_id, user_id) {
            Some(member) => member,
            None => guild_id
                .member(self.http(), user_id)
                .await
                .map_err(|e| PlatformError::external("fetch member", e))?,
        };
        let guild = self
            .cache
            .guild(guild_id)
            .ok_or_else(|| PlatformError::not_found(format!("guild {guild_id}")))?;
        let channel = guild
            .channels
            .get(&channel_id)
            .ok_or_else(|| PlatformError::not_found(format!("channel {channel_id}")))?;
        Ok(guild
            .user_permissions_in(channel, &member)
            .contains(Permissions::VIEW_CHANNEL))
    }

    async fn create_channel(&self, guild_id: GuildId, channel: NewChannel) -> Result<ChannelId> {
        let kind = match channel.kind {
            ChannelKind::Voice => ChannelType::Voice,
            ChannelKind::Text => ChannelType::Text,
        };
        let overwrites: Vec<PermissionOverwrite> = channel
            .overwrites
            .iter()
            .map(|(target, edit)| {
                let (allow, deny) = edit.apply(Permissions::empty(), Permissions::empty());
                PermissionOverwrite {
                    allow,
                    deny,
                    kind: overwrite_kind(guild_id, *target),
                }
            })
            .collect();
        let builder = CreateChannel::new(channel.name)
            .kind(kind)
            .category(channel.category)
            .permissions(overwrites);
        let created = guild_id
            .create_channel(self.http(), builder)
            .await
            .map_err(|e| PlatformError::external("create channel", e))?;
        debug!(channel_id = %created.id, kind = ?channel.kind, "channel created");
        Ok(created.id)
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<()> {
        channel_id
            .delete(self.http())
            .await
            .map(|_| ())
            .map_err(|e| PlatformError::external("delete channel", e))
    }

    async fn edit_overwrite(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        target: OverwriteTarget,
        edit: OverwriteEdit,
    ) -> Result<()> {
        let kind = overwrite_kind(guild_id, target);
        let (allow, deny) = self.current_overwrite(channel_id, kind).await?;
        let (allow, deny) = edit.apply(allow, deny);
        channel_id
            .create_permission(self.http(), PermissionOverwrite { allow, deny, kind })
            .await
            .map_err(|e| PlatformError::external("edit permission overwrite", e))
    }

    async fn rename_channel(&self, channel_id: ChannelId, name: &str) -> Result<()> {
        channel_id
            .edit(self.http(), EditChannel::new().name(name))
            .await
            .map(|_| ())
            .map_err(|e| PlatformError::external("rename channel", e))
    }

    async fn set_user_limit(&self, channel_id: ChannelId, limit: u32) -> Result<()> {
        channel_id
            .edit(self.http(), EditChannel::new().user_limit(limit))
            .await
            .map(|_| ())
            .map_err(|e| PlatformError::external("set user limit", e))
    }

    async fn move_member(&self, guild_id: GuildId, user_id: UserId, channel_id: ChannelId) -> Result<()> {
        guild_id
            .move_member(self.http(), user_id, channel_id)
            .await
            .map(|_| ())
            .map_err(|e| PlatformError::external("move member", e))
    }

    async fn disconnect_member(&self, guild_id: GuildId, user_id: UserId) -> Result<()> {
        guild_id
            .disconnect_member(self.http(), user_id)
            .await
            .map(|_| ())
            .map_err(|e| PlatformError::external("disconnect member", e))
    }

    async fn post_control_panel(&self, text_channel_id: ChannelId, panel: &ControlPanel) -> Result<()> {
        let message = ui::control_panel(&self.locale, &self.panel, panel);
        text_channel_id
            .send_message(self.http(), message)
            .await
            .map(|_| ())
            .map_err(|e| PlatformError::external("post control panel", e))
    }

    async fn send_direct_message(&self, user_id: UserId, content: &str) -> Result<()> {
        user_id
            .direct_message(self.http(), CreateMessage::new().content(content))
            .await
            .map(|_| ())
            .map_err(|e| PlatformError::external("send direct message", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn everyone_maps_to_guild_default_role() {
        let guild = GuildId::new(77);
        assert_eq!(
            overwrite_kind(guild, OverwriteTarget::Everyone),
            PermissionOverwriteType::Role(RoleId::new(77))
        );
        assert_eq!(
            overwrite_kind(guild, OverwriteTarget::Member(UserId::new(5))),
            PermissionOverwriteType::Member(UserId::new(5))
        );
    }

    #[test]
    fn non_http_errors_are_not_unknown_member() {
        let err = SerenityError::Other("boom");
        assert!(!is_unknown_member(&err));
    }
}
