//! Creating channel pairs when members join the lobby and removing them
//! once they empty out.

use std::sync::Arc;

use {
    serenity::all::{ChannelId, GuildId, Permissions, UserId},
    tempvoice_config::RoomsConfig,
    tempvoice_store::{ChannelRecord, RecordKey, RecordStore},
    tracing::{debug, error, info, warn},
};

use crate::{
    error::LifecycleError,
    permissions::Grants,
    platform::{
        ChannelKind, ControlPanel, MemberInfo, NewChannel, OverwriteEdit, OverwriteTarget,
        Platform,
    },
    stats,
};

/// Channel names are capped by the platform.
const MAX_CHANNEL_NAME_CHARS: usize = 100;

/// Static room settings resolved from config.
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub lobby_channel_id: ChannelId,
    pub category_id: ChannelId,
    pub voice_name_template: String,
    pub text_name_template: String,
    pub grants: Grants,
}

impl RoomSettings {
    /// `None` when the lobby or category is unset.
    #[must_use]
    pub fn from_config(rooms: &RoomsConfig) -> Option<Self> {
        if rooms.lobby_channel_id == 0 || rooms.category_id == 0 {
            return None;
        }
        Some(Self {
            lobby_channel_id: ChannelId::new(rooms.lobby_channel_id),
            category_id: ChannelId::new(rooms.category_id),
            voice_name_template: rooms.voice_name_template.clone(),
            text_name_template: rooms.text_name_template.clone(),
            grants: Grants::from_config(rooms),
        })
    }

    fn voice_name(&self, username: &str) -> String {
        render_name(&self.voice_name_template, username)
    }

    fn text_name(&self, username: &str) -> String {
        render_name(&self.text_name_template, username)
    }
}

fn render_name(template: &str, username: &str) -> String {
    template
        .replace("{user}", username)
        .chars()
        .take(MAX_CHANNEL_NAME_CHARS)
        .collect()
}

/// A member's voice connection changed.
#[derive(Debug, Clone)]
pub struct VoiceTransition {
    pub guild_id: GuildId,
    pub member: MemberInfo,
    pub old_channel: Option<ChannelId>,
    pub new_channel: Option<ChannelId>,
}

/// Result of checking one recorded channel for reclamation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reclaim {
    /// The channel is not a temporary room.
    NotManaged,
    /// Still has members; nothing done.
    Occupied(usize),
    /// Empty room deleted along with its record.
    Reclaimed,
    /// The voice channel was already gone; the record was dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub checked: usize,
    pub reclaimed: usize,
    pub stale: usize,
    pub failed: usize,
}

pub struct Lifecycle {
    settings: RoomSettings,
    store: Arc<dyn RecordStore>,
    platform: Arc<dyn Platform>,
}

impl Lifecycle {
    pub fn new(settings: RoomSettings, store: Arc<dyn RecordStore>, platform: Arc<dyn Platform>) -> Self {
        Self {
            settings,
            store,
            platform,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    /// Handle one voice-state change. Provisioning runs only for a fresh
    /// connection straight into the lobby; any departure from a channel
    /// triggers a reclaim check on it. Errors are logged, never returned.
    pub async fn on_voice_transition(&self, transition: &VoiceTransition) {
        let VoiceTransition {
            guild_id,
            member,
            old_channel,
            new_channel,
        } = transition;

        if old_channel.is_none() && *new_channel == Some(self.settings.lobby_channel_id) {
            if let Err(e) = self.provision(*guild_id, member).await {
                error!(
                    guild_id = %guild_id,
                    user_id = %member.id,
                    error = %e,
                    "failed to provision room"
                );
            }
        }

        if let Some(old) = *old_channel
            && *new_channel != Some(old)
        {
            if let Err(e) = self.reclaim(*guild_id, old).await {
                error!(guild_id = %guild_id, channel_id = %old, error = %e, "failed to reclaim room");
            }
        }
    }

    /// Create a voice/text pair owned by `member`, record it, move them in
    /// and post the control panel.
    ///
    /// The record is written as soon as both channels exist. A failed move
    /// leaves an empty room, which is reclaimed before returning the error.
    pub async fn provision(&self, guild_id: GuildId, member: &MemberInfo) -> Result<RecordKey, LifecycleError> {
        let grants = &self.settings.grants;
        let bot = self.platform.bot_user_id();

        let voice_name = self.settings.voice_name(&member.username);
        let voice = NewChannel {
            name: voice_name.clone(),
            kind: ChannelKind::Voice,
            category: self.settings.category_id,
            overwrites: overwrites(member, bot, grants.owner_voice, grants.bot_voice),
        };
        let voice_channel_id = self
            .platform
            .create_channel(guild_id, voice)
            .await
            .map_err(LifecycleError::platform("create voice channel"))?;

        let text = NewChannel {
            name: self.settings.text_name(&member.username),
            kind: ChannelKind::Text,
            category: self.settings.category_id,
            overwrites: overwrites(member, bot, grants.owner_text, grants.bot_text),
        };
        let text_channel_id = self
            .platform
            .create_channel(guild_id, text)
            .await
            .map_err(|e| {
                warn!(channel_id = %voice_channel_id, "voice channel left without a text channel");
                LifecycleError::platform("create text channel")(e)
            })?;

        let key = RecordKey::new(guild_id, voice_channel_id);
        let record = ChannelRecord::new(voice_channel_id, text_channel_id, member.id);
        self.store.set(&key, &record).await?;
        stats::room_provisioned();
        info!(
            guild_id = %guild_id,
            owner_id = %member.id,
            voice_channel_id = %voice_channel_id,
            text_channel_id = %text_channel_id,
            "room provisioned"
        );

        if let Err(e) = self
            .platform
            .move_member(guild_id, member.id, voice_channel_id)
            .await
        {
            if let Err(reclaim) = self.reclaim(guild_id, voice_channel_id).await {
                warn!(key = %key, error = %reclaim, "failed to reclaim unused room");
            }
            return Err(LifecycleError::platform("move member")(e));
        }

        let panel = ControlPanel {
            voice_channel_id,
            channel_name: voice_name,
            owner: member.clone(),
        };
        if let Err(e) = self
            .platform
            .post_control_panel(text_channel_id, &panel)
            .await
        {
            warn!(key = %key, error = %e, "failed to post control panel");
        }

        Ok(key)
    }

    /// Delete a recorded room if nobody is left in it.
    pub async fn reclaim(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<Reclaim, LifecycleError> {
        let key = RecordKey::new(guild_id, channel_id);
        let Some(record) = self.store.get(&key).await? else {
            return Ok(Reclaim::NotManaged);
        };

        if !self.platform.channel_exists(guild_id, record.voice_channel_id) {
            self.delete_text_channel(guild_id, &record).await;
            self.store.delete(&key).await?;
            info!(key = %key, "dropped record of vanished room");
            return Ok(Reclaim::Stale);
        }

        let occupants = self
            .platform
            .voice_members(guild_id, record.voice_channel_id)
            .len();
        if occupants > 0 {
            debug!(key = %key, occupants, "room still occupied");
            return Ok(Reclaim::Occupied(occupants));
        }

        // Keep the record so the next departure or sweep retries.
        self.platform
            .delete_channel(record.voice_channel_id)
            .await
            .map_err(LifecycleError::platform("delete voice channel"))?;
        self.delete_text_channel(guild_id, &record).await;
        self.store.delete(&key).await?;
        stats::room_reclaimed();
        info!(key = %key, "room reclaimed");
        Ok(Reclaim::Reclaimed)
    }

    /// Re-check every recorded room of a guild. Run when a guild becomes
    /// available, to catch rooms that emptied while the bot was offline.
    pub async fn sweep(&self, guild_id: GuildId) -> Result<SweepSummary, LifecycleError> {
        let records = self.store.list(guild_id).await?;
        let mut summary = SweepSummary::default();
        for (key, _) in records {
            summary.checked += 1;
            match self.reclaim(guild_id, key.channel_id).await {
                Ok(Reclaim::Reclaimed) => summary.reclaimed += 1,
                Ok(Reclaim::Stale) => summary.stale += 1,
                Ok(Reclaim::Occupied(_) | Reclaim::NotManaged) => {},
                Err(e) => {
                    summary.failed += 1;
                    warn!(key = %key, error = %e, "sweep failed for room");
                },
            }
        }
        if summary.checked > 0 {
            info!(
                guild_id = %guild_id,
                checked = summary.checked,
                reclaimed = summary.reclaimed,
                stale = summary.stale,
                failed = summary.failed,
                "room sweep finished"
            );
        }
        Ok(summary)
    }

    async fn delete_text_channel(&self, guild_id: GuildId, record: &ChannelRecord) {
        if !self.platform.channel_exists(guild_id, record.text_channel_id) {
            return;
        }
        if let Err(e) = self.platform.delete_channel(record.text_channel_id).await {
            warn!(channel_id = %record.text_channel_id, error = %e, "failed to delete text channel");
        }
    }
}

fn overwrites(
    owner: &MemberInfo,
    bot: Option<UserId>,
    owner_allow: Permissions,
    bot_allow: Permissions,
) -> Vec<(OverwriteTarget, OverwriteEdit)> {
    let mut list = vec![
        (
            OverwriteTarget::Everyone,
            OverwriteEdit::deny(Permissions::VIEW_CHANNEL),
        ),
        (
            OverwriteTarget::Member(owner.id),
            OverwriteEdit::allow(owner_allow),
        ),
    ];
    if let Some(bot) = bot {
        list.push((OverwriteTarget::Member(bot), OverwriteEdit::allow(bot_allow)));
    }
    list
}
