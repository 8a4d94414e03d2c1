//! In-memory [`Platform`] for exercising room logic without a gateway.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use {
    async_trait::async_trait,
    serenity::all::{ChannelId, GuildId, Permissions, UserId},
};

use crate::{
    error::PlatformError,
    platform::{
        ChannelKind, ControlPanel, MemberInfo, NewChannel, OverwriteEdit, OverwriteTarget,
        Platform, Result,
    },
};

pub fn bot() -> UserId {
    UserId::new(999)
}

pub fn guild() -> GuildId {
    GuildId::new(1)
}

#[derive(Debug, Clone)]
pub struct FakeChannel {
    pub name: String,
    pub kind: ChannelKind,
    pub category: ChannelId,
    pub overwrites: HashMap<OverwriteTarget, (Permissions, Permissions)>,
    pub user_limit: Option<u32>,
}

impl FakeChannel {
    pub fn allow(&self, target: OverwriteTarget) -> Permissions {
        self.overwrites.get(&target).map_or(Permissions::empty(), |o| o.0)
    }

    pub fn deny(&self, target: OverwriteTarget) -> Permissions {
        self.overwrites.get(&target).map_or(Permissions::empty(), |o| o.1)
    }
}

#[derive(Default)]
struct State {
    next_id: u64,
    channels: HashMap<ChannelId, FakeChannel>,
    voice: HashMap<UserId, ChannelId>,
    members: HashMap<UserId, MemberInfo>,
    panels: Vec<(ChannelId, ControlPanel)>,
    dms: Vec<(UserId, String)>,
    failing: HashSet<&'static str>,
    dm_blocked: HashSet<UserId>,
    calls: Vec<&'static str>,
}

pub struct FakePlatform {
    state: Mutex<State>,
}

pub fn member(id: u64, name: &str) -> MemberInfo {
    MemberInfo {
        id: UserId::new(id),
        username: name.to_string(),
        tag: name.to_string(),
        avatar_url: None,
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
        }
    }

    pub fn add_member(&self, info: MemberInfo) {
        self.state.lock().unwrap().members.insert(info.id, info);
    }

    /// Register an existing channel (lobby, pre-made rooms).
    pub fn add_channel(&self, id: ChannelId, name: &str, kind: ChannelKind) {
        self.state.lock().unwrap().channels.insert(id, FakeChannel {
            name: name.to_string(),
            kind,
            category: ChannelId::new(1),
            overwrites: HashMap::new(),
            user_limit: None,
        });
    }

    pub fn remove_channel(&self, id: ChannelId) {
        self.state.lock().unwrap().channels.remove(&id);
    }

    pub fn join(&self, user: UserId, channel: ChannelId) {
        self.state.lock().unwrap().voice.insert(user, channel);
    }

    pub fn leave(&self, user: UserId) {
        self.state.lock().unwrap().voice.remove(&user);
    }

    /// Make every call to `op` fail.
    pub fn fail(&self, op: &'static str) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.state.lock().unwrap().failing.remove(op);
    }

    pub fn fail_dm_to(&self, user: UserId) {
        self.state.lock().unwrap().dm_blocked.insert(user);
    }

    pub fn channel(&self, id: ChannelId) -> Option<FakeChannel> {
        self.state.lock().unwrap().channels.get(&id).cloned()
    }

    pub fn channel_count(&self) -> usize {
        self.state.lock().unwrap().channels.len()
    }

    pub fn voice_channel_of(&self, user: UserId) -> Option<ChannelId> {
        self.state.lock().unwrap().voice.get(&user).copied()
    }

    pub fn panels(&self) -> Vec<ChannelId> {
        self.state
            .lock()
            .unwrap()
            .panels
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn dms(&self) -> Vec<(UserId, String)> {
        self.state.lock().unwrap().dms.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn enter(&self, op: &'static str) -> Result<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(op);
        if state.failing.contains(op) {
            return Err(PlatformError::external(
                op,
                std::io::Error::other("injected failure"),
            ));
        }
        Ok(state)
    }
}

fn channel_mut(state: &mut State, id: ChannelId) -> Result<&mut FakeChannel> {
    state
        .channels
        .get_mut(&id)
        .ok_or_else(|| PlatformError::not_found(format!("channel {id}")))
}

#[async_trait]
impl Platform for FakePlatform {
    fn bot_user_id(&self) -> Option<UserId> {
        Some(bot())
    }

    fn guild_name(&self, _guild_id: GuildId) -> Option<String> {
        Some("Test Guild".to_string())
    }

    fn channel_exists(&self, _guild_id: GuildId, channel_id: ChannelId) -> bool {
        self.state.lock().unwrap().channels.contains_key(&channel_id)
    }

    fn voice_members(&self, _guild_id: GuildId, channel_id: ChannelId) -> Vec<UserId> {
        let state = self.state.lock().unwrap();
        let mut users: Vec<UserId> = state
            .voice
            .iter()
            .filter(|(_, ch)| **ch == channel_id)
            .map(|(user, _)| *user)
            .collect();
        users.sort_by_key(|u| u.get());
        users
    }

    fn member_voice_channel(&self, _guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
        self.voice_channel_of(user_id)
    }

    async fn fetch_member(&self, _guild_id: GuildId, user_id: UserId) -> Result<Option<MemberInfo>> {
        let state = self.enter("fetch_member")?;
        Ok(state.members.get(&user_id).cloned())
    }

    async fn can_view(&self, _guild_id: GuildId, channel_id: ChannelId, user_id: UserId) -> Result<bool> {
        let mut state = self.enter("can_view")?;
        let channel = channel_mut(&mut state, channel_id)?;
        let member = OverwriteTarget::Member(user_id);
        if channel.allow(member).contains(Permissions::VIEW_CHANNEL) {
            return Ok(true);
        }
        if channel.deny(member).contains(Permissions::VIEW_CHANNEL) {
            return Ok(false);
        }
        Ok(!channel
            .deny(OverwriteTarget::Everyone)
            .contains(Permissions::VIEW_CHANNEL))
    }

    async fn create_channel(&self, _guild_id: GuildId, channel: NewChannel) -> Result<ChannelId> {
        let op = match channel.kind {
            ChannelKind::Voice => "create_voice",
            ChannelKind::Text => "create_text",
        };
        let mut state = self.enter(op)?;
        state.next_id += 1;
        let id = ChannelId::new(state.next_id);
        let overwrites = channel
            .overwrites
            .iter()
            .map(|(target, edit)| (*target, edit.apply(Permissions::empty(), Permissions::empty())))
            .collect();
        state.channels.insert(id, FakeChannel {
            name: channel.name,
            kind: channel.kind,
            category: channel.category,
            overwrites,
            user_limit: None,
        });
        Ok(id)
    }

    async fn delete_channel(&self, channel_id: ChannelId) -> Result<()> {
        let mut state = self.enter("delete_channel")?;
        state
            .channels
            .remove(&channel_id)
            .map(|_| ())
            .ok_or_else(|| PlatformError::not_found(format!("channel {channel_id}")))?;
        state.voice.retain(|_, ch| *ch != channel_id);
        Ok(())
    }

    async fn edit_overwrite(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
        target: OverwriteTarget,
        edit: OverwriteEdit,
    ) -> Result<()> {
        let mut state = self.enter("edit_overwrite")?;
        let channel = channel_mut(&mut state, channel_id)?;
        let (allow, deny) = channel
            .overwrites
            .get(&target)
            .copied()
            .unwrap_or((Permissions::empty(), Permissions::empty()));
        channel.overwrites.insert(target, edit.apply(allow, deny));
        Ok(())
    }

    async fn rename_channel(&self, channel_id: ChannelId, name: &str) -> Result<()> {
        let mut state = self.enter("rename_channel")?;
        channel_mut(&mut state, channel_id)?.name = name.to_string();
        Ok(())
    }

    async fn set_user_limit(&self, channel_id: ChannelId, limit: u32) -> Result<()> {
        let mut state = self.enter("set_user_limit")?;
        channel_mut(&mut state, channel_id)?.user_limit = Some(limit);
        Ok(())
    }

    async fn move_member(&self, _guild_id: GuildId, user_id: UserId, channel_id: ChannelId) -> Result<()> {
        let mut state = self.enter("move_member")?;
        channel_mut(&mut state, channel_id)?;
        state.voice.insert(user_id, channel_id);
        Ok(())
    }

    async fn disconnect_member(&self, _guild_id: GuildId, user_id: UserId) -> Result<()> {
        let mut state = self.enter("disconnect_member")?;
        state.voice.remove(&user_id);
        Ok(())
    }

    async fn post_control_panel(&self, text_channel_id: ChannelId, panel: &ControlPanel) -> Result<()> {
        let mut state = self.enter("post_control_panel")?;
        state.panels.push((text_channel_id, panel.clone()));
        Ok(())
    }

    async fn send_direct_message(&self, user_id: UserId, content: &str) -> Result<()> {
        let mut state = self.enter("send_direct_message")?;
        if state.dm_blocked.contains(&user_id) {
            return Err(PlatformError::external(
                "send_direct_message",
                std::io::Error::other("cannot send messages to this user"),
            ));
        }
        state.dms.push((user_id, content.to_string()));
        Ok(())
    }
}
