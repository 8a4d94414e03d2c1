//! Ownership-gated handling of control-panel interactions.

use std::sync::Arc;

use {
    serenity::all::{ChannelId, GuildId, Permissions, UserId},
    tempvoice_store::{ChannelRecord, RecordKey, RecordStore},
    tracing::{debug, info, warn},
};

use crate::{
    action::{Command, Form, PanelAction, Picker},
    error::{ActionError, InvalidInput, PlatformError},
    locale::Localizer,
    notify::{Notification, NotificationQueue},
    permissions::{MEMBER_TEXT, MEMBER_VOICE, OWNER_MANAGE},
    platform::{MemberInfo, OverwriteEdit, OverwriteTarget, Platform},
    stats,
    throttle::ActionThrottle,
};

const MAX_CHANNEL_NAME_CHARS: usize = 100;
const USER_LIMIT_RANGE: std::ops::RangeInclusive<u32> = 1..=99;

/// Who triggered an interaction, and where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Invocation {
    pub guild_id: GuildId,
    pub user_id: UserId,
}

/// What the gateway layer should show the invoking user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// An ephemeral text reply.
    Message(String),
    /// Open a modal form.
    Form { form: Form, channel_id: ChannelId },
    /// Show a user picker.
    Picker { picker: Picker, channel_id: ChannelId },
    /// Ask for confirmation before deleting the room.
    ConfirmDelete { channel_id: ChannelId },
}

/// Per-user result of a bulk picker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOutcome {
    Done,
    AlreadyDone,
    Failed(FailureReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Blacklisted,
    NotFound,
    NotInChannel,
    IsOwner,
    Error,
}

impl FailureReason {
    fn locale_key(self) -> &'static str {
        match self {
            Self::Blacklisted => "reasons.blacklisted",
            Self::NotFound => "reasons.notFound",
            Self::NotInChannel => "reasons.notInChannel",
            Self::IsOwner => "reasons.isOwner",
            Self::Error => "reasons.error",
        }
    }
}

/// A record that passed the ownership gate.
struct Room {
    guild_id: GuildId,
    key: RecordKey,
    record: ChannelRecord,
}

pub struct Dispatcher {
    store: Arc<dyn RecordStore>,
    platform: Arc<dyn Platform>,
    locale: Arc<Localizer>,
    notifications: NotificationQueue,
    throttle: Option<ActionThrottle>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn RecordStore>,
        platform: Arc<dyn Platform>,
        locale: Arc<Localizer>,
        notifications: NotificationQueue,
    ) -> Self {
        Self {
            store,
            platform,
            locale,
            notifications,
            throttle: None,
        }
    }

    #[must_use]
    pub fn with_throttle(mut self, throttle: Option<ActionThrottle>) -> Self {
        self.throttle = throttle;
        self
    }

    #[must_use]
    pub fn locale(&self) -> &Localizer {
        &self.locale
    }

    /// Run a decoded command. Every failure becomes a localized message.
    pub async fn dispatch(&self, invocation: Invocation, command: Command) -> Reply {
        let name = command.name();
        match self.try_dispatch(invocation, command).await {
            Ok(reply) => {
                stats::action(name, "ok");
                reply
            },
            Err(e) => {
                stats::action(name, e.kind());
                match &e {
                    ActionError::OperationFailed { .. } => warn!(
                        action = name,
                        user_id = %invocation.user_id,
                        error = %e,
                        "action failed"
                    ),
                    _ => debug!(
                        action = name,
                        user_id = %invocation.user_id,
                        error = %e,
                        "action rejected"
                    ),
                }
                Reply::Message(self.render_error(&e))
            },
        }
    }

    #[must_use]
    pub fn render_error(&self, error: &ActionError) -> String {
        self.locale.get(error.locale_key())
    }

    async fn try_dispatch(&self, invocation: Invocation, command: Command) -> Result<Reply, ActionError> {
        if let Some(throttle) = &self.throttle
            && !throttle.check(invocation.user_id, command.name())
        {
            return Err(ActionError::RateLimited {
                action: command.name(),
            });
        }

        let room = self.authorize(invocation, command.channel_id()).await?;

        match command {
            Command::Button { action, channel_id } => self.button(invocation, room, action, channel_id).await,
            Command::Select { picker, users, .. } => self.select(invocation, room, picker, users).await,
            Command::Submit { form, value, .. } => self.submit(room, form, &value).await,
        }
    }

    /// Record exists, voice channel is live, invoker owns it.
    async fn authorize(&self, invocation: Invocation, channel_id: ChannelId) -> Result<Room, ActionError> {
        let key = RecordKey::new(invocation.guild_id, channel_id);
        let record = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| ActionError::ChannelDataNotFound {
                key: key.to_string(),
            })?;

        if !self
            .platform
            .channel_exists(invocation.guild_id, record.voice_channel_id)
        {
            return Err(ActionError::VoiceChannelNotFound {
                channel_id: record.voice_channel_id,
            });
        }

        if !record.is_owner(invocation.user_id) {
            return Err(ActionError::PermissionDenied {
                user_id: invocation.user_id,
            });
        }

        Ok(Room {
            guild_id: invocation.guild_id,
            key,
            record,
        })
    }

    fn require_text_channel(&self, room: &Room) -> Result<(), ActionError> {
        if self
            .platform
            .channel_exists(room.guild_id, room.record.text_channel_id)
        {
            Ok(())
        } else {
            Err(ActionError::VoiceChannelNotFound {
                channel_id: room.record.text_channel_id,
            })
        }
    }

    async fn button(
        &self,
        invocation: Invocation,
        room: Room,
        action: PanelAction,
        channel_id: ChannelId,
    ) -> Result<Reply, ActionError> {
        match action {
            PanelAction::Hide => {
                self.edit_everyone(&room, OverwriteEdit::deny(Permissions::VIEW_CHANNEL))
                    .await?;
                Ok(self.message("interactionCreate.channelHidden"))
            },
            PanelAction::Unhide => {
                self.edit_everyone(&room, OverwriteEdit::allow(Permissions::VIEW_CHANNEL))
                    .await?;
                Ok(self.message("interactionCreate.channelUnhidden"))
            },
            PanelAction::Lock => {
                self.edit_everyone(&room, OverwriteEdit::deny(Permissions::CONNECT))
                    .await?;
                Ok(self.message("interactionCreate.channelLocked"))
            },
            PanelAction::Unlock => {
                self.edit_everyone(&room, OverwriteEdit::allow(Permissions::CONNECT))
                    .await?;
                Ok(self.message("interactionCreate.channelUnlocked"))
            },
            PanelAction::Rename => Ok(Reply::Form {
                form: Form::Rename,
                channel_id,
            }),
            PanelAction::SetLimit => Ok(Reply::Form {
                form: Form::Limit,
                channel_id,
            }),
            PanelAction::AddMember => Ok(Reply::Picker {
                picker: Picker::AddMember,
                channel_id,
            }),
            PanelAction::Blacklist => Ok(Reply::Picker {
                picker: Picker::Blacklist,
                channel_id,
            }),
            PanelAction::RemoveMember => {
                if self.others_in_voice(&room, invocation.user_id).is_empty() {
                    return Ok(self.message("removeMember.noMembersInChannel"));
                }
                Ok(Reply::Picker {
                    picker: Picker::RemoveMember,
                    channel_id,
                })
            },
            PanelAction::TransferOwnership => {
                if self.others_in_voice(&room, invocation.user_id).is_empty() {
                    return Ok(self.message("transferOwnership.noEligibleMembers"));
                }
                Ok(Reply::Picker {
                    picker: Picker::TransferOwnership,
                    channel_id,
                })
            },
            PanelAction::Delete => Ok(Reply::ConfirmDelete { channel_id }),
            PanelAction::ConfirmDelete => {
                self.delete_room(&room).await?;
                Ok(self.message("deleteConfirmation.deletionSuccess"))
            },
            PanelAction::CancelDelete => Ok(self.message("deleteConfirmation.deletionCanceled")),
        }
    }

    async fn select(
        &self,
        invocation: Invocation,
        room: Room,
        picker: Picker,
        users: Vec<UserId>,
    ) -> Result<Reply, ActionError> {
        if users.is_empty() {
            return Err(InvalidInput::NoSelection.into());
        }

        match picker {
            Picker::AddMember => {
                self.require_text_channel(&room)?;
                let outcomes = self.add_members(&room, invocation.user_id, &users).await;
                Ok(Reply::Message(self.report(
                    "addUser",
                    ("addedSuccessfully", "alreadyInChannel", "addFailed"),
                    &outcomes,
                )))
            },
            Picker::RemoveMember => {
                let outcomes = self.remove_members(&room, &users).await;
                Ok(Reply::Message(self.report(
                    "removeMember",
                    ("removedSuccessfully", "removedSuccessfully", "removeFailed"),
                    &outcomes,
                )))
            },
            Picker::Blacklist => {
                let outcomes = self.blacklist(room, &users).await?;
                Ok(Reply::Message(self.report(
                    "blacklist",
                    ("added", "alreadyBlacklisted", "failed"),
                    &outcomes,
                )))
            },
            Picker::TransferOwnership => {
                self.require_text_channel(&room)?;
                let target = users.first().copied().ok_or(InvalidInput::NoSelection)?;
                let new_owner = self.transfer(room, target).await?;
                Ok(Reply::Message(self.locale.format(
                    "transferOwnership.success",
                    &[("user", &new_owner.tag)],
                )))
            },
        }
    }

    async fn submit(&self, room: Room, form: Form, value: &str) -> Result<Reply, ActionError> {
        match form {
            Form::Rename => {
                let name = value.trim();
                let len = name.chars().count();
                if !(1..=MAX_CHANNEL_NAME_CHARS).contains(&len) {
                    return Err(InvalidInput::ChannelName { len }.into());
                }
                self.platform
                    .rename_channel(room.record.voice_channel_id, name)
                    .await
                    .map_err(|e| ActionError::failed("rename channel", e))?;
                info!(key = %room.key, name, "room renamed");
                Ok(Reply::Message(self.locale.format(
                    "voiceStateUpdate.channelRenamed",
                    &[("newName", name)],
                )))
            },
            Form::Limit => {
                let limit = parse_user_limit(value)?;
                self.platform
                    .set_user_limit(room.record.voice_channel_id, limit)
                    .await
                    .map_err(|e| ActionError::failed("set user limit", e))?;
                info!(key = %room.key, limit, "room user limit set");
                Ok(Reply::Message(self.locale.format(
                    "voiceStateUpdate.userLimitSet",
                    &[("newLimit", &limit.to_string())],
                )))
            },
        }
    }

    async fn edit_everyone(&self, room: &Room, edit: OverwriteEdit) -> Result<(), ActionError> {
        self.platform
            .edit_overwrite(
                room.guild_id,
                room.record.voice_channel_id,
                OverwriteTarget::Everyone,
                edit,
            )
            .await
            .map_err(|e| ActionError::failed("edit @everyone overwrite", e))
    }

    fn others_in_voice(&self, room: &Room, invoker: UserId) -> Vec<UserId> {
        self.platform
            .voice_members(room.guild_id, room.record.voice_channel_id)
            .into_iter()
            .filter(|user| *user != invoker)
            .collect()
    }

    /// Voice channel first; a lingering text channel is logged, not fatal.
    async fn delete_room(&self, room: &Room) -> Result<(), ActionError> {
        self.platform
            .delete_channel(room.record.voice_channel_id)
            .await
            .map_err(|e| ActionError::failed("delete voice channel", e))?;
        if self
            .platform
            .channel_exists(room.guild_id, room.record.text_channel_id)
            && let Err(e) = self.platform.delete_channel(room.record.text_channel_id).await
        {
            warn!(key = %room.key, error = %e, "failed to delete text channel");
        }
        self.store.delete(&room.key).await?;
        info!(key = %room.key, "room deleted by owner");
        Ok(())
    }

    async fn add_members(
        &self,
        room: &Room,
        invoker: UserId,
        users: &[UserId],
    ) -> Vec<(String, MemberOutcome)> {
        let guild_name = self.platform.guild_name(room.guild_id).unwrap_or_default();
        let invoker_name = match self.platform.fetch_member(room.guild_id, invoker).await {
            Ok(Some(info)) => info.tag,
            _ => invoker.to_string(),
        };

        let mut outcomes = Vec::with_capacity(users.len());
        for user in users {
            let (label, outcome) = match self.add_member(room, *user).await {
                Ok((info, outcome)) => (info.tag, outcome),
                Err((label, reason)) => (label, MemberOutcome::Failed(reason)),
            };
            if outcome == MemberOutcome::Done {
                self.notifications.push(Notification::new(
                    *user,
                    self.locale.format("addUser.dmNotification", &[
                        ("user", &invoker_name),
                        ("channel", &format!("<#{}>", room.record.voice_channel_id)),
                        ("guild", &guild_name),
                    ]),
                ));
            }
            outcomes.push((label, outcome));
        }
        outcomes
    }

    async fn add_member(
        &self,
        room: &Room,
        user: UserId,
    ) -> Result<(MemberInfo, MemberOutcome), (String, FailureReason)> {
        let info = self
            .fetch(room.guild_id, user)
            .await?
            .ok_or_else(|| (user.to_string(), FailureReason::NotFound))?;

        if room.record.is_blacklisted(user) {
            return Err((info.tag, FailureReason::Blacklisted));
        }

        let visible = self
            .platform
            .can_view(room.guild_id, room.record.voice_channel_id, user)
            .await
            .map_err(|e| log_member_error("check view permission", user, &e, &info.tag))?;
        if visible {
            return Ok((info, MemberOutcome::AlreadyDone));
        }

        let target = OverwriteTarget::Member(user);
        self.platform
            .edit_overwrite(
                room.guild_id,
                room.record.voice_channel_id,
                target,
                OverwriteEdit::allow(MEMBER_VOICE),
            )
            .await
            .map_err(|e| log_member_error("grant voice access", user, &e, &info.tag))?;
        self.platform
            .edit_overwrite(
                room.guild_id,
                room.record.text_channel_id,
                target,
                OverwriteEdit::allow(MEMBER_TEXT),
            )
            .await
            .map_err(|e| log_member_error("grant text access", user, &e, &info.tag))?;

        info!(key = %room.key, user_id = %user, "member added");
        Ok((info, MemberOutcome::Done))
    }

    async fn remove_members(&self, room: &Room, users: &[UserId]) -> Vec<(String, MemberOutcome)> {
        let mut outcomes = Vec::with_capacity(users.len());
        for user in users {
            let outcome = match self.remove_member(room, *user).await {
                Ok(label) => (label, MemberOutcome::Done),
                Err((label, reason)) => (label, MemberOutcome::Failed(reason)),
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    async fn remove_member(&self, room: &Room, user: UserId) -> Result<String, (String, FailureReason)> {
        let info = self
            .fetch(room.guild_id, user)
            .await?
            .ok_or_else(|| (user.to_string(), FailureReason::NotFound))?;

        if self.platform.member_voice_channel(room.guild_id, user) != Some(room.record.voice_channel_id) {
            return Err((info.tag, FailureReason::NotInChannel));
        }

        self.platform
            .disconnect_member(room.guild_id, user)
            .await
            .map_err(|e| log_member_error("disconnect member", user, &e, &info.tag))?;
        info!(key = %room.key, user_id = %user, "member removed");
        Ok(info.tag)
    }

    /// Blacklist is persisted once, after every selection is applied.
    async fn blacklist(
        &self,
        mut room: Room,
        users: &[UserId],
    ) -> Result<Vec<(String, MemberOutcome)>, ActionError> {
        let mut outcomes = Vec::with_capacity(users.len());
        let mut changed = false;
        for user in users {
            let label = match self.platform.fetch_member(room.guild_id, *user).await {
                Ok(Some(info)) => info.tag,
                _ => user.to_string(),
            };
            let outcome = if room.record.is_owner(*user) {
                MemberOutcome::Failed(FailureReason::IsOwner)
            } else if room.record.add_to_blacklist(*user) {
                changed = true;
                MemberOutcome::Done
            } else {
                MemberOutcome::AlreadyDone
            };
            outcomes.push((label, outcome));
        }
        if changed {
            self.store.set(&room.key, &room.record).await?;
            info!(key = %room.key, size = room.record.blacklist.len(), "blacklist updated");
        }
        Ok(outcomes)
    }

    /// Swap manage rights on both channels, then persist the new owner.
    async fn transfer(&self, mut room: Room, new_owner: UserId) -> Result<MemberInfo, ActionError> {
        if room.record.is_owner(new_owner) {
            return Err(InvalidInput::SameOwner.into());
        }
        let info = self
            .platform
            .fetch_member(room.guild_id, new_owner)
            .await
            .map_err(|e| ActionError::failed("fetch new owner", e))?
            .ok_or(InvalidInput::MemberNotFound)?;

        let previous = room.record.owner_id;
        for channel_id in [room.record.voice_channel_id, room.record.text_channel_id] {
            self.platform
                .edit_overwrite(
                    room.guild_id,
                    channel_id,
                    OverwriteTarget::Member(new_owner),
                    OverwriteEdit::allow(OWNER_MANAGE),
                )
                .await
                .map_err(|e| ActionError::failed("grant owner rights", e))?;
            self.platform
                .edit_overwrite(
                    room.guild_id,
                    channel_id,
                    OverwriteTarget::Member(previous),
                    OverwriteEdit::deny(OWNER_MANAGE),
                )
                .await
                .map_err(|e| ActionError::failed("revoke owner rights", e))?;
        }

        room.record.transfer_to(new_owner);
        self.store.set(&room.key, &room.record).await?;
        info!(key = %room.key, from = %previous, to = %new_owner, "ownership transferred");

        let guild_name = self.platform.guild_name(room.guild_id).unwrap_or_default();
        let channel = format!("<#{}>", room.record.voice_channel_id);
        self.notifications.push(Notification::new(
            new_owner,
            self.locale.format("transferOwnership.dmNotification", &[
                ("channel", &channel),
                ("guild", &guild_name),
            ]),
        ));
        self.notifications.push(Notification::new(
            previous,
            self.locale
                .format("transferOwnership.previousOwnerNotification", &[
                    ("user", &info.tag),
                    ("channel", &channel),
                    ("guild", &guild_name),
                ]),
        ));

        Ok(info)
    }

    async fn fetch(&self, guild_id: GuildId, user: UserId) -> Result<Option<MemberInfo>, (String, FailureReason)> {
        self.platform
            .fetch_member(guild_id, user)
            .await
            .map_err(|e| log_member_error("fetch member", user, &e, &user.to_string()))
    }

    /// Render a bulk outcome as up to three lines: done, already, failed.
    fn report(
        &self,
        section: &str,
        (done_key, already_key, failed_key): (&str, &str, &str),
        outcomes: &[(String, MemberOutcome)],
    ) -> String {
        let mut done = Vec::new();
        let mut already = Vec::new();
        let mut failed = Vec::new();
        for (label, outcome) in outcomes {
            match outcome {
                MemberOutcome::Done => done.push(label.clone()),
                MemberOutcome::AlreadyDone => already.push(label.clone()),
                MemberOutcome::Failed(reason) => {
                    failed.push(format!("{label} ({})", self.locale.get(reason.locale_key())));
                },
            }
        }

        [(done_key, done), (already_key, already), (failed_key, failed)]
            .into_iter()
            .filter(|(_, labels)| !labels.is_empty())
            .map(|(key, labels)| {
                self.locale
                    .format(&format!("{section}.{key}"), &[("user", &labels.join(", "))])
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn message(&self, key: &str) -> Reply {
        Reply::Message(self.locale.get(key))
    }
}

fn parse_user_limit(raw: &str) -> Result<u32, ActionError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<u32>()
        .ok()
        .filter(|limit| USER_LIMIT_RANGE.contains(limit))
        .ok_or_else(|| {
            InvalidInput::UserLimit {
                raw: trimmed.to_string(),
            }
            .into()
        })
}

fn log_member_error(step: &'static str, user: UserId, error: &PlatformError, label: &str) -> (String, FailureReason) {
    warn!(user_id = %user, error = %error, "{step} failed");
    (label.to_string(), FailureReason::Error)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            notify::{NotificationReceiver, notification_queue},
            platform::ChannelKind,
            testing::{FakePlatform, guild, member},
        },
        rstest::rstest,
        std::time::Duration,
        tempvoice_store::MemoryRecordStore,
    };

    const OWNER: u64 = 1;
    const VOICE: u64 = 100;
    const TEXT: u64 = 101;

    struct Harness {
        fake: Arc<FakePlatform>,
        store: Arc<MemoryRecordStore>,
        dispatcher: Dispatcher,
        notifications: NotificationReceiver,
    }

    fn owner() -> Invocation {
        as_user(OWNER)
    }

    fn as_user(id: u64) -> Invocation {
        Invocation {
            guild_id: guild(),
            user_id: UserId::new(id),
        }
    }

    fn voice() -> ChannelId {
        ChannelId::new(VOICE)
    }

    fn text() -> ChannelId {
        ChannelId::new(TEXT)
    }

    fn key() -> RecordKey {
        RecordKey::new(guild(), voice())
    }

    async fn harness() -> Harness {
        let fake = Arc::new(FakePlatform::new());
        fake.add_channel(voice(), "alice's Channel", ChannelKind::Voice);
        fake.add_channel(text(), "alice-text", ChannelKind::Text);
        for (id, name) in [(OWNER, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
            fake.add_member(member(id, name));
        }
        fake.join(UserId::new(OWNER), voice());
        // The room starts private, as provisioning leaves it.
        fake.edit_overwrite(
            guild(),
            voice(),
            OverwriteTarget::Everyone,
            OverwriteEdit::deny(Permissions::VIEW_CHANNEL),
        )
        .await
        .unwrap();
        fake.edit_overwrite(
            guild(),
            voice(),
            OverwriteTarget::Member(UserId::new(OWNER)),
            OverwriteEdit::allow(Permissions::VIEW_CHANNEL | OWNER_MANAGE),
        )
        .await
        .unwrap();

        let store = Arc::new(MemoryRecordStore::new());
        store
            .set(
                &key(),
                &ChannelRecord::new(voice(), text(), UserId::new(OWNER)),
            )
            .await
            .unwrap();

        let (queue, notifications) = notification_queue();
        let dispatcher = Dispatcher::new(
            store.clone(),
            fake.clone(),
            Arc::new(Localizer::bundled("en")),
            queue,
        );
        Harness {
            fake,
            store,
            dispatcher,
            notifications,
        }
    }

    fn button(action: PanelAction) -> Command {
        Command::Button {
            action,
            channel_id: voice(),
        }
    }

    fn select(picker: Picker, users: &[u64]) -> Command {
        Command::Select {
            picker,
            channel_id: voice(),
            users: users.iter().map(|id| UserId::new(*id)).collect(),
        }
    }

    fn submit(form: Form, value: &str) -> Command {
        Command::Submit {
            form,
            channel_id: voice(),
            value: value.to_string(),
        }
    }

    fn text_of(reply: Reply) -> String {
        match reply {
            Reply::Message(text) => text,
            other => panic!("expected message, got {other:?}"),
        }
    }

    fn l(key: &str) -> String {
        Localizer::bundled("en").get(key)
    }

    async fn record(h: &Harness) -> ChannelRecord {
        h.store.get(&key()).await.unwrap().unwrap()
    }

    fn drain(rx: &mut NotificationReceiver) -> Vec<Notification> {
        std::iter::from_fn(|| rx.try_recv()).collect()
    }

    // ── Gate ─────────────────────────────────────────────────────────────────

    #[rstest]
    #[case::hide(button(PanelAction::Hide))]
    #[case::lock(button(PanelAction::Lock))]
    #[case::delete(button(PanelAction::ConfirmDelete))]
    #[case::transfer(button(PanelAction::TransferOwnership))]
    #[case::add_member(select(Picker::AddMember, &[3]))]
    #[case::blacklist(select(Picker::Blacklist, &[OWNER, 3]))]
    #[case::transfer_select(select(Picker::TransferOwnership, &[2]))]
    #[case::rename(submit(Form::Rename, "taken over"))]
    #[case::limit(submit(Form::Limit, "1"))]
    #[tokio::test]
    async fn non_owner_is_denied_without_side_effects(#[case] command: Command) {
        let mut h = harness().await;
        let before = h.fake.calls().len();
        let reply = h.dispatcher.dispatch(as_user(2), command).await;
        assert_eq!(text_of(reply), l("interactionCreate.permissionDenied"));
        assert_eq!(h.fake.calls().len(), before);
        assert_eq!(h.fake.channel(voice()).unwrap().name, "alice's Channel");

        let record = record(&h).await;
        assert_eq!(record.owner_id, UserId::new(OWNER));
        assert!(record.blacklist.is_empty());
        assert!(drain(&mut h.notifications).is_empty());
    }

    #[tokio::test]
    async fn missing_record_is_reported() {
        let h = harness().await;
        h.store.delete(&key()).await.unwrap();
        let reply = h.dispatcher.dispatch(owner(), button(PanelAction::Hide)).await;
        assert_eq!(text_of(reply), l("interactionCreate.channelDataNotFound"));
    }

    #[tokio::test]
    async fn vanished_voice_channel_is_reported() {
        let h = harness().await;
        h.fake.remove_channel(voice());
        let reply = h.dispatcher.dispatch(owner(), button(PanelAction::Lock)).await;
        assert_eq!(text_of(reply), l("interactionCreate.voiceChannelNotFound"));
    }

    #[tokio::test]
    async fn vanished_text_channel_blocks_add_member() {
        let h = harness().await;
        h.fake.remove_channel(text());
        let reply = h
            .dispatcher
            .dispatch(owner(), select(Picker::AddMember, &[2]))
            .await;
        assert_eq!(text_of(reply), l("interactionCreate.voiceChannelNotFound"));
    }

    #[tokio::test]
    async fn throttle_rejects_bursts() {
        let h = harness().await;
        let dispatcher = h
            .dispatcher
            .with_throttle(Some(ActionThrottle::new(2, Duration::from_secs(60))));
        for _ in 0..2 {
            let reply = dispatcher.dispatch(owner(), button(PanelAction::Lock)).await;
            assert_eq!(text_of(reply), l("interactionCreate.channelLocked"));
        }
        let reply = dispatcher.dispatch(owner(), button(PanelAction::Lock)).await;
        assert_eq!(text_of(reply), l("errors.rateLimited"));
        let reply = dispatcher.dispatch(owner(), button(PanelAction::Unlock)).await;
        assert_eq!(text_of(reply), l("interactionCreate.channelUnlocked"));
    }

    // ── Visibility and access ────────────────────────────────────────────────

    #[tokio::test]
    async fn hide_unhide_lock_unlock_edit_everyone() {
        let h = harness().await;
        let everyone = OverwriteTarget::Everyone;

        h.dispatcher.dispatch(owner(), button(PanelAction::Unhide)).await;
        let ch = h.fake.channel(voice()).unwrap();
        assert!(ch.allow(everyone).contains(Permissions::VIEW_CHANNEL));
        assert!(!ch.deny(everyone).contains(Permissions::VIEW_CHANNEL));

        h.dispatcher.dispatch(owner(), button(PanelAction::Hide)).await;
        let ch = h.fake.channel(voice()).unwrap();
        assert!(ch.deny(everyone).contains(Permissions::VIEW_CHANNEL));

        let reply = h.dispatcher.dispatch(owner(), button(PanelAction::Lock)).await;
        assert_eq!(text_of(reply), l("interactionCreate.channelLocked"));
        let ch = h.fake.channel(voice()).unwrap();
        assert!(ch.deny(everyone).contains(Permissions::CONNECT));
        assert!(ch.deny(everyone).contains(Permissions::VIEW_CHANNEL));

        h.dispatcher.dispatch(owner(), button(PanelAction::Unlock)).await;
        let ch = h.fake.channel(voice()).unwrap();
        assert!(ch.allow(everyone).contains(Permissions::CONNECT));
    }

    #[tokio::test]
    async fn platform_failure_becomes_operation_failed() {
        let h = harness().await;
        h.fake.fail("edit_overwrite");
        let reply = h.dispatcher.dispatch(owner(), button(PanelAction::Hide)).await;
        assert_eq!(text_of(reply), l("errors.operationFailed"));
    }

    // ── Forms ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn rename_and_limit_buttons_open_forms() {
        let h = harness().await;
        assert_eq!(
            h.dispatcher.dispatch(owner(), button(PanelAction::Rename)).await,
            Reply::Form {
                form: Form::Rename,
                channel_id: voice(),
            }
        );
        assert_eq!(
            h.dispatcher.dispatch(owner(), button(PanelAction::SetLimit)).await,
            Reply::Form {
                form: Form::Limit,
                channel_id: voice(),
            }
        );
    }

    #[rstest]
    #[case::plain("lounge", "lounge")]
    #[case::trimmed("  lounge  ", "lounge")]
    #[case::unicode("غرفة", "غرفة")]
    #[tokio::test]
    async fn rename_applies_trimmed_name(#[case] input: &str, #[case] applied: &str) {
        let h = harness().await;
        let reply = text_of(h.dispatcher.dispatch(owner(), submit(Form::Rename, input)).await);
        assert_eq!(h.fake.channel(voice()).unwrap().name, applied);
        assert!(reply.contains(applied));
    }

    #[tokio::test]
    async fn rename_length_bounds() {
        let h = harness().await;
        for bad in [String::new(), "   ".to_string(), "a".repeat(101)] {
            let reply = text_of(h.dispatcher.dispatch(owner(), submit(Form::Rename, &bad)).await);
            assert_eq!(reply, l("errors.invalidChannelName"));
            assert_eq!(h.fake.channel(voice()).unwrap().name, "alice's Channel");
        }
        let longest = "a".repeat(100);
        h.dispatcher
            .dispatch(owner(), submit(Form::Rename, &longest))
            .await;
        assert_eq!(h.fake.channel(voice()).unwrap().name, longest);
    }

    #[rstest]
    #[case::min("1", Some(1))]
    #[case::max("99", Some(99))]
    #[case::padded(" 12 ", Some(12))]
    #[case::zero("0", None)]
    #[case::hundred("100", None)]
    #[case::negative("-3", None)]
    #[case::word("ten", None)]
    #[case::trailing_garbage("12abc", None)]
    #[case::empty("", None)]
    #[tokio::test]
    async fn user_limit_must_be_in_range(#[case] input: &str, #[case] expected: Option<u32>) {
        let h = harness().await;
        let reply = text_of(h.dispatcher.dispatch(owner(), submit(Form::Limit, input)).await);
        assert_eq!(h.fake.channel(voice()).unwrap().user_limit, expected);
        if expected.is_none() {
            assert_eq!(reply, l("errors.invalidUserLimit"));
        }
    }

    // ── Pickers ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_selection_is_rejected() {
        let h = harness().await;
        let reply = h
            .dispatcher
            .dispatch(owner(), select(Picker::AddMember, &[]))
            .await;
        assert_eq!(text_of(reply), l("errors.userNotSelected"));
    }

    #[tokio::test]
    async fn add_member_reports_each_outcome() {
        let mut h = harness().await;
        let mut rec = record(&h).await;
        rec.add_to_blacklist(UserId::new(3));
        h.store.set(&key(), &rec).await.unwrap();

        let room = h.dispatcher.authorize(owner(), voice()).await.unwrap();
        let outcomes = h
            .dispatcher
            .add_members(&room, UserId::new(OWNER), &[
                UserId::new(2),
                UserId::new(3),
                UserId::new(OWNER),
                UserId::new(42),
            ])
            .await;
        assert_eq!(outcomes, vec![
            ("bob".to_string(), MemberOutcome::Done),
            (
                "carol".to_string(),
                MemberOutcome::Failed(FailureReason::Blacklisted)
            ),
            ("alice".to_string(), MemberOutcome::AlreadyDone),
            ("42".to_string(), MemberOutcome::Failed(FailureReason::NotFound)),
        ]);

        let bob = OverwriteTarget::Member(UserId::new(2));
        assert!(h.fake.channel(voice()).unwrap().allow(bob).contains(MEMBER_VOICE));
        assert!(h.fake.channel(text()).unwrap().allow(bob).contains(MEMBER_TEXT));
        let carol = OverwriteTarget::Member(UserId::new(3));
        assert!(h.fake.channel(voice()).unwrap().allow(carol).is_empty());

        let sent = drain(&mut h.notifications);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, UserId::new(2));
        assert!(sent[0].content.contains("alice"));
        assert!(sent[0].content.contains("Test Guild"));
    }

    #[tokio::test]
    async fn add_member_reply_groups_outcomes() {
        let h = harness().await;
        let reply = text_of(
            h.dispatcher
                .dispatch(owner(), select(Picker::AddMember, &[2, 42]))
                .await,
        );
        let lines: Vec<&str> = reply.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("✅") && lines[0].contains("bob"));
        assert!(lines[1].starts_with("❌") && lines[1].contains("42"));
    }

    #[tokio::test]
    async fn remove_member_only_disconnects_occupants() {
        let h = harness().await;
        h.fake.join(UserId::new(2), voice());
        h.fake.add_channel(ChannelId::new(500), "General", ChannelKind::Voice);
        h.fake.join(UserId::new(3), ChannelId::new(500));

        let room = h.dispatcher.authorize(owner(), voice()).await.unwrap();
        let outcomes = h
            .dispatcher
            .remove_members(&room, &[UserId::new(2), UserId::new(3), UserId::new(42)])
            .await;
        assert_eq!(outcomes, vec![
            ("bob".to_string(), MemberOutcome::Done),
            (
                "carol".to_string(),
                MemberOutcome::Failed(FailureReason::NotInChannel)
            ),
            ("42".to_string(), MemberOutcome::Failed(FailureReason::NotFound)),
        ]);
        assert_eq!(h.fake.voice_channel_of(UserId::new(2)), None);
        assert_eq!(h.fake.voice_channel_of(UserId::new(3)), Some(ChannelId::new(500)));
    }

    #[tokio::test]
    async fn remove_and_transfer_need_someone_else() {
        let h = harness().await;
        let reply = h
            .dispatcher
            .dispatch(owner(), button(PanelAction::RemoveMember))
            .await;
        assert_eq!(text_of(reply), l("removeMember.noMembersInChannel"));
        let reply = h
            .dispatcher
            .dispatch(owner(), button(PanelAction::TransferOwnership))
            .await;
        assert_eq!(text_of(reply), l("transferOwnership.noEligibleMembers"));

        h.fake.join(UserId::new(2), voice());
        assert_eq!(
            h.dispatcher
                .dispatch(owner(), button(PanelAction::TransferOwnership))
                .await,
            Reply::Picker {
                picker: Picker::TransferOwnership,
                channel_id: voice(),
            }
        );
    }

    #[tokio::test]
    async fn blacklist_persists_and_blocks_later_adds() {
        let h = harness().await;
        let reply = text_of(
            h.dispatcher
                .dispatch(owner(), select(Picker::Blacklist, &[2, 2, OWNER]))
                .await,
        );
        assert_eq!(reply.lines().count(), 3);
        assert_eq!(record(&h).await.blacklist, vec![UserId::new(2)]);

        let room = h.dispatcher.authorize(owner(), voice()).await.unwrap();
        let outcomes = h
            .dispatcher
            .add_members(&room, UserId::new(OWNER), &[UserId::new(2)])
            .await;
        assert_eq!(outcomes[0].1, MemberOutcome::Failed(FailureReason::Blacklisted));
    }

    #[tokio::test]
    async fn blacklist_does_not_evict_current_members() {
        let h = harness().await;
        h.fake.join(UserId::new(2), voice());
        h.dispatcher
            .dispatch(owner(), select(Picker::Blacklist, &[2]))
            .await;
        assert_eq!(h.fake.voice_channel_of(UserId::new(2)), Some(voice()));
    }

    // ── Ownership ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn transfer_swaps_rights_and_record() {
        let mut h = harness().await;
        h.fake.join(UserId::new(2), voice());
        let reply = text_of(
            h.dispatcher
                .dispatch(owner(), select(Picker::TransferOwnership, &[2]))
                .await,
        );
        assert!(reply.contains("bob"));
        assert_eq!(record(&h).await.owner_id, UserId::new(2));

        let new = OverwriteTarget::Member(UserId::new(2));
        let old = OverwriteTarget::Member(UserId::new(OWNER));
        for ch in [voice(), text()] {
            let ch = h.fake.channel(ch).unwrap();
            assert!(ch.allow(new).contains(OWNER_MANAGE));
            assert!(ch.deny(old).contains(OWNER_MANAGE));
            assert!(!ch.allow(old).intersects(OWNER_MANAGE));
        }
        // Old owner keeps ordinary access.
        assert!(
            h.fake
                .channel(voice())
                .unwrap()
                .allow(old)
                .contains(Permissions::VIEW_CHANNEL)
        );

        let sent = drain(&mut h.notifications);
        let recipients: Vec<UserId> = sent.iter().map(|n| n.recipient).collect();
        assert_eq!(recipients, vec![UserId::new(2), UserId::new(OWNER)]);

        // The former owner is now locked out of the panel.
        let reply = h.dispatcher.dispatch(owner(), button(PanelAction::Hide)).await;
        assert_eq!(text_of(reply), l("interactionCreate.permissionDenied"));
        let reply = h
            .dispatcher
            .dispatch(as_user(2), button(PanelAction::Hide))
            .await;
        assert_eq!(text_of(reply), l("interactionCreate.channelHidden"));
    }

    #[tokio::test]
    async fn transfer_to_self_or_stranger_is_rejected() {
        let h = harness().await;
        let reply = h
            .dispatcher
            .dispatch(owner(), select(Picker::TransferOwnership, &[OWNER]))
            .await;
        assert_eq!(text_of(reply), l("transferOwnership.alreadyOwner"));
        let reply = h
            .dispatcher
            .dispatch(owner(), select(Picker::TransferOwnership, &[42]))
            .await;
        assert_eq!(text_of(reply), l("transferOwnership.userNotFound"));
        assert_eq!(record(&h).await.owner_id, UserId::new(OWNER));
    }

    #[tokio::test]
    async fn failed_transfer_keeps_owner() {
        let h = harness().await;
        h.fake.fail("edit_overwrite");
        let reply = h
            .dispatcher
            .dispatch(owner(), select(Picker::TransferOwnership, &[2]))
            .await;
        assert_eq!(text_of(reply), l("errors.operationFailed"));
        assert_eq!(record(&h).await.owner_id, UserId::new(OWNER));
    }

    // ── Deletion ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn delete_asks_then_removes_everything() {
        let h = harness().await;
        assert_eq!(
            h.dispatcher.dispatch(owner(), button(PanelAction::Delete)).await,
            Reply::ConfirmDelete {
                channel_id: voice(),
            }
        );
        assert!(h.fake.channel(voice()).is_some());

        let reply = h
            .dispatcher
            .dispatch(owner(), button(PanelAction::CancelDelete))
            .await;
        assert_eq!(text_of(reply), l("deleteConfirmation.deletionCanceled"));
        assert!(h.fake.channel(voice()).is_some());

        let reply = h
            .dispatcher
            .dispatch(owner(), button(PanelAction::ConfirmDelete))
            .await;
        assert_eq!(text_of(reply), l("deleteConfirmation.deletionSuccess"));
        assert!(h.fake.channel(voice()).is_none());
        assert!(h.fake.channel(text()).is_none());
        assert!(h.store.get(&key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_voice_delete_keeps_record() {
        let h = harness().await;
        h.fake.fail("delete_channel");
        let reply = h
            .dispatcher
            .dispatch(owner(), button(PanelAction::ConfirmDelete))
            .await;
        assert_eq!(text_of(reply), l("errors.operationFailed"));
        assert!(h.store.get(&key()).await.unwrap().is_some());
    }
}
