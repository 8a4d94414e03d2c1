use {serenity::all::Permissions, tempvoice_config::{PermissionName, RoomsConfig}};

/// Permissions that mean something on a text channel.
const TEXT_SCOPE: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::READ_MESSAGE_HISTORY)
    .union(Permissions::MANAGE_CHANNELS)
    .union(Permissions::MANAGE_ROLES)
    .union(Permissions::EMBED_LINKS)
    .union(Permissions::ATTACH_FILES);

/// Channel administration rights held by exactly one user: the owner.
pub const OWNER_MANAGE: Permissions = Permissions::MANAGE_CHANNELS.union(Permissions::MANAGE_ROLES);

/// Granted on the voice channel to a member added by the owner.
pub const MEMBER_VOICE: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::CONNECT)
    .union(Permissions::SPEAK);

/// Granted on the text channel to a member added by the owner.
pub const MEMBER_TEXT: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::READ_MESSAGE_HISTORY);

#[must_use]
pub fn permission(name: PermissionName) -> Permissions {
    match name {
        PermissionName::ViewChannel => Permissions::VIEW_CHANNEL,
        PermissionName::Connect => Permissions::CONNECT,
        PermissionName::Speak => Permissions::SPEAK,
        PermissionName::MoveMembers => Permissions::MOVE_MEMBERS,
        PermissionName::ManageChannels => Permissions::MANAGE_CHANNELS,
        PermissionName::ManageRoles => Permissions::MANAGE_ROLES,
        PermissionName::SendMessages => Permissions::SEND_MESSAGES,
        PermissionName::ReadMessageHistory => Permissions::READ_MESSAGE_HISTORY,
        PermissionName::EmbedLinks => Permissions::EMBED_LINKS,
        PermissionName::AttachFiles => Permissions::ATTACH_FILES,
        PermissionName::UseVoiceActivity => Permissions::USE_VAD,
        PermissionName::Stream => Permissions::STREAM,
    }
}

#[must_use]
pub fn permission_set(names: &[PermissionName]) -> Permissions {
    names
        .iter()
        .fold(Permissions::empty(), |acc, name| acc | permission(*name))
}

/// Overwrite grants applied when a channel pair is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grants {
    pub owner_voice: Permissions,
    pub owner_text: Permissions,
    pub bot_voice: Permissions,
    pub bot_text: Permissions,
}

impl Grants {
    #[must_use]
    pub fn from_config(rooms: &RoomsConfig) -> Self {
        let bot = permission_set(&rooms.bot_permissions);
        let user = permission_set(&rooms.user_permissions);
        Self {
            owner_voice: user | OWNER_MANAGE,
            owner_text: MEMBER_TEXT | OWNER_MANAGE,
            bot_voice: bot,
            bot_text: (bot & TEXT_SCOPE) | MEMBER_TEXT | Permissions::EMBED_LINKS,
        }
    }
}

impl Default for Grants {
    fn default() -> Self {
        Self::from_config(&RoomsConfig::default())
    }
}
