//! Encoding and decoding of component custom ids.
//!
//! Every control carries the voice channel it acts on:
//!
//! - buttons: `<action>_<voiceChannelId>`
//! - user pickers: `<action>_select_<voiceChannelId>`
//! - modals: `renameModal_<voiceChannelId>` / `limitModal_<voiceChannelId>`

use std::collections::HashMap;

use serenity::all::{ChannelId, UserId};

use crate::error::ActionError;

/// Picker selections are capped by the platform.
pub const MAX_PICKER_USERS: u8 = 25;

/// A button on the control panel or the delete confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelAction {
    Hide,
    Unhide,
    Rename,
    Lock,
    Unlock,
    SetLimit,
    AddMember,
    RemoveMember,
    Blacklist,
    Delete,
    ConfirmDelete,
    CancelDelete,
    TransferOwnership,
}

impl PanelAction {
    pub const ALL: &[Self] = &[
        Self::Hide,
        Self::Unhide,
        Self::Rename,
        Self::Lock,
        Self::Unlock,
        Self::SetLimit,
        Self::AddMember,
        Self::RemoveMember,
        Self::Blacklist,
        Self::Delete,
        Self::ConfirmDelete,
        Self::CancelDelete,
        Self::TransferOwnership,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hide => "hide",
            Self::Unhide => "unhide",
            Self::Rename => "rename",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::SetLimit => "setLimit",
            Self::AddMember => "addMember",
            Self::RemoveMember => "removeMember",
            Self::Blacklist => "blacklist",
            Self::Delete => "delete",
            Self::ConfirmDelete => "confirmDelete",
            Self::CancelDelete => "cancelDelete",
            Self::TransferOwnership => "transferOwnership",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == name)
    }

    #[must_use]
    pub fn custom_id(self, channel_id: ChannelId) -> String {
        format!("{}_{channel_id}", self.as_str())
    }
}

/// The four user pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Picker {
    AddMember,
    RemoveMember,
    Blacklist,
    TransferOwnership,
}

impl Picker {
    pub const ALL: &[Self] = &[
        Self::AddMember,
        Self::RemoveMember,
        Self::Blacklist,
        Self::TransferOwnership,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddMember => "addMember",
            Self::RemoveMember => "removeMember",
            Self::Blacklist => "blacklist",
            Self::TransferOwnership => "transferOwnership",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == name)
    }

    #[must_use]
    pub fn custom_id(self, channel_id: ChannelId) -> String {
        format!("{}_select_{channel_id}", self.as_str())
    }

    /// Ownership goes to exactly one user.
    #[must_use]
    pub fn max_values(self) -> u8 {
        match self {
            Self::TransferOwnership => 1,
            _ => MAX_PICKER_USERS,
        }
    }

    /// Catalog section holding the picker's prompt and placeholder.
    #[must_use]
    pub fn locale_section(self) -> &'static str {
        match self {
            Self::AddMember => "addUser",
            Self::RemoveMember => "removeMember",
            Self::Blacklist => "blacklist",
            Self::TransferOwnership => "transferOwnership",
        }
    }
}

/// The two modal forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    Rename,
    Limit,
}

impl Form {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rename => "renameModal",
            Self::Limit => "limitModal",
        }
    }

    #[must_use]
    pub fn custom_id(self, channel_id: ChannelId) -> String {
        format!("{}_{channel_id}", self.as_str())
    }

    /// Custom id of the single text input on the form.
    #[must_use]
    pub fn field_id(self) -> &'static str {
        match self {
            Self::Rename => "newName",
            Self::Limit => "newLimit",
        }
    }
}

/// A decoded interaction, ready for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Button {
        action: PanelAction,
        channel_id: ChannelId,
    },
    Select {
        picker: Picker,
        channel_id: ChannelId,
        users: Vec<UserId>,
    },
    Submit {
        form: Form,
        channel_id: ChannelId,
        value: String,
    },
}

impl Command {
    pub fn decode_button(custom_id: &str) -> Result<Self, ActionError> {
        let (name, channel) = custom_id
            .split_once('_')
            .ok_or_else(|| ActionError::unknown(custom_id))?;
        let action = PanelAction::parse(name).ok_or_else(|| ActionError::unknown(custom_id))?;
        let channel_id = parse_channel(channel).ok_or_else(|| ActionError::unknown(custom_id))?;
        Ok(Self::Button { action, channel_id })
    }

    pub fn decode_select(custom_id: &str, users: Vec<UserId>) -> Result<Self, ActionError> {
        let mut parts = custom_id.split('_');
        let (Some(name), Some("select"), Some(channel), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ActionError::unknown(custom_id));
        };
        let picker = Picker::parse(name).ok_or_else(|| ActionError::unknown(custom_id))?;
        let channel_id = parse_channel(channel).ok_or_else(|| ActionError::unknown(custom_id))?;
        Ok(Self::Select {
            picker,
            channel_id,
            users,
        })
    }

    /// `fields` maps text-input custom ids to submitted values. A missing
    /// field decodes as empty input and fails validation later.
    pub fn decode_modal(custom_id: &str, fields: &HashMap<String, String>) -> Result<Self, ActionError> {
        let (name, channel) = custom_id
            .split_once('_')
            .ok_or_else(|| ActionError::unknown(custom_id))?;
        let form = match name {
            "renameModal" => Form::Rename,
            "limitModal" => Form::Limit,
            _ => return Err(ActionError::unknown(custom_id)),
        };
        let channel_id = parse_channel(channel).ok_or_else(|| ActionError::unknown(custom_id))?;
        let value = fields.get(form.field_id()).cloned().unwrap_or_default();
        Ok(Self::Submit {
            form,
            channel_id,
            value,
        })
    }

    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Self::Button { channel_id, .. }
            | Self::Select { channel_id, .. }
            | Self::Submit { channel_id, .. } => *channel_id,
        }
    }

    /// Stable name used for throttling, logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Button { action, .. } => action.as_str(),
            Self::Select { picker, .. } => match picker {
                Picker::AddMember => "addMember_select",
                Picker::RemoveMember => "removeMember_select",
                Picker::Blacklist => "blacklist_select",
                Picker::TransferOwnership => "transferOwnership_select",
            },
            Self::Submit { form, .. } => form.as_str(),
        }
    }
}

fn parse_channel(raw: &str) -> Option<ChannelId> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(ChannelId::new)
}
