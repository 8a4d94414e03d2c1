use std::{fmt, str::FromStr};

use {
    serde::{Deserialize, Serialize},
    serenity::all::{ChannelId, GuildId, UserId},
};

use crate::error::Error;

const KEY_PREFIX: &str = "channels";

/// Composite key of a record: the guild plus the temporary voice channel.
///
/// Renders as `channels_<guildId>_<channelId>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

impl RecordKey {
    #[must_use]
    pub fn new(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{KEY_PREFIX}_{}_{}", self.guild_id, self.channel_id)
    }
}

impl FromStr for RecordKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('_');
        let (Some(KEY_PREFIX), Some(guild), Some(channel), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::malformed_key(s));
        };
        let guild: u64 = guild.parse().map_err(|_| Error::malformed_key(s))?;
        let channel: u64 = channel.parse().map_err(|_| Error::malformed_key(s))?;
        if guild == 0 || channel == 0 {
            return Err(Error::malformed_key(s));
        }
        Ok(Self::new(GuildId::new(guild), ChannelId::new(channel)))
    }
}

/// One active temporary channel pair.
///
/// Serialized with the field names older deployments wrote, so existing
/// rows keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    #[serde(rename = "voiceChannel")]
    pub voice_channel_id: ChannelId,
    #[serde(rename = "textChannel")]
    pub text_channel_id: ChannelId,
    #[serde(rename = "ownerId")]
    pub owner_id: UserId,
    /// Users refused by add-member. Never enforced against current members.
    #[serde(default)]
    pub blacklist: Vec<UserId>,
}

impl ChannelRecord {
    #[must_use]
    pub fn new(voice_channel_id: ChannelId, text_channel_id: ChannelId, owner_id: UserId) -> Self {
        Self {
            voice_channel_id,
            text_channel_id,
            owner_id,
            blacklist: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    #[must_use]
    pub fn is_blacklisted(&self, user_id: UserId) -> bool {
        self.blacklist.contains(&user_id)
    }

    /// Returns `false` if the user was already blacklisted.
    pub fn add_to_blacklist(&mut self, user_id: UserId) -> bool {
        if self.is_blacklisted(user_id) {
            return false;
        }
        self.blacklist.push(user_id);
        true
    }

    /// Hand the record to `new_owner`, returning the previous owner.
    pub fn transfer_to(&mut self, new_owner: UserId) -> UserId {
        std::mem::replace(&mut self.owner_id, new_owner)
    }
}
