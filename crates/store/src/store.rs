use {async_trait::async_trait, serenity::all::GuildId};

use crate::{
    Result,
    record::{ChannelRecord, RecordKey},
};

/// Durable mapping from [`RecordKey`] to [`ChannelRecord`].
///
/// Single-key operations are atomic; nothing else is. Concurrent writers to
/// the same key race and the last write wins.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &RecordKey) -> Result<Option<ChannelRecord>>;
    async fn set(&self, key: &RecordKey, record: &ChannelRecord) -> Result<()>;
    /// Returns `true` if a record was removed.
    async fn delete(&self, key: &RecordKey) -> Result<bool>;
    /// All records of one guild, used by the startup sweep.
    async fn list(&self, guild_id: GuildId) -> Result<Vec<(RecordKey, ChannelRecord)>>;
}
