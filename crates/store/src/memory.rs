use std::collections::HashMap;

use {async_trait::async_trait, serenity::all::GuildId, tokio::sync::RwLock};

use crate::{
    Result,
    record::{ChannelRecord, RecordKey},
    store::RecordStore,
};

/// In-process store. Loses everything on restart; meant for tests and dry
/// runs.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<RecordKey, ChannelRecord>>,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<ChannelRecord>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn set(&self, key: &RecordKey, record: &ChannelRecord) -> Result<()> {
        self.records.write().await.insert(*key, record.clone());
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool> {
        Ok(self.records.write().await.remove(key).is_some())
    }

    async fn list(&self, guild_id: GuildId) -> Result<Vec<(RecordKey, ChannelRecord)>> {
        let records = self.records.read().await;
        let mut out: Vec<_> = records
            .iter()
            .filter(|(key, _)| key.guild_id == guild_id)
            .map(|(key, record)| (*key, record.clone()))
            .collect();
        out.sort_by_key(|(key, _)| key.channel_id.get());
        Ok(out)
    }
}
