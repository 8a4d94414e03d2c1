use std::{
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use {
    async_trait::async_trait,
    serenity::all::GuildId,
    sqlx::SqlitePool,
    tracing::{debug, warn},
};

use crate::{
    Result,
    record::{ChannelRecord, RecordKey},
    store::RecordStore,
};

#[derive(sqlx::FromRow)]
struct RecordRow {
    key: String,
    value: String,
}

impl TryFrom<RecordRow> for (RecordKey, ChannelRecord) {
    type Error = crate::Error;

    fn try_from(row: RecordRow) -> Result<Self> {
        Ok((row.key.parse()?, serde_json::from_str(&row.value)?))
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// SQLite-backed record store. Values are the record's JSON.
#[derive(Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file and run migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let url = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&url).await?;
        crate::run_migrations(&pool).await?;
        debug!(path = %path.display(), "record store opened");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Remove every record. Returns the number of rows deleted.
    pub async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM records")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<ChannelRecord>> {
        let value = sqlx::query_scalar::<_, String>("SELECT value FROM records WHERE key = ?")
            .bind(key.to_string())
            .fetch_optional(&self.pool)
            .await?;
        value
            .map(|v| serde_json::from_str(&v))
            .transpose()
            .map_err(Into::into)
    }

    async fn set(&self, key: &RecordKey, record: &ChannelRecord) -> Result<()> {
        let value = serde_json::to_string(record)?;
        sqlx::query(
            r#"INSERT INTO records (key, guild_id, value, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at"#,
        )
        .bind(key.to_string())
        .bind(key.guild_id.to_string())
        .bind(&value)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE key = ?")
            .bind(key.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, guild_id: GuildId) -> Result<Vec<(RecordKey, ChannelRecord)>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            "SELECT key, value FROM records WHERE guild_id = ? ORDER BY updated_at",
        )
        .bind(guild_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut out: Vec<(RecordKey, ChannelRecord)> = Vec::with_capacity(rows.len());
        for row in rows {
            let key = row.key.clone();
            match <(RecordKey, ChannelRecord)>::try_from(row) {
                Ok(entry) => out.push(entry),
                // One corrupt row must not hide the rest of the guild.
                Err(e) => warn!(key = %key, error = %e, "skipping unreadable record"),
            }
        }
        Ok(out)
    }
}
