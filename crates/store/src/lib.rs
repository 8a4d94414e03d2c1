//! Persistence for temporary channel records.
//!
//! A record ties a temporary voice/text channel pair to its owner and
//! blacklist. Records are addressed by `channels_<guild>_<voice channel>`
//! and live behind the [`RecordStore`] trait, with an in-memory store for
//! tests and a SQLite store for production.

pub mod error;
pub mod memory;
pub mod record;
pub mod sqlite;
pub mod store;

pub use {
    error::{Error, Result},
    memory::MemoryRecordStore,
    record::{ChannelRecord, RecordKey},
    sqlite::SqliteRecordStore,
    store::RecordStore,
};

/// Run database migrations for the record store.
///
/// Creates the `records` table. Call once at startup before constructing a
/// [`SqliteRecordStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
