use std::path::Path;

use {
    clap::Subcommand,
    serenity::all::GuildId,
    tempvoice_store::{RecordStore, SqliteRecordStore},
};

#[derive(Subcommand)]
pub enum DbAction {
    /// Create the database if needed and run pending migrations.
    Migrate,
    /// List the temporary rooms recorded for a guild.
    List {
        /// Guild (server) id.
        #[arg(long)]
        guild: u64,
    },
    /// Delete every record but keep the schema intact.
    Clear,
}

pub async fn handle_db(action: DbAction, db_path: &Path) -> anyhow::Result<()> {
    match action {
        DbAction::Migrate => {
            let store = SqliteRecordStore::open(db_path).await?;
            store.pool().close().await;
            println!("Database ready: {}", db_path.display());
        },
        DbAction::List { guild } => {
            if guild == 0 {
                anyhow::bail!("--guild must be a non-zero id");
            }
            let store = open_existing(db_path).await?;
            let records = store.list(GuildId::new(guild)).await?;
            if records.is_empty() {
                println!("No rooms recorded for guild {guild}.");
            }
            for (key, record) in &records {
                println!(
                    "{key}  owner={}  text={}  blacklisted={}",
                    record.owner_id,
                    record.text_channel_id,
                    record.blacklist.len()
                );
            }
        },
        DbAction::Clear => {
            let store = open_existing(db_path).await?;
            let removed = store.clear().await?;
            println!("Removed {removed} record(s).");
        },
    }
    Ok(())
}

async fn open_existing(db_path: &Path) -> anyhow::Result<SqliteRecordStore> {
    if !db_path.exists() {
        anyhow::bail!(
            "database not found: {}. Run `tempvoice db migrate` first.",
            db_path.display()
        );
    }
    Ok(SqliteRecordStore::open(db_path).await?)
}
