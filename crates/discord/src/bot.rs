use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    serenity::Client,
    tempvoice_config::TempVoiceConfig,
    tempvoice_rooms::{ActionThrottle, Localizer, RoomSettings},
    tempvoice_store::RecordStore,
    tokio_util::sync::CancellationToken,
    tracing::info,
};

use crate::{
    error::{Error, Result},
    handler::TempVoiceHandler,
};

/// Connect to the gateway and serve until `cancel` fires or the client
/// stops on its own.
pub async fn run(config: &TempVoiceConfig, store: Arc<dyn RecordStore>, cancel: CancellationToken) -> Result<()> {
    if !config.discord.has_token() {
        return Err(Error::MissingToken);
    }
    let settings = RoomSettings::from_config(&config.rooms).ok_or(Error::MissingRooms)?;
    let locale = Arc::new(Localizer::load(
        &config.rooms.language,
        config.locales.directory.as_deref(),
    ));
    let throttle = ActionThrottle::from_config(&config.rate_limit);

    let handler = TempVoiceHandler::new(
        settings,
        store,
        locale,
        config.panel.clone(),
        throttle,
        cancel.child_token(),
    );
    let mut client = Client::builder(
        config.discord.token.expose_secret(),
        TempVoiceHandler::intents(),
    )
    .event_handler(handler)
    .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        info!("shutting down discord shards");
        shard_manager.shutdown_all().await;
    });

    let result = client.start().await;
    cancel.cancel();
    result.map_err(Error::from)
}
