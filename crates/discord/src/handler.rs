//! Discord event handler for serenity.
//!
//! Voice-state updates feed the room lifecycle; component and modal
//! interactions go through the dispatcher.

use std::sync::{
    Arc, Mutex, OnceLock, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use {
    serenity::{
        all::{
            ComponentInteraction, ComponentInteractionDataKind, Context, CreateInteractionResponse,
            EditInteractionResponse, EventHandler, GatewayIntents, Guild, GuildId, Interaction,
            ModalInteraction, Ready, VoiceState,
        },
        async_trait,
    },
    tempvoice_config::PanelConfig,
    tempvoice_rooms::{
        ActionError, ActionThrottle, Command, Dispatcher, Invocation, Lifecycle, Localizer,
        NotificationQueue, NotificationReceiver, Platform, Reply, RoomSettings, VoiceTransition,
        notification_queue, spawn_delivery,
    },
    tempvoice_store::RecordStore,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    platform::{SerenityPlatform, member_info},
    ui,
};

/// Lifecycle and dispatcher, built once the gateway hands us an HTTP
/// client and cache.
struct Services {
    platform: Arc<SerenityPlatform>,
    lifecycle: Lifecycle,
    dispatcher: Dispatcher,
}

/// Handler for Discord gateway events.
pub struct TempVoiceHandler {
    settings: RoomSettings,
    store: Arc<dyn RecordStore>,
    locale: Arc<Localizer>,
    panel: PanelConfig,
    throttle: Option<ActionThrottle>,
    cancel: CancellationToken,
    queue: NotificationQueue,
    receiver: Mutex<Option<NotificationReceiver>>,
    services: OnceLock<Services>,
    /// Set once the guilds present at startup have been swept.
    startup_swept: AtomicBool,
}

impl TempVoiceHandler {
    pub fn new(
        settings: RoomSettings,
        store: Arc<dyn RecordStore>,
        locale: Arc<Localizer>,
        panel: PanelConfig,
        throttle: Option<ActionThrottle>,
        cancel: CancellationToken,
    ) -> Self {
        let (queue, receiver) = notification_queue();
        Self {
            settings,
            store,
            locale,
            panel,
            throttle,
            cancel,
            queue,
            receiver: Mutex::new(Some(receiver)),
            services: OnceLock::new(),
            startup_swept: AtomicBool::new(false),
        }
    }

    /// Required gateway intents for the bot.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES | GatewayIntents::GUILD_MEMBERS
    }

    fn services(&self, ctx: &Context) -> &Services {
        self.services.get_or_init(|| {
            let bot_user_id = ctx.cache.current_user().id;
            let platform = Arc::new(SerenityPlatform::new(
                Arc::clone(&ctx.http),
                Arc::clone(&ctx.cache),
                bot_user_id,
                Arc::clone(&self.locale),
                self.panel.clone(),
            ));
            let shared: Arc<dyn Platform> = platform.clone();

            let receiver = self
                .receiver
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            if let Some(receiver) = receiver {
                spawn_delivery(receiver, Arc::clone(&shared), self.cancel.child_token());
            }

            Services {
                lifecycle: Lifecycle::new(self.settings.clone(), Arc::clone(&self.store), Arc::clone(&shared)),
                dispatcher: Dispatcher::new(
                    Arc::clone(&self.store),
                    shared,
                    Arc::clone(&self.locale),
                    self.queue.clone(),
                )
                .with_throttle(self.throttle.clone()),
                platform,
            }
        })
    }

    async fn handle_component(&self, ctx: &Context, component: &ComponentInteraction) {
        let Some(guild_id) = component.guild_id else {
            return;
        };
        let services = self.services(ctx);
        let invocation = Invocation {
            guild_id,
            user_id: component.user.id,
        };
        let custom_id = component.data.custom_id.as_str();

        match &component.data.kind {
            ComponentInteractionDataKind::Button => {
                let response = match Command::decode_button(custom_id) {
                    Ok(command) => {
                        let reply = services.dispatcher.dispatch(invocation, command).await;
                        ui::response(&self.locale, reply)
                    },
                    Err(e) => rejection(&services.dispatcher, custom_id, &e),
                };
                if let Err(e) = component.create_response(ctx, response).await {
                    warn!(custom_id, error = %e, "failed to answer button");
                }
            },
            ComponentInteractionDataKind::UserSelect { values } => {
                // Bulk operations can outlast the initial response window.
                if let Err(e) = component.defer_ephemeral(ctx).await {
                    warn!(custom_id, error = %e, "failed to defer select");
                    return;
                }
                let content = match Command::decode_select(custom_id, values.clone()) {
                    Ok(command) => match services.dispatcher.dispatch(invocation, command).await {
                        Reply::Message(text) => text,
                        other => {
                            warn!(custom_id, reply = ?other, "select produced a non-message reply");
                            self.locale.get("errors.operationFailed")
                        },
                    },
                    Err(e) => services.dispatcher.render_error(&e),
                };
                if let Err(e) = component
                    .edit_response(ctx, EditInteractionResponse::new().content(content))
                    .await
                {
                    warn!(custom_id, error = %e, "failed to answer select");
                }
            },
            other => debug!(custom_id, kind = ?other, "ignoring component"),
        }
    }

    async fn handle_modal(&self, ctx: &Context, modal: &ModalInteraction) {
        let Some(guild_id) = modal.guild_id else {
            return;
        };
        let services = self.services(ctx);
        let custom_id = modal.data.custom_id.as_str();
        let fields = ui::modal_fields(&modal.data.components);

        let response = match Command::decode_modal(custom_id, &fields) {
            Ok(command) => {
                let invocation = Invocation {
                    guild_id,
                    user_id: modal.user.id,
                };
                let reply = services.dispatcher.dispatch(invocation, command).await;
                ui::response(&self.locale, reply)
            },
            Err(e) => rejection(&services.dispatcher, custom_id, &e),
        };
        if let Err(e) = modal.create_response(ctx, response).await {
            warn!(custom_id, error = %e, "failed to answer modal");
        }
    }
}

/// Guilds present at startup are swept from `cache_ready`; anything that
/// shows up afterwards (a new join or a recovered outage) is swept here.
fn sweeps_on_create(startup_swept: bool, is_new: Option<bool>) -> bool {
    startup_swept || is_new == Some(true)
}

async fn sweep_guild(services: &Services, guild_id: GuildId) {
    match services.lifecycle.sweep(guild_id).await {
        Ok(summary) => info!(
            guild_id = %guild_id,
            checked = summary.checked,
            reclaimed = summary.reclaimed,
            stale = summary.stale,
            failed = summary.failed,
            "guild sweep finished"
        ),
        Err(e) => warn!(guild_id = %guild_id, error = %e, "guild sweep failed"),
    }
}

fn rejection(dispatcher: &Dispatcher, custom_id: &str, error: &ActionError) -> CreateInteractionResponse {
    debug!(custom_id, error = %error, "undecodable interaction");
    ui::ephemeral(dispatcher.render_error(error))
}

#[async_trait]
impl EventHandler for TempVoiceHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            language = self.locale.language(),
            "discord bot ready"
        );
        self.services(&ctx);
    }

    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        debug!(guilds = guilds.len(), "discord cache ready");
        let services = self.services(&ctx);
        for guild_id in guilds {
            sweep_guild(services, guild_id).await;
        }
        self.startup_swept.store(true, Ordering::Release);
    }

    async fn guild_create(&self, ctx: Context, guild: Guild, is_new: Option<bool>) {
        if !sweeps_on_create(self.startup_swept.load(Ordering::Acquire), is_new) {
            return;
        }
        sweep_guild(self.services(&ctx), guild.id).await;
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        let services = self.services(&ctx);

        let member = match &new.member {
            Some(member) => member_info(member),
            None => match services.platform.fetch_member(guild_id, new.user_id).await {
                Ok(Some(member)) => member,
                Ok(None) => {
                    debug!(user_id = %new.user_id, "voice update for unknown member");
                    return;
                },
                Err(e) => {
                    warn!(user_id = %new.user_id, error = %e, "failed to resolve voice member");
                    return;
                },
            },
        };

        let transition = VoiceTransition {
            guild_id,
            member,
            old_channel: old.and_then(|state| state.channel_id),
            new_channel: new.channel_id,
        };
        services.lifecycle.on_voice_transition(&transition).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Component(component) => self.handle_component(&ctx, &component).await,
            Interaction::Modal(modal) => self.handle_modal(&ctx, &modal).await,
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_cover_voice_and_members() {
        let intents = TempVoiceHandler::intents();
        assert!(intents.contains(GatewayIntents::GUILDS));
        assert!(intents.contains(GatewayIntents::GUILD_VOICE_STATES));
        assert!(intents.contains(GatewayIntents::GUILD_MEMBERS));
        assert!(!intents.contains(GatewayIntents::MESSAGE_CONTENT));
    }

    #[test]
    fn guilds_arriving_after_startup_are_swept() {
        // Startup guilds are left to cache_ready.
        assert!(!sweeps_on_create(false, Some(false)));
        assert!(!sweeps_on_create(false, None));
        // A fresh join is swept even before the startup sweep ran.
        assert!(sweeps_on_create(false, Some(true)));
        // After startup, late or recovered guilds are swept.
        assert!(sweeps_on_create(true, Some(false)));
        assert!(sweeps_on_create(true, None));
    }
}
