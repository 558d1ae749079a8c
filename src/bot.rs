//! Application core.
//! Wires the stores, the Discord platform and the components together.

use std::sync::Arc;

use serenity::{
    client::bridge::gateway::ShardManager,
    prelude::{GatewayIntents, Mutex},
    Client,
};
use tickets_core::ComponentContainer;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::clock::{Clock, SystemClock};
use crate::components::tickets::{controller::TicketLifecycleController, scheduler::AutoCloseScheduler, Tickets};
use crate::config::Config;
use crate::db::{self, controller::{GuildConfigProvider, TicketStore, TranscriptRecorder}};
use crate::error::Result;
use crate::platform::{discord::DiscordPlatform, gateway::RateLimitedGateway, panel::HttpPanelSource, Platform};

/// The bot.
///
/// Components are placed in a [ComponentContainer] which hands a
/// [ComponentEventDispatcher] to the serenity client. The auto-close scheduler runs beside
/// the client, on its own task.
///
/// [ComponentEventDispatcher]: tickets_core::event::ComponentEventDispatcher
pub struct Bot {
    client: Client,
    scheduler: Arc<AutoCloseScheduler>,
    _container: ComponentContainer,
}

impl Bot {
    pub async fn new(config: &Config) -> Result<Bot> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let conn = db::start_db(&config.database_url).await?;

        let mut container = ComponentContainer::new();
        let tickets = container.add_component(Tickets::new());

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT
            | GatewayIntents::GUILD_MEMBERS;
        let client = Client::builder(&config.token, intents)
            .raw_event_handler(container.get_event_dispatcher())
            .await?;

        // One REST handle for the whole bot, so the rate-limit buckets are shared.
        let http = Arc::clone(&client.cache_and_http.http);
        let platform: Arc<dyn Platform> = Arc::new(DiscordPlatform::new(http));
        let gateway = RateLimitedGateway::new(platform, Arc::clone(&clock));

        let store = TicketStore::new(conn.clone(), Arc::clone(&clock));
        let configs = GuildConfigProvider::new(conn.clone());
        let transcripts = TranscriptRecorder::new(conn, Arc::clone(&clock));
        let panels = Arc::new(HttpPanelSource::new(&config.panel_api_url)?);

        tickets.attach(Arc::new(TicketLifecycleController::new(
            store.clone(),
            configs.clone(),
            transcripts,
            gateway.clone(),
            panels,
        )));
        let scheduler = Arc::new(AutoCloseScheduler::new(store, configs, gateway, clock, config.auto_close.clone()));
        Ok(Bot { client, scheduler, _container: container })
    }

    /// Starts the auto-close sweep. It stops once `token` is cancelled.
    pub fn spawn_scheduler(&self, token: CancellationToken) -> JoinHandle<()> {
        Arc::clone(&self.scheduler).spawn(token)
    }

    /// Connects to the gateway and runs until the client stops.
    pub async fn start(&mut self) -> Result<()> {
        self.client.start().await?;
        Ok(())
    }

    pub fn shard_manager(&self) -> Arc<Mutex<ShardManager>> {
        Arc::clone(&self.client.shard_manager)
    }
}
