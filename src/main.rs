mod bot;
mod clock;
mod components;
mod config;
mod db;
mod error;
mod log;
mod platform;

use tokio_util::sync::CancellationToken;

trait ResultLog {
    type OkType;
    fn expect_log(self, msg: &str) -> Self::OkType;
}
impl<T, S: ToString> ResultLog for Result<T, S> {
    type OkType = T;
    fn expect_log(self, msg: &str) -> T {
        match self {
            Ok(v) => v,
            Err(e) if msg.is_empty() => panic!("{}", e.to_string()),
            Err(e) => panic!("{}: {}", msg, e.to_string()),
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => (),
                    _ = term.recv() => (),
                }
            }
            Err(e) => {
                log_warn!("Cannot listen to SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() {
    let config = config::Config::read_file("./config.json").expect_log("Could not load the configuration file");
    crate::log::init(config.log_level()).expect_log("Could not install the logger");
    let mut bot = bot::Bot::new(&config).await.expect_log("Could not initialize the bot");

    let shards = bot.shard_manager();
    let token = CancellationToken::new();
    let scheduler = bot.spawn_scheduler(token.clone());

    tokio::select! {
        res = bot.start() => {
            if let Err(e) = res {
                log_error!("Client stopped: {}", e);
            }
        }
        _ = shutdown_signal() => {
            log_info!("Shutting down");
            shards.lock().await.shutdown_all().await;
        }
    }
    token.cancel();
    if let Err(e) = scheduler.await {
        log_error!("Auto-close scheduler panicked: {}", e);
    }
}
