//! Periodic sweep closing abandoned tickets.
//!
//! Each tick scans a bounded page of open tickets untouched for a while, checks them against the
//! auto-close policy of their guild and closes the ones past a threshold. Guild policies are
//! cached for the duration of one tick only.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::{task::JoinHandle, time::{interval_at, Instant, MissedTickBehavior}};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::db::controller::{GuildConfigProvider, TicketStore};
use crate::db::model::{guild::{AutoClose, GuildConfig}, ticket};
use crate::error::Result;
use crate::platform::gateway::RateLimitedGateway;
use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// Time between two ticks.
    pub period_secs: u64,
    /// Wait between the closing notice and the channel deletion.
    pub grace_secs: u64,
    /// Maximum tickets examined per tick.
    pub page_limit: u64,
    /// Tickets touched more recently than this are not scanned.
    pub scan_floor_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            period_secs: 300,
            grace_secs: 2,
            page_limit: 1000,
            scan_floor_secs: 60,
        }
    }
}

impl SchedulerSettings {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs.max(1))
    }
    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.grace_secs)
    }
    pub fn scan_floor(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.scan_floor_secs as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    NoResponseSinceOpening,
    Inactivity,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::NoResponseSinceOpening => f.write_str("no response since opening"),
            CloseReason::Inactivity => f.write_str("inactivity"),
        }
    }
}

/// Why the ticket should be closed at `now`, if it should.
///
/// The open-without-response check comes first, so a ticket matching both reports
/// [`CloseReason::NoResponseSinceOpening`].
pub fn close_reason(ticket: &ticket::Model, policy: &AutoClose, now: DateTime<Utc>) -> Option<CloseReason> {
    if !policy.enabled {
        return None;
    }
    if let Some(threshold) = policy.since_open_without_response.duration() {
        if ticket.never_answered() && now - ticket.created_at >= threshold {
            return Some(CloseReason::NoResponseSinceOpening);
        }
    }
    if let Some(threshold) = policy.since_last_response.duration() {
        if now - ticket.last_message_at >= threshold {
            return Some(CloseReason::Inactivity);
        }
    }
    None
}

pub fn close_notice(reason: CloseReason) -> String {
    format!("🔒 This ticket is being automatically closed due to {}.", reason)
}

/// Outcome of one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub scanned: usize,
    /// Channels closed, with the reason.
    pub closed: Vec<(u64, CloseReason)>,
    /// Tickets skipped because of an error.
    pub failed: usize,
}

pub struct AutoCloseScheduler {
    store: TicketStore,
    configs: GuildConfigProvider,
    gateway: RateLimitedGateway,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
}

impl AutoCloseScheduler {
    pub fn new(
        store: TicketStore,
        configs: GuildConfigProvider,
        gateway: RateLimitedGateway,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        Self { store, configs, gateway, clock, settings }
    }

    /// One sweep. Only the scan itself can fail the tick; a failing ticket is skipped.
    pub async fn tick(&self) -> Result<TickReport> {
        let tickets = self.store.list_inactive(self.settings.scan_floor(), self.settings.page_limit).await?;
        let mut report = TickReport { scanned: tickets.len(), ..Default::default() };
        let mut configs: HashMap<i64, GuildConfig> = HashMap::new();

        for ticket in tickets {
            if !configs.contains_key(&ticket.guild_id) {
                match self.configs.get(ticket.guild().0).await {
                    Ok(config) => {
                        configs.insert(ticket.guild_id, config);
                    }
                    Err(e) => {
                        log_warn!("Auto-close: no configuration for guild {}: {}", ticket.guild_id, e);
                        report.failed += 1;
                        continue;
                    }
                }
            }
            let policy = match configs.get(&ticket.guild_id) {
                Some(config) => &config.auto_close,
                None => continue,
            };
            let reason = match close_reason(&ticket, policy, self.clock.now()) {
                Some(reason) => reason,
                None => continue,
            };
            match self.close(&ticket, reason).await {
                Ok(()) => report.closed.push((ticket.channel().0, reason)),
                Err(e) if e.is_transient() => {
                    log_warn!("Auto-close of ticket {} postponed: {}", ticket.id, e);
                    report.failed += 1;
                }
                Err(e) => {
                    log_error!("Auto-close of ticket {} failed: {}", ticket.id, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn close(&self, ticket: &ticket::Model, reason: CloseReason) -> Result<()> {
        let channel_id = ticket.channel().0;
        if let Err(e) = self.gateway.send_message(channel_id, &close_notice(reason)).await {
            log_warn!("Could not post the closing notice in channel {}: {}", channel_id, e);
        }
        self.clock.sleep(self.settings.grace()).await;
        self.store.close(channel_id).await?;
        if let Err(e) = self.gateway.delete_channel(channel_id).await {
            log_error!("Could not delete ticket channel {}: {}", channel_id, e);
        }
        log_info!("Ticket {} auto-closed due to {}", ticket.id, reason);
        Ok(())
    }

    /// Ticks every period until `token` is cancelled. A tick in progress is never interrupted.
    pub async fn run(&self, token: CancellationToken) {
        let period = self.settings.period();
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log_info!("Auto-close scheduler started, every {:?}", period);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {
                    match self.tick().await {
                        Ok(report) if !report.closed.is_empty() || report.failed > 0 => log_info!(
                            "Auto-close tick: {} scanned, {} closed, {} failed",
                            report.scanned, report.closed.len(), report.failed
                        ),
                        Ok(report) => log_debug!("Auto-close tick: {} scanned, nothing to close", report.scanned),
                        Err(e) => log_error!("Auto-close tick aborted: {}", e),
                    }
                }
            }
        }
        log_info!("Auto-close scheduler stopped");
    }

    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }
}
