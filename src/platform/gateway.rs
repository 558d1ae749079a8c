//! Bounded retry around outbound platform calls.
//!
//! When the platform answers with a rate limit, the call waits for the duration it dictated (one
//! second if it did not say) and tries again, up to [`MAX_RETRIES`] times. Any other error is
//! returned as is.

use std::{future::Future, sync::Arc, time::Duration};

use serenity::model::Permissions;
use tickets_core::message::Message;

use super::{NewChannel, Platform, PlatformError, PlatformResult};
use crate::clock::Clock;
use crate::db::model::transcript::TranscriptMessage;
use crate::error::{Error, Result};
use crate::{log_info, log_warn};

pub const MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct RateLimitedGateway {
    platform: Arc<dyn Platform>,
    clock: Arc<dyn Clock>,
}

impl RateLimitedGateway {
    pub fn new(platform: Arc<dyn Platform>, clock: Arc<dyn Clock>) -> Self {
        Self { platform, clock }
    }

    async fn with_retry<T, F, Fut>(&self, op: &'static str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PlatformResult<T>>,
    {
        for attempt in 0..=MAX_RETRIES {
            match call().await {
                Ok(v) => return Ok(v),
                Err(PlatformError::RateLimited { retry_after }) => {
                    if attempt == MAX_RETRIES {
                        break;
                    }
                    let wait = retry_after.unwrap_or(DEFAULT_RETRY_AFTER);
                    log_warn!("{}: rate limited, waiting {:?} before retry (attempt {}/{})", op, wait, attempt + 1, MAX_RETRIES);
                    self.clock.sleep(wait).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::RetryBudgetExceeded(MAX_RETRIES + 1))
    }

    pub async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64> {
        let platform = &self.platform;
        self.with_retry("send message", move || platform.send_message(channel_id, content)).await
    }

    pub async fn send_rich_message(&self, channel_id: u64, message: &Message) -> Result<u64> {
        let platform = &self.platform;
        self.with_retry("send rich message", move || platform.send_rich_message(channel_id, message)).await
    }

    /// Deletes the channel. A channel that no longer exists counts as deleted.
    pub async fn delete_channel(&self, channel_id: u64) -> Result<()> {
        let platform = &self.platform;
        match self.with_retry("delete channel", move || platform.delete_channel(channel_id)).await {
            Err(Error::Platform(PlatformError::NotFound)) => {
                log_info!("Channel {} was already deleted", channel_id);
                Ok(())
            }
            res => res,
        }
    }

    pub async fn create_channel(&self, guild_id: u64, channel: &NewChannel) -> Result<u64> {
        Ok(self.platform.create_channel(guild_id, channel).await?)
    }

    pub async fn channel_history(&self, channel_id: u64, limit: u8) -> Result<Vec<TranscriptMessage>> {
        Ok(self.platform.channel_history(channel_id, limit).await?)
    }

    pub async fn channel_members(&self, channel_id: u64) -> Result<Vec<u64>> {
        Ok(self.platform.channel_members(channel_id).await?)
    }

    pub async fn allow_member(&self, channel_id: u64, user_id: u64, allow: Permissions) -> Result<()> {
        Ok(self.platform.allow_member(channel_id, user_id, allow).await?)
    }

    pub async fn remove_member(&self, channel_id: u64, user_id: u64) -> Result<()> {
        Ok(self.platform.remove_member(channel_id, user_id).await?)
    }
}
