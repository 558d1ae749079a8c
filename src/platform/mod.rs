//! Outbound side of the bot: everything it asks the chat platform to do.
//!
//! [`Platform`] is the raw REST surface, [`gateway::RateLimitedGateway`] the only way the ticket
//! logic reaches it, and [`Reply`] the answer channel of the interaction being handled.

pub mod discord;
pub mod gateway;
pub mod panel;

use serenity::{async_trait, model::Permissions};
use tickets_core::message::Message;

use crate::db::model::transcript::TranscriptMessage;
pub use crate::error::PlatformError;

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverwriteTarget {
    Role(u64),
    Member(u64),
}

impl OverwriteTarget {
    pub fn id(&self) -> u64 {
        match self {
            OverwriteTarget::Role(id) | OverwriteTarget::Member(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overwrite {
    pub target: OverwriteTarget,
    pub allow: Permissions,
    pub deny: Permissions,
}

/// Text channel to create in a guild.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChannel {
    pub name: String,
    pub category: Option<u64>,
    pub overwrites: Vec<Overwrite>,
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Sends plain text, returns the id of the message.
    async fn send_message(&self, channel_id: u64, content: &str) -> PlatformResult<u64>;
    /// Sends a message with embeds and components, returns the id of the message.
    async fn send_rich_message(&self, channel_id: u64, message: &Message) -> PlatformResult<u64>;
    async fn delete_channel(&self, channel_id: u64) -> PlatformResult<()>;
    /// Creates a text channel, returns its id.
    async fn create_channel(&self, guild_id: u64, channel: &NewChannel) -> PlatformResult<u64>;
    /// Last `limit` messages of the channel, oldest first.
    async fn channel_history(&self, channel_id: u64, limit: u8) -> PlatformResult<Vec<TranscriptMessage>>;
    /// Users holding a member overwrite on the channel.
    async fn channel_members(&self, channel_id: u64) -> PlatformResult<Vec<u64>>;
    async fn allow_member(&self, channel_id: u64, user_id: u64, allow: Permissions) -> PlatformResult<()>;
    async fn remove_member(&self, channel_id: u64, user_id: u64) -> PlatformResult<()>;
}

/// Form asking the panel questions before a ticket is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionForm {
    pub custom_id: String,
    pub title: String,
    /// (input id, label)
    pub questions: Vec<(String, String)>,
}

/// Answer channel of an interaction.
#[async_trait]
pub trait Reply: Send + Sync {
    /// Acknowledges the interaction, the final answer comes later through [`Reply::send`].
    async fn defer(&self, ephemeral: bool) -> PlatformResult<()>;
    /// Answers, or replaces the deferred answer.
    async fn send(&self, message: Message) -> PlatformResult<()>;
    async fn show_form(&self, form: &QuestionForm) -> PlatformResult<()>;
}
