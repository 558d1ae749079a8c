//! Discord implementation of the platform traits, over the serenity REST client.

use std::sync::{atomic::{AtomicBool, Ordering}, Arc};

use chrono::{DateTime, TimeZone, Utc};
use serenity::{
    async_trait,
    builder::CreateInteractionResponse,
    http::{Http, HttpError},
    model::{
        application::{
            component::InputTextStyle,
            interaction::{
                application_command::ApplicationCommandInteraction,
                message_component::MessageComponentInteraction,
                modal::ModalSubmitInteraction,
                InteractionResponseType,
            },
        },
        channel::{Channel, ChannelType, Message as DiscordMessage, PermissionOverwrite, PermissionOverwriteType},
        id::{ChannelId, GuildId, RoleId, UserId},
        Permissions, Timestamp,
    },
};
use tickets_core::message::Message;

use super::{NewChannel, OverwriteTarget, Platform, PlatformError, PlatformResult, QuestionForm, Reply};
use crate::db::model::transcript::{Attachment, Author, Embed, EmbedField, Reaction, TranscriptMessage};

/// Discord error code of an unknown channel.
const UNKNOWN_CHANNEL: isize = 10003;
/// Modal input labels are limited to 45 characters.
const MAX_LABEL_LEN: usize = 45;

pub fn map_error(err: serenity::Error) -> PlatformError {
    if let serenity::Error::Http(http_err) = &err {
        let http_err: &HttpError = http_err;
        if let HttpError::UnsuccessfulRequest(resp) = http_err {
            match resp.status_code.as_u16() {
                429 => return PlatformError::RateLimited { retry_after: None },
                404 => return PlatformError::NotFound,
                _ if resp.error.code == UNKNOWN_CHANNEL => return PlatformError::NotFound,
                _ => (),
            }
        }
    }
    PlatformError::Other(err.to_string())
}

fn to_utc(ts: &Timestamp) -> DateTime<Utc> {
    Utc.timestamp_opt(ts.unix_timestamp(), 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Snapshot of a Discord message as stored in transcripts.
pub fn to_transcript(msg: &DiscordMessage) -> TranscriptMessage {
    TranscriptMessage {
        id: msg.id.0,
        author: Author {
            id: msg.author.id.0,
            username: msg.author.name.clone(),
            bot: msg.author.bot,
        },
        content: if msg.content.is_empty() { None } else { Some(msg.content.clone()) },
        timestamp: to_utc(&msg.timestamp),
        embeds: msg.embeds.iter().map(|e| Embed {
            title: e.title.clone(),
            description: e.description.clone(),
            url: e.url.clone(),
            color: e.colour.map(|c| c.0),
            fields: e.fields.iter().map(|f| EmbedField {
                name: f.name.clone(),
                value: f.value.clone(),
                inline: f.inline,
            }).collect(),
        }).collect(),
        attachments: msg.attachments.iter().map(|a| Attachment {
            id: a.id.0,
            filename: a.filename.clone(),
            url: a.url.clone(),
            size: a.size,
            content_type: a.content_type.clone(),
        }).collect(),
        reactions: msg.reactions.iter().map(|r| Reaction {
            emoji: r.reaction_type.to_string(),
            count: r.count,
        }).collect(),
        edited: msg.edited_timestamp.is_some(),
        edited_at: msg.edited_timestamp.as_ref().map(to_utc),
    }
}

pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn send_message(&self, channel_id: u64, content: &str) -> PlatformResult<u64> {
        let msg = ChannelId(channel_id).say(&*self.http, content).await.map_err(map_error)?;
        Ok(msg.id.0)
    }

    async fn send_rich_message(&self, channel_id: u64, message: &Message) -> PlatformResult<u64> {
        let msg = ChannelId(channel_id)
            .send_message(&*self.http, |m| message.build_message(m))
            .await
            .map_err(map_error)?;
        Ok(msg.id.0)
    }

    async fn delete_channel(&self, channel_id: u64) -> PlatformResult<()> {
        ChannelId(channel_id).delete(&*self.http).await.map_err(map_error)?;
        Ok(())
    }

    async fn create_channel(&self, guild_id: u64, channel: &NewChannel) -> PlatformResult<u64> {
        let overwrites = channel.overwrites.iter().map(|o| PermissionOverwrite {
            allow: o.allow,
            deny: o.deny,
            kind: match o.target {
                OverwriteTarget::Role(id) => PermissionOverwriteType::Role(RoleId(id)),
                OverwriteTarget::Member(id) => PermissionOverwriteType::Member(UserId(id)),
            },
        }).collect::<Vec<_>>();
        let created = GuildId(guild_id)
            .create_channel(&*self.http, |c| {
                c.name(&channel.name)
                    .kind(ChannelType::Text)
                    .permissions(overwrites);
                if let Some(category) = channel.category {
                    c.category(ChannelId(category));
                }
                c
            })
            .await
            .map_err(map_error)?;
        Ok(created.id.0)
    }

    async fn channel_history(&self, channel_id: u64, limit: u8) -> PlatformResult<Vec<TranscriptMessage>> {
        let messages = ChannelId(channel_id)
            .messages(&*self.http, |r| r.limit(limit as u64))
            .await
            .map_err(map_error)?;
        // Discord answers newest first
        Ok(messages.iter().rev().map(to_transcript).collect())
    }

    async fn channel_members(&self, channel_id: u64) -> PlatformResult<Vec<u64>> {
        let channel = ChannelId(channel_id).to_channel(&*self.http).await.map_err(map_error)?;
        let overwrites = match channel {
            Channel::Guild(channel) => channel.permission_overwrites,
            _ => return Ok(Vec::new()),
        };
        Ok(overwrites.iter().filter_map(|o| match o.kind {
            PermissionOverwriteType::Member(user) => Some(user.0),
            _ => None,
        }).collect())
    }

    async fn allow_member(&self, channel_id: u64, user_id: u64, allow: Permissions) -> PlatformResult<()> {
        ChannelId(channel_id)
            .create_permission(&*self.http, &PermissionOverwrite {
                allow,
                deny: Permissions::empty(),
                kind: PermissionOverwriteType::Member(UserId(user_id)),
            })
            .await
            .map_err(map_error)
    }

    async fn remove_member(&self, channel_id: u64, user_id: u64) -> PlatformResult<()> {
        ChannelId(channel_id)
            .delete_permission(&*self.http, PermissionOverwriteType::Member(UserId(user_id)))
            .await
            .map_err(map_error)
    }
}

pub enum Interaction {
    Component(MessageComponentInteraction),
    Modal(ModalSubmitInteraction),
    Command(ApplicationCommandInteraction),
}

/// Answers a Discord interaction: first response, then edits of it.
pub struct InteractionReply {
    http: Arc<Http>,
    interaction: Interaction,
    acknowledged: AtomicBool,
}

macro_rules! with_interaction {
    ($self:ident, $i:ident => $body:expr) => {
        match &$self.interaction {
            Interaction::Component($i) => $body,
            Interaction::Modal($i) => $body,
            Interaction::Command($i) => $body,
        }
    };
}

fn truncate(label: &str) -> String {
    label.chars().take(MAX_LABEL_LEN).collect()
}

fn build_form<'a, 'b>(r: &'b mut CreateInteractionResponse<'a>, form: &QuestionForm) -> &'b mut CreateInteractionResponse<'a> {
    r.kind(InteractionResponseType::Modal)
        .interaction_response_data(|d| {
            d.custom_id(&form.custom_id)
                .title(truncate(&form.title))
                .components(|c| {
                    for (id, label) in &form.questions {
                        c.create_action_row(|row| {
                            row.create_input_text(|t| {
                                t.custom_id(id)
                                    .label(truncate(label))
                                    .style(InputTextStyle::Paragraph)
                                    .required(true)
                            })
                        });
                    }
                    c
                })
        })
}

impl InteractionReply {
    pub fn new(http: Arc<Http>, interaction: Interaction) -> Self {
        Self { http, interaction, acknowledged: AtomicBool::new(false) }
    }
}

#[async_trait]
impl Reply for InteractionReply {
    async fn defer(&self, ephemeral: bool) -> PlatformResult<()> {
        let http = &*self.http;
        let res = with_interaction!(self, i => i.create_interaction_response(http, |r| {
            r.kind(InteractionResponseType::DeferredChannelMessageWithSource)
                .interaction_response_data(|d| d.ephemeral(ephemeral))
        }).await);
        res.map_err(map_error)?;
        self.acknowledged.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, message: Message) -> PlatformResult<()> {
        let http = &*self.http;
        if self.acknowledged.load(Ordering::SeqCst) {
            let res = with_interaction!(self, i => i.edit_original_interaction_response(http, |r| {
                *r = (&message).into();
                r
            }).await.map(|_| ()));
            res.map_err(map_error)
        } else {
            let res = with_interaction!(self, i => i.create_interaction_response(http, |r| {
                r.kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|d| message.build_response_data(d))
            }).await);
            res.map_err(map_error)?;
            self.acknowledged.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn show_form(&self, form: &QuestionForm) -> PlatformResult<()> {
        let http = &*self.http;
        let res = match &self.interaction {
            Interaction::Component(i) => i.create_interaction_response(http, |r| build_form(r, form)).await,
            Interaction::Command(i) => i.create_interaction_response(http, |r| build_form(r, form)).await,
            Interaction::Modal(_) => return Err(PlatformError::Other("a form cannot answer a form".to_string())),
        };
        res.map_err(map_error)?;
        self.acknowledged.store(true, Ordering::SeqCst);
        Ok(())
    }
}
