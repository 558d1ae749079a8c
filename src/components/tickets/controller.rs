//! Open and close flows of tickets, and the events that feed them.

use std::sync::Arc;

use tickets_core::message::{self, Message};

use super::permissions::{is_staff, member_permissions, ticket_overwrites, Invoker};
use super::welcome::{transcript_summary, welcome_message};
use crate::db::controller::{GuildConfigProvider, NewTicket, TicketStore, TranscriptRecorder};
use crate::db::model::{guild::GuildConfig, transcript::{ClosedBy, TranscriptMessage}};
use crate::error::{Error, Result};
use crate::platform::{
    gateway::RateLimitedGateway,
    panel::PanelSource,
    NewChannel, QuestionForm, Reply,
};
use crate::{log_error, log_info, log_warn};

/// Messages of the channel fetched when a ticket closes.
pub const HISTORY_WINDOW: u8 = 100;
pub const PANEL_MODAL_PREFIX: &str = "panel_modal_";

/// A user asks for a ticket through a panel.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub guild_id: u64,
    pub panel_id: String,
    pub invoker: Invoker,
    /// Answers to the panel questions, once the form was submitted.
    pub answers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened { channel_id: u64 },
    LimitReached,
    PanelNotFound,
    /// The panel asks questions: the form was shown and the flow resumes on its submission.
    FormShown,
}

/// A member acts on the ticket channel they are in.
#[derive(Debug, Clone)]
pub struct ChannelRequest {
    pub guild_id: u64,
    pub channel_id: u64,
    pub invoker: Invoker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    NotATicket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberOutcome {
    Added,
    Removed,
    AlreadyPresent,
    NotPresent,
    OwnerProtected,
    NotATicket,
}

pub struct TicketLifecycleController {
    store: TicketStore,
    configs: GuildConfigProvider,
    transcripts: TranscriptRecorder,
    gateway: RateLimitedGateway,
    panels: Arc<dyn PanelSource>,
}

/// Answers the invoker with an error and hands the error back.
async fn fail<T>(reply: &dyn Reply, text: &str, err: Error) -> Result<T> {
    log_error!("{}: {}", text, err);
    if let Err(e) = reply.send(message::error(text).set_ephemeral(true)).await {
        log_warn!("Could not answer the interaction: {}", e);
    }
    Err(err)
}

async fn acknowledge(reply: &dyn Reply, user_id: u64) {
    if let Err(e) = reply.defer(true).await {
        log_warn!("Could not acknowledge the open request of {}: {}", user_id, e);
    }
}

async fn answer(reply: &dyn Reply, msg: Message) {
    if let Err(e) = reply.send(msg.set_ephemeral(true)).await {
        log_warn!("Could not answer the interaction: {}", e);
    }
}

impl TicketLifecycleController {
    pub fn new(
        store: TicketStore,
        configs: GuildConfigProvider,
        transcripts: TranscriptRecorder,
        gateway: RateLimitedGateway,
        panels: Arc<dyn PanelSource>,
    ) -> Self {
        Self { store, configs, transcripts, gateway, panels }
    }

    pub async fn open_ticket(&self, req: OpenRequest, reply: &dyn Reply) -> Result<OpenOutcome> {
        let user_id = req.invoker.user_id;
        // A question form must be the first response to the interaction, so only a submitted
        // form is acknowledged up front. The other paths are acknowledged once the panel is known.
        let submitted = req.answers.is_some();
        if submitted {
            acknowledge(reply, user_id).await;
        }

        let config = match self.configs.get(req.guild_id).await {
            Ok(config) => config,
            Err(e) => return fail(reply, "Failed to fetch server configuration. Please try again later.", e).await,
        };
        let active = match self.store.count_active_for_user(req.guild_id, user_id).await {
            Ok(active) => active,
            Err(e) => return fail(reply, "Failed to verify ticket limit. Please try again later.", e).await,
        };
        if !config.allows_another_ticket(active) {
            answer(reply, message::error(format!(
                "You have reached the maximum number of open tickets ({}). Please close an existing ticket before opening a new one.",
                config.max_tickets_per_user
            ))).await;
            return Ok(OpenOutcome::LimitReached);
        }

        let panel = match self.panels.get_panel(&req.panel_id).await {
            Ok(Some(panel)) => panel,
            Ok(None) => {
                answer(reply, message::error("Panel not found. Please contact an administrator.")).await;
                return Ok(OpenOutcome::PanelNotFound);
            }
            Err(e) => return fail(reply, "Failed to fetch panel data. Please try again later.", e).await,
        };

        let prompts = panel.prompts();
        let answers = match req.answers {
            None if !prompts.is_empty() => {
                let form = QuestionForm {
                    custom_id: format!("{}{}", PANEL_MODAL_PREFIX, req.panel_id),
                    title: "Open a ticket".to_string(),
                    questions: prompts.iter().enumerate().map(|(i, p)| (format!("question_{}", i), p.clone())).collect(),
                };
                reply.show_form(&form).await.map_err(Error::from)?;
                return Ok(OpenOutcome::FormShown);
            }
            None => {
                acknowledge(reply, user_id).await;
                Vec::new()
            }
            Some(answers) => prompts
                .into_iter()
                .enumerate()
                .map(|(i, q)| (q, answers.get(i).cloned().unwrap_or_default()))
                .collect(),
        };

        let channel = NewChannel {
            name: format!("ticket-{}", req.invoker.username),
            category: panel.ticket_category,
            overwrites: ticket_overwrites(req.guild_id, user_id, &config, &panel),
        };
        let channel_id = match self.gateway.create_channel(req.guild_id, &channel).await {
            Ok(id) => id,
            Err(e) => return fail(reply, "Failed to create ticket channel. Please try again later.", e).await,
        };

        let ticket = match self.store.create(NewTicket {
            guild_id: req.guild_id,
            channel_id,
            user_id,
            panel_id: req.panel_id.clone(),
        }).await {
            Ok(ticket) => ticket,
            Err(e) => {
                if let Err(e) = self.gateway.delete_channel(channel_id).await {
                    log_error!("Could not delete orphan ticket channel {}: {}", channel_id, e);
                }
                return fail(reply, "Failed to save the ticket. Please try again later.", e).await;
            }
        };

        if let Err(e) = self.transcripts.init(&ticket, &req.invoker.username, &config).await {
            log_warn!("Could not start the transcript of ticket {}: {}", ticket.id, e);
        }
        let welcome = welcome_message(&req.invoker, &panel, &answers);
        if let Err(e) = self.gateway.send_rich_message(channel_id, &welcome).await {
            log_warn!("Could not send the welcome message in {}: {}", channel_id, e);
        }
        log_info!("Ticket {} opened by {} in channel {}", ticket.id, user_id, channel_id);
        answer(reply, message::success(format!("Ticket created! Please check <#{}>", channel_id))).await;
        Ok(OpenOutcome::Opened { channel_id })
    }

    pub async fn close_ticket(&self, req: ChannelRequest, reply: &dyn Reply) -> Result<CloseOutcome> {
        let config = match self.configs.get(req.guild_id).await {
            Ok(config) => config,
            Err(e) => return fail(reply, "Failed to fetch server configuration. Please try again later.", e).await,
        };
        if !is_staff(&config, &req.invoker) {
            answer(reply, message::error("You don't have permission to close this ticket. Only staff members can close tickets.")).await;
            return Err(Error::PermissionDenied);
        }

        let ticket = match self.store.get_by_channel(req.channel_id).await {
            Ok(None) => {
                answer(reply, message::error("This channel is not a ticket.")).await;
                return Ok(CloseOutcome::NotATicket);
            }
            Ok(Some(ticket)) => Some(ticket),
            Err(e) => {
                log_error!("Could not read the ticket of channel {}: {}", req.channel_id, e);
                None
            }
        };
        answer(reply, message::info("Closing ticket...")).await;

        // A ticket already marked closed was archived by the first attempt.
        if let Some(ticket) = ticket.as_ref().filter(|t| !t.closed) {
            self.archive(ticket, &config, &req.invoker).await;
        }

        if let Err(e) = self.store.close(req.channel_id).await {
            log_error!("Could not mark the ticket of channel {} closed: {}", req.channel_id, e);
        }
        if let Err(e) = self.gateway.delete_channel(req.channel_id).await {
            return fail(reply, "Failed to close ticket. Please contact an administrator.", e).await;
        }
        log_info!("Ticket of channel {} closed by {}", req.channel_id, req.invoker.user_id);
        Ok(CloseOutcome::Closed)
    }

    /// Finalizes the transcript and posts its summary. Best effort.
    async fn archive(&self, ticket: &crate::db::model::ticket::Model, config: &GuildConfig, closer: &Invoker) {
        let transcript = match self.transcripts.get(ticket.id).await {
            Ok(Some(transcript)) => transcript,
            Ok(None) => return,
            Err(e) => {
                log_warn!("Could not read the transcript of ticket {}: {}", ticket.id, e);
                return;
            }
        };
        let history = match self.gateway.channel_history(ticket.channel().0, HISTORY_WINDOW).await {
            Ok(history) => history,
            Err(e) => {
                log_warn!("Could not fetch the history of channel {}: {}", ticket.channel_id, e);
                Vec::new()
            }
        };
        let closed_by = ClosedBy { id: closer.user_id, username: closer.username.clone() };
        let finalized = match self.transcripts.finalize(ticket.id, closed_by, history).await {
            Ok(Some(finalized)) => finalized,
            Ok(None) => return,
            Err(e) => {
                log_error!("Could not finalize the transcript of ticket {}: {}", ticket.id, e);
                return;
            }
        };
        if let Some(transcript_channel) = config.transcript_channel_id {
            let summary = transcript_summary(ticket, &transcript.username, &finalized.metadata);
            if let Err(e) = self.gateway.send_rich_message(transcript_channel, &summary).await {
                log_warn!("Could not post the transcript of ticket {}: {}", ticket.id, e);
            }
        }
    }

    /// Tracks a message posted in a channel. Returns whether the channel is an open ticket.
    ///
    /// Bot messages land in the transcript but do not count as activity.
    pub async fn record_message(&self, channel_id: u64, message: TranscriptMessage) -> Result<bool> {
        let ticket = match self.store.get_by_channel(channel_id).await? {
            Some(ticket) if !ticket.closed => ticket,
            _ => return Ok(false),
        };
        if !message.author.bot {
            if let Err(e) = self.store.update_last_message(channel_id).await {
                log_warn!("Could not update the activity of ticket {}: {}", ticket.id, e);
            }
        }
        self.transcripts.append(ticket.id, message).await?;
        Ok(true)
    }

    /// Closes every open ticket of a member leaving the guild, when the guild asks for it.
    /// Returns how many tickets were closed.
    pub async fn on_member_leave(&self, guild_id: u64, user_id: u64) -> Result<usize> {
        let config = self.configs.get(guild_id).await?;
        if !(config.auto_close.enabled && config.auto_close.close_when_user_leaves) {
            return Ok(0);
        }
        let tickets = self.store.list_active_for_user(guild_id, user_id).await?;
        let mut closed = 0;
        for ticket in tickets {
            let channel_id = ticket.channel().0;
            if let Err(e) = self.store.close(channel_id).await {
                log_error!("Could not close ticket {} of leaving member {}: {}", ticket.id, user_id, e);
                continue;
            }
            closed += 1;
            if let Err(e) = self.gateway.delete_channel(channel_id).await {
                log_error!("Could not delete ticket channel {}: {}", channel_id, e);
            }
        }
        if closed > 0 {
            log_info!("Closed {} ticket(s) of {} who left guild {}", closed, user_id, guild_id);
        }
        Ok(closed)
    }

    /// Checks shared by the member commands. `None` when the flow already answered.
    async fn member_command_ticket(&self, req: &ChannelRequest, reply: &dyn Reply) -> Result<Option<(GuildConfig, crate::db::model::ticket::Model)>> {
        if let Err(e) = reply.defer(true).await {
            log_warn!("Could not acknowledge the command of {}: {}", req.invoker.user_id, e);
        }
        let config = match self.configs.get(req.guild_id).await {
            Ok(config) => config,
            Err(e) => return fail(reply, "An error occurred while processing your request.", e).await,
        };
        if !is_staff(&config, &req.invoker) {
            answer(reply, message::error("You do not have permission to use this command.")).await;
            return Err(Error::PermissionDenied);
        }
        match self.store.get_by_channel(req.channel_id).await {
            Ok(Some(ticket)) if !ticket.closed => Ok(Some((config, ticket))),
            Ok(_) => {
                answer(reply, message::error("This command can only be used in ticket channels.")).await;
                Ok(None)
            }
            Err(e) => fail(reply, "An error occurred while processing your request.", e).await,
        }
    }

    pub async fn add_member(&self, req: ChannelRequest, user_id: u64, reply: &dyn Reply) -> Result<MemberOutcome> {
        let (config, _) = match self.member_command_ticket(&req, reply).await? {
            Some(found) => found,
            None => return Ok(MemberOutcome::NotATicket),
        };
        let members = match self.gateway.channel_members(req.channel_id).await {
            Ok(members) => members,
            Err(e) => return fail(reply, "An error occurred while checking channel permissions.", e).await,
        };
        if members.contains(&user_id) {
            answer(reply, message::error("This user is already in the ticket.")).await;
            return Ok(MemberOutcome::AlreadyPresent);
        }
        let allow = member_permissions(&config.ticket_permissions);
        if let Err(e) = self.gateway.allow_member(req.channel_id, user_id, allow).await {
            return fail(reply, "An error occurred while adding the user to the ticket.", e).await;
        }
        answer(reply, message::success(format!("Successfully added <@{}> to the ticket.", user_id))).await;
        Ok(MemberOutcome::Added)
    }

    pub async fn remove_member(&self, req: ChannelRequest, user_id: u64, reply: &dyn Reply) -> Result<MemberOutcome> {
        let (_, ticket) = match self.member_command_ticket(&req, reply).await? {
            Some(found) => found,
            None => return Ok(MemberOutcome::NotATicket),
        };
        if ticket.user().0 == user_id {
            answer(reply, message::error("You cannot remove the ticket owner from their own ticket.")).await;
            return Ok(MemberOutcome::OwnerProtected);
        }
        let members = match self.gateway.channel_members(req.channel_id).await {
            Ok(members) => members,
            Err(e) => return fail(reply, "An error occurred while checking channel permissions.", e).await,
        };
        if !members.contains(&user_id) {
            answer(reply, message::error("This user is not in the ticket.")).await;
            return Ok(MemberOutcome::NotPresent);
        }
        if let Err(e) = self.gateway.remove_member(req.channel_id, user_id).await {
            return fail(reply, "An error occurred while removing the user from the ticket.", e).await;
        }
        answer(reply, message::success(format!("Successfully removed <@{}> from the ticket.", user_id))).await;
        Ok(MemberOutcome::Removed)
    }
}
