//! Support tickets: panels opening private channels, staff closing them, and the sweep
//! closing the abandoned ones.

pub mod controller;
pub mod permissions;
pub mod scheduler;
pub mod welcome;

use std::sync::Arc;

use serenity::{
    async_trait,
    client::Context,
    model::{
        application::{
            command::CommandOptionType,
            component::ActionRowComponent,
            interaction::{
                application_command::{ApplicationCommandInteraction, CommandDataOptionValue},
                message_component::MessageComponentInteraction,
                modal::ModalSubmitInteraction,
                Interaction as Incoming,
            },
        },
        event::{Event, GuildMemberRemoveEvent, InteractionCreateEvent, MessageCreateEvent, ReadyEvent},
        guild::Member,
    },
};
use tickets_core::{message, ComponentEvent};
use tokio::sync::OnceCell;

use crate::platform::discord::{to_transcript, Interaction, InteractionReply};
use crate::platform::Reply;
use crate::{log_error, log_warn};
use controller::{ChannelRequest, OpenRequest, TicketLifecycleController, PANEL_MODAL_PREFIX};
use permissions::Invoker;
use welcome::CLOSE_TICKET_ID;

pub const OPEN_TICKET_PREFIX: &str = "open_ticket_";
pub const SELECT_PANEL_ID: &str = "select_panel";

/// What a component or modal custom id asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Button of a single-panel message.
    Open(String),
    /// Select menu of a multi-panel message; the panel is the selected value.
    Select,
    Close,
    /// Submitted question form of a panel.
    Form(String),
}

pub fn parse_custom_id(custom_id: &str) -> Option<Action> {
    if custom_id == CLOSE_TICKET_ID {
        Some(Action::Close)
    } else if custom_id == SELECT_PANEL_ID {
        Some(Action::Select)
    } else if let Some(panel) = custom_id.strip_prefix(OPEN_TICKET_PREFIX).filter(|p| !p.is_empty()) {
        Some(Action::Open(panel.to_string()))
    } else {
        custom_id.strip_prefix(PANEL_MODAL_PREFIX)
            .filter(|p| !p.is_empty())
            .map(|p| Action::Form(p.to_string()))
    }
}

fn invoker(member: &Member) -> Invoker {
    Invoker {
        user_id: member.user.id.0,
        username: member.user.name.clone(),
        roles: member.roles.iter().map(|r| r.0).collect(),
        administrator: member.permissions.map(|p| p.administrator()).unwrap_or(false),
    }
}

/// The gateway side of the tickets: turns Discord events into controller calls.
///
/// The controller needs the REST handle of the client, which only exists once the client is
/// built with this component registered, so it is attached afterward. Events received before
/// that are ignored.
#[derive(Default)]
pub struct Tickets {
    controller: OnceCell<Arc<TicketLifecycleController>>,
}

#[async_trait]
impl ComponentEvent for Tickets {
    async fn event(&self, ctx: &Context, event: &Event) {
        let ctl = match self.controller.get() {
            Some(ctl) => ctl.as_ref(),
            None => return,
        };
        match event {
            Event::Ready(ReadyEvent { ready, .. }) => self.register_commands(ctx, ready.guilds.iter().map(|g| g.id)).await,
            Event::InteractionCreate(InteractionCreateEvent { interaction, .. }) => match interaction {
                Incoming::MessageComponent(i) => Self::on_component(ctl, ctx, i).await,
                Incoming::ModalSubmit(i) => Self::on_modal(ctl, ctx, i).await,
                Incoming::ApplicationCommand(i) => Self::on_command(ctl, ctx, i).await,
                _ => (),
            },
            Event::MessageCreate(MessageCreateEvent { message, .. }) if message.guild_id.is_some() => {
                if let Err(e) = ctl.record_message(message.channel_id.0, to_transcript(message)).await {
                    log_warn!("Could not track message {} of channel {}: {}", message.id, message.channel_id, e);
                }
            }
            Event::GuildMemberRemove(GuildMemberRemoveEvent { guild_id, user, .. }) => {
                if let Err(e) = ctl.on_member_leave(guild_id.0, user.id.0).await {
                    log_error!("Could not close the tickets of {} leaving {}: {}", user.id, guild_id, e);
                }
            }
            _ => (),
        }
    }
}

impl Tickets {
    pub fn new() -> Self {
        Self { controller: OnceCell::new() }
    }

    pub fn attach(&self, controller: Arc<TicketLifecycleController>) {
        if self.controller.set(controller).is_err() {
            log_warn!("Tickets controller attached twice, keeping the first one");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.controller.initialized()
    }

    async fn register_commands(&self, ctx: &Context, guilds: impl Iterator<Item = serenity::model::id::GuildId>) {
        for guild_id in guilds {
            let res = guild_id.set_application_commands(&ctx.http, |cmds| {
                cmds.create_application_command(|c| {
                    c.name("add").description("Add a member to this ticket").create_option(|o| {
                        o.name("user").description("Member to add").kind(CommandOptionType::User).required(true)
                    })
                })
                .create_application_command(|c| {
                    c.name("remove").description("Remove a member from this ticket").create_option(|o| {
                        o.name("user").description("Member to remove").kind(CommandOptionType::User).required(true)
                    })
                })
            }).await;
            if let Err(e) = res {
                log_error!("Could not register the ticket commands in guild {}: {}", guild_id, e);
            }
        }
    }

    async fn on_component(ctl: &TicketLifecycleController, ctx: &Context, i: &MessageComponentInteraction) {
        let (guild_id, member) = match (i.guild_id, i.member.as_ref()) {
            (Some(guild_id), Some(member)) => (guild_id.0, invoker(member)),
            _ => return,
        };
        let channel_id = i.channel_id.0;
        let action = match parse_custom_id(&i.data.custom_id) {
            Some(action) => action,
            None => return,
        };
        let reply = InteractionReply::new(ctx.http.clone(), Interaction::Component(i.clone()));
        let panel_id = match action {
            Action::Open(panel_id) => panel_id,
            Action::Select => match i.data.values.first() {
                Some(panel_id) => panel_id.clone(),
                None => {
                    if let Err(e) = reply.send(message::error("No panel selected.").set_ephemeral(true)).await {
                        log_warn!("Could not answer the interaction: {}", e);
                    }
                    return;
                }
            },
            Action::Close => {
                let req = ChannelRequest { guild_id, channel_id, invoker: member };
                if let Err(e) = ctl.close_ticket(req, &reply).await {
                    log_warn!("Close of channel {} failed: {}", channel_id, e);
                }
                return;
            }
            Action::Form(_) => return,
        };
        Self::open(ctl, guild_id, panel_id, member, None, &reply).await;
    }

    async fn on_modal(ctl: &TicketLifecycleController, ctx: &Context, i: &ModalSubmitInteraction) {
        let (guild_id, member) = match (i.guild_id, i.member.as_ref()) {
            (Some(guild_id), Some(member)) => (guild_id.0, invoker(member)),
            _ => return,
        };
        let panel_id = match parse_custom_id(&i.data.custom_id) {
            Some(Action::Form(panel_id)) => panel_id,
            _ => return,
        };
        let answers = i.data.components.iter()
            .flat_map(|row| row.components.iter())
            .filter_map(|c| match c {
                ActionRowComponent::InputText(input) => Some(input.value.clone()),
                _ => None,
            })
            .collect();
        let reply = InteractionReply::new(ctx.http.clone(), Interaction::Modal(i.clone()));
        Self::open(ctl, guild_id, panel_id, member, Some(answers), &reply).await;
    }

    async fn open(ctl: &TicketLifecycleController, guild_id: u64, panel_id: String, invoker: Invoker, answers: Option<Vec<String>>, reply: &dyn Reply) {
        let user_id = invoker.user_id;
        let req = OpenRequest { guild_id, panel_id, invoker, answers };
        if let Err(e) = ctl.open_ticket(req, reply).await {
            log_warn!("Ticket opening for {} failed: {}", user_id, e);
        }
    }

    async fn on_command(ctl: &TicketLifecycleController, ctx: &Context, i: &ApplicationCommandInteraction) {
        let (guild_id, member) = match (i.guild_id, i.member.as_ref()) {
            (Some(guild_id), Some(member)) => (guild_id.0, invoker(member)),
            _ => return,
        };
        let adding = match i.data.name.as_str() {
            "add" => true,
            "remove" => false,
            _ => return,
        };
        let reply = InteractionReply::new(ctx.http.clone(), Interaction::Command(i.clone()));
        let target = i.data.options.first().and_then(|o| match &o.resolved {
            Some(CommandDataOptionValue::User(user, _)) => Some(user.id.0),
            _ => None,
        });
        let target = match target {
            Some(target) => target,
            None => {
                if let Err(e) = reply.send(message::error("No user specified.").set_ephemeral(true)).await {
                    log_warn!("Could not answer the interaction: {}", e);
                }
                return;
            }
        };
        let req = ChannelRequest { guild_id, channel_id: i.channel_id.0, invoker: member };
        let res = if adding {
            ctl.add_member(req, target, &reply).await
        } else {
            ctl.remove_member(req, target, &reply).await
        };
        if let Err(e) = res {
            log_warn!("/{} in channel {} failed: {}", i.data.name, i.channel_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_ids() {
        assert_eq!(parse_custom_id("open_ticket_64f0c2"), Some(Action::Open("64f0c2".to_string())));
        assert_eq!(parse_custom_id("select_panel"), Some(Action::Select));
        assert_eq!(parse_custom_id("close_ticket"), Some(Action::Close));
        assert_eq!(parse_custom_id("panel_modal_64f0c2"), Some(Action::Form("64f0c2".to_string())));
    }

    #[test]
    fn unknown_custom_ids() {
        assert_eq!(parse_custom_id("open_ticket_"), None);
        assert_eq!(parse_custom_id("panel_modal_"), None);
        assert_eq!(parse_custom_id("role_menu"), None);
        assert_eq!(parse_custom_id(""), None);
    }

    #[tokio::test]
    async fn controller_is_attached_once() {
        let h = crate::tests::Harness::new().await;
        let tickets = Tickets::new();
        assert!(!tickets.is_attached());
        let first = Arc::clone(&h.controller);
        tickets.attach(Arc::clone(&first));
        tickets.attach(Arc::clone(&h.controller));
        assert!(tickets.is_attached());
        assert!(Arc::ptr_eq(tickets.controller.get().unwrap(), &first));
    }
}
