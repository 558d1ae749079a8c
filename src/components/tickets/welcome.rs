//! Messages posted by the ticket flows.

use chrono::{DateTime, Utc};
use tickets_core::message::{Button, ButtonStyle, Colour, Embed, Message, COLOR_BLURPLE};

use super::permissions::Invoker;
use crate::db::model::{ticket, transcript::Metadata};
use crate::platform::panel::Panel;

pub const CLOSE_TICKET_ID: &str = "close_ticket";
/// Embed field values are limited to 1024 characters.
const MAX_FIELD_LEN: usize = 1024;
const MAX_FIELD_NAME_LEN: usize = 256;

/// `#RRGGBB` to a colour. Unreadable or black colours fall back on blurple.
pub fn parse_color(color: &str) -> Colour {
    let hex = color.trim().trim_start_matches('#');
    match u32::from_str_radix(hex, 16) {
        Ok(0) | Err(_) => COLOR_BLURPLE,
        Ok(v) => Colour(v),
    }
}

fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn close_button() -> Button {
    Button {
        custom_id: CLOSE_TICKET_ID.to_string(),
        label: "Close Ticket".to_string(),
        style: ButtonStyle::Danger,
        emoji: Some('🔒'),
    }
}

/// First message of a ticket: mentions, the panel welcome embed, the answers to the panel
/// questions and the close button.
pub fn welcome_message(opener: &Invoker, panel: &Panel, answers: &[(String, String)]) -> Message {
    let mut embed = match &panel.welcome_embed {
        Some(custom) => {
            let description = match &custom.description {
                Some(d) if !d.is_empty() => d.clone(),
                _ => format!("Welcome {}! A staff member will assist you shortly.", opener.mention()),
            };
            let mut embed = Embed::new()
                .color(parse_color(&custom.color))
                .description(description);
            embed.title = custom.title.clone();
            embed.image = custom.large_img_url.clone();
            embed.thumbnail = custom.small_img_url.clone();
            if let Some(text) = &custom.footer_text {
                embed = embed.footer(text, custom.footer_img_url.clone());
            }
            embed
        }
        None => Embed::new()
            .title("Ticket Created")
            .description(format!("Hello {}! Thank you for creating a ticket. A staff member will assist you shortly.", opener.mention()))
            .color(COLOR_BLURPLE),
    };
    for (question, answer) in answers {
        let answer = if answer.trim().is_empty() { "*No answer*" } else { answer.as_str() };
        embed = embed.field(clip(question, MAX_FIELD_NAME_LEN), clip(answer, MAX_FIELD_LEN), false);
    }

    let mentions = std::iter::once(opener.mention())
        .chain(panel.mention_on_open.iter().map(|r| format!("<@&{}>", r)))
        .collect::<Vec<_>>()
        .join(" ");
    Message::with_text(mentions)
        .add_embed(embed)
        .add_button(close_button())
}

/// `Hh Mm`, or `Mm` under an hour.
pub fn format_duration(duration: chrono::Duration) -> String {
    let hours = duration.num_hours();
    let minutes = duration.num_minutes() % 60;
    if hours == 0 {
        format!("{}m", minutes)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

fn discord_time(at: DateTime<Utc>) -> String {
    format!("<t:{}:F>", at.timestamp())
}

/// Summary posted in the transcript channel when a ticket closes.
pub fn transcript_summary(ticket: &ticket::Model, opener_name: &str, metadata: &Metadata) -> Message {
    let closed_at = metadata.closed_at.unwrap_or(metadata.opened_at);
    let closed_by = match &metadata.closed_by {
        Some(by) => format!("{} (<@{}>)", by.username, by.id),
        None => "Unknown".to_string(),
    };
    let mut embed = Embed::new()
        .title(format!("Ticket Transcript - {}", opener_name))
        .description(format!("Ticket for <@{}> has been closed.", ticket.user_id))
        .color(COLOR_BLURPLE)
        .field("Ticket ID", ticket.id, true)
        .field("Opened At", discord_time(metadata.opened_at), true)
        .field("Closed At", discord_time(closed_at), true)
        .field("Duration", format_duration(closed_at - metadata.opened_at), true)
        .field("Closed By", closed_by, true)
        .field("Total Messages", metadata.total_messages, true)
        .field("Total Attachments", metadata.total_attachments, true)
        .field("Total Embeds", metadata.total_embeds, true)
        .field("Participants", metadata.participants.len(), true);
    let participants = metadata.participants
        .iter()
        .map(|p| format!("<@{}>", p.id))
        .collect::<Vec<_>>()
        .join(", ");
    if !participants.is_empty() && participants.len() < MAX_FIELD_LEN {
        embed = embed.field("All Participants", participants, false);
    }
    Message::new().add_embed(embed.footer("View full transcript on the dashboard", None))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::db::model::transcript::{ClosedBy, Participant};
    use crate::platform::panel::WelcomeEmbed;

    fn opener() -> Invoker {
        Invoker { user_id: 7, username: "opener".into(), roles: vec![], administrator: false }
    }

    #[test]
    fn colors() {
        assert_eq!(parse_color("#ff0000"), Colour(0xFF0000));
        assert_eq!(parse_color("00ff00"), Colour(0x00FF00));
        assert_eq!(parse_color("#000000"), COLOR_BLURPLE);
        assert_eq!(parse_color("not a color"), COLOR_BLURPLE);
        assert_eq!(parse_color(""), COLOR_BLURPLE);
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::minutes(42)), "42m");
        assert_eq!(format_duration(Duration::minutes(125)), "2h 5m");
    }

    #[test]
    fn default_welcome() {
        let panel = Panel { mention_on_open: vec![30, 31], ..Default::default() };
        let msg = welcome_message(&opener(), &panel, &[]);
        assert_eq!(msg.content, "<@7> <@&30> <@&31>");
        let embed = msg.last_embed().unwrap();
        assert_eq!(embed.title.as_deref(), Some("Ticket Created"));
        assert_eq!(embed.color, Some(COLOR_BLURPLE));
        assert_eq!(msg.buttons, vec![close_button()]);
    }

    #[test]
    fn custom_welcome_with_answers() {
        let panel = Panel {
            welcome_embed: Some(WelcomeEmbed {
                color: "#123456".into(),
                title: Some("Support".into()),
                footer_text: Some("Thanks".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let answers = vec![("Order number?".to_string(), "1234".to_string()), ("Details?".to_string(), " ".to_string())];
        let msg = welcome_message(&opener(), &panel, &answers);
        let embed = msg.last_embed().unwrap();
        assert_eq!(embed.title.as_deref(), Some("Support"));
        assert_eq!(embed.color, Some(Colour(0x123456)));
        assert_eq!(embed.description.as_deref(), Some("Welcome <@7>! A staff member will assist you shortly."));
        assert_eq!(embed.field_value("Order number?"), Some("1234"));
        assert_eq!(embed.field_value("Details?"), Some("*No answer*"));
        assert_eq!(embed.footer.as_ref().map(|f| f.text.as_str()), Some("Thanks"));
    }

    #[test]
    fn summary_fields() {
        let opened = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let ticket = ticket::Model {
            id: 3,
            guild_id: 1,
            channel_id: 100,
            user_id: 7,
            panel_id: "p".into(),
            created_at: opened,
            last_message_at: opened,
            closed: false,
        };
        let metadata = Metadata {
            opened_at: opened,
            closed_at: Some(opened + Duration::minutes(95)),
            closed_by: Some(ClosedBy { id: 99, username: "staff".into() }),
            total_messages: 4,
            total_attachments: 1,
            total_embeds: 0,
            participants: vec![
                Participant { id: 7, username: "opener".into(), message_count: 3 },
                Participant { id: 99, username: "staff".into(), message_count: 1 },
            ],
        };
        let msg = transcript_summary(&ticket, "opener", &metadata);
        let embed = msg.last_embed().unwrap();
        assert_eq!(embed.title.as_deref(), Some("Ticket Transcript - opener"));
        assert_eq!(embed.field_value("Duration"), Some("1h 35m"));
        assert_eq!(embed.field_value("Closed By"), Some("staff (<@99>)"));
        assert_eq!(embed.field_value("Total Messages"), Some("4"));
        assert_eq!(embed.field_value("Participants"), Some("2"));
        assert_eq!(embed.field_value("All Participants"), Some("<@7>, <@99>"));
        assert_eq!(embed.field_value("Opened At"), Some(format!("<t:{}:F>", opened.timestamp()).as_str()));
    }
}
