//! Platform-neutral messages.
//!
//! The bot describes what it wants to send with [`Message`] and only converts it into serenity
//! builders at the REST boundary.

use serenity::builder::{
    CreateComponents, CreateEmbed, CreateInteractionResponseData, CreateMessage,
    EditInteractionResponse,
};
use serenity::model::application::component::ButtonStyle as SerenityButtonStyle;
use serenity::model::channel::ReactionType;
pub use serenity::utils::Colour;

pub const COLOR_INFO: Colour = Colour(0x00C9FF);
pub const COLOR_SUCCESS: Colour = Colour(0x1ed760);
pub const COLOR_ERROR: Colour = Colour(0xFF0000);
pub const COLOR_WARN: Colour = Colour(0xFFB800);
pub const COLOR_BLURPLE: Colour = Colour(0x5865F2);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<Colour>,
    pub fields: Vec<EmbedField>,
    pub image: Option<String>,
    pub thumbnail: Option<String>,
    pub footer: Option<EmbedFooter>,
}

impl Embed {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn title<S: ToString>(mut self, title: S) -> Self {
        self.title = Some(title.to_string());
        self
    }
    pub fn description<S: ToString>(mut self, description: S) -> Self {
        self.description = Some(description.to_string());
        self
    }
    pub fn color<C: Into<Colour>>(mut self, color: C) -> Self {
        self.color = Some(color.into());
        self
    }
    pub fn field<N: ToString, V: ToString>(mut self, name: N, value: V, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.to_string(),
            value: value.to_string(),
            inline,
        });
        self
    }
    pub fn footer<S: ToString>(mut self, text: S, icon_url: Option<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.to_string(), icon_url });
        self
    }
    /// Value of the first field named `name`.
    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.value.as_str())
    }
}

impl From<&Embed> for CreateEmbed {
    fn from(embed: &Embed) -> Self {
        let mut res = CreateEmbed::default();
        if let Some(title) = &embed.title {
            res.title(title);
        }
        if let Some(description) = &embed.description {
            res.description(description);
        }
        if let Some(color) = embed.color {
            res.color(color);
        }
        for field in &embed.fields {
            res.field(&field.name, &field.value, field.inline);
        }
        if let Some(image) = &embed.image {
            res.image(image);
        }
        if let Some(thumbnail) = &embed.thumbnail {
            res.thumbnail(thumbnail);
        }
        if let Some(footer) = &embed.footer {
            res.footer(|f| {
                f.text(&footer.text);
                if let Some(icon) = &footer.icon_url {
                    f.icon_url(icon);
                }
                f
            });
        }
        res
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

impl From<ButtonStyle> for SerenityButtonStyle {
    fn from(style: ButtonStyle) -> Self {
        match style {
            ButtonStyle::Primary => SerenityButtonStyle::Primary,
            ButtonStyle::Secondary => SerenityButtonStyle::Secondary,
            ButtonStyle::Success => SerenityButtonStyle::Success,
            ButtonStyle::Danger => SerenityButtonStyle::Danger,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
    pub emoji: Option<char>,
}

/// Message to send, whatever the way it is sent (channel message, interaction response or edit).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub content: String,
    pub embeds: Vec<Embed>,
    pub buttons: Vec<Button>,
    pub ephemeral: bool,
}

impl Message {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn with_text<S: ToString>(content: S) -> Self {
        Message {
            content: content.to_string(),
            ..Default::default()
        }
    }
    pub fn set_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }
    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }
    pub fn add_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }
    pub fn last_embed(&self) -> Option<&Embed> {
        self.embeds.last()
    }
    /// Text of the message, falling back on the description of the first embed.
    pub fn text(&self) -> &str {
        if !self.content.is_empty() {
            return &self.content;
        }
        self.embeds
            .first()
            .and_then(|e| e.description.as_deref())
            .unwrap_or_default()
    }

    fn create_embeds(&self) -> Vec<CreateEmbed> {
        self.embeds.iter().map(CreateEmbed::from).collect()
    }
    fn build_components<'b>(&self, comps: &'b mut CreateComponents) -> &'b mut CreateComponents {
        if self.buttons.is_empty() {
            return comps;
        }
        comps.create_action_row(|row| {
            for button in &self.buttons {
                row.create_button(|b| {
                    b.custom_id(&button.custom_id)
                        .label(&button.label)
                        .style(button.style.into());
                    if let Some(emoji) = button.emoji {
                        b.emoji(ReactionType::from(emoji));
                    }
                    b
                });
            }
            row
        })
    }
    /// Fill a channel message builder.
    pub fn build_message<'a, 'b>(&self, msg: &'b mut CreateMessage<'a>) -> &'b mut CreateMessage<'a> {
        if !self.content.is_empty() {
            msg.content(&self.content);
        }
        msg.add_embeds(self.create_embeds());
        if !self.buttons.is_empty() {
            msg.components(|c| self.build_components(c));
        }
        msg
    }
    /// Fill the data of an interaction response.
    pub fn build_response_data<'a, 'b>(&self, data: &'b mut CreateInteractionResponseData<'a>) -> &'b mut CreateInteractionResponseData<'a> {
        data.content(&self.content)
            .set_embeds(self.create_embeds())
            .ephemeral(self.ephemeral);
        if !self.buttons.is_empty() {
            data.components(|c| self.build_components(c));
        }
        data
    }
}

impl From<&Message> for EditInteractionResponse {
    fn from(message: &Message) -> Self {
        let mut response = Self::default();
        response.content(&message.content);
        response.set_embeds(message.create_embeds());
        if !message.buttons.is_empty() {
            response.components(|c| message.build_components(c));
        }
        response
    }
}

/// Error message
pub fn error<S: ToString>(error_message: S) -> Message {
    custom_embed("Error", error_message, COLOR_ERROR)
}
/// Warning message
pub fn warn<S: ToString>(warn_message: S) -> Message {
    custom_embed("Warning", warn_message, COLOR_WARN)
}
/// Success message
pub fn success<S: ToString>(success_message: S) -> Message {
    custom_embed("Done", success_message, COLOR_SUCCESS)
}
/// Information message
pub fn info<S: ToString>(info_message: S) -> Message {
    custom_embed("Information", info_message, COLOR_INFO)
}
/// Single embed message
pub fn custom_embed<S1, S2, C>(title: S1, message: S2, color: C) -> Message
    where
    S1: ToString,
    S2: ToString,
    C: Into<Colour>
{
    Message::new().add_embed(Embed::new().title(title).description(message).color(color))
}
