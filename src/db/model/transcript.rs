//! Transcript of a ticket: the captured messages and the summary derived from them.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::db::IDType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transcript")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: IDType,
    #[sea_orm(unique)]
    pub ticket_id: IDType,
    pub guild_id: IDType,
    pub channel_id: IDType,
    pub user_id: IDType,
    pub username: String,
    pub panel_id: String,
    #[sea_orm(column_type = "Json")]
    pub messages: Messages,
    #[sea_orm(column_type = "Json")]
    pub metadata: Metadata,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel
{}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde_as(as = "DisplayFromStr")]
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde_as(as = "DisplayFromStr")]
    pub id: u64,
    pub filename: String,
    pub url: String,
    pub size: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub count: u64,
}

/// A captured message. `id` is the platform message id.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    #[serde_as(as = "DisplayFromStr")]
    pub id: u64,
    pub author: Author,
    #[serde(default)]
    pub content: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

/// Ordered captured messages, without two entries sharing an id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Messages(pub Vec<TranscriptMessage>);

impl Messages {
    pub fn contains(&self, id: u64) -> bool {
        self.0.iter().any(|m| m.id == id)
    }
    /// Appends the message unless a message with the same id was already captured.
    pub fn push_unique(&mut self, message: TranscriptMessage) -> bool {
        if self.contains(message.id) {
            return false;
        }
        self.0.push(message);
        true
    }
    /// Appends, in order, every message of `history` not captured yet. Returns how many were added.
    pub fn reconcile<I: IntoIterator<Item = TranscriptMessage>>(&mut self, history: I) -> usize {
        history.into_iter().filter(|m| self.push_unique(m.clone())).count()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedBy {
    #[serde_as(as = "DisplayFromStr")]
    pub id: u64,
    pub username: String,
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde_as(as = "DisplayFromStr")]
    pub id: u64,
    pub username: String,
    pub message_count: u64,
}

/// Summary of a transcript. Always recomputed from the messages, never edited in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub opened_at: DateTime<Utc>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_by: Option<ClosedBy>,
    pub total_messages: u64,
    pub total_attachments: u64,
    pub total_embeds: u64,
    /// One entry per author, in order of first message.
    pub participants: Vec<Participant>,
}

impl Metadata {
    /// Metadata of a transcript that has not captured anything yet.
    pub fn opened(opened_at: DateTime<Utc>) -> Self {
        Self::compute(&Messages::default(), opened_at, None, None)
    }

    pub fn compute(
        messages: &Messages,
        opened_at: DateTime<Utc>,
        closed_at: Option<DateTime<Utc>>,
        closed_by: Option<ClosedBy>,
    ) -> Self {
        let mut participants: Vec<Participant> = Vec::new();
        for message in &messages.0 {
            match participants.iter_mut().find(|p| p.id == message.author.id) {
                Some(p) => p.message_count += 1,
                None => participants.push(Participant {
                    id: message.author.id,
                    username: message.author.username.clone(),
                    message_count: 1,
                }),
            }
        }
        Self {
            opened_at,
            closed_at,
            closed_by,
            total_messages: messages.len() as u64,
            total_attachments: messages.0.iter().map(|m| m.attachments.len() as u64).sum(),
            total_embeds: messages.0.iter().map(|m| m.embeds.len() as u64).sum(),
            participants,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;

    use super::*;

    pub fn message(id: u64, author: u64, attachments: usize, embeds: usize) -> TranscriptMessage {
        TranscriptMessage {
            id,
            author: Author { id: author, username: format!("user{}", author), bot: false },
            content: Some(format!("message {}", id)),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            embeds: vec![Embed::default(); embeds],
            attachments: (0..attachments)
                .map(|i| Attachment {
                    id: id * 100 + i as u64,
                    filename: format!("file{}.png", i),
                    url: format!("https://cdn.example/{}/{}", id, i),
                    size: 10,
                    content_type: None,
                })
                .collect(),
            reactions: Vec::new(),
            edited: false,
            edited_at: None,
        }
    }

    #[test]
    fn metadata_is_derived_from_messages() {
        let messages = Messages(vec![
            message(1, 10, 2, 0),
            message(2, 20, 0, 1),
            message(3, 10, 1, 3),
            message(4, 30, 0, 0),
            message(5, 10, 0, 0),
        ]);
        let opened = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let meta = Metadata::compute(&messages, opened, None, None);
        assert_eq!(meta.total_messages, 5);
        assert_eq!(meta.total_attachments, 3);
        assert_eq!(meta.total_embeds, 4);
        let counts: Vec<(u64, u64)> = meta.participants.iter().map(|p| (p.id, p.message_count)).collect();
        assert_eq!(counts, vec![(10, 3), (20, 1), (30, 1)]);
    }

    #[test]
    fn reconcile_skips_captured_ids() {
        let mut messages = Messages(vec![message(1, 10, 0, 0), message(2, 20, 0, 0)]);
        assert!(!messages.push_unique(message(2, 20, 0, 0)));
        let added = messages.reconcile(vec![message(1, 10, 0, 0), message(2, 20, 0, 0), message(3, 10, 0, 0)]);
        assert_eq!(added, 1);
        let ids: Vec<u64> = messages.0.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn snowflakes_are_strings() {
        let json = serde_json::to_value(message(7, 42, 0, 0)).unwrap();
        assert_eq!(json["id"], "7");
        assert_eq!(json["author"]["id"], "42");
    }
}
