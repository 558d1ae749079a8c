//! Per-guild ticket policy.
//!
//! The configuration is stored as a JSON document written by the dashboard. It is decoded once,
//! here, into [`GuildConfig`]; every field has a default so a partial or missing document still
//! yields a usable policy.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError, DisplayFromStr, VecSkipError};

use crate::db::IDType;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "guild")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub guild_id: IDType,
    #[sea_orm(column_type = "Json")]
    pub config: GuildConfig,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel
{}

/// Ticket policy of a guild.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(rename_all = "camelCase", default)]
pub struct GuildConfig {
    /// Maximum open tickets per user, 0 means unlimited.
    pub max_tickets_per_user: u32,
    pub ticket_permissions: TicketPermissions,
    pub auto_close: AutoClose,
    pub staffs: Staffs,
    #[serde(rename = "ticketTranscript")]
    #[serde_as(deserialize_as = "DefaultOnError<Option<DisplayFromStr>>", serialize_as = "Option<DisplayFromStr>")]
    pub transcript_channel_id: Option<u64>,
}

impl Default for GuildConfig {
    fn default() -> Self {
        Self {
            max_tickets_per_user: 1,
            ticket_permissions: TicketPermissions::default(),
            auto_close: AutoClose::default(),
            staffs: Staffs::default(),
            transcript_channel_id: None,
        }
    }
}

impl GuildConfig {
    /// Whether opening one more ticket stays under the cap.
    pub fn allows_another_ticket(&self, active: u64) -> bool {
        self.max_tickets_per_user == 0 || active < self.max_tickets_per_user as u64
    }
}

/// What the opener may do in their ticket, beyond reading and writing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketPermissions {
    pub attachments: bool,
    pub links: bool,
    pub reactions: bool,
}

impl Default for TicketPermissions {
    fn default() -> Self {
        Self { attachments: true, links: true, reactions: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoClose {
    pub enabled: bool,
    pub close_when_user_leaves: bool,
    pub since_open_without_response: Threshold,
    pub since_last_response: Threshold,
}

/// Delay after which a ticket is considered abandoned.
///
/// The dashboard writes the fields capitalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Threshold {
    #[serde(alias = "days")]
    pub days: u32,
    #[serde(alias = "hours")]
    pub hours: u32,
    #[serde(alias = "minutes")]
    pub minutes: u32,
}

impl Threshold {
    pub fn minutes(minutes: u32) -> Self {
        Self { minutes, ..Default::default() }
    }
    /// `None` when every field is zero, which disables the check.
    pub fn duration(&self) -> Option<chrono::Duration> {
        let total = chrono::Duration::days(self.days as i64)
            + chrono::Duration::hours(self.hours as i64)
            + chrono::Duration::minutes(self.minutes as i64);
        if total.is_zero() {
            None
        } else {
            Some(total)
        }
    }
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Staffs {
    #[serde_as(deserialize_as = "VecSkipError<DisplayFromStr>", serialize_as = "Vec<DisplayFromStr>")]
    pub roles: Vec<u64>,
    #[serde_as(deserialize_as = "VecSkipError<DisplayFromStr>", serialize_as = "Vec<DisplayFromStr>")]
    pub users: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_document_fields_use_defaults() {
        let config: GuildConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, GuildConfig::default());
        assert_eq!(config.max_tickets_per_user, 1);
        assert!(config.ticket_permissions.attachments && config.ticket_permissions.links && config.ticket_permissions.reactions);
        assert!(!config.auto_close.enabled);
        assert_eq!(config.transcript_channel_id, None);
    }

    #[test]
    fn decodes_dashboard_document() {
        let config: GuildConfig = serde_json::from_str(r#"{
            "maxTicketsPerUser": 3,
            "ticketPermissions": { "attachments": false, "links": true, "reactions": false },
            "autoClose": {
                "enabled": true,
                "closeWhenUserLeaves": true,
                "sinceOpenWithoutResponse": { "Days": 0, "Hours": 2, "Minutes": 30 },
                "sinceLastResponse": { "Days": 1, "Hours": 0, "Minutes": 0 }
            },
            "staffs": { "roles": ["111", "not-an-id"], "users": ["222"] },
            "ticketTranscript": "333"
        }"#).unwrap();
        assert_eq!(config.max_tickets_per_user, 3);
        assert!(!config.ticket_permissions.attachments);
        assert!(config.auto_close.close_when_user_leaves);
        assert_eq!(config.auto_close.since_open_without_response.duration(), Some(chrono::Duration::minutes(150)));
        assert_eq!(config.auto_close.since_last_response.duration(), Some(chrono::Duration::days(1)));
        assert_eq!(config.staffs.roles, vec![111]);
        assert_eq!(config.staffs.users, vec![222]);
        assert_eq!(config.transcript_channel_id, Some(333));
    }

    #[test]
    fn thresholds_accept_both_casings() {
        let config: GuildConfig = serde_json::from_str(r#"{
            "autoClose": {
                "enabled": true,
                "sinceOpenWithoutResponse": { "minutes": 45 },
                "sinceLastResponse": { "Days": 0, "Hours": 1, "Minutes": 0 }
            }
        }"#).unwrap();
        assert_eq!(config.auto_close.since_open_without_response.duration(), Some(chrono::Duration::minutes(45)));
        assert_eq!(config.auto_close.since_last_response.duration(), Some(chrono::Duration::hours(1)));

        let stored = serde_json::to_value(&config).unwrap();
        assert_eq!(stored["autoClose"]["sinceLastResponse"]["Hours"], 1);
    }

    #[test]
    fn empty_transcript_channel_is_none() {
        let config: GuildConfig = serde_json::from_str(r#"{"ticketTranscript": ""}"#).unwrap();
        assert_eq!(config.transcript_channel_id, None);
    }

    #[test]
    fn zero_threshold_is_disabled() {
        assert_eq!(Threshold::default().duration(), None);
        assert_eq!(Threshold::minutes(30).duration(), Some(chrono::Duration::minutes(30)));
    }

    #[test]
    fn ticket_cap() {
        let mut config = GuildConfig::default();
        assert!(config.allows_another_ticket(0));
        assert!(!config.allows_another_ticket(1));
        config.max_tickets_per_user = 0;
        assert!(config.allows_another_ticket(50));
    }
}
