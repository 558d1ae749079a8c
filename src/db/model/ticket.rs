use sea_orm::entity::prelude::*;
use serenity::model::id::{ChannelId, GuildId, UserId};

use crate::db::{from_db, IDType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ticket")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: IDType,
    pub guild_id: IDType,
    #[sea_orm(unique)]
    pub channel_id: IDType,
    pub user_id: IDType,
    pub panel_id: String,
    pub created_at: DateTimeUtc,
    pub last_message_at: DateTimeUtc,
    pub closed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel
{}

impl Model {
    pub fn guild(&self) -> GuildId {
        GuildId(from_db(self.guild_id))
    }
    pub fn channel(&self) -> ChannelId {
        ChannelId(from_db(self.channel_id))
    }
    pub fn user(&self) -> UserId {
        UserId(from_db(self.user_id))
    }
    /// No one answered since the ticket was opened.
    pub fn never_answered(&self) -> bool {
        self.created_at == self.last_message_at
    }
}
