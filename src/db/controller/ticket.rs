//! Ticket records.
//!
//! Reads that find nothing return `None` or an empty list. Errors only come from the database
//! itself or from an operation exceeding its deadline.

use std::sync::Arc;

use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DbConn, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select, Set,
};

use crate::clock::Clock;
use crate::db::{model::ticket, timed, to_db, SCAN_TIMEOUT, STORE_TIMEOUT};
use crate::error::Result;
use crate::log_info;

/// Data needed to record a freshly opened ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub guild_id: u64,
    pub channel_id: u64,
    pub user_id: u64,
    pub panel_id: String,
}

#[derive(Clone)]
pub struct TicketStore {
    db: DbConn,
    clock: Arc<dyn Clock>,
}

impl TicketStore {
    pub fn new(db: DbConn, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub async fn create(&self, new: NewTicket) -> Result<ticket::Model> {
        let now = self.clock.now();
        let active_model = ticket::ActiveModel {
            guild_id: Set(to_db(new.guild_id)),
            channel_id: Set(to_db(new.channel_id)),
            user_id: Set(to_db(new.user_id)),
            panel_id: Set(new.panel_id),
            created_at: Set(now),
            last_message_at: Set(now),
            closed: Set(false),
            ..Default::default()
        };
        let model = timed("ticket create", STORE_TIMEOUT, active_model.insert(&self.db)).await?;
        log_info!("Ticket {} saved for channel {}", model.id, model.channel_id);
        Ok(model)
    }

    pub async fn get_by_channel(&self, channel_id: u64) -> Result<Option<ticket::Model>> {
        timed(
            "ticket lookup",
            STORE_TIMEOUT,
            ticket::Entity::find()
                .filter(ticket::Column::ChannelId.eq(to_db(channel_id)))
                .one(&self.db),
        ).await
    }

    /// Marks the ticket of the channel as closed.
    ///
    /// Closing twice, or closing a channel without a ticket, is a no-op. Returns whether this
    /// call performed the transition.
    pub async fn close(&self, channel_id: u64) -> Result<bool> {
        let res = timed(
            "ticket close",
            STORE_TIMEOUT,
            ticket::Entity::update_many()
                .col_expr(ticket::Column::Closed, Expr::value(true))
                .filter(ticket::Column::ChannelId.eq(to_db(channel_id)))
                .filter(ticket::Column::Closed.eq(false))
                .exec(&self.db),
        ).await?;
        if res.rows_affected > 0 {
            log_info!("Ticket of channel {} closed", channel_id);
        }
        Ok(res.rows_affected > 0)
    }

    /// Records activity in the channel of an open ticket.
    pub async fn update_last_message(&self, channel_id: u64) -> Result<()> {
        timed(
            "ticket activity update",
            STORE_TIMEOUT,
            ticket::Entity::update_many()
                .col_expr(ticket::Column::LastMessageAt, Expr::value(self.clock.now()))
                .filter(ticket::Column::ChannelId.eq(to_db(channel_id)))
                .filter(ticket::Column::Closed.eq(false))
                .exec(&self.db),
        ).await?;
        Ok(())
    }

    fn active_for_user(guild_id: u64, user_id: u64) -> Select<ticket::Entity> {
        ticket::Entity::find()
            .filter(ticket::Column::GuildId.eq(to_db(guild_id)))
            .filter(ticket::Column::UserId.eq(to_db(user_id)))
            .filter(ticket::Column::Closed.eq(false))
    }

    pub async fn count_active_for_user(&self, guild_id: u64, user_id: u64) -> Result<u64> {
        timed(
            "active tickets count",
            STORE_TIMEOUT,
            Self::active_for_user(guild_id, user_id).count(&self.db),
        ).await
    }

    pub async fn list_active_for_user(&self, guild_id: u64, user_id: u64) -> Result<Vec<ticket::Model>> {
        timed(
            "active tickets list",
            STORE_TIMEOUT,
            Self::active_for_user(guild_id, user_id)
                .order_by_asc(ticket::Column::CreatedAt)
                .all(&self.db),
        ).await
    }

    /// Open tickets untouched for at least `max_age`, oldest activity first, at most `limit` of them.
    pub async fn list_inactive(&self, max_age: chrono::Duration, limit: u64) -> Result<Vec<ticket::Model>> {
        let floor = self.clock.now() - max_age;
        timed(
            "inactive tickets scan",
            SCAN_TIMEOUT,
            ticket::Entity::find()
                .filter(ticket::Column::Closed.eq(false))
                .filter(ticket::Column::LastMessageAt.lt(floor))
                .order_by_asc(ticket::Column::LastMessageAt)
                .limit(limit)
                .all(&self.db),
        ).await
    }
}
