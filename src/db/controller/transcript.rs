//! Transcript capture.
//!
//! Messages are appended while the ticket lives and reconciled with the channel history when it
//! closes. The metadata is recomputed from the message list on every write.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbConn, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::clock::Clock;
use crate::db::{
    model::{
        guild::GuildConfig,
        ticket,
        transcript::{self, ClosedBy, Messages, Metadata, TranscriptMessage},
    },
    timed, IDType, STORE_TIMEOUT,
};
use crate::error::Result;
use crate::{log_info, log_warn};

#[derive(Clone)]
pub struct TranscriptRecorder {
    db: DbConn,
    clock: Arc<dyn Clock>,
}

async fn find<C: ConnectionTrait>(db: &C, ticket_id: IDType) -> std::result::Result<Option<transcript::Model>, sea_orm::DbErr> {
    transcript::Entity::find()
        .filter(transcript::Column::TicketId.eq(ticket_id))
        .one(db)
        .await
}

impl TranscriptRecorder {
    pub fn new(db: DbConn, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Starts an empty transcript for the ticket, if the guild archives transcripts.
    pub async fn init(&self, ticket: &ticket::Model, username: &str, config: &GuildConfig) -> Result<Option<transcript::Model>> {
        if config.transcript_channel_id.is_none() {
            return Ok(None);
        }
        let now = self.clock.now();
        let active_model = transcript::ActiveModel {
            ticket_id: Set(ticket.id),
            guild_id: Set(ticket.guild_id),
            channel_id: Set(ticket.channel_id),
            user_id: Set(ticket.user_id),
            username: Set(username.to_string()),
            panel_id: Set(ticket.panel_id.clone()),
            messages: Set(Messages::default()),
            metadata: Set(Metadata::opened(ticket.created_at)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = timed("transcript init", STORE_TIMEOUT, active_model.insert(&self.db)).await?;
        log_info!("Transcript started for ticket {}", ticket.id);
        Ok(Some(model))
    }

    pub async fn get(&self, ticket_id: IDType) -> Result<Option<transcript::Model>> {
        timed("transcript lookup", STORE_TIMEOUT, find(&self.db, ticket_id)).await
    }

    /// Adds a live message. Returns `false` when the ticket has no transcript or the message is
    /// already captured.
    pub async fn append(&self, ticket_id: IDType, message: TranscriptMessage) -> Result<bool> {
        let now = self.clock.now();
        timed("transcript append", STORE_TIMEOUT, async {
            let txn = self.db.begin().await?;
            let model = match find(&txn, ticket_id).await? {
                Some(model) => model,
                None => return Ok(false),
            };
            let mut messages = model.messages.clone();
            if !messages.push_unique(message) {
                return Ok(false);
            }
            let metadata = Metadata::compute(
                &messages,
                model.metadata.opened_at,
                model.metadata.closed_at,
                model.metadata.closed_by.clone(),
            );
            let mut active_model: transcript::ActiveModel = model.into();
            active_model.messages = Set(messages);
            active_model.metadata = Set(metadata);
            active_model.updated_at = Set(now);
            active_model.update(&txn).await?;
            txn.commit().await?;
            Ok::<_, sea_orm::DbErr>(true)
        }).await
    }

    /// Completes the transcript with `history` (oldest first) and stamps the close.
    ///
    /// Messages of `history` already captured are skipped. The recomputed metadata is written
    /// together with the reconciled messages and returned. `None` when the ticket has no transcript.
    pub async fn finalize(&self, ticket_id: IDType, closed_by: ClosedBy, history: Vec<TranscriptMessage>) -> Result<Option<transcript::Model>> {
        let now = self.clock.now();
        timed("transcript finalize", STORE_TIMEOUT, async {
            let txn = self.db.begin().await?;
            let model = match find(&txn, ticket_id).await? {
                Some(model) => model,
                None => return Ok(None),
            };
            let mut messages = model.messages.clone();
            let added = messages.reconcile(history);
            let metadata = Metadata::compute(&messages, model.metadata.opened_at, Some(now), Some(closed_by));
            let mut active_model: transcript::ActiveModel = model.into();
            active_model.messages = Set(messages);
            active_model.metadata = Set(metadata);
            active_model.updated_at = Set(now);
            let model = active_model.update(&txn).await?;
            txn.commit().await?;
            if added > 0 {
                log_warn!("{} message(s) of ticket {} were missing from its transcript", added, ticket_id);
            }
            log_info!("Transcript of ticket {} finalized with {} message(s)", ticket_id, model.metadata.total_messages);
            Ok::<_, sea_orm::DbErr>(Some(model))
        }).await
    }
}
