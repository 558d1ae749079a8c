//! Persistence of tickets, guild configurations and transcripts.

pub mod model;
pub mod controller;

use std::{future::Future, time::Duration};

use sea_orm::{
    sea_query::Index, ConnectOptions, ConnectionTrait, Database, DbConn, DbErr, Schema,
    TransactionTrait,
};

use crate::error::{Error, Result};

/// Discord snowflakes are stored as signed integers.
pub type IDType = i64;

/// Deadline of a single store operation.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);
/// Deadline of the inactive tickets scan.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn start_db(url: &str) -> std::result::Result<DbConn, DbErr> {
    let mut options = ConnectOptions::new(url.to_string());
    options.sqlx_logging(false);
    if url.contains(":memory:") {
        // Every pooled connection would get its own empty database.
        options.max_connections(1).min_connections(1);
    }
    let db = Database::connect(options).await?;
    check_tables(&db).await?;
    Ok(db)
}

async fn check_tables(db: &DbConn) -> std::result::Result<(), DbErr> {
    use model::{guild, ticket, transcript};
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let transaction = db.begin().await?;

    transaction.execute(builder.build(schema.create_table_from_entity(ticket::Entity).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(guild::Entity).if_not_exists())).await?;
    transaction.execute(builder.build(schema.create_table_from_entity(transcript::Entity).if_not_exists())).await?;

    transaction.execute(builder.build(
        Index::create()
            .name("idx_ticket_guild_user_closed")
            .table(ticket::Entity)
            .col(ticket::Column::GuildId)
            .col(ticket::Column::UserId)
            .col(ticket::Column::Closed)
            .if_not_exists()
    )).await?;
    transaction.execute(builder.build(
        Index::create()
            .name("idx_ticket_closed_last_message")
            .table(ticket::Entity)
            .col(ticket::Column::Closed)
            .col(ticket::Column::LastMessageAt)
            .if_not_exists()
    )).await?;
    transaction.commit().await?;

    Ok(())
}

/// Runs a store operation under a deadline.
pub(crate) async fn timed<T, F>(op: &'static str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, DbErr>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(Error::from),
        Err(_) => Err(Error::Timeout(op)),
    }
}

/// Converts a snowflake to its stored form.
pub fn to_db(id: u64) -> IDType {
    id as IDType
}

/// Converts a stored snowflake back.
pub fn from_db(id: IDType) -> u64 {
    id as u64
}
