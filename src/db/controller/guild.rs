//! Guild ticket policies.
//!
//! No caching here: a caller needing a stable view over many lookups keeps its own cache.

use sea_orm::{sea_query::OnConflict, DbConn, EntityTrait, Set};

use crate::db::{model::guild::{self, GuildConfig}, timed, to_db, STORE_TIMEOUT};
use crate::error::Result;

#[derive(Clone)]
pub struct GuildConfigProvider {
    db: DbConn,
}

impl GuildConfigProvider {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// Stored policy of the guild, or the default one when the guild has none.
    pub async fn get(&self, guild_id: u64) -> Result<GuildConfig> {
        let model = timed(
            "guild config lookup",
            STORE_TIMEOUT,
            guild::Entity::find_by_id(to_db(guild_id)).one(&self.db),
        ).await?;
        Ok(model.map(|m| m.config).unwrap_or_default())
    }

    pub async fn save(&self, guild_id: u64, config: GuildConfig) -> Result<()> {
        let active_model = guild::ActiveModel {
            guild_id: Set(to_db(guild_id)),
            config: Set(config),
        };
        timed(
            "guild config save",
            STORE_TIMEOUT,
            guild::Entity::insert(active_model)
                .on_conflict(
                    OnConflict::column(guild::Column::GuildId)
                        .update_column(guild::Column::Config)
                        .to_owned()
                )
                .exec(&self.db),
        ).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::model::guild::Threshold;
    use crate::tests::memory_db;

    #[tokio::test]
    async fn unknown_guild_gets_default() {
        let provider = GuildConfigProvider::new(memory_db().await);
        assert_eq!(provider.get(42).await.unwrap(), GuildConfig::default());
    }

    #[tokio::test]
    async fn save_then_overwrite() {
        let provider = GuildConfigProvider::new(memory_db().await);
        let mut config = GuildConfig { max_tickets_per_user: 2, transcript_channel_id: Some(9), ..Default::default() };
        provider.save(42, config.clone()).await.unwrap();
        assert_eq!(provider.get(42).await.unwrap(), config);

        config.auto_close.enabled = true;
        config.auto_close.since_last_response = Threshold::minutes(60);
        provider.save(42, config.clone()).await.unwrap();
        assert_eq!(provider.get(42).await.unwrap(), config);
        assert_eq!(provider.get(43).await.unwrap(), GuildConfig::default());
    }
}
