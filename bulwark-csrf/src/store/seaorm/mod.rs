//! SQL token store backed by SeaORM.

mod config;
pub mod entity;

pub use config::{DEFAULT_DATABASE_URL, DatabaseConfig};

use super::{TokenRecord, TokenStore};
use crate::error::{CsrfError, Result};
use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, DbErr,
    EntityTrait, NotSet, PaginatorTrait, QueryFilter, Schema, Set,
};
use tracing::{debug, info};

/// Token store over a SeaORM connection pool
#[derive(Debug, Clone)]
pub struct SeaOrmTokenStore {
    conn: DatabaseConnection,
}

impl SeaOrmTokenStore {
    /// Open a pool and, unless disabled, create the `token` table.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        debug!(
            max_connections = config.max_connections,
            in_memory = config.is_sqlite_memory(),
            "Connecting token store"
        );

        let conn = Database::connect(config.to_connect_options()).await?;
        let store = Self::from_connection(conn);

        if config.run_migrations {
            store.migrate().await?;
        }

        info!(
            backend = ?store.conn.get_database_backend(),
            "Token store connected"
        );
        Ok(store)
    }

    /// Wrap an existing connection; no migration is run.
    pub fn from_connection(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Create the `token` table (unique `identifier`) if it does not exist.
    pub async fn migrate(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);
        let mut statement = schema.create_table_from_entity(entity::Entity);
        statement.if_not_exists();

        self.conn.execute(backend.build(&statement)).await?;
        debug!("Token table ready");
        Ok(())
    }

    /// Insert, or overwrite the value of the row already holding `identifier`.
    async fn upsert(&self, identifier: &str, value: &str) -> Result<TokenRecord> {
        let row = entity::ActiveModel {
            id: NotSet,
            identifier: Set(identifier.to_owned()),
            token: Set(value.to_owned()),
        };

        entity::Entity::insert(row)
            .on_conflict(
                OnConflict::column(entity::Column::Identifier)
                    .update_column(entity::Column::Token)
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await?;

        self.find_by_identifier(identifier).await?.ok_or_else(|| {
            CsrfError::StoreUnavailable(format!("token row for '{}' missing after upsert", identifier))
        })
    }
}

#[async_trait]
impl TokenStore for SeaOrmTokenStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<TokenRecord>> {
        let model = entity::Entity::find()
            .filter(entity::Column::Identifier.eq(identifier))
            .one(&self.conn)
            .await?;
        Ok(model.map(TokenRecord::from))
    }

    async fn save(&self, record: TokenRecord) -> Result<TokenRecord> {
        let Some(id) = record.id else {
            return self.upsert(&record.identifier, &record.value).await;
        };

        let row = entity::ActiveModel {
            id: Set(id),
            identifier: Set(record.identifier.clone()),
            token: Set(record.value.clone()),
        };

        match row.update(&self.conn).await {
            Ok(model) => Ok(model.into()),
            // Row gone (or never existed): fall back to insert.
            Err(DbErr::RecordNotUpdated) => self.upsert(&record.identifier, &record.value).await,
            Err(err) => Err(err.into()),
        }
    }

    async fn count(&self) -> Result<usize> {
        let rows = entity::Entity::find().count(&self.conn).await?;
        Ok(rows as usize)
    }

    async fn health_check(&self) -> Result<()> {
        self.conn.ping().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SeaOrmTokenStore {
        SeaOrmTokenStore::connect(&DatabaseConfig::in_memory())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = store().await;
        store.migrate().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_health_check() {
        assert!(store().await.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_update_by_id() {
        let store = store().await;
        let mut record = store.save(TokenRecord::new("a", "t1")).await.unwrap();
        record.value = "t2".to_string();

        let updated = store.save(record.clone()).await.unwrap();
        assert_eq!(updated.id, record.id);
        assert_eq!(updated.value, "t2");
    }
}
