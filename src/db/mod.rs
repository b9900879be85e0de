use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::info;

use crate::domain::events::StoreEvent;
use crate::domain::search::{SearchRecord, Source};
use crate::domain::{Identity, StoreError};

pub mod migrator;
pub mod repositories;

pub use repositories::user::User;

/// Default bound for the compact recent-history view.
pub const DEFAULT_RECENT_LIMIT: u64 = 5;
/// Default bound for the full history view.
pub const DEFAULT_LIST_LIMIT: u64 = 20;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    event_tx: broadcast::Sender<StoreEvent>,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1, 64).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
        event_buffer: usize,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        let (event_tx, _) = broadcast::channel(event_buffer);

        Ok(Self { conn, event_tx })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Subscribe to store change events. Every insert and delete is
    /// published here, tagged with the owning user id.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.event_tx.subscribe()
    }

    fn search_repo(&self) -> repositories::search::SearchRepository {
        repositories::search::SearchRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    // ========== Search Records ==========

    /// Up to `limit` most recent records owned by the identity. An absent
    /// identity yields an empty list rather than an error, so views can
    /// render a signed-out state.
    pub async fn list_recent(
        &self,
        identity: Option<Identity>,
        limit: u64,
    ) -> Result<Vec<SearchRecord>, StoreError> {
        let Some(identity) = identity else {
            return Ok(Vec::new());
        };

        Ok(self
            .search_repo()
            .list_for_owner(identity.value(), limit)
            .await?)
    }

    /// Same ordering as [`Self::list_recent`] with a larger bound, for the
    /// full history view.
    pub async fn list_all(
        &self,
        identity: Option<Identity>,
        limit: u64,
    ) -> Result<Vec<SearchRecord>, StoreError> {
        let Some(identity) = identity else {
            return Ok(Vec::new());
        };

        Ok(self
            .search_repo()
            .list_for_owner(identity.value(), limit)
            .await?)
    }

    /// Insert a completed search for the identity and publish
    /// `SearchSaved`. Returns the new record id.
    pub async fn insert_search(
        &self,
        identity: Option<Identity>,
        query: &str,
        response: &str,
        sources: &[Source],
    ) -> Result<i32, StoreError> {
        let Some(identity) = identity else {
            return Err(StoreError::Unauthenticated);
        };

        let record_id = self
            .search_repo()
            .insert(identity.value(), query, response, sources)
            .await?;

        let _ = self.event_tx.send(StoreEvent::SearchSaved {
            owner_id: identity.value(),
            record_id,
        });

        Ok(record_id)
    }

    /// Delete one of the identity's records and publish `SearchDeleted`.
    ///
    /// A record that does not exist and a record owned by another user
    /// both yield `NotFound`; callers cannot probe for other users' ids.
    pub async fn delete_search(
        &self,
        identity: Option<Identity>,
        record_id: i32,
    ) -> Result<(), StoreError> {
        let Some(identity) = identity else {
            return Err(StoreError::Unauthenticated);
        };

        let deleted = self
            .search_repo()
            .delete(identity.value(), record_id)
            .await?;

        if !deleted {
            return Err(StoreError::NotFound);
        }

        let _ = self.event_tx.send(StoreEvent::SearchDeleted {
            owner_id: identity.value(),
            record_id,
        });

        Ok(())
    }

    // ========== User Repository Methods ==========

    pub async fn get_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<repositories::user::User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<repositories::user::User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn update_user_password(
        &self,
        username: &str,
        new_password: &str,
        config: &crate::config::SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(username, new_password, config)
            .await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<repositories::user::User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn get_user_api_key(&self, username: &str) -> Result<Option<String>> {
        self.user_repo().get_api_key(username).await
    }

    pub async fn regenerate_user_api_key(&self, username: &str) -> Result<String> {
        self.user_repo().regenerate_api_key(username).await
    }
}
