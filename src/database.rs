//! database (db) union structure.
use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;

use crate::AppState;
use crate::config::{Backend, Database as DatabaseConfig};
use crate::user::error::{IdentityError, Result};
use crate::user::{InMemoryUserStore, MongoUserStore, UserStore};

/// Custom db structure to pass to Axum.
#[derive(Clone)]
pub struct Database {
    pub store: Arc<dyn UserStore>,
    health_timeout: Duration,
}

impl Database {
    /// Init the configured store.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let store: Arc<dyn UserStore> = match config.backend {
            Backend::Mongo => {
                let store =
                    MongoUserStore::new(&config.address, &config.name).await?;
                tracing::info!(db = %config.name, "mongodb connected");
                Arc::new(store)
            },
            Backend::Memory => {
                tracing::warn!("using in-memory store, data is not persisted");
                Arc::new(InMemoryUserStore::new())
            },
        };

        Ok(Self::from_store(
            store,
            Duration::from_secs(config.health_timeout_secs),
        ))
    }

    /// Wrap an existing store.
    pub fn from_store(store: Arc<dyn UserStore>, health_timeout: Duration) -> Self {
        Self {
            store,
            health_timeout,
        }
    }

    /// Ping the store, giving up after the health timeout.
    pub async fn ping(&self) -> Result<()> {
        match tokio::time::timeout(self.health_timeout, self.store.ping()).await {
            Ok(result) => result,
            Err(elapsed) => {
                tracing::error!(timeout = ?self.health_timeout, "database ping timed out");
                Err(IdentityError::persistence(elapsed))
            },
        }
    }
}

impl FromRef<AppState> for Database {
    fn from_ref(app_state: &AppState) -> Database {
        app_state.db.clone()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::user::User;
    use crate::user::error::ErrorKind;

    /// Store whose ping never answers.
    struct StalledStore;

    #[async_trait]
    impl UserStore for StalledStore {
        async fn create(&self, user: User) -> Result<User> {
            Ok(user)
        }

        async fn get_by_id(&self, _: &str) -> Result<User> {
            Err(IdentityError::NotFound)
        }

        async fn get_by_email(&self, _: &str) -> Result<User> {
            Err(IdentityError::NotFound)
        }

        async fn update(&self, _: User) -> Result<User> {
            Err(IdentityError::NotFound)
        }

        async fn update_token(&self, _: User) -> Result<User> {
            Err(IdentityError::NotFound)
        }

        async fn soft_delete(&self, _: &str) -> Result<()> {
            Err(IdentityError::NotFound)
        }

        async fn hard_delete(&self, _: &str) -> Result<()> {
            Err(IdentityError::NothingDeleted)
        }

        async fn ping(&self) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let config = DatabaseConfig {
            backend: Backend::Memory,
            ..Default::default()
        };
        let db = Database::new(&config).await.unwrap();

        assert!(db.ping().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_timeout() {
        let db = Database::from_store(Arc::new(StalledStore), Duration::from_secs(10));

        let err = db.ping().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
