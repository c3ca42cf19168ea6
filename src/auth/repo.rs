use anyhow::Context;
use async_trait::async_trait;
use sqlx::FromRow;

use crate::{auth::repo_types::User, db::Database};

/// Storage for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;

    /// Inserts a user. Returns `None` when the username is already taken,
    /// including when a concurrent insert wins the race.
    async fn create(&self, username: &str, password_hash: &str) -> anyhow::Result<Option<User>>;

    /// Every user, ordered by id.
    async fn list(&self) -> anyhow::Result<Vec<User>>;

    /// Idempotent; returns the current row count.
    async fn init_schema(&self) -> anyhow::Result<i64>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: Database,
}

impl PgUserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn rows_to_users(rows: Vec<sqlx::postgres::PgRow>) -> anyhow::Result<Vec<User>> {
        rows.iter()
            .map(|row| User::from_row(row).context("decode user row"))
            .collect()
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let rows = self
            .db
            .execute(
                r#"
                SELECT id, username, password_hash
                FROM users
                WHERE username = $1
                "#,
                &[username],
            )
            .await?;
        Ok(Self::rows_to_users(rows)?.into_iter().next())
    }

    async fn create(&self, username: &str, password_hash: &str) -> anyhow::Result<Option<User>> {
        let rows = self
            .db
            .execute(
                r#"
                INSERT INTO users (username, password_hash)
                VALUES ($1, $2)
                ON CONFLICT (username) DO NOTHING
                RETURNING id, username, password_hash
                "#,
                &[username, password_hash],
            )
            .await?;
        Ok(Self::rows_to_users(rows)?.into_iter().next())
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let rows = self
            .db
            .execute("SELECT id, username, password_hash FROM users ORDER BY id", &[])
            .await?;
        Self::rows_to_users(rows)
    }

    async fn init_schema(&self) -> anyhow::Result<i64> {
        self.db.init_schema().await
    }
}

#[cfg(test)]
pub use memory::MemoryUserStore;

#[cfg(test)]
mod memory {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::{async_trait, User, UserStore};

    /// In-memory store with the same uniqueness rule as the users table.
    #[derive(Default)]
    pub struct MemoryUserStore {
        users: Mutex<Vec<User>>,
        schema_inits: AtomicUsize,
    }

    impl MemoryUserStore {
        pub fn schema_inits(&self) -> usize {
            self.schema_inits.load(Ordering::SeqCst)
        }

        pub fn len(&self) -> usize {
            self.users.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.username == username).cloned())
        }

        async fn create(&self, username: &str, password_hash: &str) -> anyhow::Result<Option<User>> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.username == username) {
                return Ok(None);
            }
            let user = User {
                id: users.len() as i32 + 1,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
            };
            users.push(user.clone());
            Ok(Some(user))
        }

        async fn list(&self) -> anyhow::Result<Vec<User>> {
            Ok(self.users.lock().unwrap().clone())
        }

        async fn init_schema(&self) -> anyhow::Result<i64> {
            self.schema_inits.fetch_add(1, Ordering::SeqCst);
            Ok(self.len() as i64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, RuntimeMode};

    #[tokio::test]
    async fn memory_store_enforces_unique_usernames() {
        let store = MemoryUserStore::default();
        let first = store.create("alice", "h1").await.unwrap().unwrap();
        assert_eq!(first.id, 1);
        assert!(store.create("alice", "h2").await.unwrap().is_none());
        assert_eq!(store.len(), 1);
        let found = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "h1");
    }

    #[tokio::test]
    #[ignore = "requires a Postgres instance in DATABASE_URL"]
    async fn postgres_store_roundtrip() {
        dotenvy::dotenv().ok();
        let config = AppConfig {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            bcrypt_cost: 4,
            mode: RuntimeMode::Development,
            origins: Default::default(),
            host: "127.0.0.1".into(),
            port: 0,
        };
        let store = PgUserStore::new(Database::connect(&config).unwrap());
        store.init_schema().await.unwrap();
        // idempotent
        let before = store.init_schema().await.unwrap();

        let name = format!("it-{}", std::process::id());
        let created = store.create(&name, "hash").await.unwrap().expect("fresh username");
        assert!(store.create(&name, "other").await.unwrap().is_none());
        assert_eq!(store.init_schema().await.unwrap(), before + 1);

        let found = store.find_by_username(&name).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(store.list().await.unwrap().iter().any(|u| u.id == created.id));

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(created.id)
            .execute(&store.db.pool)
            .await
            .unwrap();
    }
}
