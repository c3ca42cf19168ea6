use std::{
    future::Future,
    str::FromStr,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use anyhow::Context;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode},
    PgPool, Row,
};
use tracing::{error, info};

use crate::config::{AppConfig, RuntimeMode};

pub const MAX_CONNECTIONS: u32 = 20;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: PgPool,
}

impl Database {
    /// Builds the pool without opening a connection; the first query does.
    pub fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        // Production databases are reached over TLS without certificate checks.
        let ssl_mode = match config.mode {
            RuntimeMode::Production => PgSslMode::Require,
            RuntimeMode::Development => PgSslMode::Disable,
        };
        let options = PgConnectOptions::from_str(&config.database_url)
            .context("parse DATABASE_URL")?
            .ssl_mode(ssl_mode);
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .idle_timeout(IDLE_TIMEOUT)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);
        Ok(Self { pool })
    }

    /// Runs `sql` with `$1..$n` bound from `params` and returns every row.
    pub async fn execute<'q>(&self, sql: &'q str, params: &[&'q str]) -> anyhow::Result<Vec<PgRow>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }
        query
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("execute `{}`", compact_sql(sql)))
    }

    /// Creates the users table if needed and returns how many rows it holds.
    pub async fn init_schema(&self) -> anyhow::Result<i64> {
        self.execute(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                username VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL
            )
            "#,
            &[],
        )
        .await?;

        let rows = self.execute("SELECT COUNT(*) AS count FROM users", &[]).await?;
        let count = match rows.first() {
            Some(row) => row.try_get::<i64, _>("count")?,
            None => 0,
        };
        Ok(count)
    }
}

fn compact_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tracks whether the schema has been initialized. Concurrent callers may
/// both run the init before the flag flips; the init must be idempotent.
#[derive(Debug, Default)]
pub struct SchemaGate {
    ready: AtomicBool,
}

impl SchemaGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Runs `init` unless a previous call succeeded. Failures are logged and
    /// leave the gate closed so the next caller retries.
    pub async fn ensure<F, Fut>(&self, init: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<i64>>,
    {
        if self.is_ready() {
            return;
        }
        match init().await {
            Ok(count) => {
                info!(users = count, "users table ready");
                self.ready.store(true, Ordering::Release);
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "initializing database failed");
            }
        }
    }
}
