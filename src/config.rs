use anyhow::Context;

use crate::cors::OriginPolicy;

pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Controls how strictly the database connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Development,
    Production,
}

impl RuntimeMode {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("production") => RuntimeMode::Production,
            _ => RuntimeMode::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bcrypt_cost: u32,
    pub mode: RuntimeMode,
    pub origins: OriginPolicy,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required_var("DATABASE_URL")?;
        let bcrypt_cost = parse_bcrypt_cost(std::env::var("BCRYPT_SALT_ROUNDS").ok().as_deref());
        let mode = RuntimeMode::parse(std::env::var("APP_ENV").ok().as_deref());
        let origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
            Ok(list) if !list.trim().is_empty() => OriginPolicy::parse_list(&list)?,
            _ => OriginPolicy::default(),
        };
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(8080);

        Ok(Self {
            database_url,
            bcrypt_cost,
            mode,
            origins,
            host,
            port,
        })
    }
}

fn required_var(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

/// Falls back to the default cost when the value is absent, non-numeric or
/// outside what bcrypt accepts.
pub fn parse_bcrypt_cost(raw: Option<&str>) -> u32 {
    match raw.and_then(|v| v.trim().parse::<u32>().ok()) {
        Some(cost) if (4..=31).contains(&cost) => cost,
        Some(cost) => {
            tracing::warn!(cost, "bcrypt cost out of range; using default");
            DEFAULT_BCRYPT_COST
        }
        None => DEFAULT_BCRYPT_COST,
    }
}
