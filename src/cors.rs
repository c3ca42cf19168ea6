use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use regex::Regex;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::ApiError;

/// Origins a browser client may call from when nothing is configured.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    r"/^http://localhost:\d+$/",
    r"/^http://127\.0\.0\.1:\d+$/",
    "https://yourgame.com",
    "https://www.yourgamesite.com",
    "https://*.itch.io",
    "https://*.unity3dusercontent.com",
    "http://localhost:8080",
    "http://localhost:3000",
    "null",
];

/// One or more DNS labels, substituted for each `*` in a wildcard rule.
const WILDCARD_LABELS: &str = r"[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*";

pub const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(86_400);

lazy_static! {
    static ref DEFAULT_POLICY: OriginPolicy =
        OriginPolicy::parse_rules(DEFAULT_ALLOWED_ORIGINS).unwrap();
}

/// A single allow-list entry.
#[derive(Debug, Clone)]
pub enum OriginRule {
    Exact(String),
    Pattern(Regex),
}

impl OriginRule {
    /// `/re/` is a regular expression, anything with `*` is a host wildcard,
    /// everything else must match exactly.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let raw = raw.trim();
        if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
            let inner = &raw[1..raw.len() - 1];
            let re = Regex::new(&format!("^(?:{inner})$"))
                .with_context(|| format!("invalid origin pattern {raw}"))?;
            return Ok(OriginRule::Pattern(re));
        }
        if raw.starts_with('/') {
            anyhow::bail!("unterminated origin pattern {raw}");
        }
        if raw.contains('*') {
            let body = raw
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(WILDCARD_LABELS);
            let re = Regex::new(&format!("^{body}$"))
                .with_context(|| format!("invalid origin wildcard {raw}"))?;
            return Ok(OriginRule::Pattern(re));
        }
        Ok(OriginRule::Exact(raw.to_string()))
    }

    pub fn matches(&self, origin: &str) -> bool {
        match self {
            OriginRule::Exact(allowed) => allowed == origin,
            OriginRule::Pattern(re) => re.is_match(origin),
        }
    }
}

/// Ordered allow-list; the first matching rule grants access.
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    rules: Vec<OriginRule>,
}

impl Default for OriginPolicy {
    fn default() -> Self {
        DEFAULT_POLICY.clone()
    }
}

impl OriginPolicy {
    pub fn new(rules: Vec<OriginRule>) -> Self {
        Self { rules }
    }

    pub fn parse_rules(raw: &[&str]) -> anyhow::Result<Self> {
        let rules = raw
            .iter()
            .map(|r| OriginRule::parse(r))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    /// Comma separated list, as read from `CORS_ALLOWED_ORIGINS`. Commas
    /// inside a `/.../` pattern belong to the pattern.
    pub fn parse_list(list: &str) -> anyhow::Result<Self> {
        let raw = split_rules(list);
        let raw: Vec<&str> = raw.iter().map(String::as_str).collect();
        Self::parse_rules(&raw)
    }

    pub fn rules(&self) -> &[OriginRule] {
        &self.rules
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(origin))
    }
}

fn split_rules(list: &str) -> Vec<String> {
    let mut rules = Vec::new();
    let mut current = String::new();
    for piece in list.split(',') {
        if !current.is_empty() {
            current.push(',');
        }
        current.push_str(piece);
        let rule = current.trim();
        let open_pattern = rule.starts_with('/') && (rule.len() < 2 || !rule.ends_with('/'));
        if !open_pattern {
            if !rule.is_empty() {
                rules.push(rule.to_string());
            }
            current.clear();
        }
    }
    // An unterminated pattern is kept so parsing reports it.
    let rest = current.trim();
    if !rest.is_empty() {
        rules.push(rest.to_string());
    }
    rules
}

/// Response annotation for granted origins. Requests without an `Origin`
/// header pass through with no `Access-Control-Allow-Origin`, and any
/// `OPTIONS` request is answered here without reaching the router.
pub fn cors_layer(policy: Arc<OriginPolicy>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin.to_str().map(|o| policy.allows(o)).unwrap_or(false)
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([
            header::CONTENT_LENGTH,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(false)
        .max_age(PREFLIGHT_MAX_AGE)
}

/// Halts requests whose declared origin is not on the allow-list.
pub async fn reject_disallowed_origin(
    State(policy): State<Arc<OriginPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(origin) = req.headers().get(header::ORIGIN) {
        let allowed = origin.to_str().map(|o| policy.allows(o)).unwrap_or(false);
        if !allowed {
            warn!(origin = ?origin, method = %req.method(), "blocked by CORS");
            return ApiError::OriginRejected.into_response();
        }
    }
    next.run(req).await
}
