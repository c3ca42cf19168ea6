use axum::{routing::get, Json, Router};
use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::not_found;
use crate::{error::ApiError, state::AppState};

pub const ENDPOINTS: &[&str] = &["/register", "/login", "/users", "/health", "/unity-test"];

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
    pub endpoints: &'static [&'static str],
    pub cors: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub cors: &'static str,
    pub unity_compatible: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnityTestResponse {
    pub unity_compatible: bool,
    pub timestamp: String,
    pub cors: &'static str,
    pub instructions: &'static str,
}

pub fn meta_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index).fallback(not_found))
        .route("/health", get(health).fallback(not_found))
        .route("/unity-test", get(unity_test).fallback(not_found))
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Unity Game API",
        endpoints: ENDPOINTS,
        cors: "configured",
    })
}

/// Static; does not probe the database.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        database: "Connected",
        cors: "configured",
        unity_compatible: true,
    })
}

pub async fn unity_test() -> Result<Json<UnityTestResponse>, ApiError> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(anyhow::Error::from)?;
    Ok(Json(UnityTestResponse {
        unity_compatible: true,
        timestamp,
        cors: "enabled",
        instructions: "Use UnityWebRequest or WWW class to call this API",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_payload() {
        let Json(res) = health().await;
        let json = serde_json::to_value(res).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "OK",
                "database": "Connected",
                "cors": "configured",
                "unityCompatible": true
            })
        );
    }

    #[tokio::test]
    async fn unity_test_timestamp_is_rfc3339() {
        let Json(res) = unity_test().await.unwrap();
        assert!(res.unity_compatible);
        assert!(OffsetDateTime::parse(&res.timestamp, &Rfc3339).is_ok());
    }
}
