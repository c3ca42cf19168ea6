use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginResponse, PublicUser, RegisterResponse},
        extractors::CredentialsBody,
    },
    error::ApiError,
    routes::not_found,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register).fallback(not_found))
        .route("/login", post(login).fallback(not_found))
}

pub fn users_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users).fallback(not_found))
}

#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    CredentialsBody(body): CredentialsBody,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let (username, password) = body.require().ok_or_else(ApiError::missing_credentials)?;
    let user = state.credentials.register(username, password).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user,
        }),
    ))
}

#[instrument(skip(state, body))]
pub async fn login(
    State(state): State<AppState>,
    CredentialsBody(body): CredentialsBody,
) -> Result<Json<LoginResponse>, ApiError> {
    let (username, password) = body.require().ok_or_else(ApiError::missing_credentials)?;
    let user = state.credentials.verify(username, password).await?;
    Ok(Json(LoginResponse {
        message: "Login successful",
        user,
        token: None,
    }))
}

/// Unfiltered and unauthenticated.
#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<PublicUser>>, ApiError> {
    Ok(Json(state.credentials.list().await?))
}
