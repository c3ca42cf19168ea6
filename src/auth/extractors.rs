use axum::{
    async_trait,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};

use super::dto::Credentials;
use crate::error::ApiError;

/// Reads credentials from a JSON or urlencoded form body. Anything that does
/// not parse yields empty credentials, which the service rejects as missing.
pub struct CredentialsBody(pub Credentials);

#[async_trait]
impl<S> FromRequest<S> for CredentialsBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        let parsed = if is_form {
            Form::<Credentials>::from_request(req, state)
                .await
                .map(|Form(c)| c)
                .ok()
        } else {
            Json::<Credentials>::from_request(req, state)
                .await
                .map(|Json(c)| c)
                .ok()
        };

        Ok(CredentialsBody(parsed.unwrap_or_default()))
    }
}
