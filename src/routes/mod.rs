use crate::error::ApiError;

pub mod meta;

/// Fallback for unknown paths and unsupported methods on known ones.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
