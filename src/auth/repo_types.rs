use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,               // SERIAL, assigned by the database
    pub username: String,      // unique
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash, not exposed in JSON
}
