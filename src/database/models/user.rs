use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
}
