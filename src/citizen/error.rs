use thiserror::Error;

use crate::citizen::validate::ValidationErrors;
use crate::database::DatabaseError;

#[derive(Debug, Error)]
pub enum CitizenError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// Another record already holds this national id
    #[error("A citizen with national id {0} already exists")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}
