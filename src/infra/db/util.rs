use sqlx::error::DatabaseError;

use crate::application::repos::RepoError;

mod sqlstate {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const FOREIGN_KEY_VIOLATION: &str = "23503";
    pub const CHECK_VIOLATION: &str = "23514";
    pub const NOT_NULL_VIOLATION: &str = "23502";
    pub const INVALID_TEXT_REPRESENTATION: &str = "22P02";
    pub const STRING_DATA_RIGHT_TRUNCATION: &str = "22001";
    pub const QUERY_CANCELED: &str = "57014";
}

/// Classify a sqlx failure by its Postgres SQLSTATE.
pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => map_database_error(db.as_ref()),
        other => RepoError::from_persistence(other),
    }
}

fn map_database_error(db: &dyn DatabaseError) -> RepoError {
    let code = db.code();
    match code.as_deref() {
        Some(sqlstate::UNIQUE_VIOLATION) => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        Some(
            sqlstate::FOREIGN_KEY_VIOLATION
            | sqlstate::INVALID_TEXT_REPRESENTATION
            | sqlstate::STRING_DATA_RIGHT_TRUNCATION,
        ) => RepoError::InvalidInput {
            message: db.message().to_string(),
        },
        Some(sqlstate::CHECK_VIOLATION | sqlstate::NOT_NULL_VIOLATION) => RepoError::Integrity {
            message: db.message().to_string(),
        },
        Some(sqlstate::QUERY_CANCELED) => RepoError::Timeout,
        _ => RepoError::from_persistence(db.message()),
    }
}
