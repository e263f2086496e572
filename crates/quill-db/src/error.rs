use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("row not found")]
    NotFound,

    #[error("unique constraint violated")]
    Conflict,

    #[error("database lock poisoned")]
    Poisoned,

    #[error("migration error: {0}")]
    Migration(String),

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::QueryReturnedNoRows = err {
            return DbError::NotFound;
        }

        let extended_code = match &err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
                Some(e.extended_code)
            }
            _ => None,
        };

        match extended_code {
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
            | Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => DbError::Conflict,
            // A referenced user or post vanished between check and write.
            Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => DbError::NotFound,
            _ => DbError::Sqlite(err),
        }
    }
}
