use rusqlite::ErrorCode;
use thiserror::Error;

/// All errors that can occur in assetmerge-core.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    AssetNotFound(i64),

    #[error("Location not found: {0}")]
    LocationNotFound(i64),

    #[error("Missing table in asset store schema: {0}")]
    MissingTable(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl AssetError {
    /// Whether this error means the store itself is unusable, as opposed to
    /// a data-integrity problem confined to the records being touched.
    pub fn is_fatal(&self) -> bool {
        match self {
            AssetError::MissingTable(_) | AssetError::Io(_) => true,
            AssetError::Database(err) => is_fatal_sqlite(err),
            _ => false,
        }
    }
}

fn is_fatal_sqlite(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let missing_table = message
                .as_deref()
                .is_some_and(|m| m.starts_with("no such table"));
            missing_table
                || matches!(
                    failure.code,
                    ErrorCode::CannotOpen
                        | ErrorCode::NotADatabase
                        | ErrorCode::DatabaseCorrupt
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::DiskFull
                        | ErrorCode::PermissionDenied
                        | ErrorCode::OutOfMemory
                )
        }
        rusqlite::Error::InvalidPath(_) => true,
        _ => false,
    }
}

/// Process exit codes used by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    GroupErrors = 2,
}

pub type Result<T> = std::result::Result<T, AssetError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::os::raw::c_int, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            Some(message.to_string()),
        )
    }

    #[test]
    fn constraint_violation_is_recoverable() {
        let err = AssetError::from(sqlite_failure(
            rusqlite::ffi::SQLITE_CONSTRAINT,
            "FOREIGN KEY constraint failed",
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn missing_table_is_fatal() {
        let err = AssetError::from(sqlite_failure(
            rusqlite::ffi::SQLITE_ERROR,
            "no such table: inventory_levels",
        ));
        assert!(err.is_fatal());
        assert!(AssetError::MissingTable("allocations".into()).is_fatal());
    }

    #[test]
    fn cannot_open_is_fatal() {
        let err = AssetError::from(sqlite_failure(rusqlite::ffi::SQLITE_CANTOPEN, "unable to open"));
        assert!(err.is_fatal());
    }

    #[test]
    fn not_found_is_recoverable() {
        assert!(!AssetError::AssetNotFound(7).is_fatal());
        assert!(!AssetError::LocationNotFound(3).is_fatal());
    }

    #[test]
    fn exit_codes_match_the_cli_contract() {
        assert_eq!(ExitCode::Success as i32, 0);
        assert_eq!(ExitCode::GeneralError as i32, 1);
        assert_eq!(ExitCode::GroupErrors as i32, 2);
    }
}
