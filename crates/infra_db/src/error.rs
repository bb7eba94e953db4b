//! Database error types
//!
//! This module defines the error types that can occur during database operations,
//! and how they surface through the store port as [`PortError`]s.

use core_kernel::PortError;
use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint or trigger rejected the write
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The row changed underneath us, or the status change is not allowed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The database is locked by another writer
    #[error("Database busy: {0}")]
    Busy(String),

    /// Schema application failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be mapped back to a domain type
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Pool exhaustion - no available connections
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Generic SQL error
    #[error("SQL error: {0}")]
    SqlError(#[source] sqlx::Error),
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    ///
    /// # Example
    ///
    /// ```rust
    /// use infra_db::DatabaseError;
    ///
    /// let error = DatabaseError::not_found("Claim", "CLM-0000ABCD");
    /// assert!(error.to_string().contains("CLM-0000ABCD"));
    /// ```
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound(format!("{} with id '{}' not found", entity, id))
    }

    pub fn serialization(column: &str, detail: impl std::fmt::Display) -> Self {
        DatabaseError::SerializationError(format!("column {column}: {detail}"))
    }

    /// Checks if this error indicates a record was not found
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// Busy or unreachable database; worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted | DatabaseError::Busy(_)
        )
    }
}

/// Maps SQLx errors onto the variants above using SQLite's extended result codes
///
/// <https://www.sqlite.org/rescode.html>
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::PoolClosed => DatabaseError::ConnectionFailed("pool closed".to_string()),
            sqlx::Error::Io(e) => DatabaseError::ConnectionFailed(e.to_string()),
            sqlx::Error::Migrate(e) => DatabaseError::MigrationFailed(e.to_string()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.code().as_deref() {
                    Some("2067") | Some("1555") => DatabaseError::DuplicateEntry(message),
                    Some("787") => DatabaseError::ForeignKeyViolation(message),
                    Some("275") | Some("1811") | Some("19") => DatabaseError::ConstraintViolation(message),
                    Some("5") | Some("261") | Some("517") | Some("6") => DatabaseError::Busy(message),
                    _ => DatabaseError::QueryFailed(message),
                }
            }
            other => DatabaseError::SqlError(other),
        }
    }
}

/// How store failures look to the orchestrator
impl From<DatabaseError> for PortError {
    fn from(error: DatabaseError) -> Self {
        match error {
            DatabaseError::NotFound(message) => PortError::NotFound {
                entity_type: "Claim".to_string(),
                id: message,
            },
            DatabaseError::Conflict(message) => PortError::conflict(message),
            DatabaseError::DuplicateEntry(message) => PortError::conflict(message),
            DatabaseError::ConstraintViolation(message)
            | DatabaseError::ForeignKeyViolation(message) => PortError::validation(message),
            DatabaseError::Busy(message) | DatabaseError::ConnectionFailed(message) => {
                PortError::connection(message)
            }
            DatabaseError::PoolExhausted => PortError::ServiceUnavailable {
                service: "claim store".to_string(),
            },
            DatabaseError::SerializationError(message) => PortError::transformation(message),
            other => PortError::Internal {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let error = DatabaseError::from(sqlx::Error::RowNotFound);
        assert!(error.is_not_found());
        assert!(PortError::from(error).is_not_found());
    }

    #[test]
    fn test_conflict_stays_a_conflict() {
        let port: PortError = DatabaseError::Conflict("already processing".into()).into();
        assert!(port.is_conflict());
    }

    #[test]
    fn test_busy_is_transient() {
        let error = DatabaseError::Busy("database is locked".into());
        assert!(error.is_transient());
        assert!(PortError::from(error).is_transient());
    }
}
