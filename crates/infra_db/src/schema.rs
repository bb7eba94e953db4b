//! Schema bootstrap
//!
//! The whole schema is one guarded script. Applying it again, or from several
//! stores opening the same file at once, leaves the database unchanged.

use tracing::{debug, instrument};

use crate::error::DatabaseError;
use crate::pool::DatabasePool;

pub const CLAIMS_SCHEMA: &str = include_str!("../migrations/0001_claims.sql");

#[instrument(skip(pool))]
pub async fn apply_schema(pool: &DatabasePool) -> Result<(), DatabaseError> {
    sqlx::raw_sql(CLAIMS_SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
    debug!("claims schema applied");
    Ok(())
}
