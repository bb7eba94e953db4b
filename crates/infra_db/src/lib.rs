//! Infrastructure Database Layer
//!
//! This crate provides the durable claim store: claims, their append-only
//! audit log, and the history of workflow runs, kept in SQLite via SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. [`ClaimsRepository`] owns the SQL
//! and speaks in row types; [`SqliteClaimStore`] adapts it to the
//! `domain_claims::ClaimStore` port.
//!
//! # Guarantees
//!
//! - A status change and its audit entry commit together or not at all.
//! - The audit log rejects UPDATE and DELETE at the database level.
//! - The schema script is idempotent and applied once per store.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, SqliteClaimStore};
//!
//! let store = SqliteClaimStore::connect(DatabaseConfig::new("sqlite://data/claims.db")).await?;
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;
pub mod schema;

pub use adapters::SqliteClaimStore;
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, DatabaseConfig, DatabasePool};
pub use repositories::ClaimsRepository;
pub use schema::apply_schema;
