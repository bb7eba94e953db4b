//! Domain Adapters
//!
//! Adapter implementations for domain ports, connecting domain interfaces to
//! the SQLite database layer.

pub mod claims;

pub use claims::SqliteClaimStore;
