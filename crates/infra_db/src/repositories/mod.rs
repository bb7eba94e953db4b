//! Repository implementations
//!
//! Repositories own the SQL. They speak in row types and [`DatabaseError`]s;
//! the adapters in [`crate::adapters`] map those onto the domain ports.
//!
//! [`DatabaseError`]: crate::DatabaseError

pub mod claims;

pub use claims::ClaimsRepository;
