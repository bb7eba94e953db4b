//! Route handlers

pub mod claims;
pub mod health;
