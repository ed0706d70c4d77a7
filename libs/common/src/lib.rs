//! Shared infrastructure for the portfolio gallery service
//!
//! This crate holds the pieces that are not specific to any one route
//! handler: PostgreSQL connection pooling, the Redis cache used as the
//! session backend, and the database error types.

pub mod cache;
pub mod database;
pub mod error;
