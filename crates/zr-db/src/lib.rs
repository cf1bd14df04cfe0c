//! zr-db: account persistence.
//!
//! SQLite-backed storage with connection pooling, embedded migrations,
//! typed models and query functions.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

pub use pool::{DbPool, PooledConnection};
