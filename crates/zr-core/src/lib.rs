//! zr-core: shared types, IDs, errors, and configuration.
//!
//! This crate is the foundational dependency for the other zr-* crates,
//! providing type-safe identifiers, a unified error type, the asset data
//! model, and application configuration.

pub mod assets;
pub mod config;
pub mod error;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use assets::*;
pub use error::{Error, Result};
pub use ids::*;
