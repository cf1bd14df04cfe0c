//! Database query modules.

pub mod accounts;
