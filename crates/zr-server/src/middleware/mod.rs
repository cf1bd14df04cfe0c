//! HTTP middleware: request ID and token guard.

pub mod auth;
pub mod request_id;
