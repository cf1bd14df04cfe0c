//! # zr-av
//!
//! External encoder management for zoomreel.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the path to
//!   ffmpeg, honouring a configured override.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout and
//!   cancellation support; the child process is killed when either fires.
//! - **Actions** ([`actions`]) -- the zoom-pan render built from
//!   [`zr_core::config::EncodingParameters`].

pub mod actions;
pub mod command;
pub mod tools;

pub use actions::{render_zoompan, zoompan_args};
pub use command::{ToolCommand, ToolOutput};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
