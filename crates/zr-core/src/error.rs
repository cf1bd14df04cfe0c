//! Unified error type for zoomreel.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`]
//! and a client-safe message via [`Error::public_message`].

/// Unified error type covering all failure modes in zoomreel.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "account").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A remote image could not be fetched or staged.
    #[error("Upstream fetch error: {0}")]
    UpstreamFetch(String),

    /// The encoding engine failed to produce an output asset.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The worker pool is saturated and the job was not admitted.
    #[error("Busy: {0}")]
    Busy(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg) returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    ///
    /// Duplicate accounts are reported as 400, matching the register contract.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Unauthorized(_) => 401,
            Error::Validation(_) => 400,
            Error::Conflict(_) => 400,
            Error::UpstreamFetch(_) => 500,
            Error::Encoding(_) => 500,
            Error::Busy(_) => 503,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Tool { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Message that is safe to return to a client.
    ///
    /// Client-caused errors echo their own text. Server-side failures map to
    /// fixed strings so that filesystem paths and tool output never leak.
    pub fn public_message(&self) -> String {
        match self {
            Error::Unauthorized(msg)
            | Error::Validation(msg)
            | Error::Conflict(msg)
            | Error::Busy(msg) => msg.clone(),
            Error::NotFound { entity, .. } => format!("{entity} not found"),
            Error::UpstreamFetch(_) => "Failed to fetch image".into(),
            Error::Encoding(_) => "Video generation failed".into(),
            Error::Database { .. } | Error::Io { .. } | Error::Tool { .. } | Error::Internal(_) => {
                "Server error".into()
            }
        }
    }

    /// Short machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Unauthorized(_) => "unauthorized",
            Error::Validation(_) => "validation_error",
            Error::Conflict(_) => "conflict",
            Error::UpstreamFetch(_) => "upstream_fetch_error",
            Error::Encoding(_) => "encoding_error",
            Error::Busy(_) => "busy",
            Error::Database { .. } => "database_error",
            Error::Io { .. } => "io_error",
            Error::Tool { .. } => "tool_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
