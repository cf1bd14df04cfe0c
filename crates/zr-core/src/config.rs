//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for server, storage, auth, tools, encoding and jobs. Every
//! section defaults sensibly so a completely empty `{}` file is valid.
//!
//! The configuration is loaded once at startup and shared immutably behind an
//! `Arc`; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Environment variable that overrides `auth.jwt_secret`.
pub const JWT_SECRET_ENV: &str = "ZOOMREEL_JWT_SECRET";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub tools: ToolsConfig,
    pub encoding: EncodingParameters,
    pub jobs: JobsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Apply environment overrides on top of the file configuration.
    pub fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                self.auth.jwt_secret = Some(secret);
            }
        }
    }

    /// Base address used to build public asset URLs, without a trailing slash.
    pub fn public_base_url(&self) -> String {
        match self.server.public_base_url {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.server.port),
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if let Some(ref url) = self.server.public_base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(format!(
                    "server.public_base_url '{url}' is not an http(s) URL"
                ));
            }
        }

        if self.jobs.max_concurrent == 0 {
            warnings.push("jobs.max_concurrent is 0; it will be treated as 1".into());
        }

        if self.encoding.crf > 51 {
            warnings.push(format!(
                "encoding.crf {} is outside the x264 range 0..=51",
                self.encoding.crf
            ));
        }

        match self.auth.jwt_secret {
            Some(ref secret) if secret.len() < 32 => {
                warnings.push("auth.jwt_secret is shorter than 32 characters".into());
            }
            None => warnings.push(format!(
                "auth.jwt_secret is not set (nor {JWT_SECRET_ENV}); a random secret will be \
                 generated and tokens will not survive a restart"
            )),
            _ => {}
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Address clients use to reach this server, e.g. `https://cdn.example.com`.
    pub public_base_url: Option<String>,
    pub db_path: PathBuf,
    /// Maximum accepted request body for `/ai-generate` uploads.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            public_base_url: None,
            db_path: PathBuf::from("./data/zoomreel.db"),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

/// Locations of the staged-input and generated-output directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    pub outputs_dir: PathBuf,
    /// Leave staged inputs on disk after their job finishes.
    pub keep_staged_inputs: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("./uploads"),
            outputs_dir: PathBuf::from("./outputs"),
            keep_staged_inputs: false,
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens.
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: u64,
    /// Require a valid token on `POST /ai-generate`.
    pub require_for_generate: bool,
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_secs: 3600,
            require_for_generate: false,
            bcrypt_cost: 12,
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

/// Fixed parameter set for the zoom-pan render.
///
/// Every generated video shares these values; only the input image differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingParameters {
    /// Seconds the still image is looped on the input side.
    pub loop_secs: u32,
    pub frame_rate: u32,
    pub width: u32,
    pub height: u32,
    /// Zoom increment applied per output frame.
    pub zoom_step: f64,
    /// Upper bound for the zoom factor.
    pub zoom_max: f64,
    /// Number of frames the zoompan filter spans.
    pub zoom_frames: u32,
    pub duration_secs: u32,
    pub pixel_format: String,
    pub movflags: String,
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
}

impl Default for EncodingParameters {
    fn default() -> Self {
        Self {
            loop_secs: 8,
            frame_rate: 30,
            width: 1280,
            height: 720,
            zoom_step: 0.0009,
            zoom_max: 1.20,
            zoom_frames: 240,
            duration_secs: 8,
            pixel_format: "yuv420p".into(),
            movflags: "+faststart".into(),
            video_codec: "libx264".into(),
            preset: "veryslow".into(),
            crf: 18,
        }
    }
}

impl EncodingParameters {
    /// Zoom factor expression evaluated by the zoompan filter per frame.
    pub fn zoom_expression(&self) -> String {
        format!("min(zoom+{},{})", self.zoom_step, two_decimals_min(self.zoom_max))
    }

    /// Full `-vf` filter chain: scale to the output size, then zoom-pan.
    pub fn video_filter(&self) -> String {
        format!(
            "scale={w}:{h},zoompan=z='{z}':d={d}:s={w}x{h}",
            w = self.width,
            h = self.height,
            z = self.zoom_expression(),
            d = self.zoom_frames,
        )
    }
}

/// Shortest exact rendering of `v`, padded to at least two decimals.
fn two_decimals_min(v: f64) -> String {
    let s = v.to_string();
    match s.split_once('.') {
        Some((_, frac)) if frac.len() >= 2 => s,
        _ => format!("{v:.2}"),
    }
}

/// Worker pool and remote fetch limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Encodes allowed to run at the same time.
    pub max_concurrent: usize,
    /// Jobs allowed to wait for a free slot; beyond this new jobs are rejected.
    pub max_queued: usize,
    pub timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub max_fetch_bytes: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 2,
            max_queued: 8,
            timeout_secs: 300,
            fetch_timeout_secs: 30,
            max_fetch_bytes: 25 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = Config::default();
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.storage.uploads_dir, PathBuf::from("./uploads"));
        assert_eq!(cfg.storage.outputs_dir, PathBuf::from("./outputs"));
        assert_eq!(cfg.auth.token_ttl_secs, 3600);
        assert!(!cfg.auth.require_for_generate);
        assert_eq!(cfg.jobs.max_concurrent, 2);
    }

    #[test]
    fn default_encoding_parameters() {
        let p = EncodingParameters::default();
        assert_eq!(p.loop_secs, 8);
        assert_eq!(p.frame_rate, 30);
        assert_eq!((p.width, p.height), (1280, 720));
        assert_eq!(p.duration_secs, 8);
        assert_eq!(p.pixel_format, "yuv420p");
        assert_eq!(p.movflags, "+faststart");
        assert_eq!(p.preset, "veryslow");
        assert_eq!(p.crf, 18);
    }

    #[test]
    fn video_filter_matches_zoompan_contract() {
        let p = EncodingParameters::default();
        assert_eq!(
            p.video_filter(),
            "scale=1280:720,zoompan=z='min(zoom+0.0009,1.20)':d=240:s=1280x720"
        );
    }

    #[test]
    fn zoom_cap_is_not_rounded() {
        let mut p = EncodingParameters::default();
        p.zoom_max = 1.255;
        p.zoom_step = 0.00125;
        assert_eq!(p.zoom_expression(), "min(zoom+0.00125,1.255)");

        p.zoom_max = 2.0;
        assert_eq!(p.zoom_expression(), "min(zoom+0.00125,2.00)");
    }

    #[test]
    fn parse_json_config() {
        let json = r#"{"server": {"port": 9090}, "jobs": {"max_concurrent": 4}}"#;
        let cfg = Config::from_json(json).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.jobs.max_concurrent, 4);
        assert_eq!(cfg.jobs.max_queued, 8);
    }

    #[test]
    fn parse_empty_json_uses_defaults() {
        let cfg = Config::from_json("{}").unwrap();
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.encoding, EncodingParameters::default());
    }

    #[test]
    fn parse_invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_with_none() {
        let cfg = Config::load_or_default(None);
        assert_eq!(cfg.server.port, 5000);
    }

    #[test]
    fn load_or_default_with_missing_file() {
        let cfg = Config::load_or_default(Some(Path::new("/nonexistent/zoomreel.json")));
        assert_eq!(cfg.server.port, 5000);
    }

    #[test]
    fn public_base_url_defaults_to_localhost() {
        let cfg = Config::default();
        assert_eq!(cfg.public_base_url(), "http://localhost:5000");
    }

    #[test]
    fn public_base_url_strips_trailing_slash() {
        let mut cfg = Config::default();
        cfg.server.public_base_url = Some("https://media.example.com/".into());
        assert_eq!(cfg.public_base_url(), "https://media.example.com");
    }

    #[test]
    fn missing_secret_warns() {
        let cfg = Config::default();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("jwt_secret")));
    }

    #[test]
    fn configured_secret_no_warnings() {
        let mut cfg = Config::default();
        cfg.auth.jwt_secret = Some("x".repeat(48));
        assert!(cfg.validate().is_empty(), "{:?}", cfg.validate());
    }

    #[test]
    fn out_of_range_crf_warns() {
        let mut cfg = Config::default();
        cfg.auth.jwt_secret = Some("x".repeat(48));
        cfg.encoding.crf = 60;
        assert!(cfg.validate().iter().any(|w| w.contains("crf")));
    }
}
