//! Shared test harness for integration tests.
//!
//! [`TestHarness`] builds a full [`AppContext`] on an in-memory DB with asset
//! directories in a temp dir, swaps ffmpeg for a small shell script, and
//! serves the router on a random port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use zr_av::ToolRegistry;
use zr_core::config::Config;
use zr_db::pool::{init_memory_pool, DbPool};
use zr_server::context::AppContext;
use zr_server::router::build_router;

/// Writes a non-empty file at the last argument (the output path).
pub const ENCODER_OK: &str = "for last; do :; done\nprintf 'fakevideo' > \"$last\"";

/// Writes partial output, then fails.
pub const ENCODER_FAIL: &str =
    "for last; do :; done\nprintf 'partial' > \"$last\"\necho 'Invalid data found' >&2\nexit 1";

/// Like [`ENCODER_OK`] after a delay long enough to observe a busy pool.
pub const ENCODER_SLOW: &str = "sleep 2\nfor last; do :; done\nprintf 'fakevideo' > \"$last\"";

/// Smallest valid-looking PNG header; enough for format sniffing.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub addr: SocketAddr,
    pub root: TempDir,
}

/// Write an executable `/bin/sh` script standing in for ffmpeg.
pub fn fake_ffmpeg(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write fake ffmpeg");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("failed to chmod fake ffmpeg");
    path
}

impl TestHarness {
    /// Server with default settings and a working encoder.
    pub async fn start() -> Self {
        Self::start_with(ENCODER_OK, |_| {}).await
    }

    /// Server with a custom encoder script and config tweaks.
    pub async fn start_with(encoder: &str, configure: impl FnOnce(&mut Config)) -> Self {
        let root = tempfile::tempdir().expect("failed to create temp dir");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        let mut config = Config::default();
        config.server.public_base_url = Some(format!("http://{addr}"));
        config.storage.uploads_dir = root.path().join("uploads");
        config.storage.outputs_dir = root.path().join("outputs");
        config.auth.jwt_secret = Some("integration-test-secret-0123456789abcdef".into());
        config.auth.bcrypt_cost = 4;
        config.tools.ffmpeg_path = Some(fake_ffmpeg(root.path(), encoder));
        config.jobs.timeout_secs = 30;
        config.jobs.fetch_timeout_secs = 5;
        configure(&mut config);

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let tools = ToolRegistry::discover(&config.tools);
        let ctx = AppContext::build(config, db.clone(), tools).expect("failed to build context");
        let app = build_router(ctx.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            ctx,
            db,
            addr,
            root,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn uploads(&self) -> Vec<PathBuf> {
        list(&self.root.path().join("uploads"))
    }

    pub fn outputs(&self) -> Vec<PathBuf> {
        list(&self.root.path().join("outputs"))
    }

    /// Register an account directly through the service.
    pub async fn create_account(&self, email: &str, password: &str) {
        self.ctx
            .auth
            .register(email, password)
            .await
            .expect("failed to register account");
    }

    /// Register and log in, returning a session token.
    pub async fn token_for(&self, email: &str, password: &str) -> String {
        self.create_account(email, password).await;
        self.ctx
            .auth
            .login(email, password)
            .await
            .expect("failed to log in")
    }
}

fn list(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default()
}
