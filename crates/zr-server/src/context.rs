//! Application context shared across route handlers via Axum state.
//!
//! [`AppContext`] wraps immutable infrastructure (DB pool, tools, asset store)
//! and the long-lived services in `Arc`s so cloning it per request is cheap.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use zr_av::ToolRegistry;
use zr_core::config::Config;
use zr_db::DbPool;

use crate::auth::AuthService;
use crate::pipeline::{AssetStore, InputResolver, JobPool, JobRuntime};

#[derive(Clone)]
pub struct AppContext {
    pub db: DbPool,
    pub config: Arc<Config>,
    pub tools: Arc<ToolRegistry>,
    pub assets: Arc<AssetStore>,
    pub resolver: Arc<InputResolver>,
    pub jobs: Arc<JobPool>,
    pub auth: Arc<AuthService>,
}

impl AppContext {
    /// Wire up every service from a loaded config.
    ///
    /// Creates the asset directories; failure here is fatal for startup.
    pub fn build(config: Config, db: DbPool, tools: ToolRegistry) -> zr_core::Result<Self> {
        let config = Arc::new(config);
        let tools = Arc::new(tools);

        let assets = Arc::new(AssetStore::open(&config)?);
        tracing::info!(
            uploads = %assets.dir(zr_core::AssetKind::Input).display(),
            outputs = %assets.dir(zr_core::AssetKind::Output).display(),
            "Asset directories ready"
        );

        let resolver = Arc::new(InputResolver::new(assets.clone(), &config.jobs)?);

        let runtime = JobRuntime {
            store: assets.clone(),
            tools: tools.clone(),
            params: config.encoding.clone(),
            timeout: Duration::from_secs(config.jobs.timeout_secs),
            shutdown: CancellationToken::new(),
        };
        let jobs = Arc::new(JobPool::new(
            runtime,
            &config.jobs,
            config.storage.keep_staged_inputs,
        ));

        let auth = Arc::new(AuthService::from_config(db.clone(), &config.auth));

        Ok(Self {
            db,
            config,
            tools,
            assets,
            resolver,
            jobs,
            auth,
        })
    }
}
