//! A single zoom-pan encode: staged input in, generated asset out.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use zr_av::ToolRegistry;
use zr_core::config::EncodingParameters;
use zr_core::{AssetKind, Error, GeneratedAsset, JobId, Result, StagedInput};

use super::assets::AssetStore;

/// Lifecycle of an [`EncodingJob`]. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Created,
    Running,
    Succeeded,
    Failed,
}

/// Everything a job needs from the outside world.
#[derive(Clone)]
pub struct JobRuntime {
    pub store: Arc<AssetStore>,
    pub tools: Arc<ToolRegistry>,
    pub params: EncodingParameters,
    pub timeout: Duration,
    /// Cancelled on server shutdown; kills running encoders.
    pub shutdown: CancellationToken,
}

#[derive(Debug)]
pub struct EncodingJob {
    id: JobId,
    staged: StagedInput,
    state: JobState,
}

impl EncodingJob {
    pub fn new(staged: StagedInput) -> Self {
        Self {
            id: JobId::new(),
            staged,
            state: JobState::Created,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn staged(&self) -> &StagedInput {
        &self.staged
    }

    fn transition(&mut self, next: JobState) {
        tracing::info!(job_id = %self.id, from = ?self.state, to = ?next, "Job state change");
        self.state = next;
    }

    /// Run the encoder once. No retries.
    ///
    /// On failure any partial output is removed before the error is returned.
    pub async fn run(&mut self, rt: &JobRuntime) -> Result<GeneratedAsset> {
        if self.state != JobState::Created {
            return Err(Error::Internal(format!(
                "job {} already ran ({:?})",
                self.id, self.state
            )));
        }
        self.transition(JobState::Running);

        let (asset_id, output_path) = match rt.store.allocate(AssetKind::Output, "mp4") {
            Ok(v) => v,
            Err(e) => {
                self.transition(JobState::Failed);
                return Err(e);
            }
        };

        let rendered = match zr_av::render_zoompan(
            &rt.tools,
            &self.staged.local_path,
            &output_path,
            &rt.params,
            rt.timeout,
            Some(rt.shutdown.child_token()),
        )
        .await
        {
            Ok(()) => check_output(&output_path).await,
            Err(e) => Err(e),
        };

        match rendered {
            Ok(()) => {
                self.transition(JobState::Succeeded);
                let asset = GeneratedAsset {
                    id: asset_id,
                    public_url: rt.store.public_url(&format!("{asset_id}.mp4")),
                    output_path,
                };
                Ok(asset)
            }
            Err(e) => {
                tracing::error!(job_id = %self.id, error = %e, "Encoding failed");
                self.transition(JobState::Failed);
                rt.store.discard(&output_path).await;
                Err(Error::Encoding(e.to_string()))
            }
        }
    }
}

/// The encoder must leave a non-empty file behind.
async fn check_output(path: &std::path::Path) -> Result<()> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.len() == 0 {
        return Err(Error::tool("ffmpeg", "produced an empty file"));
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use zr_core::config::Config;
    use zr_core::InputOrigin;

    fn script(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn runtime(root: &Path, ffmpeg: &Path, timeout: Duration) -> JobRuntime {
        let mut config = Config::default();
        config.storage.uploads_dir = root.join("uploads");
        config.storage.outputs_dir = root.join("outputs");
        JobRuntime {
            store: Arc::new(AssetStore::open(&config).unwrap()),
            tools: Arc::new(ToolRegistry::default().with_tool("ffmpeg", ffmpeg)),
            params: EncodingParameters::default(),
            timeout,
            shutdown: CancellationToken::new(),
        }
    }

    fn staged(rt: &JobRuntime) -> StagedInput {
        let (id, local_path) = rt.store.allocate(AssetKind::Input, "jpg").unwrap();
        std::fs::write(&local_path, b"img").unwrap();
        StagedInput {
            id,
            local_path,
            origin: InputOrigin::Upload,
        }
    }

    fn outputs(rt: &JobRuntime) -> usize {
        std::fs::read_dir(rt.store.dir(AssetKind::Output)).unwrap().count()
    }

    #[tokio::test]
    async fn success_produces_servable_asset() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = script(
            dir.path(),
            "ffmpeg",
            "for last; do :; done\nprintf 'fakevideo' > \"$last\"",
        );
        let rt = runtime(dir.path(), &ffmpeg, Duration::from_secs(10));

        let mut job = EncodingJob::new(staged(&rt));
        assert_eq!(job.state(), JobState::Created);
        let asset = job.run(&rt).await.unwrap();

        assert_eq!(job.state(), JobState::Succeeded);
        assert_eq!(std::fs::read(&asset.output_path).unwrap(), b"fakevideo");
        assert!(asset.public_url.ends_with(&format!("/outputs/{}.mp4", asset.id)));
    }

    #[tokio::test]
    async fn failure_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = script(
            dir.path(),
            "ffmpeg",
            "for last; do :; done\nprintf 'partial' > \"$last\"\necho boom >&2\nexit 1",
        );
        let rt = runtime(dir.path(), &ffmpeg, Duration::from_secs(10));

        let mut job = EncodingJob::new(staged(&rt));
        let err = job.run(&rt).await.unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
        assert_eq!(job.state(), JobState::Failed);
        assert_eq!(outputs(&rt), 0);
    }

    #[tokio::test]
    async fn empty_output_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = script(dir.path(), "ffmpeg", "exit 0");
        let rt = runtime(dir.path(), &ffmpeg, Duration::from_secs(10));

        let mut job = EncodingJob::new(staged(&rt));
        assert!(job.run(&rt).await.is_err());
        assert_eq!(outputs(&rt), 0);
    }

    #[tokio::test]
    async fn timeout_fails_job() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = script(dir.path(), "ffmpeg", "sleep 10");
        let rt = runtime(dir.path(), &ffmpeg, Duration::from_millis(200));

        let mut job = EncodingJob::new(staged(&rt));
        let err = job.run(&rt).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
        assert_eq!(outputs(&rt), 0);
    }

    #[tokio::test]
    async fn job_runs_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let ffmpeg = script(
            dir.path(),
            "ffmpeg",
            "for last; do :; done\nprintf 'v' > \"$last\"",
        );
        let rt = runtime(dir.path(), &ffmpeg, Duration::from_secs(10));

        let mut job = EncodingJob::new(staged(&rt));
        job.run(&rt).await.unwrap();
        assert!(matches!(job.run(&rt).await, Err(Error::Internal(_))));
        assert_eq!(outputs(&rt), 1);
    }
}
