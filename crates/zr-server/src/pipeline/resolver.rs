//! Turns a generation request into exactly one staged input file.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use zr_core::config::JobsConfig;
use zr_core::{AssetKind, Error, InputOrigin, Result, StagedInput};

use super::assets::{AssetStore, PendingInput};

/// Message for requests that carry neither an upload nor a URL.
pub const NO_IMAGE: &str = "No image selected";

/// Leading bytes inspected to recognise an image format.
const SNIFF_BYTES: usize = 32;

/// Raw image source extracted from the request.
#[derive(Debug, Default)]
pub struct ImageSource {
    /// File already streamed to the uploads directory by the extractor.
    pub upload: Option<PendingInput>,
    pub image_url: Option<String>,
}

pub struct InputResolver {
    client: reqwest::Client,
    store: Arc<AssetStore>,
    max_fetch_bytes: u64,
}

impl InputResolver {
    pub fn new(store: Arc<AssetStore>, jobs: &JobsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(jobs.fetch_timeout_secs))
            .user_agent(concat!("zoomreel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            store,
            max_fetch_bytes: jobs.max_fetch_bytes,
        })
    }

    /// Upload wins over URL; a blank URL counts as absent.
    ///
    /// The staged file is removed if the returned [`PendingInput`] is dropped
    /// before a job takes it.
    pub async fn resolve(&self, source: ImageSource) -> Result<PendingInput> {
        if let Some(pending) = source.upload {
            tracing::debug!(asset_id = %pending.staged().id, "Using uploaded image");
            return Ok(pending);
        }

        match source.image_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => self.fetch(url).await,
            _ => Err(Error::Validation(NO_IMAGE.into())),
        }
    }

    /// Stream the remote body straight into a freshly allocated input.
    async fn fetch(&self, url: &str) -> Result<PendingInput> {
        tracing::info!("Fetching remote image {url}");

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::UpstreamFetch(format!("GET {url}: {e}")))?;

        if let Some(len) = response.content_length() {
            if len > self.max_fetch_bytes {
                return Err(Error::UpstreamFetch(format!(
                    "{url} declares {len} bytes, limit is {}",
                    self.max_fetch_bytes
                )));
            }
        }

        let (id, local_path) = self.store.allocate(AssetKind::Input, "jpg")?;
        let pending = PendingInput::new(StagedInput {
            id,
            local_path,
            origin: InputOrigin::RemoteFetch,
        });
        let path = &pending.staged().local_path;
        let write_failed =
            |e: std::io::Error| Error::UpstreamFetch(format!("writing {}: {e}", path.display()));

        let mut file = tokio::fs::File::create(path).await.map_err(write_failed)?;
        let mut head = Vec::with_capacity(SNIFF_BYTES);
        let mut sniffed = false;
        let mut written = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::UpstreamFetch(format!("reading {url}: {e}")))?
        {
            written += chunk.len() as u64;
            if written > self.max_fetch_bytes {
                return Err(Error::UpstreamFetch(format!(
                    "{url} exceeds {} bytes",
                    self.max_fetch_bytes
                )));
            }

            if !sniffed {
                let take = (SNIFF_BYTES - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
                if head.len() == SNIFF_BYTES {
                    sniff(&head, url)?;
                    sniffed = true;
                }
            }

            file.write_all(&chunk).await.map_err(write_failed)?;
        }

        if !sniffed {
            sniff(&head, url)?;
        }
        file.flush().await.map_err(write_failed)?;
        drop(file);

        tracing::debug!(asset_id = %id, bytes = written, "Remote image staged");
        Ok(pending)
    }
}

fn sniff(head: &[u8], url: &str) -> Result<()> {
    let format = image::guess_format(head)
        .map_err(|_| Error::UpstreamFetch(format!("{url} did not return an image")))?;
    tracing::debug!("Remote image {url} is {format:?}");
    Ok(())
}
