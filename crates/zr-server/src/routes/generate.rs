//! `POST /ai-generate`: still image in, zoom-pan video URL out.
//!
//! The image arrives either as a multipart `image` file or as an `imageUrl`
//! field (multipart text, JSON or urlencoded form). Uploads are streamed
//! straight into the uploads directory while the body is read.

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use zr_core::{AssetKind, Error, InputOrigin, StagedInput};

use crate::context::AppContext;
use crate::error::AppError;
use crate::pipeline::assets::{sanitize_extension, AssetStore, PendingInput};
use crate::pipeline::pool::SERVER_BUSY;
use crate::pipeline::resolver::ImageSource;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UrlBody {
    image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub video_url: String,
}

/// Image source pulled out of the request body.
#[derive(Debug)]
pub struct GenerateRequest(pub ImageSource);

impl FromRequest<AppContext> for GenerateRequest {
    type Rejection = AppError;

    async fn from_request(req: Request, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        // Turn callers away before any upload or fetch when every slot is taken.
        if !ctx.jobs.has_capacity() {
            tracing::warn!("Worker pool full; rejecting request before reading body");
            return Err(Error::Busy(SERVER_BUSY.into()).into());
        }

        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, ctx)
                .await
                .map_err(|e| Error::Validation(format!("Invalid upload: {}", e.body_text())))?;
            return read_multipart(multipart, &ctx.assets).await.map(Self);
        }

        let body = if content_type.starts_with("application/json") {
            Json::<UrlBody>::from_request(req, ctx)
                .await
                .map(|Json(b)| b)
                .unwrap_or_default()
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            Form::<UrlBody>::from_request(req, ctx)
                .await
                .map(|Form(b)| b)
                .unwrap_or_default()
        } else {
            UrlBody::default()
        };

        Ok(Self(ImageSource {
            upload: None,
            image_url: body.image_url,
        }))
    }
}

/// Read every field; a staged upload is removed if a later field fails.
async fn read_multipart(
    mut multipart: Multipart,
    assets: &AssetStore,
) -> Result<ImageSource, AppError> {
    let mut source = ImageSource::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("image") if source.upload.is_none() => {
                source.upload = stage_upload(field, assets).await?;
            }
            Some("imageUrl") => {
                source.image_url = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    Ok(source)
}

/// Stream one file field to a freshly allocated input path.
///
/// An empty file part (a form submitted without choosing a file) counts as
/// no upload.
async fn stage_upload(
    mut field: Field<'_>,
    assets: &AssetStore,
) -> Result<Option<PendingInput>, AppError> {
    let extension = sanitize_extension(field.file_name());
    let (id, local_path) = assets.allocate(AssetKind::Input, &extension)?;
    let pending = PendingInput::new(StagedInput {
        id,
        local_path,
        origin: InputOrigin::Upload,
    });

    let mut file = tokio::fs::File::create(&pending.staged().local_path)
        .await
        .map_err(Error::from)?;
    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk).await.map_err(Error::from)?;
        written += chunk.len();
    }
    file.flush().await.map_err(Error::from)?;
    drop(file);

    if written == 0 {
        return Ok(None);
    }

    tracing::debug!(asset_id = %id, bytes = written, "Upload staged");
    Ok(Some(pending))
}

fn multipart_error(e: MultipartError) -> AppError {
    let message = if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        "Image too large".to_string()
    } else {
        format!("Invalid upload: {}", e.body_text())
    };
    Error::Validation(message).into()
}

/// POST /ai-generate
pub async fn generate(
    State(ctx): State<AppContext>,
    GenerateRequest(source): GenerateRequest,
) -> Result<Json<GenerateResponse>, AppError> {
    let input = ctx.resolver.resolve(source).await?;
    let handle = ctx.jobs.submit(input)?;
    let job_id = handle.id();
    tracing::debug!(%job_id, "Waiting for encode");

    let asset = handle.wait().await?;

    Ok(Json(GenerateResponse {
        video_url: asset.public_url,
    }))
}
