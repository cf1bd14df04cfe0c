//! Still image to zoom-pan H.264 clip using ffmpeg.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use zr_core::config::EncodingParameters;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Build the ffmpeg argument list for a zoom-pan render.
///
/// The image is looped for `loop_secs`, scaled to the output size and zoomed
/// progressively, then encoded as H.264 in an MP4 with the configured pixel
/// format, container flags, preset and CRF. `-y` overwrites the reserved
/// (empty) output file.
pub fn zoompan_args(params: &EncodingParameters, input: &Path, output: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-loop".into(),
        "1".into(),
        "-t".into(),
        params.loop_secs.to_string(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-vf".into(),
        params.video_filter(),
        "-t".into(),
        params.duration_secs.to_string(),
        "-r".into(),
        params.frame_rate.to_string(),
        "-c:v".into(),
        params.video_codec.clone(),
        "-pix_fmt".into(),
        params.pixel_format.clone(),
        "-movflags".into(),
        params.movflags.clone(),
        "-preset".into(),
        params.preset.clone(),
        "-crf".into(),
        params.crf.to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Render `input` into `output` as a zoom-pan clip.
///
/// The process is killed if it outlives `timeout` or if `cancel` fires.
pub async fn render_zoompan(
    tools: &ToolRegistry,
    input: &Path,
    output: &Path,
    params: &EncodingParameters,
    timeout: Duration,
    cancel: Option<CancellationToken>,
) -> zr_core::Result<()> {
    let ffmpeg = tools.require("ffmpeg")?;

    tracing::info!(
        "Zoom-pan encode: {:?} -> {:?} ({}x{}, {}s @ {}fps, crf={}, preset={})",
        input,
        output,
        params.width,
        params.height,
        params.duration_secs,
        params.frame_rate,
        params.crf,
        params.preset,
    );

    let mut cmd = ToolCommand::new(ffmpeg.path.clone());
    cmd.timeout(timeout);
    cmd.args(zoompan_args(params, input, output));
    if let Some(token) = cancel {
        cmd.cancel_on(token);
    }
    tracing::debug!("ffmpeg {}", cmd.get_args().join(" "));
    cmd.execute().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn args_follow_fixed_contract() {
        let args = zoompan_args(
            &EncodingParameters::default(),
            Path::new("/in/a.jpg"),
            Path::new("/out/b.mp4"),
        );
        let expected = [
            "-y",
            "-loop",
            "1",
            "-t",
            "8",
            "-i",
            "/in/a.jpg",
            "-vf",
            "scale=1280:720,zoompan=z='min(zoom+0.0009,1.20)':d=240:s=1280x720",
            "-t",
            "8",
            "-r",
            "30",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-preset",
            "veryslow",
            "-crf",
            "18",
            "/out/b.mp4",
        ];
        assert_eq!(args, expected);
    }

    #[test]
    fn output_is_last_argument() {
        let mut params = EncodingParameters::default();
        params.crf = 23;
        let args = zoompan_args(&params, Path::new("in.png"), Path::new("out.mp4"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
        let crf_pos = args.iter().position(|a| a == "-crf").unwrap();
        assert_eq!(args[crf_pos + 1], "23");
    }

    #[tokio::test]
    async fn render_without_ffmpeg_fails() {
        let result = render_zoompan(
            &ToolRegistry::default(),
            &PathBuf::from("in.jpg"),
            &PathBuf::from("out.mp4"),
            &EncodingParameters::default(),
            Duration::from_secs(1),
            None,
        )
        .await;
        assert!(matches!(result, Err(zr_core::Error::Tool { .. })));
    }
}
