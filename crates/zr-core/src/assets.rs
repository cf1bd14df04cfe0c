//! Asset data model shared by the store, the resolver and the job runner.

use std::path::PathBuf;

use serde::Serialize;

use crate::ids::AssetId;

/// Which asset directory a file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// Staged source images waiting for (or consumed by) a job.
    Input,
    /// Finished videos served under `/outputs`.
    Output,
}

/// Where a staged input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputOrigin {
    Upload,
    RemoteFetch,
}

/// A locally materialized source image, ready for the encoding engine.
#[derive(Debug, Clone)]
pub struct StagedInput {
    pub id: AssetId,
    pub local_path: PathBuf,
    pub origin: InputOrigin,
}

/// A finished output video and its externally addressable URL.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedAsset {
    pub id: AssetId,
    #[serde(skip)]
    pub output_path: PathBuf,
    pub public_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_asset_never_serializes_path() {
        let asset = GeneratedAsset {
            id: AssetId::new(),
            output_path: PathBuf::from("/srv/outputs/a.mp4"),
            public_url: "http://localhost:5000/outputs/a.mp4".into(),
        };
        let json = serde_json::to_string(&asset).unwrap();
        assert!(!json.contains("/srv/outputs"));
        assert!(json.contains("public_url"));
    }
}
