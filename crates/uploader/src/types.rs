use std::path::{Path, PathBuf};

use medialift_compress::QualityPreset;
use medialift_transfer::TransferError;

use crate::error::UploadError;

/// An immutable reference to local source media selected for upload.
///
/// Owned by the caller for the duration of one upload attempt; replaced
/// when a new selection is made.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub byte_len: u64,
    pub mime_type: String,
    /// When set, the source is transcoded to this preset before upload.
    pub preset: Option<QualityPreset>,
}

impl MediaAsset {
    /// Inspects `path` and builds an asset.
    ///
    /// Only video sources are accepted; the file is stat'ed for its byte
    /// length up front so an unreadable selection fails here rather than
    /// mid-pipeline.
    pub fn from_path(
        path: impl Into<PathBuf>,
        preset: Option<QualityPreset>,
    ) -> Result<Self, UploadError> {
        let path = path.into();
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        if mime.type_() != mime_guess::mime::VIDEO {
            return Err(UploadError::UnsupportedMediaType(mime.to_string()));
        }
        let byte_len = std::fs::metadata(&path).map_err(TransferError::Io)?.len();
        Ok(Self {
            path,
            byte_len,
            mime_type: mime.to_string(),
            preset,
        })
    }
}

/// Events emitted while an upload attempt runs.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Sampled compression progress in `[0, 1]`.
    Compressing { progress: f32 },
    /// Transfer progress: one event per acknowledged chunk. The
    /// single-request path emits only the terminal `1.0` transition.
    Uploading {
        progress: f64,
        bytes_confirmed: u64,
        total_bytes: u64,
    },
    /// Terminal: the upload succeeded and the video is playable.
    Completed { hls_url: String },
    /// Terminal: the attempt failed; restart from the top to retry.
    Failed { error: String },
}

/// A successfully uploaded video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedVideo {
    /// Playable HLS URL returned by the server.
    pub hls_url: String,
}

/// Outcome of one cleanup batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Ids whose delete returned 204.
    pub deleted: Vec<String>,
    /// Ids whose delete failed, with the error message.
    pub failed: Vec<(String, String)>,
}

impl CleanupReport {
    /// Returns `true` if every listed video was deleted.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of videos the batch attempted to delete.
    pub fn total(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn asset_from_video_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"0123456789").unwrap();

        let asset = MediaAsset::from_path(&path, Some(QualityPreset::Hd720)).unwrap();
        assert_eq!(asset.byte_len, 10);
        assert_eq!(asset.mime_type, "video/mp4");
        assert_eq!(asset.preset, Some(QualityPreset::Hd720));
    }

    #[test]
    fn asset_rejects_non_video() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let err = MediaAsset::from_path(&path, None).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedMediaType(_)));
    }

    #[test]
    fn asset_unreadable_file_is_an_error() {
        let err = MediaAsset::from_path("/nonexistent/clip.mp4", None).unwrap_err();
        assert!(matches!(
            err,
            UploadError::Transfer(TransferError::Io(_))
        ));
    }

    #[test]
    fn cleanup_report_accounting() {
        let mut report = CleanupReport::default();
        assert!(report.is_clean());
        assert_eq!(report.total(), 0);

        report.deleted.push("a".into());
        report.failed.push(("b".into(), "boom".into()));
        assert!(!report.is_clean());
        assert_eq!(report.total(), 2);
    }
}
