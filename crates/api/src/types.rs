use serde::{Deserialize, Serialize};

/// Server-assigned identity of an in-progress upload.
///
/// An opaque relative path returned at resource-creation time; every chunk
/// request of one upload attempt is sent to it. Not reusable across source
/// files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    pub uri: String,
}

#[derive(Serialize)]
pub(crate) struct AuthRequest<'a> {
    #[serde(rename = "apiKey")]
    pub api_key: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct AuthResponse {
    pub access_token: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct CreateVideoRequest<'a> {
    pub title: &'a str,
    pub description: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct CreateVideoResponse {
    pub source: Option<VideoSource>,
}

#[derive(Deserialize)]
pub(crate) struct VideoSource {
    pub uri: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct VideoList {
    pub data: Option<Vec<VideoItem>>,
}

#[derive(Deserialize)]
pub(crate) struct VideoItem {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    pub title: Option<String>,
}
