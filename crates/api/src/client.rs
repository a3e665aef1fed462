//! Video hosting API client.
//!
//! Async HTTP client using `reqwest` with Bearer token authentication.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

use crate::types::{
    AuthRequest, AuthResponse, CreateVideoRequest, CreateVideoResponse, ErrorBody, VideoList,
};
use crate::{ApiError, NetworkActivity, UploadTarget};

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://ws.api.video";

/// Builds a [`ApiError::Server`] from a non-success response, extracting
/// the body's `title` field when present.
pub async fn server_error(resp: reqwest::Response) -> ApiError {
    let status = resp.status().as_u16();
    let body = resp.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.title)
        .unwrap_or_else(|| "request failed".to_string());
    ApiError::Server { status, message }
}

/// Video hosting API client.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    activity: NetworkActivity,
}

impl ApiClient {
    /// Creates a client against the production endpoint.
    pub fn new() -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            activity: NetworkActivity::new(),
        })
    }

    /// Points the client at a different endpoint (sandbox, self-hosted,
    /// or a test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Returns the in-flight request gauge shared by this client.
    pub fn activity(&self) -> NetworkActivity {
        self.activity.clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchanges an API key for a bearer access token.
    pub async fn authenticate(&self, api_key: &str) -> Result<String, ApiError> {
        let _guard = self.activity.begin();
        let resp = self
            .http
            .post(format!("{}/auth/api-key", self.base_url))
            .json(&AuthRequest { api_key })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }

        let body: AuthResponse = resp
            .json()
            .await
            .map_err(|_| ApiError::CorruptResponse("access_token"))?;
        body.access_token
            .ok_or(ApiError::CorruptResponse("access_token"))
    }

    /// Creates a new video resource and returns its upload target.
    pub async fn create_video(
        &self,
        title: &str,
        description: &str,
        token: &str,
    ) -> Result<UploadTarget, ApiError> {
        let _guard = self.activity.begin();
        let resp = self
            .http
            .post(format!("{}/videos", self.base_url))
            .bearer_auth(token)
            .json(&CreateVideoRequest { title, description })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }

        let body: CreateVideoResponse = resp
            .json()
            .await
            .map_err(|_| ApiError::CorruptResponse("source.uri"))?;
        let uri = body
            .source
            .and_then(|s| s.uri)
            .ok_or(ApiError::CorruptResponse("source.uri"))?;

        debug!(%uri, "created video resource");
        Ok(UploadTarget { uri })
    }

    /// Lists the ids of every video associated with the account.
    ///
    /// Any element missing its id aborts the whole call; partial results
    /// are never returned.
    pub async fn list_video_ids(&self, token: &str) -> Result<Vec<String>, ApiError> {
        let _guard = self.activity.begin();
        let resp = self
            .http
            .get(format!("{}/videos", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(server_error(resp).await);
        }

        let body: VideoList = resp
            .json()
            .await
            .map_err(|_| ApiError::CorruptResponse("data"))?;
        let items = body.data.ok_or(ApiError::CorruptResponse("data"))?;

        let mut ids = Vec::with_capacity(items.len());
        for item in items {
            ids.push(item.video_id.ok_or(ApiError::CorruptResponse("videoId"))?);
        }
        Ok(ids)
    }

    /// Deletes a video. Only HTTP 204 counts as success for this endpoint;
    /// every other status, success-range included, is an error.
    pub async fn delete_video(&self, id: &str, token: &str) -> Result<(), ApiError> {
        let _guard = self.activity.begin();
        let encoded = utf8_percent_encode(id, NON_ALPHANUMERIC).to_string();
        let resp = self
            .http
            .delete(format!("{}/videos/{}", self.base_url, encoded))
            .bearer_auth(token)
            .send()
            .await?;

        if resp.status().as_u16() != 204 {
            return Err(server_error(resp).await);
        }

        debug!(%id, "deleted video");
        Ok(())
    }
}
