//! Upload Session driver: single-request and chunked transfer paths.
//!
//! The chunked path is strictly sequential — a chunk is only sent after
//! its predecessor was acknowledged with a success status, because the
//! upload target expects a contiguous byte stream and supports neither
//! out-of-order nor concurrent writes.

use medialift_api::{ApiError, UploadTarget, server_error};
use medialift_transfer::{
    Chunk, DEFAULT_CHUNK_SIZE, Strategy, TransferError, UploadSession, select_strategy, split,
};
use reqwest::header::{CONTENT_RANGE, EXPECT};
use reqwest::multipart::{Form, Part};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::UploadError;
use crate::types::UploadEvent;

/// Drives one upload attempt against an [`UploadTarget`].
pub struct Uploader {
    http: reqwest::Client,
    base_url: String,
    chunk_size: usize,
}

impl Uploader {
    /// Creates an uploader sending to `base_url` with the default 10 MB
    /// chunk size.
    pub fn new(base_url: impl Into<String>) -> Result<Self, UploadError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Overrides the chunk size (and with it the single-vs-chunked
    /// threshold).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Uploads `payload` to `target`, choosing the single-request or
    /// chunked path by payload size.
    ///
    /// Emits one [`UploadEvent::Uploading`] per acknowledged chunk and
    /// returns the playable HLS URL on success. Failures are terminal:
    /// nothing is retried and no resume state survives the attempt.
    pub async fn upload(
        &self,
        payload: &[u8],
        token: &str,
        target: &UploadTarget,
        events_tx: &mpsc::Sender<UploadEvent>,
        cancel: &CancellationToken,
    ) -> Result<String, UploadError> {
        let (chunks, _ranges) = split(payload, self.chunk_size)?;
        let total_len = payload.len() as u64;
        let session = UploadSession::new(chunks.len(), total_len);
        session.start();

        let strategy = select_strategy(total_len, self.chunk_size as u64);
        debug!(
            total_bytes = total_len,
            chunks = chunks.len(),
            ?strategy,
            uri = %target.uri,
            "starting upload"
        );

        let result = match strategy {
            Strategy::Single => {
                self.send_single(payload, token, target, &session, events_tx, cancel)
                    .await
            }
            Strategy::Chunked => {
                self.send_chunks(&chunks, total_len, token, target, &session, events_tx, cancel)
                    .await
            }
        };

        match &result {
            Ok(_) => session.complete(),
            Err(e) => session.fail(&e.to_string()),
        }
        result
    }

    /// Single-request path: the whole payload in one multipart POST.
    ///
    /// No intermediate progress is reported — the network library buffers
    /// the body, so only the terminal 0→1 transition is meaningful.
    async fn send_single(
        &self,
        payload: &[u8],
        token: &str,
        target: &UploadTarget,
        session: &UploadSession,
        events_tx: &mpsc::Sender<UploadEvent>,
        cancel: &CancellationToken,
    ) -> Result<String, UploadError> {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        let part = Part::bytes(payload.to_vec())
            .file_name("source.mp4")
            .mime_str("video/mp4")
            .map_err(ApiError::Transport)?;
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(format!("{}{}", self.base_url, target.uri))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        if !resp.status().is_success() {
            return Err(server_error(resp).await.into());
        }

        session.advance_chunk(payload.len() as u64);
        emit_progress(events_tx, session).await;

        parse_hls(resp).await.map_err(Into::into)
    }

    /// Chunked path: one range-framed multipart POST per chunk, strictly
    /// in order, each awaiting the previous acknowledgement.
    async fn send_chunks(
        &self,
        chunks: &[Chunk],
        total_len: u64,
        token: &str,
        target: &UploadTarget,
        session: &UploadSession,
        events_tx: &mpsc::Sender<UploadEvent>,
        cancel: &CancellationToken,
    ) -> Result<String, UploadError> {
        let Some((last_chunk, leading)) = chunks.split_last() else {
            return Err(TransferError::EmptyPayload.into());
        };

        for chunk in leading {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            let resp = self.send_chunk(chunk, total_len, false, token, target).await?;
            if !resp.status().is_success() {
                return Err(server_error(resp).await.into());
            }

            session.advance_chunk(chunk.len() as u64);
            emit_progress(events_tx, session).await;
            debug!(chunk = chunk.index + 1, total = chunks.len(), "chunk acknowledged");
        }

        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        // The final chunk's response must carry the playable asset URL.
        let resp = self
            .send_chunk(last_chunk, total_len, true, token, target)
            .await?;
        if !resp.status().is_success() {
            return Err(server_error(resp).await.into());
        }

        session.advance_chunk(last_chunk.len() as u64);
        emit_progress(events_tx, session).await;

        parse_hls(resp).await.map_err(Into::into)
    }

    /// Sends one chunk with HTTP range framing.
    ///
    /// The `Content-Range` upper bound is inclusive per HTTP convention,
    /// while the chunk's internal range is exclusive-upper. Every chunk
    /// except the last advertises `Expect: 100-Continue` to tell the
    /// server more data is coming.
    async fn send_chunk(
        &self,
        chunk: &Chunk,
        total_len: u64,
        is_last: bool,
        token: &str,
        target: &UploadTarget,
    ) -> Result<reqwest::Response, UploadError> {
        let content_range = format!(
            "bytes {}-{}/{}",
            chunk.range.start,
            chunk.range.end - 1,
            total_len
        );
        // Chunk parts are named by their 1-based position; the server
        // infers the media type from the resource-creation call.
        let part = Part::bytes(chunk.data.clone()).file_name(format!(
            "sourceChunked{}",
            chunk.index + 1
        ));
        let form = Form::new().part("file", part);

        let mut req = self
            .http
            .post(format!("{}{}", self.base_url, target.uri))
            .bearer_auth(token)
            .header(CONTENT_RANGE, content_range)
            .multipart(form);
        if !is_last {
            req = req.header(EXPECT, "100-Continue");
        }

        req.send()
            .await
            .map_err(|e| ApiError::Transport(e).into())
    }
}

/// Extracts the playable HLS URL from a success response.
async fn parse_hls(resp: reqwest::Response) -> Result<String, ApiError> {
    let body: serde_json::Value = resp
        .json()
        .await
        .map_err(|_| ApiError::CorruptResponse("assets.hls"))?;
    body.pointer("/assets/hls")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or(ApiError::CorruptResponse("assets.hls"))
}

async fn emit_progress(events_tx: &mpsc::Sender<UploadEvent>, session: &UploadSession) {
    let snap = session.snapshot();
    let _ = events_tx
        .send(UploadEvent::Uploading {
            progress: snap.fraction,
            bytes_confirmed: snap.bytes_confirmed,
            total_bytes: snap.total_bytes,
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Reads one full HTTP request (headers plus `Content-Length` body).
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut tmp = [0u8; 4096];
        loop {
            let n = stream.read(&mut tmp).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&tmp[..n]);

            if let Some(headers_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..headers_end]).to_lowercase();
                let content_length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                let total = headers_end + 4 + content_length;
                while buf.len() < total {
                    let n = stream.read(&mut tmp).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&tmp[..n]);
                }
                break;
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Serves the given `(status, body)` responses in order, one request
    /// per connection, recording every raw request.
    async fn mock_upload_server(
        responses: Vec<(u16, &str)>,
    ) -> (String, Arc<Mutex<Vec<String>>>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let responses: Vec<(u16, String)> = responses
            .into_iter()
            .map(|(s, b)| (s, b.to_string()))
            .collect();

        let handle = tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let request = read_request(&mut stream).await;
                recorded.lock().unwrap().push(request);

                let resp = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, requests, handle)
    }

    fn target() -> UploadTarget {
        UploadTarget {
            uri: "/videos/v1/source".into(),
        }
    }

    fn events() -> (mpsc::Sender<UploadEvent>, mpsc::Receiver<UploadEvent>) {
        mpsc::channel(64)
    }

    async fn drain(mut rx: mpsc::Receiver<UploadEvent>) -> Vec<UploadEvent> {
        let mut out = Vec::new();
        while let Ok(e) = rx.try_recv() {
            out.push(e);
        }
        out
    }

    const HLS_BODY: &str = r#"{"assets":{"hls":"https://x/hls.m3u8"}}"#;

    #[tokio::test]
    async fn single_path_uploads_in_one_request() {
        let (url, requests, handle) = mock_upload_server(vec![(201, HLS_BODY)]).await;
        let uploader = Uploader::new(url).unwrap().with_chunk_size(100);
        let (tx, rx) = events();

        let payload = vec![1u8; 10];
        let hls = uploader
            .upload(&payload, "tok", &target(), &tx, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(hls, "https://x/hls.m3u8");

        let reqs = requests.lock().unwrap().clone();
        assert_eq!(reqs.len(), 1);
        let req = reqs[0].to_lowercase();
        assert!(req.starts_with("post /videos/v1/source"));
        assert!(req.contains("authorization: bearer tok"));
        assert!(req.contains("filename=\"source.mp4\""));
        assert!(req.contains("content-type: video/mp4"));
        // Single path never sends range framing.
        assert!(!req.contains("content-range"));

        // Exactly one progress event, the terminal 0 -> 1 transition.
        let evs = drain(rx).await;
        assert_eq!(
            evs,
            vec![UploadEvent::Uploading {
                progress: 1.0,
                bytes_confirmed: 10,
                total_bytes: 10,
            }]
        );
        handle.abort();
    }

    #[tokio::test]
    async fn single_path_missing_hls_is_corrupt() {
        let (url, requests, handle) = mock_upload_server(vec![(200, r#"{"videoId":"v1"}"#)]).await;
        let uploader = Uploader::new(url).unwrap().with_chunk_size(100);
        let (tx, _rx) = events();

        let err = uploader
            .upload(&[1u8; 10], "tok", &target(), &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UploadError::Api(ApiError::CorruptResponse("assets.hls"))
        ));
        assert_eq!(requests.lock().unwrap().len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn single_path_server_error_uses_title() {
        let (url, _requests, handle) =
            mock_upload_server(vec![(500, r#"{"title":"storage full"}"#)]).await;
        let uploader = Uploader::new(url).unwrap().with_chunk_size(100);
        let (tx, _rx) = events();

        let err = uploader
            .upload(&[1u8; 10], "tok", &target(), &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            UploadError::Api(ApiError::Server { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "storage full");
            }
            other => panic!("unexpected error: {other}"),
        }
        handle.abort();
    }

    #[tokio::test]
    async fn chunked_path_sends_sequential_range_framed_chunks() {
        // 25 bytes with 10-byte chunks: the same shape as a 25 MB payload
        // split into 10 MB chunks.
        let (url, requests, handle) =
            mock_upload_server(vec![(200, "{}"), (200, "{}"), (201, HLS_BODY)]).await;
        let uploader = Uploader::new(url).unwrap().with_chunk_size(10);
        let (tx, rx) = events();

        let payload: Vec<u8> = (0..25).collect();
        let hls = uploader
            .upload(&payload, "tok", &target(), &tx, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(hls, "https://x/hls.m3u8");

        let reqs: Vec<String> = requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.to_lowercase())
            .collect();
        assert_eq!(reqs.len(), 3);

        // Range framing: inclusive upper bound over the exclusive range.
        assert!(reqs[0].contains("content-range: bytes 0-9/25"));
        assert!(reqs[1].contains("content-range: bytes 10-19/25"));
        assert!(reqs[2].contains("content-range: bytes 20-24/25"));

        // Expect: 100-Continue on every chunk but the last.
        assert!(reqs[0].contains("expect: 100-continue"));
        assert!(reqs[1].contains("expect: 100-continue"));
        assert!(!reqs[2].contains("expect: 100-continue"));

        // Part filenames carry the 1-based chunk position.
        assert!(reqs[0].contains("filename=\"sourcechunked1\""));
        assert!(reqs[1].contains("filename=\"sourcechunked2\""));
        assert!(reqs[2].contains("filename=\"sourcechunked3\""));

        // One event per acknowledged chunk.
        let evs = drain(rx).await;
        let fractions: Vec<f64> = evs
            .iter()
            .map(|e| match e {
                UploadEvent::Uploading { progress, .. } => *progress,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(fractions, vec![1.0 / 3.0, 2.0 / 3.0, 1.0]);
        handle.abort();
    }

    #[tokio::test]
    async fn chunked_path_stops_at_first_failure() {
        // Chunk 2 of 3 fails: chunk 3 must never be sent.
        let (url, requests, handle) =
            mock_upload_server(vec![(200, "{}"), (500, r#"{"title":"boom"}"#), (201, HLS_BODY)])
                .await;
        let uploader = Uploader::new(url).unwrap().with_chunk_size(10);
        let (tx, rx) = events();

        let payload = vec![0u8; 25];
        let err = uploader
            .upload(&payload, "tok", &target(), &tx, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            UploadError::Api(ApiError::Server { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(requests.lock().unwrap().len(), 2);

        // Only the first chunk was acknowledged.
        let evs = drain(rx).await;
        assert_eq!(evs.len(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn chunked_path_last_response_must_carry_hls() {
        let (url, _requests, handle) =
            mock_upload_server(vec![(200, "{}"), (200, r#"{"done":true}"#)]).await;
        let uploader = Uploader::new(url).unwrap().with_chunk_size(10);
        let (tx, _rx) = events();

        let err = uploader
            .upload(&[0u8; 15], "tok", &target(), &tx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Api(ApiError::CorruptResponse("assets.hls"))
        ));
        handle.abort();
    }

    #[tokio::test]
    async fn cancelled_before_start_sends_nothing() {
        let (url, requests, handle) = mock_upload_server(vec![(200, "{}")]).await;
        let uploader = Uploader::new(url).unwrap().with_chunk_size(10);
        let (tx, _rx) = events();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = uploader
            .upload(&[0u8; 25], "tok", &target(), &tx, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Cancelled));
        assert!(requests.lock().unwrap().is_empty());
        handle.abort();
    }

    #[tokio::test]
    async fn empty_payload_is_rejected() {
        let uploader = Uploader::new("http://127.0.0.1:1").unwrap();
        let (tx, _rx) = events();

        let err = uploader
            .upload(&[], "tok", &target(), &tx, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UploadError::Transfer(TransferError::EmptyPayload)
        ));
    }
}
