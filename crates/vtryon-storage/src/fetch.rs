//! Garment image retrieval.
//!
//! Garment URLs are either remote `http(s)` URLs or `/uploads/<name>` paths
//! pointing into the local result store.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::error::{StorageError, StorageResult};
use crate::result_store::{filename_from_public_url, is_safe_filename, PUBLIC_PREFIX};

/// Default fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default cap on a downloaded garment body.
pub const DEFAULT_MAX_GARMENT_BYTES: usize = 20 * 1024 * 1024;

/// Downloads garment images with a bounded timeout and body size.
#[derive(Debug, Clone)]
pub struct GarmentFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: usize,
    uploads_root: PathBuf,
}

impl GarmentFetcher {
    pub fn new(timeout: Duration, uploads_root: impl Into<PathBuf>) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vtryon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::fetch_failed(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout,
            max_bytes: DEFAULT_MAX_GARMENT_BYTES,
            uploads_root: uploads_root.into(),
        })
    }

    /// Override the largest accepted remote body.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch raw image bytes from a remote URL or the local upload directory.
    pub async fn fetch_bytes(&self, url: &str) -> StorageResult<Vec<u8>> {
        let url = url.trim();
        if url.starts_with(PUBLIC_PREFIX) {
            return self.read_local(url).await;
        }

        let parsed = Url::parse(url)
            .map_err(|e| StorageError::fetch_failed(format!("invalid garment URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(StorageError::fetch_failed(format!(
                "unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        debug!(url = %parsed, "Fetching garment image");
        let mut response = self.client.get(parsed).send().await.map_err(|e| self.map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Garment host returned error status");
            return Err(StorageError::fetch_failed(format!("{} returned {}", url, status)));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_bytes as u64 {
                return Err(self.too_large(url));
            }
        }

        // Content-Length may be absent or wrong, so the cap also applies while streaming
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.map_request_error(url, e))? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }
        debug!(url = %url, size = body.len(), "Fetched garment image");
        Ok(body)
    }

    fn too_large(&self, url: &str) -> StorageError {
        warn!(url = %url, max_bytes = self.max_bytes, "Garment body too large");
        StorageError::fetch_failed(format!("{} exceeds {} bytes", url, self.max_bytes))
    }

    async fn read_local(&self, url: &str) -> StorageResult<Vec<u8>> {
        let name = filename_from_public_url(url)
            .filter(|name| is_safe_filename(name))
            .ok_or_else(|| StorageError::invalid_key(url))?;
        let path = self.uploads_root.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::not_found(url)),
            Err(e) => Err(e.into()),
        }
    }

    fn map_request_error(&self, url: &str, error: reqwest::Error) -> StorageError {
        if error.is_timeout() {
            warn!(url = %url, timeout_secs = self.timeout.as_secs(), "Garment fetch timed out");
            StorageError::FetchTimeout {
                url: url.to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            warn!(url = %url, error = %error, "Garment fetch failed");
            StorageError::fetch_failed(format!("{}: {}", url, error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(dir: &TempDir, timeout: Duration) -> GarmentFetcher {
        GarmentFetcher::new(timeout, dir.path()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_remote_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/shirt.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let bytes = fetcher(&dir, DEFAULT_FETCH_TIMEOUT)
            .fetch_bytes(&format!("{}/shirt.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/small.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 1024]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let f = fetcher(&dir, DEFAULT_FETCH_TIMEOUT).with_max_bytes(1024);

        let err = f.fetch_bytes(&format!("{}/huge.png", server.uri())).await.unwrap_err();
        assert!(matches!(err, StorageError::FetchFailed(_)), "got {:?}", err);
        assert!(err.is_upstream());

        // A body exactly at the cap is accepted
        let bytes = f.fetch_bytes(&format!("{}/small.png", server.uri())).await.unwrap();
        assert_eq!(bytes.len(), 1024);
    }

    #[tokio::test]
    async fn test_error_status_is_fetch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = fetcher(&dir, DEFAULT_FETCH_TIMEOUT)
            .fetch_bytes(&format!("{}/missing.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FetchFailed(_)));
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_slow_host_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let err = fetcher(&dir, Duration::from_millis(200))
            .fetch_bytes(&format!("{}/slow.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FetchTimeout { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_unreachable_host_fails() {
        let dir = TempDir::new().unwrap();
        // Port 9 (discard) is closed on test hosts
        let err = fetcher(&dir, Duration::from_secs(2))
            .fetch_bytes("http://127.0.0.1:9/shirt.png")
            .await
            .unwrap_err();
        assert!(err.is_upstream());
    }

    #[tokio::test]
    async fn test_local_upload_path() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join("shirt.png"), b"png").await.unwrap();

        let f = fetcher(&dir, DEFAULT_FETCH_TIMEOUT);
        assert_eq!(f.fetch_bytes("/uploads/shirt.png").await.unwrap(), b"png".to_vec());
        assert!(matches!(
            f.fetch_bytes("/uploads/ghost.png").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            f.fetch_bytes("/uploads/../secret").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_http_scheme() {
        let dir = TempDir::new().unwrap();
        let err = fetcher(&dir, DEFAULT_FETCH_TIMEOUT)
            .fetch_bytes("file:///etc/passwd")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::FetchFailed(_)));
    }
}
