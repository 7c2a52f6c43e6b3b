//! API integration tests.
//!
//! The router runs against a temp upload dir with fake pose and background
//! models, so no ONNX runtime is needed.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vtryon_api::{create_router, ApiConfig, AppState};
use vtryon_media::{BackgroundRemover, MediaResult, PoseEstimator, PoseSession};
use vtryon_models::{GarmentItem, Landmark, LandmarkName, PoseResult, ProcessingMode};
use vtryon_storage::JsonGarmentCatalog;

const BOUNDARY: &str = "vtryon-test-boundary";

/// Always reports the same pose and counts opened sessions.
struct FixedPose {
    result: PoseResult,
    sessions: AtomicUsize,
}

impl FixedPose {
    fn standing() -> Arc<Self> {
        let mut landmarks = BTreeMap::new();
        landmarks.insert(LandmarkName::LeftShoulder, Landmark::new(0.65, 0.3, 0.9));
        landmarks.insert(LandmarkName::RightShoulder, Landmark::new(0.35, 0.3, 0.9));
        landmarks.insert(LandmarkName::LeftHip, Landmark::new(0.62, 0.65, 0.9));
        landmarks.insert(LandmarkName::RightHip, Landmark::new(0.38, 0.65, 0.9));
        Arc::new(Self {
            result: PoseResult::from_landmarks(landmarks),
            sessions: AtomicUsize::new(0),
        })
    }

    fn nobody() -> Arc<Self> {
        Arc::new(Self {
            result: PoseResult::NotDetected,
            sessions: AtomicUsize::new(0),
        })
    }
}

struct FixedSession(PoseResult);

impl PoseSession for FixedSession {
    fn estimate(&mut self, _image: &RgbImage) -> MediaResult<PoseResult> {
        Ok(self.0.clone())
    }
}

impl PoseEstimator for FixedPose {
    fn open_session(&self, _mode: ProcessingMode) -> MediaResult<Box<dyn PoseSession>> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixedSession(self.result.clone())))
    }
}

/// Keeps every pixel; the garment fixtures already carry alpha.
struct PassThrough;

impl BackgroundRemover for PassThrough {
    fn remove_background(&self, image: &DynamicImage) -> MediaResult<RgbaImage> {
        Ok(image.to_rgba8())
    }
}

/// Records which directories hold live frames while the pose model runs.
struct FrameWatcher {
    inner: Arc<FixedPose>,
    dirs: Vec<PathBuf>,
    seen: Mutex<Vec<Vec<usize>>>,
}

impl PoseEstimator for FrameWatcher {
    fn open_session(&self, mode: ProcessingMode) -> MediaResult<Box<dyn PoseSession>> {
        let counts = self
            .dirs
            .iter()
            .map(|dir| files_with_prefix(dir, "live_frame_").len())
            .collect();
        self.seen.lock().unwrap().push(counts);
        self.inner.open_session(mode)
    }
}

struct TestApp {
    router: Router,
    dir: TempDir,
    scratch: TempDir,
}

impl TestApp {
    fn new(environment: &str, pose: Arc<FixedPose>, items: Vec<GarmentItem>) -> Self {
        Self::configured(pose, items, |config| config.environment = environment.to_string())
    }

    fn configured(
        pose: Arc<dyn PoseEstimator>,
        items: Vec<GarmentItem>,
        tweak: impl FnOnce(&mut ApiConfig),
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        std::fs::write(dir.path().join("me.png"), png(&user_photo())).unwrap();
        std::fs::write(dir.path().join("shirt.png"), png(&garment())).unwrap();

        let mut config = ApiConfig {
            upload_dir: dir.path().to_path_buf(),
            frame_scratch_dir: scratch.path().to_path_buf(),
            ..ApiConfig::default()
        };
        tweak(&mut config);
        let state = AppState::with_services(
            config,
            Arc::new(JsonGarmentCatalog::from_items(items)),
            pose,
            Arc::new(PassThrough),
        )
        .unwrap();

        Self {
            router: create_router(state, None),
            dir,
            scratch,
        }
    }

    fn standard(environment: &str) -> Self {
        Self::new(environment, FixedPose::standing(), vec![item(1, "/uploads/shirt.png")])
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    fn files_with_prefix(&self, prefix: &str) -> Vec<String> {
        files_with_prefix(self.dir.path(), prefix)
    }

    fn scratch_frames(&self) -> Vec<String> {
        files_with_prefix(self.scratch.path(), "live_frame_")
    }
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .filter(|name| name.starts_with(prefix))
        .collect()
}

fn item(id: i64, image_url: &str) -> GarmentItem {
    GarmentItem {
        id,
        name: format!("Item {}", id),
        image_url: Some(image_url.to_string()),
        brand: None,
        price: None,
    }
}

fn user_photo() -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 200, Rgb([90, 120, 150])))
}

fn garment() -> DynamicImage {
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 50, Rgba([200, 30, 30, 255])))
}

fn png(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageOutputFormat::Png).unwrap();
    buf.into_inner()
}

fn jpeg(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut buf, ImageOutputFormat::Jpeg(80))
        .unwrap();
    buf.into_inner()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart part: field name, optional file name, content.
type Part<'a> = (&'a str, Option<&'a str>, &'a [u8]);

/// Multipart request arriving from TCP peer `peer_ip`.
fn multipart_request(uri: &str, peer_ip: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, content) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes());
            }
        }
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let peer = SocketAddr::new(peer_ip.parse().unwrap(), 40000);
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .extension(ConnectInfo(peer))
        .body(Body::from(body))
        .unwrap()
}

fn live_request(peer_ip: &str, frame: &[u8], item_id: &str) -> Request<Body> {
    multipart_request(
        "/api/live-tryon",
        peer_ip,
        &[("frame", Some("frame.jpg"), frame), ("clothingItemId", None, item_id.as_bytes())],
    )
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::standard("development");

    let (status, headers, body) = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert!(headers.contains_key("x-request-id"));

    let (status, _, body) = app
        .send(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["checks"]["uploadDir"]["status"], "ok");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::standard("development");
    let (_, headers, _) = app
        .send(
            Request::builder()
                .uri("/healthz")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(headers.get("x-request-id").unwrap(), "abc-123");
}

#[tokio::test]
async fn test_tryon_success_writes_result() {
    let app = TestApp::standard("development");

    let (status, _, body) = app
        .send(json_request(
            "/api/tryon",
            serde_json::json!({"userImageFilename": "me.png", "clothingItemId": 1}),
        ))
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Virtual try-on completed successfully");
    let url = body["resultImageUrl"].as_str().unwrap();
    assert!(url.starts_with("/uploads/tryon_result_"));
    assert!(url.ends_with(".png"));

    let name = url.trim_start_matches("/uploads/");
    let result = image::open(app.dir.path().join(name)).unwrap();
    // Output keeps the user photo dimensions
    assert_eq!((result.width(), result.height()), (120, 200));

    // The stored result is served back
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(url).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tryon_with_direct_url() {
    let app = TestApp::standard("production");
    let (status, _, body) = app
        .send(json_request(
            "/api/tryon",
            serde_json::json!({"userImageFilename": "me.png", "clothingImageUrl": "/uploads/shirt.png"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn test_tryon_missing_fields() {
    let app = TestApp::standard("development");

    let (status, _, body) = app
        .send(json_request("/api/tryon", serde_json::json!({"clothingItemId": 1})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "userImageFilename is required");
    assert_eq!(body["code"], "validation");
    assert_eq!(body["stage"], "validate");

    let (status, _, body) = app
        .send(json_request("/api/tryon", serde_json::json!({"userImageFilename": "me.png"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Either clothingImageUrl or clothingItemId is required");
}

#[tokio::test]
async fn test_tryon_not_found() {
    let app = TestApp::standard("development");

    let (status, _, body) = app
        .send(json_request(
            "/api/tryon",
            serde_json::json!({"userImageFilename": "nobody.png", "clothingItemId": 1}),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["stage"], "validate");

    let (status, _, body) = app
        .send(json_request(
            "/api/tryon",
            serde_json::json!({"userImageFilename": "me.png", "clothingItemId": 99}),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Clothing item 99 not found");
    assert_eq!(body["stage"], "resolve_garment");
}

#[tokio::test]
async fn test_tryon_pose_not_detected() {
    let app = TestApp::new("development", FixedPose::nobody(), vec![item(1, "/uploads/shirt.png")]);

    let (status, _, body) = app
        .send(json_request(
            "/api/tryon",
            serde_json::json!({"userImageFilename": "me.png", "clothingItemId": 1}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Could not detect a person in the image");
    assert_eq!(body["stage"], "detect_pose");
    assert!(app.files_with_prefix("tryon_result_").is_empty());
}

#[tokio::test]
async fn test_tryon_blocks_internal_urls_outside_development() {
    let app = TestApp::standard("production");
    let (status, _, body) = app
        .send(json_request(
            "/api/tryon",
            serde_json::json!({"userImageFilename": "me.png", "clothingImageUrl": "http://169.254.169.254/x.png"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["stage"], "resolve_garment");
}

#[tokio::test]
async fn test_live_tryon_success_and_session_per_frame() {
    let pose = FixedPose::standing();
    let app = TestApp::new("development", Arc::clone(&pose), vec![item(1, "/uploads/shirt.png")]);
    let frame = jpeg(&user_photo());

    for _ in 0..2 {
        let (status, _, body) = app.send(live_request("203.0.113.5", &frame, "1")).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(body["message"], "Live try-on frame processed");
        assert!(body["resultImageUrl"].as_str().unwrap().starts_with("/uploads/live_result_"));
        assert!(body["processingTimeMs"].is_u64());
    }

    assert_eq!(pose.sessions.load(Ordering::SeqCst), 2);
    assert_eq!(app.files_with_prefix("live_result_").len(), 2);
    assert!(app.files_with_prefix("live_frame_").is_empty());
    assert!(app.scratch_frames().is_empty());
}

#[tokio::test]
async fn test_live_tryon_sixth_frame_rate_limited() {
    let app = TestApp::standard("development");
    let frame = jpeg(&user_photo());

    for i in 0..5 {
        let (status, _, body) = app.send(live_request("203.0.113.9", &frame, "1")).await;
        assert_eq!(status, StatusCode::OK, "request {} failed: {}", i + 1, body);
    }

    let (status, headers, body) = app.send(live_request("203.0.113.9", &frame, "1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers.get(header::RETRY_AFTER).unwrap(), "2");
    assert_eq!(body["code"], "rate_limited");

    // Another client is unaffected
    let (status, _, _) = app.send(live_request("203.0.113.10", &frame, "1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_live_tryon_keys_on_peer_not_forwarded_for() {
    let app = TestApp::standard("development");
    let frame = jpeg(&user_photo());

    // A client rotating X-Forwarded-For still shares one budget
    for i in 1..=6 {
        let mut request = live_request("203.0.113.60", &frame, "1");
        request
            .headers_mut()
            .insert("x-forwarded-for", format!("198.51.100.{}", i).parse().unwrap());
        let (status, _, body) = app.send(request).await;
        if i <= 5 {
            assert_eq!(status, StatusCode::OK, "request {} failed: {}", i, body);
        } else {
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        }
    }
}

#[tokio::test]
async fn test_live_tryon_behind_trusted_proxy() {
    let proxy: IpAddr = "10.0.0.1".parse().unwrap();
    let app = TestApp::configured(FixedPose::standing(), vec![item(1, "/uploads/shirt.png")], |config| {
        config.trusted_proxies = vec![proxy]
    });
    let frame = jpeg(&user_photo());
    let via_proxy = |client: &str| {
        let mut request = live_request("10.0.0.1", &frame, "1");
        request.headers_mut().insert("x-forwarded-for", client.parse().unwrap());
        request
    };

    for _ in 0..5 {
        let (status, _, body) = app.send(via_proxy("198.51.100.7")).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }
    let (status, _, _) = app.send(via_proxy("198.51.100.7")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Clients behind the same proxy get their own budget
    let (status, _, _) = app.send(via_proxy("198.51.100.8")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_live_tryon_malformed_requests_spend_no_budget() {
    let app = TestApp::standard("development");
    let frame = jpeg(&user_photo());

    for _ in 0..5 {
        let (status, _, _) = app.send(live_request("203.0.113.70", &frame, "abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    for i in 0..5 {
        let (status, _, body) = app.send(live_request("203.0.113.70", &frame, "1")).await;
        assert_eq!(status, StatusCode::OK, "request {} failed: {}", i + 1, body);
    }

    // Well-formed requests missing a field are counted
    let request = multipart_request("/api/live-tryon", "203.0.113.70", &[("frame", Some("f.jpg"), frame.as_slice())]);
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_live_frames_are_staged_outside_uploads() {
    let scratch = TempDir::new().unwrap();
    let uploads = TempDir::new().unwrap();
    let watcher = Arc::new(FrameWatcher {
        inner: FixedPose::standing(),
        dirs: vec![scratch.path().to_path_buf(), uploads.path().to_path_buf()],
        seen: Mutex::new(Vec::new()),
    });
    let upload_dir = uploads.path().to_path_buf();
    let scratch_dir = scratch.path().to_path_buf();
    let app = TestApp::configured(
        Arc::clone(&watcher) as Arc<dyn PoseEstimator>,
        vec![item(1, "/uploads/shirt.png")],
        move |config| {
            config.upload_dir = upload_dir;
            config.frame_scratch_dir = scratch_dir;
        },
    );
    std::fs::write(uploads.path().join("shirt.png"), png(&garment())).unwrap();

    let (status, _, body) = app.send(live_request("203.0.113.80", &jpeg(&user_photo()), "1")).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    // While the model ran the frame was in scratch, never under /uploads
    assert_eq!(*watcher.seen.lock().unwrap(), vec![vec![1, 0]]);
    assert!(files_with_prefix(scratch.path(), "live_frame_").is_empty());
    assert_eq!(files_with_prefix(uploads.path(), "live_result_").len(), 1);
}

#[tokio::test]
async fn test_live_tryon_upstream_failure_cleans_temp_frame() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let app = TestApp::new(
        "development",
        FixedPose::standing(),
        vec![item(2, &format!("{}/broken.png", server.uri()))],
    );

    let (status, _, body) = app
        .send(live_request("203.0.113.20", &jpeg(&user_photo()), "2"))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "upstream");
    assert_eq!(body["stage"], "resolve_garment");
    assert!(app.files_with_prefix("live_frame_").is_empty());
    assert!(app.scratch_frames().is_empty());
    assert!(app.files_with_prefix("live_result_").is_empty());
}

#[tokio::test]
async fn test_live_tryon_validation() {
    let app = TestApp::standard("development");

    let request = multipart_request("/api/live-tryon", "203.0.113.30", &[("clothingItemId", None, &b"1"[..])]);
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No frame provided");

    let frame = jpeg(&user_photo());
    let request = multipart_request("/api/live-tryon", "203.0.113.31", &[("frame", Some("f.jpg"), frame.as_slice())]);
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "clothingItemId is required");

    let (status, _, _) = app.send(live_request("203.0.113.32", &frame, "abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_remove_background() {
    let app = TestApp::standard("development");

    let (status, _, body) = app
        .send(json_request("/api/remove-bg", serde_json::json!({"imageUrl": "/uploads/shirt.png"})))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["resultImageUrl"].as_str().unwrap().starts_with("/uploads/nobg_"));

    let (status, _, body) = app.send(json_request("/api/remove-bg", serde_json::json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "imageUrl is required");
}

#[tokio::test]
async fn test_remove_background_failures_are_internal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let app = TestApp::standard("development");

    let (status, _, body) = app
        .send(json_request(
            "/api/remove-bg",
            serde_json::json!({"imageUrl": format!("{}/gone.png", server.uri())}),
        ))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "internal");
}

#[tokio::test]
async fn test_clear_cache_forbidden_in_production() {
    let app = TestApp::standard("production");

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/clear-cache")
        .header("x-forwarded-for", "127.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");

    // A loopback peer is allowed
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/admin/clear-cache")
        .body(Body::empty())
        .unwrap();
    let peer: SocketAddr = "127.0.0.1:51000".parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_clear_cache_reports_counts() {
    let app = TestApp::standard("development");
    let frame = jpeg(&user_photo());
    let (status, _, _) = app.send(live_request("203.0.113.40", &frame, "1")).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/clear-cache")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Caches cleared");
    assert_eq!(body["clearedCacheEntries"], 1);
    assert_eq!(body["clearedClients"], 1);
}

#[tokio::test]
async fn test_upload() {
    let app = TestApp::standard("development");
    let photo = png(&user_photo());

    let request = multipart_request("/api/upload", "203.0.113.50", &[("file", Some("Me.PNG"), photo.as_slice())]);
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.starts_with("upload_") && filename.ends_with(".png"));
    assert_eq!(body["url"], format!("/uploads/{}", filename));
    assert!(app.dir.path().join(filename).exists());

    let request = multipart_request("/api/upload", "203.0.113.50", &[("file", Some("run.exe"), &b"MZ"[..])]);
    let (status, _, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = multipart_request("/api/upload", "203.0.113.50", &[("other", None, &b"x"[..])]);
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
}

#[tokio::test]
async fn test_upload_larger_than_multipart_default_limit() {
    let app = TestApp::standard("development");
    let photo = vec![0xA5u8; 3 * 1024 * 1024];

    let request = multipart_request("/api/upload", "203.0.113.51", &[("file", Some("big.jpg"), photo.as_slice())]);
    let (status, _, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let filename = body["filename"].as_str().unwrap();
    let stored = std::fs::metadata(app.dir.path().join(filename)).unwrap();
    assert_eq!(stored.len(), photo.len() as u64);
}
