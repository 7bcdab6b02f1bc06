//! API integration tests.
//!
//! The classification backend and camera devices are wiremock servers; the
//! router is driven in-process with `oneshot`.

use std::io::Cursor;
use std::time::Duration;

use agrisave_api::{create_router, ApiConfig, AppState};
use agrisave_classifier::ClassifierConfig;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BOUNDARY: &str = "agrisave-test-boundary";

fn moderate_body() -> Value {
    json!({
        "class": "moderate",
        "confidence": 0.77,
        "metrics": {
            "green_ratio": 0.41,
            "yellow_ratio": 0.22,
            "brown_ratio": 0.08,
            "stress_ratio": 0.3,
            "pixels": 40000
        }
    })
}

async fn classifier_backend(delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(moderate_body())
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    server
}

fn test_config(backend: &MockServer) -> ApiConfig {
    ApiConfig {
        classifier: ClassifierConfig::with_base_url(backend.uri()),
        ..ApiConfig::default()
    }
}

fn create_test_router(config: ApiConfig) -> (Router, AppState) {
    let state = AppState::new(config).expect("app state");
    (create_router(state.clone(), None), state)
}

fn multipart_body(filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(filename, "image/jpeg", bytes)))
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_surface(app: &Router) -> String {
    let response = send(app, json_request(Method::POST, "/api/surfaces", json!({}))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["phase"], "idle");
    body["id"].as_str().unwrap().to_string()
}

fn png_frame() -> Vec<u8> {
    let frame = image::DynamicImage::ImageRgb8(image::RgbImage::new(32, 24));
    let mut buf = Cursor::new(Vec::new());
    frame.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
    buf.into_inner()
}

/// Test health endpoints and response headers.
#[tokio::test]
async fn test_health_endpoint() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));

    let response = send(&app, empty_request(Method::GET, "/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));

    let response = send(
        &app,
        Request::builder()
            .uri("/healthz")
            .header("X-Request-ID", "req-42")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

/// Test readiness against a live and a missing backend.
#[tokio::test]
async fn test_ready_endpoint() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));

    let response = send(&app, empty_request(Method::GET, "/ready")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["camera"]["status"], "ok");

    let config = ApiConfig {
        classifier: ClassifierConfig::with_base_url("http://127.0.0.1:9"),
        ..ApiConfig::default()
    };
    let (app, _) = create_test_router(config);
    let response = send(&app, empty_request(Method::GET, "/ready")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(read_json(response).await["status"], "degraded");
}

/// Metrics are not routed without a recorder handle.
#[tokio::test]
async fn test_metrics_endpoint_disabled() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));

    let response = send(&app, empty_request(Method::GET, "/metrics")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test farmer login, language toggle and logout.
#[tokio::test]
async fn test_session_lifecycle() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));

    let response = send(
        &app,
        json_request(Method::POST, "/api/session", json!({"name": "  ", "location": "Pune"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/session",
            json!({"name": "Asha", "location": "Pune"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json(response).await;
    assert_eq!(body["greeting"], "Welcome, Asha (Pune)");
    assert_eq!(body["labels"]["farmer_login"], "Farmer Login");
    let id = body["id"].as_str().unwrap().to_string();

    let response = send(
        &app,
        json_request(
            Method::PATCH,
            &format!("/api/session/{}", id),
            json!({"toggle_language": true}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["language"], "hi");
    assert_eq!(body["labels"]["farmer_login"], "किसान लॉगिन");

    let uri = format!("/api/session/{}", id);
    let response = send(&app, empty_request(Method::DELETE, &uri)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = send(&app, empty_request(Method::GET, &uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test upload then analyze renders the display fields.
#[tokio::test]
async fn test_upload_and_analyze() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));
    let id = create_surface(&app).await;

    let response = send(
        &app,
        multipart_request(&format!("/api/surfaces/{}/upload", id), "leaf.jpg", b"leaf-bytes"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["phase"], "ready");
    assert_eq!(body["image"]["filename"], "leaf.jpg");
    assert!(body["preview_url"].as_str().unwrap().starts_with("/api/previews/"));

    let response = send(
        &app,
        empty_request(Method::POST, &format!("/api/surfaces/{}/analyze", id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["phase"], "result");
    assert_eq!(body["result"]["confidence_display"], "77.0%");
    assert_eq!(body["result"]["class_label"], "MODERATE");
    assert_eq!(body["result"]["raw"]["confidence"], 0.77);
}

/// Analyzing with nothing staged is a client error.
#[tokio::test]
async fn test_analyze_without_image() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));
    let id = create_surface(&app).await;

    let response = send(
        &app,
        empty_request(Method::POST, &format!("/api/surfaces/{}/analyze", id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["code"], "invalid_transition");
}

/// Test a remote snapshot is probed across candidate paths and classified.
#[tokio::test]
async fn test_remote_snapshot_end_to_end() {
    let device = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cam-hi.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(b"esp32-still-bytes".to_vec()),
        )
        .mount(&device)
        .await;

    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .and(body_string_contains("esp32-still-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(moderate_body()))
        .expect(1)
        .mount(&backend)
        .await;

    let (app, _) = create_test_router(test_config(&backend));
    let id = create_surface(&app).await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            &format!("/api/surfaces/{}/remote?analyze=true", id),
            json!({"url": device.uri()}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["phase"], "result");
    assert_eq!(body["source"]["kind"], "remote_snapshot");
    assert_eq!(body["image"]["filename"], "esp32.jpg");
    assert_eq!(body["result"]["class_label"], "MODERATE");

    let probed: Vec<String> = device
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.url.path().to_string())
        .collect();
    assert_eq!(probed, vec!["/", "/capture", "/jpg", "/snapshot", "/cam-hi.jpg"]);
}

/// An unreachable device leaves the surface in the error phase.
#[tokio::test]
async fn test_remote_snapshot_failure_shown_on_surface() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));
    let id = create_surface(&app).await;

    let response = send(
        &app,
        json_request(
            Method::POST,
            &format!("/api/surfaces/{}/remote", id),
            json!({"url": "http://127.0.0.1:9"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["phase"], "error");
    assert_eq!(body["error"]["kind"], "network_failure");
}

/// Test teardown revokes the preview and removes the surface.
#[tokio::test]
async fn test_teardown_revokes_preview() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, state) = create_test_router(test_config(&backend));
    let id = create_surface(&app).await;

    let response = send(
        &app,
        multipart_request(&format!("/api/surfaces/{}/upload", id), "leaf.png", b"leaf"),
    )
    .await;
    let preview_url = read_json(response).await["preview_url"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send(&app, empty_request(Method::GET, &preview_url)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");

    let uri = format!("/api/surfaces/{}", id);
    let response = send(&app, empty_request(Method::DELETE, &uri)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, empty_request(Method::GET, &preview_url)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&app, empty_request(Method::GET, &uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.previews.len().await, 0);
}

/// Test a detached analysis reports busy and rejects further work.
#[tokio::test]
async fn test_analyze_without_waiting() {
    let backend = classifier_backend(Duration::from_millis(500)).await;
    let (app, _) = create_test_router(test_config(&backend));
    let id = create_surface(&app).await;

    send(
        &app,
        multipart_request(&format!("/api/surfaces/{}/upload", id), "leaf.jpg", b"leaf"),
    )
    .await;

    let response = send(
        &app,
        empty_request(Method::POST, &format!("/api/surfaces/{}/analyze?wait=false", id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(read_json(response).await["phase"], "busy");

    let response = send(
        &app,
        multipart_request(&format!("/api/surfaces/{}/upload", id), "other.jpg", b"other"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let response = send(&app, empty_request(Method::GET, &format!("/api/surfaces/{}", id))).await;
    assert_eq!(read_json(response).await["phase"], "result");
}

/// Test the relay camera: frame push, capture and idempotent stop.
#[tokio::test]
async fn test_camera_capture_flow() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));
    let id = create_surface(&app).await;

    let response = send(
        &app,
        Request::builder()
            .method(Method::PUT)
            .uri("/api/camera/frame")
            .body(Body::from(png_frame()))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(
        &app,
        empty_request(Method::POST, &format!("/api/surfaces/{}/camera/start", id)),
    )
    .await;
    assert_eq!(read_json(response).await["camera"], "on");

    let response = send(
        &app,
        empty_request(Method::POST, &format!("/api/surfaces/{}/camera/capture", id)),
    )
    .await;
    let body = read_json(response).await;
    assert_eq!(body["phase"], "ready");
    assert_eq!(body["image"]["filename"], "frame.jpg");
    assert_eq!(body["image"]["mime_type"], "image/jpeg");

    let stop = format!("/api/surfaces/{}/camera/stop", id);
    let body = read_json(send(&app, empty_request(Method::POST, &stop)).await).await;
    assert_eq!(body["stopped_tracks"], 1);
    assert_eq!(body["camera"], "off");
    let body = read_json(send(&app, empty_request(Method::POST, &stop)).await).await;
    assert_eq!(body["stopped_tracks"], 0);
}

/// Garbage frames from the relay are rejected.
#[tokio::test]
async fn test_push_invalid_frame() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));

    for body in [Vec::new(), b"not an image".to_vec()] {
        let response = send(
            &app,
            Request::builder()
                .method(Method::PUT)
                .uri("/api/camera/frame")
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

/// A disabled camera is refused and the refusal is shown on the surface.
#[tokio::test]
async fn test_camera_disabled() {
    let backend = classifier_backend(Duration::ZERO).await;
    let mut config = test_config(&backend);
    config.capture.camera_enabled = false;
    let (app, _) = create_test_router(config);
    let id = create_surface(&app).await;

    let response = send(
        &app,
        empty_request(Method::POST, &format!("/api/surfaces/{}/camera/start", id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["camera"], "off");
    assert_eq!(body["error"]["kind"], "permission_denied");
}

/// Test one-shot classification.
#[tokio::test]
async fn test_classify_endpoint() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));

    let response = send(&app, multipart_request("/api/classify", "leaf.jpg", b"leaf")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["class"], "moderate");
    assert_eq!(body["confidence_display"], "77.0%");
}

/// Backend errors surface as a bad gateway.
#[tokio::test]
async fn test_classify_backend_error() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&backend)
        .await;
    let (app, _) = create_test_router(test_config(&backend));

    let response = send(&app, multipart_request("/api/classify", "leaf.jpg", b"leaf")).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = read_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("model not loaded"));
}

/// Test labels follow the requested language.
#[tokio::test]
async fn test_surface_labels_language() {
    let backend = classifier_backend(Duration::ZERO).await;
    let (app, _) = create_test_router(test_config(&backend));
    let id = create_surface(&app).await;

    let response = send(
        &app,
        empty_request(Method::GET, &format!("/api/surfaces/{}?lang=hi", id)),
    )
    .await;
    let body = read_json(response).await;
    assert_eq!(body["language"], "hi");
    assert_eq!(body["labels"]["camera_off"], "कैमरा बंद है");

    let response = send(
        &app,
        empty_request(Method::GET, &format!("/api/surfaces/{}?lang=fr", id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Test rate limiting per client IP.
#[tokio::test]
async fn test_rate_limiting() {
    let backend = classifier_backend(Duration::ZERO).await;
    let mut config = test_config(&backend);
    config.rate_limit_rps = 2;
    let (app, _) = create_test_router(config);

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let response = send(
            &app,
            Request::builder()
                .method(Method::POST)
                .uri("/api/surfaces")
                .header("X-Forwarded-For", "192.168.1.100")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        statuses.push(response.status());
    }

    assert_eq!(statuses[2], StatusCode::TOO_MANY_REQUESTS);

    // Health probes are never limited
    let response = send(&app, empty_request(Method::GET, "/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
}
