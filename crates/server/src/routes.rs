//! Routes and handlers

use crate::error::AppError;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::header,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use core_pipeline::{OcrResponse, OcrService, PipelineError};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

const JSON_UTF8: &str = "application/json; charset=utf-8";

pub struct AppState {
    pub service: OcrService,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ocr_file", post(ocr_file))
        .route("/ocr", post(ocr_base64))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Run a recognition on the blocking pool; the engine is CPU-bound
async fn run_blocking<F>(state: Arc<AppState>, job: F) -> Result<OcrResponse, AppError>
where
    F: FnOnce(&OcrService) -> core_pipeline::Result<OcrResponse> + Send + 'static,
{
    tokio::task::spawn_blocking(move || job(&state.service))
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))?
        .map_err(AppError::from)
}

fn json_utf8(body: OcrResponse) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, JSON_UTF8)], Json(body))
}

async fn ocr_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
            upload = Some((filename, data));
            break;
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::BadRequest("Missing multipart field 'file'".to_string()))?;

    tracing::info!(filename = %filename, bytes = data.len(), "Received upload");

    let response = run_blocking(state, move |service| {
        service.recognize_upload(&filename, &data)
    })
    .await?;

    Ok(json_utf8(response))
}

#[derive(Debug, Deserialize)]
struct OcrRequest {
    image_base64: String,
}

async fn ocr_base64(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OcrRequest>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(chars = request.image_base64.len(), "Received base64 image");

    let response = run_blocking(state, move |service| {
        service.recognize_base64(&request.image_base64)
    })
    .await?;

    Ok(json_utf8(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use base64::{engine::general_purpose, Engine as _};
    use core_pipeline::{
        rect_quad, Detection, RecognitionParams, ServiceConfig, TextArtifactMode, TextRecognizer,
    };
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::path::Path;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "textlens-test-boundary";

    struct FakeRecognizer;

    impl TextRecognizer for FakeRecognizer {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn languages(&self) -> Vec<String> {
            vec!["eng".to_string()]
        }

        fn read_text(
            &self,
            _: &DynamicImage,
            _: &RecognitionParams,
        ) -> core_pipeline::Result<Vec<Detection>> {
            Ok(vec![
                Detection::new(rect_quad(2.0, 2.0, 10.0, 5.0), "ghost", 0.05),
                Detection::new(rect_quad(2.0, 12.0, 20.0, 5.0), "สวัสดี", 0.9),
            ])
        }
    }

    fn app(mode: TextArtifactMode) -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let config = ServiceConfig {
            data_dir: dir.path().to_path_buf(),
            text_mode: mode,
            font: Some(dir.path().join("missing.ttf")),
            ..ServiceConfig::default()
        };
        let service = OcrService::with_engine(Arc::new(FakeRecognizer), &config).unwrap();
        let state = Arc::new(AppState { service });
        (dir, router(state, 1024 * 1024))
    }

    fn png_bytes() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(32, 24, Rgb([250u8, 250, 250]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri("/ocr_file")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/ocr")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (_dir, app) = app(TextArtifactMode::Timestamped);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_ocr_file_returns_confident_text_and_paths() {
        let (dir, app) = app(TextArtifactMode::Timestamped);
        let response = app
            .oneshot(multipart_request("file", "scan.png", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            JSON_UTF8
        );

        let json = body_json(response).await;
        assert_eq!(json["text"], "สวัสดี");
        let original = json["original_file"].as_str().unwrap();
        assert!(original.ends_with("_scan.png"));
        assert!(Path::new(original).exists());
        assert!(Path::new(json["debug_file"].as_str().unwrap()).exists());
        assert!(json["text_file"].as_str().unwrap().ends_with(".txt"));
        assert_eq!(count_files(&dir.path().join("outputs")), 1);
    }

    #[tokio::test]
    async fn test_ocr_file_non_image_is_server_error() {
        let (dir, app) = app(TextArtifactMode::Timestamped);
        let response = app
            .oneshot(multipart_request("file", "notes.txt", b"plain text, not pixels"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["detail"].as_str().unwrap().contains("decode"));
        // Raw upload stays, no debug image
        assert_eq!(count_files(&dir.path().join("uploads")), 1);
        assert_eq!(count_files(&dir.path().join("outputs")), 0);
    }

    #[tokio::test]
    async fn test_ocr_file_missing_field() {
        let (_dir, app) = app(TextArtifactMode::Timestamped);
        let response = app
            .oneshot(multipart_request("image", "scan.png", &png_bytes()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["detail"].as_str().unwrap().contains("file"));
    }

    #[tokio::test]
    async fn test_ocr_base64_success() {
        let (_dir, app) = app(TextArtifactMode::Timestamped);
        let payload = general_purpose::STANDARD.encode(png_bytes());
        let response = app
            .oneshot(json_request(serde_json::json!({ "image_base64": payload })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            JSON_UTF8
        );
        let json = body_json(response).await;
        assert_eq!(json["text"], "สวัสดี");
        assert!(json["original_file"]
            .as_str()
            .unwrap()
            .ends_with("_base64.png"));
    }

    #[tokio::test]
    async fn test_ocr_base64_invalid_is_client_error_without_artifacts() {
        let (dir, app) = app(TextArtifactMode::Timestamped);
        let response = app
            .oneshot(json_request(
                serde_json::json!({ "image_base64": "!!not-base64!!" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(count_files(&dir.path().join("uploads")), 0);
        assert_eq!(count_files(&dir.path().join("outputs")), 0);
        assert_eq!(count_files(&dir.path().join("texts")), 0);
    }

    #[tokio::test]
    async fn test_ocr_base64_missing_field_is_rejected() {
        let (_dir, app) = app(TextArtifactMode::Timestamped);
        let response = app
            .oneshot(json_request(serde_json::json!({ "image": "abcd" })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_shared_json_overwritten_by_latest_request() {
        let (dir, app) = app(TextArtifactMode::SharedJson);
        let payload = general_purpose::STANDARD.encode(png_bytes());

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(json_request(serde_json::json!({ "image_base64": payload })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json = body_json(response).await;
            assert!(json["text_file"]
                .as_str()
                .unwrap()
                .ends_with("ocr_result.json"));
        }

        let shared = dir.path().join("texts").join("ocr_result.json");
        let stored: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(shared).unwrap()).unwrap();
        assert_eq!(stored, vec!["สวัสดี".to_string()]);
        assert_eq!(count_files(&dir.path().join("texts")), 1);
    }
}
