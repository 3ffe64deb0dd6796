//! HTTP server for the LDIF upload service.
//!
//! # API Endpoints
//!
//! | Method | Path            | Description                               |
//! |--------|-----------------|-------------------------------------------|
//! | GET    | `/`             | Landing page (`index.html`)               |
//! | GET    | `/health`       | Health check                              |
//! | POST   | `/upload`       | Upload LDIF, download the converted CSV   |
//! | POST   | `/api/upload`   | Same as `/upload`                         |
//! | POST   | `/api/preview`  | Upload LDIF, get columns and first rows   |
//! | GET    | `/api/logs`     | SSE stream for real-time logs             |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, HeaderName, Method},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use uuid::Uuid;

use super::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use super::types::PreviewResponse;
use crate::config::{ServerConfig, DOWNLOAD_NAME};
use crate::error::{ConvertError, ServerError, ServerResult};
use crate::parser::parse_ldif_bytes;
use crate::transform::pipeline::{convert, Conversion, ConvertOptions};

const RECORD_COUNT_HEADER: HeaderName = HeaderName::from_static("x-record-count");

/// Fallback name when an upload name sanitizes to nothing.
const DEFAULT_UPLOAD_NAME: &str = "upload.ldif";

type SharedConfig = Arc<ServerConfig>;

/// An uploaded file pulled out of a multipart request
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Build the application router
pub fn build_router(config: ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            header::CONTENT_TYPE,
            header::CONTENT_DISPOSITION,
            RECORD_COUNT_HEADER,
        ]);

    let index = ServeFile::new(config.static_dir.join("index.html"));
    let assets = ServeDir::new(&config.static_dir);
    let body_limit = DefaultBodyLimit::max(config.max_upload_bytes);

    Router::new()
        .route_service("/", index)
        .nest_service("/static", assets)
        .route("/health", get(health))
        .route("/upload", post(upload_ldif))
        .route("/api/upload", post(upload_ldif))
        .route("/api/preview", post(preview_ldif))
        .route("/api/logs", get(sse_logs))
        .layer(body_limit)
        .layer(cors)
        .with_state(Arc::new(config))
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 ldif2csv server running on http://localhost:{}", config.port);
    println!("   GET  /            - Upload page");
    println!("   POST /upload      - Convert LDIF file to CSV");
    println!("   POST /api/preview - Preview columns and records");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");
    println!();
    println!("📁 Uploads: {}", config.upload_dir.display());
    println!("📁 Outputs: {}", config.output_dir.display());
    println!("🔢 Suffix policy: {}", config.suffix_policy);

    let app = build_router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "ldif2csv",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /upload",
            "preview": "POST /api/preview",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload endpoint: stores the file, converts it, returns the CSV as a download
async fn upload_ldif(
    State(config): State<SharedConfig>,
    multipart: Multipart,
) -> ServerResult<Response> {
    let upload = read_upload(multipart).await?;
    let job_id = Uuid::new_v4();

    log_info(format!(
        "📄 New upload: {} ({} bytes, job {})",
        upload.file_name,
        upload.bytes.len(),
        job_id
    ));

    let upload_path = config
        .upload_dir
        .join(format!("{}-{}", job_id, sanitize_filename(&upload.file_name)));
    let output_path = config.output_dir.join(format!("{}.csv", job_id));

    ensure_dir(&config.upload_dir).await?;
    ensure_dir(&config.output_dir).await?;
    tokio::fs::write(&upload_path, &upload.bytes)
        .await
        .map_err(|e| internal(format!("Cannot store upload: {}", e)))?;

    let options = ConvertOptions {
        suffix_policy: config.suffix_policy,
    };
    let (input, output) = (upload_path.clone(), output_path.clone());
    let result = tokio::task::spawn_blocking(move || convert_or_discard(&input, &output, &options))
        .await
        .map_err(|e| internal(format!("Conversion task failed: {}", e)))?;

    if !config.keep_uploads {
        let _ = tokio::fs::remove_file(&upload_path).await;
    }

    let conversion = result.map_err(|e| {
        log_error(format!("Conversion failed: {}", e));
        ServerError::from(e)
    })?;

    let csv = tokio::fs::read(&output_path)
        .await
        .map_err(|e| internal(format!("Cannot read output: {}", e)))?;
    let _ = tokio::fs::remove_file(&output_path).await;

    log_success(format!(
        "Job {}: {} records converted",
        job_id, conversion.record_count
    ));

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", DOWNLOAD_NAME),
        ),
        (RECORD_COUNT_HEADER, conversion.record_count.to_string()),
    ];
    Ok((headers, csv).into_response())
}

/// Preview endpoint: parses in memory and returns the schema with the first records
async fn preview_ldif(
    State(config): State<SharedConfig>,
    multipart: Multipart,
) -> ServerResult<Json<PreviewResponse>> {
    let upload = read_upload(multipart).await?;
    log_info(format!("🔍 Preview: {} ({} bytes)", upload.file_name, upload.bytes.len()));

    let policy = config.suffix_policy;
    let parsed = tokio::task::spawn_blocking(move || parse_ldif_bytes(&upload.bytes, policy))
        .await
        .map_err(|e| internal(format!("Preview task failed: {}", e)))?
        .map_err(|e| ServerError::Convert(e.into()))?;

    Ok(Json(PreviewResponse::from(parsed)))
}

/// Pull the `file` field out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> ServerResult<Upload> {
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;

        upload = Some(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    let upload = upload.ok_or_else(|| ServerError::BadRequest("No file part".to_string()))?;
    if upload.file_name.is_empty() {
        return Err(ServerError::BadRequest("No selected file".to_string()));
    }
    Ok(upload)
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Path separators and whitespace become `_`, anything outside
/// `[A-Za-z0-9._-]` is dropped, leading/trailing `.` and `_` are trimmed.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');

    if trimmed.is_empty() {
        DEFAULT_UPLOAD_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

async fn ensure_dir(dir: &Path) -> ServerResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| internal(format!("Cannot create {}: {}", dir.display(), e)))
}

/// Run [`convert`], removing whatever it left at `output` if it fails.
fn convert_or_discard(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    convert(input, output, options).map_err(|e| {
        let _ = std::fs::remove_file(output);
        e
    })
}

fn internal(message: String) -> ServerError {
    log_error(&message);
    ServerError::Internal(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "ldif2csv-test-boundary";

    fn test_config(dir: &TempDir) -> ServerConfig {
        ServerConfig {
            upload_dir: dir.path().join("uploads"),
            output_dir: dir.path().join("outputs"),
            static_dir: dir.path().join("static"),
            ..ServerConfig::default()
        }
    }

    fn multipart_request(uri: &str, field: &str, file_name: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{content}\r\n--{b}--\r\n",
            b = BOUNDARY,
        );
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn dir_entries(path: &Path) -> usize {
        std::fs::read_dir(path).map(|d| d.count()).unwrap_or(0)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("export.ldif"), "export.ldif");
        assert_eq!(sanitize_filename("my export (1).ldif"), "my_export_1.ldif");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\dir.ldif"), "C_Users_me_dir.ldif");
        assert_eq!(sanitize_filename("..."), DEFAULT_UPLOAD_NAME);
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let router = build_router(test_config(&dir));

        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_index_page_is_served() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        std::fs::create_dir_all(&config.static_dir).unwrap();
        std::fs::write(config.static_dir.join("index.html"), "<h1>LDIF to CSV</h1>").unwrap();

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = build_router(config).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<h1>LDIF to CSV</h1>");
    }

    #[tokio::test]
    async fn test_upload_returns_csv_attachment() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let output_dir = config.output_dir.clone();
        let upload_dir = config.upload_dir.clone();

        let request = multipart_request(
            "/upload",
            "file",
            "people.ldif",
            "dn: cn=John Smith,cn=Jack\nmail: a@x.com\nmail: b@x.com\n",
        );
        let response = build_router(config).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"converted_output.csv\""
        );
        assert_eq!(response.headers()[RECORD_COUNT_HEADER], "1");
        assert_eq!(
            body_string(response).await,
            "cn1,cn2,mail1,mail2\r\nJohn Smith,Jack,a@x.com,b@x.com\r\n"
        );

        assert_eq!(dir_entries(&output_dir), 0);
        assert_eq!(dir_entries(&upload_dir), 1);
    }

    #[tokio::test]
    async fn test_upload_removed_when_not_kept() {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            keep_uploads: false,
            ..test_config(&dir)
        };
        let upload_dir = config.upload_dir.clone();

        let request = multipart_request("/api/upload", "file", "a.ldif", "dn: cn=A\n");
        let response = build_router(config).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(dir_entries(&upload_dir), 0);
    }

    #[test]
    fn test_failed_conversion_discards_output() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("job.csv");
        std::fs::write(&output, "cn1\r\npartial").unwrap();

        let err = convert_or_discard(
            &dir.path().join("missing.ldif"),
            &output,
            &ConvertOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ConvertError::Io { .. }));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_upload_without_file_part() {
        let dir = TempDir::new().unwrap();
        let request = multipart_request("/upload", "attachment", "a.ldif", "dn: cn=A\n");

        let response = build_router(test_config(&dir)).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"], "No file part");
    }

    #[tokio::test]
    async fn test_upload_with_empty_filename() {
        let dir = TempDir::new().unwrap();
        let request = multipart_request("/upload", "file", "", "");

        let response = build_router(test_config(&dir)).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["error"], "No selected file");
    }

    #[tokio::test]
    async fn test_preview() {
        let dir = TempDir::new().unwrap();
        let request = multipart_request(
            "/api/preview",
            "file",
            "a.ldif",
            "dn: cn=A\nsn: One\n\ndn: cn=B,ou=People\n",
        );

        let response = build_router(test_config(&dir)).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["recordCount"], 2);
        assert_eq!(json["columns"], json!(["cn1", "ou1", "sn1"]));
        assert_eq!(json["records"][0]["sn1"], "One");
    }
}
