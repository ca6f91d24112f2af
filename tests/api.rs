//! HTTP-level tests for `/extract-text` and `/health`.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`. PDF,
//! OCR and LLM collaborators are fakes, so these tests need neither pdfium,
//! tesseract nor an API key.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use image::DynamicImage;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use syllabus_analyzer::{
    router, AnalysisService, AppState, ExtractionError, Extractor, OcrEngine, PageVisitor,
    PdfBackend, ServerConfig, SyllabusAnalyzer, SyllabusError,
};
use tempfile::TempDir;
use tower::ServiceExt;

// ── Fakes ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakePdf {
    text: String,
    calls: AtomicUsize,
}

impl PdfBackend for FakePdf {
    fn page_texts(&self, _: &Path) -> Result<Vec<String>, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![self.text.clone()])
    }

    fn render_pages(
        &self,
        _: &Path,
        visit: &mut PageVisitor<'_>,
    ) -> Result<(), ExtractionError> {
        visit(0, DynamicImage::new_luma8(4, 4))
    }
}

#[derive(Default)]
struct FakeOcr {
    calls: AtomicUsize,
}

impl OcrEngine for FakeOcr {
    fn recognize(&self, _: &DynamicImage) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(String::new())
    }
}

/// Replies with a fixed string (or fails) and records the text it was sent.
struct FakeAnalyzer {
    reply: Option<String>,
    seen: Mutex<Vec<String>>,
}

impl FakeAnalyzer {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl SyllabusAnalyzer for FakeAnalyzer {
    async fn analyze(&self, normalized_text: &str) -> Result<String, SyllabusError> {
        self.seen.lock().unwrap().push(normalized_text.to_string());
        self.reply
            .clone()
            .ok_or_else(|| SyllabusError::LlmInvocation {
                message: "upstream returned 503".to_string(),
            })
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

struct Harness {
    app: Router,
    pdf: Arc<FakePdf>,
    ocr: Arc<FakeOcr>,
    analyzer: Arc<FakeAnalyzer>,
    temp: TempDir,
}

impl Harness {
    fn new(analyzer: Arc<FakeAnalyzer>) -> Self {
        Self::with(analyzer, FakePdf::default(), unlimited())
    }

    fn with(analyzer: Arc<FakeAnalyzer>, pdf: FakePdf, config: ServerConfig) -> Self {
        let pdf = Arc::new(pdf);
        let ocr = Arc::new(FakeOcr::default());
        let temp = tempfile::tempdir().unwrap();

        let service = AnalysisService::new(
            Extractor::new(pdf.clone(), ocr.clone()),
            analyzer.clone(),
            Some(temp.path().to_path_buf()),
        );
        let app = router(AppState::new(service), &config);

        Self {
            app,
            pdf,
            ocr,
            analyzer,
            temp,
        }
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn staged_files(&self) -> usize {
        std::fs::read_dir(self.temp.path()).unwrap().count()
    }
}

fn unlimited() -> ServerConfig {
    ServerConfig::builder()
        .hourly_limit(0)
        .daily_limit(0)
        .build()
        .unwrap()
}

const BOUNDARY: &str = "syllabus-test-boundary";

/// Multipart body from `(field name, filename, bytes)` parts.
fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(f) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/extract-text")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn upload(filename: &str, bytes: &[u8]) -> Request<Body> {
    multipart(&[("file", Some(filename), bytes)])
}

const ANALYSIS: &str = r#"{"courseInfo": {"title": "CS101", "description": "", "courseCode": "CS101"}}"#;

// ── Success ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_upload_is_analyzed() {
    let h = Harness::new(FakeAnalyzer::replying(ANALYSIS));

    let (status, body) = h.send(upload("notes.txt", b"Course: CS101")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Course: CS101");
    assert_eq!(body["filename"], "notes.txt");
    assert_eq!(body["chars_extracted"], 13);
    let analyzed: Value = serde_json::from_str(body["analyzed"].as_str().unwrap()).unwrap();
    assert_eq!(analyzed["courseInfo"]["title"], "CS101");
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn analyzer_receives_normalized_text() {
    let h = Harness::new(FakeAnalyzer::replying(ANALYSIS));

    let (status, body) = h
        .send(upload("notes.md", "Prof. \"Ada\"  Lovelace\n\tRoom café 12".as_bytes()))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        h.analyzer.seen.lock().unwrap().as_slice(),
        ["Prof. 'Ada' Lovelace Room caf 12"]
    );
    // The response carries the text as extracted, not the prompt form.
    assert_eq!(body["text"], "Prof. \"Ada\"  Lovelace\n\tRoom café 12");
    assert_eq!(body["chars_extracted"], 35);
}

#[tokio::test]
async fn fenced_reply_is_repaired() {
    let h = Harness::new(FakeAnalyzer::replying("```json\n{\"a\": 1}\n```"));

    let (status, body) = h.send(upload("notes.txt", b"Week 1: intro")).await;

    assert_eq!(status, StatusCode::OK);
    let analyzed: Value = serde_json::from_str(body["analyzed"].as_str().unwrap()).unwrap();
    assert_eq!(analyzed, serde_json::json!({"a": 1}));
}

#[tokio::test]
async fn pdf_with_text_layer_skips_ocr() {
    let pdf = FakePdf {
        text: "Grading: exams 60%".to_string(),
        ..Default::default()
    };
    let h = Harness::with(FakeAnalyzer::replying(ANALYSIS), pdf, unlimited());

    let (status, body) = h.send(upload("Syllabus.PDF", b"%PDF-1.7 fake")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "Grading: exams 60%\n");
    assert_eq!(h.pdf.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 0);
}

// ── Input errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_is_bad_request() {
    let h = Harness::new(FakeAnalyzer::replying(ANALYSIS));

    let (status, body) = h.send(multipart(&[("comment", None, &b"hello"[..])])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, serde_json::json!({"error": "No file provided"}));
    assert_eq!(h.pdf.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.analyzer.calls(), 0);
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn file_field_without_filename_is_bad_request() {
    let h = Harness::new(FakeAnalyzer::replying(ANALYSIS));

    let (status, body) = h.send(multipart(&[("file", None, &b"Course: CS101"[..])])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");
    assert_eq!(h.analyzer.calls(), 0);
}

#[tokio::test]
async fn non_multipart_body_is_bad_request() {
    let h = Harness::new(FakeAnalyzer::replying(ANALYSIS));
    let req = Request::builder()
        .method("POST")
        .uri("/extract-text")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("Course: CS101"))
        .unwrap();

    let (status, body) = h.send(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid upload"));
    assert_eq!(h.analyzer.calls(), 0);
}

// ── Pipeline failures: 500 with filename, temp file removed ─────────────────

#[tokio::test]
async fn textless_pdf_with_blank_ocr_fails_extraction() {
    let h = Harness::new(FakeAnalyzer::replying(ANALYSIS));

    let (status, body) = h.send(upload("scan.pdf", b"%PDF-1.4 fake")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        serde_json::json!({"error": "No text extracted from PDF", "filename": "scan.pdf"})
    );
    assert_eq!(h.ocr.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.analyzer.calls(), 0);
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn invalid_utf8_fails_extraction() {
    let h = Harness::new(FakeAnalyzer::replying(ANALYSIS));

    let (status, body) = h.send(upload("notes.txt", &[0x43, 0xff, 0xfe])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("UTF-8"));
    assert_eq!(body["filename"], "notes.txt");
    assert_eq!(h.analyzer.calls(), 0);
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn whitespace_only_text_is_rejected_before_llm() {
    let h = Harness::new(FakeAnalyzer::replying(ANALYSIS));

    let (status, body) = h.send(upload("blank.txt", b"  \n\t ")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "No text extracted from text file");
    assert_eq!(h.analyzer.calls(), 0);
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn llm_failure_is_server_error() {
    let h = Harness::new(FakeAnalyzer::failing());

    let (status, body) = h.send(upload("notes.txt", b"Course: CS101")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "LLM request failed: upstream returned 503");
    assert_eq!(body["filename"], "notes.txt");
    assert_eq!(h.analyzer.calls(), 1);
    assert_eq!(h.staged_files(), 0);
}

/// Captures formatted log lines for the current thread.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl LogBuffer {
    fn lines_with(&self, level: &str, needle: &str) -> usize {
        let bytes = self.0.lock().unwrap();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter(|l| l.contains(level) && l.contains(needle))
            .count()
    }
}

#[tokio::test]
async fn failed_request_is_logged_as_error_once() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let h = Harness::new(FakeAnalyzer::failing());
    let (status, _) = h.send(upload("notes.txt", b"Course: CS101")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(logs.lines_with("ERROR", "Request failed"), 1);
    assert_eq!(logs.lines_with("ERROR", "Analysis of notes.txt failed"), 0);
    assert_eq!(logs.lines_with("DEBUG", "Analysis of notes.txt failed"), 1);
}

#[tokio::test]
async fn unrepairable_reply_is_server_error() {
    let h = Harness::new(FakeAnalyzer::replying("I'm sorry, I can't read that."));

    let (status, body) = h.send(upload("notes.txt", b"Course: CS101")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to parse LLM response"));
    assert_eq!(h.staged_files(), 0);
}

#[tokio::test]
async fn non_object_reply_fails_validation() {
    let h = Harness::new(FakeAnalyzer::replying("[1, 2]"));

    let (status, body) = h.send(upload("notes.txt", b"Course: CS101")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "LLM response is not a JSON object (got array)");
    assert_eq!(h.staged_files(), 0);
}

// ── Boundary ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn quota_exhaustion_returns_429() {
    let config = ServerConfig::builder()
        .hourly_limit(1)
        .daily_limit(0)
        .build()
        .unwrap();
    let h = Harness::with(FakeAnalyzer::replying(ANALYSIS), FakePdf::default(), config);

    let (first, _) = h.send(upload("notes.txt", b"Course: CS101")).await;
    assert_eq!(first, StatusCode::OK);

    let resp = h
        .app
        .clone()
        .oneshot(upload("notes.txt", b"Course: CS101"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_header: u64 = resp.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_header > 0);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(
        body["message"],
        "You have reached your usage limit. Please try again later."
    );
    assert_eq!(body["retry_after"], retry_header);
    assert_eq!(h.analyzer.calls(), 1);
}

#[tokio::test]
async fn health_is_not_rate_limited() {
    let config = ServerConfig::builder()
        .hourly_limit(1)
        .daily_limit(1)
        .build()
        .unwrap();
    let h = Harness::with(FakeAnalyzer::replying(ANALYSIS), FakePdf::default(), config);

    for _ in 0..3 {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = h.send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }
}
