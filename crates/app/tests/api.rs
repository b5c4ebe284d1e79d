use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdf_qa_core::{
    prepare_document, CharacterNgramEmbedder, ChatMessage, ChatModel, Embedder, IngestionOptions,
    LopdfExtractor, OpenAiChat, OpenAiConfig, OpenAiEmbedder, ProviderError, ProviderKind,
    Providers, QaCoordinator, RetrievalOptions,
};
use pdf_qa_server::server::{QueryResponse, UploadResponse, QUERY_FAILED, UPLOAD_FAILED};
use pdf_qa_server::{build_router, AppState};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

// Nothing listens on port 1, so requests fail fast with a connection error.
const UNREACHABLE: &str = "http://127.0.0.1:1/v1";

#[derive(Default)]
struct CountingChat {
    reply: String,
    calls: AtomicUsize,
}

#[async_trait]
impl ChatModel for CountingChat {
    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn unreachable_openai() -> OpenAiConfig {
    let mut config = OpenAiConfig::new("sk-test");
    config.base_url = UNREACHABLE.to_string();
    config
}

fn app_with(embedder: Arc<dyn Embedder>, chat: Arc<dyn ChatModel>) -> (Router, Arc<AppState>) {
    app_with_limit(embedder, chat, 10 * 1024 * 1024)
}

fn app_with_limit(
    embedder: Arc<dyn Embedder>,
    chat: Arc<dyn ChatModel>,
    max_upload_bytes: usize,
) -> (Router, Arc<AppState>) {
    let providers = Providers {
        kind: ProviderKind::OpenAi,
        embedder,
        chat,
    };
    let qa = QaCoordinator::from_providers(
        providers,
        IngestionOptions::default(),
        RetrievalOptions::default(),
    )
    .expect("default options are valid");
    let state = Arc::new(AppState {
        qa,
        provider: ProviderKind::OpenAi,
    });
    (build_router(Arc::clone(&state), max_upload_bytes), state)
}

fn offline_app(reply: &str) -> (Router, Arc<AppState>, Arc<CountingChat>) {
    let chat = Arc::new(CountingChat {
        reply: reply.to_string(),
        ..CountingChat::default()
    });
    let (router, state) = app_with(
        Arc::new(CharacterNgramEmbedder::default()),
        Arc::clone(&chat) as Arc<dyn ChatModel>,
    );
    (router, state, chat)
}

/// Builds a one-page PDF with one text line per entry.
fn build_pdf(lines: &[String]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let y = 800 - (index as i64 % 60) * 12;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
        operations.push(Operation::new("Td", vec![40.into(), y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(line.as_str())],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("content encodes"),
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf serializes");
    bytes
}

fn manual_lines() -> Vec<String> {
    (0..45)
        .map(|i| format!("Step {i}: check that the hydraulic pump holds 40 bar before opening valve {i}."))
        .collect()
}

/// Length in chars of the longest suffix of `previous` that `next` starts with.
fn shared_edge(previous: &str, next: &str) -> usize {
    let next_chars = next.chars().collect::<Vec<_>>();
    (1..=next_chars.len())
        .rev()
        .find(|&len| previous.ends_with(&next_chars[..len].iter().collect::<String>()))
        .unwrap_or(0)
}

fn multipart_request(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "pdfqa-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request builds")
}

fn query_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn send<T: DeserializeOwned>(router: &Router, request: Request<Body>) -> (StatusCode, T) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let parsed = serde_json::from_slice(&bytes).expect("json body");
    (status, parsed)
}

#[tokio::test]
async fn index_serves_the_ui() {
    let (router, _, _) = offline_app("ok");
    let response = router
        .oneshot(Request::get("/").body(Body::empty()).expect("request builds"))
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let html = String::from_utf8_lossy(&bytes);
    assert!(html.contains("/api/upload"));
    assert!(html.contains("/api/query"));
}

#[tokio::test]
async fn health_reports_provider_and_chunks() {
    let (router, _, _) = offline_app("ok");
    let request = Request::get("/api/health").body(Body::empty()).expect("request builds");
    let (status, body): (_, serde_json::Value) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["provider"], "openai");
    assert_eq!(body["chunks"], 0);
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let (router, state, _) = offline_app("ok");
    let request = multipart_request("document", "a.pdf", "application/pdf", &build_pdf(&manual_lines()));
    let (status, body): (_, UploadResponse) = send(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.success);
    assert_eq!(body.message.as_deref(), Some("File is required"));
    assert_eq!(state.qa.chunk_count().await, 0);
}

#[tokio::test]
async fn upload_without_multipart_body_is_rejected() {
    let (router, _, _) = offline_app("ok");
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .expect("request builds");
    let (status, body): (_, UploadResponse) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.success);
}

#[tokio::test]
async fn non_pdf_upload_leaves_store_untouched() {
    let (router, state, _) = offline_app("ok");
    let request = multipart_request("file", "notes.txt", "text/plain", b"meeting notes, not a pdf");
    let (status, body): (_, UploadResponse) = send(&router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.success);
    assert_eq!(body.message.as_deref(), Some("Please upload a PDF file"));
    assert_eq!(state.qa.chunk_count().await, 0);
}

#[tokio::test]
async fn corrupt_pdf_is_a_generic_server_failure() {
    let (router, state, _) = offline_app("ok");
    let request = multipart_request("file", "broken.pdf", "application/pdf", b"%PDF-1.4\n%broken");
    let (status, body): (_, UploadResponse) = send(&router, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.success);
    assert_eq!(body.message.as_deref(), Some(UPLOAD_FAILED));
    assert_eq!(state.qa.chunk_count().await, 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected_before_ingestion() {
    let chat = Arc::new(CountingChat::default());
    let (router, state) = app_with_limit(Arc::new(CharacterNgramEmbedder::default()), chat, 1024);
    let pdf = build_pdf(&manual_lines());
    assert!(pdf.len() > 1024, "fixture should exceed the limit");

    let (status, body): (_, UploadResponse) =
        send(&router, multipart_request("file", "manual.pdf", "application/pdf", &pdf)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(!body.success);
    assert_eq!(state.qa.chunk_count().await, 0);
}

#[tokio::test]
async fn valid_pdf_adds_chunks_matching_the_splitter() {
    let (router, state, _) = offline_app("ok");
    let pdf = build_pdf(&manual_lines());

    let expected = prepare_document("manual.pdf", &pdf, &LopdfExtractor, &IngestionOptions::default())
        .expect("test pdf is readable")
        .chunks;
    assert!(expected.len() > 1, "fixture should span several chunks");
    assert!(expected.iter().all(|chunk| chunk.text.chars().count() <= 1_000));
    for pair in expected.windows(2) {
        let overlap = shared_edge(&pair[0].text, &pair[1].text);
        assert!(
            (1..=200).contains(&overlap),
            "chunks {} and {} share {overlap} chars",
            pair[0].metadata.chunk_index,
            pair[1].metadata.chunk_index
        );
    }

    let (status, body): (_, UploadResponse) =
        send(&router, multipart_request("file", "manual.pdf", "application/pdf", &pdf)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert_eq!(body.chunks, Some(expected.len()));
    assert_eq!(state.qa.chunk_count().await, expected.len());

    let (status, _): (_, UploadResponse) =
        send(&router, multipart_request("file", "manual.pdf", "application/pdf", &pdf)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.qa.chunk_count().await, expected.len() * 2);
}

#[tokio::test]
async fn query_before_any_upload_still_answers() {
    let (router, _, chat) = offline_app("I don't have enough information to answer accurately.");
    let (status, body): (_, QueryResponse) =
        send(&router, query_request(r#"{"query":"What pressure does the pump hold?"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert!(body.answer.is_some_and(|answer| !answer.is_empty()));
    assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_or_missing_query_never_calls_the_provider() {
    let (router, _, chat) = offline_app("unused");

    for payload in [r#"{"query":""}"#, r#"{"query":"   "}"#, "{}", "not json"] {
        let (status, body): (_, QueryResponse) = send(&router, query_request(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert!(!body.success);
        assert_eq!(body.message.as_deref(), Some("Query is required"));
    }

    assert_eq!(chat.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn answer_after_upload_is_the_provider_text() {
    let (router, _, chat) = offline_app("The pump holds 40 bar.");
    let pdf = build_pdf(&manual_lines());
    let (status, _): (_, UploadResponse) =
        send(&router, multipart_request("file", "manual.pdf", "application/pdf", &pdf)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body): (_, QueryResponse) =
        send(&router, query_request(r#"{"query":"What pressure does the pump hold?"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
    assert_eq!(body.answer.as_deref(), Some("The pump holds 40 bar."));
    assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_provider_reply_falls_back() {
    let (router, _, _) = offline_app("");
    let (status, body): (_, QueryResponse) =
        send(&router, query_request(r#"{"query":"anything?"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.answer.as_deref(), Some(pdf_qa_core::NO_ANSWER));
}

#[tokio::test]
async fn chat_provider_failure_is_reported_not_raised() {
    let (router, _) = app_with(
        Arc::new(CharacterNgramEmbedder::default()),
        Arc::new(OpenAiChat::new(unreachable_openai())),
    );

    let (status, body): (_, QueryResponse) =
        send(&router, query_request(r#"{"query":"What pressure?"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.success);
    assert_eq!(body.message.as_deref(), Some(QUERY_FAILED));

    // The endpoint keeps serving after a failure.
    let (status, _): (_, QueryResponse) = send(&router, query_request("{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn embedding_failure_on_upload_keeps_store_empty() {
    let (router, state) = app_with(
        Arc::new(OpenAiEmbedder::new(unreachable_openai())),
        Arc::new(CountingChat::default()),
    );
    let pdf = build_pdf(&manual_lines());

    let (status, body): (_, UploadResponse) =
        send(&router, multipart_request("file", "manual.pdf", "application/pdf", &pdf)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body.success);
    assert_eq!(body.message.as_deref(), Some(UPLOAD_FAILED));
    assert_eq!(state.qa.chunk_count().await, 0);
}
