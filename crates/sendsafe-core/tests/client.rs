//! Client tests against an in-process backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use sendsafe_core::models::analytics::AnalyticsPeriod;
use sendsafe_core::models::config::{ApiConfig, ExtractionConfig, UploadConfig};
use sendsafe_core::models::document::{BulkStatus, XmlFile};
use sendsafe_core::upload::UploadOutcome;
use sendsafe_core::{
    ApiClient, ApiError, LineItem, LineItemSet, SendsafeError, StaticToken, UploadFile,
    UploadLimits, UploadObserver, ValidationError,
};

const TOKEN: &str = "test-token";

const GENERIC: &str = r#"<pedido><itens>
  <item><descricao>Parafuso</descricao><quantidade>100</quantidade></item>
</itens></pedido>"#;

const NFE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<nfeProc xmlns="http://www.portalfiscal.inf.br/nfe">
  <NFe><infNFe>
    <det nItem="1">
      <prod>
        <cProd>001</cProd><xProd>Widget</xProd><NCM>84719012</NCM><CFOP>5102</CFOP>
        <uCom>UN</uCom><qCom>2.0000</qCom><vUnCom>10.50</vUnCom><vProd>21.00</vProd>
      </prod>
    </det>
  </infNFe></NFe>
</nfeProc>"#;

#[derive(Default)]
struct Backend {
    requests: AtomicUsize,
    status_polls: AtomicUsize,
    parts: AtomicUsize,
    saved: Mutex<Option<Value>>,
    deleted: Mutex<Vec<String>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", TOKEN))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"success": false, "message": "Token inválido"})),
    )
        .into_response()
}

async fn list(
    State(backend): State<Arc<Backend>>,
    headers: HeaderMap,
    Query(query): Query<Value>,
) -> Response {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "files": [{"_id": "65a1", "filename": "1705312200-nfe.xml", "originalName": "nfe.xml", "size": 2048}],
        "total": 1,
        "page": query["page"].as_str().and_then(|p| p.parse::<u32>().ok()).unwrap_or(1),
        "limit": 10
    }))
    .into_response()
}

async fn get_document(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "nfe" => Json(json!({"id": "nfe", "originalName": "nfe.xml", "xmlContent": NFE})).into_response(),
        "empty" => Json(json!({"id": "empty", "originalName": "empty.xml"})).into_response(),
        "generic" => Json(json!({"_id": "generic", "xmlContent": GENERIC})).into_response(),
        "a/b?c" => Json(json!({"_id": "x", "id": id, "createdAt": "2024-01-15T10:30:00Z"}))
            .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"error": "XML file not found"}))).into_response(),
    }
}

async fn save_products(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    let count = body["products"].as_array().map_or(0, Vec::len);
    *backend.saved.lock().unwrap() = Some(body);
    Json(json!({"message": format!("Products updated for {}", id), "productsUpdated": count}))
}

async fn edit_document(
    State(backend): State<Arc<Backend>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    let content = body["xmlContent"].clone();
    *backend.saved.lock().unwrap() = Some(body);
    Json(json!({"_id": id, "originalName": "nfe.xml", "xmlContent": content, "status": "edited"}))
}

async fn delete_document(State(backend): State<Arc<Backend>>, Path(id): Path<String>) -> Json<Value> {
    backend.deleted.lock().unwrap().push(id);
    Json(json!({"message": "XML file deleted successfully"}))
}

async fn download(Path(id): Path<String>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "application/xml".parse().unwrap());
    let disposition = match id.as_str() {
        "named" => Some(r#"attachment; filename="nota_001.xml""#),
        "escape" => Some(r#"attachment; filename="../../.bashrc""#),
        "dots" => Some(r#"attachment; filename="..""#),
        _ => None,
    };
    if let Some(value) = disposition {
        headers.insert(header::CONTENT_DISPOSITION, value.parse().unwrap());
    }
    (headers, NFE).into_response()
}

async fn convert_pdf(Path(xml_id): Path<String>) -> Json<Value> {
    Json(json!({
        "message": "PDF generated successfully",
        "pdf": {"_id": "pdf_9", "filename": "danfe_9.pdf", "xmlId": xml_id, "type": "DANFE"}
    }))
}

async fn list_pdfs(Path(xml_id): Path<String>) -> Json<Value> {
    let pdf = json!({"_id": "pdf_1", "filename": "danfe.pdf", "xmlId": xml_id, "type": "DANFE"});
    if xml_id == "bare" {
        Json(json!([pdf]))
    } else {
        Json(json!({"pdfs": [pdf]}))
    }
}

async fn bulk_status(State(backend): State<Arc<Backend>>, Path(id): Path<String>) -> Json<Value> {
    let poll = backend.status_polls.fetch_add(1, Ordering::SeqCst);
    let (status, processed) = if poll < 2 { ("processing", poll) } else { ("completed", 3) };
    Json(json!({
        "id": id,
        "status": status,
        "totalFiles": 3,
        "processedFiles": processed,
        "errorFiles": 0,
        "progress": processed * 100 / 3
    }))
}

/// Counts the parts named `field`.
async fn count_parts(backend: &Backend, mut multipart: Multipart, field: &str) -> usize {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    let mut count = 0;
    while let Some(part) = multipart.next_field().await.unwrap() {
        if part.name() == Some(field) {
            count += 1;
        }
    }
    backend.parts.store(count, Ordering::SeqCst);
    count
}

async fn upload_multiple(State(backend): State<Arc<Backend>>, multipart: Multipart) -> Json<Value> {
    let count = count_parts(&backend, multipart, "xmlFiles").await;
    Json(json!({
        "message": format!("{} files uploaded successfully", count),
        "successful": count,
        "errors": [],
        "files": (0..count).map(|i| json!({"_id": format!("m{}", i)})).collect::<Vec<_>>()
    }))
}

async fn start_bulk(State(backend): State<Arc<Backend>>, multipart: Multipart) -> Json<Value> {
    count_parts(&backend, multipart, "xmlFiles[]").await;
    Json(json!({"conversionId": "bulk_7"}))
}

async fn bulk_list() -> Json<Value> {
    Json(json!([
        {"id": "bulk_7", "status": "completed", "totalFiles": 2, "processedFiles": 2, "progress": 100},
        {"id": "bulk_6", "status": "cancelled", "totalFiles": 5, "processedFiles": 1, "failedFiles": 1}
    ]))
}

async fn cancel_bulk(State(backend): State<Arc<Backend>>) -> StatusCode {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn upload(State(backend): State<Arc<Backend>>, mut multipart: Multipart) -> Response {
    backend.requests.fetch_add(1, Ordering::SeqCst);
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("xmlFile") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.unwrap();
        if name.starts_with("bad") {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "Invalid XML file"})))
                .into_response();
        }
        return Json(json!({"id": format!("id_{}", name), "originalName": name, "size": content.len()}))
            .into_response();
    }
    (StatusCode::BAD_REQUEST, Json(json!({"error": "No file uploaded"}))).into_response()
}

async fn timeline(Query(query): Query<Value>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": [{"date": "2024-01-01", "uploads": 15, "processed": 12, "errors": 3}],
        "period": query["period"]
    }))
}

async fn xml_status() -> Json<Value> {
    Json(json!({"success": false, "error": "Erro interno do servidor"}))
}

async fn serve() -> (String, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let app = Router::new()
        .route("/api/xml/list", get(list))
        .route("/api/xml/upload", post(upload))
        .route("/api/xml/upload-multiple", post(upload_multiple))
        .route("/api/xml/{id}", get(get_document).delete(delete_document))
        .route("/api/xml/{id}/edit", put(edit_document))
        .route("/api/xml/{id}/products", put(save_products))
        .route("/api/xml/{id}/download", get(download))
        .route("/api/pdf/convert/{xml_id}", post(convert_pdf))
        .route("/api/pdf/xml/{xml_id}", get(list_pdfs))
        .route("/api/bulk/convert", post(start_bulk))
        .route("/api/bulk/list", get(bulk_list))
        .route("/api/bulk/cancel/{id}", post(cancel_bulk))
        .route("/api/bulk/status/{id}", get(bulk_status))
        .route("/api/analytics/uploads-timeline", get(timeline))
        .route("/api/analytics/xml-status", get(xml_status))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), backend)
}

fn client(base_url: &str) -> ApiClient {
    let config = ApiConfig {
        base_url: base_url.to_string(),
        ..ApiConfig::default()
    };
    ApiClient::new(&config)
        .unwrap()
        .with_credentials(StaticToken::new(TOKEN))
}

#[tokio::test]
async fn test_sends_bearer_token() {
    let (url, _) = serve().await;
    let listing = client(&url).list(2, 10).await.unwrap();

    assert_eq!(listing.total, 1);
    assert_eq!(listing.page, 2);
    assert_eq!(listing.files[0].id, "65a1");
    assert_eq!(listing.files[0].display_name(), "nfe.xml");
}

#[tokio::test]
async fn test_unauthorized_maps_to_api_error() {
    let (url, _) = serve().await;
    let anonymous = ApiClient::new(&ApiConfig {
        base_url: url,
        ..ApiConfig::default()
    })
    .unwrap();

    match anonymous.list(1, 10).await {
        Err(SendsafeError::Api(ApiError::Unauthorized(message))) => {
            assert_eq!(message, "Token inválido")
        }
        other => panic!("expected Unauthorized, got {:?}", other),
    }
}

#[tokio::test]
async fn test_error_body_message() {
    let (url, _) = serve().await;
    let err = client(&url).get("missing").await.unwrap_err();

    match err {
        SendsafeError::Api(ApiError::Status { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "XML file not found");
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn test_extract_products_from_remote_document() {
    let (url, _) = serve().await;
    let client = client(&url);

    let items = client.extract_products("nfe").await.unwrap();
    assert_eq!(items.len(), 1);
    let item = items.get(0).unwrap();
    assert_eq!(item.code, "001");
    assert_eq!(item.description, "Widget");
    assert_eq!(item.tax_base_value, "0");

    let err = client.extract_products("empty").await.unwrap_err();
    assert!(matches!(err, SendsafeError::Api(ApiError::Decode(_))));
}

#[tokio::test]
async fn test_extract_products_uses_client_defaults() {
    let (url, _) = serve().await;
    let client = client(&url).with_extraction_config(ExtractionConfig {
        default_unit: "KG".to_string(),
        default_amount: "0,00".to_string(),
    });

    let invoice = client.extract_products("nfe").await.unwrap();
    let item = invoice.get(0).unwrap();
    assert_eq!(item.unit, "UN");
    assert_eq!(item.tax_base_value, "0,00");

    let generic = client.extract_products("generic").await.unwrap();
    let item = generic.get(0).unwrap();
    assert_eq!(item.description, "Parafuso");
    assert_eq!(item.unit, "KG");
    assert_eq!(item.unit_value, "0,00");
}

#[tokio::test]
async fn test_save_products_rejects_duplicate_index_before_sending() {
    let (url, backend) = serve().await;
    let client = client(&url);

    let mut first = LineItem::blank(0);
    first.description = "A".to_string();
    let mut second = LineItem::blank(0);
    second.description = "B".to_string();
    let duplicated = LineItemSet::new(vec![first.clone(), second]);

    let err = client.save_products("nfe", &duplicated).await.unwrap_err();
    assert!(matches!(
        err,
        SendsafeError::Validation(ValidationError::DuplicateIndex(0))
    ));
    assert_eq!(backend.requests.load(Ordering::SeqCst), 0);

    let mut items = LineItemSet::new(vec![first]);
    items.add();
    let saved = client.save_products("nfe", &items).await.unwrap();
    assert_eq!(saved.products_updated, 2);

    let body = backend.saved.lock().unwrap().clone().unwrap();
    assert_eq!(body["products"][0]["description"], "A");
    assert_eq!(body["products"][1]["index"], 1);
    assert_eq!(body["products"][1]["unitValue"], "0");
}

#[tokio::test]
async fn test_download_file_name() {
    let (url, _) = serve().await;
    let client = client(&url);

    let named = client.download("named").await.unwrap();
    assert_eq!(named.file_name, "nota_001.xml");
    assert!(!named.inline);
    assert_eq!(named.content_type.as_deref(), Some("application/xml"));
    assert_eq!(named.data, NFE.as_bytes());

    let fallback = client.download("65a1").await.unwrap();
    assert_eq!(fallback.file_name, "document_65a1.xml");
}

#[tokio::test]
async fn test_download_file_name_never_leaves_directory() {
    let (url, _) = serve().await;
    let client = client(&url);

    let escaped = client.download("escape").await.unwrap();
    assert_eq!(escaped.file_name, ".bashrc");

    let dots = client.download("dots").await.unwrap();
    assert_eq!(dots.file_name, "document_dots.xml");
}

#[tokio::test]
async fn test_ids_are_one_path_segment() {
    let (url, _) = serve().await;

    let file = client(&url).get("a/b?c").await.unwrap();
    assert_eq!(file.id, "a/b?c");
    assert!(file.uploaded_at.is_some());
}

#[tokio::test]
async fn test_edit_and_delete() {
    let (url, backend) = serve().await;
    let client = client(&url);

    let edited = client.edit("65a1", NFE).await.unwrap();
    assert_eq!(edited.id, "65a1");
    assert_eq!(edited.status.as_deref(), Some("edited"));
    let body = backend.saved.lock().unwrap().clone().unwrap();
    assert_eq!(body, json!({"xmlContent": NFE}));

    let deleted = client.delete("65a1").await.unwrap();
    assert_eq!(deleted.message, "XML file deleted successfully");
    assert_eq!(*backend.deleted.lock().unwrap(), vec!["65a1".to_string()]);
}

#[tokio::test]
async fn test_convert_pdf() {
    let (url, _) = serve().await;

    let conversion = client(&url).convert_pdf("65a1").await.unwrap();
    assert_eq!(conversion.message, "PDF generated successfully");
    assert_eq!(conversion.pdf.id, "pdf_9");
    assert_eq!(conversion.pdf.xml_id, "65a1");
}

#[tokio::test]
async fn test_list_pdfs_accepts_both_shapes() {
    let (url, _) = serve().await;
    let client = client(&url);

    let wrapped = client.list_pdfs("65a1").await.unwrap();
    let bare = client.list_pdfs("bare").await.unwrap();
    assert_eq!(wrapped.len(), 1);
    assert_eq!(bare.len(), 1);
    assert_eq!(bare[0].id, "pdf_1");
    assert_eq!(wrapped[0].xml_id, "65a1");
}

#[tokio::test]
async fn test_wait_for_bulk_until_terminal() {
    let (url, backend) = serve().await;
    let mut seen = Vec::new();

    let finished = client(&url)
        .wait_for_bulk("bulk_1", Duration::from_millis(10), |c| seen.push(c.status))
        .await
        .unwrap();

    assert_eq!(finished.status, BulkStatus::Completed);
    assert_eq!(finished.processed_files, 3);
    assert_eq!(
        seen,
        vec![BulkStatus::Processing, BulkStatus::Processing, BulkStatus::Completed]
    );
    assert_eq!(backend.status_polls.load(Ordering::SeqCst), 3);
}

#[derive(Default)]
struct Recorder {
    settled: usize,
    uploaded: Vec<String>,
    failed: Option<usize>,
}

impl UploadObserver<XmlFile> for Recorder {
    fn on_settled(&mut self, _outcome: &UploadOutcome<XmlFile>) {
        self.settled += 1;
    }

    fn on_uploaded(&mut self, uploaded: &[XmlFile]) {
        self.uploaded = uploaded.iter().map(|f| f.id.clone()).collect();
    }

    fn on_failed(&mut self, failures: usize) {
        self.failed = Some(failures);
    }
}

#[tokio::test]
async fn test_upload_batch_partial_failure() {
    let (url, backend) = serve().await;
    let client = client(&url);
    let files = vec![
        UploadFile::new("a.xml", NFE),
        UploadFile::new("bad.xml", "<broken"),
        UploadFile::new("c.xml", NFE),
    ];

    let mut recorder = Recorder::default();
    let summary = client
        .upload_batch(files, UploadLimits::default(), &mut recorder)
        .await
        .unwrap();

    assert_eq!(summary.success_count(), 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].file_name, "bad.xml");
    assert!(summary.failures[0].error_message.contains("Invalid XML file"));
    assert_eq!(backend.requests.load(Ordering::SeqCst), 3);

    assert_eq!(recorder.settled, 3);
    let mut uploaded = recorder.uploaded.clone();
    uploaded.sort();
    assert_eq!(uploaded, vec!["id_a.xml", "id_c.xml"]);
    assert_eq!(recorder.failed, Some(1));
}

#[tokio::test]
async fn test_upload_batch_preflight_sends_nothing() {
    let (url, backend) = serve().await;
    let files = vec![
        UploadFile::new("a.xml", NFE),
        UploadFile::new("notes.txt", "hello"),
    ];

    let err = client(&url)
        .upload_batch(files, UploadLimits::default(), &mut ())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SendsafeError::Validation(ValidationError::WrongExtension { .. })
    ));
    assert_eq!(backend.requests.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_analytics_envelope() {
    let (url, _) = serve().await;
    let client = client(&url);

    let timeline = client.uploads_timeline(AnalyticsPeriod::Month).await.unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].uploads, 15);

    let err = client.xml_status().await.unwrap_err();
    match err {
        SendsafeError::Api(ApiError::Decode(message)) => {
            assert_eq!(message, "Erro interno do servidor")
        }
        other => panic!("expected Decode, got {:?}", other),
    }
}

#[tokio::test]
async fn test_upload_multiple_sends_one_part_per_file() {
    let (url, backend) = serve().await;
    let files = vec![
        UploadFile::new("a.xml", NFE),
        UploadFile::new("b.xml", NFE),
        UploadFile::new("c.xml", NFE),
    ];

    let response = client(&url).upload_multiple(&files).await.unwrap();
    assert_eq!(response.successful, 3);
    assert_eq!(response.files.len(), 3);
    assert_eq!(backend.parts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_start_bulk_conversion_checks_bulk_limits() {
    let (url, backend) = serve().await;
    let client = client(&url).with_upload_config(UploadConfig {
        bulk_max_files: 2,
        bulk_max_total_size: (NFE.len() + 1) as u64,
        ..UploadConfig::default()
    });

    let three = vec![
        UploadFile::new("a.xml", NFE),
        UploadFile::new("b.xml", NFE),
        UploadFile::new("c.xml", NFE),
    ];
    let err = client.start_bulk_conversion(&three).await.unwrap_err();
    assert!(matches!(
        err,
        SendsafeError::Validation(ValidationError::TooManyFiles { count: 3, max: 2 })
    ));

    let two = vec![UploadFile::new("a.xml", NFE), UploadFile::new("b.xml", NFE)];
    let err = client.start_bulk_conversion(&two).await.unwrap_err();
    assert!(matches!(
        err,
        SendsafeError::Validation(ValidationError::TotalSizeExceeded { .. })
    ));
    assert_eq!(backend.requests.load(Ordering::SeqCst), 0);

    let one = vec![UploadFile::new("a.xml", NFE)];
    let started = client.start_bulk_conversion(&one).await.unwrap();
    assert_eq!(started.conversion_id, "bulk_7");
    assert_eq!(backend.parts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bulk_history_bare_array() {
    let (url, _) = serve().await;

    let history = client(&url).bulk_history().await.unwrap();
    assert_eq!(history.conversions.len(), 2);
    assert_eq!(history.conversions[0].status, BulkStatus::Completed);
    assert_eq!(history.conversions[1].error_files, 1);
    assert_eq!(history.pagination.total, 0);
}

#[tokio::test]
async fn test_cancel_bulk_with_empty_body() {
    let (url, backend) = serve().await;

    let response = client(&url).cancel_bulk("bulk_7").await.unwrap();
    assert!(response.message.is_empty());
    assert_eq!(backend.requests.load(Ordering::SeqCst), 1);
}
