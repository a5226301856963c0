//! Records exchanged with the document backend.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::line_item::LineItem;

/// An uploaded XML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawXmlFile")]
pub struct XmlFile {
    pub id: String,

    /// Name the backend stored the file under.
    pub filename: String,

    /// Name of the file as uploaded.
    pub original_name: String,

    /// Size in bytes.
    pub size: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,

    /// Raw document text, only present on single-document reads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml_content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Wire form of [`XmlFile`]. Records may carry the database `_id`, the
/// API `id`, or both; likewise `uploadedAt` and `createdAt`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawXmlFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    object_id: Option<String>,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    original_name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    uploaded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    xml_content: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl TryFrom<RawXmlFile> for XmlFile {
    type Error = String;

    fn try_from(raw: RawXmlFile) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record_id(raw.id, raw.object_id, "document")?,
            filename: raw.filename,
            original_name: raw.original_name,
            size: raw.size,
            uploaded_at: raw.uploaded_at.or(raw.created_at),
            xml_content: raw.xml_content,
            status: raw.status,
        })
    }
}

/// `id` wins over `_id`; one of them must be present.
fn record_id(id: Option<String>, object_id: Option<String>, kind: &str) -> Result<String, String> {
    id.or(object_id)
        .ok_or_else(|| format!("{} record has neither `id` nor `_id`", kind))
}

impl XmlFile {
    /// Name to show the user.
    pub fn display_name(&self) -> &str {
        if self.original_name.is_empty() {
            &self.filename
        } else {
            &self.original_name
        }
    }
}

/// One page of the document listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlFileList {
    #[serde(default)]
    pub files: Vec<XmlFile>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub limit: u32,
}

fn first_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

/// Per-file error reported by the multi-file upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawUploadError")]
pub struct RemoteUploadError {
    pub file_name: Option<String>,
    pub error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUploadError {
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    original_name: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<RawUploadError> for RemoteUploadError {
    fn from(raw: RawUploadError) -> Self {
        Self {
            file_name: raw.file_name.or(raw.original_name).or(raw.filename),
            error: raw.error.or(raw.message).unwrap_or_default(),
        }
    }
}

/// Response of `POST /api/xml/upload-multiple`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipleUploadResponse {
    #[serde(default)]
    pub successful: u32,
    #[serde(default)]
    pub errors: Vec<RemoteUploadError>,
    #[serde(default)]
    pub files: Vec<XmlFile>,
    #[serde(default)]
    pub message: String,
}

/// Response of `GET /api/xml/{id}/products`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsResponse {
    #[serde(default)]
    pub xml_id: String,
    #[serde(default)]
    pub products: Vec<LineItem>,
    #[serde(default)]
    pub total_products: usize,
}

/// Request body of `PUT /api/xml/{id}/products`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveProductsRequest<'a> {
    pub products: &'a [LineItem],
}

/// Response of `PUT /api/xml/{id}/products`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProductsResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<XmlFile>,
    #[serde(default)]
    pub products_updated: usize,
}

/// Request body of `PUT /api/xml/{id}/edit`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest<'a> {
    pub xml_content: &'a str,
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Kind of rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PdfKind {
    Danfe,
    Cte,
    #[default]
    #[serde(other)]
    Other,
}

/// A PDF rendered from an XML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawPdfFile")]
pub struct PdfFile {
    pub id: String,
    pub filename: String,
    pub xml_id: String,
    #[serde(rename = "type")]
    pub kind: PdfKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPdfFile {
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_id")]
    object_id: Option<String>,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    xml_id: String,
    #[serde(default, rename = "type")]
    kind: PdfKind,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<RawPdfFile> for PdfFile {
    type Error = String;

    fn try_from(raw: RawPdfFile) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record_id(raw.id, raw.object_id, "PDF")?,
            filename: raw.filename,
            xml_id: raw.xml_id,
            kind: raw.kind,
            created_at: raw.created_at,
        })
    }
}

/// Response of `POST /api/pdf/convert/{xmlId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConversion {
    #[serde(default)]
    pub message: String,
    pub pdf: PdfFile,
}

/// Response of `GET /api/pdf/xml/{xmlId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfList {
    #[serde(default)]
    pub pdfs: Vec<PdfFile>,
}

/// State of a bulk conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl BulkStatus {
    /// Whether the job will not change state any more.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BulkStatus::Completed | BulkStatus::Failed | BulkStatus::Cancelled
        )
    }
}

impl fmt::Display for BulkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BulkStatus::Pending => "pending",
            BulkStatus::Processing => "processing",
            BulkStatus::Completed => "completed",
            BulkStatus::Failed => "failed",
            BulkStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Progress record of a bulk conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawBulkConversion")]
pub struct BulkConversion {
    pub id: String,
    pub status: BulkStatus,
    pub total_files: u32,
    pub processed_files: u32,
    pub error_files: u32,
    /// Percentage, 0 to 100.
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Wire form of [`BulkConversion`]; older records count errors as `failedFiles`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBulkConversion {
    id: String,
    status: BulkStatus,
    #[serde(default)]
    total_files: u32,
    #[serde(default)]
    processed_files: u32,
    #[serde(default)]
    error_files: Option<u32>,
    #[serde(default)]
    failed_files: Option<u32>,
    #[serde(default)]
    progress: u8,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
}

impl From<RawBulkConversion> for BulkConversion {
    fn from(raw: RawBulkConversion) -> Self {
        Self {
            id: raw.id,
            status: raw.status,
            total_files: raw.total_files,
            processed_files: raw.processed_files,
            error_files: raw.error_files.or(raw.failed_files).unwrap_or_default(),
            progress: raw.progress,
            created_at: raw.created_at,
            completed_at: raw.completed_at,
        }
    }
}

/// Response of `POST /api/bulk/convert`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkConversionStarted {
    pub conversion_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
}

/// Response of `GET /api/bulk/list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BulkHistory {
    #[serde(default)]
    pub conversions: Vec<BulkConversion>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// A downloaded file.
#[derive(Debug, Clone)]
pub struct Download {
    pub file_name: String,
    pub content_type: Option<String>,
    /// Whether the backend asked for inline display.
    pub inline: bool,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_conversion_accepts_failed_files_alias() {
        let conversion: BulkConversion = serde_json::from_str(
            r#"{
                "id": "bulk_1",
                "status": "processing",
                "totalFiles": 10,
                "processedFiles": 4,
                "failedFiles": 1,
                "createdAt": "2024-01-15T10:30:00Z",
                "completedAt": null
            }"#,
        )
        .unwrap();

        assert_eq!(conversion.status, BulkStatus::Processing);
        assert_eq!(conversion.error_files, 1);
        assert!(conversion.completed_at.is_none());
        assert!(!conversion.status.is_terminal());

        let both: BulkConversion = serde_json::from_str(
            r#"{"id": "bulk_2", "status": "completed", "errorFiles": 2, "failedFiles": 2}"#,
        )
        .unwrap();
        assert_eq!(both.error_files, 2);
    }

    #[test]
    fn test_remote_upload_error_names() {
        let error: RemoteUploadError = serde_json::from_str(
            r#"{"filename": "1705-a.xml", "originalName": "a.xml", "message": "Invalid XML"}"#,
        )
        .unwrap();
        assert_eq!(error.file_name.as_deref(), Some("a.xml"));
        assert_eq!(error.error, "Invalid XML");
    }

    #[test]
    fn test_pdf_kind_falls_back_to_other() {
        let pdf: PdfFile =
            serde_json::from_str(r#"{"id": "p1", "xmlId": "x1", "type": "NFSE"}"#).unwrap();
        assert_eq!(pdf.kind, PdfKind::Other);

        let pdf: PdfFile = serde_json::from_str(r#"{"id": "p2", "type": "DANFE"}"#).unwrap();
        assert_eq!(pdf.kind, PdfKind::Danfe);
    }

    #[test]
    fn test_records_with_both_id_keys() {
        let file: XmlFile = serde_json::from_str(
            r#"{
                "_id": "65a1f0",
                "id": "65a1f0",
                "originalName": "nfe.xml",
                "uploadedAt": "2024-01-15T10:30:00Z",
                "createdAt": "2024-01-15T10:29:59Z"
            }"#,
        )
        .unwrap();
        assert_eq!(file.id, "65a1f0");
        assert_eq!(
            file.uploaded_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2024-01-15T10:30:00+00:00")
        );

        let file: XmlFile = serde_json::from_str(
            r#"{"_id": "65a1f1", "createdAt": "2024-01-15T10:29:59Z"}"#,
        )
        .unwrap();
        assert_eq!(file.id, "65a1f1");
        assert!(file.uploaded_at.is_some());

        let pdf: PdfFile =
            serde_json::from_str(r#"{"_id": "p1", "id": "p1", "type": "CTE"}"#).unwrap();
        assert_eq!(pdf.id, "p1");
        assert_eq!(pdf.kind, PdfKind::Cte);

        assert!(serde_json::from_str::<XmlFile>(r#"{"filename": "a.xml"}"#).is_err());
    }

    #[test]
    fn test_display_name_prefers_original_name() {
        let file: XmlFile = serde_json::from_str(
            r#"{"id": "1", "filename": "a1b2.xml", "originalName": "nfe_001.xml", "size": 10}"#,
        )
        .unwrap();
        assert_eq!(file.display_name(), "nfe_001.xml");
    }
}
