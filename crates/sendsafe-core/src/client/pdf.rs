//! `/api/pdf/*` endpoints.

use reqwest::Method;
use serde::Deserialize;
use tracing::info;

use super::ApiClient;
use crate::error::Result;
use crate::models::document::{Download, PdfConversion, PdfFile, PdfList};

/// The list endpoint answers either `{pdfs: [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum PdfListBody {
    Wrapped(PdfList),
    Bare(Vec<PdfFile>),
}

impl ApiClient {
    /// Render a document (`POST /api/pdf/convert/{xmlId}`).
    pub async fn convert_pdf(&self, xml_id: &str) -> Result<PdfConversion> {
        let builder = self.request(Method::POST, &["api", "pdf", "convert", xml_id]);
        let conversion: PdfConversion = self.send_json(builder).await?;
        info!("Rendered {} as {}", xml_id, conversion.pdf.id);
        Ok(conversion)
    }

    /// Download a rendered form (`GET /api/pdf/download/{pdfId}`).
    pub async fn download_pdf(&self, pdf_id: &str, inline: bool) -> Result<Download> {
        let mut builder = self.request(Method::GET, &["api", "pdf", "download", pdf_id]);
        if inline {
            builder = builder.query(&[("inline", "true")]);
        }
        Ok(self
            .send_download(builder, format!("document_{}.pdf", pdf_id), inline)
            .await?)
    }

    /// Rendered forms of one document (`GET /api/pdf/xml/{xmlId}`).
    pub async fn list_pdfs(&self, xml_id: &str) -> Result<Vec<PdfFile>> {
        let builder = self.request(Method::GET, &["api", "pdf", "xml", xml_id]);
        let body: PdfListBody = self.send_json(builder).await?;
        Ok(match body {
            PdfListBody::Wrapped(list) => list.pdfs,
            PdfListBody::Bare(pdfs) => pdfs,
        })
    }
}
