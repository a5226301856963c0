//! `/api/xml/*` endpoints.

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tracing::{info, warn};

use super::{ApiClient, XML_MIME};
use crate::error::{ApiError, Result};
use crate::extract::LineItemExtractor;
use crate::models::document::{
    Download, EditRequest, MessageResponse, MultipleUploadResponse, ProductsResponse,
    SaveProductsRequest, SaveProductsResponse, XmlFile, XmlFileList,
};
use crate::models::line_item::LineItemSet;
use crate::upload::{BatchUploadCoordinator, BatchUploadSummary, UploadFile, UploadLimits, UploadObserver};

pub(super) fn xml_part(file: &UploadFile) -> std::result::Result<Part, ApiError> {
    Ok(Part::bytes(file.content.clone())
        .file_name(file.name.clone())
        .mime_str(XML_MIME)?)
}

impl ApiClient {
    /// Upload one document (`POST /api/xml/upload`).
    pub async fn upload(&self, file: &UploadFile) -> Result<XmlFile> {
        let form = Form::new().part("xmlFile", xml_part(file)?);
        let builder = self
            .request(Method::POST, &["api", "xml", "upload"])
            .timeout(self.upload_timeout)
            .multipart(form);

        let uploaded: XmlFile = self.send_json(builder).await?;
        info!("Uploaded {} as {}", file.name, uploaded.id);
        Ok(uploaded)
    }

    /// Upload several documents in one request (`POST /api/xml/upload-multiple`).
    ///
    /// The batch is checked against the interactive limits first.
    pub async fn upload_multiple(&self, files: &[UploadFile]) -> Result<MultipleUploadResponse> {
        UploadLimits::interactive(&self.upload_config).preflight(files)?;

        let mut form = Form::new();
        for file in files {
            form = form.part("xmlFiles", xml_part(file)?);
        }
        let builder = self
            .request(Method::POST, &["api", "xml", "upload-multiple"])
            .timeout(self.upload_timeout)
            .multipart(form);

        let response: MultipleUploadResponse = self.send_json(builder).await?;
        if !response.errors.is_empty() {
            warn!("{} files were rejected by the backend", response.errors.len());
        }
        Ok(response)
    }

    /// Upload each file with its own request, concurrently.
    ///
    /// Pre-flight failures reject the batch before any request is made; once
    /// dispatched, a failing file never affects the others.
    pub async fn upload_batch<O>(
        &self,
        files: Vec<UploadFile>,
        limits: UploadLimits,
        observer: &mut O,
    ) -> Result<BatchUploadSummary<XmlFile>>
    where
        O: UploadObserver<XmlFile> + ?Sized,
    {
        let coordinator = BatchUploadCoordinator::new(limits).with_timeout(self.upload_timeout);
        let summary = coordinator
            .upload_with_observer(files, |file| async move { self.upload(&file).await }, observer)
            .await?;
        Ok(summary)
    }

    /// List documents (`GET /api/xml/list`).
    pub async fn list(&self, page: u32, limit: u32) -> Result<XmlFileList> {
        let builder = self
            .request(Method::GET, &["api", "xml", "list"])
            .query(&[("page", page), ("limit", limit)]);
        Ok(self.send_json(builder).await?)
    }

    /// Fetch one document including its raw text (`GET /api/xml/{id}`).
    pub async fn get(&self, id: &str) -> Result<XmlFile> {
        let builder = self.request(Method::GET, &["api", "xml", id]);
        Ok(self.send_json(builder).await?)
    }

    /// Replace the raw text of a document (`PUT /api/xml/{id}/edit`).
    pub async fn edit(&self, id: &str, xml_content: &str) -> Result<XmlFile> {
        let builder = self
            .request(Method::PUT, &["api", "xml", id, "edit"])
            .json(&EditRequest { xml_content });
        Ok(self.send_json(builder).await?)
    }

    /// Line items stored by the backend (`GET /api/xml/{id}/products`).
    pub async fn products(&self, id: &str) -> Result<ProductsResponse> {
        let builder = self.request(Method::GET, &["api", "xml", id, "products"]);
        Ok(self.send_json(builder).await?)
    }

    /// Fetch a document and extract its line items locally, with the
    /// client's extraction defaults.
    ///
    /// A document without recognizable items gives an empty set.
    pub async fn extract_products(&self, id: &str) -> Result<LineItemSet> {
        let document = self.get(id).await?;
        let content = document.xml_content.ok_or_else(|| {
            ApiError::Decode(format!("document {} was returned without XML content", id))
        })?;
        let extractor = LineItemExtractor::new().with_config(&self.extraction_config);
        Ok(LineItemSet::new(extractor.extract(&content)))
    }

    /// Save the full edited set of line items (`PUT /api/xml/{id}/products`).
    ///
    /// Index uniqueness is checked before anything is sent.
    pub async fn save_products(&self, id: &str, items: &LineItemSet) -> Result<SaveProductsResponse> {
        items.validate()?;

        let builder = self
            .request(Method::PUT, &["api", "xml", id, "products"])
            .json(&SaveProductsRequest {
                products: items.items(),
            });
        let response: SaveProductsResponse = self.send_json(builder).await?;
        info!("Saved {} line items for {}", response.products_updated, id);
        Ok(response)
    }

    /// Delete a document (`DELETE /api/xml/{id}`).
    pub async fn delete(&self, id: &str) -> Result<MessageResponse> {
        let builder = self.request(Method::DELETE, &["api", "xml", id]);
        Ok(self.send_json(builder).await?)
    }

    /// Download the raw document (`GET /api/xml/{id}/download`).
    pub async fn download(&self, id: &str) -> Result<Download> {
        let builder = self.request(Method::GET, &["api", "xml", id, "download"]);
        Ok(self
            .send_download(builder, format!("document_{}.xml", id), false)
            .await?)
    }
}
