//! `/api/bulk/*` endpoints.

use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use super::documents::xml_part;
use super::ApiClient;
use crate::error::{ApiError, Result};
use crate::models::document::{
    BulkConversion, BulkConversionStarted, BulkHistory, MessageResponse,
};
use crate::upload::{UploadFile, UploadLimits};

/// Polling interval used by the status screen.
pub const BULK_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// The history endpoint answers either `{conversions, pagination}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum HistoryBody {
    Wrapped(BulkHistory),
    Bare(Vec<BulkConversion>),
}

impl ApiClient {
    /// Start a bulk conversion (`POST /api/bulk/convert`).
    ///
    /// The batch is checked against the bulk limits first.
    pub async fn start_bulk_conversion(&self, files: &[UploadFile]) -> Result<BulkConversionStarted> {
        UploadLimits::bulk(&self.upload_config).preflight(files)?;

        let mut form = Form::new();
        for file in files {
            form = form.part("xmlFiles[]", xml_part(file)?);
        }
        let builder = self
            .request(Method::POST, &["api", "bulk", "convert"])
            .timeout(self.upload_timeout)
            .multipart(form);

        let started: BulkConversionStarted = self.send_json(builder).await?;
        info!(
            "Started bulk conversion {} with {} files",
            started.conversion_id,
            files.len()
        );
        Ok(started)
    }

    /// Progress of a bulk conversion (`GET /api/bulk/status/{id}`).
    pub async fn bulk_status(&self, id: &str) -> Result<BulkConversion> {
        let builder = self.request(Method::GET, &["api", "bulk", "status", id]);
        Ok(self.send_json(builder).await?)
    }

    /// Past bulk conversions (`GET /api/bulk/list`).
    pub async fn bulk_history(&self) -> Result<BulkHistory> {
        let builder = self.request(Method::GET, &["api", "bulk", "list"]);
        let body: HistoryBody = self.send_json(builder).await?;
        Ok(match body {
            HistoryBody::Wrapped(history) => history,
            HistoryBody::Bare(conversions) => BulkHistory {
                conversions,
                ..BulkHistory::default()
            },
        })
    }

    /// Cancel a bulk conversion (`POST /api/bulk/cancel/{id}`).
    pub async fn cancel_bulk(&self, id: &str) -> Result<MessageResponse> {
        let builder = self.request(Method::POST, &["api", "bulk", "cancel", id]);
        let response = self.send(builder).await?;
        let body = response.bytes().await.map_err(super::transport_error)?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(MessageResponse::default());
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()).into())
    }

    /// Poll a bulk conversion until it reaches a terminal state.
    ///
    /// `on_update` sees every status read, the final one included.
    pub async fn wait_for_bulk<F>(
        &self,
        id: &str,
        interval: Duration,
        mut on_update: F,
    ) -> Result<BulkConversion>
    where
        F: FnMut(&BulkConversion),
    {
        loop {
            let conversion = self.bulk_status(id).await?;
            on_update(&conversion);
            if conversion.status.is_terminal() {
                info!("Bulk conversion {} finished as {}", id, conversion.status);
                return Ok(conversion);
            }
            debug!(
                "Bulk conversion {}: {}/{} processed",
                id, conversion.processed_files, conversion.total_files
            );
            tokio::time::sleep(interval).await;
        }
    }
}
