//! `/api/analytics/*` endpoints.

use reqwest::Method;
use serde::de::DeserializeOwned;

use super::ApiClient;
use crate::error::{ApiError, Result};
use crate::models::analytics::{
    AnalyticsPeriod, ApiEnvelope, BulkVolumePoint, CfopShare, DashboardSummary, TimelinePoint,
    TopProduct, XmlStatusCount,
};

impl ApiClient {
    /// Fetch an enveloped analytics payload.
    async fn analytics<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let builder = self
            .request(Method::GET, &["api", "analytics", endpoint])
            .query(query);
        let envelope: ApiEnvelope<T> = self.send_json(builder).await?;

        if !envelope.success {
            let message = envelope
                .error
                .unwrap_or_else(|| format!("{} request was not successful", endpoint));
            return Err(ApiError::Decode(message).into());
        }
        envelope
            .data
            .ok_or_else(|| ApiError::Decode(format!("{} response has no data", endpoint)).into())
    }

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary> {
        self.analytics("dashboard-summary", &[]).await
    }

    /// Uploads per day over `period`.
    pub async fn uploads_timeline(&self, period: AnalyticsPeriod) -> Result<Vec<TimelinePoint>> {
        self.analytics("uploads-timeline", &[("period", period.to_string())])
            .await
    }

    /// Most frequent products across all documents.
    pub async fn top_products(&self, limit: u32) -> Result<Vec<TopProduct>> {
        self.analytics("top-products", &[("limit", limit.to_string())])
            .await
    }

    pub async fn bulk_volume(&self, period: AnalyticsPeriod) -> Result<Vec<BulkVolumePoint>> {
        self.analytics("bulk-volume", &[("period", period.to_string())])
            .await
    }

    pub async fn cfop_distribution(&self) -> Result<Vec<CfopShare>> {
        self.analytics("cfop-distribution", &[]).await
    }

    pub async fn xml_status(&self) -> Result<Vec<XmlStatusCount>> {
        self.analytics("xml-status", &[]).await
    }
}
