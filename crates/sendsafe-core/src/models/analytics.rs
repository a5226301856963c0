//! Aggregate analytics returned by `/api/analytics/*`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// `{success, data, error}` wrapper used by the analytics endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reporting window accepted by the timeline endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyticsPeriod {
    #[default]
    Week,
    Month,
    Quarter,
    Year,
}

impl AnalyticsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsPeriod::Week => "7d",
            AnalyticsPeriod::Month => "30d",
            AnalyticsPeriod::Quarter => "90d",
            AnalyticsPeriod::Year => "1y",
        }
    }
}

impl fmt::Display for AnalyticsPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalyticsPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "7d" => Ok(AnalyticsPeriod::Week),
            "30d" => Ok(AnalyticsPeriod::Month),
            "90d" => Ok(AnalyticsPeriod::Quarter),
            "1y" => Ok(AnalyticsPeriod::Year),
            other => Err(format!("unknown period '{}', expected 7d, 30d, 90d or 1y", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastUpload {
    pub original_name: String,
    pub created_at: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSummary {
    pub total_xmls: u64,
    pub total_products: u64,
    pub total_pdfs: u64,
    pub recent_uploads: u64,
    pub error_xmls: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_upload: Option<LastUpload>,
    /// Percentage of documents processed without error.
    pub success_rate: f64,
}

/// Uploads per day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePoint {
    pub date: String,
    #[serde(default)]
    pub uploads: u64,
    #[serde(default)]
    pub processed: u64,
    #[serde(default)]
    pub errors: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub total_value: f64,
    #[serde(default)]
    pub total_quantity: f64,
    /// Number of documents the product appears in.
    #[serde(default)]
    pub count: u64,
}

/// Bulk conversion volume per day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkVolumePoint {
    pub date: String,
    #[serde(default)]
    pub total_files: u64,
    #[serde(default)]
    pub processed_files: u64,
    #[serde(default)]
    pub error_files: u64,
    #[serde(default)]
    pub conversions: u64,
}

/// Share of line items per CFOP code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CfopShare {
    pub cfop: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XmlStatusCount {
    pub status: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
}
