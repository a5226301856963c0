//! Configuration structures for the document client.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One mebibyte, in bytes.
pub const MIB: u64 = 1024 * 1024;

/// Main configuration for sendsafe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SendsafeConfig {
    /// Backend connection settings.
    pub api: ApiConfig,

    /// Upload pre-flight limits.
    pub upload: UploadConfig,

    /// Line item extraction defaults.
    pub extraction: ExtractionConfig,
}

/// Backend connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the document backend.
    pub base_url: String,

    /// Bearer token sent with every request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Timeout for ordinary requests, in seconds.
    pub timeout_secs: u64,

    /// Timeout for upload and bulk requests, in seconds.
    pub upload_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            token: None,
            timeout_secs: 30,
            upload_timeout_secs: 300,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

/// Upload limits checked before any file leaves the machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum size of a single file, in bytes.
    pub max_file_size: u64,

    /// Maximum number of files in an interactive upload.
    pub max_files: usize,

    /// Maximum number of files in a bulk conversion.
    pub bulk_max_files: usize,

    /// Maximum combined size of a bulk conversion, in bytes.
    pub bulk_max_total_size: u64,

    /// Required file extension, without the dot.
    pub required_extension: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * MIB,
            max_files: 10,
            bulk_max_files: 100,
            bulk_max_total_size: 1024 * MIB,
            required_extension: "xml".to_string(),
        }
    }
}

/// Line item extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Unit used when a document does not state one.
    pub default_unit: String,

    /// Value used for absent quantities and amounts.
    pub default_amount: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            default_unit: "UN".to_string(),
            default_amount: "0".to_string(),
        }
    }
}

impl SendsafeConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
