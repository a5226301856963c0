//! Subcommands of the `sendsafe` binary.

pub mod analytics;
pub mod bulk;
pub mod config;
pub mod documents;
pub mod extract;
pub mod pdf;
pub mod products;
pub mod upload;

use std::fs;
use std::path::{Path, PathBuf};

use console::style;
use tracing::debug;

use sendsafe_core::models::config::SendsafeConfig;
use sendsafe_core::models::document::Download;
use sendsafe_core::{safe_file_name, ApiClient};

/// Global options shared by every subcommand.
pub struct Context {
    pub config_path: Option<String>,
    pub api_url: Option<String>,
    pub token: Option<String>,
}

impl Context {
    /// Path of the configuration file in use.
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(config::default_config_path)
    }

    /// Load configuration and apply command-line overrides.
    pub fn config(&self) -> anyhow::Result<SendsafeConfig> {
        let path = self.config_file();
        let mut config = if path.exists() {
            debug!("Loading configuration from {}", path.display());
            SendsafeConfig::from_file(&path)?
        } else if self.config_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        } else {
            SendsafeConfig::default()
        };

        if let Some(url) = &self.api_url {
            config.api.base_url = url.clone();
        }
        if let Some(token) = &self.token {
            config.api.token = Some(token.clone());
        }
        Ok(config)
    }

    /// Build an API client from the effective configuration.
    pub fn client(&self) -> anyhow::Result<ApiClient> {
        let config = self.config()?;
        let client = ApiClient::new(&config.api)?
            .with_upload_config(config.upload)
            .with_extraction_config(config.extraction);
        Ok(client)
    }
}

/// Write a download to `output`, or to its own file name in the current directory.
pub fn save_download(download: &Download, output: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = match output {
        Some(output) => output.to_path_buf(),
        None => default_download_path(download)?,
    };
    fs::write(&path, &download.data)?;

    println!(
        "{} Saved {} ({} bytes)",
        style("✓").green(),
        path.display(),
        download.data.len()
    );
    Ok(path)
}

/// Where a download goes without `--output`: its bare file name, never a path
/// outside the current directory.
fn default_download_path(download: &Download) -> anyhow::Result<PathBuf> {
    let name = safe_file_name(&download.file_name).ok_or_else(|| {
        anyhow::anyhow!(
            "Refusing to save download as {:?}; pass --output",
            download.file_name
        )
    })?;
    Ok(PathBuf::from(name))
}
