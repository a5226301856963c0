//! Batch uploads with whole-batch pre-flight and per-file failure isolation.
//!
//! Every file of a batch is checked before anything is sent; one bad file
//! rejects the whole batch. Once dispatched, uploads run concurrently and the
//! batch waits for all of them, whatever the individual outcome.

use std::fmt::Display;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::error::ValidationError;
use crate::models::config::UploadConfig;

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, named after its final path component.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.xml")
            .to_string();
        let content = std::fs::read(path)?;
        Ok(Self { name, content })
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// Whether the name ends in `.{extension}`, ignoring case.
    pub fn has_extension(&self, extension: &str) -> bool {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        self.name.to_lowercase().ends_with(&suffix.to_lowercase())
    }
}

/// Pre-flight limits for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_files: usize,
    pub max_file_size: u64,
    pub max_total_size: Option<u64>,
    pub required_extension: String,
}

impl UploadLimits {
    /// Limits for interactive uploads.
    pub fn interactive(config: &UploadConfig) -> Self {
        Self {
            max_files: config.max_files,
            max_file_size: config.max_file_size,
            max_total_size: None,
            required_extension: config.required_extension.clone(),
        }
    }

    /// Limits for bulk conversions.
    pub fn bulk(config: &UploadConfig) -> Self {
        Self {
            max_files: config.bulk_max_files,
            max_file_size: config.max_file_size,
            max_total_size: Some(config.bulk_max_total_size),
            required_extension: config.required_extension.clone(),
        }
    }

    /// Check a whole batch. The first problem found rejects it.
    pub fn preflight(&self, files: &[UploadFile]) -> Result<(), ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if files.len() > self.max_files {
            return Err(ValidationError::TooManyFiles {
                count: files.len(),
                max: self.max_files,
            });
        }

        for file in files {
            if file.size() > self.max_file_size {
                return Err(ValidationError::FileTooLarge {
                    name: file.name.clone(),
                    size: file.size(),
                    max: self.max_file_size,
                });
            }
            if !file.has_extension(&self.required_extension) {
                return Err(ValidationError::WrongExtension {
                    name: file.name.clone(),
                    expected: self.required_extension.clone(),
                });
            }
        }

        if let Some(max) = self.max_total_size {
            let total: u64 = files.iter().map(UploadFile::size).sum();
            if total > max {
                return Err(ValidationError::TotalSizeExceeded { total, max });
            }
        }

        Ok(())
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::interactive(&UploadConfig::default())
    }
}

/// How one file's upload settled.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus<T> {
    Succeeded(T),
    Failed(String),
}

/// Outcome of one file within a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOutcome<T> {
    pub file_name: String,
    pub status: UploadStatus<T>,
}

impl<T> UploadOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self.status, UploadStatus::Succeeded(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Failed(message) => Some(message),
            UploadStatus::Succeeded(_) => None,
        }
    }
}

/// A file that failed to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFailure {
    pub file_name: String,
    pub error_message: String,
}

/// Aggregate of a settled batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchUploadSummary<T> {
    /// Payloads of successful uploads, in completion order.
    pub uploaded: Vec<T>,
    /// Failed uploads, in completion order.
    pub failures: Vec<UploadFailure>,
}

impl<T> BatchUploadSummary<T> {
    pub fn success_count(&self) -> usize {
        self.uploaded.len()
    }

    pub fn total(&self) -> usize {
        self.uploaded.len() + self.failures.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.uploaded.is_empty() && !self.failures.is_empty()
    }
}

/// Receives batch progress.
///
/// `on_uploaded` and `on_failed` fire at most once per batch, after every
/// upload settled; both fire for a partial success.
pub trait UploadObserver<T> {
    /// A single file settled.
    fn on_settled(&mut self, _outcome: &UploadOutcome<T>) {}

    /// At least one file was uploaded.
    fn on_uploaded(&mut self, _uploaded: &[T]) {}

    /// At least one file failed.
    fn on_failed(&mut self, _failures: usize) {}
}

impl<T> UploadObserver<T> for () {}

/// Validates a batch and uploads every file concurrently.
#[derive(Debug, Clone)]
pub struct BatchUploadCoordinator {
    limits: UploadLimits,
    timeout: Option<Duration>,
}

impl BatchUploadCoordinator {
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            limits,
            timeout: None,
        }
    }

    /// Fail any single upload that takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Upload a batch without progress reporting.
    pub async fn upload<T, E, F, Fut>(
        &self,
        files: Vec<UploadFile>,
        upload: F,
    ) -> Result<BatchUploadSummary<T>, ValidationError>
    where
        F: Fn(UploadFile) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.upload_with_observer(files, upload, &mut ()).await
    }

    /// Upload a batch, reporting progress to `observer`.
    ///
    /// Returns an error only when pre-flight rejects the batch, in which case
    /// `upload` is never called.
    pub async fn upload_with_observer<T, E, F, Fut, O>(
        &self,
        files: Vec<UploadFile>,
        upload: F,
        observer: &mut O,
    ) -> Result<BatchUploadSummary<T>, ValidationError>
    where
        F: Fn(UploadFile) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        O: UploadObserver<T> + ?Sized,
    {
        self.limits.preflight(&files)?;
        info!("Dispatching {} uploads", files.len());

        let timeout = self.timeout;
        let mut pending: FuturesUnordered<_> = files
            .into_iter()
            .map(|file| {
                let file_name = file.name.clone();
                let request = upload(file);
                async move {
                    let result = match timeout {
                        Some(limit) => match tokio::time::timeout(limit, request).await {
                            Ok(result) => result.map_err(|e| e.to_string()),
                            Err(_) => Err(format!("upload timed out after {}s", limit.as_secs())),
                        },
                        None => request.await.map_err(|e| e.to_string()),
                    };
                    UploadOutcome {
                        file_name,
                        status: match result {
                            Ok(payload) => UploadStatus::Succeeded(payload),
                            Err(message) => UploadStatus::Failed(message),
                        },
                    }
                }
            })
            .collect();

        let mut summary = BatchUploadSummary {
            uploaded: Vec::new(),
            failures: Vec::new(),
        };

        while let Some(outcome) = pending.next().await {
            observer.on_settled(&outcome);
            match outcome.status {
                UploadStatus::Succeeded(payload) => {
                    debug!("Uploaded {}", outcome.file_name);
                    summary.uploaded.push(payload);
                }
                UploadStatus::Failed(error_message) => {
                    warn!("Failed to upload {}: {}", outcome.file_name, error_message);
                    summary.failures.push(UploadFailure {
                        file_name: outcome.file_name,
                        error_message,
                    });
                }
            }
        }

        info!(
            "Batch settled: {} uploaded, {} failed",
            summary.success_count(),
            summary.failures.len()
        );

        if !summary.uploaded.is_empty() {
            observer.on_uploaded(&summary.uploaded);
        }
        if !summary.failures.is_empty() {
            observer.on_failed(summary.failures.len());
        }

        Ok(summary)
    }
}
