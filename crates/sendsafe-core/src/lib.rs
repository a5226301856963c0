//! Core library for NF-e/CT-e document handling.
//!
//! This crate provides:
//! - Line item extraction from fiscal document markup (NF-e `det`/`prod`, generic `item` fallback)
//! - Batch upload coordination with whole-batch pre-flight checks
//! - A client for the document backend REST API (documents, PDFs, bulk conversions, analytics)
//! - Line item edit sessions and configuration models

pub mod client;
pub mod error;
pub mod extract;
pub mod models;
pub mod upload;

pub use client::{
    safe_file_name, ApiClient, CredentialProvider, NoCredentials, StaticToken, BULK_POLL_INTERVAL,
};
pub use error::{ApiError, ParseError, Result, SendsafeError, ValidationError};
pub use extract::{DocumentParser, Element, ExtractionResult, LineItemExtractor, Schema, XmlTreeParser};
pub use models::config::SendsafeConfig;
pub use models::line_item::{LineItem, LineItemField, LineItemSet, LineItemTotals};
pub use upload::{
    BatchUploadCoordinator, BatchUploadSummary, UploadFailure, UploadFile, UploadLimits,
    UploadObserver, UploadOutcome, UploadStatus,
};
