//! Data models for documents, line items, analytics and configuration.

pub mod analytics;
pub mod config;
pub mod document;
pub mod line_item;
