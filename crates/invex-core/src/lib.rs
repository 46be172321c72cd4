//! Core library for invoice field extraction.
//!
//! This crate provides:
//! - A pattern registry with built-in default rules and an external store interface
//! - Rule-based header field extraction and amount normalization
//! - Line-item table reconstruction from flattened text
//! - Heuristic disambiguation and service template matching
//! - An orchestrator that always returns a reviewable record

pub mod error;
pub mod invoice;
pub mod models;
pub mod registry;

pub use error::{ExtractionError, InvexError, Result, StoreError};
pub use invoice::{InvoiceEngine, InvoiceExtractor};
pub use invoice::rules::{parse_invoice_date, to_decimal};
pub use models::config::InvexConfig;
pub use models::invoice::{DecodedDocument, ExtractionResult, LineItem, StructuredData};
pub use models::pattern::{ExtractionRule, FieldType, ServiceTemplate};
pub use registry::{JsonPatternStore, PatternRegistry, PatternStore, RegistrySource};
