//! Data model: rules, templates, extraction records and configuration.

pub mod config;
pub mod invoice;
pub mod pattern;

pub use config::{ExtractionConfig, InvexConfig, PatternsConfig, TableConfig};
pub use invoice::{DecodedDocument, DecodedHeader, ExtractionResult, LineItem, StructuredData};
pub use pattern::{ExtractionRule, FieldType, ServiceCategory, ServiceTemplate};
