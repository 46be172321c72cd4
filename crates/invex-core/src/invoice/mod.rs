//! Invoice field extraction module.

pub mod disambiguate;
mod engine;
pub mod rules;
pub mod table;

pub use engine::InvoiceEngine;
pub use rules::{CompiledRule, FieldExtractor, RuleOutcome, ServiceMatch, ServiceMatcher};
pub use table::TableReconstructor;

use crate::models::invoice::{DecodedDocument, ExtractionResult};

/// Trait for whole-document invoice extractors.
pub trait InvoiceExtractor {
    /// Extract a record from decoded document text.
    fn extract(&self, text: &str) -> ExtractionResult;

    /// Extract a record from a decoder's full output.
    ///
    /// A document the decoder failed on yields an error record carrying the
    /// decoder's message.
    fn extract_document(&self, document: &DecodedDocument) -> ExtractionResult;
}
