//! Extraction orchestrator.
//!
//! Runs header extraction, table reconstruction, side-channel merge,
//! disambiguation and service matching over one document's text, and always
//! returns a record: a full one, a header-only fallback, or an explicit error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use regex::{Regex, RegexBuilder};
use tracing::{debug, error, info, warn};

use crate::error::ExtractionError;
use crate::models::config::InvexConfig;
use crate::models::invoice::{DecodedDocument, ExtractionResult, StructuredData};
use crate::models::pattern::FieldType;
use crate::registry::{self, PatternRegistry};

use super::disambiguate::disambiguate;
use super::rules::{format_amount, to_decimal, FieldExtractor, ServiceMatcher};
use super::table::TableReconstructor;
use super::InvoiceExtractor;

/// Fallback message when a decoder fails without saying why.
const DECODE_FAILED: &str = "Extraction failed";

/// The extraction pipeline, bound to a configuration and a pattern registry.
pub struct InvoiceEngine {
    config: InvexConfig,
    registry: Arc<PatternRegistry>,
    heading: Option<Regex>,
}

impl InvoiceEngine {
    /// Create an engine over the process-wide registry.
    pub fn new(config: InvexConfig) -> Self {
        Self::with_registry(config, registry::global())
    }

    /// Create an engine over a specific registry.
    pub fn with_registry(config: InvexConfig, registry: Arc<PatternRegistry>) -> Self {
        let heading = config.extraction.section_heading.trim();
        let heading = if heading.is_empty() {
            None
        } else {
            RegexBuilder::new(&regex::escape(heading))
                .case_insensitive(true)
                .build()
                .map_err(|e| warn!("Ignoring section heading '{}': {}", heading, e))
                .ok()
        };

        Self {
            config,
            registry,
            heading,
        }
    }

    /// Extract from text, filling gaps from a decoder's structured output.
    pub fn extract_with(&self, text: &str, secondary: Option<&StructuredData>) -> ExtractionResult {
        let start = Instant::now();
        let source = self.normalize(text);
        let focused = self.focus(&source);

        if focused.trim().is_empty() {
            return ExtractionResult::failure(ExtractionError::NoText.to_string());
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_pipeline(&source, focused, secondary)
        }));

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Extraction pipeline failed, falling back to header fields: {}", e);
                self.fallback(&source, focused)
            }
            Err(payload) => {
                error!(
                    "Extraction pipeline panicked, falling back to header fields: {}",
                    panic_message(payload.as_ref())
                );
                self.fallback(&source, focused)
            }
        };

        info!(
            "Extracted {} items in {}ms",
            result.items.len(),
            start.elapsed().as_millis()
        );
        result
    }

    /// Header fields only, one pass of the field extractor.
    pub fn extract_header(&self, text: &str) -> ExtractionResult {
        let extractor = FieldExtractor::new(&self.registry);
        let mut result = ExtractionResult::default();

        for field in FieldType::ALL {
            let value = extractor.extract(text, field);
            *result.field_mut(field) = match field {
                FieldType::Amount
                | FieldType::NetValue
                | FieldType::VatAmount
                | FieldType::GrossValue => value.and_then(|v| to_decimal(&v)).map(format_amount),
                FieldType::Address => value.map(|v| join_lines(&v)),
                _ => value,
            };
        }

        result.customer_code = result.code_no.clone();
        result.item_name = result.service_description.clone();
        result
    }

    fn run_pipeline(
        &self,
        source: &str,
        focused: &str,
        secondary: Option<&StructuredData>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let mut result = self.extract_header(focused);

        result.items = TableReconstructor::new(&self.config.table)
            .with_max_items(self.config.extraction.max_items)
            .reconstruct(focused)?;

        if let Some(data) = secondary {
            let before = result.items.len();
            result.merge_from(&ExtractionResult::from(data));
            debug!(
                "Merged decoder output: {} items added",
                result.items.len() - before
            );
        }

        disambiguate(&mut result, focused);
        if result.item_name.is_none() {
            result.item_name = result.service_description.clone();
        }

        let description = result
            .service_description
            .as_deref()
            .or(result.item_name.as_deref());
        if let Some(description) = description {
            if let Some(found) = ServiceMatcher::new(self.registry.templates()).best_match(description) {
                result.matched_service = Some(found.name);
                result.estimated_minutes = Some(found.estimated_minutes);
            }
        }

        result.raw_text = Some(self.excerpt(source));
        result.prune();
        Ok(result)
    }

    fn fallback(&self, source: &str, focused: &str) -> ExtractionResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut result = self.extract_header(focused);
            result.raw_text = Some(self.excerpt(source));
            result.prune();
            result
        }));

        outcome.unwrap_or_else(|payload| {
            let reason = panic_message(payload.as_ref());
            error!("Header extraction failed: {}", reason);
            ExtractionResult::failure(ExtractionError::Pipeline(reason).to_string())
        })
    }

    /// Apply text and line ceilings and unify line endings.
    fn normalize(&self, text: &str) -> String {
        let limits = &self.config.extraction;
        let text = truncate_chars(text, limits.max_text_len);
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        text.split('\n')
            .map(|line| truncate_chars(line, limits.max_line_len))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text from the section heading on, or all of it.
    fn focus<'t>(&self, text: &'t str) -> &'t str {
        match self.heading.as_ref().and_then(|h| h.find(text)) {
            Some(m) => &text[m.start()..],
            None => text,
        }
    }

    fn excerpt(&self, source: &str) -> String {
        truncate_chars(source, self.config.extraction.raw_text_excerpt).to_string()
    }
}

impl Default for InvoiceEngine {
    fn default() -> Self {
        Self::new(InvexConfig::default())
    }
}

impl InvoiceExtractor for InvoiceEngine {
    fn extract(&self, text: &str) -> ExtractionResult {
        self.extract_with(text, None)
    }

    fn extract_document(&self, document: &DecodedDocument) -> ExtractionResult {
        if !document.success {
            let reason = document
                .error
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .unwrap_or(DECODE_FAILED);
            warn!("Document could not be decoded: {}", reason);
            return ExtractionResult::failure(ExtractionError::Decode(reason.to_string()).to_string());
        }

        self.extract_with(&document.raw_text, document.structured_data.as_ref())
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn join_lines(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{DecodedHeader, LineItem};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    const SAMPLE: &str = "PROFORMA INVOICE\nCode No: SD-100\nCustomer Name: John Doe\nTel: 0712345678\nReference: T123ABC\nGross Value: 150,000.00";

    const WORKSHOP_INVOICE: &str = "\
Star Motors Ltd
P.O. Box 9000, Dar es Salaam
PROFORMA INVOICE
Code No: C-2231
PI No: PI/2024/017
Date: 15/01/2024
Customer Name:
P.O. Box 455, Dar es Salaam
Tel: 0754 111 222
Attended By: Asha M.
Sr  Item   Description            Qty   Rate        Value
1   SP001  Brake pads front set   2     40,000.00   80,000.00
2   LAB01  Brake service labour   1     35,000.00   35,000.00
Net Value: 115,000.00
VAT 18%: 20,700.00
Gross Value: 135,700.00
";

    fn engine() -> InvoiceEngine {
        engine_with(InvexConfig::default())
    }

    fn engine_with(config: InvexConfig) -> InvoiceEngine {
        InvoiceEngine::with_registry(config, Arc::new(PatternRegistry::with_defaults()))
    }

    #[test]
    fn test_end_to_end_sample() {
        let result = engine().extract(SAMPLE);

        assert_eq!(result.code_no.as_deref(), Some("SD-100"));
        assert_eq!(result.customer_code.as_deref(), Some("SD-100"));
        assert_eq!(result.customer_name.as_deref(), Some("John Doe"));
        assert_eq!(result.customer_tel.as_deref(), Some("0712345678"));
        assert_eq!(result.reference.as_deref(), Some("T123ABC"));
        assert_eq!(result.amount.as_deref(), Some("150000.00"));
        assert_eq!(result.plate_number, None);
        assert_eq!(result.error, None);

        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("plate_number").is_none());
        assert!(json.get("items").is_none());
    }

    #[test]
    fn test_workshop_invoice() {
        let result = engine().extract(WORKSHOP_INVOICE);

        assert_eq!(result.code_no.as_deref(), Some("C-2231"));
        assert_eq!(result.pi_no.as_deref(), Some("PI/2024/017"));
        assert_eq!(result.invoice_date.as_deref(), Some("15/01/2024"));
        assert_eq!(result.attended_by.as_deref(), Some("Asha M."));
        assert_eq!(result.customer_name, None);
        assert_eq!(result.address.as_deref(), Some("P.O. Box 455, Dar es Salaam"));
        assert_eq!(result.net_value.as_deref(), Some("115000.00"));
        assert_eq!(result.vat_amount.as_deref(), Some("20700.00"));
        assert_eq!(result.gross_value.as_deref(), Some("135700.00"));
        assert_eq!(result.amount.as_deref(), Some("135700.00"));

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[1].line_no, 2);
        assert_eq!(result.items_total(), Some(Decimal::new(11500000, 2)));

        assert_eq!(result.service_description.as_deref(), Some("Brake pads front set"));
        assert_eq!(result.item_name.as_deref(), Some("Brake pads front set"));
        assert_eq!(result.matched_service.as_deref(), Some("Brake Service"));
        assert_eq!(result.estimated_minutes, Some(90));

        // boilerplate above the heading is ignored
        assert!(!result.raw_text.as_deref().unwrap_or("").is_empty());
        assert_ne!(result.address.as_deref(), Some("P.O. Box 9000, Dar es Salaam"));
    }

    #[test]
    fn test_merge_with_itself_is_noop() {
        let result = engine().extract(WORKSHOP_INVOICE);
        let mut merged = result.clone();
        merged.merge_from(&result);

        assert_eq!(merged, result);
    }

    #[test]
    fn test_side_channel_fills_gaps_only() {
        let data = StructuredData {
            header: DecodedHeader {
                customer_name: Some("Someone Else".to_string()),
                customer_email: Some("fleet@acme.co.tz".to_string()),
                ..DecodedHeader::default()
            },
            items: vec![LineItem {
                description: Some("Wheel balancing".to_string()),
                value: Some(Decimal::from(20_000)),
                ..LineItem::default()
            }],
            vehicle_plates: vec!["T 555 XYZ".to_string()],
        };

        let result = engine().extract_with(SAMPLE, Some(&data));

        assert_eq!(result.customer_name.as_deref(), Some("John Doe"));
        assert_eq!(result.customer_email.as_deref(), Some("fleet@acme.co.tz"));
        assert_eq!(result.plate_number.as_deref(), Some("T 555 XYZ"));
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].line_no, 1);
        assert_eq!(result.service_description.as_deref(), Some("Wheel balancing"));
        assert_eq!(result.matched_service.as_deref(), Some("Tyre Service"));
    }

    #[test]
    fn test_pipeline_failure_falls_back_to_header() {
        let mut config = InvexConfig::default();
        config.extraction.max_items = 1;

        let result = engine_with(config).extract(WORKSHOP_INVOICE);

        assert_eq!(result.error, None);
        assert!(result.items.is_empty());
        assert_eq!(result.code_no.as_deref(), Some("C-2231"));
        assert_eq!(result.matched_service, None);
        assert!(result.raw_text.is_some());
    }

    #[test]
    fn test_text_ceilings() {
        let mut config = InvexConfig::default();
        config.extraction.raw_text_excerpt = 40;
        config.extraction.max_line_len = 100;

        let long_line = "x".repeat(50_000);
        let text = format!("{}\r\nCustomer Name: Acme Ltd\r\n{}", SAMPLE, long_line);
        let result = engine_with(config).extract(&text);

        assert_eq!(result.customer_name.as_deref(), Some("John Doe"));
        assert_eq!(result.raw_text.as_deref().map(|t| t.chars().count()), Some(40));
    }

    #[test]
    fn test_blank_text_is_an_error() {
        let result = engine().extract("  \n\t ");
        assert_eq!(result.error.as_deref(), Some("no text found in document"));
        assert!(result.is_error());
    }

    #[test]
    fn test_decode_failure_surfaced_verbatim() {
        let engine = engine();

        let image = DecodedDocument::failed(
            "Image extraction disabled. Please upload a PDF or text-based document.",
        );
        assert_eq!(
            engine.extract_document(&image).error.as_deref(),
            Some("Image extraction disabled. Please upload a PDF or text-based document.")
        );

        let silent = DecodedDocument {
            success: false,
            ..DecodedDocument::default()
        };
        assert_eq!(engine.extract_document(&silent).error.as_deref(), Some("Extraction failed"));

        let ok = DecodedDocument::from_text(SAMPLE);
        assert_eq!(engine.extract_document(&ok).code_no.as_deref(), Some("SD-100"));
    }
}
