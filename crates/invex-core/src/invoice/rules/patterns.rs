//! Fixed patterns used by the table reconstructor and the disambiguation layer.
//!
//! Field rules live in the pattern registry; these are structural patterns
//! that are not meant to be overridden by a pattern store.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Date shapes
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    // Table header markers, one per column kind
    pub static ref HEADER_SERIAL: Regex = Regex::new(
        r"(?i)\b(?:sr|sl|sn|s/no|sno|serial|no)\b"
    ).unwrap();

    pub static ref HEADER_CODE: Regex = Regex::new(
        r"(?i)\b(?:item|code|part|sku)\b"
    ).unwrap();

    pub static ref HEADER_DESCRIPTION: Regex = Regex::new(
        r"(?i)\b(?:description|desc|particulars|details)\b"
    ).unwrap();

    pub static ref HEADER_QUANTITY: Regex = Regex::new(
        r"(?i)\b(?:qty|quantity|qnty)\b"
    ).unwrap();

    pub static ref HEADER_RATE: Regex = Regex::new(
        r"(?i)\b(?:rate|price|unit\s*price)\b"
    ).unwrap();

    pub static ref HEADER_VALUE: Regex = Regex::new(
        r"(?i)\b(?:value|amount|amt)\b"
    ).unwrap();

    // End of the item table
    pub static ref TABLE_TERMINATOR: Regex = Regex::new(
        r"(?i)\b(?:net\s*value|gross\s*value|sub\s*-?\s*total|grand\s*total|total|payment\s*terms?|delivery\s*terms?|remarks?)\b"
    ).unwrap();

    // Page numbering printed between table rows
    pub static ref PAGE_FURNITURE: Regex = Regex::new(
        r"(?i)^(?:page\s+\d+(?:\s*(?:of|/)\s*\d+)?|\d+\s*/\s*\d+\s+pages?|continued(?:\s+on\s+next\s+page)?\.?)$"
    ).unwrap();

    // A whitespace token that is a number: 12 / 1,234 / 1,234.50 / 0.5
    pub static ref NUMERIC_TOKEN: Regex = Regex::new(
        r"^[-+]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?$"
    ).unwrap();

    // A token mixing letters and digits, e.g. a part code
    pub static ref CODE_TOKEN: Regex = Regex::new(
        r"^[A-Za-z0-9][A-Za-z0-9\-/.]*$"
    ).unwrap();

    // A line that starts with another field's label
    pub static ref LABEL_LINE: Regex = Regex::new(
        r"(?i)^\s*(?:address|tel|telephone|phone|fax|e-?mail|attended|kind\s*attn|ref|reference|pi\s*no|code\s*no|customer\s*name|del\.?\s*date|date|plate|gross\s*value|net\s*value|vat)\b"
    ).unwrap();

    // Another field's label embedded in a captured value
    pub static ref EMBEDDED_LABEL: Regex = Regex::new(
        r"(?i)\b(?:del(?:\.|ivery)?\s*date|date|tel|telephone|phone|mobile|fax|ref|reference|pi\s*no|code\s*no)\b\s*[:\-]"
    ).unwrap();

    // Address vocabulary
    pub static ref ADDRESS_WORDS: Regex = Regex::new(
        r"(?i)\b(?:p\.?\s?o\.?\s*box|box|street|str|st|road|rd|avenue|ave|plot|floor|flr|block|house|building|bldg|region|district|ward|city|postal|village|estate|tanzania|kenya|uganda|rwanda|dar\s+es\s+salaam)\b"
    ).unwrap();

    // Unit-of-measure tokens in item rows
    pub static ref UNIT_TOKEN: Regex = Regex::new(
        r"(?i)^(?:pcs|pc|nos|no|ea|each|set|sets|ltr|ltrs|l|kg|hrs|hr|pair|pr|unit|units|job)\.?$"
    ).unwrap();
}

/// Lower-case words that only ever appear in item table headers.
pub const HEADER_VOCABULARY: &[&str] = &[
    "sr", "sl", "sn", "no", "item", "code", "description", "desc", "qty", "quantity", "rate",
    "price", "value", "amount", "unit", "total", "tsh", "tzs", "s/no", "part", "particulars",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_token() {
        for ok in ["1", "12", "1,234", "1,234.50", "0.5", "150000.00"] {
            assert!(NUMERIC_TOKEN.is_match(ok), "{ok}");
        }
        for bad in ["SP001", "1,23", "12a", "", "1.2.3"] {
            assert!(!NUMERIC_TOKEN.is_match(bad), "{bad}");
        }
    }

    #[test]
    fn test_terminator_vocabulary() {
        assert!(TABLE_TERMINATOR.is_match("Net Value 150,000.00"));
        assert!(TABLE_TERMINATOR.is_match("TOTAL"));
        assert!(TABLE_TERMINATOR.is_match("Payment Terms: cash"));
        assert!(!TABLE_TERMINATOR.is_match("Engine oil filter 2 15,000.00"));
    }

    #[test]
    fn test_page_furniture() {
        for line in ["Page 1 of 2", "PAGE 2", "page 3/4", "Continued on next page"] {
            assert!(PAGE_FURNITURE.is_match(line), "{line}");
        }
        assert!(!PAGE_FURNITURE.is_match("Page holder bracket 2 4,000.00"));
    }

    #[test]
    fn test_label_line() {
        assert!(LABEL_LINE.is_match("Address: P.O. Box 1"));
        assert!(LABEL_LINE.is_match("Tel 0712"));
        assert!(!LABEL_LINE.is_match("John Doe"));
    }
}
