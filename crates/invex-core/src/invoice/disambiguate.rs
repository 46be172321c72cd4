//! Post-extraction corrections.
//!
//! Raw rule matches are fixed up with lightweight content heuristics: values
//! on the line after a bare label, customer name versus address, postal-box
//! text caught as a plate, and table-header noise caught as the service
//! description.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::models::invoice::{ExtractionResult, LineItem};
use crate::models::pattern::FieldType;

use super::rules::patterns::{ADDRESS_WORDS, EMBEDDED_LABEL, HEADER_VOCABULARY, LABEL_LINE};

/// Shortest service description that is not noise.
const MIN_SERVICE_LEN: usize = 3;

/// Longest value that can still read as a personal or company name.
const MAX_NAME_LEN: usize = 60;

/// Digits in text longer than this suggest a street or box number.
const ADDRESS_DIGIT_LEN: usize = 20;

lazy_static! {
    // A label standing alone on its line, value expected on the next
    static ref BARE_LABELS: Vec<(FieldType, Regex)> = vec![
        (FieldType::CustomerName, Regex::new(r"(?i)^(?:customer\s*name|bill\s*to|customer)\s*[:\-]?\s*$").unwrap()),
        (FieldType::Address, Regex::new(r"(?i)^address\s*[:\-]?\s*$").unwrap()),
        (FieldType::AttendedBy, Regex::new(r"(?i)^attended\s*by\s*[:\-]?\s*$").unwrap()),
        (FieldType::Reference, Regex::new(r"(?i)^(?:reference|ref\.?)\s*[:\-]?\s*$").unwrap()),
        (FieldType::CodeNo, Regex::new(r"(?i)^code\s*no\.?\s*[:\-]?\s*$").unwrap()),
        (FieldType::PiNo, Regex::new(r"(?i)^(?:pi|p\.i\.)\s*no\.?\s*[:\-]?\s*$").unwrap()),
    ];
}

/// Apply every correction, in order.
pub fn disambiguate(result: &mut ExtractionResult, text: &str) {
    fill_from_next_line(result, text);
    resolve_name_and_address(result);
    suppress_postal_plate(result);
    replace_noisy_service(result);
}

/// Take the next non-empty line as the value of a bare label, unless that
/// line is itself a label.
pub fn fill_from_next_line(result: &mut ExtractionResult, text: &str) {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    for (field, label) in BARE_LABELS.iter() {
        if result.field(*field).is_some() {
            continue;
        }

        let value = lines.iter().enumerate().find_map(|(idx, line)| {
            if !label.is_match(line) {
                return None;
            }
            let next = lines[idx + 1..].iter().find(|l| !l.is_empty())?;
            (!LABEL_LINE.is_match(next)).then(|| next.to_string())
        });

        if let Some(value) = value {
            debug!("{} taken from the line after its label: '{}'", field, value);
            *result.field_mut(*field) = Some(value);
        }
    }
}

/// Move a customer name that reads like an address into the address slot,
/// and an address that reads like a name into an empty name slot.
pub fn resolve_name_and_address(result: &mut ExtractionResult) {
    match (result.customer_name.take(), result.address.take()) {
        (Some(name), address) if looks_like_address(&name) => match address {
            None => {
                debug!("Customer name '{}' looks like an address, moving it", name);
                result.address = Some(name);
            }
            Some(address) if looks_like_name(&address) => {
                debug!("Swapping customer name '{}' and address '{}'", name, address);
                result.customer_name = Some(address);
                result.address = Some(name);
            }
            Some(address) if address.contains(name.as_str()) => {
                debug!("Dropping customer name '{}' already in the address", name);
                result.address = Some(address);
            }
            Some(address) => {
                debug!("Appending address-like customer name '{}' to the address", name);
                result.address = Some(format!("{}, {}", address, name));
            }
        },
        (None, Some(address)) if looks_like_name(&address) => {
            debug!("Address '{}' looks like a name, moving it", address);
            result.customer_name = Some(address);
        }
        (name, address) => {
            result.customer_name = name;
            result.address = address;
        }
    }
}

/// Drop a plate candidate that is really postal-box text.
pub fn suppress_postal_plate(result: &mut ExtractionResult) {
    if result.plate_number.as_deref().is_some_and(is_postal) {
        debug!("Dropping postal-box plate candidate {:?}", result.plate_number);
        result.plate_number = None;
    }
}

/// Replace an absent or header-noise service description with the first
/// item description.
pub fn replace_noisy_service(result: &mut ExtractionResult) {
    if !result.service_description.as_deref().is_none_or(is_noise) {
        return;
    }

    if let Some(description) = first_item_description(&result.items) {
        debug!("Service description taken from first item: '{}'", description);
        result.service_description = Some(description.clone());
        result.item_name = Some(description);
    }
}

fn first_item_description(items: &[LineItem]) -> Option<String> {
    items
        .iter()
        .filter_map(|i| i.description.as_deref())
        .map(str::trim)
        .find(|d| !d.is_empty())
        .map(str::to_string)
}

fn looks_like_address(s: &str) -> bool {
    // Digits after another field's label belong to that field
    let s = EMBEDDED_LABEL.find(s).map_or(s, |m| &s[..m.start()]);
    let has_digit = s.chars().any(|c| c.is_ascii_digit());
    ADDRESS_WORDS.is_match(s) || (has_digit && s.chars().count() > ADDRESS_DIGIT_LEN)
}

fn looks_like_name(s: &str) -> bool {
    let s = s.trim();
    let words = s.split_whitespace().count();
    !s.is_empty()
        && s.chars().count() <= MAX_NAME_LEN
        && (1..=6).contains(&words)
        && !s.chars().any(|c| c.is_ascii_digit())
        && s.chars().next().is_some_and(char::is_uppercase)
        && !ADDRESS_WORDS.is_match(s)
}

fn is_postal(plate: &str) -> bool {
    let upper = plate.to_uppercase();
    let compact = upper.replace('.', " ");
    let compact = compact.split_whitespace().collect::<Vec<_>>().join(" ");
    upper.contains("BOX")
        || upper.contains("P.O")
        || compact == "P O"
        || compact.starts_with("P O ")
        || compact.starts_with("PO ")
}

fn is_noise(s: &str) -> bool {
    let trimmed = s.trim();
    let upper = trimmed.to_uppercase();
    if upper.contains("PROFORMA INVOICE") || upper.contains("CODE DESCRIPTION") {
        return true;
    }
    if trimmed.chars().count() < MIN_SERVICE_LEN {
        return true;
    }

    trimmed
        .split(|c: char| c.is_whitespace() || c == '|')
        .map(|w| w.trim_matches(|c: char| c == ':' || c == '.' || c == ',').to_lowercase())
        .filter(|w| !w.is_empty())
        .all(|w| HEADER_VOCABULARY.contains(&w.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(description: &str) -> LineItem {
        LineItem {
            line_no: 1,
            description: Some(description.to_string()),
            ..LineItem::default()
        }
    }

    #[test]
    fn test_postal_box_name_moves_to_address() {
        let mut result = ExtractionResult {
            customer_name: Some("P.O. Box 455, Dar es Salaam".to_string()),
            ..ExtractionResult::default()
        };
        resolve_name_and_address(&mut result);

        assert_eq!(result.customer_name, None);
        assert_eq!(result.address.as_deref(), Some("P.O. Box 455, Dar es Salaam"));
    }

    #[test]
    fn test_name_and_address_swapped() {
        let mut result = ExtractionResult {
            customer_name: Some("Plot 12, Morogoro Road".to_string()),
            address: Some("Acme Logistics Ltd".to_string()),
            ..ExtractionResult::default()
        };
        resolve_name_and_address(&mut result);

        assert_eq!(result.customer_name.as_deref(), Some("Acme Logistics Ltd"));
        assert_eq!(result.address.as_deref(), Some("Plot 12, Morogoro Road"));
    }

    #[test]
    fn test_address_like_name_joins_filled_address() {
        let mut result = ExtractionResult {
            customer_name: Some("P.O. Box 455".to_string()),
            address: Some("Plot 12, Morogoro Road".to_string()),
            ..ExtractionResult::default()
        };
        resolve_name_and_address(&mut result);

        assert_eq!(result.customer_name, None);
        assert_eq!(result.address.as_deref(), Some("Plot 12, Morogoro Road, P.O. Box 455"));

        let mut result = ExtractionResult {
            customer_name: Some("P.O. Box 455".to_string()),
            address: Some("P.O. Box 455, Dar es Salaam".to_string()),
            ..ExtractionResult::default()
        };
        resolve_name_and_address(&mut result);
        assert_eq!(result.address.as_deref(), Some("P.O. Box 455, Dar es Salaam"));
    }

    #[test]
    fn test_digits_of_embedded_label_do_not_make_an_address() {
        let mut result = ExtractionResult {
            customer_name: Some("JOHN DOE          Date: 15/01/2024".to_string()),
            ..ExtractionResult::default()
        };
        resolve_name_and_address(&mut result);

        assert_eq!(result.customer_name.as_deref(), Some("JOHN DOE          Date: 15/01/2024"));
        assert_eq!(result.address, None);
    }

    #[test]
    fn test_name_like_address_fills_empty_name() {
        let mut result = ExtractionResult {
            address: Some("Juma Hassan".to_string()),
            ..ExtractionResult::default()
        };
        resolve_name_and_address(&mut result);

        assert_eq!(result.customer_name.as_deref(), Some("Juma Hassan"));
        assert_eq!(result.address, None);
    }

    #[test]
    fn test_plain_name_and_address_untouched() {
        let mut result = ExtractionResult {
            customer_name: Some("John Doe".to_string()),
            address: Some("P.O. Box 1, Arusha".to_string()),
            ..ExtractionResult::default()
        };
        let before = result.clone();
        resolve_name_and_address(&mut result);

        assert_eq!(result, before);
    }

    #[test]
    fn test_postal_plate_suppressed() {
        for plate in ["P.O. Box 123", "BOX 123", "p o 123", "PO 1234"] {
            let mut result = ExtractionResult {
                plate_number: Some(plate.to_string()),
                ..ExtractionResult::default()
            };
            suppress_postal_plate(&mut result);
            assert_eq!(result.plate_number, None, "{plate}");
        }

        let mut result = ExtractionResult {
            plate_number: Some("T 123 ABC".to_string()),
            ..ExtractionResult::default()
        };
        suppress_postal_plate(&mut result);
        assert_eq!(result.plate_number.as_deref(), Some("T 123 ABC"));
    }

    #[test]
    fn test_noisy_service_replaced_by_first_item() {
        for noisy in ["PROFORMA INVOICE", "Code Description Qty", "ab", "Description"] {
            let mut result = ExtractionResult {
                service_description: Some(noisy.to_string()),
                items: vec![item("  "), item("Brake pad replacement")],
                ..ExtractionResult::default()
            };
            replace_noisy_service(&mut result);

            assert_eq!(result.service_description.as_deref(), Some("Brake pad replacement"), "{noisy}");
            assert_eq!(result.item_name.as_deref(), Some("Brake pad replacement"));
        }
    }

    #[test]
    fn test_genuine_service_kept() {
        let mut result = ExtractionResult {
            service_description: Some("Full service".to_string()),
            items: vec![item("Oil filter")],
            ..ExtractionResult::default()
        };
        replace_noisy_service(&mut result);
        assert_eq!(result.service_description.as_deref(), Some("Full service"));

        let mut result = ExtractionResult {
            service_description: Some("ab".to_string()),
            ..ExtractionResult::default()
        };
        replace_noisy_service(&mut result);
        assert_eq!(result.service_description.as_deref(), Some("ab"));
    }

    #[test]
    fn test_next_line_fallback() {
        let text = "Customer Name:\n\n  Acme Ltd\nAttended By:\nTel: 0712345678\n";
        let mut result = ExtractionResult::default();
        fill_from_next_line(&mut result, text);

        assert_eq!(result.customer_name.as_deref(), Some("Acme Ltd"));
        assert_eq!(result.attended_by, None);
    }

    #[test]
    fn test_next_line_fallback_keeps_existing_value() {
        let mut result = ExtractionResult {
            customer_name: Some("John Doe".to_string()),
            ..ExtractionResult::default()
        };
        fill_from_next_line(&mut result, "Customer Name:\nSomeone Else");

        assert_eq!(result.customer_name.as_deref(), Some("John Doe"));
    }
}
