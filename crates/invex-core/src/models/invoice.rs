//! Invoice extraction records.
//!
//! [`ExtractionResult`] is the fixed-shape record handed to downstream
//! business-record creation. Every slot is optional and absent slots are
//! omitted when serialized, so present keys always carry a value.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::invoice::rules::amounts::{format_amount, to_decimal};
use crate::models::pattern::FieldType;

/// A single recovered line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// 1-based, in discovery order.
    #[serde(default)]
    pub line_no: u32,

    /// Item or part code.
    #[serde(
        default,
        alias = "item_code",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub code: Option<String>,

    /// Item description.
    #[serde(
        default,
        alias = "desc",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,

    /// Quantity.
    #[serde(
        default,
        alias = "qty",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<Decimal>,

    /// Unit of measure.
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub unit: Option<String>,

    /// Unit rate.
    #[serde(
        default,
        alias = "rate_tsh",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub rate: Option<Decimal>,

    /// Line value.
    #[serde(
        default,
        alias = "amount",
        alias = "value_tsh",
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Decimal>,

    #[serde(
        default,
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub net_value: Option<Decimal>,

    #[serde(
        default,
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub vat: Option<Decimal>,

    #[serde(
        default,
        deserialize_with = "lenient_decimal",
        skip_serializing_if = "Option::is_none"
    )]
    pub gross_value: Option<Decimal>,
}

impl LineItem {
    /// Compare everything except the line number.
    pub fn same_content(&self, other: &LineItem) -> bool {
        self.code == other.code
            && self.description == other.description
            && self.quantity == other.quantity
            && self.unit == other.unit
            && self.rate == other.rate
            && self.value == other.value
            && self.net_value == other.net_value
            && self.vat == other.vat
            && self.gross_value == other.gross_value
    }
}

/// The structured record produced for one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_tel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    /// Normalized decimal string of the headline amount.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pi_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub del_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attended_by: Option<String>,
    /// Canonical service picked by the template matcher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<LineItem>,
    /// Bounded excerpt of the source text, kept for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_value: Option<String>,
    /// Set only when no usable record could be produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionResult {
    /// An explicit failure record.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Whether this is a failure record.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The header slot a field type writes to.
    pub fn field(&self, field: FieldType) -> Option<&str> {
        let slot = match field {
            FieldType::CodeNo => &self.code_no,
            FieldType::PiNo => &self.pi_no,
            FieldType::InvoiceDate => &self.invoice_date,
            FieldType::DelDate => &self.del_date,
            FieldType::CustomerTel => &self.customer_tel,
            FieldType::AttendedBy => &self.attended_by,
            FieldType::PlateNumber => &self.plate_number,
            FieldType::Amount => &self.amount,
            FieldType::CustomerPhone => &self.customer_phone,
            FieldType::CustomerName => &self.customer_name,
            FieldType::Address => &self.address,
            FieldType::CustomerEmail => &self.customer_email,
            FieldType::ServiceDescription => &self.service_description,
            FieldType::Quantity => &self.quantity,
            FieldType::Reference => &self.reference,
            FieldType::NetValue => &self.net_value,
            FieldType::VatAmount => &self.vat_amount,
            FieldType::GrossValue => &self.gross_value,
        };
        slot.as_deref()
    }

    /// Mutable access to the header slot a field type writes to.
    pub fn field_mut(&mut self, field: FieldType) -> &mut Option<String> {
        match field {
            FieldType::CodeNo => &mut self.code_no,
            FieldType::PiNo => &mut self.pi_no,
            FieldType::InvoiceDate => &mut self.invoice_date,
            FieldType::DelDate => &mut self.del_date,
            FieldType::CustomerTel => &mut self.customer_tel,
            FieldType::AttendedBy => &mut self.attended_by,
            FieldType::PlateNumber => &mut self.plate_number,
            FieldType::Amount => &mut self.amount,
            FieldType::CustomerPhone => &mut self.customer_phone,
            FieldType::CustomerName => &mut self.customer_name,
            FieldType::Address => &mut self.address,
            FieldType::CustomerEmail => &mut self.customer_email,
            FieldType::ServiceDescription => &mut self.service_description,
            FieldType::Quantity => &mut self.quantity,
            FieldType::Reference => &mut self.reference,
            FieldType::NetValue => &mut self.net_value,
            FieldType::VatAmount => &mut self.vat_amount,
            FieldType::GrossValue => &mut self.gross_value,
        }
    }

    fn text_slots(&self) -> [&Option<String>; 22] {
        [
            &self.plate_number,
            &self.customer_name,
            &self.customer_phone,
            &self.customer_email,
            &self.customer_tel,
            &self.address,
            &self.service_description,
            &self.item_name,
            &self.quantity,
            &self.amount,
            &self.reference,
            &self.code_no,
            &self.customer_code,
            &self.pi_no,
            &self.invoice_date,
            &self.del_date,
            &self.attended_by,
            &self.matched_service,
            &self.raw_text,
            &self.vat_amount,
            &self.net_value,
            &self.gross_value,
        ]
    }

    fn text_slots_mut(&mut self) -> [&mut Option<String>; 22] {
        [
            &mut self.plate_number,
            &mut self.customer_name,
            &mut self.customer_phone,
            &mut self.customer_email,
            &mut self.customer_tel,
            &mut self.address,
            &mut self.service_description,
            &mut self.item_name,
            &mut self.quantity,
            &mut self.amount,
            &mut self.reference,
            &mut self.code_no,
            &mut self.customer_code,
            &mut self.pi_no,
            &mut self.invoice_date,
            &mut self.del_date,
            &mut self.attended_by,
            &mut self.matched_service,
            &mut self.raw_text,
            &mut self.vat_amount,
            &mut self.net_value,
            &mut self.gross_value,
        ]
    }

    /// Fill gaps from a secondary source.
    ///
    /// Values already present here always win. Items are concatenated with
    /// exact duplicates removed (first-seen order kept) and renumbered, so
    /// merging a record with itself changes nothing.
    pub fn merge_from(&mut self, other: &ExtractionResult) {
        let theirs: Vec<Option<String>> = other.text_slots().into_iter().cloned().collect();
        for (mine, theirs) in self.text_slots_mut().into_iter().zip(theirs) {
            if is_blank(mine) && !is_blank(&theirs) {
                *mine = theirs;
            }
        }

        if self.estimated_minutes.is_none() {
            self.estimated_minutes = other.estimated_minutes;
        }

        for item in &other.items {
            if !self.items.iter().any(|existing| existing.same_content(item)) {
                self.items.push(item.clone());
            }
        }
        renumber(&mut self.items);
    }

    /// Drop empty strings so that every present key carries a value.
    pub fn prune(&mut self) {
        for slot in self.text_slots_mut() {
            if is_blank(slot) {
                *slot = None;
            }
        }
        if is_blank(&self.error) {
            self.error = None;
        }
    }

    /// Exact sum of item values, if any item carries one.
    pub fn items_total(&self) -> Option<Decimal> {
        let values: Vec<Decimal> = self.items.iter().filter_map(|i| i.value).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.into_iter().sum())
        }
    }
}

/// Reassign contiguous 1-based line numbers.
pub fn renumber(items: &mut [LineItem]) {
    for (idx, item) in items.iter_mut().enumerate() {
        item.line_no = idx as u32 + 1;
    }
}

fn is_blank(slot: &Option<String>) -> bool {
    slot.as_deref().is_none_or(|s| s.trim().is_empty())
}

/// Header block of a decoder's structured output.
///
/// Accepts the decoder's own key names as aliases.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecodedHeader {
    #[serde(alias = "invoice_no", deserialize_with = "lenient_text")]
    pub pi_no: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub code_no: Option<String>,
    #[serde(alias = "date", deserialize_with = "lenient_text")]
    pub invoice_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub del_date: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub customer_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub address: Option<String>,
    #[serde(alias = "phone", deserialize_with = "lenient_text")]
    pub customer_phone: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub customer_tel: Option<String>,
    #[serde(alias = "email", deserialize_with = "lenient_text")]
    pub customer_email: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub reference: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub plate_number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub attended_by: Option<String>,
    #[serde(alias = "subtotal", deserialize_with = "lenient_text")]
    pub net_value: Option<String>,
    #[serde(alias = "tax", deserialize_with = "lenient_text")]
    pub vat_amount: Option<String>,
    #[serde(alias = "total", deserialize_with = "lenient_text")]
    pub gross_value: Option<String>,
}

/// Structured side-channel output of an external document decoder.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StructuredData {
    pub header: DecodedHeader,
    pub items: Vec<LineItem>,
    pub vehicle_plates: Vec<String>,
}

impl From<&StructuredData> for ExtractionResult {
    fn from(data: &StructuredData) -> Self {
        let header = data.header.clone();
        let mut items = data.items.clone();
        renumber(&mut items);

        let plate_number = header.plate_number.or_else(|| {
            data.vehicle_plates
                .iter()
                .map(|p| p.trim())
                .find(|p| !p.is_empty())
                .map(str::to_string)
        });

        let gross_value = normalized_money(header.gross_value.as_deref());
        let net_value = normalized_money(header.net_value.as_deref());

        Self {
            plate_number,
            customer_name: header.customer_name,
            customer_phone: header.customer_phone,
            customer_email: header.customer_email,
            customer_tel: header.customer_tel,
            address: header.address,
            reference: header.reference,
            customer_code: header.code_no.clone(),
            code_no: header.code_no,
            pi_no: header.pi_no,
            invoice_date: header.invoice_date,
            del_date: header.del_date,
            attended_by: header.attended_by,
            amount: gross_value.clone().or_else(|| net_value.clone()),
            vat_amount: normalized_money(header.vat_amount.as_deref()),
            net_value,
            gross_value,
            items,
            ..Self::default()
        }
    }
}

/// Decoder money values in the same exact form as extracted ones.
fn normalized_money(raw: Option<&str>) -> Option<String> {
    raw.and_then(to_decimal).map(format_amount)
}

/// What an external document decoder hands over for one file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecodedDocument {
    pub success: bool,
    pub raw_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<StructuredData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecodedDocument {
    /// A successfully decoded text document.
    pub fn from_text(raw_text: impl Into<String>) -> Self {
        Self {
            success: true,
            raw_text: raw_text.into(),
            structured_data: None,
            error: None,
        }
    }

    /// A document the decoder could not read.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            raw_text: String::new(),
            structured_data: None,
            error: Some(error.into()),
        }
    }
}

/// Accept strings or numbers; blank becomes absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept strings or numbers through the amount normalizer; junk becomes absent.
fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => to_decimal(&s),
        serde_json::Value::Number(n) => to_decimal(&n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn item(desc: &str, value: &str) -> LineItem {
        LineItem {
            description: Some(desc.to_string()),
            value: Decimal::from_str(value).ok(),
            ..LineItem::default()
        }
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let result = ExtractionResult {
            customer_name: Some("John Doe".to_string()),
            ..ExtractionResult::default()
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"customer_name": "John Doe"}));
    }

    #[test]
    fn test_merge_prefers_primary_and_fills_gaps() {
        let mut primary = ExtractionResult {
            customer_name: Some("John Doe".to_string()),
            ..ExtractionResult::default()
        };
        let secondary = ExtractionResult {
            customer_name: Some("J. Doe".to_string()),
            address: Some("P.O. Box 1".to_string()),
            ..ExtractionResult::default()
        };

        primary.merge_from(&secondary);

        assert_eq!(primary.customer_name.as_deref(), Some("John Doe"));
        assert_eq!(primary.address.as_deref(), Some("P.O. Box 1"));
    }

    #[test]
    fn test_merge_concatenates_items_without_duplicates() {
        let mut primary = ExtractionResult::default();
        primary.items = vec![item("Oil filter", "100"), item("Labour", "200")];
        renumber(&mut primary.items);

        let mut secondary = ExtractionResult::default();
        secondary.items = vec![item("Labour", "200"), item("Brake pads", "300")];
        renumber(&mut secondary.items);

        primary.merge_from(&secondary);

        let descs: Vec<_> = primary
            .items
            .iter()
            .map(|i| (i.line_no, i.description.clone().unwrap()))
            .collect();
        assert_eq!(
            descs,
            vec![
                (1, "Oil filter".to_string()),
                (2, "Labour".to_string()),
                (3, "Brake pads".to_string()),
            ]
        );
    }

    #[test]
    fn test_merge_with_self_is_noop() {
        let mut result = ExtractionResult {
            customer_name: Some("John Doe".to_string()),
            amount: Some("150000.00".to_string()),
            estimated_minutes: Some(45),
            ..ExtractionResult::default()
        };
        result.items = vec![item("Oil filter", "100"), item("Labour", "200")];
        renumber(&mut result.items);

        let snapshot = result.clone();
        result.merge_from(&snapshot);

        assert_eq!(result, snapshot);
    }

    #[test]
    fn test_prune_drops_blank_strings() {
        let mut result = ExtractionResult {
            reference: Some("   ".to_string()),
            pi_no: Some("PI-1".to_string()),
            ..ExtractionResult::default()
        };
        result.prune();

        assert_eq!(result.reference, None);
        assert_eq!(result.pi_no.as_deref(), Some("PI-1"));
    }

    #[test]
    fn test_structured_data_accepts_decoder_vocabulary() {
        let json = r#"{
            "header": {"invoice_no": "PI-77", "phone": "0712 000 111", "total": 1500.5, "subtotal": ""},
            "items": [
                {"item_code": "SP1", "desc": "Oil filter", "qty": "2", "rate_tsh": "1,000", "amount": "2,000.00"},
                {"description": "Labour", "value": "abc"}
            ],
            "vehicle_plates": ["T 123 ABC"]
        }"#;
        let data: StructuredData = serde_json::from_str(json).unwrap();
        let result = ExtractionResult::from(&data);

        assert_eq!(result.pi_no.as_deref(), Some("PI-77"));
        assert_eq!(result.customer_phone.as_deref(), Some("0712 000 111"));
        assert_eq!(result.gross_value.as_deref(), Some("1500.5"));
        assert_eq!(result.net_value, None);
        assert_eq!(result.plate_number.as_deref(), Some("T 123 ABC"));

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.items[0].line_no, 1);
        assert_eq!(result.items[0].code.as_deref(), Some("SP1"));
        assert_eq!(result.items[0].quantity, Some(Decimal::from(2)));
        assert_eq!(result.items[0].rate, Some(Decimal::from(1000)));
        assert_eq!(result.items[0].value, Decimal::from_str("2000.00").ok());
        assert_eq!(result.items[1].line_no, 2);
        assert_eq!(result.items[1].value, None);
    }

    #[test]
    fn test_structured_money_is_normalized() {
        let json = r#"{"header": {"total": "1,500.50", "subtotal": "TSH 1,271.61", "tax": "228.89"}}"#;
        let data: StructuredData = serde_json::from_str(json).unwrap();
        let result = ExtractionResult::from(&data);

        assert_eq!(result.gross_value.as_deref(), Some("1500.50"));
        assert_eq!(result.net_value.as_deref(), Some("1271.61"));
        assert_eq!(result.vat_amount.as_deref(), Some("228.89"));
        assert_eq!(result.amount.as_deref(), Some("1500.50"));

        let data: StructuredData = serde_json::from_str(r#"{"header": {"total": "n/a"}}"#).unwrap();
        let result = ExtractionResult::from(&data);
        assert_eq!(result.gross_value, None);
        assert_eq!(result.amount, None);
    }

    #[test]
    fn test_items_total_is_exact() {
        let mut result = ExtractionResult::default();
        result.items = vec![item("a", "0.10"), item("b", "0.20"), item("c", "x")];

        assert_eq!(result.items_total(), Decimal::from_str("0.30").ok());
        assert_eq!(ExtractionResult::default().items_total(), None);
    }
}
