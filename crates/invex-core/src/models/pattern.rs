//! Extraction rules and service templates supplied by the pattern registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// A named category of invoice data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    CodeNo,
    PiNo,
    InvoiceDate,
    DelDate,
    CustomerTel,
    AttendedBy,
    PlateNumber,
    Amount,
    CustomerPhone,
    CustomerName,
    Address,
    CustomerEmail,
    ServiceDescription,
    Quantity,
    Reference,
    NetValue,
    VatAmount,
    GrossValue,
}

impl FieldType {
    /// Every field type, in header-extraction order.
    pub const ALL: [FieldType; 18] = [
        FieldType::PlateNumber,
        FieldType::CustomerName,
        FieldType::CustomerPhone,
        FieldType::CustomerEmail,
        FieldType::CustomerTel,
        FieldType::Address,
        FieldType::ServiceDescription,
        FieldType::Quantity,
        FieldType::Amount,
        FieldType::Reference,
        FieldType::CodeNo,
        FieldType::PiNo,
        FieldType::InvoiceDate,
        FieldType::DelDate,
        FieldType::AttendedBy,
        FieldType::NetValue,
        FieldType::VatAmount,
        FieldType::GrossValue,
    ];

    /// Stable snake_case name, as used by the pattern store.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::CodeNo => "code_no",
            FieldType::PiNo => "pi_no",
            FieldType::InvoiceDate => "invoice_date",
            FieldType::DelDate => "del_date",
            FieldType::CustomerTel => "customer_tel",
            FieldType::AttendedBy => "attended_by",
            FieldType::PlateNumber => "plate_number",
            FieldType::Amount => "amount",
            FieldType::CustomerPhone => "customer_phone",
            FieldType::CustomerName => "customer_name",
            FieldType::Address => "address",
            FieldType::CustomerEmail => "customer_email",
            FieldType::ServiceDescription => "service_description",
            FieldType::Quantity => "quantity",
            FieldType::Reference => "reference",
            FieldType::NetValue => "net_value",
            FieldType::VatAmount => "vat_amount",
            FieldType::GrossValue => "gross_value",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        FieldType::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| format!("unknown field type: {}", s))
    }
}

/// A named, prioritised text-matching definition with one designated capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// Human-readable rule name, used in logs.
    pub name: String,

    /// Field this rule extracts.
    pub field_type: FieldType,

    /// Regular expression source.
    #[serde(alias = "regex", alias = "regex_pattern")]
    pub pattern: String,

    /// Capture group holding the value.
    #[serde(default = "default_capture_index", alias = "group", alias = "extract_group")]
    pub capture_index: usize,

    /// Ascending: lower numbers are tried first.
    #[serde(default = "default_priority")]
    pub priority: i32,

    /// Inactive rules are ignored on load.
    #[serde(default = "default_active", alias = "is_active")]
    pub active: bool,
}

fn default_capture_index() -> usize {
    1
}

fn default_priority() -> i32 {
    10
}

fn default_active() -> bool {
    true
}

impl ExtractionRule {
    /// Create an active rule.
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        pattern: impl Into<String>,
        capture_index: usize,
        priority: i32,
    ) -> Self {
        Self {
            name: name.into(),
            field_type,
            pattern: pattern.into(),
            capture_index,
            priority,
            active: true,
        }
    }
}

/// Broad grouping of a canonical workshop service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Maintenance,
    Repair,
    Tyres,
    Diagnostics,
    Electrical,
    Bodywork,
    #[default]
    #[serde(other)]
    Other,
}

/// A keyword-weighted definition of a canonical service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTemplate {
    /// Canonical service name.
    pub name: String,

    /// Lower-case keywords scored as substrings.
    #[serde(deserialize_with = "deserialize_keywords")]
    pub keywords: Vec<String>,

    /// Estimated job duration.
    #[serde(alias = "minutes")]
    pub estimated_minutes: u32,

    /// Service grouping.
    #[serde(default, alias = "service_type")]
    pub service_category: ServiceCategory,

    /// Inactive templates are ignored on load.
    #[serde(default = "default_active", alias = "is_active")]
    pub active: bool,
}

impl ServiceTemplate {
    /// Create an active template, normalising keywords.
    pub fn new<I, S>(
        name: impl Into<String>,
        keywords: I,
        estimated_minutes: u32,
        service_category: ServiceCategory,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            keywords: normalize_keywords(keywords),
            estimated_minutes,
            service_category,
            active: true,
        }
    }
}

/// Trim, lower-case and drop empty keywords.
pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Keywords may be stored as a comma-separated string or as an array.
fn deserialize_keywords<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Keywords {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Keywords::deserialize(deserializer)? {
        Keywords::Joined(s) => normalize_keywords(s.split(',')),
        Keywords::List(list) => normalize_keywords(list),
    })
}
