//! Built-in rule set and service catalog.
//!
//! Used per field type whenever the pattern store supplies no rules for it.
//! Rules are ordered from the labelled, line-anchored form to the loosest
//! fallback. Label rules use `[ \t]` rather than `\s` so a value is only taken
//! from the remainder of the label's own line.

use crate::models::pattern::{ExtractionRule, FieldType, ServiceCategory, ServiceTemplate};

const TZ_PHONE: &str = r"\+?255[ \t]?\d{3}[ \t]?\d{3}[ \t]?\d{3}|0[67]\d{2}[ \t]?\d{3}[ \t]?\d{3}";
const DATE_VALUE: &str = r"\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}";
const MONEY_VALUE: &str = r"(?:TSH|TZS)?[ \t]*([\d,]+\.?\d{0,2})";

/// Another column's label after a wide gap on the same line.
const COLUMN_TAIL: &str = r"(?:[ \t]{2,}(?:Date|Del(?:\.|ivery)?[ \t]*Date|Tel|Telephone|Phone|Mobile|Fax|Ref|Reference)\b[^\n]*)?";

/// The default extraction rules for every field type.
pub fn default_rules() -> Vec<ExtractionRule> {
    use FieldType::*;

    vec![
        // Code number
        ExtractionRule::new(
            "Code No label",
            CodeNo,
            r"^[ \t]*Code[ \t]*No\.?[ \t]*[:\-]?[ \t]*([A-Z0-9\-/]+)[ \t]*$",
            1,
            5,
        ),
        ExtractionRule::new(
            "Customer Code label",
            CodeNo,
            r"^[ \t]*(?:Customer|Cust\.?)[ \t]*Code[ \t]*[:\-]?[ \t]*([A-Z0-9\-/]+)[ \t]*$",
            1,
            10,
        ),
        // Proforma / invoice number
        ExtractionRule::new(
            "PI No label",
            PiNo,
            r"^[ \t]*(?:PI[ \t]*No\.?|P\.I\.[ \t]*No\.?|Proforma[ \t]*(?:Invoice[ \t]*)?No\.?)[ \t]*[:\-]?[ \t]*([A-Z0-9\-/]+)[ \t]*$",
            1,
            5,
        ),
        ExtractionRule::new(
            "Invoice number from header",
            PiNo,
            r"(?:Proforma[ \t]+Invoice|Invoice)[ \t]*(?:No\.?|#)[ \t]*[:\-]?[ \t]*([A-Z0-9\-/]+)",
            1,
            10,
        ),
        // Dates
        ExtractionRule::new(
            "Date label",
            InvoiceDate,
            format!(r"^[ \t]*(?:Invoice[ \t]*)?Date[ \t]*[:\-]?[ \t]*({DATE_VALUE})[ \t]*$"),
            1,
            5,
        ),
        ExtractionRule::new(
            "Date column",
            InvoiceDate,
            format!(r"(?:^|[ \t]{{2,}})(?:Invoice[ \t]*)?Date[ \t]*[:\-]?[ \t]*({DATE_VALUE})\b"),
            1,
            10,
        ),
        ExtractionRule::new(
            "Delivery Date label",
            DelDate,
            format!(r"^[ \t]*Del(?:\.|ivery)?[ \t]*Date[ \t]*[:\-]?[ \t]*({DATE_VALUE})[ \t]*$"),
            1,
            5,
        ),
        // Telephone
        ExtractionRule::new(
            "Tel label exact",
            CustomerTel,
            format!(r"^[ \t]*Tel[ \t]*[:\-]?[ \t]*({TZ_PHONE}|\+?\d{{7,15}})[ \t]*$"),
            1,
            5,
        ),
        ExtractionRule::new(
            "Tel label TZ formats",
            CustomerTel,
            format!(r"\b(?:Tel|Telephone|Phone)[ \t]*[:\-]?[ \t]*({TZ_PHONE}|\+?\d{{7,15}})"),
            1,
            10,
        ),
        ExtractionRule::new(
            "Phone label TZ formats",
            CustomerPhone,
            format!(r"^[ \t]*(?:Tel|Telephone|Phone|Mobile|Cell)[ \t]*[:\-]?[ \t]*({TZ_PHONE})"),
            1,
            10,
        ),
        // Unlabelled digit run, never on a line that carries another label
        ExtractionRule::new(
            "General phone format",
            CustomerPhone,
            r"^[^:\n]*?(\+?\b\d{9,15})\b",
            1,
            20,
        ),
        // Attendant
        ExtractionRule::new(
            "Attended by label",
            AttendedBy,
            format!(r"^[ \t]*Attended[ \t]*By[ \t]*[:\-]?[ \t]*([^:\s][^\n]*?){COLUMN_TAIL}[ \t]*$"),
            1,
            5,
        ),
        // Vehicle plate: only behind a plate-specific label
        ExtractionRule::new(
            "Plate label",
            PlateNumber,
            r"\b(?:Plate|Reg(?:istration)?|Vehicle|Licen[cs]e)\b[ \t]*(?:No\.?|Number|#)?[ \t]*[:\-]?[ \t]*([A-Z]{1,3}[ \t]?\d{1,5}[ \t]?[A-Z]{2,3}|[A-Z]{2,3}[ \t]?[A-Z]?[ \t]?\d+[ \t]?[A-Z]{2,3})\b",
            1,
            10,
        ),
        // Money
        ExtractionRule::new(
            "Gross Value block",
            Amount,
            format!(r"^[ \t]*Gross[ \t]*Value[ \t]*[:\-]?[ \t]*{MONEY_VALUE}[ \t]*$"),
            1,
            5,
        ),
        ExtractionRule::new(
            "Net Value block",
            Amount,
            format!(r"^[ \t]*Net[ \t]*Value[ \t]*[:\-]?[ \t]*{MONEY_VALUE}[ \t]*$"),
            1,
            10,
        ),
        ExtractionRule::new(
            "Total block",
            Amount,
            format!(r"^[ \t]*(?:Grand[ \t]*Total|Total[ \t]*Amount|Total)[ \t]*[:\-]?[ \t]*{MONEY_VALUE}[ \t]*$"),
            1,
            15,
        ),
        ExtractionRule::new(
            "Net Value line",
            NetValue,
            format!(r"^[ \t]*(?:Net[ \t]*(?:Value|Amount)|Sub[ \t]*-?[ \t]*Total)[ \t]*[:\-]?[ \t]*{MONEY_VALUE}[ \t]*$"),
            1,
            5,
        ),
        ExtractionRule::new(
            "VAT line",
            VatAmount,
            format!(r"^[ \t]*VAT(?:[ \t]*\d{{1,2}}(?:\.\d+)?[ \t]*%)?(?:[ \t]*Amount)?[ \t]*[:\-]?[ \t]*{MONEY_VALUE}[ \t]*$"),
            1,
            5,
        ),
        ExtractionRule::new(
            "Gross Value line",
            GrossValue,
            format!(r"^[ \t]*Gross[ \t]*Value[ \t]*[:\-]?[ \t]*{MONEY_VALUE}[ \t]*$"),
            1,
            5,
        ),
        // Customer
        ExtractionRule::new(
            "Strict Customer Name label",
            CustomerName,
            format!(r"^[ \t]*Customer[ \t]*Name[ \t]*[:\-]?[ \t]*([^:\s][^\n]*?){COLUMN_TAIL}[ \t]*$"),
            1,
            1,
        ),
        ExtractionRule::new(
            "Bill To label",
            CustomerName,
            format!(r"^[ \t]*(?:Bill[ \t]*To|Buyer[ \t]*Name|Customer)[ \t]*[:\-][ \t]*([^:\s][^\n]*?){COLUMN_TAIL}[ \t]*$"),
            1,
            5,
        ),
        ExtractionRule::new(
            "Address block",
            Address,
            r"\bAddress\b[ \t]*[:\-]?[ \t]*([^:\s][^\n]*(?:\n[^\n]+)*?)\n[ \t]*(?:Tel|Telephone|Attended|Reference|PI[ \t]*No|Code[ \t]*No|Fax|Kind[ \t]*Attn|E-?mail)\b",
            1,
            10,
        ),
        ExtractionRule::new(
            "Address line",
            Address,
            format!(r"^[ \t]*Address[ \t]*[:\-]?[ \t]*([^:\s][^\n]*?){COLUMN_TAIL}[ \t]*$"),
            1,
            20,
        ),
        ExtractionRule::new(
            "Email label",
            CustomerEmail,
            r"^[ \t]*E-?mail[ \t]*[:\-]?[ \t]*([^\s@]+@[^\s@]+\.[a-zA-Z]{2,})",
            1,
            5,
        ),
        ExtractionRule::new(
            "Email pattern",
            CustomerEmail,
            r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})",
            1,
            10,
        ),
        // Service
        ExtractionRule::new(
            "Service label",
            ServiceDescription,
            r"^[ \t]*(?:Service(?:[ \t]*(?:Description|Requested|Type))?|Job[ \t]*Description|Work[ \t]*Done)[ \t]*[:\-][ \t]*([^:\s][^\n]*?)[ \t]*$",
            1,
            5,
        ),
        ExtractionRule::new(
            "Service/description field",
            ServiceDescription,
            r"\b(?:Service|Description|Item)\b[ \t]*[:\-]?[ \t]*([A-Za-z0-9 \t,./\\\-]+?)[ \t]*(?:\n|Qty|Quantity|$)",
            1,
            10,
        ),
        ExtractionRule::new(
            "Quantity field",
            Quantity,
            r"\b(?:QTY|Quantity)\b[ \t]*[:\-]?[ \t]*(\d+)",
            1,
            10,
        ),
        // Reference
        ExtractionRule::new(
            "Reference labeled full",
            Reference,
            r"^[ \t]*Reference[ \t]*[:\-]?[ \t]*([A-Z0-9 \t\-/]+?)[ \t]*$",
            1,
            1,
        ),
        ExtractionRule::new(
            "Ref short",
            Reference,
            r"^[ \t]*Ref(?:\.|[ \t]*No\.?)?[ \t]*[:\-]?[ \t]*([A-Z0-9 \t\-/]+?)[ \t]*$",
            1,
            5,
        ),
    ]
}

/// The default service catalog.
pub fn default_templates() -> Vec<ServiceTemplate> {
    use ServiceCategory::*;

    vec![
        ServiceTemplate::new(
            "Oil Service",
            ["oil", "oil change", "oil filter", "engine oil", "lubricant"],
            45,
            Maintenance,
        ),
        ServiceTemplate::new(
            "Brake Service",
            ["brake", "brake pad", "brake fluid", "disc", "caliper", "brake shoe"],
            90,
            Repair,
        ),
        ServiceTemplate::new(
            "Tyre Service",
            ["tyre", "tire", "puncture", "wheel balancing", "rotation"],
            40,
            Tyres,
        ),
        ServiceTemplate::new(
            "Wheel Alignment",
            ["alignment", "wheel alignment", "steering", "toe"],
            60,
            Tyres,
        ),
        ServiceTemplate::new(
            "Diagnostics",
            ["diagnostic", "diagnosis", "scan", "check engine", "inspection"],
            30,
            Diagnostics,
        ),
        ServiceTemplate::new(
            "Battery & Electrical",
            ["battery", "alternator", "starter", "wiring", "electrical", "fuse"],
            60,
            Electrical,
        ),
        ServiceTemplate::new(
            "Air Conditioning",
            ["a/c", "aircon", "air conditioning", "ac gas", "compressor"],
            90,
            Repair,
        ),
        ServiceTemplate::new(
            "Suspension",
            ["shock", "absorber", "suspension", "bush", "ball joint", "stabilizer"],
            120,
            Repair,
        ),
        ServiceTemplate::new(
            "Engine Repair",
            ["engine", "overhaul", "gasket", "timing", "cylinder head"],
            240,
            Repair,
        ),
        ServiceTemplate::new(
            "Body Work",
            ["panel", "paint", "dent", "bumper", "body work"],
            180,
            Bodywork,
        ),
    ]
}
