//! Date parsing for extracted date fields.
//!
//! Date fields are kept verbatim in the record; consumers that need a
//! calendar date call [`parse_invoice_date`].

use chrono::NaiveDate;

use super::patterns::{DATE_DMY, DATE_YMD};

/// Parse `dd/mm/yyyy`, `dd-mm-yy`, `dd.mm.yyyy` or `yyyy-mm-dd`.
pub fn parse_invoice_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Some(caps) = DATE_YMD.captures(s) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    let caps = DATE_DMY.captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = parse_year(&caps[3])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(if year < 100 {
        // Two-digit year: 00-50 => 2000s, 51-99 => 1900s
        if year <= 50 { 2000 + year } else { 1900 + year }
    } else {
        year
    })
}
