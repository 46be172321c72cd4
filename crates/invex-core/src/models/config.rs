//! Configuration structures for the extraction engine.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{InvexError, Result};

/// Main configuration for invex.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvexConfig {
    /// Orchestrator limits.
    pub extraction: ExtractionConfig,

    /// Line-item table heuristics.
    pub table: TableConfig,

    /// Pattern store location.
    pub patterns: PatternsConfig,
}

/// Orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Text before the first occurrence of this heading is discarded
    /// (case-insensitive). Empty disables the cut.
    pub section_heading: String,

    /// Maximum characters kept in the audit excerpt.
    pub raw_text_excerpt: usize,

    /// Input text is cut to this many characters before matching.
    pub max_text_len: usize,

    /// Each line is cut to this many characters before matching.
    pub max_line_len: usize,

    /// Table reconstruction fails beyond this many items.
    pub max_items: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            section_heading: "proforma invoice".to_string(),
            raw_text_excerpt: 10_000,
            max_text_len: 200_000,
            max_line_len: 4_000,
            max_items: 500,
        }
    }
}

/// Line-item table reconstruction thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Column markers a line needs to count as the table header.
    pub min_header_markers: usize,

    /// Item rows shorter than this (in characters) are noise.
    pub min_row_len: usize,

    /// Descriptions shorter than this are discarded.
    pub min_description_len: usize,

    /// A leading integer below this is taken as a serial number.
    pub serial_max: u32,

    /// Smallest plausible quantity.
    pub qty_min: Decimal,

    /// Largest plausible quantity.
    pub qty_max: Decimal,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_header_markers: 3,
            min_row_len: 6,
            min_description_len: 3,
            serial_max: 100,
            qty_min: Decimal::new(1, 1),
            qty_max: Decimal::from(10_000),
        }
    }
}

impl TableConfig {
    /// Whether a number is in the plausible quantity range.
    pub fn is_quantity(&self, value: Decimal) -> bool {
        value >= self.qty_min && value <= self.qty_max
    }
}

/// Pattern store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    /// JSON pattern store. Built-in defaults are used when unset.
    pub store_path: Option<PathBuf>,
}

impl InvexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| InvexError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Look up a dotted key such as `table.serial_max`.
    pub fn get(&self, key: &str) -> Result<serde_json::Value> {
        let json = serde_json::to_value(self)?;
        key.split('.')
            .try_fold(&json, |current, part| current.get(part))
            .cloned()
            .ok_or_else(|| InvexError::Config(format!("configuration key not found: {}", key)))
    }

    /// Set a dotted key. The value is parsed as JSON, or taken as a string.
    pub fn set(&mut self, key: &str, value: &str) -> Result<serde_json::Value> {
        let parsed: serde_json::Value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

        let mut json = serde_json::to_value(&*self)?;
        let (parents, last) = match key.rsplit_once('.') {
            Some((parents, last)) => (Some(parents), last),
            None => (None, key),
        };

        let mut current = &mut json;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            current = current
                .get_mut(part)
                .ok_or_else(|| InvexError::Config(format!("configuration path not found: {}", key)))?;
        }

        let object = current
            .as_object_mut()
            .ok_or_else(|| InvexError::Config(format!("cannot set value at non-object path: {}", key)))?;
        if !object.contains_key(last) {
            return Err(InvexError::Config(format!("configuration key not found: {}", key)));
        }
        object.insert(last.to_string(), parsed.clone());

        *self = serde_json::from_value(json)
            .map_err(|e| InvexError::Config(format!("invalid value for {}: {}", key, e)))?;
        Ok(parsed)
    }
}
