//! External pattern store interface.
//!
//! The store is a configuration source for named rule sets and service
//! templates. The registry reads it once; an empty or failing store leaves
//! the built-in defaults in charge.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::pattern::{ExtractionRule, ServiceTemplate};

/// Everything a store hands over in one read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSnapshot {
    pub rules: Vec<ExtractionRule>,
    pub templates: Vec<ServiceTemplate>,
}

impl StoreSnapshot {
    /// Whether the store supplied anything at all.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.templates.is_empty()
    }
}

/// A source of extraction rules and service templates.
pub trait PatternStore: Send + Sync {
    /// Read every record.
    fn load(&self) -> Result<StoreSnapshot, StoreError>;

    /// Short description for logs.
    fn describe(&self) -> String {
        "pattern store".to_string()
    }
}

/// A store with nothing in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyStore;

impl PatternStore for EmptyStore {
    fn load(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(StoreSnapshot::default())
    }

    fn describe(&self) -> String {
        "empty store".to_string()
    }
}

/// An in-memory store.
#[derive(Debug, Clone, Default)]
pub struct StaticStore {
    snapshot: StoreSnapshot,
}

impl StaticStore {
    pub fn new(snapshot: StoreSnapshot) -> Self {
        Self { snapshot }
    }
}

impl PatternStore for StaticStore {
    fn load(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(self.snapshot.clone())
    }

    fn describe(&self) -> String {
        format!(
            "static store ({} rules, {} templates)",
            self.snapshot.rules.len(),
            self.snapshot.templates.len()
        )
    }
}

/// A store backed by a JSON document on disk.
///
/// ```json
/// {
///   "rules": [{"name": "...", "field_type": "plate_number", "pattern": "...", "priority": 1}],
///   "templates": [{"name": "Oil Service", "keywords": "oil, filter", "estimated_minutes": 45}]
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JsonPatternStore {
    path: PathBuf,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    rules: Vec<serde_json::Value>,
    #[serde(default)]
    templates: Vec<serde_json::Value>,
}

impl JsonPatternStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PatternStore for JsonPatternStore {
    fn load(&self) -> Result<StoreSnapshot, StoreError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            StoreError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let raw: RawSnapshot =
            serde_json::from_str(&content).map_err(|e| StoreError::Malformed {
                record: self.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut snapshot = StoreSnapshot::default();

        for (i, value) in raw.rules.into_iter().enumerate() {
            let rule: ExtractionRule =
                serde_json::from_value(value).map_err(|e| StoreError::Malformed {
                    record: format!("rules[{}]", i),
                    reason: e.to_string(),
                })?;
            snapshot.rules.push(rule);
        }

        for (i, value) in raw.templates.into_iter().enumerate() {
            let template: ServiceTemplate =
                serde_json::from_value(value).map_err(|e| StoreError::Malformed {
                    record: format!("templates[{}]", i),
                    reason: e.to_string(),
                })?;
            snapshot.templates.push(template);
        }

        Ok(snapshot)
    }

    fn describe(&self) -> String {
        format!("JSON store at {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pattern::FieldType;
    use std::io::Write;

    fn write_store(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_json_store_loads_records() {
        let file = write_store(
            r#"{
                "rules": [{"name": "Plate", "field_type": "plate_number", "regex": "Plate:\\s*(\\S+)", "priority": 1}],
                "templates": [{"name": "Oil Service", "keywords": "oil, filter", "estimated_minutes": 45}]
            }"#,
        );

        let snapshot = JsonPatternStore::new(file.path()).load().unwrap();

        assert_eq!(snapshot.rules.len(), 1);
        assert_eq!(snapshot.rules[0].field_type, FieldType::PlateNumber);
        assert_eq!(snapshot.rules[0].capture_index, 1);
        assert_eq!(snapshot.templates[0].keywords, vec!["oil", "filter"]);
    }

    #[test]
    fn test_json_store_names_malformed_record() {
        let file = write_store(r#"{"rules": [{"name": "x", "field_type": "nonsense", "pattern": "a"}]}"#);

        match JsonPatternStore::new(file.path()).load() {
            Err(StoreError::Malformed { record, .. }) => assert_eq!(record, "rules[0]"),
            other => panic!("expected malformed record, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let result = JsonPatternStore::new("/nonexistent/invex/patterns.json").load();
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_empty_store() {
        assert!(EmptyStore.load().unwrap().is_empty());
    }
}
