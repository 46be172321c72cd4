//! Pattern registry.
//!
//! Holds, per field type, the ordered rule list used by the field extractor
//! and the service catalog used by the template matcher. Rules from the
//! pattern store replace the built-in defaults per field type; the two are
//! never merged.
//!
//! A process-wide registry is loaded at most once. The first caller of
//! [`init_global`] (or [`global`]) performs the load; everyone else reuses the
//! cached result for the lifetime of the process.

pub mod defaults;
pub mod store;

pub use store::{EmptyStore, JsonPatternStore, PatternStore, StaticStore, StoreSnapshot};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use lazy_static::lazy_static;
use tracing::{debug, info, warn};

use crate::invoice::rules::CompiledRule;
use crate::models::pattern::{ExtractionRule, FieldType, ServiceTemplate};

use defaults::{default_rules, default_templates};

type RuleTable = HashMap<FieldType, Vec<CompiledRule>>;

lazy_static! {
    static ref DEFAULT_RULES: RuleTable = compile_rules(default_rules());
    static ref DEFAULT_REGISTRY: Arc<PatternRegistry> = Arc::new(PatternRegistry::with_defaults());
    static ref GLOBAL: Mutex<Option<Arc<PatternRegistry>>> = Mutex::new(None);
}

/// Where a set of rules or templates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySource {
    Store,
    Defaults,
}

impl fmt::Display for RegistrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrySource::Store => f.write_str("store"),
            RegistrySource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

/// Loaded rules and templates.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    store_rules: RuleTable,
    templates: Vec<ServiceTemplate>,
    template_source: RegistrySource,
}

impl PatternRegistry {
    /// A registry that only knows the built-in defaults.
    pub fn with_defaults() -> Self {
        Self {
            store_rules: RuleTable::new(),
            templates: default_templates(),
            template_source: RegistrySource::Defaults,
        }
    }

    /// Load from a store, falling back to defaults if the store fails.
    pub fn load(store: &dyn PatternStore) -> Self {
        match store.load() {
            Ok(snapshot) => {
                let registry = Self::from_snapshot(snapshot);
                info!(
                    "Pattern registry loaded from {}: {} store rules across {} field types, templates from {}",
                    store.describe(),
                    registry.store_rules.values().map(Vec::len).sum::<usize>(),
                    registry.store_rules.len(),
                    registry.template_source
                );
                registry
            }
            Err(e) => {
                warn!("Pattern store {} failed, using built-in defaults: {}", store.describe(), e);
                Self::with_defaults()
            }
        }
    }

    /// Build from a snapshot: inactive records are dropped and rules are
    /// ordered by ascending priority, keeping store order for ties.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut rules: Vec<ExtractionRule> =
            snapshot.rules.into_iter().filter(|r| r.active).collect();
        rules.sort_by_key(|r| r.priority);

        let store_rules = compile_rules(rules);
        for rule in store_rules.values().flatten().filter(|r| !r.is_valid()) {
            warn!("Store rule '{}' has an invalid pattern and will be skipped", rule.name());
        }

        let mut templates: Vec<ServiceTemplate> = Vec::new();
        for template in snapshot.templates.into_iter().filter(|t| t.active) {
            match templates.iter_mut().find(|t| t.name == template.name) {
                Some(existing) => *existing = template,
                None => templates.push(template),
            }
        }

        let (templates, template_source) = if templates.is_empty() {
            (default_templates(), RegistrySource::Defaults)
        } else {
            (templates, RegistrySource::Store)
        };

        Self {
            store_rules,
            templates,
            template_source,
        }
    }

    /// Ordered rules for a field type.
    pub fn rules_for(&self, field: FieldType) -> &[CompiledRule] {
        match self.store_rules.get(&field) {
            Some(rules) if !rules.is_empty() => rules.as_slice(),
            _ => DEFAULT_RULES.get(&field).map(Vec::as_slice).unwrap_or(&[]),
        }
    }

    /// Whether a field's rules come from the store or the defaults.
    pub fn rules_source(&self, field: FieldType) -> RegistrySource {
        if self.store_rules.get(&field).is_some_and(|r| !r.is_empty()) {
            RegistrySource::Store
        } else {
            RegistrySource::Defaults
        }
    }

    /// The service catalog, in store order.
    pub fn templates(&self) -> &[ServiceTemplate] {
        &self.templates
    }

    pub fn template_source(&self) -> RegistrySource {
        self.template_source
    }
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn compile_rules(rules: Vec<ExtractionRule>) -> RuleTable {
    let mut table = RuleTable::new();
    for rule in rules {
        table
            .entry(rule.field_type)
            .or_default()
            .push(CompiledRule::compile(rule));
    }
    table
}

/// Load the process-wide registry from `store` unless it is already loaded.
///
/// Concurrent first callers wait for the one performing the load.
pub fn init_global(store: &dyn PatternStore) -> Arc<PatternRegistry> {
    let mut guard = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(registry) = guard.as_ref() {
        return Arc::clone(registry);
    }

    let registry = Arc::new(PatternRegistry::load(store));
    *guard = Some(Arc::clone(&registry));
    registry
}

/// The process-wide registry, loading defaults if nothing was loaded yet.
pub fn global() -> Arc<PatternRegistry> {
    init_global(&EmptyStore)
}

/// The process-wide registry without waiting.
///
/// Returns the built-in defaults while the registry is unloaded or a load is
/// in progress.
pub fn current() -> Arc<PatternRegistry> {
    let loaded = match GLOBAL.try_lock() {
        Ok(guard) => guard.clone(),
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().clone(),
        Err(TryLockError::WouldBlock) => {
            debug!("Pattern registry busy, reading built-in defaults");
            None
        }
    };
    loaded.unwrap_or_else(|| Arc::clone(&DEFAULT_REGISTRY))
}

/// Forget the process-wide registry.
#[cfg(test)]
pub(crate) fn reset_global() {
    *GLOBAL.lock().unwrap_or_else(PoisonError::into_inner) = None;
}
