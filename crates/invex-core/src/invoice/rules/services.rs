//! Service template matching.
//!
//! Bag-of-keywords scoring of a free-text service description against the
//! registry's service catalog.

use serde::Serialize;
use tracing::debug;

use crate::models::pattern::ServiceTemplate;

/// The canonical service a description was classified as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceMatch {
    pub name: String,
    pub estimated_minutes: u32,
    /// Number of the template's keywords found in the description.
    pub hits: usize,
}

/// Scores descriptions against a fixed catalog.
pub struct ServiceMatcher<'a> {
    templates: &'a [ServiceTemplate],
}

impl<'a> ServiceMatcher<'a> {
    pub fn new(templates: &'a [ServiceTemplate]) -> Self {
        Self { templates }
    }

    /// Best template by keyword hits.
    ///
    /// Only a strictly higher count displaces the current best, so ties keep
    /// the first template seen. No hits anywhere means no match.
    pub fn best_match(&self, description: &str) -> Option<ServiceMatch> {
        let text = description.to_lowercase();
        let mut best: Option<(&ServiceTemplate, usize)> = None;

        for template in self.templates {
            let hits = template
                .keywords
                .iter()
                .filter(|k| !k.is_empty() && text.contains(k.as_str()))
                .count();

            if hits > best.map_or(0, |(_, h)| h) {
                best = Some((template, hits));
            }
        }

        let (template, hits) = best?;
        debug!("Service '{}' matched with {} keyword hits", template.name, hits);
        Some(ServiceMatch {
            name: template.name.clone(),
            estimated_minutes: template.estimated_minutes,
            hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::pattern::ServiceCategory;
    use crate::registry::defaults::default_templates;

    fn catalog() -> Vec<ServiceTemplate> {
        vec![
            ServiceTemplate::new("Oil Service", ["oil", "filter"], 45, ServiceCategory::Maintenance),
            ServiceTemplate::new("Brake Service", ["brake", "pad"], 90, ServiceCategory::Repair),
            ServiceTemplate::new("Filter Swap", ["filter", "air"], 20, ServiceCategory::Maintenance),
        ]
    }

    #[test]
    fn test_highest_count_wins() {
        let templates = catalog();
        let matcher = ServiceMatcher::new(&templates);

        let m = matcher.best_match("Replace BRAKE PAD and check brake fluid").unwrap();
        assert_eq!(m.name, "Brake Service");
        assert_eq!(m.estimated_minutes, 90);
        assert_eq!(m.hits, 2);
    }

    #[test]
    fn test_ties_keep_first_template() {
        let templates = catalog();
        let matcher = ServiceMatcher::new(&templates);

        // "filter" scores one for both Oil Service and Filter Swap
        assert_eq!(matcher.best_match("filter").unwrap().name, "Oil Service");
    }

    #[test]
    fn test_no_hits_is_no_match() {
        let templates = catalog();
        let matcher = ServiceMatcher::new(&templates);

        assert_eq!(matcher.best_match("windscreen wiper"), None);
        assert_eq!(matcher.best_match(""), None);
        assert_eq!(ServiceMatcher::new(&[]).best_match("oil"), None);
    }

    #[test]
    fn test_default_catalog() {
        let templates = default_templates();
        let matcher = ServiceMatcher::new(&templates);

        let m = matcher.best_match("Engine oil change with oil filter").unwrap();
        assert_eq!(m.name, "Oil Service");
        assert_eq!(m.estimated_minutes, 45);
    }
}
