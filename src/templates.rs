//! Template Registry - built-in predefined terminology bundles.
//!
//! A template is a named flat terminology map that can be applied to one
//! entity in a single batch save. Templates ship with the system; an
//! unknown template key is a programming error, not a data-absence
//! condition, and fails loudly.

use std::collections::HashMap;

use crate::types::{TerminologyEntry, TerminologyValue};

/// A named bundle of flat terminology entries.
#[derive(Debug, Clone)]
pub struct TerminologyTemplate {
    pub key: String,
    pub name: String,
    pub description: String,
    /// Flat dot-path key -> value pairs; applied as replace-behavior entries.
    pub entries: Vec<(String, TerminologyValue)>,
}

pub struct TemplateRegistry {
    templates: HashMap<String, TerminologyTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            templates: HashMap::new(),
        };
        registry.register_builtins();
        registry
    }

    pub fn get(&self, key: &str) -> Option<&TerminologyTemplate> {
        self.templates.get(key)
    }

    pub fn list(&self) -> Vec<&TerminologyTemplate> {
        let mut templates: Vec<&TerminologyTemplate> = self.templates.values().collect();
        templates.sort_by(|a, b| a.key.cmp(&b.key));
        templates
    }

    fn register(&mut self, template: TerminologyTemplate) {
        self.templates.insert(template.key.clone(), template);
    }

    fn register_builtins(&mut self) {
        self.register(Self::journey_classic());
        self.register(Self::business_formal());
        self.register(Self::startup_focused());
    }

    fn flat(entries: &[(&str, &str)]) -> Vec<(String, TerminologyValue)> {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), TerminologyValue::from(*value)))
            .collect()
    }

    fn journey_classic() -> TerminologyTemplate {
        TerminologyTemplate {
            key: "journey-classic".into(),
            name: "Journey Classic".into(),
            description: "The stock journey vocabulary shipped as the system baseline".into(),
            entries: Self::flat(&[
                ("journeyTerms.mainUnit.singular", "Step"),
                ("journeyTerms.mainUnit.plural", "Steps"),
                ("journeyTerms.container.singular", "Journey"),
                ("journeyTerms.container.plural", "Journeys"),
                ("journeyTerms.action.start", "Start"),
                ("journeyTerms.action.complete", "Complete"),
                ("teamTerms.member.singular", "Member"),
                ("teamTerms.member.plural", "Members"),
            ]),
        }
    }

    fn business_formal() -> TerminologyTemplate {
        TerminologyTemplate {
            key: "business-formal".into(),
            name: "Business Formal".into(),
            description: "Formal engagement-oriented vocabulary for enterprise tenants".into(),
            entries: Self::flat(&[
                ("journeyTerms.mainUnit.singular", "Milestone"),
                ("journeyTerms.mainUnit.plural", "Milestones"),
                ("journeyTerms.container.singular", "Engagement"),
                ("journeyTerms.container.plural", "Engagements"),
                ("journeyTerms.action.start", "Initiate"),
                ("journeyTerms.action.complete", "Conclude"),
                ("teamTerms.member.singular", "Associate"),
                ("teamTerms.member.plural", "Associates"),
            ]),
        }
    }

    fn startup_focused() -> TerminologyTemplate {
        TerminologyTemplate {
            key: "startup-focused".into(),
            name: "Startup Focused".into(),
            description: "Sprint-flavored vocabulary for fast-moving teams".into(),
            entries: Self::flat(&[
                ("journeyTerms.mainUnit.singular", "Sprint"),
                ("journeyTerms.mainUnit.plural", "Sprints"),
                ("journeyTerms.container.singular", "Mission"),
                ("journeyTerms.container.plural", "Missions"),
                ("journeyTerms.action.start", "Kick off"),
                ("journeyTerms.action.complete", "Ship"),
                ("teamTerms.member.singular", "Teammate"),
                ("teamTerms.member.plural", "Teammates"),
            ]),
        }
    }

    /// The baseline entries applications seed into the system level.
    pub fn system_defaults() -> Vec<TerminologyEntry> {
        Self::journey_classic()
            .entries
            .into_iter()
            .map(|(key, value)| TerminologyEntry { key, value, override_behavior: None })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = TemplateRegistry::new();
        assert!(registry.get("journey-classic").is_some());
        assert!(registry.get("business-formal").is_some());
        assert!(registry.get("startup-focused").is_some());
        assert!(registry.get("galactic-brutalist").is_none());
    }

    #[test]
    fn test_list_is_sorted_by_key() {
        let registry = TemplateRegistry::new();
        let keys: Vec<&str> = registry.list().iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["business-formal", "journey-classic", "startup-focused"]);
    }

    #[test]
    fn test_templates_cover_the_same_keys() {
        // Every template overrides the same vocabulary surface, so applying
        // one fully shadows another.
        let registry = TemplateRegistry::new();
        let mut key_sets: Vec<Vec<&String>> = registry
            .list()
            .iter()
            .map(|t| {
                let mut keys: Vec<&String> = t.entries.iter().map(|(k, _)| k).collect();
                keys.sort();
                keys
            })
            .collect();
        let first = key_sets.remove(0);
        for keys in key_sets {
            assert_eq!(keys, first);
        }
    }

    #[test]
    fn test_template_keys_are_valid_dot_paths() {
        let registry = TemplateRegistry::new();
        for template in registry.list() {
            for (key, _) in &template.entries {
                assert!(crate::flatten::validate_key(key).is_ok(), "bad key {key}");
            }
        }
    }
}
