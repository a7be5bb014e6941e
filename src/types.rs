//! Core terminology types: entity levels, override behaviors, and the
//! recursive value model.
//!
//! The value model is a tagged union (scalar or nested mapping) so merge
//! logic can pattern-match instead of probing dynamic JSON at runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TerminologyError, ValidationError};

// =============================================================================
// Entity levels
// =============================================================================

/// One level of the terminology inheritance chain.
///
/// `System` is the root (baseline defaults shipped with the product); `User`
/// is the most specific leaf. Resolution walks root to leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityLevel {
    System,
    Partner,
    Organization,
    Company,
    Team,
    User,
}

impl EntityLevel {
    /// All levels in root-to-leaf order.
    pub const ALL: [EntityLevel; 6] = [
        EntityLevel::System,
        EntityLevel::Partner,
        EntityLevel::Organization,
        EntityLevel::Company,
        EntityLevel::Team,
        EntityLevel::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLevel::System => "system",
            EntityLevel::Partner => "partner",
            EntityLevel::Organization => "organization",
            EntityLevel::Company => "company",
            EntityLevel::Team => "team",
            EntityLevel::User => "user",
        }
    }

    /// Storage table holding this level's entries. The system baseline lives
    /// in `default_terminology`; every other level has its own table.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityLevel::System => "default_terminology",
            EntityLevel::Partner => "partner_terminology",
            EntityLevel::Organization => "organization_terminology",
            EntityLevel::Company => "company_terminology",
            EntityLevel::Team => "team_terminology",
            EntityLevel::User => "user_terminology",
        }
    }

    /// Whether entries at this level must declare an override behavior.
    ///
    /// System entries are the baseline and user entries are always personal
    /// replacements, so neither carries override semantics.
    pub fn requires_override_behavior(&self) -> bool {
        !matches!(self, EntityLevel::System | EntityLevel::User)
    }
}

impl fmt::Display for EntityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityLevel {
    type Err = TerminologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(EntityLevel::System),
            "partner" => Ok(EntityLevel::Partner),
            "organization" => Ok(EntityLevel::Organization),
            "company" => Ok(EntityLevel::Company),
            "team" => Ok(EntityLevel::Team),
            "user" => Ok(EntityLevel::User),
            other => Err(TerminologyError::not_found(format!(
                "entity level '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// Override behavior
// =============================================================================

/// How a more-specific entry combines with the value inherited so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideBehavior {
    /// Child value fully supersedes the inherited value.
    Replace,
    /// Mapping values are combined key-by-key recursively; for scalars this
    /// degrades to `Replace`.
    Merge,
    /// Value is recorded as a suggested alternative; the inherited value
    /// stays effective.
    Suggest,
}

impl OverrideBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideBehavior::Replace => "replace",
            OverrideBehavior::Merge => "merge",
            OverrideBehavior::Suggest => "suggest",
        }
    }
}

impl fmt::Display for OverrideBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverrideBehavior {
    type Err = TerminologyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(OverrideBehavior::Replace),
            "merge" => Ok(OverrideBehavior::Merge),
            "suggest" => Ok(OverrideBehavior::Suggest),
            other => Err(TerminologyError::not_found(format!(
                "override behavior '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// Value model
// =============================================================================

/// A terminology value: a scalar or a nested mapping.
///
/// Serializes to/from plain JSON (untagged), so stored JSONB columns and
/// wire payloads round-trip without a discriminator field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TerminologyValue {
    Bool(bool),
    Number(f64),
    String(String),
    Map(BTreeMap<String, TerminologyValue>),
}

impl TerminologyValue {
    pub fn is_map(&self) -> bool {
        matches!(self, TerminologyValue::Map(_))
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, TerminologyValue>> {
        match self {
            TerminologyValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TerminologyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Empty mapping, the identity for merge folding.
    pub fn empty_map() -> Self {
        TerminologyValue::Map(BTreeMap::new())
    }
}

impl From<&str> for TerminologyValue {
    fn from(s: &str) -> Self {
        TerminologyValue::String(s.to_string())
    }
}

impl From<String> for TerminologyValue {
    fn from(s: String) -> Self {
        TerminologyValue::String(s)
    }
}

impl From<bool> for TerminologyValue {
    fn from(b: bool) -> Self {
        TerminologyValue::Bool(b)
    }
}

impl From<f64> for TerminologyValue {
    fn from(n: f64) -> Self {
        TerminologyValue::Number(n)
    }
}

// =============================================================================
// Entries, settings, resolution output
// =============================================================================

/// A single stored override record for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminologyEntry {
    /// Dot-path key, e.g. `journeyTerms.mainUnit.singular`
    pub key: String,
    pub value: TerminologyValue,
    /// Required for partner/organization/company/team entries; ignored for
    /// system and user entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_behavior: Option<OverrideBehavior>,
}

impl TerminologyEntry {
    pub fn new(key: impl Into<String>, value: impl Into<TerminologyValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            override_behavior: None,
        }
    }

    pub fn with_behavior(mut self, behavior: OverrideBehavior) -> Self {
        self.override_behavior = Some(behavior);
        self
    }

    /// Validate this record for the given level. Runs before any I/O.
    pub fn validate(&self, level: EntityLevel) -> Result<(), ValidationError> {
        crate::flatten::validate_key(&self.key)?;
        if level.requires_override_behavior() && self.override_behavior.is_none() {
            return Err(ValidationError::MissingOverrideBehavior {
                level: level.to_string(),
                key: self.key.clone(),
            });
        }
        Ok(())
    }
}

/// Per-entity resolution metadata, read before resolving. Does not affect
/// the merge algorithm itself; a disabled entity short-circuits resolution
/// to the system baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminologySettings {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_variant: Option<String>,
}

impl Default for TerminologySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            experiment_id: None,
            experiment_variant: None,
        }
    }
}

/// One hop of the inheritance chain used for a resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainLink {
    pub level: EntityLevel,
    /// `None` for the system root, which has no entity id.
    pub entity_id: Option<String>,
}

impl ChainLink {
    pub fn new(level: EntityLevel, entity_id: impl Into<String>) -> Self {
        Self {
            level,
            entity_id: Some(entity_id.into()),
        }
    }

    pub fn system() -> Self {
        Self {
            level: EntityLevel::System,
            entity_id: None,
        }
    }
}

/// A `suggest`-behavior value surfaced alongside (never inside) the
/// resolved map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminologySuggestion {
    pub key: String,
    pub value: TerminologyValue,
    pub suggested_by: ChainLink,
}

/// Output of one resolution: the effective flat map, suggestions collected
/// along the way, and the inheritance path that produced it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedTerminology {
    pub values: BTreeMap<String, TerminologyValue>,
    pub suggestions: Vec<TerminologySuggestion>,
    pub path: Vec<ChainLink>,
}

impl ResolvedTerminology {
    /// Effective string value for a key, if resolved to a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(TerminologyValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order_root_to_leaf() {
        assert_eq!(EntityLevel::ALL[0], EntityLevel::System);
        assert_eq!(EntityLevel::ALL[5], EntityLevel::User);
        assert!(EntityLevel::System < EntityLevel::User);
    }

    #[test]
    fn test_level_round_trip() {
        for level in EntityLevel::ALL {
            assert_eq!(level.as_str().parse::<EntityLevel>().unwrap(), level);
        }
        assert!("galaxy".parse::<EntityLevel>().is_err());
    }

    #[test]
    fn test_table_names() {
        assert_eq!(EntityLevel::System.table_name(), "default_terminology");
        assert_eq!(EntityLevel::Team.table_name(), "team_terminology");
    }

    #[test]
    fn test_behavior_requirements() {
        assert!(!EntityLevel::System.requires_override_behavior());
        assert!(!EntityLevel::User.requires_override_behavior());
        assert!(EntityLevel::Company.requires_override_behavior());
        assert!(EntityLevel::Partner.requires_override_behavior());
    }

    #[test]
    fn test_value_untagged_serde() {
        let json = r#"{"mainUnit":{"singular":"Step","count":3,"visible":true}}"#;
        let value: TerminologyValue = serde_json::from_str(json).unwrap();
        let map = value.as_map().unwrap();
        let unit = map.get("mainUnit").unwrap().as_map().unwrap();
        assert_eq!(unit.get("singular").unwrap().as_str(), Some("Step"));
        assert_eq!(unit.get("count"), Some(&TerminologyValue::Number(3.0)));
        assert_eq!(unit.get("visible"), Some(&TerminologyValue::Bool(true)));

        let back = serde_json::to_string(&value).unwrap();
        let reparsed: TerminologyValue = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed, value);
    }

    #[test]
    fn test_entry_validation_requires_behavior() {
        let entry = TerminologyEntry::new("journeyTerms.mainUnit.singular", "Milestone");
        assert!(entry.validate(EntityLevel::User).is_ok());
        assert!(entry.validate(EntityLevel::Company).is_err());
        assert!(entry
            .clone()
            .with_behavior(OverrideBehavior::Replace)
            .validate(EntityLevel::Company)
            .is_ok());
    }
}
