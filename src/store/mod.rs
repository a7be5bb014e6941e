//! Storage backends for terminology entries and settings.
//!
//! The resolver only talks to the `TerminologyStore` trait. An in-memory
//! implementation is always available; the Postgres implementation lives
//! behind the `database` feature.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EntityLevel, TerminologyEntry, TerminologySettings};

pub mod memory;

#[cfg(feature = "database")]
pub mod postgres;

pub use memory::{InMemoryAffiliations, InMemoryTerminologyStore};

#[cfg(feature = "database")]
pub use postgres::{DatabaseConfig, PgAffiliationLookup, PgTerminologyStore};

/// Backend-agnostic persistence for terminology entries.
///
/// `entity_id` is `None` only for the system level, whose baseline entries
/// are global rather than per-entity. Implementations store one logical
/// table per level.
#[async_trait]
pub trait TerminologyStore: Send + Sync {
    /// All stored entries for one entity at one level. An unknown entity is
    /// an empty list, not an error.
    async fn fetch_entries(
        &self,
        level: EntityLevel,
        entity_id: Option<&str>,
    ) -> Result<Vec<TerminologyEntry>>;

    /// Insert-or-update each entry for the given entity. Latest save wins.
    async fn upsert_entries(
        &self,
        level: EntityLevel,
        entity_id: Option<&str>,
        entries: &[TerminologyEntry],
    ) -> Result<()>;

    /// Delete every entry whose key equals `category` or falls under it as a
    /// dot-path prefix. Returns the number of rows removed.
    async fn delete_category(
        &self,
        level: EntityLevel,
        entity_id: Option<&str>,
        category: &str,
    ) -> Result<u64>;

    /// Stored per-entity settings, if any.
    async fn fetch_settings(
        &self,
        level: EntityLevel,
        entity_id: &str,
    ) -> Result<Option<TerminologySettings>>;

    /// Upsert per-entity settings.
    async fn save_settings(
        &self,
        level: EntityLevel,
        entity_id: &str,
        settings: &TerminologySettings,
    ) -> Result<()>;
}

/// True when `key` equals `category` or sits under it as a dot-path prefix.
pub(crate) fn key_in_category(key: &str, category: &str) -> bool {
    key == category
        || (key.len() > category.len()
            && key.starts_with(category)
            && key.as_bytes()[category.len()] == b'.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_in_category() {
        assert!(key_in_category("journeyTerms", "journeyTerms"));
        assert!(key_in_category("journeyTerms.mainUnit.singular", "journeyTerms"));
        assert!(key_in_category("journeyTerms.mainUnit.singular", "journeyTerms.mainUnit"));
        assert!(!key_in_category("journeyTermsOther", "journeyTerms"));
        assert!(!key_in_category("journey", "journeyTerms"));
    }
}
