//! The terminology resolution engine.
//!
//! Composes a storage backend, affiliation lookups, a process-local cache,
//! and the built-in template registry. Resolution favors availability over
//! completeness: a level whose read fails is logged and skipped, and the
//! caller still gets whatever the surviving levels produced. Writes signal
//! failure explicitly (boolean or error) so editing surfaces can react.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::{ResolutionCache, ResolutionCacheKey};
use crate::chain::{fallback_path, inheritance_path, AffiliationLookup};
use crate::error::{Result, TerminologyError, ValidationError};
use crate::merge::deep_merge;
use crate::store::{key_in_category, TerminologyStore};
use crate::templates::TemplateRegistry;
use crate::types::{
    ChainLink, EntityLevel, OverrideBehavior, ResolvedTerminology, TerminologyEntry,
    TerminologySettings, TerminologySuggestion, TerminologyValue,
};

/// Per-call resolution options.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Restrict resolution to these dot-paths (exact key or category
    /// prefix). `None` resolves everything.
    pub keys: Option<Vec<String>>,
    /// Bypass the cache read. The fresh result still refreshes the cache.
    pub ignore_cache: bool,
}

impl ResolveOptions {
    pub fn for_keys(keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            keys: Some(keys.into_iter().map(Into::into).collect()),
            ignore_cache: false,
        }
    }

    pub fn ignoring_cache() -> Self {
        Self {
            keys: None,
            ignore_cache: true,
        }
    }
}

/// Resolves effective terminology for an entity by folding its inheritance
/// chain, root to leaf.
pub struct TerminologyResolver<S, A> {
    store: Arc<S>,
    affiliations: Arc<A>,
    cache: ResolutionCache,
    templates: TemplateRegistry,
}

impl<S, A> TerminologyResolver<S, A>
where
    S: TerminologyStore,
    A: AffiliationLookup,
{
    pub fn new(store: Arc<S>, affiliations: Arc<A>) -> Self {
        Self {
            store,
            affiliations,
            cache: ResolutionCache::new(),
            templates: TemplateRegistry::new(),
        }
    }

    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the effective vocabulary for one entity.
    ///
    /// Never fails: missing entities, missing ancestors, and per-level read
    /// errors all degrade to whatever the remaining levels provide (at worst
    /// an empty map).
    pub async fn resolve_terminology(
        &self,
        level: EntityLevel,
        entity_id: &str,
        options: &ResolveOptions,
    ) -> ResolvedTerminology {
        let cache_key = ResolutionCacheKey::new(level, entity_id, options.keys.as_deref());
        if !options.ignore_cache {
            if let Some(cached) = self.cache.get(&cache_key).await {
                debug!(level = %level, entity_id, "Resolution cache hit");
                return cached;
            }
        }

        let path = self.resolution_path(level, entity_id).await;
        let resolved = self.fold_path(&path, options.keys.as_deref()).await;

        self.cache.insert(cache_key, resolved.clone()).await;
        resolved
    }

    /// The inheritance path a resolution for this entity would walk.
    pub async fn resolution_path(&self, level: EntityLevel, entity_id: &str) -> Vec<ChainLink> {
        if level != EntityLevel::System {
            match self.store.fetch_settings(level, entity_id).await {
                Ok(Some(settings)) if !settings.enabled => {
                    debug!(level = %level, entity_id, "Terminology disabled, using system baseline");
                    return vec![ChainLink::system()];
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(level = %level, entity_id, %error, "Settings read failed, resolving anyway");
                }
            }
        }

        match inheritance_path(level, entity_id, self.affiliations.as_ref()).await {
            Ok(path) => path,
            Err(error) => {
                warn!(
                    level = %level,
                    entity_id,
                    %error,
                    "Affiliation lookup failed, falling back to system + target"
                );
                fallback_path(level, entity_id)
            }
        }
    }

    async fn fold_path(
        &self,
        path: &[ChainLink],
        requested: Option<&[String]>,
    ) -> ResolvedTerminology {
        let mut values: BTreeMap<String, TerminologyValue> = BTreeMap::new();
        let mut suggestions: Vec<TerminologySuggestion> = Vec::new();

        for link in path {
            let entries = match self
                .store
                .fetch_entries(link.level, link.entity_id.as_deref())
                .await
            {
                Ok(entries) => entries,
                Err(error) => {
                    warn!(
                        level = %link.level,
                        entity_id = link.entity_id.as_deref().unwrap_or("-"),
                        %error,
                        "Level read failed, skipping"
                    );
                    continue;
                }
            };

            for entry in entries {
                if let Some(requested) = requested {
                    if !key_is_requested(&entry.key, requested) {
                        continue;
                    }
                }
                self.fold_entry(link, entry, &mut values, &mut suggestions);
            }
        }

        ResolvedTerminology {
            values,
            suggestions,
            path: path.to_vec(),
        }
    }

    fn fold_entry(
        &self,
        link: &ChainLink,
        entry: TerminologyEntry,
        values: &mut BTreeMap<String, TerminologyValue>,
        suggestions: &mut Vec<TerminologySuggestion>,
    ) {
        let behavior = effective_behavior(link.level, entry.override_behavior);

        match values.remove(&entry.key) {
            // New key: the entry introduces the value whatever its declared
            // behavior, since there is nothing inherited to preserve.
            None => {
                values.insert(entry.key, entry.value);
            }
            Some(inherited) if behavior == OverrideBehavior::Suggest => {
                values.insert(entry.key.clone(), inherited);
                suggestions.push(TerminologySuggestion {
                    key: entry.key,
                    value: entry.value,
                    suggested_by: link.clone(),
                });
            }
            Some(inherited) => {
                values.insert(entry.key, deep_merge(inherited, entry.value, behavior));
            }
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Upsert override records for one entity.
    ///
    /// Validation failures reject the whole batch before any I/O. Storage
    /// failures come back as `Ok(false)` so callers can degrade to defaults
    /// rather than unwind.
    pub async fn save_terminology(
        &self,
        level: EntityLevel,
        entity_id: &str,
        records: &[TerminologyEntry],
    ) -> Result<bool> {
        validate_batch(level, records)?;

        let owner = system_owner(level, entity_id);
        match self.store.upsert_entries(level, owner, records).await {
            Ok(()) => {
                info!(level = %level, entity_id, count = records.len(), "Saved terminology");
                // A changed ancestor may change every descendant's effective
                // map, and descendant cache keys are not enumerable here.
                self.cache.clear().await;
                Ok(true)
            }
            Err(error) if error.is_storage() => {
                warn!(level = %level, entity_id, %error, "Terminology save failed");
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Delete every entry under a dot-path category for one entity.
    /// Ancestor and descendant entries are untouched.
    pub async fn delete_terminology_for_category(
        &self,
        level: EntityLevel,
        entity_id: &str,
        category: &str,
    ) -> Result<bool> {
        crate::flatten::validate_key(category).map_err(TerminologyError::Validation)?;

        let owner = system_owner(level, entity_id);
        match self.store.delete_category(level, owner, category).await {
            Ok(deleted) => {
                info!(level = %level, entity_id, category, deleted, "Deleted terminology category");
                self.cache.clear().await;
                Ok(true)
            }
            Err(error) if error.is_storage() => {
                warn!(level = %level, entity_id, category, %error, "Category delete failed");
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Apply a built-in template as replace-behavior entries in one batch.
    ///
    /// An unrecognized template key is a programming error and fails loudly.
    pub async fn apply_predefined_terminology(
        &self,
        level: EntityLevel,
        entity_id: &str,
        template_key: &str,
    ) -> Result<bool> {
        let template = self
            .templates
            .get(template_key)
            .ok_or_else(|| TerminologyError::not_found(format!("template '{}'", template_key)))?;

        let behavior = level
            .requires_override_behavior()
            .then_some(OverrideBehavior::Replace);
        let records: Vec<TerminologyEntry> = template
            .entries
            .iter()
            .map(|(key, value)| TerminologyEntry {
                key: key.clone(),
                value: value.clone(),
                override_behavior: behavior,
            })
            .collect();

        info!(level = %level, entity_id, template_key, "Applying predefined terminology");
        self.save_terminology(level, entity_id, &records).await
    }

    // =========================================================================
    // Settings and cache
    // =========================================================================

    /// Stored settings for an entity, defaulting to enabled with no
    /// experiment when none exist.
    pub async fn get_settings(
        &self,
        level: EntityLevel,
        entity_id: &str,
    ) -> Result<TerminologySettings> {
        Ok(self
            .store
            .fetch_settings(level, entity_id)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_settings(
        &self,
        level: EntityLevel,
        entity_id: &str,
        settings: &TerminologySettings,
    ) -> Result<()> {
        self.store.save_settings(level, entity_id, settings).await?;
        self.cache.clear().await;
        Ok(())
    }

    /// Drop every cached resolution.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

/// System entries are global; every other level is scoped to the entity.
fn system_owner(level: EntityLevel, entity_id: &str) -> Option<&str> {
    (level != EntityLevel::System).then_some(entity_id)
}

/// The behavior actually applied for an entry at a level. System entries are
/// the baseline and user entries are personal replacements; declared
/// behaviors on those levels are ignored. Mid-chain entries missing a
/// declared behavior (legacy rows) act as replace.
fn effective_behavior(level: EntityLevel, declared: Option<OverrideBehavior>) -> OverrideBehavior {
    if level.requires_override_behavior() {
        declared.unwrap_or(OverrideBehavior::Replace)
    } else {
        OverrideBehavior::Replace
    }
}

/// An entry participates in a restricted resolution when its key matches a
/// requested path exactly, falls under one as a category, or subsumes one
/// (a nested-map entry whose value contains the requested path).
fn key_is_requested(key: &str, requested: &[String]) -> bool {
    requested
        .iter()
        .any(|wanted| key_in_category(key, wanted) || key_in_category(wanted, key))
}

fn validate_batch(level: EntityLevel, records: &[TerminologyEntry]) -> Result<()> {
    let mut errors: Vec<ValidationError> = records
        .iter()
        .filter_map(|record| record.validate(level).err())
        .collect();
    if errors.is_empty() {
        return Ok(());
    }
    if errors.len() == 1 {
        return Err(TerminologyError::Validation(errors.remove(0)));
    }
    let first = errors[0].to_string();
    Err(TerminologyError::Validation(ValidationError::Batch {
        count: errors.len(),
        first,
    }))
}
