//! In-memory storage and affiliation fixtures.
//!
//! Used by tests and by deployments that load terminology from static
//! config rather than a database. Same trait contract as the Postgres
//! store, so the resolver cannot tell the difference.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::chain::AffiliationLookup;
use crate::error::Result;
use crate::store::{key_in_category, TerminologyStore};
use crate::types::{EntityLevel, TerminologyEntry, TerminologySettings};

/// Entries and settings held in process memory behind an async lock.
#[derive(Default)]
pub struct InMemoryTerminologyStore {
    entries: RwLock<HashMap<(EntityLevel, String), BTreeMap<String, TerminologyEntry>>>,
    settings: RwLock<HashMap<(EntityLevel, String), TerminologySettings>>,
}

impl InMemoryTerminologyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// System-level entries use an empty owner id internally.
    fn owner_key(level: EntityLevel, entity_id: Option<&str>) -> (EntityLevel, String) {
        (level, entity_id.unwrap_or_default().to_string())
    }

    /// Seed the system baseline in one call (test convenience).
    pub async fn seed_defaults(&self, entries: Vec<TerminologyEntry>) {
        self.upsert_entries(EntityLevel::System, None, &entries)
            .await
            .expect("in-memory upsert cannot fail");
    }
}

#[async_trait]
impl TerminologyStore for InMemoryTerminologyStore {
    async fn fetch_entries(
        &self,
        level: EntityLevel,
        entity_id: Option<&str>,
    ) -> Result<Vec<TerminologyEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&Self::owner_key(level, entity_id))
            .map(|stored| stored.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_entries(
        &self,
        level: EntityLevel,
        entity_id: Option<&str>,
        new_entries: &[TerminologyEntry],
    ) -> Result<()> {
        let mut entries = self.entries.write().await;
        let stored = entries
            .entry(Self::owner_key(level, entity_id))
            .or_default();
        for entry in new_entries {
            stored.insert(entry.key.clone(), entry.clone());
        }
        Ok(())
    }

    async fn delete_category(
        &self,
        level: EntityLevel,
        entity_id: Option<&str>,
        category: &str,
    ) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let Some(stored) = entries.get_mut(&Self::owner_key(level, entity_id)) else {
            return Ok(0);
        };
        let before = stored.len();
        stored.retain(|key, _| !key_in_category(key, category));
        Ok((before - stored.len()) as u64)
    }

    async fn fetch_settings(
        &self,
        level: EntityLevel,
        entity_id: &str,
    ) -> Result<Option<TerminologySettings>> {
        let settings = self.settings.read().await;
        Ok(settings.get(&(level, entity_id.to_string())).cloned())
    }

    async fn save_settings(
        &self,
        level: EntityLevel,
        entity_id: &str,
        new_settings: &TerminologySettings,
    ) -> Result<()> {
        let mut settings = self.settings.write().await;
        settings.insert((level, entity_id.to_string()), new_settings.clone());
        Ok(())
    }
}

/// Static parent links for tests and fixtures.
#[derive(Default)]
pub struct InMemoryAffiliations {
    user_team: RwLock<HashMap<String, String>>,
    user_company: RwLock<HashMap<String, String>>,
    team_company: RwLock<HashMap<String, String>>,
    company_organization: RwLock<HashMap<String, String>>,
    organization_partner: RwLock<HashMap<String, String>>,
}

impl InMemoryAffiliations {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn link_user_to_team(&self, user_id: &str, team_id: &str) {
        self.user_team
            .write()
            .await
            .insert(user_id.to_string(), team_id.to_string());
    }

    pub async fn link_user_to_company(&self, user_id: &str, company_id: &str) {
        self.user_company
            .write()
            .await
            .insert(user_id.to_string(), company_id.to_string());
    }

    pub async fn link_team_to_company(&self, team_id: &str, company_id: &str) {
        self.team_company
            .write()
            .await
            .insert(team_id.to_string(), company_id.to_string());
    }

    pub async fn link_company_to_organization(&self, company_id: &str, organization_id: &str) {
        self.company_organization
            .write()
            .await
            .insert(company_id.to_string(), organization_id.to_string());
    }

    pub async fn link_organization_to_partner(&self, organization_id: &str, partner_id: &str) {
        self.organization_partner
            .write()
            .await
            .insert(organization_id.to_string(), partner_id.to_string());
    }
}

#[async_trait]
impl AffiliationLookup for InMemoryAffiliations {
    async fn team_of_user(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.user_team.read().await.get(user_id).cloned())
    }

    async fn company_of_user(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.user_company.read().await.get(user_id).cloned())
    }

    async fn company_of_team(&self, team_id: &str) -> Result<Option<String>> {
        Ok(self.team_company.read().await.get(team_id).cloned())
    }

    async fn organization_of_company(&self, company_id: &str) -> Result<Option<String>> {
        Ok(self.company_organization.read().await.get(company_id).cloned())
    }

    async fn partner_of_organization(&self, organization_id: &str) -> Result<Option<String>> {
        Ok(self.organization_partner.read().await.get(organization_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OverrideBehavior;

    #[tokio::test]
    async fn test_upsert_then_fetch() {
        let store = InMemoryTerminologyStore::new();
        let entries = vec![
            TerminologyEntry::new("journeyTerms.mainUnit.singular", "Milestone")
                .with_behavior(OverrideBehavior::Replace),
        ];
        store
            .upsert_entries(EntityLevel::Company, Some("c1"), &entries)
            .await
            .unwrap();

        let fetched = store
            .fetch_entries(EntityLevel::Company, Some("c1"))
            .await
            .unwrap();
        assert_eq!(fetched, entries);

        // Different entity, same level: nothing stored.
        let other = store
            .fetch_entries(EntityLevel::Company, Some("c2"))
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_overwrites_same_key() {
        let store = InMemoryTerminologyStore::new();
        store
            .upsert_entries(
                EntityLevel::User,
                Some("u1"),
                &[TerminologyEntry::new("a.b", "one")],
            )
            .await
            .unwrap();
        store
            .upsert_entries(
                EntityLevel::User,
                Some("u1"),
                &[TerminologyEntry::new("a.b", "two")],
            )
            .await
            .unwrap();

        let fetched = store
            .fetch_entries(EntityLevel::User, Some("u1"))
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].value.as_str(), Some("two"));
    }

    #[tokio::test]
    async fn test_delete_category_is_prefix_scoped() {
        let store = InMemoryTerminologyStore::new();
        store
            .upsert_entries(
                EntityLevel::Company,
                Some("c1"),
                &[
                    TerminologyEntry::new("journeyTerms.mainUnit.singular", "Milestone")
                        .with_behavior(OverrideBehavior::Replace),
                    TerminologyEntry::new("journeyTerms.action.start", "Kick off")
                        .with_behavior(OverrideBehavior::Replace),
                    TerminologyEntry::new("teamTerms.member", "Colleague")
                        .with_behavior(OverrideBehavior::Replace),
                ],
            )
            .await
            .unwrap();

        let deleted = store
            .delete_category(EntityLevel::Company, Some("c1"), "journeyTerms")
            .await
            .unwrap();
        assert_eq!(deleted, 2);

        let remaining = store
            .fetch_entries(EntityLevel::Company, Some("c1"))
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].key, "teamTerms.member");
    }

    #[tokio::test]
    async fn test_settings_round_trip() {
        let store = InMemoryTerminologyStore::new();
        assert!(store
            .fetch_settings(EntityLevel::Company, "c1")
            .await
            .unwrap()
            .is_none());

        let settings = TerminologySettings {
            enabled: false,
            experiment_id: Some("exp-7".to_string()),
            experiment_variant: Some("b".to_string()),
        };
        store
            .save_settings(EntityLevel::Company, "c1", &settings)
            .await
            .unwrap();
        assert_eq!(
            store
                .fetch_settings(EntityLevel::Company, "c1")
                .await
                .unwrap(),
            Some(settings)
        );
    }
}
