//! Inheritance chain computation.
//!
//! The chain is computed once per resolution as an explicit ordered list of
//! (level, entity id) links, root to leaf, instead of ad hoc nested lookups.
//! A missing parent link terminates the chain early at that level; it is
//! never an error.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ChainLink, EntityLevel};

/// Read-only membership/affiliation lookups, one per hop of the chain.
///
/// These belong to the surrounding application (user/team/company profile
/// services); the resolver only asks for parent ids. `Ok(None)` means "no
/// further ancestor".
#[async_trait]
pub trait AffiliationLookup: Send + Sync {
    async fn team_of_user(&self, user_id: &str) -> Result<Option<String>>;

    /// Direct company membership, consulted when a user belongs to no team.
    async fn company_of_user(&self, user_id: &str) -> Result<Option<String>>;

    async fn company_of_team(&self, team_id: &str) -> Result<Option<String>>;

    async fn organization_of_company(&self, company_id: &str) -> Result<Option<String>>;

    async fn partner_of_organization(&self, organization_id: &str) -> Result<Option<String>>;
}

/// Compute the inheritance path for an entity, root to leaf.
///
/// The system root is always present and always first. The target entity is
/// always last (unless it is the system itself). Lookup failures propagate;
/// the resolver degrades to a system-plus-target chain in that case.
pub async fn inheritance_path(
    level: EntityLevel,
    entity_id: &str,
    affiliations: &dyn AffiliationLookup,
) -> Result<Vec<ChainLink>> {
    // Collected leaf to root, reversed at the end.
    let mut chain: Vec<ChainLink> = Vec::new();

    let mut company_id: Option<String> = None;
    let mut organization_id: Option<String> = None;
    let mut partner_id: Option<String> = None;

    match level {
        EntityLevel::System => {}
        EntityLevel::User => {
            chain.push(ChainLink::new(EntityLevel::User, entity_id));
            match affiliations.team_of_user(entity_id).await? {
                Some(team_id) => {
                    company_id = affiliations.company_of_team(&team_id).await?;
                    chain.push(ChainLink::new(EntityLevel::Team, team_id));
                }
                None => company_id = affiliations.company_of_user(entity_id).await?,
            }
        }
        EntityLevel::Team => {
            chain.push(ChainLink::new(EntityLevel::Team, entity_id));
            company_id = affiliations.company_of_team(entity_id).await?;
        }
        EntityLevel::Company => company_id = Some(entity_id.to_string()),
        EntityLevel::Organization => organization_id = Some(entity_id.to_string()),
        EntityLevel::Partner => partner_id = Some(entity_id.to_string()),
    }

    if let Some(company_id) = company_id {
        organization_id = affiliations.organization_of_company(&company_id).await?;
        chain.push(ChainLink::new(EntityLevel::Company, company_id));
    }
    if let Some(organization_id) = organization_id {
        partner_id = affiliations.partner_of_organization(&organization_id).await?;
        chain.push(ChainLink::new(EntityLevel::Organization, organization_id));
    }
    if let Some(partner_id) = partner_id {
        chain.push(ChainLink::new(EntityLevel::Partner, partner_id));
    }

    chain.push(ChainLink::system());
    chain.reverse();
    Ok(chain)
}

/// Minimal chain used when affiliation lookups fail: system baseline plus
/// the target entity itself.
pub fn fallback_path(level: EntityLevel, entity_id: &str) -> Vec<ChainLink> {
    if level == EntityLevel::System {
        vec![ChainLink::system()]
    } else {
        vec![ChainLink::system(), ChainLink::new(level, entity_id)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryAffiliations;

    #[tokio::test]
    async fn test_full_chain_for_user() {
        let affiliations = InMemoryAffiliations::new();
        affiliations.link_user_to_team("u1", "t1").await;
        affiliations.link_team_to_company("t1", "c1").await;
        affiliations.link_company_to_organization("c1", "o1").await;
        affiliations.link_organization_to_partner("o1", "p1").await;

        let path = inheritance_path(EntityLevel::User, "u1", &affiliations)
            .await
            .unwrap();
        let levels: Vec<EntityLevel> = path.iter().map(|link| link.level).collect();
        assert_eq!(
            levels,
            vec![
                EntityLevel::System,
                EntityLevel::Partner,
                EntityLevel::Organization,
                EntityLevel::Company,
                EntityLevel::Team,
                EntityLevel::User,
            ]
        );
        assert_eq!(path[1].entity_id.as_deref(), Some("p1"));
        assert_eq!(path[5].entity_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_missing_link_shortens_chain() {
        let affiliations = InMemoryAffiliations::new();
        affiliations.link_team_to_company("t1", "c1").await;
        // No organization for c1: chain stops at company.

        let path = inheritance_path(EntityLevel::Team, "t1", &affiliations)
            .await
            .unwrap();
        let levels: Vec<EntityLevel> = path.iter().map(|link| link.level).collect();
        assert_eq!(
            levels,
            vec![EntityLevel::System, EntityLevel::Company, EntityLevel::Team]
        );
    }

    #[tokio::test]
    async fn test_teamless_user_falls_back_to_direct_company() {
        let affiliations = InMemoryAffiliations::new();
        affiliations.link_user_to_company("u1", "c1").await;

        let path = inheritance_path(EntityLevel::User, "u1", &affiliations)
            .await
            .unwrap();
        let levels: Vec<EntityLevel> = path.iter().map(|link| link.level).collect();
        assert_eq!(
            levels,
            vec![EntityLevel::System, EntityLevel::Company, EntityLevel::User]
        );
    }

    #[tokio::test]
    async fn test_unknown_entity_yields_minimal_chain() {
        let affiliations = InMemoryAffiliations::new();
        let path = inheritance_path(EntityLevel::Company, "ghost", &affiliations)
            .await
            .unwrap();
        assert_eq!(
            path,
            vec![
                ChainLink::system(),
                ChainLink::new(EntityLevel::Company, "ghost")
            ]
        );
    }

    #[tokio::test]
    async fn test_system_chain_is_just_the_root() {
        let affiliations = InMemoryAffiliations::new();
        let path = inheritance_path(EntityLevel::System, "", &affiliations)
            .await
            .unwrap();
        assert_eq!(path, vec![ChainLink::system()]);
    }
}
