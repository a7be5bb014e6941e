//! Postgres-backed terminology storage.
//!
//! One table per entity level (`default_terminology` for the system
//! baseline, `{level}_terminology` otherwise), each row holding
//! `(entity_id, key, value, override_behavior, created_at, updated_at)`.
//! Values are stored as JSONB. See `migrations/0001_terminology.sql`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Row};
use tracing::{debug, info};

use crate::chain::AffiliationLookup;
use crate::error::Result;
use crate::store::TerminologyStore;
use crate::types::{EntityLevel, OverrideBehavior, TerminologyEntry, TerminologySettings, TerminologyValue};

/// Database configuration, env-driven with sane defaults.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: Duration,
    pub idle_timeout: Option<Duration>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        dotenvy::dotenv().ok();
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/terminology".to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl DatabaseConfig {
    pub async fn connect(&self) -> Result<PgPool> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.connection_timeout)
            .idle_timeout(self.idle_timeout)
            .connect(&self.database_url)
            .await?;
        info!("Connected to terminology database");
        Ok(pool)
    }
}

/// Raw row shape shared by every terminology table.
#[derive(Debug, FromRow)]
struct TerminologyRow {
    key: String,
    value: serde_json::Value,
    override_behavior: Option<String>,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}

impl TerminologyRow {
    fn into_entry(self) -> Result<TerminologyEntry> {
        let value: TerminologyValue = serde_json::from_value(self.value)?;
        let override_behavior = self
            .override_behavior
            .as_deref()
            .map(OverrideBehavior::from_str)
            .transpose()?;
        Ok(TerminologyEntry {
            key: self.key,
            value,
            override_behavior,
        })
    }
}

/// Terminology store backed by a Postgres pool.
pub struct PgTerminologyStore {
    pool: PgPool,
}

impl PgTerminologyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TerminologyStore for PgTerminologyStore {
    async fn fetch_entries(
        &self,
        level: EntityLevel,
        entity_id: Option<&str>,
    ) -> Result<Vec<TerminologyEntry>> {
        // Table names come from the closed EntityLevel enum, never from
        // caller input, so formatting them into SQL is safe.
        let rows: Vec<TerminologyRow> = if level == EntityLevel::System {
            sqlx::query_as(&format!(
                "SELECT key, value, override_behavior, created_at, updated_at \
                 FROM {} ORDER BY key",
                level.table_name()
            ))
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as(&format!(
                "SELECT key, value, override_behavior, created_at, updated_at \
                 FROM {} WHERE entity_id = $1 ORDER BY key",
                level.table_name()
            ))
            .bind(entity_id.unwrap_or_default())
            .fetch_all(&self.pool)
            .await?
        };

        debug!(
            level = %level,
            entity_id = entity_id.unwrap_or("-"),
            rows = rows.len(),
            "Fetched terminology entries"
        );
        rows.into_iter().map(TerminologyRow::into_entry).collect()
    }

    async fn upsert_entries(
        &self,
        level: EntityLevel,
        entity_id: Option<&str>,
        entries: &[TerminologyEntry],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            let value = serde_json::to_value(&entry.value)?;
            let behavior = entry.override_behavior.map(|b| b.as_str());
            if level == EntityLevel::System {
                sqlx::query(&format!(
                    "INSERT INTO {} (key, value, override_behavior, created_at, updated_at) \
                     VALUES ($1, $2, $3, NOW(), NOW()) \
                     ON CONFLICT (key) DO UPDATE SET \
                         value = EXCLUDED.value, \
                         override_behavior = EXCLUDED.override_behavior, \
                         updated_at = NOW()",
                    level.table_name()
                ))
                .bind(&entry.key)
                .bind(&value)
                .bind(behavior)
                .execute(&mut *tx)
                .await?;
            } else {
                sqlx::query(&format!(
                    "INSERT INTO {} (entity_id, key, value, override_behavior, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, NOW(), NOW()) \
                     ON CONFLICT (entity_id, key) DO UPDATE SET \
                         value = EXCLUDED.value, \
                         override_behavior = EXCLUDED.override_behavior, \
                         updated_at = NOW()",
                    level.table_name()
                ))
                .bind(entity_id.unwrap_or_default())
                .bind(&entry.key)
                .bind(&value)
                .bind(behavior)
                .execute(&mut *tx)
                .await?;
            }
        }
        tx.commit().await?;

        info!(
            level = %level,
            entity_id = entity_id.unwrap_or("-"),
            count = entries.len(),
            "Upserted terminology entries"
        );
        Ok(())
    }

    async fn delete_category(
        &self,
        level: EntityLevel,
        entity_id: Option<&str>,
        category: &str,
    ) -> Result<u64> {
        let result = if level == EntityLevel::System {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE key = $1 OR key LIKE $1 || '.%'",
                level.table_name()
            ))
            .bind(category)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "DELETE FROM {} WHERE entity_id = $1 AND (key = $2 OR key LIKE $2 || '.%')",
                level.table_name()
            ))
            .bind(entity_id.unwrap_or_default())
            .bind(category)
            .execute(&self.pool)
            .await?
        };

        info!(
            level = %level,
            entity_id = entity_id.unwrap_or("-"),
            category,
            deleted = result.rows_affected(),
            "Deleted terminology category"
        );
        Ok(result.rows_affected())
    }

    async fn fetch_settings(
        &self,
        level: EntityLevel,
        entity_id: &str,
    ) -> Result<Option<TerminologySettings>> {
        let row = sqlx::query(
            "SELECT enabled, experiment_id, experiment_variant \
             FROM terminology_settings \
             WHERE entity_level = $1 AND entity_id = $2",
        )
        .bind(level.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| TerminologySettings {
            enabled: row.get("enabled"),
            experiment_id: row.get("experiment_id"),
            experiment_variant: row.get("experiment_variant"),
        }))
    }

    async fn save_settings(
        &self,
        level: EntityLevel,
        entity_id: &str,
        settings: &TerminologySettings,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO terminology_settings \
                 (entity_level, entity_id, enabled, experiment_id, experiment_variant, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) \
             ON CONFLICT (entity_level, entity_id) DO UPDATE SET \
                 enabled = EXCLUDED.enabled, \
                 experiment_id = EXCLUDED.experiment_id, \
                 experiment_variant = EXCLUDED.experiment_variant, \
                 updated_at = NOW()",
        )
        .bind(level.as_str())
        .bind(entity_id)
        .bind(settings.enabled)
        .bind(settings.experiment_id.as_deref())
        .bind(settings.experiment_variant.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Affiliation lookups over the membership tables.
///
/// In production these reads belong to the profile services; this
/// implementation exists for deployments where the membership data lives in
/// the same database as the terminology tables.
pub struct PgAffiliationLookup {
    pool: PgPool,
}

impl PgAffiliationLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn parent_id(&self, sql: &str, child_id: &str) -> Result<Option<String>> {
        let parent: Option<Option<String>> = sqlx::query_scalar(sql)
            .bind(child_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(parent.flatten())
    }
}

#[async_trait]
impl AffiliationLookup for PgAffiliationLookup {
    async fn team_of_user(&self, user_id: &str) -> Result<Option<String>> {
        self.parent_id(
            "SELECT team_id FROM user_affiliations WHERE user_id = $1",
            user_id,
        )
        .await
    }

    async fn company_of_user(&self, user_id: &str) -> Result<Option<String>> {
        self.parent_id(
            "SELECT company_id FROM user_affiliations WHERE user_id = $1",
            user_id,
        )
        .await
    }

    async fn company_of_team(&self, team_id: &str) -> Result<Option<String>> {
        self.parent_id(
            "SELECT company_id FROM team_affiliations WHERE team_id = $1",
            team_id,
        )
        .await
    }

    async fn organization_of_company(&self, company_id: &str) -> Result<Option<String>> {
        self.parent_id(
            "SELECT organization_id FROM company_affiliations WHERE company_id = $1",
            company_id,
        )
        .await
    }

    async fn partner_of_organization(&self, organization_id: &str) -> Result<Option<String>> {
        self.parent_id(
            "SELECT partner_id FROM organization_affiliations WHERE organization_id = $1",
            organization_id,
        )
        .await
    }
}
