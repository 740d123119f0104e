use crate::config::Config;
use crate::store::{Scope, SiteRecord, StoreError, TenantStore, TranslationRow, TranslationStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::warn;

/// Create the shared connection pool from configuration.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to PostgreSQL")
}

/// Postgres-backed implementation of the store traits.
///
/// Reads the `sites`, `global_translations`, `global_translations_marketing`
/// and `site_translations` tables. All methods are read-only; writes happen in
/// the builder service.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translation row as selected, before malformed-row filtering. Loose schemas
/// in the wild have produced NULL keys, so everything is optional here.
#[derive(Debug, FromRow)]
struct RawTranslationRow {
    locale: Option<String>,
    key: Option<String>,
    value: Option<String>,
}

#[derive(Debug, FromRow)]
struct RawSiteRow {
    id: String,
    subdomain: Option<String>,
    default_lang: Option<String>,
    languages: Option<Vec<String>>,
    domains: Option<Vec<String>>,
    is_active: bool,
}

impl From<RawSiteRow> for SiteRecord {
    fn from(row: RawSiteRow) -> Self {
        SiteRecord {
            id: row.id,
            subdomain: row.subdomain,
            default_lang: row.default_lang,
            languages: row.languages.unwrap_or_default(),
            domains: row.domains.unwrap_or_default(),
            is_active: row.is_active,
        }
    }
}

/// Turn a raw row into a usable one, or `None` when the row is missing its key
/// or locale. A single bad row never aborts the batch.
fn validate_row(site_id: Option<String>, raw: RawTranslationRow) -> Option<TranslationRow> {
    let locale = raw.locale.filter(|l| !l.is_empty())?;
    let key = raw.key.filter(|k| !k.is_empty())?;
    Some(TranslationRow {
        site_id,
        locale,
        key,
        // Empty values are legal: an explicit empty override is a tenant choice.
        value: raw.value.unwrap_or_default(),
    })
}

fn collect_rows(site_id: Option<&str>, raw: Vec<RawTranslationRow>) -> Vec<TranslationRow> {
    let total = raw.len();
    let rows: Vec<TranslationRow> = raw
        .into_iter()
        .filter_map(|r| validate_row(site_id.map(String::from), r))
        .collect();
    let dropped = total - rows.len();
    if dropped > 0 {
        warn!("Dropped {} malformed translation row(s)", dropped);
    }
    rows
}

const SITE_COLUMNS: &str = "id::text AS id, subdomain, default_lang, languages, domains, is_active";

#[async_trait]
impl TranslationStore for PgStore {
    async fn read_global(
        &self,
        scope: Scope,
        locales: &[String],
    ) -> Result<Vec<TranslationRow>, StoreError> {
        let table = match scope {
            Scope::Global => "global_translations",
            Scope::Marketing => "global_translations_marketing",
        };
        let sql = format!(
            "SELECT locale, key, value FROM {} WHERE locale = ANY($1)",
            table
        );
        let raw: Vec<RawTranslationRow> = sqlx::query_as(&sql)
            .bind(locales)
            .fetch_all(&self.pool)
            .await?;
        Ok(collect_rows(None, raw))
    }

    async fn read_site(
        &self,
        site_id: &str,
        locale: &str,
    ) -> Result<Vec<TranslationRow>, StoreError> {
        let raw: Vec<RawTranslationRow> = sqlx::query_as(
            "SELECT locale, key, value FROM site_translations
             WHERE site_id::text = $1 AND locale = $2",
        )
        .bind(site_id)
        .bind(locale)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(Some(site_id), raw))
    }
}

#[async_trait]
impl TenantStore for PgStore {
    async fn find_by_domain(&self, host: &str) -> Result<Option<SiteRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM sites WHERE is_active AND $1 = ANY(domains) LIMIT 1",
            SITE_COLUMNS
        );
        let row: Option<RawSiteRow> = sqlx::query_as(&sql)
            .bind(host)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SiteRecord::from))
    }

    async fn find_by_subdomain(&self, label: &str) -> Result<Option<SiteRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM sites WHERE is_active AND subdomain = $1 LIMIT 1",
            SITE_COLUMNS
        );
        let row: Option<RawSiteRow> = sqlx::query_as(&sql)
            .bind(label)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SiteRecord::from))
    }

    async fn find_by_id(&self, site_id: &str) -> Result<Option<SiteRecord>, StoreError> {
        let sql = format!(
            "SELECT {} FROM sites WHERE is_active AND id::text = $1 LIMIT 1",
            SITE_COLUMNS
        );
        let row: Option<RawSiteRow> = sqlx::query_as(&sql)
            .bind(site_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(SiteRecord::from))
    }
}
