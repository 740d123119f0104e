use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which pool of platform-wide strings a global read targets.
///
/// The tenant-facing pages and the marketing pages draw from separate tables,
/// but the fetch-and-merge behavior is identical, so the scope is a parameter
/// rather than a second code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Platform-wide strings shown on published tenant sites.
    Global,
    /// Strings for the platform's own marketing pages.
    Marketing,
}

impl Scope {
    /// Stable tag used in composite cache keys.
    pub fn tag(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Marketing => "marketing",
        }
    }
}

/// One translation fact as read from the backing store.
///
/// `site_id` is `None` for global-scope rows. Rows missing their key or locale
/// are skipped individually by the resolver rather than aborting the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRow {
    pub site_id: Option<String>,
    pub locale: String,
    pub key: String,
    pub value: String,
}

/// Raw tenant row as the directory reads it from the `sites` table.
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: String,
    pub subdomain: Option<String>,
    pub default_lang: Option<String>,
    pub languages: Vec<String>,
    pub domains: Vec<String>,
    pub is_active: bool,
}

/// Faults a backing store can report. None of these ever reach a rendering
/// caller; the resolver and directory degrade instead.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or returned a fault.
    #[error("backing store unavailable: {0}")]
    Unavailable(String),

    /// A row was missing its key or locale and was dropped.
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Read-only access to translation rows.
///
/// Implemented by the Postgres store in production and by in-memory mocks in
/// tests. How rows get written is another service's concern.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    /// Fetch all rows for the given scope whose locale is in `locales`, in one
    /// call. Callers partition the result by row locale.
    async fn read_global(
        &self,
        scope: Scope,
        locales: &[String],
    ) -> Result<Vec<TranslationRow>, StoreError>;

    /// Fetch all site-scoped overrides for one `(site, locale)` pair.
    async fn read_site(
        &self,
        site_id: &str,
        locale: &str,
    ) -> Result<Vec<TranslationRow>, StoreError>;
}

/// Read-only access to tenant rows, consumed by the directory.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// Find the active site claiming `host` as a custom domain alias.
    async fn find_by_domain(&self, host: &str) -> Result<Option<SiteRecord>, StoreError>;

    /// Find the active site with the given reserved subdomain label.
    async fn find_by_subdomain(&self, label: &str) -> Result<Option<SiteRecord>, StoreError>;

    /// Fetch one site by id. Inactive sites are not returned.
    async fn find_by_id(&self, site_id: &str) -> Result<Option<SiteRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_tags_are_distinct() {
        assert_eq!(Scope::Global.tag(), "global");
        assert_eq!(Scope::Marketing.tag(), "marketing");
        assert_ne!(Scope::Global.tag(), Scope::Marketing.tag());
    }

    #[test]
    fn test_scope_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Scope::Marketing).unwrap(),
            "\"marketing\""
        );
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));

        let err = StoreError::MalformedRow("missing key".to_string());
        assert!(err.to_string().contains("malformed"));
    }
}
