use crate::store::{SiteRecord, TenantStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// One tenant site, as seen by everything downstream of the directory.
///
/// Immutable once returned; safe to share and copy across tasks without
/// synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TenantDescriptor {
    /// Opaque, stable tenant identifier.
    pub id: String,
    /// Locale used when the visitor did not ask for one.
    pub default_locale: String,
    /// Locales enabled for this tenant. Should contain `default_locale`;
    /// consumers tolerate violations by still treating it as usable.
    pub locales: Vec<String>,
    /// Custom domains routing to this tenant.
    pub host_aliases: Vec<String>,
    /// Reserved subdomain label under the platform domain, if claimed.
    pub subdomain: Option<String>,
}

/// Lowercase and trim a host string. Idempotent; the directory applies it
/// exactly once before any comparison.
pub fn normalize_host(host: &str) -> String {
    host.trim().to_lowercase()
}

/// Maps inbound hosts to tenants and tenant ids to default locales.
///
/// Every lookup degrades rather than failing: a storage fault becomes "not
/// found" or the platform default locale, with a `warn!`. A tenant lookup
/// outage must never prevent a page from rendering something.
pub struct TenantDirectory {
    store: Arc<dyn TenantStore>,
    /// Base domain for subdomain-per-tenant routing, e.g. `vowsite.app`.
    platform_domain: String,
    /// Process-wide fallback locale.
    default_locale: String,
}

impl TenantDirectory {
    pub fn new(
        store: Arc<dyn TenantStore>,
        platform_domain: impl Into<String>,
        default_locale: impl Into<String>,
    ) -> Self {
        Self {
            store,
            platform_domain: normalize_host(&platform_domain.into()),
            default_locale: default_locale.into(),
        }
    }

    /// Resolve an inbound host to its tenant.
    ///
    /// Matching order, first match wins:
    /// 1. exact match against a tenant's custom-domain aliases;
    /// 2. exact match against `label.{platform_domain}` reserved subdomains.
    ///
    /// `None` is a normal outcome (unknown or unmapped host) and means "render
    /// platform marketing content", never a fault.
    pub async fn resolve_by_host(&self, host: &str) -> Option<TenantDescriptor> {
        let normalized = normalize_host(host);
        if normalized.is_empty() {
            return None;
        }

        match self.store.find_by_domain(&normalized).await {
            Ok(Some(record)) => return Some(self.descriptor_from(record)),
            Ok(None) => {}
            Err(e) => {
                warn!("Tenant lookup by domain failed for '{}': {}", normalized, e);
            }
        }

        if let Some(label) = self.subdomain_label(&normalized) {
            match self.store.find_by_subdomain(label).await {
                Ok(Some(record)) => return Some(self.descriptor_from(record)),
                Ok(None) => {}
                Err(e) => {
                    warn!("Tenant lookup by subdomain failed for '{}': {}", label, e);
                }
            }
        }

        None
    }

    /// Default locale for a tenant, never failing the caller. Missing tenant,
    /// missing column, or a storage fault all degrade to the platform default.
    pub async fn get_default_locale(&self, tenant_id: &str) -> String {
        match self.store.find_by_id(tenant_id).await {
            Ok(Some(record)) => record
                .default_lang
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| self.default_locale.clone()),
            Ok(None) => self.default_locale.clone(),
            Err(e) => {
                warn!("Default-locale lookup failed for tenant '{}': {}", tenant_id, e);
                self.default_locale.clone()
            }
        }
    }

    /// Extract the tenant label from `label.{platform_domain}`, if the host is
    /// one of the platform's reserved subdomains. Nested labels do not match.
    fn subdomain_label<'a>(&self, host: &'a str) -> Option<&'a str> {
        let label = host.strip_suffix(&self.platform_domain)?.strip_suffix('.')?;
        if label.is_empty() || label.contains('.') {
            return None;
        }
        Some(label)
    }

    fn descriptor_from(&self, record: SiteRecord) -> TenantDescriptor {
        let default_locale = record
            .default_lang
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| self.default_locale.clone());
        TenantDescriptor {
            id: record.id,
            default_locale,
            locales: record.languages,
            host_aliases: record.domains,
            subdomain: record.subdomain,
        }
    }
}
