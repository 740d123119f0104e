use crate::cache::{Clock, LayeredCache};
use crate::i18n::dictionary::MergedDictionary;
use crate::i18n::locale::normalize_locale;
use crate::store::{Scope, TranslationRow, TranslationStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Produces merged translation dictionaries for `(tenant, requested locale,
/// fallback locale)` triples, caching each result under a composite key.
///
/// Every failure mode has a defined degraded output: a faulted layer is
/// treated as empty, a total store outage yields an empty dictionary, and a
/// missing key renders as the key itself. Nothing here surfaces an error to a
/// page render.
pub struct TranslationResolver {
    store: Arc<dyn TranslationStore>,
    cache: LayeredCache<MergedDictionary>,
    /// TTL for tenant-site merges.
    site_ttl: Duration,
    /// TTL for merges with no tenant layer (marketing, bare global).
    global_ttl: Duration,
}

/// Composite cache key. Positional: scope tag, tenant id (or "global"),
/// requested locale, fallback locale.
fn cache_key(scope: Scope, tenant_id: Option<&str>, requested: &str, fallback: &str) -> String {
    format!(
        "{}:{}:{}:{}",
        scope.tag(),
        tenant_id.unwrap_or("global"),
        requested,
        fallback
    )
}

impl TranslationResolver {
    pub fn new(store: Arc<dyn TranslationStore>, site_ttl: Duration, global_ttl: Duration) -> Self {
        Self {
            store,
            cache: LayeredCache::new(),
            site_ttl,
            global_ttl,
        }
    }

    /// Same as [`TranslationResolver::new`] with an injected clock, so tests
    /// can drive cache expiry.
    pub fn with_clock(
        store: Arc<dyn TranslationStore>,
        site_ttl: Duration,
        global_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            cache: LayeredCache::with_clock(clock),
            site_ttl,
            global_ttl,
        }
    }

    /// Produce the merged dictionary for one render.
    ///
    /// Layers, lowest precedence first: global strings in the fallback locale
    /// (skipped entirely when it equals the requested locale), global strings
    /// in the requested locale, tenant-site overrides (skipped without a
    /// tenant). Both global layers come from one set-filtered store read; the
    /// site layer is fetched concurrently with it.
    ///
    /// The cache is written only after every layer has been collected or
    /// skipped, never incrementally, so a cancelled call leaves no partial
    /// entry.
    pub async fn resolve(
        &self,
        scope: Scope,
        tenant_id: Option<&str>,
        requested_locale: &str,
        fallback_locale: &str,
    ) -> MergedDictionary {
        let requested = normalize_locale(requested_locale);
        let fallback = normalize_locale(fallback_locale);

        let key = cache_key(scope, tenant_id, &requested, &fallback);
        if let Some(cached) = self.cache.get(&key) {
            return cached;
        }
        debug!("Translation cache miss for '{}'", key);

        // Fetching the fallback locale when it equals the requested one would
        // be a redundant read of the same rows; skip it outright.
        let locales = if requested == fallback {
            vec![requested.clone()]
        } else {
            vec![requested.clone(), fallback.clone()]
        };

        let global_read = self.store.read_global(scope, &locales);
        let site_read = async {
            match tenant_id {
                Some(id) => self.store.read_site(id, &requested).await,
                None => Ok(Vec::new()),
            }
        };
        let (global_result, site_result) = tokio::join!(global_read, site_read);

        let (fallback_layer, primary_layer) = match global_result {
            Ok(rows) => partition_by_locale(rows, &requested, &fallback),
            Err(e) => {
                warn!("Global translation read failed for '{}': {}", key, e);
                (Vec::new(), Vec::new())
            }
        };
        let site_layer = match site_result {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Site translation read failed for '{}': {}", key, e);
                Vec::new()
            }
        };

        let merged = MergedDictionary::from_layers(vec![fallback_layer, primary_layer, site_layer]);

        let ttl = if tenant_id.is_some() {
            self.site_ttl
        } else {
            self.global_ttl
        };
        self.cache.set(key, merged.clone(), ttl);
        merged
    }

    /// Single-key convenience wrapper over [`TranslationResolver::resolve`].
    ///
    /// Tries the exact key, then the lower-cased key, then falls back to the
    /// raw key as the displayed string. Never fails.
    pub async fn translate(
        &self,
        scope: Scope,
        tenant_id: Option<&str>,
        locale: &str,
        key: &str,
        fallback_locale: &str,
    ) -> String {
        let merged = self
            .resolve(scope, tenant_id, locale, fallback_locale)
            .await;
        merged.resolve_key(key).to_string()
    }

    /// Drop cached merges after a content write. With a locale, only that
    /// locale's entries for the tenant go; without one, everything for the
    /// tenant goes. Returns the number of entries removed.
    ///
    /// The resolver never calls this itself; whoever writes translations does.
    pub fn invalidate(
        &self,
        scope: Scope,
        tenant_id: Option<&str>,
        locale: Option<&str>,
    ) -> usize {
        let tenant = tenant_id.unwrap_or("global");
        let prefix = match locale {
            Some(locale) => format!("{}:{}:{}:", scope.tag(), tenant, normalize_locale(locale)),
            None => format!("{}:{}:", scope.tag(), tenant),
        };
        let removed = self.cache.invalidate_prefix(&prefix);
        debug!("Invalidated {} cached merge(s) under '{}'", removed, prefix);
        removed
    }
}

/// Split a bulk global read into (fallback-locale rows, requested-locale
/// rows). Rows for any other locale are dropped: a store that ignores the
/// locale filter must not leak wrong-language strings into the merge.
fn partition_by_locale(
    rows: Vec<TranslationRow>,
    requested: &str,
    fallback_locale: &str,
) -> (Vec<TranslationRow>, Vec<TranslationRow>) {
    let mut fallback = Vec::new();
    let mut primary = Vec::new();
    for row in rows {
        if row.locale == requested {
            primary.push(row);
        } else if row.locale == fallback_locale {
            fallback.push(row);
        }
    }
    (fallback, primary)
}
