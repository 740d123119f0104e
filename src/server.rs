use crate::config::Config;
use crate::i18n::{LocaleRegistry, MergedDictionary, TranslationResolver};
use crate::store::Scope;
use crate::tenant::{TenantDescriptor, TenantDirectory};
use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub directory: Arc<TenantDirectory>,
    pub resolver: Arc<TranslationResolver>,
}

/// Constant-time string comparison to prevent timing attacks.
/// Use this for comparing API keys and other sensitive values.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/translations", get(get_translations))
        .route("/api/translate", get(get_translate))
        .route("/api/invalidate", post(post_invalidate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until shutdown.
pub async fn run(state: AppState) -> Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind {}", addr))?;
    info!("✓ Listening on {}", addr);
    axum::serve(listener, router(state))
        .await
        .context("Server error")
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct TranslationsQuery {
    /// Overrides the `Host` header, mostly for diagnostics.
    host: Option<String>,
    lang: Option<String>,
    fallback: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslationsResponse {
    tenant: Option<TenantDescriptor>,
    scope: Scope,
    locale: String,
    fallback: String,
    translations: MergedDictionary,
}

/// Figure out the inbound host: explicit query parameter first, then the
/// `Host` header, stripped of any port.
fn inbound_host(query_host: Option<&str>, headers: &HeaderMap) -> Option<String> {
    let raw = match query_host {
        Some(h) => h.to_string(),
        None => headers.get("host")?.to_str().ok()?.to_string(),
    };
    Some(strip_port(&raw).to_string())
}

/// Drop a trailing `:port` from a host string. Bracketed IPv6 literals keep
/// their brackets; the colons inside them are not a port separator.
fn strip_port(raw: &str) -> &str {
    if raw.starts_with('[') {
        return raw.find(']').map(|end| &raw[..=end]).unwrap_or(raw);
    }
    match raw.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => raw,
    }
}

/// Resolve the request to a tenant and the locale pair to merge with.
///
/// Unknown hosts are not errors: they get the platform's marketing strings,
/// in a registry-supported locale.
async fn resolve_context(
    state: &AppState,
    host: Option<String>,
    lang: Option<String>,
    fallback: Option<String>,
) -> (Option<TenantDescriptor>, Scope, String, String) {
    let tenant = match &host {
        Some(host) => state.directory.resolve_by_host(host).await,
        None => None,
    };
    let fallback = fallback.unwrap_or_else(|| state.config.platform_default_locale.clone());

    match tenant {
        Some(tenant) => {
            let locale = lang.unwrap_or_else(|| tenant.default_locale.clone());
            (Some(tenant), Scope::Global, locale, fallback)
        }
        None => {
            let locale = lang
                .filter(|l| LocaleRegistry::get().is_supported(l.trim().to_lowercase().as_str()))
                .unwrap_or_else(|| state.config.platform_default_locale.clone());
            (None, Scope::Marketing, locale, fallback)
        }
    }
}

async fn get_translations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TranslationsQuery>,
) -> Json<TranslationsResponse> {
    let host = inbound_host(query.host.as_deref(), &headers);
    let (tenant, scope, locale, fallback) =
        resolve_context(&state, host, query.lang, query.fallback).await;

    let translations = state
        .resolver
        .resolve(scope, tenant.as_ref().map(|t| t.id.as_str()), &locale, &fallback)
        .await;

    Json(TranslationsResponse {
        tenant,
        scope,
        locale,
        fallback,
        translations,
    })
}

#[derive(Debug, Deserialize)]
struct TranslateQuery {
    key: String,
    host: Option<String>,
    lang: Option<String>,
    fallback: Option<String>,
}

#[derive(Debug, Serialize)]
struct TranslateResponse {
    key: String,
    value: String,
}

async fn get_translate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<TranslateQuery>,
) -> Json<TranslateResponse> {
    let host = inbound_host(query.host.as_deref(), &headers);
    let (tenant, scope, locale, fallback) =
        resolve_context(&state, host, query.lang, query.fallback).await;

    let value = state
        .resolver
        .translate(
            scope,
            tenant.as_ref().map(|t| t.id.as_str()),
            &locale,
            &query.key,
            &fallback,
        )
        .await;

    Json(TranslateResponse {
        key: query.key,
        value,
    })
}

#[derive(Debug, Deserialize)]
struct InvalidateRequest {
    site_id: Option<String>,
    locale: Option<String>,
    #[serde(default = "default_scope")]
    scope: Scope,
}

fn default_scope() -> Scope {
    Scope::Global
}

#[derive(Debug, Serialize)]
struct InvalidateResponse {
    removed: usize,
}

/// Cache busting after a content write. Guarded by the API key; without one
/// configured the endpoint stays disabled.
async fn post_invalidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, (StatusCode, String)> {
    let expected = state.config.api_key.as_deref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "invalidation endpoint is disabled (API_KEY not configured)".to_string(),
    ))?;

    let provided = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !constant_time_compare(provided, expected) {
        return Err((StatusCode::UNAUTHORIZED, "invalid API key".to_string()));
    }

    let removed = state.resolver.invalidate(
        request.scope,
        request.site_id.as_deref(),
        request.locale.as_deref(),
    );
    info!(
        "Cache invalidation: scope={} site={:?} locale={:?} removed={}",
        request.scope.tag(),
        request.site_id,
        request.locale,
        removed
    );
    Ok(Json(InvalidateResponse { removed }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("secret123", "secret123"));
        assert!(!constant_time_compare("secret123", "secret124"));
        assert!(!constant_time_compare("secret123", "secret12"));
        assert!(!constant_time_compare("", "secret"));
    }

    #[test]
    fn test_inbound_host_prefers_query_param() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "fromheader.example".parse().unwrap());
        assert_eq!(
            inbound_host(Some("fromquery.example"), &headers),
            Some("fromquery.example".to_string())
        );
    }

    #[test]
    fn test_inbound_host_falls_back_to_header() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "mysite.com".parse().unwrap());
        assert_eq!(inbound_host(None, &headers), Some("mysite.com".to_string()));
    }

    #[test]
    fn test_inbound_host_strips_port() {
        let mut headers = HeaderMap::new();
        headers.insert("host", "mysite.com:8080".parse().unwrap());
        assert_eq!(inbound_host(None, &headers), Some("mysite.com".to_string()));
    }

    #[test]
    fn test_inbound_host_missing_everywhere() {
        assert_eq!(inbound_host(None, &HeaderMap::new()), None);
    }

    #[test]
    fn test_strip_port_ipv6_with_port() {
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[2001:db8::1]:443"), "[2001:db8::1]");
    }

    #[test]
    fn test_strip_port_ipv6_without_port_is_untouched() {
        assert_eq!(strip_port("[::1]"), "[::1]");
        assert_eq!(strip_port("[2001:db8::1]"), "[2001:db8::1]");
    }

    #[test]
    fn test_strip_port_ignores_non_numeric_suffix() {
        assert_eq!(strip_port("mysite.com:abc"), "mysite.com:abc");
        assert_eq!(strip_port("mysite.com:"), "mysite.com:");
    }
}
