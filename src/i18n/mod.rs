//! Internationalization (i18n) core for the multi-tenant platform.
//!
//! This module owns the one genuinely interesting piece of the system: turning
//! `(tenant, requested locale, fallback locale)` into a single flattened
//! key→string dictionary, merged from layered sources and cached under a TTL.
//!
//! # Architecture
//!
//! - `locale`: registry of platform locales and locale-code normalization
//! - `dictionary`: the immutable merged dictionary value object
//! - `resolver`: layer fetching, merge precedence, caching, invalidation
//!
//! Merge precedence, lowest to highest: global strings in the fallback locale,
//! global strings in the requested locale, tenant-site overrides. A tenant's
//! own override always wins; the fallback locale is visible only for keys the
//! requested locale never defined.

mod dictionary;
mod locale;
mod resolver;

pub use dictionary::MergedDictionary;
pub use locale::{normalize_locale, LocaleConfig, LocaleRegistry, PLATFORM_DEFAULT_LOCALE};
pub use resolver::TranslationResolver;
