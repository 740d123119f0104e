//! Platform locale registry: single source of truth for the locales the
//! marketing surface ships in.
//!
//! Tenant sites may enable any locale string their content uses; this registry
//! only constrains the platform's own pages and supplies the canonical
//! fallback. Initialized once via `OnceLock` and immutable thereafter.

use std::sync::OnceLock;

/// Locale used when nothing else applies, process-wide.
pub const PLATFORM_DEFAULT_LOCALE: &str = "en";

/// Metadata for one platform locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// ISO 639-1 code (e.g., "en", "ca")
    pub code: &'static str,
    /// English name of the language
    pub name: &'static str,
    /// Native name of the language
    pub native_name: &'static str,
    /// Whether this is the canonical locale translations fall back to
    pub is_canonical: bool,
}

/// Registry of all locales the platform surface supports.
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global registry instance, initializing it on first access.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: platform_locales(),
        })
    }

    /// Look up a locale by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|l| l.code == code)
    }

    /// Whether the platform surface ships this locale.
    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }

    /// All platform locales.
    pub fn list(&self) -> &[LocaleConfig] {
        &self.locales
    }

    /// The canonical locale every translation ultimately falls back to.
    pub fn canonical(&self) -> &LocaleConfig {
        self.locales
            .iter()
            .find(|l| l.is_canonical)
            .expect("registry must define exactly one canonical locale")
    }
}

/// Lowercase and trim a locale code. Idempotent.
pub fn normalize_locale(code: &str) -> String {
    code.trim().to_lowercase()
}

fn platform_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig {
            code: "en",
            name: "English",
            native_name: "English",
            is_canonical: true,
        },
        LocaleConfig {
            code: "es",
            name: "Spanish",
            native_name: "Español",
            is_canonical: false,
        },
        LocaleConfig {
            code: "ca",
            name: "Catalan",
            native_name: "Català",
            is_canonical: false,
        },
        LocaleConfig {
            code: "fr",
            name: "French",
            native_name: "Français",
            is_canonical: false,
        },
        LocaleConfig {
            code: "de",
            name: "German",
            native_name: "Deutsch",
            is_canonical: false,
        },
        LocaleConfig {
            code: "it",
            name: "Italian",
            native_name: "Italiano",
            is_canonical: false,
        },
        LocaleConfig {
            code: "pt",
            name: "Portuguese",
            native_name: "Português",
            is_canonical: false,
        },
        LocaleConfig {
            code: "ru",
            name: "Russian",
            native_name: "Русский",
            is_canonical: false,
        },
        LocaleConfig {
            code: "zh",
            name: "Chinese",
            native_name: "中文",
            is_canonical: false,
        },
        LocaleConfig {
            code: "hi",
            name: "Hindi",
            native_name: "हिन्दी",
            is_canonical: false,
        },
        LocaleConfig {
            code: "ar",
            name: "Arabic",
            native_name: "العربية",
            is_canonical: false,
        },
    ]
}
