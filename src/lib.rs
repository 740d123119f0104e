//! Tenant resolution and layered translation merging for the Vowsite
//! wedding-site platform.
//!
//! Given an inbound request host and a requested locale, this crate resolves
//! which tenant site owns the request, then produces a single flattened
//! key→string dictionary by merging global platform strings, the fallback
//! locale, and tenant-site overrides under a small TTL cache. It is built to
//! degrade, never fail: the worst a storage outage can do is make a visitor
//! see raw translation keys or the marketing page.

pub mod cache;
pub mod config;
pub mod db;
pub mod i18n;
pub mod server;
pub mod store;
pub mod tenant;

pub use cache::{Clock, LayeredCache, SystemClock};
pub use i18n::{MergedDictionary, TranslationResolver};
pub use store::{Scope, SiteRecord, StoreError, TenantStore, TranslationRow, TranslationStore};
pub use tenant::{TenantDescriptor, TenantDirectory};
