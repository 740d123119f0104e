use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use vowsite_i18n::config::Config;
use vowsite_i18n::db::{self, PgStore};
use vowsite_i18n::i18n::TranslationResolver;
use vowsite_i18n::server::{self, AppState};
use vowsite_i18n::tenant::TenantDirectory;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vowsite_i18n=info".parse()?),
        )
        .init();

    info!("Starting Vowsite i18n service");

    // Load configuration from environment
    let config = Arc::new(Config::from_env()?);

    // Connect to PostgreSQL
    let pool = db::create_pool(&config).await?;
    let store = Arc::new(PgStore::new(pool));
    info!("✓ Connected to PostgreSQL");

    let directory = Arc::new(TenantDirectory::new(
        store.clone(),
        config.platform_domain.clone(),
        config.platform_default_locale.clone(),
    ));
    let resolver = Arc::new(TranslationResolver::new(
        store,
        config.site_ttl(),
        config.global_ttl(),
    ));

    server::run(AppState {
        config,
        directory,
        resolver,
    })
    .await
}
