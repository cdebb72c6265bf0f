use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use pactum_api::{build_router, AppState, AuditSink};
use pactum_core::Store;
use pactum_platform::{connect_database, Cache, RedisCache, ServiceConfig};
use pactum_providers::ProviderRegistry;
use pactum_store::PgStore;
use tracing::info;

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pactum_api=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let pool = connect_database(&config.database_url).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let cache: Arc<dyn Cache> = Arc::new(RedisCache::connect(&config.redis_url)?);
    let providers = ProviderRegistry::new(
        &config.domain.click_webhook_secret,
        &config.domain.payme_webhook_secret,
    );
    let audit = AuditSink::new(store.clone());

    let state = AppState {
        store,
        cache,
        providers,
        settings: Arc::new(config.domain),
        audit,
    };
    let router = build_router(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("contract service listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
