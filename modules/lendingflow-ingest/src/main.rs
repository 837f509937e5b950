use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docai_client::{AutomationService, HttpAutomationClient};
use lendingflow_common::Config;
use lendingflow_dispatch::{
    Dispatcher, DispatchStore, MemoryDispatchStore, PostgresDispatchStore, ProfileResolver,
    RouteTable, Router,
};

mod server;

use server::{app, AppState};

/// How often expired dispatch records are swept.
const EVICTION_INTERVAL: Duration = Duration::from_secs(3600);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lendingflow=info".parse()?))
        .init();

    info!("LendingFlow ingest starting...");

    // Load config
    let config = Config::from_env();
    config.log_redacted();

    let table = RouteTable::from_config(&config)?;
    ensure_profile_coverage(&table, &config)?;

    let service: Arc<dyn AutomationService> = Arc::new(
        HttpAutomationClient::new(&config.automation_endpoint, &config.automation_api_key)
            .with_timeouts(config.profile_lookup_timeout, config.dispatch_timeout),
    );

    // Shared record store: Postgres when configured, otherwise in-process.
    let store: Arc<dyn DispatchStore> = match &config.database_url {
        Some(url) => {
            let pool = sqlx::PgPool::connect(url).await?;
            let store = PostgresDispatchStore::new(
                pool,
                config.pending_lease,
                config.idempotency_retention,
            );
            store.migrate().await?;
            info!("Dispatch records in Postgres");
            Arc::new(store)
        }
        None => {
            info!("No DATABASE_URL set, dispatch records in process memory");
            Arc::new(MemoryDispatchStore::new(
                config.pending_lease,
                config.idempotency_retention,
            ))
        }
    };

    spawn_eviction_loop(store.clone());

    // Resolves the default profile eagerly; a broken default fails the boot.
    let resolver = ProfileResolver::new(
        service.clone(),
        config.default_profile_name.as_deref(),
        config.profile_cache_ttl,
    )
    .await
    .map_err(|e| anyhow::anyhow!("startup profile resolution failed: {e}"))?;

    let dispatcher = Dispatcher::new(
        table.clone(),
        resolver,
        service,
        store,
        config.dispatch_max_attempts,
    );
    let router = Router::new(table, config.target_bucket.clone());

    let state = Arc::new(AppState { router, dispatcher });
    let addr = format!("{}:{}", config.ingest_host, config.ingest_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Ingress listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Every input prefix needs a usable profile: its own route entry or the
/// default. Checked before the listener binds so a configuration hole fails
/// the deploy, not the first matching event.
fn ensure_profile_coverage(table: &RouteTable, config: &Config) -> Result<()> {
    if config.default_profile_name.is_some() {
        return Ok(());
    }
    for prefix in table.input_prefixes() {
        if table.profile_for(prefix).is_none() {
            anyhow::bail!(
                "no processing profile for input prefix '{prefix}' and no DEFAULT_PROFILE_NAME set"
            );
        }
    }
    Ok(())
}

fn spawn_eviction_loop(store: Arc<dyn DispatchStore>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(EVICTION_INTERVAL).await;
            match store.evict_expired().await {
                Ok(0) => {}
                Ok(evicted) => info!(evicted, "Evicted expired dispatch records"),
                Err(e) => warn!(error = %e, "Dispatch record eviction failed"),
            }
        }
    });
}
