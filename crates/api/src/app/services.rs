use std::sync::Arc;

use anyhow::Context;

use printsync_events::{EventSink, SyncEvent};
use printsync_infra::config::propagation_group_from_vars;
use printsync_infra::sync::{MarginPricing, SharedIdLinks};
use printsync_infra::{
    BatchOrchestrator, CatalogApi, CatalogSettings, ConfigError, CrossShopPropagator, EngineConfig,
    HttpCatalog, IdempotencyLedger, InMemoryProcessedStore, NotificationRouter, PostgresProcessedStore,
    ProcessedStore, PropagationGroup, RateLimiter, SyncContext,
};
use printsync_observability::TracingSink;
use printsync_pricing::CostTable;

/// Long-lived engine components shared by every request.
#[derive(Debug)]
pub struct AppServices {
    pub orchestrator: BatchOrchestrator,
    pub propagator: Arc<CrossShopPropagator>,
    pub notifications: NotificationRouter,
    pub pricing: MarginPricing,
    pub ledger: IdempotencyLedger,
    pub limiter: Arc<RateLimiter>,
}

impl AppServices {
    pub fn new(
        config: &EngineConfig,
        costs: Arc<CostTable>,
        catalog: Arc<dyn CatalogApi>,
        store: Arc<dyn ProcessedStore>,
        group: PropagationGroup,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let ledger = IdempotencyLedger::new(store, sink.clone());
        let limiter = Arc::new(RateLimiter::new(config.rate_limits()));
        let ctx = SyncContext {
            catalog,
            ledger: ledger.clone(),
            limiter: limiter.clone(),
            retry: config.retry_policy(),
            pace_delay: config.pace_delay,
            sink: sink.clone(),
        };

        let orchestrator = BatchOrchestrator::new(ctx, config.page_size, config.upstream_page_size);
        let propagator = Arc::new(CrossShopPropagator::new(
            orchestrator.clone(),
            group,
            Arc::new(SharedIdLinks),
        ));
        let notifications = NotificationRouter::new(propagator.clone(), sink);
        let pricing = MarginPricing::new(config.pricing_policy(costs)?);

        Ok(Self {
            orchestrator,
            propagator,
            notifications,
            pricing,
            ledger,
            limiter,
        })
    }
}

/// Wire services from `PRINTSYNC_*` variables (and `DATABASE_URL`, when set).
pub async fn build_services_from_env() -> anyhow::Result<AppServices> {
    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let settings = CatalogSettings::from_env().context("invalid catalog settings")?;
    let group = propagation_group_from_vars(|key| std::env::var(key).ok())
        .context("invalid propagation group")?;

    let sink: Arc<dyn EventSink> = Arc::new(TracingSink::new());
    let costs = Arc::new(load_cost_table(&config, sink.as_ref())?);

    let store: Arc<dyn ProcessedStore> = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let store = PostgresProcessedStore::connect(&url)
                .await
                .context("failed to connect to processed-record store")?;
            Arc::new(store)
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; processed records are kept in memory only");
            Arc::new(InMemoryProcessedStore::new())
        }
    };

    let catalog: Arc<dyn CatalogApi> =
        Arc::new(HttpCatalog::new(&settings).context("failed to build catalog client")?);

    Ok(AppServices::new(&config, costs, catalog, store, group, sink)?)
}

/// Operator file when configured, otherwise the built-in table. Inverted
/// size costs are reported but do not stop startup.
fn load_cost_table(config: &EngineConfig, sink: &dyn EventSink) -> anyhow::Result<CostTable> {
    let table = match &config.cost_table_path {
        Some(path) => CostTable::from_json_file(path)
            .with_context(|| format!("failed to load cost table {}", path.display()))?,
        None => CostTable::builtin_with_multiplier(config.plus_size_multiplier)?,
    };

    for warning in table.validate() {
        sink.emit(SyncEvent::CostTableWarning {
            message: warning.to_string(),
        });
    }
    tracing::info!(categories = table.len(), "cost table loaded");
    Ok(table)
}
