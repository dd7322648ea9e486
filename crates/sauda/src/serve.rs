// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sauda serve` command implementation.
//!
//! Starts the full mediation service: SQLite storage, cached market band
//! source, HTTP mediation gateway with degradation fallbacks, trust engine,
//! room dispatcher, idle sweep, and the WebSocket gateway. Supports graceful
//! shutdown via signal handlers.

use std::sync::Arc;

use sauda_config::model::SaudaConfig;
use sauda_core::{
    Clock, HealthStatus, MarketDataSource, MediatorGateway, PluginAdapter, SaudaError,
    StorageAdapter, SystemClock,
};
use sauda_gateway::{GatewayState, ServerConfig, start_server};
use sauda_market::{CachedMarket, StaticMarketSource};
use sauda_mediator::{HttpMediator, ResilientMediator};
use sauda_room::shutdown;
use sauda_room::{Broadcaster, Dispatcher, IdleSweep, NegotiationPolicy, RoomDeps};
use sauda_storage::SqliteStorage;
use sauda_trust::TrustEngine;
use tracing::{debug, error, info, warn};

/// Runs the `sauda serve` command.
///
/// Builds every adapter, starts the room dispatcher and the idle sweep,
/// and serves the WebSocket gateway until a shutdown signal arrives.
pub async fn run_serve(config: SaudaConfig) -> Result<(), SaudaError> {
    // Initialize tracing subscriber.
    init_tracing(&config.service.log_level);

    info!(name = config.service.name.as_str(), "starting sauda serve");

    // Initialize storage.
    let storage: Arc<dyn StorageAdapter> = {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        Arc::new(storage)
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Rooms a previous run left open resume lazily on the next join; the
    // idle sweep closes the ones nobody comes back to.
    report_open_rooms(storage.as_ref(), clock.as_ref()).await?;

    let deps = build_room_deps(&config, storage.clone(), clock.clone())?;
    probe_adapter_health(&deps).await;
    let dispatcher = Arc::new(Dispatcher::new(deps));

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    // Spawn the idle sweep background task.
    {
        let sweep = IdleSweep::new(
            dispatcher.clone(),
            storage.clone(),
            clock.clone(),
            &config.negotiation,
        );
        let sweep_cancel = cancel.clone();
        let interval_secs = config.negotiation.sweep_interval_secs;

        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            // Skip the first immediate tick.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match sweep.execute().await {
                            Ok(stats) if stats.closed > 0 || stats.failed > 0 => {
                                info!(
                                    closed = stats.closed,
                                    failed = stats.failed,
                                    "idle sweep closed abandoned rooms"
                                );
                            }
                            Ok(_) => {
                                debug!("idle sweep found nothing to close");
                            }
                            Err(e) => {
                                warn!(error = %e, "idle sweep failed (non-fatal)");
                            }
                        }
                    }
                    _ = sweep_cancel.cancelled() => {
                        info!("idle sweep shutting down");
                        break;
                    }
                }
            }
        });
        info!(
            interval_secs,
            auto_close_hours = config.negotiation.auto_close_hours,
            "idle sweep started"
        );
    }

    // Serve the gateway until cancelled.
    let server_config = ServerConfig {
        bind_address: config.gateway.bind_address.clone(),
        port: config.gateway.port,
        allowed_origins: config.gateway.allowed_origins.clone(),
    };
    let state = GatewayState::new(dispatcher);
    start_server(&server_config, state, cancel).await?;

    // The gateway has drained; checkpoint storage before exit.
    storage.close().await?;

    info!("sauda serve shutdown complete");
    Ok(())
}

/// Builds the shared collaborators handed to every room actor.
fn build_room_deps(
    config: &SaudaConfig,
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
) -> Result<RoomDeps, SaudaError> {
    let market: Arc<dyn MarketDataSource> = Arc::new(CachedMarket::new(
        Arc::new(StaticMarketSource::new()),
        config.market.cache_ttl_secs,
        clock.clone(),
    ));
    info!(
        ttl_secs = config.market.cache_ttl_secs,
        "market band cache ready"
    );

    let mediator: Arc<dyn MediatorGateway> = {
        let http = HttpMediator::from_config(&config.mediator).map_err(|e| {
            error!(error = %e, "failed to initialize mediation client");
            eprintln!(
                "error: mediation client could not be built. Check mediator.base_url in sauda.toml."
            );
            e
        })?;
        info!(
            base_url = config.mediator.base_url.as_str(),
            adapter = http.name(),
            "mediation gateway ready"
        );
        Arc::new(ResilientMediator::new(Arc::new(http)))
    };

    let trust = Arc::new(TrustEngine::new(storage.clone(), clock.clone()));
    let policy = Arc::new(NegotiationPolicy::new(&config.negotiation));

    Ok(RoomDeps {
        storage,
        market,
        mediator,
        trust,
        policy,
        clock,
        broadcaster: Arc::new(Broadcaster::new()),
    })
}

/// Probes every adapter once at startup and logs anything that is not
/// healthy. An unreachable mediation gateway is survivable; rooms fall
/// back to canned interventions until it recovers.
async fn probe_adapter_health(deps: &RoomDeps) {
    report_health(deps.market.name(), deps.market.health_check().await);
    report_health(deps.mediator.name(), deps.mediator.health_check().await);
    report_health(deps.storage.name(), deps.storage.health_check().await);
}

fn report_health(adapter: &str, status: Result<HealthStatus, SaudaError>) {
    match status {
        Ok(HealthStatus::Healthy) => debug!(adapter, "health check passed"),
        Ok(HealthStatus::Degraded(reason)) => warn!(adapter, %reason, "adapter degraded"),
        Ok(HealthStatus::Unhealthy(reason)) => warn!(adapter, %reason, "adapter unhealthy"),
        Err(e) => warn!(adapter, error = %e, "health check failed"),
    }
}

/// Logs rooms a previous run left open.
///
/// Every open room's last activity is at or before now, so the stale
/// query with a cutoff of now returns all of them.
async fn report_open_rooms(
    storage: &dyn StorageAdapter,
    clock: &dyn Clock,
) -> Result<(), SaudaError> {
    let open = storage.stale_open_rooms(clock.now()).await?;
    if !open.is_empty() {
        info!(
            count = open.len(),
            "open rooms found in storage; they resume on the next join"
        );
    }
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "sauda={log_level},sauda_room={log_level},sauda_gateway={log_level},\
             sauda_storage={log_level},sauda_mediator={log_level},sauda_market={log_level},\
             sauda_trust={log_level},warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use sauda_config::model::StorageConfig;

    async fn temp_storage(dir: &tempfile::TempDir) -> Arc<dyn StorageAdapter> {
        let config = StorageConfig {
            database_path: dir.path().join("sauda.db").to_string_lossy().to_string(),
            wal_mode: true,
        };
        let storage = SqliteStorage::new(config);
        storage.initialize().await.expect("storage init");
        Arc::new(storage)
    }

    #[tokio::test]
    async fn room_deps_build_from_default_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = temp_storage(&dir).await;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let deps =
            build_room_deps(&SaudaConfig::default(), storage, clock).expect("room deps");
        let dispatcher = Dispatcher::new(deps);
        assert_eq!(dispatcher.live_rooms(), 0);
    }

    #[tokio::test]
    async fn report_open_rooms_tolerates_empty_storage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = temp_storage(&dir).await;

        report_open_rooms(storage.as_ref(), &SystemClock)
            .await
            .expect("empty storage reports cleanly");
    }
}
