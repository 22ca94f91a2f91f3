//! The routing node orchestrator.
//!
//! Builds the routing engine from configuration, opens storage, serves the
//! HTTP API and keeps exchange rates fresh in background tasks.

use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use chainroute_core::ChainProfile;
use chainroute_routing::{default_profiles, default_rates_with, ChainRegistry, RateTable};
use chainroute_settlement::adapters::{MockExecutor, MockMixer};
use chainroute_settlement::{Durability, LifecycleEvent, RoutingEngine};

use crate::config::{ConfigRateFeed, NodeConfig};
use crate::state::AppState;
use crate::storage::Storage;

/// The routing node: engine, storage and API server.
pub struct ChainrouteNode {
    /// Node configuration.
    config: NodeConfig,
    /// File the configuration came from; rates are re-read from it.
    config_path: Option<PathBuf>,
    /// The routing engine shared with the API handlers.
    engine: Arc<RoutingEngine>,
    /// Persistent storage, when enabled.
    storage: Option<Arc<Storage>>,
    /// Lifecycle events for the audit log loop.
    event_rx: Option<broadcast::Receiver<LifecycleEvent>>,
    /// Background tasks owned by the node.
    tasks: Vec<JoinHandle<()>>,
}

impl ChainrouteNode {
    /// Create a new node with the given config.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let registry = Arc::new(ChainRegistry::new());
        let profiles = if config.chains.is_empty() {
            default_profiles()
        } else {
            config.chains.clone()
        };
        for profile in profiles {
            register(&registry, profile)?;
        }

        let rates = Arc::new(RateTable::new(default_rates_with(&config.rates.usd)));

        let storage = if config.storage.enabled {
            let storage = Arc::new(Storage::open(&config.storage.data_dir)?);
            tracing::info!(
                path = %config.storage.data_dir.display(),
                stored_payments = storage.list_payments()?.len(),
                "storage initialized"
            );
            Some(storage)
        } else {
            None
        };

        let mixer = MockMixer::new()
            .with_latency(Duration::from_millis(config.backends.mixer_latency_ms));
        let executor = MockExecutor::new()
            .with_latency(Duration::from_millis(config.backends.executor_latency_ms))
            .with_confirmations(config.backends.confirmations);

        let mut builder = RoutingEngine::builder(Arc::new(mixer), Arc::new(executor))
            .registry(registry)
            .rates(rates)
            .policy(config.policy.clone());
        if let Some(storage) = &storage {
            let durability: Arc<dyn Durability> = storage.clone();
            builder = builder.durability(durability);
        }
        let engine = Arc::new(builder.build());
        let event_rx = Some(engine.subscribe());

        Ok(Self {
            config,
            config_path: None,
            engine,
            storage,
            event_rx,
            tasks: Vec::new(),
        })
    }

    /// Refresh exchange rates from `[rates]` of this file while running.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn engine(&self) -> &Arc<RoutingEngine> {
        &self.engine
    }

    /// Spawn the HTTP API server and the rate refresh task.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("starting routing node");

        let api_addr: SocketAddr = self.config.api_addr().parse()?;
        let state = Arc::new(AppState::new(self.engine.clone(), self.storage.clone()));
        self.tasks.push(tokio::spawn(async move {
            if let Err(e) = crate::api::start_api_server(api_addr, state).await {
                tracing::error!(error = %e, "HTTP API server error");
            }
        }));

        let interval_secs = self.config.rates.refresh_interval_secs;
        match self.config_path.clone().filter(|_| interval_secs > 0) {
            Some(path) => self.spawn_rate_refresh(path, interval_secs),
            None => tracing::info!("exchange rates fixed for this run"),
        }

        Ok(())
    }

    fn spawn_rate_refresh(&mut self, path: PathBuf, interval_secs: u64) {
        tracing::info!(
            path = %path.display(),
            interval_secs,
            "refreshing exchange rates from config"
        );
        let engine = self.engine.clone();
        let feed = ConfigRateFeed::new(path);
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            // The first tick completes immediately; rates were seeded at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match engine.refresh_rates(&feed).await {
                    Ok(snapshot) => {
                        tracing::debug!(currencies = snapshot.len(), "exchange rates refreshed")
                    }
                    Err(e) => tracing::warn!(error = %e, "exchange rate refresh failed"),
                }
            }
        }));
    }

    /// Follow lifecycle events until the engine's channel closes.
    pub async fn run(&mut self) -> Result<()> {
        let mut event_rx = self
            .event_rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("node not started"))?;

        tracing::info!("entering main event loop");
        loop {
            match event_rx.recv().await {
                Ok(LifecycleEvent::Routed {
                    payment_id, chain, ..
                }) => {
                    tracing::debug!(%payment_id, %chain, "payment routed");
                }
                Ok(LifecycleEvent::StatusChanged {
                    payment_id, from, to, ..
                }) => {
                    tracing::info!(%payment_id, %from, %to, "payment status changed");
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("lifecycle event channel closed");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Stop background tasks and report final stats.
    pub async fn shutdown(&mut self) -> Result<()> {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let stats = self.engine.get_stats();
        tracing::info!(
            payments = stats.total_payments,
            avg_confirmation_ms = ?stats.avg_confirmation_time_ms,
            "routing node stopped"
        );
        Ok(())
    }
}

fn register(registry: &ChainRegistry, profile: ChainProfile) -> Result<()> {
    let id = profile.id.clone();
    registry
        .register(profile)
        .map_err(|e| anyhow::anyhow!("invalid chain '{}' in config: {}", id, e))
}
