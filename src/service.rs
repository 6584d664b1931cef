//! Service wiring: builds the components, spawns the background tasks,
//! and runs until ctrl-c.

use crate::api::{self, ApiState};
use crate::delivery::DeliveryEngine;
use crate::insight_cache::InsightCache;
use crate::presence::PresenceRegistry;
use crate::registry::JobRegistry;
use crate::sweep::DailySweep;
use lull_core::config::Config;
use lull_core::traits::InsightGenerator;
use lull_core::{shellexpand, LullError};
use lull_store::Store;
use std::sync::Arc;
use tracing::info;

pub struct Service {
    config: Config,
    registry: Arc<JobRegistry>,
    sweep: Arc<DailySweep>,
    api_state: ApiState,
}

impl Service {
    pub async fn new(
        config: Config,
        generator: Arc<dyn InsightGenerator>,
    ) -> Result<Self, LullError> {
        let store = Store::new(&shellexpand(&config.store.db_path)).await?;
        let presence = Arc::new(PresenceRegistry::new());
        let delivery = Arc::new(DeliveryEngine::new(store.clone(), presence.clone()));
        let registry = Arc::new(JobRegistry::new(store.clone(), delivery.clone()));
        let sweep = Arc::new(DailySweep::new(
            store.clone(),
            delivery.clone(),
            config.sweep.hour,
        ));
        let insights = Arc::new(InsightCache::new(store.clone(), generator, delivery.clone()));
        let api_state = ApiState::new(store, presence, delivery, insights);

        Ok(Self {
            config,
            registry,
            sweep,
            api_state,
        })
    }

    /// Run until ctrl-c, then stop all background work.
    pub async fn run(self) -> Result<(), LullError> {
        let started = self.registry.load_all().await?;
        info!(
            "lull service running | schedules: {started} | db: {}",
            self.config.store.db_path
        );

        let sweep_handle = if self.config.sweep.enabled {
            Some(self.sweep.clone().spawn())
        } else {
            info!("daily sweep disabled by config");
            None
        };

        let server_config = self.config.server.clone();
        let api_state = self.api_state.clone();
        let api_handle = tokio::spawn(async move {
            api::serve(server_config, api_state).await;
        });

        tokio::signal::ctrl_c().await.map_err(LullError::Io)?;
        info!("shutdown signal received");

        self.registry.shutdown();
        if let Some(handle) = sweep_handle {
            handle.abort();
        }
        api_handle.abort();

        Ok(())
    }
}
