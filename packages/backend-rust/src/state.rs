use std::sync::Arc;
use std::time::Instant;

use epp_algo::{AllocationPolicy, FuzzyError, LevelClassifier, StyleConfig};

use crate::config::Config;
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("level classifier failed to build: {0}")]
    Classifier(#[from] FuzzyError),
}

/// Shared handles for the assessment services; cheap to clone
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: Store,
    classifier: Arc<LevelClassifier>,
    style: Arc<StyleConfig>,
    policy: Arc<AllocationPolicy>,
}

impl AppState {
    /// Connect to PostgreSQL when `DATABASE_URL` is set, otherwise fall back
    /// to the in-memory store
    pub async fn from_config(config: Config) -> Result<Self, StateError> {
        let store = match config.database_url.as_deref() {
            Some(url) => {
                let store = Store::connect(url, config.db_max_connections).await?;
                tracing::info!(max_connections = config.db_max_connections, "postgres store ready");
                store
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory store");
                Store::memory()
            }
        };
        let state = Self::with_store(config, store)?;
        tracing::info!(store = state.store.backend_name(), "assessment state ready");
        Ok(state)
    }

    pub fn with_store(config: Config, store: Store) -> Result<Self, StateError> {
        let classifier = LevelClassifier::new()?;
        Ok(Self {
            style: Arc::new(config.style_config()),
            policy: Arc::new(config.allocation_policy()),
            config: Arc::new(config),
            store,
            classifier: Arc::new(classifier),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn classifier(&self) -> &Arc<LevelClassifier> {
        &self.classifier
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn policy(&self) -> &AllocationPolicy {
        &self.policy
    }

    /// Deadline for a request starting now, used when the caller has none
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.config.request_timeout
    }
}
