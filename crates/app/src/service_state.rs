use std::sync::Arc;

use common::prelude::{Console, Store};

use crate::ServiceConfig;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct State {
    console: Console,
}

impl State {
    pub fn new(console: Console) -> Self {
        Self { console }
    }

    pub async fn from_config(config: &ServiceConfig) -> Result<Self, StateSetupError> {
        let store = object_store::connect(&config.store).await?;
        Ok(Self::from_store(store, config))
    }

    pub fn from_store(store: Arc<dyn Store>, config: &ServiceConfig) -> Self {
        Self::new(Console::new(store, config.max_objects))
    }

    pub fn console(&self) -> &Console {
        &self.console
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("store setup failed: {0}")]
    Backend(#[from] object_store::BackendError),
}
