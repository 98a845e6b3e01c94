mod battle;
pub mod export;
mod game;
mod round;
mod store;
mod submission;
mod vote;

pub use store::Store;
pub(crate) use submission::insert_submission;
pub use vote::{eligible_voters, is_eligible_voter};

use crate::config::EngineConfig;
use crate::prompt_pool::PromptPool;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared engine state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub config: Arc<EngineConfig>,
    pub prompt_pool: PromptPool,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            config: Arc::new(config),
            prompt_pool: PromptPool::default(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
