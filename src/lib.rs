// Declare the modules
pub mod api;
pub mod commands;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;

use crate::api::{CannedResponder, ResponseSource};
use crate::config::DashboardConfig;
use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Builds the application state from `config` with the canned responder.
pub fn build_state(config: &DashboardConfig) -> AppState {
    let source: Arc<dyn ResponseSource> = Arc::new(CannedResponder::new());
    AppState::new(config, source)
}

pub fn run() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = DashboardConfig::from_env().context("Failed to load configuration")?;
    log::info!(
        "Starting llm-pulse (seed: {:?}, demo data: {})",
        config.seed,
        config.seed_demo_data
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        let app_state = build_state(&config);
        console::run_console(app_state).await
    })
}
