//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use wellness_core::ports::{PlanGenerationService, PlanStore};

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PlanStore>,
    pub generator: Arc<dyn PlanGenerationService>,
    pub config: Arc<Config>,
}
