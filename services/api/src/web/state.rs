//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use lingua_core::ports::{DatabaseService, IdentityService};
use lingua_core::time::Clock;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub identity: Arc<dyn IdentityService>,
    pub clock: Clock,
    pub config: Arc<Config>,
}
