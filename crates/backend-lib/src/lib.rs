// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend functionality for the convoy journey-coordination server.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metric_keys;
pub mod registry;
pub mod rooms;
pub mod routes;
pub mod store;
pub mod validation;
pub mod ws_router;

use crate::auth::{AuthService, SessionManager, TokenAuth};
use crate::config::Settings;
use crate::registry::SessionRegistry;
use crate::rooms::RoomRegistry;
use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
pub struct AppState<S> {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Session registry over the durable store
    pub registry: SessionRegistry<S>,
    /// Storage backend (location log writes)
    pub store: S,
    /// Room membership, owned by the gateway
    pub rooms: RoomRegistry,
    /// Settings
    pub settings: Arc<Settings>,
}

impl<S: Store + Clone + Send + Sync + 'static> AppState<S> {
    /// Create a new application state. Must be called from within a tokio
    /// runtime (the token manager spawns its cleanup task).
    pub fn new(store: S, settings: Settings) -> Self {
        let sessions = SessionManager::new(Duration::from_secs(settings.token_ttl_secs));
        let auth: Arc<dyn AuthService> = Arc::new(TokenAuth::new(sessions));

        Self {
            auth,
            registry: SessionRegistry::new(store.clone()),
            store,
            rooms: RoomRegistry::new(),
            settings: Arc::new(settings),
        }
    }
}
