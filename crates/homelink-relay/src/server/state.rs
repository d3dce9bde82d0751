//! Relay state
//!
//! Application state shared by every connection handler.

use crate::connection::ConnectionRegistry;
use crate::router::EventRouter;
use homelink_common::AppConfig;
use std::sync::Arc;

/// Relay application state
///
/// The registry (and the presence set derived from it) is the only shared
/// mutable state in the process, and it is only ever mutated through the
/// router's join/disconnect handling.
#[derive(Clone)]
pub struct RelayState {
    registry: Arc<ConnectionRegistry>,
    router: Arc<EventRouter>,
    config: Arc<AppConfig>,
}

impl RelayState {
    /// Create the relay state from configuration
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let registry = ConnectionRegistry::new_shared();
        let router = Arc::new(EventRouter::new(registry.clone()));
        Self {
            registry,
            router,
            config: Arc::new(config),
        }
    }

    /// Get the connection registry
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the event router
    #[must_use]
    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Get the application configuration
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("registry", &self.registry)
            .field("config", &"AppConfig")
            .finish()
    }
}
