//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use apa_core::CancellationSignal;

use crate::config::Config;
use crate::provider::ChatProvider;

/// State shared across all HTTP handlers.
///
/// Nothing in here is mutated per request; each chat request carries its
/// own full context.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Upstream chat-completion provider.
    pub provider: Arc<dyn ChatProvider>,
    /// Tripped on shutdown so in-flight provider calls stop waiting.
    pub shutdown: CancellationSignal,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            shutdown: apa_core::cancel::new_signal(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("shutdown", &apa_core::cancel::is_cancelled(Some(&self.shutdown)))
            .finish_non_exhaustive()
    }
}
