//! Application state management

use std::sync::Arc;

use crate::extraction::Orchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            inner: Arc::new(AppStateInner { orchestrator }),
        }
    }

    /// Get the extraction orchestrator
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner.orchestrator
    }
}
