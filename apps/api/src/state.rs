use std::sync::Arc;

use crate::grid::persist::LayoutStore;
use crate::grid::sessions::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable layout store. Selected at startup: Postgres, remote HTTP
    /// store, or in-memory.
    pub store: Arc<dyn LayoutStore>,
    /// Per-owner layout controller sessions, created lazily on first access.
    pub sessions: Arc<SessionRegistry>,
}
