pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::grid::handlers as dashboard;
use crate::state::AppState;
use crate::store::handlers as layout_store;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Layout store API — the persistence interface, keyed by owner.
        .route(
            "/api/v1/layout-store",
            get(layout_store::handle_load).put(layout_store::handle_save),
        )
        // Dashboard session API — the rendering-surface contract.
        .route(
            "/api/v1/dashboard/config",
            get(dashboard::handle_grid_config),
        )
        .route(
            "/api/v1/dashboard/layout",
            get(dashboard::handle_get_layout).put(dashboard::handle_replace_layout),
        )
        .route(
            "/api/v1/dashboard/layout/reload",
            post(dashboard::handle_reload_layout),
        )
        .route("/api/v1/dashboard/items", post(dashboard::handle_add_item))
        .route(
            "/api/v1/dashboard/items/:key/lock",
            patch(dashboard::handle_set_item_lock),
        )
        .route(
            "/api/v1/dashboard/items/:key/content",
            patch(dashboard::handle_set_item_content),
        )
        .with_state(state)
}
