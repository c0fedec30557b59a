//! HTTP handlers for the layout-store API — the persistence interface served
//! for remote bridges (and for the original client's fetch calls).

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::grid::handlers::UserIdQuery;
use crate::grid::persist::{GridItemRecord, StoredLayout};
use crate::state::AppState;

/// GET /api/v1/layout-store
/// `layout: null` with empty `items` is the valid first-time-user response.
pub async fn handle_load(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<StoredLayout>, AppError> {
    let stored = state.store.load(params.user_id).await?;
    Ok(Json(stored))
}

#[derive(Deserialize)]
pub struct SaveLayoutRequest {
    pub items: Vec<GridItemRecord>,
}

/// PUT /api/v1/layout-store
/// Atomic create-or-update-and-reconcile; echoes the persisted result.
pub async fn handle_save(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<SaveLayoutRequest>,
) -> Result<Json<StoredLayout>, AppError> {
    let stored = state.store.save(params.user_id, &req.items).await?;
    Ok(Json(stored))
}
