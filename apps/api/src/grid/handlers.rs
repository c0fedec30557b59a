//! HTTP handlers for the dashboard session API — the rendering-surface
//! contract. Each route corresponds to one renderer gesture: layout change,
//! add, lock toggle, content edit.

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::grid::controller::LayoutController;
use crate::grid::model::{GridItem, ItemContent, ItemType};
use crate::grid::{
    DEFAULT_ITEM_HEIGHT, DEFAULT_ITEM_WIDTH, GRID_COLS, GRID_ROWS, ROW_HEIGHT,
};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// View types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataView {
    pub item_type: ItemType,
    pub content: Value,
}

/// Snapshot of a controller for the renderer: load state, both error
/// channels, geometry, and the key → metadata lookup.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
    pub items: Vec<GridItem>,
    pub metadata: HashMap<String, MetadataView>,
}

impl SessionView {
    fn from_controller(ctrl: &LayoutController) -> Self {
        let error = match ctrl.state() {
            crate::grid::controller::LoadState::Error(msg) => Some(msg.clone()),
            _ => None,
        };
        let metadata = ctrl
            .metadata()
            .iter()
            .map(|(key, content)| {
                (
                    key.clone(),
                    MetadataView {
                        item_type: content.item_type(),
                        content: content.to_value(),
                    },
                )
            })
            .collect();

        Self {
            state: ctrl.state().as_str(),
            error,
            save_error: ctrl.save_error(),
            items: ctrl.items().to_vec(),
            metadata,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GET /api/v1/dashboard/config
// ────────────────────────────────────────────────────────────────────────────

/// Fixed grid geometry for the renderer. Not user-configurable at runtime;
/// `rowHeight` is a rendering hint and never participates in placement.
pub async fn handle_grid_config() -> Json<Value> {
    Json(json!({
        "cols": GRID_COLS,
        "rows": GRID_ROWS,
        "rowHeight": ROW_HEIGHT,
        "defaultItemWidth": DEFAULT_ITEM_WIDTH,
        "defaultItemHeight": DEFAULT_ITEM_HEIGHT,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// GET /api/v1/dashboard/layout
// ────────────────────────────────────────────────────────────────────────────

pub async fn handle_get_layout(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SessionView>, AppError> {
    let controller = state.sessions.get_or_create(params.user_id).await;
    let ctrl = controller.lock().await;
    Ok(Json(SessionView::from_controller(&ctrl)))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /api/v1/dashboard/layout/reload
// ────────────────────────────────────────────────────────────────────────────

/// Explicit retry: the only transition out of the `error` state.
pub async fn handle_reload_layout(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<SessionView>, AppError> {
    let controller = state.sessions.get_or_create(params.user_id).await;
    let mut ctrl = controller.lock().await;
    ctrl.load_layout().await;
    Ok(Json(SessionView::from_controller(&ctrl)))
}

// ────────────────────────────────────────────────────────────────────────────
// PUT /api/v1/dashboard/layout
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReplaceLayoutRequest {
    /// Candidate layout from a drag/resize gesture, in sequence order.
    pub items: Vec<GridItem>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceLayoutResponse {
    pub committed: bool,
    /// Keys dropped because the grid was full — surfaced so the renderer can
    /// tell the user, since the drop is otherwise silent data loss.
    pub dropped: Vec<String>,
    pub items: Vec<GridItem>,
}

pub async fn handle_replace_layout(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<ReplaceLayoutRequest>,
) -> Result<Json<ReplaceLayoutResponse>, AppError> {
    let controller = state.sessions.get_or_create(params.user_id).await;
    let mut ctrl = controller.lock().await;
    let outcome = ctrl.replace_layout(req.items);
    Ok(Json(ReplaceLayoutResponse {
        committed: outcome.committed,
        dropped: outcome.dropped,
        items: ctrl.items().to_vec(),
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /api/v1/dashboard/items
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[serde(default)]
    pub item_type: Option<ItemType>,
    #[serde(default)]
    pub content: Option<Value>,
}

pub async fn handle_add_item(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let item_type = req.item_type.unwrap_or(ItemType::Note);
    let content = match req.content {
        Some(raw) => ItemContent::from_value(item_type, &raw)
            .map_err(|e| AppError::Validation(format!("content does not match item type: {e}")))?,
        None => ItemContent::default_for(item_type),
    };

    let controller = state.sessions.get_or_create(params.user_id).await;
    let mut ctrl = controller.lock().await;
    let key = ctrl.add_item(content)?;
    let item = ctrl
        .items()
        .iter()
        .find(|item| item.key == key)
        .cloned()
        .expect("added item is present");

    Ok((StatusCode::CREATED, Json(json!({ "key": key, "item": item }))))
}

// ────────────────────────────────────────────────────────────────────────────
// PATCH /api/v1/dashboard/items/:key/lock
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LockRequest {
    pub locked: bool,
}

pub async fn handle_set_item_lock(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<LockRequest>,
) -> Result<StatusCode, AppError> {
    let controller = state.sessions.get_or_create(params.user_id).await;
    let mut ctrl = controller.lock().await;
    if !ctrl.set_item_lock(&key, req.locked) {
        return Err(AppError::NotFound(format!("Grid item '{key}' not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ────────────────────────────────────────────────────────────────────────────
// PATCH /api/v1/dashboard/items/:key/content
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    pub item_type: ItemType,
    #[serde(default)]
    pub content: Option<Value>,
}

/// Retype and/or re-content a widget. With no `content` payload this is a
/// pure type switch; with one, the payload is validated against the type.
pub async fn handle_set_item_content(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<UserIdQuery>,
    Json(req): Json<ContentRequest>,
) -> Result<StatusCode, AppError> {
    let controller = state.sessions.get_or_create(params.user_id).await;
    let mut ctrl = controller.lock().await;

    match req.content {
        Some(raw) => {
            let content = ItemContent::from_value(req.item_type, &raw).map_err(|e| {
                AppError::Validation(format!("content does not match item type: {e}"))
            })?;
            ctrl.set_item_content(&key, content);
        }
        None => ctrl.set_item_type(&key, req.item_type),
    }
    Ok(StatusCode::NO_CONTENT)
}
