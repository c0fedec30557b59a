// Dashboard grid layout engine.
// Geometry is pure; the controller owns all layout state; persistence goes
// through the LayoutStore trait with a debounced writer.

pub mod controller;
pub mod geometry;
pub mod handlers;
pub mod model;
pub mod persist;
pub mod sessions;

// Re-export the public API consumed by other modules (stores, handlers, main).
pub use controller::{LayoutController, LoadState};
pub use model::{GridConfig, GridItem, ItemContent, ItemType};
pub use persist::{GridItemRecord, LayoutStore, StoredLayout};

/// Number of columns on the dashboard grid.
pub const GRID_COLS: i32 = 12;
/// Number of rows on the dashboard grid.
pub const GRID_ROWS: i32 = 60;
/// Pixels per row — rendering hint only, never used for placement.
pub const ROW_HEIGHT: u32 = 20;
/// Default size (in cells) for newly added items.
pub const DEFAULT_ITEM_WIDTH: i32 = 3;
pub const DEFAULT_ITEM_HEIGHT: i32 = 4;
/// Quiet window after the last mutation before the coalesced save fires.
pub const SAVE_DEBOUNCE_MS: u64 = 500;
