//! Layout Controller — owns one owner's layout plus the per-item metadata
//! map, applies mutations, and schedules debounced persistence.
//!
//! # State machine
//! `Uninitialized → Loading → Ready` on the happy path, `→ Error(message)`
//! on a failed load. `Ready` and `Error` are terminal until an explicit
//! re-invocation of [`LayoutController::load_layout`]. Mutations before load
//! completes operate on the empty layout; persistence failures never
//! propagate past this boundary — they become controller state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::LayoutError;
use crate::grid::geometry::{find_free_slot, has_overlaps, resolve_overlaps};
use crate::grid::model::{GridConfig, GridItem, ItemContent, ItemType};
use crate::grid::persist::{deserialize_items, serialize_items, DebouncedSaver, LayoutStore};

/// Load lifecycle of a controller instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Uninitialized,
    Loading,
    Ready,
    Error(String),
}

impl LoadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadState::Uninitialized => "uninitialized",
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::Error(_) => "error",
        }
    }
}

/// Outcome of a full-layout replacement.
#[derive(Debug, Clone)]
pub struct ReplaceOutcome {
    /// False when the post-resolution safety check still found an overlap
    /// and the previous state was retained.
    pub committed: bool,
    /// Keys dropped by resolution because the grid was full.
    pub dropped: Vec<String>,
}

pub struct LayoutController {
    user_id: Uuid,
    config: GridConfig,
    items: Vec<GridItem>,
    metadata: HashMap<String, ItemContent>,
    /// Mint source for `grid-item-{n}` keys; reseeded from persisted keys on
    /// load so keys are never reused across reloads.
    next_item_id: u64,
    state: LoadState,
    store: Arc<dyn LayoutStore>,
    saver: DebouncedSaver,
}

impl LayoutController {
    pub fn new(
        user_id: Uuid,
        store: Arc<dyn LayoutStore>,
        config: GridConfig,
        debounce: Duration,
    ) -> Self {
        let saver = DebouncedSaver::new(Arc::clone(&store), user_id, debounce);
        Self {
            user_id,
            config,
            items: Vec::new(),
            metadata: HashMap::new(),
            next_item_id: 0,
            state: LoadState::Uninitialized,
            store,
            saver,
        }
    }

    // ── rendering-surface accessors ─────────────────────────────────────────

    pub fn items(&self) -> &[GridItem] {
        &self.items
    }

    pub fn metadata(&self) -> &HashMap<String, ItemContent> {
        &self.metadata
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Message from the most recent failed debounced save, if any.
    pub fn save_error(&self) -> Option<String> {
        self.saver.last_error()
    }

    // ── mutations ───────────────────────────────────────────────────────────

    /// Adds a new unlocked item of the default size at the first free slot.
    ///
    /// On a full grid the layout is left unchanged and `CapacityExceeded` is
    /// returned — a reported condition, not a failure the caller should
    /// escalate past a warning.
    pub fn add_item(&mut self, content: ItemContent) -> Result<String, LayoutError> {
        let slot = find_free_slot(
            &self.items,
            self.config.cols,
            self.config.rows,
            self.config.default_item_w,
            self.config.default_item_h,
        )
        .ok_or(LayoutError::CapacityExceeded)?;

        let key = self.mint_key();
        debug!(user_id = %self.user_id, key = %key, x = slot.x, y = slot.y, "Adding grid item");

        self.items.push(GridItem {
            key: key.clone(),
            x: slot.x,
            y: slot.y,
            w: self.config.default_item_w,
            h: self.config.default_item_h,
            locked: false,
        });
        self.metadata.insert(key.clone(), content);
        self.schedule_save();
        Ok(key)
    }

    /// Flips the `locked` flag of the item matching `key`. Locking never
    /// repositions anything by itself; routing around a newly locked item
    /// only happens on the next full layout-change event.
    ///
    /// Returns false if no item has that key.
    pub fn set_item_lock(&mut self, key: &str, locked: bool) -> bool {
        match self.items.iter_mut().find(|item| item.key == key) {
            Some(item) => {
                item.locked = locked;
                self.schedule_save();
                true
            }
            None => false,
        }
    }

    /// Switches the widget type for `key`, keeping the existing payload when
    /// it already matches and resetting to the type's empty payload when it
    /// does not. Unknown keys get a fresh metadata entry.
    pub fn set_item_type(&mut self, key: &str, item_type: ItemType) {
        let entry = self
            .metadata
            .entry(key.to_string())
            .or_insert_with(ItemContent::default);
        if entry.item_type() != item_type {
            *entry = ItemContent::default_for(item_type);
        }
        self.schedule_save();
    }

    /// Replaces the content payload for `key`, creating the metadata entry if
    /// the key is unknown. Position and size are untouched.
    pub fn set_item_content(&mut self, key: &str, content: ItemContent) {
        self.metadata.insert(key.to_string(), content);
        self.schedule_save();
    }

    /// Accepts a candidate layout (typically the result of a drag or resize
    /// gesture), resolves overlaps, and commits the result.
    ///
    /// The resolved layout is re-verified with an exhaustive pairwise check
    /// before commit; if that check fails the previous state is retained and
    /// the mutation is rejected silently — a correctness guard, not a
    /// user-facing error. Metadata for keys absent from the committed layout
    /// is pruned (omission from a full replacement is how items are removed).
    pub fn replace_layout(&mut self, candidate: Vec<GridItem>) -> ReplaceOutcome {
        let resolution = resolve_overlaps(candidate, self.config.cols, self.config.rows);

        if has_overlaps(&resolution.items) {
            warn!(
                user_id = %self.user_id,
                "Resolved layout still overlaps; retaining previous state"
            );
            return ReplaceOutcome {
                committed: false,
                dropped: Vec::new(),
            };
        }

        if !resolution.dropped.is_empty() {
            warn!(
                user_id = %self.user_id,
                dropped = resolution.dropped.len(),
                "Grid full during layout replacement; dropping items"
            );
        }

        self.items = resolution.items;
        let live: std::collections::HashSet<&str> =
            self.items.iter().map(|item| item.key.as_str()).collect();
        self.metadata.retain(|key, _| live.contains(key.as_str()));
        self.schedule_save();

        ReplaceOutcome {
            committed: true,
            dropped: resolution.dropped,
        }
    }

    // ── load ────────────────────────────────────────────────────────────────

    /// Fetches the persisted layout and replaces the in-memory state.
    ///
    /// On failure the captured message becomes controller state and the
    /// layout remains whatever it was before the failed load (empty on the
    /// first attempt). Concurrent invocations are not deduplicated here; the
    /// session layer calls this once per session plus explicit retries.
    pub async fn load_layout(&mut self) {
        self.state = LoadState::Loading;

        match self.try_load().await {
            Ok(count) => {
                info!(user_id = %self.user_id, items = count, "Dashboard layout loaded");
                self.state = LoadState::Ready;
            }
            Err(e) => {
                warn!(user_id = %self.user_id, "Dashboard layout load failed: {e}");
                self.state = LoadState::Error(e.to_string());
            }
        }
    }

    async fn try_load(&mut self) -> Result<usize, LayoutError> {
        let stored = self.store.load(self.user_id).await?;
        let (items, metadata) = deserialize_items(&stored.items)?;

        self.next_item_id = items
            .iter()
            .filter_map(|item| numeric_suffix(&item.key))
            .max()
            .map(|max| max + 1)
            .unwrap_or(0);
        self.items = items;
        self.metadata = metadata;
        Ok(self.items.len())
    }

    // ── internals ───────────────────────────────────────────────────────────

    fn mint_key(&mut self) -> String {
        let key = format!("grid-item-{}", self.next_item_id);
        self.next_item_id += 1;
        key
    }

    fn schedule_save(&mut self) {
        let records = serialize_items(&self.items, &self.metadata);
        self.saver.schedule(records);
    }
}

/// Parses the `n` out of a `grid-item-{n}` key. Foreign key shapes yield
/// `None` and do not participate in counter reseeding.
fn numeric_suffix(key: &str) -> Option<u64> {
    key.strip_prefix("grid-item-")?.parse().ok()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
