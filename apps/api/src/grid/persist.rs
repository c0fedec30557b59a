//! Persistence bridge — translates between the controller's in-memory shape
//! (`Vec<GridItem>` + metadata map) and the store's record shape, and
//! debounces outbound writes.
//!
//! # Debounce discipline
//! Each mutation cancels any pending save task and schedules a new one
//! carrying a snapshot serialized at schedule time. Because every mutation
//! reschedules, the snapshot that survives the quiet window is by definition
//! the latest state. Saves are never retried automatically; a failure lands
//! in the shared last-error slot and the next mutation's save supersedes it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use crate::errors::LayoutError;
use crate::grid::model::{GridItem, ItemContent, ItemType};

// ────────────────────────────────────────────────────────────────────────────
// Wire / storage shapes
// ────────────────────────────────────────────────────────────────────────────

/// One stored grid item: geometry merged with its display metadata.
///
/// `content` stays an opaque JSON value at this layer; it is typed-checked
/// against `item_type` only when a layout is deserialized for the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridItemRecord {
    pub item_key: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub item_type: ItemType,
    pub content: Value,
}

/// Layout row metadata echoed by the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LayoutMeta {
    pub layout_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A full persisted layout. `layout == None` with empty `items` is the valid
/// first-time-user state, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredLayout {
    pub layout: Option<LayoutMeta>,
    pub items: Vec<GridItemRecord>,
}

impl StoredLayout {
    pub fn empty() -> Self {
        Self {
            layout: None,
            items: Vec::new(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Store trait
// ────────────────────────────────────────────────────────────────────────────

/// The external layout store, keyed by owner.
///
/// `save` performs an atomic create-or-update-and-reconcile: records present
/// in the new set are upserted by `item_key`, records absent relative to the
/// previously stored set are deleted, and the persisted result is echoed.
///
/// Carried in `AppState` as `Arc<dyn LayoutStore>`.
#[async_trait]
pub trait LayoutStore: Send + Sync {
    async fn load(&self, user_id: Uuid) -> Result<StoredLayout, LayoutError>;
    async fn save(
        &self,
        user_id: Uuid,
        items: &[GridItemRecord],
    ) -> Result<StoredLayout, LayoutError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Serialization
// ────────────────────────────────────────────────────────────────────────────

/// Emits one record per layout item, merging geometry with metadata.
/// Missing metadata falls back to the empty-note placeholder — never fails.
pub fn serialize_items(
    items: &[GridItem],
    metadata: &HashMap<String, ItemContent>,
) -> Vec<GridItemRecord> {
    items
        .iter()
        .map(|item| {
            let content = metadata.get(&item.key).cloned().unwrap_or_default();
            GridItemRecord {
                item_key: item.key.clone(),
                x: item.x,
                y: item.y,
                w: item.w,
                h: item.h,
                is_static: item.locked,
                item_type: content.item_type(),
                content: content.to_value(),
            }
        })
        .collect()
}

/// Rebuilds the controller's in-memory shape from stored records.
///
/// A record whose `content` blob fails to parse against its `item_type`
/// fails the whole load — no partial-layout recovery.
pub fn deserialize_items(
    records: &[GridItemRecord],
) -> Result<(Vec<GridItem>, HashMap<String, ItemContent>), LayoutError> {
    let mut items = Vec::with_capacity(records.len());
    let mut metadata = HashMap::with_capacity(records.len());

    for record in records {
        if record.w < 1 || record.h < 1 || record.x < 0 || record.y < 0 {
            return Err(LayoutError::LoadFailed(format!(
                "item '{}' has invalid geometry ({}, {}, {}, {})",
                record.item_key, record.x, record.y, record.w, record.h
            )));
        }

        let content = ItemContent::from_value(record.item_type, &record.content).map_err(|e| {
            LayoutError::MalformedContent {
                item_key: record.item_key.clone(),
                reason: e.to_string(),
            }
        })?;

        items.push(GridItem {
            key: record.item_key.clone(),
            x: record.x,
            y: record.y,
            w: record.w,
            h: record.h,
            locked: record.is_static,
        });
        metadata.insert(record.item_key.clone(), content);
    }

    Ok((items, metadata))
}

// ────────────────────────────────────────────────────────────────────────────
// Debounced saver
// ────────────────────────────────────────────────────────────────────────────

/// Cancel-and-reschedule debounce timer owned by the persistence bridge.
///
/// The pending task sleeps for the configured delay and then dispatches a
/// single `save`. Scheduling again before the delay elapses aborts the
/// pending timer, so a burst of mutations produces exactly one outbound save;
/// a save that has already been dispatched is never cancelled.
pub struct DebouncedSaver {
    store: Arc<dyn LayoutStore>,
    user_id: Uuid,
    delay: Duration,
    pending: Option<JoinHandle<()>>,
    last_error: Arc<Mutex<Option<String>>>,
}

impl DebouncedSaver {
    pub fn new(store: Arc<dyn LayoutStore>, user_id: Uuid, delay: Duration) -> Self {
        Self {
            store,
            user_id,
            delay,
            pending: None,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Schedules `records` to be saved after the quiet window. Cancels any
    /// previously pending save.
    pub fn schedule(&mut self, records: Vec<GridItemRecord>) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }

        let store = Arc::clone(&self.store);
        let user_id = self.user_id;
        let delay = self.delay;
        let last_error = Arc::clone(&self.last_error);

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Dispatch the save in its own task: a superseding schedule
            // cancels a pending timer, never an in-flight save. Racing saves
            // are resolved by the store (last write wins).
            tokio::spawn(async move {
                match store.save(user_id, &records).await {
                    Ok(_) => {
                        *last_error.lock().expect("save error slot poisoned") = None;
                    }
                    Err(e) => {
                        // In-memory state is not rolled back: the layout on
                        // screen stays the source of truth while the store is
                        // unavailable.
                        warn!(user_id = %user_id, "Debounced layout save failed: {e}");
                        *last_error.lock().expect("save error slot poisoned") =
                            Some(e.to_string());
                    }
                }
            });
        }));
    }

    /// Message from the most recent failed save, if the most recent save
    /// failed. Cleared by the next successful save.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .expect("save error slot poisoned")
            .clone()
    }
}

impl Drop for DebouncedSaver {
    fn drop(&mut self) {
        // A pending save for an evicted session is abandoned, not flushed:
        // last-save-wins is the only cross-session consistency guarantee.
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_item(key: &str, x: i32, y: i32) -> GridItem {
        GridItem {
            key: key.to_string(),
            x,
            y,
            w: 3,
            h: 4,
            locked: false,
        }
    }

    fn make_record(key: &str) -> GridItemRecord {
        GridItemRecord {
            item_key: key.to_string(),
            x: 0,
            y: 0,
            w: 3,
            h: 4,
            is_static: false,
            item_type: ItemType::Note,
            content: json!({ "note": "hello" }),
        }
    }

    // ── serialize / deserialize ─────────────────────────────────────────────

    #[test]
    fn test_round_trip_preserves_items_and_metadata() {
        let account = Uuid::new_v4();
        let items = vec![make_item("grid-item-0", 0, 0), {
            let mut locked = make_item("grid-item-1", 3, 0);
            locked.locked = true;
            locked
        }];
        let mut metadata = HashMap::new();
        metadata.insert(
            "grid-item-0".to_string(),
            ItemContent::Note {
                note: "todo".to_string(),
            },
        );
        metadata.insert(
            "grid-item-1".to_string(),
            ItemContent::AccountBalance {
                account_id: Some(account),
            },
        );

        let records = serialize_items(&items, &metadata);
        let (restored_items, restored_metadata) = deserialize_items(&records).unwrap();

        assert_eq!(restored_items, items);
        assert_eq!(restored_metadata, metadata);
    }

    #[test]
    fn test_serialize_defaults_missing_metadata_to_note() {
        let items = vec![make_item("grid-item-0", 0, 0)];
        let records = serialize_items(&items, &HashMap::new());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_type, ItemType::Note);
        assert_eq!(records[0].content, json!({ "note": "" }));
    }

    #[test]
    fn test_serialize_maps_locked_to_static() {
        let mut item = make_item("grid-item-0", 0, 0);
        item.locked = true;
        let records = serialize_items(&[item], &HashMap::new());
        assert!(records[0].is_static);
    }

    #[test]
    fn test_malformed_content_fails_the_whole_load() {
        let good = make_record("grid-item-0");
        let mut bad = make_record("grid-item-1");
        bad.item_type = ItemType::AccountBalance;
        bad.content = json!({ "accountId": 42 });

        let result = deserialize_items(&[good, bad]);
        match result {
            Err(LayoutError::MalformedContent { item_key, .. }) => {
                assert_eq!(item_key, "grid-item-1");
            }
            other => panic!("expected MalformedContent, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_geometry_fails_load() {
        let mut record = make_record("grid-item-0");
        record.w = 0;
        assert!(matches!(
            deserialize_items(&[record]),
            Err(LayoutError::LoadFailed(_))
        ));
    }

    #[test]
    fn test_record_wire_field_names() {
        let record = make_record("grid-item-0");
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("itemKey").is_some());
        assert!(value.get("itemType").is_some());
        assert!(value.get("static").is_some());
        assert!(value.get("is_static").is_none());
    }

    // ── debounce ────────────────────────────────────────────────────────────

    struct CountingStore {
        saves: Mutex<Vec<Vec<GridItemRecord>>>,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                saves: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LayoutStore for CountingStore {
        async fn load(&self, _user_id: Uuid) -> Result<StoredLayout, LayoutError> {
            Ok(StoredLayout::empty())
        }

        async fn save(
            &self,
            _user_id: Uuid,
            items: &[GridItemRecord],
        ) -> Result<StoredLayout, LayoutError> {
            self.saves.lock().unwrap().push(items.to_vec());
            Ok(StoredLayout {
                layout: None,
                items: items.to_vec(),
            })
        }
    }

    struct FailingStore;

    #[async_trait]
    impl LayoutStore for FailingStore {
        async fn load(&self, _user_id: Uuid) -> Result<StoredLayout, LayoutError> {
            Err(LayoutError::LoadFailed("store offline".to_string()))
        }

        async fn save(
            &self,
            _user_id: Uuid,
            _items: &[GridItemRecord],
        ) -> Result<StoredLayout, LayoutError> {
            Err(LayoutError::SaveFailed("store offline".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_mutations_coalesce_into_one_save() {
        let store = Arc::new(CountingStore::new());
        let mut saver = DebouncedSaver::new(
            store.clone(),
            Uuid::new_v4(),
            Duration::from_millis(500),
        );

        // Five schedules back-to-back, well inside one debounce window.
        for i in 0..5 {
            saver.schedule(vec![make_record(&format!("grid-item-{i}"))]);
        }

        tokio::time::sleep(Duration::from_millis(600)).await;

        let saves = store.saves.lock().unwrap();
        assert_eq!(saves.len(), 1, "burst must coalesce into exactly one save");
        assert_eq!(saves[0][0].item_key, "grid-item-4", "latest state wins");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_fire_separate_saves() {
        let store = Arc::new(CountingStore::new());
        let mut saver = DebouncedSaver::new(
            store.clone(),
            Uuid::new_v4(),
            Duration::from_millis(500),
        );

        saver.schedule(vec![make_record("grid-item-0")]);
        tokio::time::sleep(Duration::from_millis(600)).await;
        saver.schedule(vec![make_record("grid-item-1")]);
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(store.saves.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_failure_lands_in_last_error_slot() {
        let mut saver = DebouncedSaver::new(
            Arc::new(FailingStore),
            Uuid::new_v4(),
            Duration::from_millis(500),
        );

        saver.schedule(vec![make_record("grid-item-0")]);
        assert_eq!(saver.last_error(), None, "no error before the save fires");

        tokio::time::sleep(Duration::from_millis(600)).await;
        let err = saver.last_error().expect("failed save must be recorded");
        assert!(err.contains("store offline"));
    }
}
