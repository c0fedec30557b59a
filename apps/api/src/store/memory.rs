//! In-memory layout store — development default and test double.
//!
//! Full reconcile semantics: a `save` replaces the owner's stored item set
//! wholesale, which is exactly "upsert present, delete absent" for a store
//! that holds the set as one value.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::LayoutError;
use crate::grid::persist::{GridItemRecord, LayoutMeta, LayoutStore, StoredLayout};

#[derive(Default)]
pub struct InMemoryLayoutStore {
    layouts: Mutex<HashMap<Uuid, (LayoutMeta, Vec<GridItemRecord>)>>,
}

impl InMemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LayoutStore for InMemoryLayoutStore {
    async fn load(&self, user_id: Uuid) -> Result<StoredLayout, LayoutError> {
        let layouts = self.layouts.lock().expect("layout map poisoned");
        Ok(match layouts.get(&user_id) {
            Some((meta, items)) => StoredLayout {
                layout: Some(meta.clone()),
                items: items.clone(),
            },
            None => StoredLayout::empty(),
        })
    }

    async fn save(
        &self,
        user_id: Uuid,
        items: &[GridItemRecord],
    ) -> Result<StoredLayout, LayoutError> {
        let mut layouts = self.layouts.lock().expect("layout map poisoned");
        let now = Utc::now();

        let entry = layouts.entry(user_id).or_insert_with(|| {
            (
                LayoutMeta {
                    layout_id: Uuid::new_v4(),
                    user_id,
                    created_at: now,
                    updated_at: now,
                },
                Vec::new(),
            )
        });
        entry.0.updated_at = now;
        entry.1 = items.to_vec();

        Ok(StoredLayout {
            layout: Some(entry.0.clone()),
            items: entry.1.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::model::ItemType;
    use serde_json::json;

    fn make_record(key: &str) -> GridItemRecord {
        GridItemRecord {
            item_key: key.to_string(),
            x: 0,
            y: 0,
            w: 3,
            h: 4,
            is_static: false,
            item_type: ItemType::Note,
            content: json!({ "note": "" }),
        }
    }

    #[tokio::test]
    async fn test_load_before_any_save_is_first_time_state() {
        let store = InMemoryLayoutStore::new();
        let stored = store.load(Uuid::new_v4()).await.unwrap();
        assert!(stored.layout.is_none());
        assert!(stored.items.is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_then_updates_layout_row() {
        let store = InMemoryLayoutStore::new();
        let owner = Uuid::new_v4();

        let first = store.save(owner, &[make_record("grid-item-0")]).await.unwrap();
        let meta = first.layout.unwrap();
        assert_eq!(meta.user_id, owner);

        let second = store
            .save(owner, &[make_record("grid-item-0"), make_record("grid-item-1")])
            .await
            .unwrap();
        assert_eq!(second.layout.unwrap().layout_id, meta.layout_id);
        assert_eq!(second.items.len(), 2);
    }

    #[tokio::test]
    async fn test_save_reconciles_by_omission() {
        let store = InMemoryLayoutStore::new();
        let owner = Uuid::new_v4();

        store
            .save(owner, &[make_record("grid-item-0"), make_record("grid-item-1")])
            .await
            .unwrap();
        store.save(owner, &[make_record("grid-item-1")]).await.unwrap();

        let stored = store.load(owner).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert_eq!(stored.items[0].item_key, "grid-item-1");
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let store = InMemoryLayoutStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store.save(alice, &[make_record("grid-item-0")]).await.unwrap();

        let bobs = store.load(bob).await.unwrap();
        assert!(bobs.items.is_empty());
    }
}
