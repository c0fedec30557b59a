//! PostgreSQL layout store.
//!
//! `save` runs one transaction per call: find-or-create the owner's layout
//! row (touching `updated_at`), delete stored items absent from the new set,
//! upsert the rest matched by `item_key`, then echo the persisted result.
//! `content` is stored as a JSON-serialized TEXT column and parsed on read.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::LayoutError;
use crate::grid::model::ItemType;
use crate::grid::persist::{GridItemRecord, LayoutMeta, LayoutStore, StoredLayout};

pub struct PgLayoutStore {
    pool: PgPool,
}

impl PgLayoutStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a fresh pool and wraps it. Fails fast at startup if the
    /// database is unreachable.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        info!("PostgreSQL connection pool established");
        Ok(Self::new(pool))
    }
}

/// Raw item row; `content` and `item_type` stay strings until decode.
#[derive(FromRow)]
struct GridItemRow {
    item_key: String,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    #[sqlx(rename = "static")]
    is_static: bool,
    item_type: String,
    content: String,
}

impl GridItemRow {
    fn decode(self) -> Result<GridItemRecord, LayoutError> {
        let item_type = ItemType::from_wire(&self.item_type).ok_or_else(|| {
            LayoutError::MalformedContent {
                item_key: self.item_key.clone(),
                reason: format!("unknown item type '{}'", self.item_type),
            }
        })?;
        let content = serde_json::from_str(&self.content).map_err(|e| {
            LayoutError::MalformedContent {
                item_key: self.item_key.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(GridItemRecord {
            item_key: self.item_key,
            x: self.x,
            y: self.y,
            w: self.w,
            h: self.h,
            is_static: self.is_static,
            item_type,
            content,
        })
    }
}

const SELECT_LAYOUT: &str =
    "SELECT layout_id, user_id, created_at, updated_at FROM dashboard_layouts WHERE user_id = $1";

const SELECT_ITEMS: &str = r#"
    SELECT item_key, x, y, w, h, "static", item_type, content
    FROM dashboard_grid_items
    WHERE layout_id = $1
    ORDER BY created_at, item_key
"#;

#[async_trait]
impl LayoutStore for PgLayoutStore {
    async fn load(&self, user_id: Uuid) -> Result<StoredLayout, LayoutError> {
        let layout: Option<LayoutMeta> = sqlx::query_as(SELECT_LAYOUT)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LayoutError::LoadFailed(e.to_string()))?;

        let Some(layout) = layout else {
            // First-time user: no layout row yet.
            return Ok(StoredLayout::empty());
        };

        let rows: Vec<GridItemRow> = sqlx::query_as(SELECT_ITEMS)
            .bind(layout.layout_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| LayoutError::LoadFailed(e.to_string()))?;

        let items = rows
            .into_iter()
            .map(GridItemRow::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoredLayout {
            layout: Some(layout),
            items,
        })
    }

    async fn save(
        &self,
        user_id: Uuid,
        items: &[GridItemRecord],
    ) -> Result<StoredLayout, LayoutError> {
        let save_err = |e: sqlx::Error| LayoutError::SaveFailed(e.to_string());

        let mut tx = self.pool.begin().await.map_err(save_err)?;

        // Find-or-create the layout row, touching updated_at either way.
        let existing: Option<LayoutMeta> = sqlx::query_as(SELECT_LAYOUT)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(save_err)?;

        let layout: LayoutMeta = match existing {
            Some(layout) => sqlx::query_as(
                "UPDATE dashboard_layouts SET updated_at = NOW() WHERE layout_id = $1 \
                 RETURNING layout_id, user_id, created_at, updated_at",
            )
            .bind(layout.layout_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(save_err)?,
            None => sqlx::query_as(
                "INSERT INTO dashboard_layouts (user_id) VALUES ($1) \
                 RETURNING layout_id, user_id, created_at, updated_at",
            )
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(save_err)?,
        };

        // Delete items omitted from the new set.
        let new_keys: Vec<String> = items.iter().map(|i| i.item_key.clone()).collect();
        sqlx::query(
            "DELETE FROM dashboard_grid_items WHERE layout_id = $1 AND item_key <> ALL($2)",
        )
        .bind(layout.layout_id)
        .bind(&new_keys)
        .execute(&mut *tx)
        .await
        .map_err(save_err)?;

        // Upsert the rest, matched by (layout_id, item_key).
        for item in items {
            let content = serde_json::to_string(&item.content)
                .map_err(|e| LayoutError::SaveFailed(e.to_string()))?;
            sqlx::query(
                r#"
                INSERT INTO dashboard_grid_items
                    (layout_id, item_key, x, y, w, h, "static", item_type, content)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ON CONFLICT (layout_id, item_key) DO UPDATE SET
                    x = EXCLUDED.x,
                    y = EXCLUDED.y,
                    w = EXCLUDED.w,
                    h = EXCLUDED.h,
                    "static" = EXCLUDED."static",
                    item_type = EXCLUDED.item_type,
                    content = EXCLUDED.content,
                    updated_at = NOW()
                "#,
            )
            .bind(layout.layout_id)
            .bind(&item.item_key)
            .bind(item.x)
            .bind(item.y)
            .bind(item.w)
            .bind(item.h)
            .bind(item.is_static)
            .bind(item.item_type.as_str())
            .bind(content)
            .execute(&mut *tx)
            .await
            .map_err(save_err)?;
        }

        // Echo the persisted result from inside the transaction.
        let rows: Vec<GridItemRow> = sqlx::query_as(SELECT_ITEMS)
            .bind(layout.layout_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(save_err)?;

        tx.commit().await.map_err(save_err)?;

        let items = rows
            .into_iter()
            .map(GridItemRow::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoredLayout {
            layout: Some(layout),
            items,
        })
    }
}
