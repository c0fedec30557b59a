//! Core data model for the dashboard grid.
//!
//! A `GridItem` is pure geometry (position, size, lock flag). What an item
//! *displays* — its `ItemContent` — is kept in a separate per-key map so
//! position updates never resend content and content updates never resend
//! geometry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::grid::{DEFAULT_ITEM_HEIGHT, DEFAULT_ITEM_WIDTH, GRID_COLS, GRID_ROWS};

// ────────────────────────────────────────────────────────────────────────────
// Grid geometry
// ────────────────────────────────────────────────────────────────────────────

/// A rectangle placed on the grid. Coordinates and dimensions are integer
/// cell units; `(x, y)` is the top-left corner.
///
/// `locked` items are never moved by automatic conflict resolution — other
/// items must route around them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridItem {
    pub key: String,
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    #[serde(default)]
    pub locked: bool,
}

impl GridItem {
    /// True iff this item's rectangle lies fully inside a `cols × rows` grid.
    pub fn in_bounds(&self, cols: i32, rows: i32) -> bool {
        self.x >= 0 && self.y >= 0 && self.x + self.w <= cols && self.y + self.h <= rows
    }
}

/// Grid dimensions plus the default size for newly added items.
///
/// Production always uses `GridConfig::default()`; tests shrink the grid to
/// exercise saturation and placement edge cases.
#[derive(Debug, Clone, Copy)]
pub struct GridConfig {
    pub cols: i32,
    pub rows: i32,
    pub default_item_w: i32,
    pub default_item_h: i32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: GRID_COLS,
            rows: GRID_ROWS,
            default_item_w: DEFAULT_ITEM_WIDTH,
            default_item_h: DEFAULT_ITEM_HEIGHT,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Item content
// ────────────────────────────────────────────────────────────────────────────

/// Which content renderer/schema applies to a grid item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    AccountBalance,
    TransactionList,
    Note,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::AccountBalance => "account_balance",
            ItemType::TransactionList => "transaction_list",
            ItemType::Note => "note",
        }
    }

    /// Parses the stored wire name. `None` for anything outside the enum —
    /// the storage layer treats that as a malformed record.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "account_balance" => Some(ItemType::AccountBalance),
            "transaction_list" => Some(ItemType::TransactionList),
            "note" => Some(ItemType::Note),
            _ => None,
        }
    }
}

/// Typed content payload for a grid item — a reference/configuration object,
/// not materialized financial data.
///
/// The wire format carries `item_type` and `content` as separate fields, so
/// this union is (de)serialized through [`ItemContent::from_value`] and
/// [`ItemContent::to_value`] rather than serde's own tagging. Account
/// references are optional: a freshly retyped widget has no account selected
/// yet.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemContent {
    Note {
        note: String,
    },
    AccountBalance {
        account_id: Option<Uuid>,
    },
    TransactionList {
        account_id: Option<Uuid>,
        limit: Option<u32>,
    },
}

impl Default for ItemContent {
    /// The placeholder used whenever metadata is missing: an empty note.
    fn default() -> Self {
        ItemContent::Note {
            note: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct NoteFields {
    #[serde(default)]
    note: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountBalanceFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionListFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    account_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

impl ItemContent {
    pub fn item_type(&self) -> ItemType {
        match self {
            ItemContent::Note { .. } => ItemType::Note,
            ItemContent::AccountBalance { .. } => ItemType::AccountBalance,
            ItemContent::TransactionList { .. } => ItemType::TransactionList,
        }
    }

    /// Empty content of the given type — used when a widget is retyped and
    /// its old payload no longer matches the new schema.
    pub fn default_for(item_type: ItemType) -> Self {
        match item_type {
            ItemType::Note => ItemContent::Note {
                note: String::new(),
            },
            ItemType::AccountBalance => ItemContent::AccountBalance { account_id: None },
            ItemType::TransactionList => ItemContent::TransactionList {
                account_id: None,
                limit: None,
            },
        }
    }

    /// Parses a raw content value against the schema selected by `item_type`.
    /// Unknown fields are rejected only by shape mismatch, not by presence.
    pub fn from_value(item_type: ItemType, value: &Value) -> Result<Self, serde_json::Error> {
        match item_type {
            ItemType::Note => {
                let fields: NoteFields = serde_json::from_value(value.clone())?;
                Ok(ItemContent::Note { note: fields.note })
            }
            ItemType::AccountBalance => {
                let fields: AccountBalanceFields = serde_json::from_value(value.clone())?;
                Ok(ItemContent::AccountBalance {
                    account_id: fields.account_id,
                })
            }
            ItemType::TransactionList => {
                let fields: TransactionListFields = serde_json::from_value(value.clone())?;
                Ok(ItemContent::TransactionList {
                    account_id: fields.account_id,
                    limit: fields.limit,
                })
            }
        }
    }

    /// Serializes the payload half of the wire pair (`item_type` travels
    /// separately).
    pub fn to_value(&self) -> Value {
        match self {
            ItemContent::Note { note } => {
                serde_json::to_value(NoteFields { note: note.clone() })
            }
            ItemContent::AccountBalance { account_id } => {
                serde_json::to_value(AccountBalanceFields {
                    account_id: *account_id,
                })
            }
            ItemContent::TransactionList { account_id, limit } => {
                serde_json::to_value(TransactionListFields {
                    account_id: *account_id,
                    limit: *limit,
                })
            }
        }
        .expect("content payloads serialize infallibly")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_bounds_accepts_edge_touching_rect() {
        let item = GridItem {
            key: "grid-item-0".to_string(),
            x: 10,
            y: 56,
            w: 2,
            h: 4,
            locked: false,
        };
        assert!(item.in_bounds(12, 60));
    }

    #[test]
    fn test_in_bounds_rejects_overflow_and_negative() {
        let mut item = GridItem {
            key: "grid-item-0".to_string(),
            x: 11,
            y: 0,
            w: 2,
            h: 2,
            locked: false,
        };
        assert!(!item.in_bounds(12, 60), "x + w exceeds cols");

        item.x = -1;
        item.w = 2;
        assert!(!item.in_bounds(12, 60), "negative x");
    }

    #[test]
    fn test_item_type_wire_names_are_snake_case() {
        assert_eq!(
            serde_json::to_value(ItemType::AccountBalance).unwrap(),
            json!("account_balance")
        );
        assert_eq!(
            serde_json::to_value(ItemType::TransactionList).unwrap(),
            json!("transaction_list")
        );
        assert_eq!(serde_json::to_value(ItemType::Note).unwrap(), json!("note"));
    }

    #[test]
    fn test_content_from_empty_object_is_valid_for_every_type() {
        // Default metadata is `{}` — must parse for all three schemas.
        for ty in [
            ItemType::Note,
            ItemType::AccountBalance,
            ItemType::TransactionList,
        ] {
            let content = ItemContent::from_value(ty, &json!({})).unwrap();
            assert_eq!(content.item_type(), ty);
        }
    }

    #[test]
    fn test_content_round_trips_through_wire_value() {
        let account = Uuid::new_v4();
        let original = ItemContent::TransactionList {
            account_id: Some(account),
            limit: Some(25),
        };
        let value = original.to_value();
        assert_eq!(value["accountId"], json!(account.to_string()));
        assert_eq!(value["limit"], json!(25));

        let parsed = ItemContent::from_value(ItemType::TransactionList, &value).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_content_rejects_shape_mismatch() {
        // A note blob where an account_balance payload is expected.
        let result = ItemContent::from_value(
            ItemType::AccountBalance,
            &json!({ "accountId": "not-a-uuid" }),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_default_content_is_empty_note() {
        assert_eq!(
            ItemContent::default(),
            ItemContent::Note {
                note: String::new()
            }
        );
    }
}
