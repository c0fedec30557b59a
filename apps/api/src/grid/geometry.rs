//! Stateless spatial reasoning over placed grid items.
//!
//! # Placement rules
//! - Collision uses the half-open interval rule: rectangles that only share
//!   an edge do not collide.
//! - Free-slot search scans row-major (top-to-bottom, left-to-right) and
//!   returns the first fit. The scan order is a contract — callers and tests
//!   rely on "first free slot in reading order".
//! - Overlap resolution keeps locked items in place, repositions unlocked
//!   ones in sequence order, and drops items that no longer fit anywhere.

use tracing::warn;

use crate::grid::model::GridItem;

// ────────────────────────────────────────────────────────────────────────────
// Collision
// ────────────────────────────────────────────────────────────────────────────

/// True iff the interiors of `a` and the candidate rectangle `(bx, by, bw, bh)`
/// overlap.
pub fn collides(a: &GridItem, bx: i32, by: i32, bw: i32, bh: i32) -> bool {
    a.x < bx + bw && a.x + a.w > bx && a.y < by + bh && a.y + a.h > by
}

/// Exhaustive pairwise overlap check. Used by the controller as a commit
/// safety net after resolution.
pub fn has_overlaps(items: &[GridItem]) -> bool {
    for (i, a) in items.iter().enumerate() {
        for b in items.iter().skip(i + 1) {
            if collides(a, b.x, b.y, b.w, b.h) {
                return true;
            }
        }
    }
    false
}

// ────────────────────────────────────────────────────────────────────────────
// Free-slot search
// ────────────────────────────────────────────────────────────────────────────

/// A candidate position returned by [`find_free_slot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub x: i32,
    pub y: i32,
}

/// First position (reading order) where a `w × h` rectangle fits without
/// colliding with any of `items`. `None` means the grid is full for this size.
pub fn find_free_slot(items: &[GridItem], cols: i32, rows: i32, w: i32, h: i32) -> Option<Slot> {
    for y in 0..=(rows - h) {
        for x in 0..=(cols - w) {
            let blocked = items.iter().any(|item| collides(item, x, y, w, h));
            if !blocked {
                return Some(Slot { x, y });
            }
        }
    }
    None
}

// ────────────────────────────────────────────────────────────────────────────
// Overlap resolution
// ────────────────────────────────────────────────────────────────────────────

/// Result of [`resolve_overlaps`]: a non-overlapping layout plus the keys of
/// any items that had to be dropped because no free slot remained.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub items: Vec<GridItem>,
    pub dropped: Vec<String>,
}

/// Produces a non-overlapping, in-bounds layout from an arbitrary candidate.
///
/// Locked items are placed first, at their proposed positions, in sequence
/// order. A later locked item that collides with an already-placed locked
/// item (or falls out of bounds) is invalid input: it is logged and routed
/// through the unlocked repositioning path for this pass, keeping its
/// `locked` flag. Originally-unlocked items follow in sequence order; each
/// one keeps its proposed position unless it collides or leaves the grid, in
/// which case it moves to the first free slot of the same size. Items with no
/// remaining slot are dropped and reported, never a panic.
///
/// The procedure is deterministic and idempotent for any input sequence, and
/// the output preserves the candidate's insertion order (placement happens on
/// a working set; the result is rebuilt in input order minus dropped keys).
pub fn resolve_overlaps(candidate: Vec<GridItem>, cols: i32, rows: i32) -> Resolution {
    let mut placed: Vec<GridItem> = Vec::with_capacity(candidate.len());
    let mut deferred: Vec<GridItem> = Vec::new();

    // Pass 1: locked items keep their positions unconditionally, first-seen
    // wins a locked/locked dispute.
    for item in &candidate {
        if !item.locked {
            continue;
        }
        let conflict = !item.in_bounds(cols, rows)
            || placed.iter().any(|p| collides(p, item.x, item.y, item.w, item.h));
        if conflict {
            warn!(
                key = %item.key,
                x = item.x,
                y = item.y,
                "Locked item conflicts with an earlier locked item; repositioning"
            );
            deferred.push(item.clone());
        } else {
            placed.push(item.clone());
        }
    }

    // Pass 2: remaining items — demoted locked items first (they entered the
    // working set earlier), then originally-unlocked items in sequence order.
    let mut dropped: Vec<String> = Vec::new();
    let unlocked = candidate.iter().filter(|item| !item.locked).cloned();

    for mut item in deferred.into_iter().chain(unlocked) {
        let conflict = !item.in_bounds(cols, rows)
            || placed.iter().any(|p| collides(p, item.x, item.y, item.w, item.h));
        if conflict {
            match find_free_slot(&placed, cols, rows, item.w, item.h) {
                Some(slot) => {
                    item.x = slot.x;
                    item.y = slot.y;
                    placed.push(item);
                }
                None => {
                    // Grid is full for this size: accepted data loss, surfaced
                    // to the caller as a capacity condition.
                    dropped.push(item.key);
                }
            }
        } else {
            placed.push(item);
        }
    }

    // Rebuild in the candidate's insertion order.
    let items = candidate
        .iter()
        .filter_map(|original| {
            placed
                .iter()
                .find(|p| p.key == original.key)
                .cloned()
        })
        .collect();

    Resolution { items, dropped }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
