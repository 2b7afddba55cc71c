//! Bounded FIFO cache of full layout snapshots.
//!
//! A drag-resize produces a burst of layout calls that converge on a
//! handful of `(width, columns, item count)` shapes; caching whole
//! snapshots means a repeated shape skips both re-probing and
//! re-packing. Eviction is strict insertion order — the oldest inserted
//! key goes first, regardless of how recently it was hit.

use std::collections::{HashMap, VecDeque};

use crate::model::Position;

/// Number of distinct layout shapes kept before the oldest is evicted.
pub const CACHE_CAPACITY: usize = 10;

/// Cache key: the three inputs that fully determine a layout shape.
/// Item identity is deliberately not part of the key — an identical
/// shape restores the cached placements verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutKey {
    width_bits: u64,
    columns: usize,
    item_count: usize,
}

impl LayoutKey {
    pub fn new(container_width: f64, columns: usize, item_count: usize) -> Self {
        Self {
            width_bits: container_width.to_bits(),
            columns,
            item_count,
        }
    }
}

/// One cached layout pass: every position plus the resulting height.
#[derive(Debug, Clone)]
pub struct LayoutSnapshot {
    pub positions: HashMap<String, Position>,
    pub container_height: f64,
}

#[derive(Default)]
pub struct LayoutCache {
    entries: HashMap<LayoutKey, LayoutSnapshot>,
    insertion_order: VecDeque<LayoutKey>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &LayoutKey) -> Option<&LayoutSnapshot> {
        self.entries.get(key)
    }

    /// Insert a snapshot, evicting the oldest inserted key once the
    /// capacity is exceeded. Re-inserting an existing key replaces the
    /// snapshot but keeps the key's original place in line.
    pub fn insert(&mut self, key: LayoutKey, snapshot: LayoutSnapshot) {
        if self.entries.insert(key, snapshot).is_none() {
            self.insertion_order.push_back(key);
        }
        while self.entries.len() > CACHE_CAPACITY {
            match self.insertion_order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.insertion_order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
