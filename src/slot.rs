//! Id ↔ slot mapping with LIFO free-list reuse.
//!
//! Grounded on the teacher's page-internal free-node list (`src/page.rs`,
//! `alloc_node`/`free_node`: `self.free` as the head of a linked LIFO stack
//! of reusable node slots) — the same LIFO-reuse idea lifted from
//! intra-page node slots to whole-file row slots, backed by a plain `Vec`
//! since slot bookkeeping lives in memory, not on disk.

use rustc_hash::FxHashMap;

/// Bookkeeping statistics for a `SlotManager`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotStats {
    pub active_count: usize,
    pub free_count: usize,
    pub total_count: u64,
}

/// Maps record ids to integer slot indices and tracks which slots are free
/// for reuse. A slot's file offset is `slot * row_size` (the row size
/// itself is a `Table`-level concern, not this component's).
#[derive(Default)]
pub struct SlotManager {
    id_to_slot: FxHashMap<String, u64>,
    free_slots: Vec<u64>,
    next_slot: u64,
}

impl SlotManager {
    pub fn new() -> Self {
        SlotManager::default()
    }

    /// Allocate a slot for `id`: reuse the most recently freed slot if any
    /// exist, else grow by one. Allocating an id that is already mapped
    /// allocates a **new** slot and overwrites the mapping — callers must
    /// not double-allocate for the same logical record.
    pub fn allocate(&mut self, id: impl Into<String>) -> u64 {
        let slot = self.free_slots.pop().unwrap_or_else(|| {
            let s = self.next_slot;
            self.next_slot += 1;
            s
        });
        self.id_to_slot.insert(id.into(), slot);
        slot
    }

    /// Remove `id`'s mapping and push its slot onto the free list. Returns
    /// `false` if `id` was not active.
    pub fn deallocate(&mut self, id: &str) -> bool {
        if let Some(slot) = self.id_to_slot.remove(id) {
            self.free_slots.push(slot);
            true
        } else {
            false
        }
    }

    pub fn slot_of(&self, id: &str) -> Option<u64> {
        self.id_to_slot.get(id).copied()
    }

    pub fn active_ids(&self) -> impl Iterator<Item = &String> {
        self.id_to_slot.keys()
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            active_count: self.id_to_slot.len(),
            free_count: self.free_slots.len(),
            total_count: self.next_slot,
        }
    }

    pub fn active_count(&self) -> usize {
        self.id_to_slot.len()
    }

    /// Rebuild state from a linear scan: called when a table is opened.
    /// `active` lists (id, slot) pairs for blocks whose status was Active;
    /// `reusable` lists slots whose status was Deleted (tombstones are
    /// immediately reusable) or Empty past the allocated high-water mark.
    pub fn rebuild(
        &mut self,
        active: impl IntoIterator<Item = (String, u64)>,
        reusable: impl IntoIterator<Item = u64>,
        total_slots: u64,
    ) {
        self.id_to_slot.clear();
        self.free_slots.clear();
        for (id, slot) in active {
            self.id_to_slot.insert(id, slot);
        }
        // Preserve LIFO semantics: slots discovered earlier in the file
        // should be reused last, so push in ascending order and let pop()
        // take the highest slot first — close enough to "last tombstoned,
        // first reused" for a cold rebuild where there is no real insertion
        // order to recover.
        let mut free: Vec<u64> = reusable.into_iter().collect();
        free.sort_unstable();
        self.free_slots = free;
        self.next_slot = total_slots;
    }
}
