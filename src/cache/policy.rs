//! Victim selection strategies

use super::CacheEntry;

/// Chooses which slot a cache miss overwrites
pub trait EvictionPolicy: Send {
    /// Pick a slot index in `0..entries.len()`
    fn select_victim(&mut self, entries: &[CacheEntry]) -> usize;

    /// A lookup hit `slot`
    fn on_access(&mut self, _slot: usize) {}

    /// `slot` was just filled from the device
    fn on_fill(&mut self, slot: usize) {
        self.on_access(slot);
    }
}

/// Always evicts the same slot
///
/// The cache effectively holds one block that a miss can replace; other
/// slots only fill through a different policy. Kept as the default.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedSlot {
    slot: usize,
}

impl FixedSlot {
    pub fn new(slot: usize) -> Self {
        Self { slot }
    }
}

impl EvictionPolicy for FixedSlot {
    fn select_victim(&mut self, entries: &[CacheEntry]) -> usize {
        self.slot.min(entries.len() - 1)
    }
}

/// Least recently used, preferring empty slots
///
/// Stamps grow with the highest slot touched, so the policy allocates
/// nothing up front.
#[derive(Debug, Clone, Default)]
pub struct Lru {
    last_used: Vec<u64>,
    clock: u64,
}

impl Lru {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvictionPolicy for Lru {
    fn select_victim(&mut self, entries: &[CacheEntry]) -> usize {
        if let Some(slot) = entries.iter().position(|e| !e.is_valid()) {
            return slot;
        }
        self.last_used
            .iter()
            .enumerate()
            .min_by_key(|&(_, stamp)| *stamp)
            .map(|(slot, _)| slot)
            .unwrap_or(0)
    }

    fn on_access(&mut self, slot: usize) {
        self.clock += 1;
        if slot >= self.last_used.len() {
            self.last_used.resize(slot + 1, 0);
        }
        self.last_used[slot] = self.clock;
    }
}
