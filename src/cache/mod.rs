//! Read Cache Module
//!
//! A small fixed set of block-sized entries keyed by aligned device offset.
//!
//! ## Coherency
//! - An entry becomes valid only after a successful device read fills it
//! - Any device write overlapping an entry's block invalidates it before the
//!   write is reported durable (see [`ReadCache::invalidate_range`])
//!
//! ## Eviction
//! Victim selection sits behind [`EvictionPolicy`]; correctness never
//! depends on which slot a policy picks.

mod policy;
mod table;

pub use policy::{EvictionPolicy, FixedSlot, Lru};
pub use table::{CacheEntry, ReadCache};

use crate::config::EvictionStrategy;

/// Build the policy object for a configured strategy
pub fn policy_for(strategy: EvictionStrategy) -> Box<dyn EvictionPolicy> {
    match strategy {
        EvictionStrategy::FixedSlot => Box::new(FixedSlot::default()),
        EvictionStrategy::Lru => Box::new(Lru::new()),
    }
}
