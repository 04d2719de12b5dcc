//! Creation and open seeds.
//!
//! A rarity seed is committed to the gateway at creation. Reusing one for
//! the same box id would replay an outcome that was committed but never
//! revealed, so every seed handed out for a box id is remembered.

use std::collections::{HashMap, HashSet};

use glowloot_economy::ItemCount;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::lootbox::BoxId;

/// Seeds are drawn from `0..SEED_RANGE`.
pub const SEED_RANGE: u32 = 1_000_000;

/// Parameters for one `createLootBox` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreationParams {
    /// Items to commit.
    pub item_count: ItemCount,
    /// Seed to commit.
    pub rarity_seed: u32,
}

struct SeedState {
    rng: ChaCha20Rng,
    issued: HashMap<BoxId, HashSet<u32>>,
}

/// Source of creation and open seeds.
pub struct SeedSource {
    state: Mutex<SeedState>,
}

impl SeedSource {
    /// Seeded from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::with_rng(ChaCha20Rng::from_entropy())
    }

    /// Fixed seed, for reproducible sessions.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(ChaCha20Rng::seed_from_u64(seed))
    }

    fn with_rng(rng: ChaCha20Rng) -> Self {
        Self {
            state: Mutex::new(SeedState {
                rng,
                issued: HashMap::new(),
            }),
        }
    }

    /// Item count and a rarity seed never before issued for `box_id`.
    pub fn creation_params(&self, box_id: &BoxId) -> CreationParams {
        let mut state = self.state.lock();
        let SeedState { rng, issued } = &mut *state;

        let count = rng.gen_range(ItemCount::MIN..=ItemCount::MAX);
        let item_count = ItemCount::new(count).unwrap_or(ItemCount::ONE);

        let used = issued.entry(box_id.clone()).or_default();
        let rarity_seed = loop {
            let candidate = rng.gen_range(0..SEED_RANGE);
            if used.insert(candidate) {
                break candidate;
            }
        };

        CreationParams {
            item_count,
            rarity_seed,
        }
    }

    /// Entropy for `openLootBox`.
    pub fn open_seed(&self) -> u32 {
        self.state.lock().rng.gen_range(0..SEED_RANGE)
    }

    /// Number of rarity seeds issued for `box_id`.
    #[must_use]
    pub fn issued_for(&self, box_id: &BoxId) -> usize {
        self.state.lock().issued.get(box_id).map_or(0, HashSet::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rarity_seeds_never_repeat_per_box() {
        let seeds = SeedSource::seeded(1);
        let id = BoxId::from("box-1");
        let mut seen = HashSet::new();

        for _ in 0..5_000 {
            let params = seeds.creation_params(&id);
            assert!(seen.insert(params.rarity_seed));
            assert!(params.rarity_seed < SEED_RANGE);
        }
        assert_eq!(seeds.issued_for(&id), 5_000);
    }

    #[test]
    fn test_item_counts_cover_range() {
        let seeds = SeedSource::seeded(2);
        let id = BoxId::from("box-2");
        let mut counts = [0u32; 4];

        for _ in 0..300 {
            counts[usize::from(seeds.creation_params(&id).item_count.get())] += 1;
        }
        assert_eq!(counts[0], 0);
        assert!(counts[1..].iter().all(|&c| c > 0));
    }

    #[test]
    fn test_seeded_sources_are_reproducible() {
        let a = SeedSource::seeded(9);
        let b = SeedSource::seeded(9);
        let id = BoxId::from("box-1");

        assert_eq!(a.creation_params(&id), b.creation_params(&id));
        assert_eq!(a.open_seed(), b.open_seed());
    }
}
