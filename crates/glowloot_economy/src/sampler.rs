//! # Rarity Sampler
//!
//! **Deterministic, seed-derived reward selection**
//!
//! A reveal seed fans out into `item_count` independent draws:
//!
//! ```text
//! draw_i = SipHash-2-4-128(key = seed, msg = i)
//!            │
//!            ├── h1 ──> tier lane  ──> RarityTable walk ──> tier
//!            └── h2 ──> pick lane  ──> uniform index     ──> item in tier pool
//! ```
//!
//! - Same seed + same item count = same items. Reveals can be re-derived by
//!   anyone holding the confirmed seed.
//! - Draw `i` is a function of `(seed, i)` only. The outcome of one draw never
//!   feeds into another.
//! - The hash key is public. Unpredictability comes from the seed the gateway
//!   commits to, not from the hash.

use siphasher::sip128::{Hasher128, SipHasher24};
use std::hash::Hasher;

use crate::catalog::{Catalog, LootItem};
use crate::error::{EconomyError, EconomyResult};
use crate::rarity::{Rarity, RarityTable};

/// Domain separation for draw derivation ("GLOWLOOT" in ASCII).
const DRAW_DOMAIN: u64 = 0x474C_4F57_4C4F_4F54;

/// Scale for mapping the top 53 bits of a hash onto `[0,1)`.
const UNIT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

/// Opaque seed the gateway confirmed for a reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct RevealSeed(pub u64);

/// Number of items in a lootbox. Always 1, 2 or 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemCount(u8);

impl ItemCount {
    /// Smallest allowed count.
    pub const MIN: u8 = 1;
    /// Largest allowed count.
    pub const MAX: u8 = 3;
    /// A single item.
    pub const ONE: Self = Self(1);

    /// Validates an item count at the boundary.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidItemCount`] outside `1..=3`.
    pub const fn new(count: u8) -> EconomyResult<Self> {
        if count >= Self::MIN && count <= Self::MAX {
            Ok(Self(count))
        } else {
            Err(EconomyError::InvalidItemCount(count))
        }
    }

    /// The raw count.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ItemCount {
    type Error = EconomyError;

    fn try_from(value: u8) -> EconomyResult<Self> {
        Self::new(value)
    }
}

impl std::fmt::Display for ItemCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One uniform draw, split into its two independent lanes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Draw {
    /// Tier lane, in `[0,1)`.
    pub tier: f64,
    /// Item pick lane, in `[0,1)`.
    pub pick: f64,
}

/// Derives draw `index` from `seed`.
#[inline]
#[must_use]
pub fn derive_draw(seed: RevealSeed, index: u32) -> Draw {
    let mut hasher = SipHasher24::new_with_keys(seed.0, DRAW_DOMAIN);
    hasher.write_u32(index);
    let hash = hasher.finish128();

    Draw {
        tier: to_unit(hash.h1),
        pick: to_unit(hash.h2),
    }
}

#[inline]
#[allow(clippy::cast_precision_loss)]
fn to_unit(bits: u64) -> f64 {
    (bits >> 11) as f64 * UNIT_SCALE
}

/// The sampler: catalog + validated rarity table.
///
/// Immutable after construction and safe to share across threads.
#[derive(Clone, Debug)]
pub struct RaritySampler {
    catalog: Catalog,
    table: RarityTable,
}

impl RaritySampler {
    /// Builds a sampler, checking every selectable tier has items.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::EmptyPool`] if a tier with positive weight
    /// has no catalog entries.
    pub fn new(catalog: Catalog, table: RarityTable) -> EconomyResult<Self> {
        for rarity in Rarity::REVEAL_ORDER {
            if table.is_selectable(rarity) && catalog.pool_len(rarity) == 0 {
                return Err(EconomyError::EmptyPool(rarity));
            }
        }
        Ok(Self { catalog, table })
    }

    /// The catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The rarity table.
    #[must_use]
    pub const fn table(&self) -> &RarityTable {
        &self.table
    }

    /// Samples `count` items from `seed`.
    #[must_use]
    pub fn sample(&self, seed: RevealSeed, count: ItemCount) -> Vec<LootItem> {
        (0..u32::from(count.get()))
            .map(|i| self.resolve(derive_draw(seed, i)))
            .collect()
    }

    /// Resolves pre-derived draws, one item per draw.
    #[must_use]
    pub fn sample_draws(&self, draws: &[Draw]) -> Vec<LootItem> {
        draws.iter().map(|&draw| self.resolve(draw)).collect()
    }

    /// Maps a single draw to a catalog item.
    #[must_use]
    pub fn resolve(&self, draw: Draw) -> LootItem {
        let rarity = self.table.tier_for(draw.tier);
        let len = self.catalog.pool_len(rarity);
        // Selectable tiers have items (checked in `new`).
        debug_assert!(len > 0, "empty pool for selectable tier {rarity}");

        self.catalog
            .pool_item(rarity, pick_index(draw.pick, len))
            .clone()
    }

    /// Runs single-item reveals over sequential seeds.
    ///
    /// Returns per-tier counts for verification.
    #[must_use]
    pub fn run_statistics(&self, iterations: u64) -> SamplerStatistics {
        let mut stats = SamplerStatistics::default();

        for i in 0..iterations {
            let draw = derive_draw(RevealSeed(i.wrapping_mul(0x9E37_79B9_7F4A_7C15)), 0);
            let item = self.resolve(draw);
            stats.total_draws += 1;
            stats.tier_counts[item.rarity.index()] += 1;
        }

        stats
    }
}

#[inline]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn pick_index(u: f64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    ((u * len as f64) as usize).min(len - 1)
}

/// Statistics from sampler simulation.
#[derive(Clone, Debug, Default)]
pub struct SamplerStatistics {
    /// Total number of draws performed.
    pub total_draws: u64,
    /// Draw counts per [`Rarity::index`].
    pub tier_counts: [u64; 4],
}

impl SamplerStatistics {
    /// Observed frequency of `rarity` in `[0,1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn frequency(&self, rarity: Rarity) -> f64 {
        if self.total_draws == 0 {
            0.0
        } else {
            self.tier_counts[rarity.index()] as f64 / self.total_draws as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::total_value;
    use crate::rarity::RarityWeights;
    use proptest::prelude::*;

    fn sampler() -> RaritySampler {
        RaritySampler::new(Catalog::default(), RarityTable::default()).unwrap()
    }

    #[test]
    fn test_item_count_boundary() {
        assert!(ItemCount::new(0).is_err());
        assert_eq!(ItemCount::new(1).unwrap().get(), 1);
        assert_eq!(ItemCount::new(3).unwrap().get(), 3);
        assert_eq!(ItemCount::try_from(4), Err(EconomyError::InvalidItemCount(4)));
    }

    #[test]
    fn test_deterministic_reveals() {
        let sampler = sampler();
        let count = ItemCount::new(3).unwrap();

        let first = sampler.sample(RevealSeed(42), count);
        let second = sampler.sample(RevealSeed(42), count);

        assert_eq!(first, second);
    }

    #[test]
    fn test_draws_are_prefix_stable() {
        // Draw i depends on (seed, i) only, so a longer reveal extends a shorter one.
        let sampler = sampler();
        let two = sampler.sample(RevealSeed(7), ItemCount::new(2).unwrap());
        let three = sampler.sample(RevealSeed(7), ItemCount::new(3).unwrap());

        assert_eq!(two[..], three[..2]);
    }

    #[test]
    fn test_lanes_are_in_unit_interval() {
        for seed in 0..1000 {
            for i in 0..3 {
                let draw = derive_draw(RevealSeed(seed), i);
                assert!((0.0..1.0).contains(&draw.tier));
                assert!((0.0..1.0).contains(&draw.pick));
            }
        }
    }

    #[test]
    fn test_explicit_draws_legendary_and_rare() {
        let sampler = sampler();
        let draws = [
            Draw { tier: 0.02, pick: 0.9 },
            Draw { tier: 0.40, pick: 0.1 },
        ];

        let items = sampler.sample_draws(&draws);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].rarity, Rarity::Legendary);
        assert_eq!(items[0].name, "FHE Crystal");
        assert_eq!(items[1].rarity, Rarity::Rare);
        assert_eq!(items[1].name, "Quantum Core");
        assert_eq!(total_value(&items), 1500 + 200);
    }

    #[test]
    fn test_empty_selectable_pool_rejected() {
        let catalog = Catalog::new(vec![
            LootItem::new("c", "Coin", Rarity::Common, 1),
            LootItem::new("r", "Gem", Rarity::Rare, 2),
            LootItem::new("e", "Orb", Rarity::Epic, 3),
        ])
        .unwrap();

        let err = RaritySampler::new(catalog, RarityTable::default()).unwrap_err();
        assert_eq!(err, EconomyError::EmptyPool(Rarity::Legendary));
    }

    #[test]
    fn test_unselectable_tier_may_be_empty() {
        let catalog = Catalog::new(vec![LootItem::new("c", "Coin", Rarity::Common, 1)]).unwrap();
        let table = RarityTable::new(RarityWeights {
            legendary: 0.0,
            epic: 0.0,
            rare: 0.0,
            common: 1.0,
        })
        .unwrap();

        let sampler = RaritySampler::new(catalog, table).unwrap();
        let items = sampler.sample(RevealSeed(1), ItemCount::new(3).unwrap());
        assert!(items.iter().all(|item| item.id == "c"));
    }

    #[test]
    fn test_resolve_stays_in_selected_tier() {
        let sampler = sampler();

        for step in 0..200u32 {
            let u = f64::from(step) / 200.0;
            let draw = Draw { tier: u, pick: 1.0 - u / 2.0 };
            let expected = sampler.table().tier_for(draw.tier);

            let item = sampler.resolve(draw);
            assert_eq!(item.rarity, expected, "tier lane {u}");
            assert!(sampler.catalog().pool(expected).any(|i| *i == item));
        }
    }

    #[test]
    fn test_pick_index_bounds() {
        assert_eq!(pick_index(0.0, 2), 0);
        assert_eq!(pick_index(0.49, 2), 0);
        assert_eq!(pick_index(0.5, 2), 1);
        assert_eq!(pick_index(0.999_999_999_999, 2), 1);
    }

    #[test]
    fn test_tier_distribution_conformance() {
        let stats = sampler().run_statistics(100_000);

        // 4 standard deviations of a binomial at n=100k is under 0.7 percentage points.
        let tolerance = 0.007;
        for (rarity, expected) in [
            (Rarity::Legendary, 0.05),
            (Rarity::Epic, 0.15),
            (Rarity::Rare, 0.30),
            (Rarity::Common, 0.50),
        ] {
            let observed = stats.frequency(rarity);
            assert!(
                (observed - expected).abs() < tolerance,
                "{rarity}: observed {observed:.4}, expected {expected:.2}"
            );
        }
    }

    proptest! {
        #[test]
        fn prop_sample_len_and_membership(seed in any::<u64>(), count in 1u8..=3) {
            let sampler = sampler();
            let items = sampler.sample(RevealSeed(seed), ItemCount::new(count).unwrap());

            prop_assert_eq!(items.len(), usize::from(count));
            for item in &items {
                prop_assert_eq!(sampler.catalog().get(&item.id), Some(item));
            }
        }

        #[test]
        fn prop_sample_is_deterministic(seed in any::<u64>(), count in 1u8..=3) {
            let sampler = sampler();
            let count = ItemCount::new(count).unwrap();
            prop_assert_eq!(
                sampler.sample(RevealSeed(seed), count),
                sampler.sample(RevealSeed(seed), count)
            );
        }
    }
}
