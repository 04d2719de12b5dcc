//! # Item Catalog
//!
//! Static catalog of everything a lootbox can contain. Loaded once at
//! startup and never mutated afterwards.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};
use crate::rarity::Rarity;

/// Immutable catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LootItem {
    /// Unique catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Rarity tier.
    pub rarity: Rarity,
    /// Coin value.
    pub value: u64,
}

impl LootItem {
    /// Creates a catalog entry.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, rarity: Rarity, value: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rarity,
            value,
        }
    }
}

/// Read-only item catalog with per-tier pools.
#[derive(Clone, Debug)]
pub struct Catalog {
    /// All items, in configuration order.
    items: Vec<LootItem>,
    /// Indices into `items`, one pool per [`Rarity::index`].
    pools: [Vec<usize>; 4],
}

impl Catalog {
    /// Builds a catalog, indexing items by tier.
    ///
    /// Pool order follows configuration order, which keeps sampling stable
    /// across restarts with the same config.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::EmptyCatalog`] for an empty item list and
    /// [`EconomyError::DuplicateItem`] when two entries share an id.
    pub fn new(items: Vec<LootItem>) -> EconomyResult<Self> {
        if items.is_empty() {
            return Err(EconomyError::EmptyCatalog);
        }

        let mut seen = HashSet::with_capacity(items.len());
        if let Some(duplicate) = items.iter().find(|item| !seen.insert(item.id.as_str())) {
            return Err(EconomyError::DuplicateItem(duplicate.id.clone()));
        }

        Ok(Self::build(items))
    }

    /// Indexes a non-empty, duplicate-free item list by tier.
    fn build(items: Vec<LootItem>) -> Self {
        let mut pools: [Vec<usize>; 4] = Default::default();
        for (index, item) in items.iter().enumerate() {
            pools[item.rarity.index()].push(index);
        }
        Self { items, pools }
    }

    /// Number of catalog items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the catalog holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in configuration order.
    #[must_use]
    pub fn items(&self) -> &[LootItem] {
        &self.items
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&LootItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Items of one tier, in configuration order.
    pub fn pool(&self, rarity: Rarity) -> impl Iterator<Item = &LootItem> + '_ {
        self.pools[rarity.index()].iter().map(|&i| &self.items[i])
    }

    /// Number of items in one tier.
    #[must_use]
    pub fn pool_len(&self, rarity: Rarity) -> usize {
        self.pools[rarity.index()].len()
    }

    /// The `n`th item of a tier pool.
    ///
    /// Panics if `n` is out of range; callers pick `n` below
    /// [`Catalog::pool_len`].
    pub(crate) fn pool_item(&self, rarity: Rarity, n: usize) -> &LootItem {
        &self.items[self.pools[rarity.index()][n]]
    }
}

impl Default for Catalog {
    /// The launch catalog: two items per tier.
    fn default() -> Self {
        let items = vec![
            LootItem::new("1", "Cyber Blade", Rarity::Legendary, 1000),
            LootItem::new("2", "Neon Armor", Rarity::Epic, 500),
            LootItem::new("3", "Digital Coins", Rarity::Common, 50),
            LootItem::new("4", "Quantum Core", Rarity::Rare, 200),
            LootItem::new("5", "FHE Crystal", Rarity::Legendary, 1500),
            LootItem::new("6", "Plasma Shield", Rarity::Epic, 400),
            LootItem::new("7", "Data Fragment", Rarity::Common, 25),
            LootItem::new("8", "Energy Cell", Rarity::Rare, 150),
        ];
        Self::build(items)
    }
}

/// Sum of item values.
#[must_use]
pub fn total_value(items: &[LootItem]) -> u64 {
    items.iter().map(|item| item.value).sum()
}

/// Notification variant for a reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealTier {
    /// At least one legendary item.
    Legendary,
    /// At least one epic item, no legendary.
    Epic,
    /// Anything else.
    Standard,
}

impl RevealTier {
    /// Picks the variant from the best item in the reveal.
    #[must_use]
    pub fn classify(items: &[LootItem]) -> Self {
        match items.iter().map(|item| item.rarity).max() {
            Some(Rarity::Legendary) => Self::Legendary,
            Some(Rarity::Epic) => Self::Epic,
            _ => Self::Standard,
        }
    }
}
