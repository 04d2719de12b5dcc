//! # Rarity Table
//!
//! Tier weights and the cumulative walk that turns a uniform draw into a tier.
//!
//! The walk always runs in rank order, rarest first:
//!
//! ```text
//!  u ∈ [0,1)
//!  0.00 ──── 0.05 ──────── 0.20 ──────────── 0.50 ─────────────────── 1.00
//!  │Legendary│    Epic     │      Rare       │         Common          │
//! ```
//!
//! The first tier whose cumulative upper bound is `>= u` wins. Tiers with
//! zero weight are never selectable.

use serde::{Deserialize, Serialize};

use crate::error::{EconomyError, EconomyResult};

/// Tolerance for the weight sum check.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Rarity tier for catalog items.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Rarity {
    /// Common items - 50% of draws by default
    Common = 0,
    /// Rare items - 30% of draws by default
    Rare = 1,
    /// Epic items - 15% of draws by default
    Epic = 2,
    /// Legendary items - 5% of draws by default
    Legendary = 3,
}

impl Rarity {
    /// All tiers in the order the cumulative walk visits them.
    pub const REVEAL_ORDER: [Rarity; 4] = [
        Rarity::Legendary,
        Rarity::Epic,
        Rarity::Rare,
        Rarity::Common,
    ];

    /// Dense index for per-tier arrays.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw per-tier probabilities as they appear in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RarityWeights {
    /// Probability of a legendary draw.
    pub legendary: f64,
    /// Probability of an epic draw.
    pub epic: f64,
    /// Probability of a rare draw.
    pub rare: f64,
    /// Probability of a common draw.
    pub common: f64,
}

impl RarityWeights {
    /// Weight assigned to `rarity`.
    #[must_use]
    pub const fn weight(&self, rarity: Rarity) -> f64 {
        match rarity {
            Rarity::Common => self.common,
            Rarity::Rare => self.rare,
            Rarity::Epic => self.epic,
            Rarity::Legendary => self.legendary,
        }
    }
}

impl Default for RarityWeights {
    fn default() -> Self {
        Self {
            legendary: 0.05,
            epic: 0.15,
            rare: 0.30,
            common: 0.50,
        }
    }
}

/// Validated cumulative rarity table.
///
/// Built once at startup. Lookups are a walk over four entries.
#[derive(Clone, Debug, PartialEq)]
pub struct RarityTable {
    weights: RarityWeights,
    /// Cumulative upper bounds, in [`Rarity::REVEAL_ORDER`].
    bounds: [(Rarity, f64); 4],
    /// Last tier with positive weight; absorbs float residue near 1.0.
    last_selectable: Rarity,
}

impl RarityTable {
    /// Validates `weights` and pre-computes cumulative bounds.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidWeight`] for negative or non-finite
    /// weights and [`EconomyError::WeightSum`] when the sum is not 1.0
    /// within [`WEIGHT_EPSILON`].
    pub fn new(weights: RarityWeights) -> EconomyResult<Self> {
        let mut sum = 0.0;
        for rarity in Rarity::REVEAL_ORDER {
            let weight = weights.weight(rarity);
            if !weight.is_finite() || weight < 0.0 {
                return Err(EconomyError::InvalidWeight { rarity, weight });
            }
            sum += weight;
        }

        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(EconomyError::WeightSum { sum });
        }

        Ok(Self::build(weights))
    }

    /// Pre-computes cumulative bounds without validating.
    fn build(weights: RarityWeights) -> Self {
        let mut bounds = [(Rarity::Common, 0.0); 4];
        let mut cumulative = 0.0;
        let mut last_selectable = Rarity::Common;

        for (slot, rarity) in bounds.iter_mut().zip(Rarity::REVEAL_ORDER) {
            let weight = weights.weight(rarity);
            if weight > 0.0 {
                last_selectable = rarity;
            }
            cumulative += weight;
            *slot = (rarity, cumulative);
        }

        Self {
            weights,
            bounds,
            last_selectable,
        }
    }

    /// The validated weights.
    #[must_use]
    pub const fn weights(&self) -> &RarityWeights {
        &self.weights
    }

    /// Probability of `rarity`.
    #[must_use]
    pub const fn probability(&self, rarity: Rarity) -> f64 {
        self.weights.weight(rarity)
    }

    /// Returns true if `rarity` can ever be drawn.
    #[must_use]
    pub fn is_selectable(&self, rarity: Rarity) -> bool {
        self.weights.weight(rarity) > 0.0
    }

    /// Maps a uniform draw `u ∈ [0,1)` to a tier.
    #[must_use]
    pub fn tier_for(&self, u: f64) -> Rarity {
        for &(rarity, upper) in &self.bounds {
            if u <= upper && self.is_selectable(rarity) {
                return rarity;
            }
        }
        self.last_selectable
    }
}

impl Default for RarityTable {
    fn default() -> Self {
        Self::build(RarityWeights::default())
    }
}
