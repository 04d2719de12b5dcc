//! # GLOWLOOT Economy System
//!
//! Pure Rust reward logic for the GLOWLOOT fair lootbox.
//!
//! ## Design Principles
//!
//! 1. **Seed-derived sampling** - Every reveal is a pure function of the seed
//!    the gateway confirmed. No ambient RNG at reveal time.
//! 2. **Order independence** - Draw `i` never looks at the outcome of draw `j`
//! 3. **Fail fast** - Invalid weights or empty tier pools are startup errors
//! 4. **External configuration** - Catalog and weights live in TOML
//!
//! ## Thread Safety
//!
//! [`Catalog`], [`RarityTable`] and [`RaritySampler`] are immutable once
//! built. Share them behind an `Arc` without locking.
//!
//! ## Example
//!
//! ```rust,ignore
//! use glowloot_economy::{ItemCount, LootConfig, RevealSeed};
//!
//! let sampler = LootConfig::from_toml_str(&text)?.build_sampler()?;
//! let items = sampler.sample(RevealSeed(42), ItemCount::new(2)?);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod rarity;
pub mod sampler;

pub use catalog::{total_value, Catalog, LootItem, RevealTier};
pub use config::LootConfig;
pub use error::{EconomyError, EconomyResult};
pub use rarity::{Rarity, RarityTable, RarityWeights, WEIGHT_EPSILON};
pub use sampler::{derive_draw, Draw, ItemCount, RaritySampler, RevealSeed, SamplerStatistics};
