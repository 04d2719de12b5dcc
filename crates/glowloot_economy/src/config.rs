//! # Loot Configuration
//!
//! TOML schema for the catalog and rarity weights:
//!
//! ```toml
//! [rarity]
//! legendary = 0.05
//! epic = 0.15
//! rare = 0.30
//! common = 0.50
//!
//! [[items]]
//! id = "1"
//! name = "Cyber Blade"
//! rarity = "legendary"
//! value = 1000
//! ```
//!
//! Both sections are optional and fall back to the launch catalog.

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, LootItem};
use crate::error::{EconomyError, EconomyResult};
use crate::rarity::{RarityTable, RarityWeights};
use crate::sampler::RaritySampler;

/// Loot configuration as read from disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootConfig {
    /// Tier probabilities.
    #[serde(default)]
    pub rarity: RarityWeights,
    /// Catalog entries.
    #[serde(default = "default_items")]
    pub items: Vec<LootItem>,
}

fn default_items() -> Vec<LootItem> {
    Catalog::default().items().to_vec()
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            rarity: RarityWeights::default(),
            items: default_items(),
        }
    }
}

impl LootConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`EconomyError::InvalidConfig`] on malformed TOML.
    pub fn from_toml_str(text: &str) -> EconomyResult<Self> {
        toml::from_str(text).map_err(|e| EconomyError::InvalidConfig(e.to_string()))
    }

    /// Validates everything and builds the sampler.
    ///
    /// # Errors
    ///
    /// Any configuration defect: bad weights, duplicate ids, empty pools.
    pub fn build_sampler(&self) -> EconomyResult<RaritySampler> {
        let table = RarityTable::new(self.rarity)?;
        let catalog = Catalog::new(self.items.clone())?;
        RaritySampler::new(catalog, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rarity::Rarity;

    #[test]
    fn test_parse_full_document() {
        let text = r#"
            [rarity]
            legendary = 0.1
            epic = 0.2
            rare = 0.3
            common = 0.4

            [[items]]
            id = "a"
            name = "Alpha"
            rarity = "legendary"
            value = 10

            [[items]]
            id = "b"
            name = "Beta"
            rarity = "epic"
            value = 5

            [[items]]
            id = "c"
            name = "Gamma"
            rarity = "rare"
            value = 2

            [[items]]
            id = "d"
            name = "Delta"
            rarity = "common"
            value = 1
        "#;

        let config = LootConfig::from_toml_str(text).unwrap();
        assert_eq!(config.items.len(), 4);
        assert_eq!(config.items[0].rarity, Rarity::Legendary);

        let sampler = config.build_sampler().unwrap();
        assert!((sampler.table().probability(Rarity::Legendary) - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_document_uses_launch_catalog() {
        let config = LootConfig::from_toml_str("").unwrap();
        assert_eq!(config, LootConfig::default());
        assert!(config.build_sampler().is_ok());
    }

    #[test]
    fn test_bad_weights_fail_at_build() {
        let config = LootConfig::from_toml_str(
            "[rarity]\nlegendary = 0.5\nepic = 0.5\nrare = 0.5\ncommon = 0.5\n",
        )
        .unwrap();
        assert!(matches!(
            config.build_sampler(),
            Err(EconomyError::WeightSum { .. })
        ));
    }

    #[test]
    fn test_unknown_rarity_is_parse_error() {
        let text = "[[items]]\nid = \"x\"\nname = \"X\"\nrarity = \"mythic\"\nvalue = 1\n";
        assert!(matches!(
            LootConfig::from_toml_str(text),
            Err(EconomyError::InvalidConfig(_))
        ));
    }
}
