//! # Runtime Configuration
//!
//! One TOML document, loaded once at startup:
//!
//! ```toml
//! [rarity]            # tier weights
//! [[items]]           # catalog
//! [session]
//! tick_interval_ms = 200
//! max_progress_step = 15.0
//! confirmation_delay_ms = 2000
//! event_capacity = 256
//! box_ids = ["box-1", "box-2", "box-3"]
//! [gateway]
//! chain_id = 11155111
//! ```
//!
//! Every section is optional.

use std::path::Path;
use std::time::Duration;

use glowloot_blockchain::GatewayConfig;
use glowloot_economy::{LootConfig, RaritySampler};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lootbox::BoxId;

/// Session timing and layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Progress tick cadence.
    pub tick_interval_ms: u64,
    /// Largest progress step per tick.
    pub max_progress_step: f64,
    /// Wait between creation confirmation and the open call.
    pub confirmation_delay_ms: u64,
    /// Notification channel capacity.
    pub event_capacity: usize,
    /// Boxes offered to the player.
    pub box_ids: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 200,
            max_progress_step: 15.0,
            confirmation_delay_ms: 2_000,
            event_capacity: 256,
            box_ids: vec!["box-1".into(), "box-2".into(), "box-3".into()],
        }
    }
}

impl SessionConfig {
    /// Progress tick cadence.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Delay before opening.
    #[must_use]
    pub const fn confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_delay_ms)
    }

    /// Configured box ids.
    #[must_use]
    pub fn box_ids(&self) -> Vec<BoxId> {
        self.box_ids.iter().map(|id| BoxId::new(id.as_str())).collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Session("tick_interval_ms must be positive".into()));
        }
        if !self.max_progress_step.is_finite() || self.max_progress_step < 0.0 {
            return Err(ConfigError::Session(format!(
                "max_progress_step must be finite and non-negative, got {}",
                self.max_progress_step
            )));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::Session("event_capacity must be positive".into()));
        }
        Ok(())
    }
}

/// Whole application configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Catalog and rarity weights.
    #[serde(flatten)]
    pub loot: LootConfig,
    /// Session settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl AppConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Malformed TOML or invalid session settings.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.session.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    ///
    /// # Errors
    ///
    /// I/O failure, malformed TOML, or invalid session settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), items = config.loot.items.len(), "config loaded");
        Ok(config)
    }

    /// Builds the sampler. Fails on any catalog or weight defect.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Economy`] wrapping the defect.
    pub fn build_sampler(&self) -> Result<RaritySampler, ConfigError> {
        Ok(self.loot.build_sampler()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowloot_economy::EconomyError;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.session.box_ids().len(), 3);
        assert_eq!(config.gateway.chain_id, 11_155_111);
        assert_eq!(config.build_sampler().unwrap().catalog().len(), 8);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config =
            AppConfig::from_toml_str(include_str!("../../../config/glowloot.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_sections_override() {
        let config = AppConfig::from_toml_str(
            r#"
            [rarity]
            legendary = 0.0
            epic = 0.0
            rare = 0.0
            common = 1.0

            [[items]]
            id = "c"
            name = "Pebble"
            rarity = "common"
            value = 1

            [session]
            tick_interval_ms = 50
            box_ids = ["only"]

            [gateway]
            latency_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.loot.items.len(), 1);
        assert_eq!(config.session.tick_interval(), Duration::from_millis(50));
        assert_eq!(config.session.max_progress_step, 15.0);
        assert_eq!(config.session.box_ids(), vec![BoxId::from("only")]);
        assert_eq!(config.gateway.latency_ms, 0);
        assert!(config.build_sampler().is_ok());
    }

    #[test]
    fn test_bad_weights_fail_at_build() {
        let config = AppConfig::from_toml_str(
            r#"
            [rarity]
            legendary = 0.5
            epic = 0.5
            rare = 0.5
            common = 0.5
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.build_sampler(),
            Err(ConfigError::Economy(EconomyError::WeightSum { .. }))
        ));
    }

    #[test]
    fn test_invalid_session_rejected() {
        let err = AppConfig::from_toml_str("[session]\nmax_progress_step = -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Session(_)));

        let err = AppConfig::from_toml_str("[session\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
