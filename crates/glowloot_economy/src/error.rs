//! # Economy Error Types
//!
//! Everything here is a configuration defect. None of it is recoverable
//! per box: a bad catalog or rarity table must halt startup.

use thiserror::Error;

use crate::rarity::Rarity;

/// Errors that can occur while building or using the economy system.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EconomyError {
    /// A rarity weight was negative, NaN or infinite.
    #[error("invalid weight for {rarity:?}: {weight}")]
    InvalidWeight {
        /// The tier carrying the bad weight.
        rarity: Rarity,
        /// The rejected weight.
        weight: f64,
    },

    /// Rarity weights do not sum to 1.0 within tolerance.
    #[error("rarity weights sum to {sum}, expected 1.0")]
    WeightSum {
        /// The actual sum.
        sum: f64,
    },

    /// A tier with positive weight has no catalog items.
    #[error("no catalog items for selectable tier {0:?}")]
    EmptyPool(Rarity),

    /// Two catalog entries share the same id.
    #[error("duplicate catalog item id: {0}")]
    DuplicateItem(String),

    /// The catalog has no entries at all.
    #[error("catalog is empty")]
    EmptyCatalog,

    /// Item count outside the allowed 1..=3 range.
    #[error("invalid item count {0}: must be between 1 and 3")]
    InvalidItemCount(u8),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for economy operations.
pub type EconomyResult<T> = Result<T, EconomyError>;
