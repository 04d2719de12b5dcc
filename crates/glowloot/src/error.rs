//! Lifecycle error types.

use glowloot_blockchain::{BoxHandle, GatewayError};
use glowloot_economy::EconomyError;
use thiserror::Error;

use crate::lootbox::{BoxId, LootBoxState};

/// Lifecycle action, for reporting rejected transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Start of creation.
    Create,
    /// Creation confirmed by the gateway.
    ConfirmCreated,
    /// Progress accrual start.
    Decrypt,
    /// Open call.
    Open,
    /// Reveal assignment.
    Reveal,
    /// Failure transition.
    Fail,
    /// New attempt after failure.
    Retry,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "create",
            Self::ConfirmCreated => "confirm-created",
            Self::Decrypt => "decrypt",
            Self::Open => "open",
            Self::Reveal => "reveal",
            Self::Fail => "fail",
            Self::Retry => "retry",
        };
        f.write_str(name)
    }
}

/// What exactly broke the protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// The box already has its items.
    #[error("box already revealed")]
    AlreadyRevealed,

    /// The attempt failed; only `retry` is accepted.
    #[error("box attempt failed; retry first")]
    AlreadyFailed,

    /// Open before creation was observed.
    #[error("box has not been created")]
    NotCreated,

    /// An open call is already outstanding.
    #[error("open already in flight")]
    OpenInFlight,

    /// Any other illegal transition.
    #[error("cannot {action} from {from}")]
    TransitionRejected {
        /// State the box was in.
        from: LootBoxState,
        /// Action attempted.
        action: Action,
    },

    /// Sampler produced the wrong number of items.
    #[error("expected {expected} items, got {actual}")]
    ItemCountMismatch {
        /// Committed count.
        expected: u8,
        /// Produced count.
        actual: usize,
    },

    /// A rarity seed was offered twice for the same box.
    #[error("rarity seed {0} already committed for this box")]
    SeedReused(u32),

    /// The same gateway handle was confirmed twice.
    #[error("handle {0} already revealed")]
    DuplicateReveal(BoxHandle),
}

/// Errors surfaced by lootbox operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LootBoxError {
    /// Action attempted without an authorized session.
    #[error("box {box_id}: connect a wallet first")]
    Authorization {
        /// Box the action targeted.
        box_id: BoxId,
    },

    /// `createLootBox` did not go through. The box is now Failed.
    #[error("box {box_id}: creation failed: {source}")]
    CreationFailed {
        /// Affected box.
        box_id: BoxId,
        /// Gateway cause.
        source: GatewayError,
    },

    /// `openLootBox` did not go through. The box is now Failed.
    #[error("box {box_id}: open failed: {source}")]
    OpenFailed {
        /// Affected box.
        box_id: BoxId,
        /// Gateway cause.
        source: GatewayError,
    },

    /// Rejected before any gateway call was issued.
    #[error("box {box_id}: protocol violation: {violation}")]
    ProtocolViolation {
        /// Affected box.
        box_id: BoxId,
        /// What was violated.
        violation: Violation,
    },

    /// No box registered under this id.
    #[error("unknown box {0}")]
    UnknownBox(BoxId),
}

impl LootBoxError {
    pub(crate) fn violation(box_id: &BoxId, violation: Violation) -> Self {
        Self::ProtocolViolation {
            box_id: box_id.clone(),
            violation,
        }
    }

    /// The violation, if this is a protocol violation.
    #[must_use]
    pub const fn as_violation(&self) -> Option<&Violation> {
        match self {
            Self::ProtocolViolation { violation, .. } => Some(violation),
            _ => None,
        }
    }
}

/// Result type for lifecycle operations.
pub type LootBoxResult<T> = Result<T, LootBoxError>;

/// Startup configuration errors. These halt the process.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Weights or catalog rejected.
    #[error("invalid loot configuration: {0}")]
    Economy(#[from] EconomyError),

    /// Session settings rejected.
    #[error("invalid session configuration: {0}")]
    Session(String),
}
