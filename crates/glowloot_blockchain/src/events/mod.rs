//! # Chain Events
//!
//! Events emitted by the `GlowLootFair` contract, in the shape the stats
//! index consumes them.

use alloy_primitives::Address;

use crate::gateway::BoxHandle;

/// All contract events the lifecycle cares about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    /// A box was committed.
    LootBoxCreated(LootBoxCreated),
    /// A box was opened.
    LootBoxOpened(LootBoxOpened),
    /// A new block was mined (for sync purposes).
    NewBlock(u64),
}

impl GatewayEvent {
    /// Block number carried by the event.
    #[must_use]
    pub const fn block_number(&self) -> u64 {
        match self {
            Self::LootBoxCreated(e) => e.block_number,
            Self::LootBoxOpened(e) => e.block_number,
            Self::NewBlock(n) => *n,
        }
    }
}

/// `LootBoxCreated` event data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LootBoxCreated {
    /// The new box.
    pub handle: BoxHandle,
    /// Account that owns it.
    pub owner: Address,
    /// Committed item count.
    pub item_count: u8,
    /// Block number where this occurred.
    pub block_number: u64,
}

/// `LootBoxOpened` event data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LootBoxOpened {
    /// The opened box.
    pub handle: BoxHandle,
    /// Account that opened it.
    pub owner: Address,
    /// Items revealed.
    pub item_count: u8,
    /// Block number where this occurred.
    pub block_number: u64,
}
