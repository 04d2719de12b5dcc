//! # Gateway Interface
//!
//! The async boundary to the contract. Implementations: [`SimulatedGateway`]
//! for local play and tests, an RPC-backed client in deployment.
//!
//! [`SimulatedGateway`]: crate::simulator::SimulatedGateway

use std::future::Future;

use alloy_primitives::{Address, U256};
use glowloot_economy::{ItemCount, RevealSeed};
use thiserror::Error;

/// Contract-assigned box identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxHandle(pub u64);

impl BoxHandle {
    /// ABI representation.
    #[must_use]
    pub fn to_u256(self) -> U256 {
        U256::from(self.0)
    }

    /// Converts from the ABI representation.
    ///
    /// Returns `None` for ids that do not fit in 64 bits.
    #[must_use]
    pub fn from_u256(value: U256) -> Option<Self> {
        let limbs = value.as_limbs();
        if limbs[1..].iter().any(|&limb| limb != 0) {
            return None;
        }
        Some(Self(limbs[0]))
    }
}

impl std::fmt::Display for BoxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Successful open confirmation.
///
/// The reveal seed is the decrypted outcome. The client only decodes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Confirmation {
    /// The opened box.
    pub handle: BoxHandle,
    /// Item count committed at creation.
    pub item_count: ItemCount,
    /// Decrypted outcome seed.
    pub reveal_seed: RevealSeed,
    /// Block that included the open.
    pub block_number: u64,
}

/// Authoritative per-player counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerStats {
    /// Boxes opened on-chain.
    pub boxes_opened: u64,
    /// Items found on-chain.
    pub total_items: u64,
}

/// Why a gateway call did not go through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The wallet owner declined to sign.
    #[error("transaction rejected by user")]
    UserRejected,

    /// RPC or transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// Not enough balance for gas.
    #[error("insufficient funds for gas")]
    InsufficientFunds,

    /// The contract reverted.
    #[error("contract reverted: {0}")]
    Reverted(String),

    /// No box with this handle.
    #[error("unknown lootbox {0}")]
    UnknownBox(BoxHandle),

    /// The box was already opened on-chain.
    #[error("lootbox {0} already opened")]
    AlreadyOpened(BoxHandle),

    /// Caller does not own the box.
    #[error("lootbox {0} is not owned by the caller")]
    NotOwner(BoxHandle),

    /// Item count outside 1..=3.
    #[error("invalid item count {0}")]
    InvalidItemCount(u8),
}

/// Result type for gateway calls.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// The contract surface the lifecycle talks to.
///
/// Futures are `Send` so sessions can drive boxes from spawned tasks.
pub trait ContractGateway: Send + Sync + 'static {
    /// Commits a new encrypted box for the connected account.
    fn create_lootbox(
        &self,
        item_count: ItemCount,
        rarity_seed: u32,
    ) -> impl Future<Output = GatewayResult<BoxHandle>> + Send;

    /// Decrypts and opens a box.
    fn open_lootbox(
        &self,
        handle: BoxHandle,
        random_seed: u32,
    ) -> impl Future<Output = GatewayResult<Confirmation>> + Send;

    /// Reads authoritative counters for `account`.
    fn player_stats(
        &self,
        account: Address,
    ) -> impl Future<Output = GatewayResult<PlayerStats>> + Send;
}
