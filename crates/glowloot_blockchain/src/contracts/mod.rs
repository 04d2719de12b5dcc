//! # Contract Definitions
//!
//! ABI of the `GlowLootFair` contract plus gateway connection settings.

// The sol! macro generates code that we can't document, so allow missing_docs
#![allow(missing_docs)]

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};

sol! {
    /// The fair lootbox contract.
    ///
    /// Box contents are committed encrypted at creation and only decrypted
    /// by `openLootBox`.
    #[derive(Debug)]
    interface IGlowLootFair {
        /// Emitted when a box is committed.
        event LootBoxCreated(
            uint256 indexed boxId,
            address indexed owner,
            uint8 itemCount
        );

        /// Emitted when a box is decrypted and opened.
        event LootBoxOpened(
            uint256 indexed boxId,
            address indexed owner,
            uint8 itemCount
        );

        /// Commits a new encrypted box for the caller.
        function createLootBox(uint8 itemCount, uint32 raritySeed) external returns (uint256 boxId);

        /// Decrypts and opens a box owned by the caller.
        function openLootBox(uint256 boxId, uint32 randomSeed) external;

        /// Authoritative per-player counters.
        function getPlayerStats(address player) external view returns (
            uint32 boxesOpened,
            uint32 totalItems
        );
    }
}

/// Calldata for `createLootBox`.
#[must_use]
pub fn encode_create(item_count: u8, rarity_seed: u32) -> Vec<u8> {
    IGlowLootFair::createLootBoxCall {
        itemCount: item_count,
        raritySeed: rarity_seed,
    }
    .abi_encode()
}

/// Calldata for `openLootBox`.
#[must_use]
pub fn encode_open(box_id: U256, random_seed: u32) -> Vec<u8> {
    IGlowLootFair::openLootBoxCall {
        boxId: box_id,
        randomSeed: random_seed,
    }
    .abi_encode()
}

/// Calldata for `getPlayerStats`.
#[must_use]
pub fn encode_player_stats(player: Address) -> Vec<u8> {
    IGlowLootFair::getPlayerStatsCall { player }.abi_encode()
}

/// Gateway connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// EVM chain id (Sepolia by default).
    pub chain_id: u64,
    /// RPC endpoint URL.
    pub rpc_url: String,
    /// Deployed `GlowLootFair` address, hex encoded. Empty when undeployed.
    pub contract_address: String,
    /// Simulated confirmation latency in milliseconds.
    pub latency_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            chain_id: 11_155_111,
            rpc_url: "https://1rpc.io/sepolia".to_string(),
            contract_address: String::new(),
            latency_ms: 500,
        }
    }
}

impl GatewayConfig {
    /// Parses the configured contract address.
    ///
    /// Returns `None` if unset or malformed.
    #[must_use]
    pub fn contract_address(&self) -> Option<Address> {
        if self.contract_address.is_empty() {
            return None;
        }
        Address::from_str(&self.contract_address).ok()
    }
}

/// Short wallet display: `0x1234…abcd`.
#[must_use]
pub fn format_address(address: &Address) -> String {
    let full = address.to_string();
    let tail = full.len().saturating_sub(4);
    format!("{}…{}", &full[..6], &full[tail..])
}
