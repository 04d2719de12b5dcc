//! # Simulated Gateway
//!
//! In-process stand-in for the `GlowLootFair` contract. Calls take the
//! configured latency, mine one block each, emit the same events the
//! contract would, and record ABI calldata so callers can inspect exactly
//! what would have been sent.
//!
//! Failures can be scripted per operation for exercising error paths.

use std::collections::{HashMap, VecDeque};
use std::hash::Hasher;
use std::time::Duration;

use alloy_primitives::Address;
use glowloot_economy::{ItemCount, RevealSeed};
use parking_lot::Mutex;
use siphasher::sip::SipHasher24;

use crate::contracts::{encode_create, encode_open, encode_player_stats, GatewayConfig};
use crate::events::{GatewayEvent, LootBoxCreated, LootBoxOpened};
use crate::gateway::{
    BoxHandle, Confirmation, ContractGateway, GatewayError, GatewayResult, PlayerStats,
};
use crate::state::ChainStatsState;

/// Key lane separating reveal derivation from other hashes.
const REVEAL_DOMAIN: u64 = 0x676c_6f77_6c6f_6f74;

/// A box as committed at creation.
#[derive(Clone, Copy, Debug)]
struct CommittedBox {
    owner: Address,
    item_count: ItemCount,
    rarity_seed: u32,
}

/// Mutable chain state.
struct Chain {
    next_handle: u64,
    block_number: u64,
    committed: HashMap<BoxHandle, CommittedBox>,
    stats: ChainStatsState,
    events: Vec<GatewayEvent>,
    calldata: Vec<Vec<u8>>,
    create_failures: VecDeque<GatewayError>,
    open_failures: VecDeque<GatewayError>,
}

impl Chain {
    fn mine(&mut self) -> u64 {
        self.block_number += 1;
        let block_number = self.block_number;
        self.push_event(GatewayEvent::NewBlock(block_number));
        block_number
    }

    fn push_event(&mut self, event: GatewayEvent) {
        self.stats.process_event(&event);
        self.events.push(event);
    }
}

/// Local contract simulator implementing [`ContractGateway`].
pub struct SimulatedGateway {
    /// Connected account. Every call is signed by it.
    caller: Address,
    /// Connection settings the simulator pretends to use.
    config: GatewayConfig,
    /// Delay before each call resolves.
    latency: Duration,
    chain: Mutex<Chain>,
}

impl SimulatedGateway {
    /// Creates a simulator using the configured latency.
    #[must_use]
    pub fn new(caller: Address, config: GatewayConfig) -> Self {
        let latency = Duration::from_millis(config.latency_ms);
        Self::with_latency(caller, config, latency)
    }

    /// Creates a simulator with an explicit latency.
    #[must_use]
    pub fn with_latency(caller: Address, config: GatewayConfig, latency: Duration) -> Self {
        Self {
            caller,
            config,
            latency,
            chain: Mutex::new(Chain {
                next_handle: 1,
                block_number: 0,
                committed: HashMap::new(),
                stats: ChainStatsState::default(),
                events: Vec::new(),
                calldata: Vec::new(),
                create_failures: VecDeque::new(),
                open_failures: VecDeque::new(),
            }),
        }
    }

    /// The account signing transactions.
    #[inline]
    #[must_use]
    pub const fn caller(&self) -> Address {
        self.caller
    }

    /// Connection settings.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Makes the next `create_lootbox` fail with `error`.
    pub fn fail_next_create(&self, error: GatewayError) {
        self.chain.lock().create_failures.push_back(error);
    }

    /// Makes the next `open_lootbox` fail with `error`.
    pub fn fail_next_open(&self, error: GatewayError) {
        self.chain.lock().open_failures.push_back(error);
    }

    /// Registers a box owned by another account. Used to exercise
    /// ownership reverts.
    pub fn commit_foreign_box(&self, owner: Address, item_count: ItemCount) -> BoxHandle {
        let mut chain = self.chain.lock();
        Self::commit(&mut chain, owner, item_count, 0)
    }

    /// Snapshot of all emitted events, in order.
    #[must_use]
    pub fn events(&self) -> Vec<GatewayEvent> {
        self.chain.lock().events.clone()
    }

    /// Snapshot of all calldata sent, in order.
    #[must_use]
    pub fn calldata(&self) -> Vec<Vec<u8>> {
        self.chain.lock().calldata.clone()
    }

    /// Current block height.
    #[must_use]
    pub fn block_number(&self) -> u64 {
        self.chain.lock().block_number
    }

    fn commit(chain: &mut Chain, owner: Address, item_count: ItemCount, rarity_seed: u32) -> BoxHandle {
        let handle = BoxHandle(chain.next_handle);
        chain.next_handle += 1;
        let block_number = chain.mine();

        chain.committed.insert(
            handle,
            CommittedBox {
                owner,
                item_count,
                rarity_seed,
            },
        );
        chain.push_event(GatewayEvent::LootBoxCreated(LootBoxCreated {
            handle,
            owner,
            item_count: item_count.get(),
            block_number,
        }));
        handle
    }

    async fn settle(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

/// Outcome seed bound to the committed box and the opener's entropy.
fn reveal_seed(handle: BoxHandle, rarity_seed: u32, random_seed: u32) -> RevealSeed {
    let mut hasher = SipHasher24::new_with_keys(handle.0, REVEAL_DOMAIN);
    hasher.write_u32(rarity_seed);
    hasher.write_u32(random_seed);
    RevealSeed(hasher.finish())
}

impl ContractGateway for SimulatedGateway {
    async fn create_lootbox(
        &self,
        item_count: ItemCount,
        rarity_seed: u32,
    ) -> GatewayResult<BoxHandle> {
        self.settle().await;

        let mut chain = self.chain.lock();
        if let Some(error) = chain.create_failures.pop_front() {
            tracing::warn!(%error, "createLootBox failed");
            return Err(error);
        }

        chain.calldata.push(encode_create(item_count.get(), rarity_seed));
        let handle = Self::commit(&mut chain, self.caller, item_count, rarity_seed);

        tracing::info!(
            handle = %handle,
            items = item_count.get(),
            block = chain.block_number,
            "LootBoxCreated"
        );
        Ok(handle)
    }

    async fn open_lootbox(
        &self,
        handle: BoxHandle,
        random_seed: u32,
    ) -> GatewayResult<Confirmation> {
        self.settle().await;

        let mut chain = self.chain.lock();
        if let Some(error) = chain.open_failures.pop_front() {
            tracing::warn!(handle = %handle, %error, "openLootBox failed");
            return Err(error);
        }

        let committed = *chain
            .committed
            .get(&handle)
            .ok_or(GatewayError::UnknownBox(handle))?;
        if committed.owner != self.caller {
            return Err(GatewayError::NotOwner(handle));
        }
        if chain.stats.get_box(handle).is_some_and(|b| b.opened) {
            return Err(GatewayError::AlreadyOpened(handle));
        }

        chain.calldata.push(encode_open(handle.to_u256(), random_seed));
        let block_number = chain.mine();
        chain.push_event(GatewayEvent::LootBoxOpened(LootBoxOpened {
            handle,
            owner: committed.owner,
            item_count: committed.item_count.get(),
            block_number,
        }));

        tracing::info!(handle = %handle, block = block_number, "LootBoxOpened");
        Ok(Confirmation {
            handle,
            item_count: committed.item_count,
            reveal_seed: reveal_seed(handle, committed.rarity_seed, random_seed),
            block_number,
        })
    }

    async fn player_stats(&self, account: Address) -> GatewayResult<PlayerStats> {
        self.settle().await;

        let mut chain = self.chain.lock();
        chain.calldata.push(encode_player_stats(account));
        Ok(chain.stats.player_stats(&account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(caller: Address) -> SimulatedGateway {
        SimulatedGateway::with_latency(caller, GatewayConfig::default(), Duration::ZERO)
    }

    fn count(n: u8) -> ItemCount {
        ItemCount::try_from(n).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_open() {
        let caller = Address::repeat_byte(7);
        let gw = gateway(caller);

        let handle = gw.create_lootbox(count(2), 99).await.unwrap();
        assert_eq!(handle, BoxHandle(1));

        let confirmation = gw.open_lootbox(handle, 5).await.unwrap();
        assert_eq!(confirmation.handle, handle);
        assert_eq!(confirmation.item_count, count(2));
        assert_eq!(confirmation.block_number, 2);

        let stats = gw.player_stats(caller).await.unwrap();
        assert_eq!(stats.boxes_opened, 1);
        assert_eq!(stats.total_items, 2);
        assert_eq!(gw.calldata().len(), 3);
    }

    #[tokio::test]
    async fn test_double_open_reverts() {
        let gw = gateway(Address::repeat_byte(1));
        let handle = gw.create_lootbox(count(1), 1).await.unwrap();

        gw.open_lootbox(handle, 1).await.unwrap();
        assert_eq!(
            gw.open_lootbox(handle, 2).await,
            Err(GatewayError::AlreadyOpened(handle))
        );
    }

    #[tokio::test]
    async fn test_unknown_and_foreign_boxes() {
        let gw = gateway(Address::repeat_byte(1));
        assert_eq!(
            gw.open_lootbox(BoxHandle(77), 0).await,
            Err(GatewayError::UnknownBox(BoxHandle(77)))
        );

        let foreign = gw.commit_foreign_box(Address::repeat_byte(2), count(3));
        assert_eq!(
            gw.open_lootbox(foreign, 0).await,
            Err(GatewayError::NotOwner(foreign))
        );
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_once() {
        let gw = gateway(Address::repeat_byte(1));
        gw.fail_next_create(GatewayError::UserRejected);

        assert_eq!(
            gw.create_lootbox(count(1), 1).await,
            Err(GatewayError::UserRejected)
        );
        assert!(gw.create_lootbox(count(1), 1).await.is_ok());
        // The rejected call never reached the chain.
        assert_eq!(gw.calldata().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_box_openable() {
        let gw = gateway(Address::repeat_byte(1));
        let handle = gw.create_lootbox(count(1), 1).await.unwrap();

        gw.fail_next_open(GatewayError::Network("timeout".into()));
        assert!(gw.open_lootbox(handle, 1).await.is_err());
        assert!(gw.open_lootbox(handle, 1).await.is_ok());
    }

    #[test]
    fn test_reveal_seed_binds_inputs() {
        let base = reveal_seed(BoxHandle(1), 10, 20);
        assert_eq!(base, reveal_seed(BoxHandle(1), 10, 20));
        assert_ne!(base, reveal_seed(BoxHandle(2), 10, 20));
        assert_ne!(base, reveal_seed(BoxHandle(1), 11, 20));
        assert_ne!(base, reveal_seed(BoxHandle(1), 10, 21));
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let gw = SimulatedGateway::with_latency(
            Address::repeat_byte(1),
            GatewayConfig::default(),
            Duration::from_millis(500),
        );
        let started = tokio::time::Instant::now();
        gw.create_lootbox(count(1), 1).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
