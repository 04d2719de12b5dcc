//! # Chain Stats State
//!
//! Per-account counters and box registry synchronized from contract events.
//! This is what `getPlayerStats` answers from.

use std::collections::HashMap;

use alloy_primitives::Address;

use crate::events::{GatewayEvent, LootBoxCreated, LootBoxOpened};
use crate::gateway::{BoxHandle, PlayerStats};

/// On-chain view of a single box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainBox {
    /// Owning account.
    pub owner: Address,
    /// Committed item count.
    pub item_count: u8,
    /// Whether `openLootBox` has succeeded.
    pub opened: bool,
}

/// State synchronized with the contract's event stream.
///
/// - O(1) lookups by box handle
/// - O(1) lookups of stats by account
pub struct ChainStatsState {
    /// Boxes indexed by handle.
    boxes: HashMap<BoxHandle, ChainBox>,
    /// Counters per account.
    stats: HashMap<Address, PlayerStats>,
    /// Last processed block number.
    last_block: u64,
    /// Total events processed.
    events_processed: u64,
}

impl ChainStatsState {
    /// Creates an empty state with pre-allocated capacity.
    #[must_use]
    pub fn new(box_capacity: usize, account_capacity: usize) -> Self {
        Self {
            boxes: HashMap::with_capacity(box_capacity),
            stats: HashMap::with_capacity(account_capacity),
            last_block: 0,
            events_processed: 0,
        }
    }

    /// Returns the last processed block number.
    #[inline]
    #[must_use]
    pub const fn last_block(&self) -> u64 {
        self.last_block
    }

    /// Returns the total number of events processed.
    #[inline]
    #[must_use]
    pub const fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Number of known boxes.
    #[inline]
    #[must_use]
    pub fn box_count(&self) -> usize {
        self.boxes.len()
    }

    /// Looks up a box.
    #[inline]
    #[must_use]
    pub fn get_box(&self, handle: BoxHandle) -> Option<&ChainBox> {
        self.boxes.get(&handle)
    }

    /// Authoritative counters for `account`. Zero for unknown accounts.
    #[must_use]
    pub fn player_stats(&self, account: &Address) -> PlayerStats {
        self.stats.get(account).copied().unwrap_or_default()
    }

    /// Applies one contract event.
    pub fn process_event(&mut self, event: &GatewayEvent) {
        match event {
            GatewayEvent::LootBoxCreated(created) => self.apply_created(created),
            GatewayEvent::LootBoxOpened(opened) => self.apply_opened(opened),
            GatewayEvent::NewBlock(block_number) => {
                self.last_block = self.last_block.max(*block_number);
            }
        }
        self.events_processed += 1;
    }

    fn apply_created(&mut self, created: &LootBoxCreated) {
        self.boxes.insert(
            created.handle,
            ChainBox {
                owner: created.owner,
                item_count: created.item_count,
                opened: false,
            },
        );
        self.last_block = self.last_block.max(created.block_number);
    }

    fn apply_opened(&mut self, opened: &LootBoxOpened) {
        // Replayed logs must not double count.
        let first_open = match self.boxes.get_mut(&opened.handle) {
            Some(chain_box) if chain_box.opened => false,
            Some(chain_box) => {
                chain_box.opened = true;
                true
            }
            None => {
                self.boxes.insert(
                    opened.handle,
                    ChainBox {
                        owner: opened.owner,
                        item_count: opened.item_count,
                        opened: true,
                    },
                );
                true
            }
        };

        if first_open {
            let stats = self.stats.entry(opened.owner).or_default();
            stats.boxes_opened += 1;
            stats.total_items += u64::from(opened.item_count);
        }
        self.last_block = self.last_block.max(opened.block_number);
    }

    /// Batch processes multiple events.
    pub fn process_batch<'a>(&mut self, events: impl Iterator<Item = &'a GatewayEvent>) {
        for event in events {
            self.process_event(event);
        }
    }
}

impl Default for ChainStatsState {
    fn default() -> Self {
        Self::new(1_024, 64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created(handle: u64, owner: Address, item_count: u8, block_number: u64) -> GatewayEvent {
        GatewayEvent::LootBoxCreated(LootBoxCreated {
            handle: BoxHandle(handle),
            owner,
            item_count,
            block_number,
        })
    }

    fn opened(handle: u64, owner: Address, item_count: u8, block_number: u64) -> GatewayEvent {
        GatewayEvent::LootBoxOpened(LootBoxOpened {
            handle: BoxHandle(handle),
            owner,
            item_count,
            block_number,
        })
    }

    #[test]
    fn test_state_creation() {
        let state = ChainStatsState::new(10, 2);
        assert_eq!(state.box_count(), 0);
        assert_eq!(state.last_block(), 0);
        assert_eq!(state.player_stats(&Address::ZERO), PlayerStats::default());
    }

    #[test]
    fn test_open_updates_owner_stats() {
        let mut state = ChainStatsState::default();
        let owner = Address::repeat_byte(1);

        state.process_event(&created(1, owner, 3, 10));
        assert_eq!(state.player_stats(&owner), PlayerStats::default());

        state.process_event(&opened(1, owner, 3, 12));
        assert_eq!(
            state.player_stats(&owner),
            PlayerStats {
                boxes_opened: 1,
                total_items: 3
            }
        );
        assert!(state.get_box(BoxHandle(1)).unwrap().opened);
        assert_eq!(state.last_block(), 12);
    }

    #[test]
    fn test_replayed_open_is_not_double_counted() {
        let mut state = ChainStatsState::default();
        let owner = Address::repeat_byte(2);
        let events = [created(5, owner, 2, 1), opened(5, owner, 2, 2), opened(5, owner, 2, 2)];

        state.process_batch(events.iter());

        assert_eq!(state.player_stats(&owner).boxes_opened, 1);
        assert_eq!(state.player_stats(&owner).total_items, 2);
        assert_eq!(state.events_processed(), 3);
    }

    #[test]
    fn test_accounts_are_isolated() {
        let mut state = ChainStatsState::default();
        let alice = Address::repeat_byte(0xa);
        let bob = Address::repeat_byte(0xb);

        state.process_batch(
            [
                created(1, alice, 1, 1),
                created(2, bob, 2, 1),
                opened(1, alice, 1, 2),
                GatewayEvent::NewBlock(9),
            ]
            .iter(),
        );

        assert_eq!(state.player_stats(&alice).boxes_opened, 1);
        assert_eq!(state.player_stats(&bob).boxes_opened, 0);
        assert_eq!(state.last_block(), 9);
    }
}
