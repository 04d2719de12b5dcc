//! # Session Ledger
//!
//! Opened-box and found-item counters for one session.
//!
//! `record_reveal` is the only path that increments the local counters.
//! Chain stats fetched on reconciliation are kept beside them and take
//! precedence for display, without touching the local counts.

use glowloot_blockchain::PlayerStats;
use glowloot_economy::LootItem;
use parking_lot::Mutex;

/// Point-in-time counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Boxes revealed this session.
    pub boxes_opened: u64,
    /// Items found this session.
    pub total_items_found: u64,
}

#[derive(Debug, Default)]
struct LedgerState {
    local: LedgerSnapshot,
    chain: Option<PlayerStats>,
}

/// Process-wide aggregate, safe to share between concurrently revealing
/// boxes.
#[derive(Debug, Default)]
pub struct SessionLedger {
    state: Mutex<LedgerState>,
}

impl SessionLedger {
    /// Empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one successful reveal. Both counters move together.
    pub fn record_reveal(&self, items: &[LootItem]) {
        let mut state = self.state.lock();
        state.local.boxes_opened += 1;
        state.local.total_items_found += items.len() as u64;
        tracing::debug!(
            boxes_opened = state.local.boxes_opened,
            total_items_found = state.local.total_items_found,
            "ledger updated"
        );
    }

    /// Local counters.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.state.lock().local
    }

    /// Stores authoritative counts from the chain.
    pub fn reconcile(&self, stats: PlayerStats) {
        let mut state = self.state.lock();
        if state.local.boxes_opened > stats.boxes_opened {
            tracing::debug!(
                local = state.local.boxes_opened,
                chain = stats.boxes_opened,
                "chain stats lag local reveals"
            );
        }
        state.chain = Some(stats);
    }

    /// Last reconciled chain counts.
    #[must_use]
    pub fn chain_stats(&self) -> Option<PlayerStats> {
        self.state.lock().chain
    }

    /// Forgets chain counts (wallet disconnected).
    pub fn clear_chain_stats(&self) {
        self.state.lock().chain = None;
    }

    /// Counts to show: chain stats when known, local otherwise.
    #[must_use]
    pub fn display(&self) -> LedgerSnapshot {
        let state = self.state.lock();
        state.chain.map_or(state.local, |chain| LedgerSnapshot {
            boxes_opened: chain.boxes_opened,
            total_items_found: chain.total_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowloot_economy::Catalog;
    use std::sync::Arc;

    #[test]
    fn test_record_reveal() {
        let ledger = SessionLedger::new();
        let items = Catalog::default().items()[..3].to_vec();

        ledger.record_reveal(&items);
        ledger.record_reveal(&items[..1]);

        assert_eq!(
            ledger.snapshot(),
            LedgerSnapshot {
                boxes_opened: 2,
                total_items_found: 4
            }
        );
    }

    #[test]
    fn test_concurrent_reveals_are_consistent() {
        let ledger = Arc::new(SessionLedger::new());
        let items = Catalog::default().items()[..2].to_vec();

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let items = items.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        ledger.record_reveal(&items);
                        let snap = ledger.snapshot();
                        // Never a half-applied increment.
                        assert_eq!(snap.total_items_found, snap.boxes_opened * 2);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(ledger.snapshot().boxes_opened, 8_000);
        assert_eq!(ledger.snapshot().total_items_found, 16_000);
    }

    #[test]
    fn test_reconcile_prefers_chain_for_display_only() {
        let ledger = SessionLedger::new();
        ledger.record_reveal(&Catalog::default().items()[..1]);

        ledger.reconcile(PlayerStats {
            boxes_opened: 10,
            total_items: 25,
        });
        assert_eq!(ledger.display().boxes_opened, 10);
        assert_eq!(ledger.display().total_items_found, 25);
        assert_eq!(ledger.snapshot().boxes_opened, 1);

        ledger.clear_chain_stats();
        assert_eq!(ledger.display(), ledger.snapshot());
    }
}
