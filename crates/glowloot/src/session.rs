//! # Loot Session
//!
//! Drives boxes through the lifecycle against a [`ContractGateway`].
//!
//! ## Concurrency
//!
//! - Each box sits behind its own mutex. A transition locks, validates,
//!   mutates and unlocks. No lock is held across a gateway call.
//! - Different boxes progress independently. Their only shared mutable
//!   state is the [`SessionLedger`] and the reveal registry.
//! - The reveal registry is keyed by gateway handle. A handle can produce
//!   items once per session, whatever box claims it.
//!
//! ## Cancellation
//!
//! `create` and `open` may be dropped while their gateway call is pending
//! (a timeout, `select!`, an aborted task). The box is then failed and a
//! failure event sent, so it can be retried with a fresh seed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use glowloot_blockchain::{
    Address, BoxHandle, ContractGateway, GatewayError, GatewayResult, PlayerStats,
};
use glowloot_economy::{total_value, LootItem, RaritySampler, RevealTier};
use parking_lot::{Mutex, RwLock};

use crate::config::SessionConfig;
use crate::error::{Action, LootBoxError, LootBoxResult, Violation};
use crate::events::{EventBus, EventReceiver, EventSender, LootEvent};
use crate::ledger::SessionLedger;
use crate::lootbox::{BoxId, LootBox, LootBoxSnapshot};
use crate::progress::ProgressCoordinator;
use crate::seeds::SeedSource;

/// One player session.
pub struct LootSession<G: ContractGateway> {
    gateway: Arc<G>,
    sampler: Arc<RaritySampler>,
    ledger: Arc<SessionLedger>,
    boxes: RwLock<HashMap<BoxId, Arc<Mutex<LootBox>>>>,
    revealed_handles: Mutex<HashSet<BoxHandle>>,
    progress: ProgressCoordinator,
    seeds: SeedSource,
    events: EventBus,
    sender: EventSender,
    account: RwLock<Option<Address>>,
    confirmation_delay: Duration,
}

impl<G: ContractGateway> LootSession<G> {
    /// Creates a session with the configured boxes registered, seeded from
    /// OS entropy.
    #[must_use]
    pub fn new(gateway: Arc<G>, sampler: Arc<RaritySampler>, config: &SessionConfig) -> Self {
        let events = EventBus::new(config.event_capacity);
        let sender = events.sender();
        let session = Self {
            gateway,
            sampler,
            ledger: Arc::new(SessionLedger::new()),
            boxes: RwLock::new(HashMap::new()),
            revealed_handles: Mutex::new(HashSet::new()),
            progress: ProgressCoordinator::new(config.tick_interval(), config.max_progress_step),
            seeds: SeedSource::from_entropy(),
            events,
            sender,
            account: RwLock::new(None),
            confirmation_delay: config.confirmation_delay(),
        };
        for id in config.box_ids() {
            session.register_box(id);
        }
        session
    }

    /// Replaces the seed source.
    #[must_use]
    pub fn with_seeds(mut self, seeds: SeedSource) -> Self {
        self.seeds = seeds;
        self
    }

    /// Replaces the progress coordinator.
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressCoordinator) -> Self {
        self.progress = progress;
        self
    }

    /// Authorizes the session for `account`.
    pub fn connect(&self, account: Address) {
        *self.account.write() = Some(account);
        tracing::info!(%account, "wallet connected");
    }

    /// Drops authorization and any reconciled chain stats. In-flight calls
    /// still complete.
    pub fn disconnect(&self) {
        *self.account.write() = None;
        self.ledger.clear_chain_stats();
        tracing::info!("wallet disconnected");
    }

    /// Connected account.
    #[must_use]
    pub fn account(&self) -> Option<Address> {
        *self.account.read()
    }

    /// Whether create actions are authorized.
    #[must_use]
    pub fn can_open(&self) -> bool {
        self.account.read().is_some()
    }

    /// Adds a box in `Locked`. Returns `false` if the id is taken.
    pub fn register_box(&self, id: BoxId) -> bool {
        let mut boxes = self.boxes.write();
        if boxes.contains_key(&id) {
            return false;
        }
        boxes.insert(id.clone(), Arc::new(Mutex::new(LootBox::new(id))));
        true
    }

    /// Registered ids, sorted.
    #[must_use]
    pub fn box_ids(&self) -> Vec<BoxId> {
        let mut ids: Vec<_> = self.boxes.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Point-in-time copy of a box.
    ///
    /// # Errors
    ///
    /// [`LootBoxError::UnknownBox`].
    pub fn snapshot(&self, id: &BoxId) -> LootBoxResult<LootBoxSnapshot> {
        Ok(self.entry(id)?.lock().snapshot())
    }

    /// Shared ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<SessionLedger> {
        &self.ledger
    }

    /// Receiver for lifecycle notifications.
    #[must_use]
    pub fn events(&self) -> EventReceiver {
        self.events.receiver()
    }

    /// The sampler used for reveals.
    #[must_use]
    pub fn sampler(&self) -> &RaritySampler {
        &self.sampler
    }

    fn entry(&self, id: &BoxId) -> LootBoxResult<Arc<Mutex<LootBox>>> {
        self.boxes
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| LootBoxError::UnknownBox(id.clone()))
    }

    /// `Locked -> Creating -> PendingReveal -> Decrypting`.
    ///
    /// # Errors
    ///
    /// - `Authorization` when not connected; the box stays `Locked`
    /// - `CreationFailed` when the gateway rejects; the box is `Failed`
    /// - `ProtocolViolation` when the box is not `Locked`
    pub async fn create(&self, id: &BoxId) -> LootBoxResult<BoxHandle> {
        let entry = self.entry(id)?;
        let params = {
            let mut lootbox = entry.lock();
            let can_open = self.can_open();
            // Seeds are only drawn for a create that will go through.
            lootbox.check_create(can_open)?;
            let params = self.seeds.creation_params(id);
            lootbox.begin_create(can_open, params.item_count, params.rarity_seed)?;
            params
        };
        let pending = PendingCall::new(&entry, &self.sender, id, Action::Create);
        self.sender.send(LootEvent::CreationStarted {
            box_id: id.clone(),
            item_count: params.item_count.get(),
        });

        let result = self
            .gateway
            .create_lootbox(params.item_count, params.rarity_seed)
            .await;
        pending.settle();

        let mut lootbox = entry.lock();
        match result {
            Ok(handle) => {
                lootbox.confirm_created(handle)?;
                lootbox.begin_decrypting(self.progress.start(id))?;
                drop(lootbox);

                self.sender.send(LootEvent::DecryptionStarted { box_id: id.clone() });
                Ok(handle)
            }
            Err(source) => {
                lootbox.fail()?;
                drop(lootbox);

                tracing::warn!(box_id = %id, error = %source, "lootbox creation failed");
                self.sender.send(LootEvent::CreationFailed {
                    box_id: id.clone(),
                    reason: source.to_string(),
                });
                Err(LootBoxError::CreationFailed {
                    box_id: id.clone(),
                    source,
                })
            }
        }
    }

    /// `Decrypting -> Revealed | Failed`. Returns the revealed items.
    ///
    /// The sampler runs here and nowhere else, on the seed the gateway
    /// confirmed.
    ///
    /// # Errors
    ///
    /// - `ProtocolViolation` without any gateway call when the box is not
    ///   created, already revealed, failed, or has an open in flight
    /// - `OpenFailed` when the gateway rejects; the box is `Failed`
    pub async fn open(&self, id: &BoxId) -> LootBoxResult<Vec<LootItem>> {
        let entry = self.entry(id)?;
        let handle = entry.lock().begin_open()?;
        let pending = PendingCall::new(&entry, &self.sender, id, Action::Open);
        let random_seed = self.seeds.open_seed();

        tracing::info!(box_id = %id, handle = %handle, "openLootBox issued");
        let result = self.gateway.open_lootbox(handle, random_seed).await;
        pending.settle();

        let mut lootbox = entry.lock();
        let confirmation = match result {
            Ok(confirmation) => confirmation,
            Err(source) => {
                lootbox.fail()?;
                drop(lootbox);
                return Err(self.open_failed(id, source));
            }
        };

        if confirmation.handle != handle || Some(confirmation.item_count) != lootbox.item_count() {
            lootbox.fail()?;
            drop(lootbox);
            return Err(self.open_failed(
                id,
                GatewayError::Reverted(format!(
                    "confirmation for {} does not match committed box {handle}",
                    confirmation.handle
                )),
            ));
        }

        if !self.revealed_handles.lock().insert(handle) {
            // Never leave the box stuck in Decrypting.
            lootbox.fail()?;
            drop(lootbox);
            tracing::warn!(box_id = %id, handle = %handle, "handle already revealed");
            self.sender.send(LootEvent::RevealFailed {
                box_id: id.clone(),
                reason: format!("handle {handle} already revealed"),
            });
            return Err(LootBoxError::violation(
                id,
                Violation::DuplicateReveal(handle),
            ));
        }

        let items = self
            .sampler
            .sample(confirmation.reveal_seed, confirmation.item_count);
        if let Err(error) = lootbox.reveal(items.clone()) {
            self.revealed_handles.lock().remove(&handle);
            return Err(error);
        }
        drop(lootbox);

        self.ledger.record_reveal(&items);
        self.sender.send(LootEvent::Revealed {
            box_id: id.clone(),
            total_value: total_value(&items),
            tier: RevealTier::classify(&items),
            items: items.clone(),
        });
        Ok(items)
    }

    fn open_failed(&self, id: &BoxId, source: GatewayError) -> LootBoxError {
        tracing::warn!(box_id = %id, error = %source, "lootbox open failed");
        self.sender.send(LootEvent::RevealFailed {
            box_id: id.clone(),
            reason: source.to_string(),
        });
        LootBoxError::OpenFailed {
            box_id: id.clone(),
            source,
        }
    }

    /// Create, wait for the confirmation delay, then open.
    ///
    /// # Errors
    ///
    /// Any error from [`create`](Self::create) or [`open`](Self::open).
    pub async fn create_and_open(&self, id: &BoxId) -> LootBoxResult<Vec<LootItem>> {
        self.create(id).await?;
        if !self.confirmation_delay.is_zero() {
            tokio::time::sleep(self.confirmation_delay).await;
        }
        self.open(id).await
    }

    /// Starts a new attempt on a failed box. Returns the attempt number.
    ///
    /// # Errors
    ///
    /// `ProtocolViolation` unless the box is `Failed`.
    pub fn retry(&self, id: &BoxId) -> LootBoxResult<u32> {
        self.entry(id)?.lock().retry()
    }

    /// Fetches authoritative counts and reconciles the ledger.
    ///
    /// Returns `None` when no wallet is connected.
    ///
    /// # Errors
    ///
    /// Gateway failure; the ledger is left as it was.
    pub async fn refresh_stats(&self) -> GatewayResult<Option<PlayerStats>> {
        let Some(account) = self.account() else {
            return Ok(None);
        };
        let stats = self.gateway.player_stats(account).await?;
        self.ledger.reconcile(stats);
        tracing::debug!(
            %account,
            boxes_opened = stats.boxes_opened,
            total_items = stats.total_items,
            "player stats reconciled"
        );
        Ok(Some(stats))
    }
}

/// A gateway call in flight for one box.
///
/// Dropped unsettled, it fails the box and reports the abandoned call.
struct PendingCall<'a> {
    entry: &'a Mutex<LootBox>,
    sender: &'a EventSender,
    id: &'a BoxId,
    action: Action,
    settled: bool,
}

impl<'a> PendingCall<'a> {
    fn new(
        entry: &'a Mutex<LootBox>,
        sender: &'a EventSender,
        id: &'a BoxId,
        action: Action,
    ) -> Self {
        Self {
            entry,
            sender,
            id,
            action,
            settled: false,
        }
    }

    /// The call resolved; the caller handles the outcome.
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if self.entry.lock().fail().is_err() {
            return;
        }

        tracing::warn!(box_id = %self.id, action = %self.action, "gateway call abandoned");
        let box_id = self.id.clone();
        let reason = format!("{} call abandoned before confirmation", self.action);
        self.sender.send(match self.action {
            Action::Create => LootEvent::CreationFailed { box_id, reason },
            _ => LootEvent::RevealFailed { box_id, reason },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowloot_blockchain::{GatewayConfig, SimulatedGateway};
    use glowloot_economy::LootConfig;

    use crate::lootbox::LootBoxState;

    fn session() -> (Arc<SimulatedGateway>, LootSession<SimulatedGateway>) {
        let account = Address::repeat_byte(0x11);
        let gateway = Arc::new(SimulatedGateway::with_latency(
            account,
            GatewayConfig::default(),
            Duration::ZERO,
        ));
        let sampler = Arc::new(LootConfig::default().build_sampler().unwrap());
        let config = SessionConfig {
            confirmation_delay_ms: 0,
            ..SessionConfig::default()
        };
        let session = LootSession::new(Arc::clone(&gateway), sampler, &config)
            .with_seeds(SeedSource::seeded(3))
            .with_progress(ProgressCoordinator::seeded(config.tick_interval(), 15.0, 3));
        session.connect(account);
        (gateway, session)
    }

    #[tokio::test]
    async fn test_reveal_matches_sampler_decode() {
        let (gateway, session) = session();
        let id = BoxId::from("box-1");

        let items = session.create_and_open(&id).await.unwrap();
        let snapshot = session.snapshot(&id).unwrap();

        assert_eq!(snapshot.state, LootBoxState::Revealed);
        assert_eq!(snapshot.revealed_items, items);
        assert_eq!(Some(items.len() as u8), snapshot.item_count.map(|c| c.get()));
        assert_eq!(gateway.events().len(), 4);
    }

    #[tokio::test]
    async fn test_open_while_locked_issues_no_call() {
        let (gateway, session) = session();
        let err = session.open(&BoxId::from("box-2")).await.unwrap_err();

        assert_eq!(err.as_violation(), Some(&Violation::NotCreated));
        assert!(gateway.calldata().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_create_draws_no_seed() {
        let (gateway, session) = session();
        let id = BoxId::from("box-1");

        session.disconnect();
        for _ in 0..5 {
            assert!(session.create(&id).await.is_err());
        }
        assert_eq!(session.seeds.issued_for(&id), 0);

        session.connect(Address::repeat_byte(0x11));
        session.create(&id).await.unwrap();
        // Not Locked any more: rejected before a seed is drawn.
        assert!(session.create(&id).await.is_err());
        assert_eq!(session.seeds.issued_for(&id), 1);
        assert_eq!(gateway.calldata().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_box() {
        let (_, session) = session();
        let id = BoxId::from("nope");
        assert_eq!(
            session.create(&id).await.unwrap_err(),
            LootBoxError::UnknownBox(id)
        );
    }

    #[tokio::test]
    async fn test_refresh_stats_requires_wallet() {
        let (_, session) = session();
        session.create_and_open(&BoxId::from("box-1")).await.unwrap();

        let stats = session.refresh_stats().await.unwrap().unwrap();
        assert_eq!(stats.boxes_opened, 1);
        assert_eq!(session.ledger().display().boxes_opened, 1);

        session.disconnect();
        assert_eq!(session.refresh_stats().await.unwrap(), None);
        assert!(session.ledger().chain_stats().is_none());
    }
}
