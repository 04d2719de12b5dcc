//! # Lootbox State Machine
//!
//! ```text
//! Locked ──create──> Creating ──confirmed──> PendingReveal ──> Decrypting
//!   ▲                   │                                         │
//!   │                   │ gateway error                 open ok   │ open error
//!   │                   ▼                                 ▼       ▼
//!   └──────retry───── Failed <─────────────────────── Revealed  Failed
//! ```
//!
//! Every method validates the current state before mutating anything. A
//! rejected transition leaves the box untouched and returns
//! [`LootBoxError::ProtocolViolation`].
//!
//! `revealed_items` is non-empty iff the state is `Revealed`, and is
//! assigned exactly once.

use std::collections::HashSet;

use glowloot_blockchain::BoxHandle;
use glowloot_economy::{total_value, ItemCount, LootItem};

use crate::error::{Action, LootBoxError, LootBoxResult, Violation};
use crate::progress::{ProgressHandle, PROGRESS_MAX};

/// Stable external identifier of a box.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxId(String);

impl BoxId {
    /// Wraps an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BoxId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BoxId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BoxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LootBoxState {
    /// Initial. Waiting for a create action.
    Locked,
    /// `createLootBox` in flight.
    Creating,
    /// Committed on-chain, not yet decrypting.
    PendingReveal,
    /// Progress accruing; open may be in flight.
    Decrypting,
    /// Items assigned. Terminal.
    Revealed,
    /// Attempt failed. Terminal until retried.
    Failed,
}

impl LootBoxState {
    /// Whether no further transition is accepted for this attempt.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Revealed | Self::Failed)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Creating => "creating",
            Self::PendingReveal => "pending-reveal",
            Self::Decrypting => "decrypting",
            Self::Revealed => "revealed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LootBoxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A lootbox owned by a session.
#[derive(Debug)]
pub struct LootBox {
    id: BoxId,
    state: LootBoxState,
    /// 1-based; bumped by `retry`.
    attempt: u32,
    item_count: Option<ItemCount>,
    rarity_seed: Option<u32>,
    /// Every rarity seed ever committed for this id.
    committed_seeds: HashSet<u32>,
    handle: Option<BoxHandle>,
    revealed_items: Vec<LootItem>,
    progress: Option<ProgressHandle>,
    open_in_flight: bool,
}

impl LootBox {
    /// A fresh box in `Locked`.
    #[must_use]
    pub fn new(id: BoxId) -> Self {
        Self {
            id,
            state: LootBoxState::Locked,
            attempt: 1,
            item_count: None,
            rarity_seed: None,
            committed_seeds: HashSet::new(),
            handle: None,
            revealed_items: Vec::new(),
            progress: None,
            open_in_flight: false,
        }
    }

    /// Box id.
    #[must_use]
    pub const fn id(&self) -> &BoxId {
        &self.id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> LootBoxState {
        self.state
    }

    /// Current attempt number.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Item count of the current attempt.
    #[must_use]
    pub const fn item_count(&self) -> Option<ItemCount> {
        self.item_count
    }

    /// Rarity seed of the current attempt.
    #[must_use]
    pub const fn rarity_seed(&self) -> Option<u32> {
        self.rarity_seed
    }

    /// Gateway handle, once creation is confirmed.
    #[must_use]
    pub const fn handle(&self) -> Option<BoxHandle> {
        self.handle
    }

    /// Revealed items. Empty unless `Revealed`.
    #[must_use]
    pub fn revealed_items(&self) -> &[LootItem] {
        &self.revealed_items
    }

    /// Progress in `[0, 100]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        match &self.progress {
            Some(progress) => progress.value(),
            None if self.state == LootBoxState::Revealed => PROGRESS_MAX,
            None => 0.0,
        }
    }

    /// Whether an open call is outstanding.
    #[must_use]
    pub const fn open_in_flight(&self) -> bool {
        self.open_in_flight
    }

    fn reject(&self, action: Action) -> LootBoxError {
        let violation = match self.state {
            LootBoxState::Revealed => Violation::AlreadyRevealed,
            LootBoxState::Failed => Violation::AlreadyFailed,
            from => Violation::TransitionRejected { from, action },
        };
        LootBoxError::violation(&self.id, violation)
    }

    fn transition(&mut self, to: LootBoxState) {
        tracing::info!(
            box_id = %self.id,
            attempt = self.attempt,
            from = %self.state,
            to = %to,
            "lootbox transition"
        );
        self.state = to;
    }

    /// Whether `begin_create` would get past its state and authorization
    /// checks. Lets callers hold off drawing a seed until it will be used.
    ///
    /// # Errors
    ///
    /// Same as `begin_create`, minus the seed check.
    pub fn check_create(&self, can_open: bool) -> LootBoxResult<()> {
        if self.state != LootBoxState::Locked {
            return Err(self.reject(Action::Create));
        }
        if !can_open {
            tracing::warn!(box_id = %self.id, "create rejected: session not authorized");
            return Err(LootBoxError::Authorization {
                box_id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// `Locked -> Creating`.
    ///
    /// # Errors
    ///
    /// - `Authorization` if `can_open` is false (box stays `Locked`)
    /// - `ProtocolViolation` if not `Locked`, or `rarity_seed` was already
    ///   committed for this id
    pub fn begin_create(
        &mut self,
        can_open: bool,
        item_count: ItemCount,
        rarity_seed: u32,
    ) -> LootBoxResult<()> {
        self.check_create(can_open)?;
        if !self.committed_seeds.insert(rarity_seed) {
            return Err(LootBoxError::violation(
                &self.id,
                Violation::SeedReused(rarity_seed),
            ));
        }

        self.item_count = Some(item_count);
        self.rarity_seed = Some(rarity_seed);
        self.transition(LootBoxState::Creating);
        Ok(())
    }

    /// `Creating -> PendingReveal`, binding the gateway handle.
    ///
    /// # Errors
    ///
    /// `ProtocolViolation` if not `Creating`.
    pub fn confirm_created(&mut self, handle: BoxHandle) -> LootBoxResult<()> {
        if self.state != LootBoxState::Creating {
            return Err(self.reject(Action::ConfirmCreated));
        }
        self.handle = Some(handle);
        self.transition(LootBoxState::PendingReveal);
        Ok(())
    }

    /// `PendingReveal -> Decrypting`, taking ownership of the progress task.
    ///
    /// # Errors
    ///
    /// `ProtocolViolation` if not `PendingReveal`. The handle is dropped,
    /// which cancels its task.
    pub fn begin_decrypting(&mut self, progress: ProgressHandle) -> LootBoxResult<()> {
        if self.state != LootBoxState::PendingReveal {
            return Err(self.reject(Action::Decrypt));
        }
        self.progress = Some(progress);
        self.transition(LootBoxState::Decrypting);
        Ok(())
    }

    /// Claims the right to call `openLootBox`.
    ///
    /// Only valid once creation has been observed (`PendingReveal` or
    /// `Decrypting`), and only one claim may be outstanding.
    ///
    /// # Errors
    ///
    /// `ProtocolViolation` with `AlreadyRevealed`, `AlreadyFailed`,
    /// `NotCreated` or `OpenInFlight`.
    pub fn begin_open(&mut self) -> LootBoxResult<BoxHandle> {
        let violation = match self.state {
            LootBoxState::Revealed => Some(Violation::AlreadyRevealed),
            LootBoxState::Failed => Some(Violation::AlreadyFailed),
            LootBoxState::Locked | LootBoxState::Creating => Some(Violation::NotCreated),
            LootBoxState::PendingReveal | LootBoxState::Decrypting if self.open_in_flight => {
                Some(Violation::OpenInFlight)
            }
            LootBoxState::PendingReveal | LootBoxState::Decrypting => None,
        };
        if let Some(violation) = violation {
            return Err(LootBoxError::violation(&self.id, violation));
        }

        let Some(handle) = self.handle else {
            return Err(LootBoxError::violation(&self.id, Violation::NotCreated));
        };
        self.open_in_flight = true;
        Ok(handle)
    }

    /// `Decrypting -> Revealed`. Assigns the items, exactly once.
    ///
    /// From `PendingReveal` (an open claimed before `begin_decrypting`) the
    /// box passes through `Decrypting` without a progress task.
    ///
    /// # Errors
    ///
    /// `ProtocolViolation` if not `PendingReveal` or `Decrypting`, or if
    /// `items` does not match the committed item count.
    pub fn reveal(&mut self, items: Vec<LootItem>) -> LootBoxResult<()> {
        if !matches!(
            self.state,
            LootBoxState::PendingReveal | LootBoxState::Decrypting
        ) {
            return Err(self.reject(Action::Reveal));
        }
        let expected = self.item_count.map_or(0, ItemCount::get);
        if items.is_empty() || items.len() != usize::from(expected) {
            return Err(LootBoxError::violation(
                &self.id,
                Violation::ItemCountMismatch {
                    expected,
                    actual: items.len(),
                },
            ));
        }

        if self.state == LootBoxState::PendingReveal {
            self.transition(LootBoxState::Decrypting);
        }
        if let Some(progress) = self.progress.as_mut() {
            progress.complete();
        }
        self.open_in_flight = false;
        self.revealed_items = items;
        self.transition(LootBoxState::Revealed);
        tracing::info!(
            box_id = %self.id,
            items = self.revealed_items.len(),
            value = total_value(&self.revealed_items),
            "lootbox revealed"
        );
        Ok(())
    }

    /// `Creating | PendingReveal | Decrypting -> Failed`.
    ///
    /// Progress is abandoned and no items are assigned.
    ///
    /// # Errors
    ///
    /// `ProtocolViolation` from any other state.
    pub fn fail(&mut self) -> LootBoxResult<()> {
        match self.state {
            LootBoxState::Creating | LootBoxState::PendingReveal | LootBoxState::Decrypting => {}
            _ => return Err(self.reject(Action::Fail)),
        }
        if let Some(progress) = self.progress.as_mut() {
            progress.abandon();
        }
        self.open_in_flight = false;
        self.transition(LootBoxState::Failed);
        Ok(())
    }

    /// `Failed -> Locked` as a new attempt. Returns the new attempt number.
    ///
    /// The next `begin_create` must use a rarity seed never committed for
    /// this id.
    ///
    /// # Errors
    ///
    /// `ProtocolViolation` unless `Failed`.
    pub fn retry(&mut self) -> LootBoxResult<u32> {
        if self.state != LootBoxState::Failed {
            let violation = match self.state {
                LootBoxState::Revealed => Violation::AlreadyRevealed,
                from => Violation::TransitionRejected {
                    from,
                    action: Action::Retry,
                },
            };
            return Err(LootBoxError::violation(&self.id, violation));
        }

        self.attempt += 1;
        self.item_count = None;
        self.rarity_seed = None;
        self.handle = None;
        self.progress = None;
        self.transition(LootBoxState::Locked);
        Ok(self.attempt)
    }

    /// Read-only copy for display.
    #[must_use]
    pub fn snapshot(&self) -> LootBoxSnapshot {
        LootBoxSnapshot {
            id: self.id.clone(),
            state: self.state,
            attempt: self.attempt,
            item_count: self.item_count,
            handle: self.handle,
            revealed_items: self.revealed_items.clone(),
            total_value: total_value(&self.revealed_items),
            progress: self.progress(),
        }
    }
}

/// Point-in-time copy of a box.
#[derive(Clone, Debug, PartialEq)]
pub struct LootBoxSnapshot {
    /// Box id.
    pub id: BoxId,
    /// State at snapshot time.
    pub state: LootBoxState,
    /// Attempt number.
    pub attempt: u32,
    /// Committed item count, if any.
    pub item_count: Option<ItemCount>,
    /// Gateway handle, if created.
    pub handle: Option<BoxHandle>,
    /// Revealed items.
    pub revealed_items: Vec<LootItem>,
    /// Sum of item values.
    pub total_value: u64,
    /// Progress in `[0, 100]`.
    pub progress: f64,
}
