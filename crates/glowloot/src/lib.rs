//! # GLOWLOOT
//!
//! Fair lootbox lifecycle: boxes are committed encrypted through the
//! contract gateway and revealed exactly once, from the seed the gateway
//! confirms.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          LootSession                            │
//! │                                                                 │
//! │  LootBox (per id) ──open ok──> RaritySampler ──> SessionLedger  │
//! │     │    ▲                                           │          │
//! │     │    └── ProgressHandle (cosmetic ticking)       │          │
//! │     │                                                ▼          │
//! │     └──────────────── LootEvent ──────────────> EventBus        │
//! └──────────┬──────────────────────────────────────────────────────┘
//!            │ create / open / stats
//!            ▼
//!     ContractGateway  (glowloot_blockchain)
//! ```
//!
//! ## Modules
//!
//! - `lootbox`: the per-box state machine
//! - `session`: coordinates boxes, gateway, sampler and ledger
//! - `progress`: cancellable decryption progress
//! - `ledger`: session counters
//! - `events`: notification channel
//! - `seeds`: creation/open seeds
//! - `config`: runtime configuration

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod lootbox;
pub mod progress;
pub mod seeds;
pub mod session;

// Re-export the units
pub use glowloot_blockchain as blockchain;
pub use glowloot_economy as economy;

pub use config::{AppConfig, SessionConfig};
pub use error::{Action, ConfigError, LootBoxError, LootBoxResult, Violation};
pub use events::{EventBus, EventReceiver, EventSender, LootEvent};
pub use ledger::{LedgerSnapshot, SessionLedger};
pub use lootbox::{BoxId, LootBox, LootBoxSnapshot, LootBoxState};
pub use progress::{ProgressCoordinator, ProgressHandle, ProgressPhase, PROGRESS_MAX};
pub use seeds::{CreationParams, SeedSource};
pub use session::LootSession;
