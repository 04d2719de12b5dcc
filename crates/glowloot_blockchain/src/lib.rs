//! # GLOWLOOT Contract Gateway
//!
//! The single channel between the lootbox lifecycle and the `GlowLootFair`
//! contract that holds the authoritative, encrypted box state.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  create/open   ┌─────────────────┐
//! │  LootSession    │ ─────────────▶ │ ContractGateway │
//! │  (lifecycle)    │ ◀───────────── │  (async, slow)  │
//! └─────────────────┘  handle/conf   └────────┬────────┘
//!                                             │ events
//!                                             ▼
//!                                    ┌─────────────────┐
//!                                    │ ChainStatsState │
//!                                    │ (per account)   │
//!                                    └─────────────────┘
//! ```
//!
//! ## Delivery Semantics
//!
//! Calls are at-most-once from the caller's intent. A call has neither
//! succeeded nor failed until its future resolves. Nothing in this crate
//! retries on its own.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod contracts;
pub mod events;
pub mod gateway;
pub mod simulator;
pub mod state;

pub use contracts::{format_address, GatewayConfig};
pub use events::{GatewayEvent, LootBoxCreated, LootBoxOpened};
pub use gateway::{
    BoxHandle, Confirmation, ContractGateway, GatewayError, GatewayResult, PlayerStats,
};
pub use simulator::SimulatedGateway;
pub use state::ChainStatsState;

pub use alloy_primitives::Address;
