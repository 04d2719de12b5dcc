//! # GLOWLOOT Demo
//!
//! Headless session against the local contract simulator.
//!
//! ```text
//! glowloot_demo [config.toml]
//! RUST_LOG=debug glowloot_demo
//! ```

use std::sync::Arc;

use glowloot::blockchain::{format_address, Address, SimulatedGateway};
use glowloot::economy::total_value;
use glowloot::{AppConfig, ConfigError, LootEvent, LootSession};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    // Configuration defects halt here.
    let sampler = Arc::new(config.build_sampler()?);

    let account = Address::repeat_byte(0x42);
    let gateway = Arc::new(SimulatedGateway::new(account, config.gateway.clone()));
    let session = Arc::new(LootSession::new(gateway, sampler, &config.session));
    let events = session.events();

    println!("===========================================");
    println!("GLOWLOOT - Fair Lootbox Demo");
    println!("===========================================");
    session.connect(account);
    println!("Wallet: {}", format_address(&account));

    let tasks: Vec<_> = session
        .box_ids()
        .into_iter()
        .map(|id| {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                let result = session.create_and_open(&id).await;
                (id, result)
            })
        })
        .collect();

    for task in tasks {
        let Ok((id, result)) = task.await else {
            tracing::error!("box task aborted");
            continue;
        };
        match result {
            Ok(items) => {
                println!("{id}: {} items worth {} coins", items.len(), total_value(&items));
                for item in &items {
                    println!("    [{}] {} ({} coins)", item.rarity, item.name, item.value);
                }
            }
            Err(error) => println!("{id}: {error}"),
        }
    }

    // A second open is always refused.
    if let Some(id) = session.box_ids().first() {
        if let Err(error) = session.open(id).await {
            println!("Re-open {id}: {error}");
        }
    }

    for event in events.drain() {
        match event {
            LootEvent::Revealed {
                box_id,
                total_value,
                tier,
                ..
            } => println!("Notification: {box_id} {tier:?} drop, {total_value} coins"),
            LootEvent::CreationFailed { box_id, reason }
            | LootEvent::RevealFailed { box_id, reason } => {
                println!("Notification: {box_id} failed: {reason}");
            }
            _ => {}
        }
    }

    match session.refresh_stats().await {
        Ok(_) => {}
        Err(error) => tracing::warn!(%error, "could not fetch player stats"),
    }
    let shown = session.ledger().display();
    println!(
        "Boxes opened: {}  Items found: {}",
        shown.boxes_opened, shown.total_items_found
    );
    Ok(())
}
