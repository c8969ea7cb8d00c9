//! Quill: a signed chat relay, exercised by simulated players.

mod client;
mod config;
mod logging;
mod server;
mod simulation;

use std::path::Path;
use std::sync::Arc;

use quill_crypto::KeyStore;
use rustc_hash::FxHashSet;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;

use crate::config::QuillConfig;

const CONFIG_PATH: &str = "config/quill.json5";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = QuillConfig::load_or_create(Path::new(CONFIG_PATH))?;
    logging::init(&config.log_filter)?;

    let cancel_token = CancellationToken::new();
    let shutdown = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutting down...");
            shutdown.cancel();
        }
    });

    let key_store = Arc::new(spawn_blocking(KeyStore::create).await??);
    log::info!(
        "Starting relay with {} simulated players",
        config.players.len()
    );

    let reports = simulation::run(&config, key_store, cancel_token).await?;
    for report in &reports {
        let trusted = report.received.iter().filter(|l| l.trusted).count();
        let senders: FxHashSet<_> = report.received.iter().map(|l| l.sender).collect();
        log::info!(
            "{}: {trusted}/{} chat messages secure from {} players, {} system messages, {} unsent{}",
            report.name,
            report.received.len(),
            senders.len(),
            report.system.len(),
            report.failed_to_send,
            if report.closed_by_server {
                ", disconnected by server"
            } else {
                ""
            }
        );
    }
    Ok(())
}
