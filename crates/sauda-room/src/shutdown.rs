// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process shutdown wiring.
//!
//! One [`CancellationToken`] fans out to the gateway listener and the idle
//! sweep. Room actors persist every turn before acking it, so shutdown has
//! no drain phase; dropping a live actor loses nothing.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Arms SIGTERM and SIGINT (Ctrl+C) handling.
///
/// The returned token trips when either signal arrives. The watcher task
/// stays in the background for the rest of the process.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        info!(signal, "initiating shutdown");
        trigger.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "Ctrl+C"
}
