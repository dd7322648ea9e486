// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idle-room sweep.
//!
//! Negotiations that go quiet are closed as abandoned after a configurable
//! number of hours. The sweep scans storage rather than live actors, so a
//! room whose actor was retired (or that predates a restart) is still
//! closed, resurrected just long enough to broadcast its closure.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, warn};

use sauda_config::model::NegotiationConfig;
use sauda_core::traits::storage::StorageAdapter;
use sauda_core::{Clock, SaudaError};

use crate::registry::Dispatcher;

/// Outcome of one sweep cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepStats {
    /// Stale rooms a close was dispatched for.
    pub closed: usize,
    /// Stale rooms whose close attempt failed.
    pub failed: usize,
}

/// Closes rooms whose last activity is older than the configured window.
pub struct IdleSweep {
    dispatcher: Arc<Dispatcher>,
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    auto_close: Duration,
}

impl IdleSweep {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        storage: Arc<dyn StorageAdapter>,
        clock: Arc<dyn Clock>,
        config: &NegotiationConfig,
    ) -> Self {
        Self {
            dispatcher,
            storage,
            clock,
            auto_close: Duration::hours(config.auto_close_hours as i64),
        }
    }

    /// Execute one sweep cycle.
    ///
    /// Each stale room is closed through its actor so subscribers receive
    /// the closure broadcast. A failure on one room is logged and the sweep
    /// moves on to the next.
    pub async fn execute(&self) -> Result<SweepStats, SaudaError> {
        let cutoff = self.clock.now() - self.auto_close;
        let stale = self.storage.stale_open_rooms(cutoff).await?;
        let mut stats = SweepStats::default();

        for key in stale {
            match self.dispatcher.close_if_idle(&key, cutoff).await {
                Ok(()) => stats.closed += 1,
                Err(e) => {
                    warn!(room = %key.0, error = %e, "idle close failed");
                    stats.failed += 1;
                }
            }
        }

        // Drop in-memory handles for anything that closed through other paths.
        self.dispatcher.prune_closed();

        if stats.closed > 0 || stats.failed > 0 {
            debug!(closed = stats.closed, failed = stats.failed, "idle sweep finished");
        }
        Ok(stats)
    }
}
