// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `NegotiationHarness` assembles a complete dispatcher stack with mock
//! gateway and market adapters, a hand-advanced clock, and a temp SQLite
//! database. Provides `connect()` and `dispatch()` to drive the full
//! negotiation pipeline in tests.

use std::sync::Arc;

use tokio::sync::mpsc;

use sauda_config::model::{NegotiationConfig, StorageConfig};
use sauda_core::events::{InboundEvent, OutboundEvent};
use sauda_core::traits::storage::StorageAdapter;
use sauda_core::types::PriceBand;
use sauda_core::SaudaError;
use sauda_room::{Broadcaster, ConnId, Dispatcher, IdleSweep, NegotiationPolicy, RoomDeps};
use sauda_storage::SqliteStorage;
use sauda_trust::TrustEngine;

use crate::clock::ManualClock;
use crate::mock_market::MockMarket;
use crate::mock_mediator::MockMediator;

/// Builder for creating test environments with configurable options.
pub struct NegotiationHarnessBuilder {
    band: Option<PriceBand>,
    negotiation: NegotiationConfig,
}

impl NegotiationHarnessBuilder {
    fn new() -> Self {
        Self {
            band: None,
            negotiation: NegotiationConfig::default(),
        }
    }

    /// Set the price band the mock market serves.
    pub fn with_band(mut self, band: PriceBand) -> Self {
        self.band = Some(band);
        self
    }

    /// Override the negotiation policy configuration.
    pub fn with_negotiation(mut self, config: NegotiationConfig) -> Self {
        self.negotiation = config;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<NegotiationHarness, SaudaError> {
        // Create temp directory for SQLite
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| SaudaError::Storage { source: e.into() })?;
        let db_path = temp_dir.path().join("test.db");

        // Initialize SQLite storage
        let storage_config = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };
        let sqlite = SqliteStorage::new(storage_config);
        sqlite.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(sqlite);

        let clock = Arc::new(ManualClock::new());
        let mediator = Arc::new(MockMediator::new());
        let market = Arc::new(match self.band {
            Some(band) => MockMarket::with_band(band),
            None => MockMarket::new(),
        });
        let broadcaster = Arc::new(Broadcaster::new());

        let deps = RoomDeps {
            storage: storage.clone(),
            market,
            mediator: mediator.clone(),
            trust: Arc::new(TrustEngine::new(storage.clone(), clock.clone())),
            policy: Arc::new(NegotiationPolicy::new(&self.negotiation)),
            clock: clock.clone(),
            broadcaster: broadcaster.clone(),
        };
        let dispatcher = Arc::new(Dispatcher::new(deps));
        let sweep = IdleSweep::new(
            dispatcher.clone(),
            storage.clone(),
            clock.clone(),
            &self.negotiation,
        );

        Ok(NegotiationHarness {
            dispatcher,
            sweep,
            storage,
            mediator,
            clock,
            broadcaster,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
///
/// Exposes every subsystem for assertions plus `connect()`/`dispatch()`
/// to drive the full pipeline (dispatcher -> actor -> storage -> trust).
pub struct NegotiationHarness {
    /// Routes inbound events to room actors.
    pub dispatcher: Arc<Dispatcher>,
    /// Idle sweep bound to the same dispatcher and clock.
    pub sweep: IdleSweep,
    /// SQLite storage adapter (temp DB, cleaned up on drop).
    pub storage: Arc<dyn StorageAdapter>,
    /// The mock mediation gateway.
    pub mediator: Arc<MockMediator>,
    /// Hand-advanced clock shared by every subsystem.
    pub clock: Arc<ManualClock>,
    /// Fan-out registry for outbound events.
    pub broadcaster: Arc<Broadcaster>,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl NegotiationHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> NegotiationHarnessBuilder {
        NegotiationHarnessBuilder::new()
    }

    /// Register a connection and return its outbound event stream.
    pub fn connect(&self, conn: &str) -> mpsc::Receiver<OutboundEvent> {
        let (tx, rx) = mpsc::channel(64);
        self.broadcaster.register(ConnId(conn.to_string()), tx);
        rx
    }

    /// Route one inbound event as if it arrived over the wire from `conn`.
    pub async fn dispatch(&self, event: InboundEvent, conn: &str) -> Result<(), SaudaError> {
        self.dispatcher
            .dispatch(event, &ConnId(conn.to_string()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration as StdDuration;

    use chrono::Duration;

    use sauda_core::events::{ProposedItem, SellerChoice};
    use sauda_core::types::{ParticipantRole, RoomKey, VendorId};

    const ROOM: &str = "room-seller-9-buyer-4-1";
    const SELLER: &str = "seller-9";

    fn key() -> RoomKey {
        RoomKey(ROOM.to_string())
    }

    fn join(role: ParticipantRole, name: &str, lang: &str) -> InboundEvent {
        InboundEvent::Join {
            room_key: key(),
            role,
            display_name: name.to_string(),
            language: lang.to_string(),
            commodity: "Onion".to_string(),
            location: "Nashik".to_string(),
            seller_id: VendorId(SELLER.to_string()),
        }
    }

    #[tokio::test]
    async fn builder_creates_working_environment() {
        let h = NegotiationHarness::builder().build().await.unwrap();
        let _rx = h.connect("conn-1");

        h.dispatch(join(ParticipantRole::Buyer, "Asha", "hi"), "conn-1")
            .await
            .unwrap();

        let room = h.storage.load_room(&key()).await.unwrap().unwrap();
        assert_eq!(room.commodity, "Onion");
        assert!(room.greeting.is_some());
    }

    #[tokio::test]
    async fn full_negotiation_reaches_a_deal() {
        let h = NegotiationHarness::builder()
            .with_band(PriceBand {
                min_price: 1800.0,
                max_price: 2200.0,
                modal_price: 2000.0,
            })
            .build()
            .await
            .unwrap();
        let mut buyer_rx = h.connect("buyer-conn");
        let _seller_rx = h.connect("seller-conn");

        h.dispatch(join(ParticipantRole::Buyer, "Asha", "hi"), "buyer-conn")
            .await
            .unwrap();
        h.dispatch(join(ParticipantRole::Seller, "Bharat", "mr"), "seller-conn")
            .await
            .unwrap();
        h.dispatch(
            InboundEvent::SubmitOffer {
                room_key: key(),
                quantity: 10.0,
                unit_price: 1950.0,
                purpose: Some("hotel kitchen".to_string()),
            },
            "buyer-conn",
        )
        .await
        .unwrap();
        h.dispatch(
            InboundEvent::SellerDecision {
                room_key: key(),
                decision: SellerChoice::Accept,
                counter_price: None,
            },
            "seller-conn",
        )
        .await
        .unwrap();
        h.dispatch(
            InboundEvent::CreateDeal {
                room_key: key(),
                items: vec![ProposedItem {
                    name: "Onion".to_string(),
                    quantity: 10.0,
                    unit_price: 1950.0,
                }],
                total: 0.0,
            },
            "buyer-conn",
        )
        .await
        .unwrap();

        let room = h.storage.load_room(&key()).await.unwrap().unwrap();
        assert!(room.is_closed());
        let deal_id = room.closure.unwrap().deal_id.unwrap();
        let deal = h.storage.load_deal(&deal_id).await.unwrap().unwrap();
        assert_eq!(deal.total, 19500.0);

        // Trust lands from a spawned task; poll the shared database.
        let vendor = VendorId(SELLER.to_string());
        let mut recorded = false;
        for _ in 0..200 {
            if let Some(score) = h.storage.load_trust(&vendor).await.unwrap()
                && score.deal_count == 1
            {
                recorded = true;
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(5)).await;
        }
        assert!(recorded, "deal was never scored");

        // The buyer watched the whole thing happen.
        let mut saw_deal = false;
        while let Ok(event) = buyer_rx.try_recv() {
            if matches!(event, OutboundEvent::DealCreated { .. }) {
                saw_deal = true;
            }
        }
        assert!(saw_deal);
    }

    #[tokio::test]
    async fn manual_clock_drives_the_idle_sweep() {
        let h = NegotiationHarness::builder().build().await.unwrap();
        let _rx = h.connect("conn-1");
        h.dispatch(join(ParticipantRole::Buyer, "Asha", "hi"), "conn-1")
            .await
            .unwrap();

        h.clock.advance(Duration::hours(25));
        let stats = h.sweep.execute().await.unwrap();
        assert_eq!(stats.closed, 1);

        let room = h.storage.load_room(&key()).await.unwrap().unwrap();
        assert!(room.is_closed());
    }

    #[tokio::test]
    async fn temp_db_is_unique_per_harness() {
        let h1 = NegotiationHarness::builder().build().await.unwrap();
        let h2 = NegotiationHarness::builder().build().await.unwrap();
        let _rx = h1.connect("conn-1");

        h1.dispatch(join(ParticipantRole::Buyer, "Asha", "hi"), "conn-1")
            .await
            .unwrap();

        assert!(h1.storage.load_room(&key()).await.unwrap().is_some());
        assert!(h2.storage.load_room(&key()).await.unwrap().is_none());
    }
}
