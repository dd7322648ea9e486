// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trust engine: applies scoring events to persisted vendor scores.
//!
//! Updates are serialized per vendor through a keyed mutex so concurrent
//! rooms for the same seller cannot interleave a read-modify-write. Across
//! different vendors updates run freely in parallel.
//!
//! Scoring is advisory: rooms fire updates and move on. The spawn helpers
//! log failures instead of propagating them so a storage hiccup never
//! stalls a live negotiation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::warn;

use sauda_core::traits::storage::StorageAdapter;
use sauda_core::types::{TrustComponent, TrustScore, VendorId};
use sauda_core::{Clock, SaudaError};

use crate::points;

/// One scoring event against a vendor.
#[derive(Debug, Clone, PartialEq)]
pub enum TrustEvent {
    /// Seller countered at this unit price; market modal for context.
    CounterOffer {
        counter_price: f64,
        modal_price: f64,
    },
    /// A deal was struck at this unit price, with the number of
    /// dispute-flavored messages observed during the negotiation.
    DealStruck {
        final_price: f64,
        modal_price: f64,
        dispute_count: u32,
    },
    /// A dispute-flavored message arrived mid-conversation.
    Dispute,
}

/// Applies [`TrustEvent`]s to vendor scores.
pub struct TrustEngine {
    storage: Arc<dyn StorageAdapter>,
    clock: Arc<dyn Clock>,
    vendor_locks: DashMap<VendorId, Arc<Mutex<()>>>,
}

impl TrustEngine {
    pub fn new(storage: Arc<dyn StorageAdapter>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            vendor_locks: DashMap::new(),
        }
    }

    /// Applies one event to the vendor's persisted score.
    ///
    /// Creates the starting score on first contact. Holds the vendor's
    /// lock across the load-update-save so events for one vendor apply
    /// in arrival order.
    pub async fn record(&self, vendor: &VendorId, event: TrustEvent) -> Result<(), SaudaError> {
        let lock = self
            .vendor_locks
            .entry(vendor.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let now = self.clock.now();
        let mut score = match self.storage.load_trust(vendor).await? {
            Some(existing) => existing,
            None => TrustScore::starting(vendor.clone(), now),
        };

        match event {
            TrustEvent::CounterOffer {
                counter_price,
                modal_price,
            } => {
                let sample = points::counter_offer_points(counter_price, modal_price);
                fold(&mut score, TrustComponent::NegotiationStability, sample);
            }
            TrustEvent::DealStruck {
                final_price,
                modal_price,
                dispute_count,
            } => {
                let price_sample = points::deal_price_points(final_price, modal_price);
                fold(&mut score, TrustComponent::PriceHonesty, price_sample);
                let language_sample = points::dispute_language_points(dispute_count);
                fold(&mut score, TrustComponent::LanguageReliability, language_sample);
                score.deal_count += 1;
            }
            TrustEvent::Dispute => {
                fold(&mut score, TrustComponent::LanguageReliability, 0);
            }
        }

        score.overall = points::overall_score(
            score.price_honesty,
            score.negotiation_stability,
            score.language_reliability,
        );
        score.updated_at = now;

        self.storage.save_trust(&score).await
    }

    /// Fire-and-forget [`record`](Self::record); failures are logged.
    pub fn spawn_record(self: &Arc<Self>, vendor: VendorId, event: TrustEvent) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = engine.record(&vendor, event).await {
                warn!(vendor = %vendor.0, error = %err, "trust update failed");
            }
        });
    }

    /// The vendor's current score, creating nothing on miss.
    pub async fn score_of(&self, vendor: &VendorId) -> Result<Option<TrustScore>, SaudaError> {
        self.storage.load_trust(vendor).await
    }
}

fn fold(score: &mut TrustScore, component: TrustComponent, sample: u8) {
    let updated = points::ema_update(score.component(component), sample);
    score.set_component(component, updated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sauda_core::types::ConfidenceTier;
    use sauda_test_utils::{ManualClock, MemoryStorage};

    fn engine() -> (Arc<TrustEngine>, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new());
        let engine = Arc::new(TrustEngine::new(storage.clone(), clock));
        (engine, storage)
    }

    fn vendor() -> VendorId {
        VendorId("seller-42".to_string())
    }

    #[tokio::test]
    async fn first_event_creates_starting_score() {
        let (engine, _storage) = engine();

        engine
            .record(
                &vendor(),
                TrustEvent::CounterOffer {
                    counter_price: 2200.0,
                    modal_price: 2200.0,
                },
            )
            .await
            .unwrap();

        let score = engine.score_of(&vendor()).await.unwrap().unwrap();
        // Stability folds a 100-point sample into the fresh 70.
        assert_eq!(score.negotiation_stability, 76);
        assert_eq!(score.price_honesty, 70);
        assert_eq!(score.overall, 72);
        assert_eq!(score.deal_count, 0);
    }

    #[tokio::test]
    async fn dispute_drags_language_reliability_down() {
        let (engine, _storage) = engine();

        engine.record(&vendor(), TrustEvent::Dispute).await.unwrap();

        let score = engine.score_of(&vendor()).await.unwrap().unwrap();
        assert_eq!(score.language_reliability, 56);
        assert_eq!(score.overall, 67);
    }

    #[tokio::test]
    async fn deal_updates_two_components_and_count() {
        let (engine, _storage) = engine();

        engine
            .record(
                &vendor(),
                TrustEvent::DealStruck {
                    final_price: 2250.0,
                    modal_price: 2200.0,
                    dispute_count: 0,
                },
            )
            .await
            .unwrap();

        let score = engine.score_of(&vendor()).await.unwrap().unwrap();
        assert_eq!(score.price_honesty, 76);
        assert_eq!(score.language_reliability, 76);
        assert_eq!(score.negotiation_stability, 70);
        assert_eq!(score.deal_count, 1);
    }

    #[tokio::test]
    async fn overpriced_deal_with_disputes_is_punished() {
        let (engine, _storage) = engine();

        engine
            .record(
                &vendor(),
                TrustEvent::DealStruck {
                    // 2420 is 5% past the grace ceiling of 2310: 80 points.
                    final_price: 2420.0,
                    modal_price: 2200.0,
                    dispute_count: 2,
                },
            )
            .await
            .unwrap();

        let score = engine.score_of(&vendor()).await.unwrap().unwrap();
        assert_eq!(score.price_honesty, 72); // ema(70, 80)
        assert_eq!(score.language_reliability, 66); // ema(70, 50)
    }

    #[tokio::test]
    async fn same_vendor_updates_serialize() {
        let (engine, _storage) = engine();
        let v = vendor();

        let a = {
            let engine = engine.clone();
            let v = v.clone();
            tokio::spawn(async move { engine.record(&v, TrustEvent::Dispute).await })
        };
        let b = {
            let engine = engine.clone();
            let v = v.clone();
            tokio::spawn(async move { engine.record(&v, TrustEvent::Dispute).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Both EMA folds applied in sequence: 70 -> 56 -> 45.
        let score = engine.score_of(&v).await.unwrap().unwrap();
        assert_eq!(score.language_reliability, 45);
    }

    #[tokio::test]
    async fn deal_count_drives_confidence_tier() {
        let (engine, _storage) = engine();

        for _ in 0..3 {
            engine
                .record(
                    &vendor(),
                    TrustEvent::DealStruck {
                        final_price: 2200.0,
                        modal_price: 2200.0,
                        dispute_count: 0,
                    },
                )
                .await
                .unwrap();
        }

        let score = engine.score_of(&vendor()).await.unwrap().unwrap();
        assert_eq!(score.deal_count, 3);
        assert_eq!(score.tier(), ConfidenceTier::Bronze);
    }

    #[tokio::test]
    async fn spawn_record_applies_asynchronously() {
        let (engine, _storage) = engine();

        engine.spawn_record(vendor(), TrustEvent::Dispute);

        // Poll until the spawned task lands.
        for _ in 0..50 {
            if engine.score_of(&vendor()).await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        let score = engine.score_of(&vendor()).await.unwrap().unwrap();
        assert_eq!(score.language_reliability, 56);
    }
}
