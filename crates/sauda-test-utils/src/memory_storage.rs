// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory storage adapter for fast unit tests.
//!
//! Implements the full `StorageAdapter` surface over `HashMap`s behind a
//! single async mutex, so a room actor test never touches the filesystem.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use sauda_core::traits::adapter::PluginAdapter;
use sauda_core::traits::storage::StorageAdapter;
use sauda_core::types::{
    AdapterType, ChatMessage, Deal, DealId, HealthStatus, ParticipantRole, RoomKey,
    RoomRecord, TrustScore, VendorId,
};
use sauda_core::SaudaError;

#[derive(Default)]
struct Inner {
    rooms: HashMap<RoomKey, RoomRecord>,
    messages: HashMap<RoomKey, Vec<ChatMessage>>,
    deals: HashMap<DealId, Deal>,
    trust: HashMap<VendorId, TrustScore>,
}

/// An in-memory `StorageAdapter`.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rooms currently stored. Test assertion helper.
    pub async fn room_count(&self) -> usize {
        self.inner.lock().await.rooms.len()
    }

    /// Number of messages stored for a room. Test assertion helper.
    pub async fn message_count(&self, key: &RoomKey) -> usize {
        self.inner
            .lock()
            .await
            .messages
            .get(key)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl PluginAdapter for MemoryStorage {
    fn name(&self) -> &str {
        "memory-storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SaudaError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SaudaError> {
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn initialize(&self) -> Result<(), SaudaError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), SaudaError> {
        Ok(())
    }

    async fn upsert_room(&self, room: &RoomRecord) -> Result<(), SaudaError> {
        self.inner
            .lock()
            .await
            .rooms
            .insert(room.key.clone(), room.clone());
        Ok(())
    }

    async fn load_room(&self, key: &RoomKey) -> Result<Option<RoomRecord>, SaudaError> {
        Ok(self.inner.lock().await.rooms.get(key).cloned())
    }

    async fn commit_turn(
        &self,
        room: &RoomRecord,
        new_messages: &[ChatMessage],
    ) -> Result<(), SaudaError> {
        let mut inner = self.inner.lock().await;
        inner.rooms.insert(room.key.clone(), room.clone());
        inner
            .messages
            .entry(room.key.clone())
            .or_default()
            .extend_from_slice(new_messages);
        Ok(())
    }

    async fn load_messages(&self, key: &RoomKey) -> Result<Vec<ChatMessage>, SaudaError> {
        Ok(self
            .inner
            .lock()
            .await
            .messages
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_message_translations(
        &self,
        key: &RoomKey,
        seq: u64,
        translations: &HashMap<ParticipantRole, String>,
    ) -> Result<(), SaudaError> {
        let mut inner = self.inner.lock().await;
        if let Some(log) = inner.messages.get_mut(key)
            && let Some(message) = log.iter_mut().find(|m| m.seq == seq)
        {
            message.translations = translations.clone();
        }
        Ok(())
    }

    async fn stale_open_rooms(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RoomKey>, SaudaError> {
        Ok(self
            .inner
            .lock()
            .await
            .rooms
            .values()
            .filter(|r| !r.is_closed() && r.last_activity_at <= cutoff)
            .map(|r| r.key.clone())
            .collect())
    }

    async fn create_deal(&self, deal: &Deal) -> Result<(), SaudaError> {
        self.inner
            .lock()
            .await
            .deals
            .insert(deal.id.clone(), deal.clone());
        Ok(())
    }

    async fn load_deal(&self, id: &DealId) -> Result<Option<Deal>, SaudaError> {
        Ok(self.inner.lock().await.deals.get(id).cloned())
    }

    async fn update_deal(&self, deal: &Deal) -> Result<(), SaudaError> {
        self.inner
            .lock()
            .await
            .deals
            .insert(deal.id.clone(), deal.clone());
        Ok(())
    }

    async fn load_trust(&self, vendor: &VendorId) -> Result<Option<TrustScore>, SaudaError> {
        Ok(self.inner.lock().await.trust.get(vendor).cloned())
    }

    async fn save_trust(&self, score: &TrustScore) -> Result<(), SaudaError> {
        self.inner
            .lock()
            .await
            .trust
            .insert(score.vendor_id.clone(), score.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sauda_core::types::{RoomPhase, RoomStatus};

    fn room(key: &str, last_activity_at: DateTime<Utc>) -> RoomRecord {
        RoomRecord {
            key: RoomKey(key.to_string()),
            commodity: "Wheat".to_string(),
            location: "Karnal".to_string(),
            seller_id: VendorId("seller-1".to_string()),
            buyer_name: Some("Ravi".to_string()),
            seller_name: Some("Lakshmi".to_string()),
            buyer_lang: "hi".to_string(),
            seller_lang: "ta".to_string(),
            phase: RoomPhase::Chat,
            status: RoomStatus::Active,
            market: None,
            greeting: None,
            insight: None,
            offer_too_low: None,
            current_offer: None,
            counter_offer: None,
            closure: None,
            created_at: last_activity_at,
            last_activity_at,
        }
    }

    #[tokio::test]
    async fn commit_turn_stores_room_and_appends_messages() {
        let storage = MemoryStorage::new();
        let now = Utc::now();
        let record = room("room-a", now);
        let message = ChatMessage {
            seq: 1,
            sender: ParticipantRole::Buyer,
            sender_name: "Ravi".to_string(),
            text: "namaste".to_string(),
            language: "hi".to_string(),
            translations: HashMap::new(),
            audio_ref: None,
            meta: None,
            sent_at: now,
        };

        storage.commit_turn(&record, &[message]).await.unwrap();

        assert_eq!(storage.room_count().await, 1);
        let log = storage.load_messages(&record.key).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].text, "namaste");
    }

    #[tokio::test]
    async fn stale_open_rooms_skips_recent_and_closed() {
        let storage = MemoryStorage::new();
        let now = Utc::now();

        let stale = room("room-stale", now - chrono::Duration::hours(30));
        let fresh = room("room-fresh", now);
        let mut closed = room("room-closed", now - chrono::Duration::hours(30));
        closed.status = RoomStatus::Closed;

        for r in [&stale, &fresh, &closed] {
            storage.upsert_room(r).await.unwrap();
        }

        let found = storage
            .stale_open_rooms(now - chrono::Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(found, vec![RoomKey("room-stale".to_string())]);
    }
}
