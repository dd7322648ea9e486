// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SaudaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ChatMessage, Deal, DealId, ParticipantRole, RoomKey, RoomRecord, TrustScore, VendorId,
};

/// Adapter for storage and persistence backends.
///
/// Rooms, message logs, deals, and trust scores all persist through this
/// trait. Room actors hold their state in memory and write through; the
/// persisted copy is read back only when a room is resurrected after a
/// restart or eviction.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), SaudaError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), SaudaError>;

    /// Inserts or fully replaces a room record.
    async fn upsert_room(&self, room: &RoomRecord) -> Result<(), SaudaError>;

    /// Loads a room record by key.
    async fn load_room(&self, key: &RoomKey) -> Result<Option<RoomRecord>, SaudaError>;

    /// Atomically commits one room mutation: the updated room record plus
    /// any messages appended by that operation. Either everything in the
    /// turn is durable or none of it is.
    async fn commit_turn(
        &self,
        room: &RoomRecord,
        new_messages: &[ChatMessage],
    ) -> Result<(), SaudaError>;

    /// Loads a room's full message log ordered by sequence number.
    async fn load_messages(&self, key: &RoomKey) -> Result<Vec<ChatMessage>, SaudaError>;

    /// Replaces the cached translations of one already-appended message.
    /// Used only by explicit preference-change re-translation.
    async fn update_message_translations(
        &self,
        key: &RoomKey,
        seq: u64,
        translations: &HashMap<ParticipantRole, String>,
    ) -> Result<(), SaudaError>;

    /// Keys of open rooms whose last activity is at or before `cutoff`.
    async fn stale_open_rooms(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RoomKey>, SaudaError>;

    /// Persists a freshly created deal.
    async fn create_deal(&self, deal: &Deal) -> Result<(), SaudaError>;

    /// Loads a deal by id.
    async fn load_deal(&self, id: &DealId) -> Result<Option<Deal>, SaudaError>;

    /// Replaces a deal after a lifecycle transition.
    async fn update_deal(&self, deal: &Deal) -> Result<(), SaudaError>;

    /// Loads a vendor's trust score, if one has ever been stored.
    async fn load_trust(&self, vendor: &VendorId) -> Result<Option<TrustScore>, SaudaError>;

    /// Inserts or replaces a vendor's trust score.
    async fn save_trust(&self, score: &TrustScore) -> Result<(), SaudaError>;
}
