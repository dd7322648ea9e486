// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed persistence for rooms, messages, deals, and trust.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tracing::debug;

use sauda_config::model::StorageConfig;
use sauda_core::types::{
    AdapterType, ChatMessage, Deal, DealId, HealthStatus, ParticipantRole, RoomKey, RoomRecord,
    TrustScore, VendorId,
};
use sauda_core::{PluginAdapter, SaudaError, StorageAdapter};

use crate::database::Database;
use crate::queries;

/// SQLite adapter behind the [`StorageAdapter`] trait.
///
/// Owns the [`Database`] handle and routes every trait call into the typed
/// query modules. The file opens on [`StorageAdapter::initialize`], not at
/// construction.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Builds an unopened storage handle for `config`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, SaudaError> {
        self.db.get().ok_or_else(|| SaudaError::Storage {
            source: "storage accessed before initialize()".into(),
        })
    }
}

/// Forces the WAL back into the main database file.
async fn checkpoint(db: &Database) -> Result<(), SaudaError> {
    db.connection()
        .call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SaudaError> {
        // Counting rooms proves both that the file answers queries and
        // that the migrated schema is in place.
        let rooms = self
            .db()?
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT count(*) FROM rooms", [], |row| row.get(0))
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!(rooms, "storage health probe");
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SaudaError> {
        // A handle that never initialized has nothing to flush.
        if let Some(db) = self.db.get() {
            checkpoint(db).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SaudaError> {
        let opened =
            Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        if self.db.set(opened).is_err() {
            return Err(SaudaError::Storage {
                source: "storage already initialized".into(),
            });
        }
        debug!(path = %self.config.database_path, "SQLite storage ready");
        Ok(())
    }

    async fn close(&self) -> Result<(), SaudaError> {
        // The connection itself lives until drop; only the WAL is flushed.
        checkpoint(self.db()?).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Room operations ---

    async fn upsert_room(&self, room: &RoomRecord) -> Result<(), SaudaError> {
        queries::rooms::upsert_room(self.db()?, room).await
    }

    async fn load_room(&self, key: &RoomKey) -> Result<Option<RoomRecord>, SaudaError> {
        queries::rooms::load_room(self.db()?, key).await
    }

    async fn commit_turn(
        &self,
        room: &RoomRecord,
        new_messages: &[ChatMessage],
    ) -> Result<(), SaudaError> {
        queries::rooms::commit_turn(self.db()?, room, new_messages).await
    }

    async fn stale_open_rooms(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<RoomKey>, SaudaError> {
        queries::rooms::stale_open_rooms(self.db()?, cutoff).await
    }

    // --- Message operations ---

    async fn load_messages(&self, key: &RoomKey) -> Result<Vec<ChatMessage>, SaudaError> {
        queries::messages::load_messages(self.db()?, key).await
    }

    async fn update_message_translations(
        &self,
        key: &RoomKey,
        seq: u64,
        translations: &HashMap<ParticipantRole, String>,
    ) -> Result<(), SaudaError> {
        queries::messages::update_translations(self.db()?, key, seq, translations).await
    }

    // --- Deal operations ---

    async fn create_deal(&self, deal: &Deal) -> Result<(), SaudaError> {
        queries::deals::create_deal(self.db()?, deal).await
    }

    async fn load_deal(&self, id: &DealId) -> Result<Option<Deal>, SaudaError> {
        queries::deals::load_deal(self.db()?, id).await
    }

    async fn update_deal(&self, deal: &Deal) -> Result<(), SaudaError> {
        queries::deals::update_deal(self.db()?, deal).await
    }

    // --- Trust operations ---

    async fn load_trust(&self, vendor: &VendorId) -> Result<Option<TrustScore>, SaudaError> {
        queries::trust::load_trust(self.db()?, vendor).await
    }

    async fn save_trust(&self, score: &TrustScore) -> Result<(), SaudaError> {
        queries::trust::save_trust(self.db()?, score).await
    }
}
