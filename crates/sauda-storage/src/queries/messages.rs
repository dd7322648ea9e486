// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log operations.
//!
//! Messages are appended only through [`rooms::commit_turn`], so the write
//! half here is crate-private; reads and the translation-cache update are
//! the public surface.
//!
//! [`rooms::commit_turn`]: crate::queries::rooms::commit_turn

use std::collections::HashMap;

use rusqlite::params;
use sauda_core::SaudaError;
use sauda_core::types::ParticipantRole;

use crate::database::Database;
use crate::models::{ChatMessage, RoomKey};
use crate::queries::{
    enum_from_sql, json_from_sql, json_to_sql, opt_json_from_sql, opt_json_to_sql, ts_from_sql,
    ts_to_sql,
};

/// Load a room's full message log ordered by sequence number.
pub async fn load_messages(db: &Database, key: &RoomKey) -> Result<Vec<ChatMessage>, SaudaError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<ChatMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT seq, sender, sender_name, text, language, translations,
                        audio_ref, meta, sent_at
                 FROM messages WHERE room_key = ?1 ORDER BY seq ASC",
            )?;
            let rows = stmt.query_map(params![key], message_from_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace the cached translations of one already-appended message.
///
/// A missing sequence number is a no-op, mirroring the in-memory adapters.
pub async fn update_translations(
    db: &Database,
    key: &RoomKey,
    seq: u64,
    translations: &HashMap<ParticipantRole, String>,
) -> Result<(), SaudaError> {
    let key = key.0.clone();
    let translations = json_to_sql(translations)?;
    let seq = seq as i64;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE messages SET translations = ?1 WHERE room_key = ?2 AND seq = ?3",
                params![translations, key, seq],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub(crate) struct MessageRow {
    room_key: String,
    seq: i64,
    sender: String,
    sender_name: String,
    text: String,
    language: String,
    translations: String,
    audio_ref: Option<String>,
    meta: Option<String>,
    sent_at: String,
}

pub(crate) fn encode_message(key: &RoomKey, msg: &ChatMessage) -> Result<MessageRow, SaudaError> {
    Ok(MessageRow {
        room_key: key.0.clone(),
        seq: msg.seq as i64,
        sender: msg.sender.to_string(),
        sender_name: msg.sender_name.clone(),
        text: msg.text.clone(),
        language: msg.language.clone(),
        translations: json_to_sql(&msg.translations)?,
        audio_ref: msg.audio_ref.clone(),
        meta: opt_json_to_sql(msg.meta.as_ref())?,
        sent_at: ts_to_sql(msg.sent_at),
    })
}

pub(crate) fn write_message(conn: &rusqlite::Connection, row: &MessageRow) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO messages (room_key, seq, sender, sender_name, text,
         language, translations, audio_ref, meta, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            row.room_key,
            row.seq,
            row.sender,
            row.sender_name,
            row.text,
            row.language,
            row.translations,
            row.audio_ref,
            row.meta,
            row.sent_at,
        ],
    )?;
    Ok(())
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let sender: String = row.get(1)?;
    let translations: String = row.get(5)?;
    let sent_at: String = row.get(8)?;
    Ok(ChatMessage {
        seq: row.get::<_, i64>(0)? as u64,
        sender: enum_from_sql(1, &sender)?,
        sender_name: row.get(2)?,
        text: row.get(3)?,
        language: row.get(4)?,
        translations: json_from_sql(5, &translations)?,
        audio_ref: row.get(6)?,
        meta: opt_json_from_sql(7, row.get(7)?)?,
        sent_at: ts_from_sql(8, &sent_at)?,
    })
}
