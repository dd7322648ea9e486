// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room record operations, including the transactional turn commit.

use chrono::{DateTime, Utc};
use rusqlite::params;
use sauda_core::SaudaError;
use sauda_core::types::RoomStatus;

use crate::database::Database;
use crate::models::{ChatMessage, RoomKey, RoomRecord, VendorId};
use crate::queries::messages::{encode_message, write_message};
use crate::queries::{enum_from_sql, opt_json_from_sql, opt_json_to_sql, ts_from_sql, ts_to_sql};

const ROOM_COLUMNS: &str = "room_key, commodity, location, seller_id, buyer_name, seller_name,
     buyer_lang, seller_lang, phase, status, market, greeting, insight,
     offer_too_low, current_offer, counter_offer, closure, created_at,
     last_activity_at";

/// Insert or fully replace a room record.
pub async fn upsert_room(db: &Database, room: &RoomRecord) -> Result<(), SaudaError> {
    let row = encode_room(room)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            write_room(conn, &row)?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Load a room record by key.
pub async fn load_room(db: &Database, key: &RoomKey) -> Result<Option<RoomRecord>, SaudaError> {
    let key = key.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<RoomRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ROOM_COLUMNS} FROM rooms WHERE room_key = ?1"
            ))?;
            let result = stmt.query_row(params![key], room_from_row);
            match result {
                Ok(room) => Ok(Some(room)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Commit one room mutation atomically: the updated room record plus the
/// messages that mutation appended. Either all of it lands or none does.
pub async fn commit_turn(
    db: &Database,
    room: &RoomRecord,
    new_messages: &[ChatMessage],
) -> Result<(), SaudaError> {
    let room_row = encode_room(room)?;
    let message_rows = new_messages
        .iter()
        .map(|m| encode_message(&room.key, m))
        .collect::<Result<Vec<_>, _>>()?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            write_room(&tx, &room_row)?;
            for row in &message_rows {
                write_message(&tx, row)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Keys of open rooms whose last activity is at or before `cutoff`,
/// oldest first.
pub async fn stale_open_rooms(
    db: &Database,
    cutoff: DateTime<Utc>,
) -> Result<Vec<RoomKey>, SaudaError> {
    let cutoff = ts_to_sql(cutoff);
    let closed = RoomStatus::Closed.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<RoomKey>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT room_key FROM rooms
                 WHERE status != ?1 AND last_activity_at <= ?2
                 ORDER BY last_activity_at ASC",
            )?;
            let rows = stmt.query_map(params![closed, cutoff], |row| row.get::<_, String>(0))?;
            let mut keys = Vec::new();
            for row in rows {
                keys.push(RoomKey(row?));
            }
            Ok(keys)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

struct RoomRow {
    key: String,
    commodity: String,
    location: String,
    seller_id: String,
    buyer_name: Option<String>,
    seller_name: Option<String>,
    buyer_lang: String,
    seller_lang: String,
    phase: String,
    status: String,
    market: Option<String>,
    greeting: Option<String>,
    insight: Option<String>,
    offer_too_low: Option<bool>,
    current_offer: Option<String>,
    counter_offer: Option<String>,
    closure: Option<String>,
    created_at: String,
    last_activity_at: String,
}

fn encode_room(room: &RoomRecord) -> Result<RoomRow, SaudaError> {
    Ok(RoomRow {
        key: room.key.0.clone(),
        commodity: room.commodity.clone(),
        location: room.location.clone(),
        seller_id: room.seller_id.0.clone(),
        buyer_name: room.buyer_name.clone(),
        seller_name: room.seller_name.clone(),
        buyer_lang: room.buyer_lang.clone(),
        seller_lang: room.seller_lang.clone(),
        phase: room.phase.to_string(),
        status: room.status.to_string(),
        market: opt_json_to_sql(room.market.as_ref())?,
        greeting: opt_json_to_sql(room.greeting.as_ref())?,
        insight: opt_json_to_sql(room.insight.as_ref())?,
        offer_too_low: room.offer_too_low,
        current_offer: opt_json_to_sql(room.current_offer.as_ref())?,
        counter_offer: opt_json_to_sql(room.counter_offer.as_ref())?,
        closure: opt_json_to_sql(room.closure.as_ref())?,
        created_at: ts_to_sql(room.created_at),
        last_activity_at: ts_to_sql(room.last_activity_at),
    })
}

fn write_room(conn: &rusqlite::Connection, row: &RoomRow) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO rooms ({ROOM_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                     ?14, ?15, ?16, ?17, ?18, ?19)"
        ),
        params![
            row.key,
            row.commodity,
            row.location,
            row.seller_id,
            row.buyer_name,
            row.seller_name,
            row.buyer_lang,
            row.seller_lang,
            row.phase,
            row.status,
            row.market,
            row.greeting,
            row.insight,
            row.offer_too_low,
            row.current_offer,
            row.counter_offer,
            row.closure,
            row.created_at,
            row.last_activity_at,
        ],
    )?;
    Ok(())
}

fn room_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RoomRecord> {
    let phase: String = row.get(8)?;
    let status: String = row.get(9)?;
    let created_at: String = row.get(17)?;
    let last_activity_at: String = row.get(18)?;
    Ok(RoomRecord {
        key: RoomKey(row.get(0)?),
        commodity: row.get(1)?,
        location: row.get(2)?,
        seller_id: VendorId(row.get(3)?),
        buyer_name: row.get(4)?,
        seller_name: row.get(5)?,
        buyer_lang: row.get(6)?,
        seller_lang: row.get(7)?,
        phase: enum_from_sql(8, &phase)?,
        status: enum_from_sql(9, &status)?,
        market: opt_json_from_sql(10, row.get(10)?)?,
        greeting: opt_json_from_sql(11, row.get(11)?)?,
        insight: opt_json_from_sql(12, row.get(12)?)?,
        offer_too_low: row.get(13)?,
        current_offer: opt_json_from_sql(14, row.get(14)?)?,
        counter_offer: opt_json_from_sql(15, row.get(15)?)?,
        closure: opt_json_from_sql(16, row.get(16)?)?,
        created_at: ts_from_sql(17, &created_at)?,
        last_activity_at: ts_from_sql(18, &last_activity_at)?,
    })
}
