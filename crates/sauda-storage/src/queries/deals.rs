// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deal CRUD operations.

use rusqlite::params;
use sauda_core::SaudaError;

use crate::database::Database;
use crate::models::{Deal, DealId, RoomKey};
use crate::queries::{enum_from_sql, json_from_sql, json_to_sql, ts_from_sql, ts_to_sql};

/// Persist a freshly created deal.
pub async fn create_deal(db: &Database, deal: &Deal) -> Result<(), SaudaError> {
    let items = json_to_sql(&deal.items)?;
    let deal = deal.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO deals (id, room_key, items, total, buyer_signed,
                 seller_signed, delivery_address, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    deal.id.0,
                    deal.room_key.0,
                    items,
                    deal.total,
                    deal.buyer_signed,
                    deal.seller_signed,
                    deal.delivery_address,
                    deal.status.to_string(),
                    ts_to_sql(deal.created_at),
                    ts_to_sql(deal.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Load a deal by id.
pub async fn load_deal(db: &Database, id: &DealId) -> Result<Option<Deal>, SaudaError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Deal>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, room_key, items, total, buyer_signed, seller_signed,
                        delivery_address, status, created_at, updated_at
                 FROM deals WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], deal_from_row);
            match result {
                Ok(deal) => Ok(Some(deal)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace a deal's mutable state after a lifecycle transition.
///
/// Line items, the total, and the originating room never change once the
/// deal exists, so only signature state, address, status, and the update
/// timestamp are written.
pub async fn update_deal(db: &Database, deal: &Deal) -> Result<(), SaudaError> {
    let deal = deal.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE deals SET buyer_signed = ?1, seller_signed = ?2,
                 delivery_address = ?3, status = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    deal.buyer_signed,
                    deal.seller_signed,
                    deal.delivery_address,
                    deal.status.to_string(),
                    ts_to_sql(deal.updated_at),
                    deal.id.0,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn deal_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Deal> {
    let items: String = row.get(2)?;
    let status: String = row.get(7)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Deal {
        id: DealId(row.get(0)?),
        room_key: RoomKey(row.get(1)?),
        items: json_from_sql(2, &items)?,
        total: row.get(3)?,
        buyer_signed: row.get(4)?,
        seller_signed: row.get(5)?,
        delivery_address: row.get(6)?,
        status: enum_from_sql(7, &status)?,
        created_at: ts_from_sql(8, &created_at)?,
        updated_at: ts_from_sql(9, &updated_at)?,
    })
}
