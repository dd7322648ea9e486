// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vendor trust score persistence.

use rusqlite::params;
use sauda_core::SaudaError;

use crate::database::Database;
use crate::models::{TrustScore, VendorId};
use crate::queries::{ts_from_sql, ts_to_sql};

/// Load a vendor's trust score, if one has ever been stored.
pub async fn load_trust(
    db: &Database,
    vendor: &VendorId,
) -> Result<Option<TrustScore>, SaudaError> {
    let vendor = vendor.0.clone();
    db.connection()
        .call(move |conn| -> Result<Option<TrustScore>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT vendor_id, price_honesty, negotiation_stability,
                        language_reliability, overall, deal_count, updated_at
                 FROM trust_scores WHERE vendor_id = ?1",
            )?;
            let result = stmt.query_row(params![vendor], trust_from_row);
            match result {
                Ok(score) => Ok(Some(score)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or replace a vendor's trust score.
pub async fn save_trust(db: &Database, score: &TrustScore) -> Result<(), SaudaError> {
    let score = score.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR REPLACE INTO trust_scores (vendor_id, price_honesty,
                 negotiation_stability, language_reliability, overall, deal_count,
                 updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    score.vendor_id.0,
                    score.price_honesty,
                    score.negotiation_stability,
                    score.language_reliability,
                    score.overall,
                    score.deal_count,
                    ts_to_sql(score.updated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn trust_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TrustScore> {
    let updated_at: String = row.get(6)?;
    Ok(TrustScore {
        vendor_id: VendorId(row.get(0)?),
        price_honesty: row.get(1)?,
        negotiation_stability: row.get(2)?,
        language_reliability: row.get(3)?,
        overall: row.get(4)?,
        deal_count: row.get(5)?,
        updated_at: ts_from_sql(6, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use tempfile::tempdir;

    use super::*;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn ts(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[tokio::test]
    async fn load_unknown_vendor_returns_none() {
        let (db, _dir) = setup_db().await;
        let result = load_trust(&db, &VendorId("stranger".to_string()))
            .await
            .unwrap();
        assert!(result.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn save_and_load_roundtrips() {
        let (db, _dir) = setup_db().await;
        let score = TrustScore {
            vendor_id: VendorId("v-7".to_string()),
            price_honesty: 84,
            negotiation_stability: 76,
            language_reliability: 45,
            overall: 72,
            deal_count: 12,
            updated_at: ts("2026-03-01T14:00:00.000Z"),
        };

        save_trust(&db, &score).await.unwrap();
        let loaded = load_trust(&db, &score.vendor_id).await.unwrap().unwrap();
        assert_eq!(loaded, score);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn save_replaces_previous_score() {
        let (db, _dir) = setup_db().await;
        let mut score =
            TrustScore::starting(VendorId("v-8".to_string()), ts("2026-03-01T14:00:00.000Z"));
        save_trust(&db, &score).await.unwrap();

        score.price_honesty = 90;
        score.deal_count = 1;
        score.updated_at = ts("2026-03-01T15:00:00.000Z");
        save_trust(&db, &score).await.unwrap();

        let loaded = load_trust(&db, &score.vendor_id).await.unwrap().unwrap();
        assert_eq!(loaded.price_honesty, 90);
        assert_eq!(loaded.deal_count, 1);
        db.close().await.unwrap();
    }
}
