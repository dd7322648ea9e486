// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema migrations embedded at compile time.
//!
//! refinery bakes the SQL files under `migrations/` into the binary and
//! records applied versions in its `refinery_schema_history` table, so a
//! fresh or stale database is brought current on every open.

use sauda_core::SaudaError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Applies any migrations the database has not seen yet.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), SaudaError> {
    embedded::migrations::runner()
        .run(conn)
        .map(|_| ())
        .map_err(|e| SaudaError::Storage {
            source: Box::new(e),
        })
}
