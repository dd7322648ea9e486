// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.
//!
//! Shared row codecs live here: timestamps travel as fixed-width RFC 3339
//! text, nested structures as JSON text, and enums as their snake_case
//! display form.

pub mod deals;
pub mod messages;
pub mod rooms;
pub mod trust;

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sauda_core::SaudaError;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Millisecond precision with a trailing Z, so stored text sorts
/// chronologically.
pub(crate) fn ts_to_sql(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn ts_from_sql(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

pub(crate) fn json_to_sql<T: Serialize>(value: &T) -> Result<String, SaudaError> {
    serde_json::to_string(value).map_err(|e| SaudaError::Storage {
        source: Box::new(e),
    })
}

pub(crate) fn opt_json_to_sql<T: Serialize>(
    value: Option<&T>,
) -> Result<Option<String>, SaudaError> {
    value.map(json_to_sql).transpose()
}

pub(crate) fn json_from_sql<T: DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| conversion_err(idx, e))
}

pub(crate) fn opt_json_from_sql<T: DeserializeOwned>(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<T>> {
    raw.map(|s| json_from_sql(idx, &s)).transpose()
}

pub(crate) fn enum_from_sql<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| conversion_err(idx, e))
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}
