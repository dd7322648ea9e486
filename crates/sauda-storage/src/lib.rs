// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Sauda negotiation mediator.
//!
//! One WAL-mode connection owned by a `tokio-rusqlite` worker serializes
//! all writes. Migrations ship embedded in the binary, and the query
//! modules expose typed operations for rooms, message logs, deals, and
//! vendor trust scores.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use models::*;
