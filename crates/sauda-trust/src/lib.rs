// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vendor trust scoring.
//!
//! Sellers accumulate a three-component reputation as they negotiate:
//! price honesty (how struck deals compare to the market), negotiation
//! stability (how counters compare to the market), and language
//! reliability (how often conversations devolve into disputes). The
//! [`TrustEngine`] folds scoring events into persisted scores; the
//! arithmetic lives in [`points`] as pure functions.

pub mod engine;
pub mod points;

pub use engine::{TrustEngine, TrustEvent};
