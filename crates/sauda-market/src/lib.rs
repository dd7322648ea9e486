// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Market price band sources.
//!
//! A room captures one [`sauda_core::types::PriceBand`] when it greets the
//! parties and judges every offer in that negotiation against it. This crate
//! provides the sources those bands come from:
//!
//! - [`StaticMarketSource`] - compiled-in mandi table for demo deployments
//! - [`CachedMarket`] - TTL cache in front of any other source

pub mod cache;
pub mod static_source;

pub use cache::CachedMarket;
pub use static_source::StaticMarketSource;
