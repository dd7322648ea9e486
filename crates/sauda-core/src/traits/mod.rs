// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Sauda plugin architecture.
//!
//! Every adapter builds on the [`PluginAdapter`] base and goes through
//! `#[async_trait]` so the serve loop can hold them as trait objects.

pub mod adapter;
pub mod market;
pub mod mediator;
pub mod storage;

// Flatten the traits into this module so callers skip the submodule paths.
pub use adapter::PluginAdapter;
pub use market::MarketDataSource;
pub use mediator::{
    ExtractedDeal, Intervention, MediatorGateway, OfferAssessment, SafetyVerdict,
};
pub use storage::StorageAdapter;
