// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Market data source trait.

use async_trait::async_trait;

use crate::error::SaudaError;
use crate::traits::adapter::PluginAdapter;
use crate::types::PriceBand;

/// Supplies the current min/max/modal price band for a commodity at a
/// location.
///
/// Rooms capture one band per negotiation at greeting time and judge
/// everything against that snapshot, so this is consulted rarely; a TTL
/// cache in front of a concrete source keeps repeated greetings cheap.
#[async_trait]
pub trait MarketDataSource: PluginAdapter {
    async fn current_price(
        &self,
        commodity: &str,
        location: &str,
    ) -> Result<PriceBand, SaudaError>;
}
