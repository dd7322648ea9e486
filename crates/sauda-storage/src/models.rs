// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Convenience re-exports of the storage entity types.
//!
//! The canonical definitions live in `sauda-core::types` so the adapter
//! traits and this crate agree on shapes; this shim saves the query
//! modules a cross-crate path.

pub use sauda_core::types::{
    ChatMessage, Deal, DealId, RoomKey, RoomRecord, TrustScore, VendorId,
};
