// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sauda negotiation mediator.
//!
//! This crate provides the foundational trait definitions, error types,
//! domain types, and wire events used throughout the Sauda workspace. All
//! adapter plugins implement traits defined here.

pub mod clock;
pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use clock::{Clock, SystemClock};
pub use error::SaudaError;
pub use events::{ErrorCode, InboundEvent, OutboundEvent};
pub use types::{
    AdapterType, DealId, HealthStatus, ParticipantRole, RoomKey, RoomPhase, VendorId,
};

// Re-export all adapter traits at crate root.
pub use traits::{MarketDataSource, MediatorGateway, PluginAdapter, StorageAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sauda_error_has_all_variants() {
        use types::{ClosureReason, DealAction, DealStatus};

        let _config = SaudaError::Config("test".into());
        let _storage = SaudaError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _market = SaudaError::Market {
            message: "test".into(),
            source: None,
        };
        let _mediator = SaudaError::Mediator {
            message: "test".into(),
            source: None,
        };
        let _channel = SaudaError::Channel {
            message: "test".into(),
            source: None,
        };
        let _not_found = SaudaError::RoomNotFound {
            room_key: "room-v1-u1-1".into(),
        };
        let _closed = SaudaError::RoomClosed {
            room_key: "room-v1-u1-1".into(),
            reason: ClosureReason::MutuallyEnded,
        };
        let _phase = SaudaError::InvalidPhase {
            phase: RoomPhase::Greeting,
            operation: "submit_offer",
        };
        let _deal = SaudaError::DealNotFound {
            deal_id: "d-1".into(),
        };
        let _transition = SaudaError::InvalidDealTransition {
            status: DealStatus::Closed,
            action: DealAction::Reject,
        };
        let _invalid = SaudaError::InvalidRequest("test".into());
        let _internal = SaudaError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips_through_display() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Market,
            AdapterType::Mediator,
            AdapterType::Storage,
            AdapterType::Channel,
        ];
        for variant in &variants {
            let s = variant.to_string();
            let parsed = AdapterType::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn role_and_phase_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&ParticipantRole::Buyer).unwrap(),
            "\"buyer\""
        );
        assert_eq!(
            serde_json::to_string(&RoomPhase::BuyerCounterReview).unwrap(),
            "\"buyer_counter_review\""
        );
        assert_eq!(RoomPhase::SellerReview.to_string(), "seller_review");
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that every adapter trait is reachable through
        // the public API and object-safe enough for its call sites.
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_market<T: MarketDataSource>() {}
        fn _assert_mediator<T: MediatorGateway>() {}
        fn _assert_storage<T: StorageAdapter>() {}
        fn _assert_dyn_usable(
            _m: &dyn MarketDataSource,
            _g: &dyn MediatorGateway,
            _s: &dyn StorageAdapter,
        ) {
        }
    }
}
