// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the complete Sauda pipeline.
//!
//! Each test creates an isolated NegotiationHarness with temp SQLite, mock
//! adapters, and all required subsystems. Tests are independent and
//! order-insensitive.

use sauda_core::events::{BuyerChoice, InboundEvent, OutboundEvent, ProposedItem, SellerChoice};
use sauda_core::types::{DealAction, DealStatus, ParticipantRole, PriceBand, RoomKey, RoomPhase, VendorId};
use sauda_core::SaudaError;
use sauda_test_utils::NegotiationHarness;

const ROOM: &str = "room-seller-21-buyer-7-1";

fn key(room: &str) -> RoomKey {
    RoomKey(room.to_string())
}

fn band() -> PriceBand {
    PriceBand {
        min_price: 1800.0,
        max_price: 2200.0,
        modal_price: 2000.0,
    }
}

fn join(room: &str, role: ParticipantRole, name: &str, lang: &str) -> InboundEvent {
    InboundEvent::Join {
        room_key: key(room),
        role,
        display_name: name.to_string(),
        language: lang.to_string(),
        commodity: "Onion".to_string(),
        location: "Nashik".to_string(),
        seller_id: VendorId("seller-21".to_string()),
    }
}

// ---- Test 1: Counter-offer round trip ----

#[tokio::test]
async fn counter_offer_round_trip_lands_in_chat() {
    let h = NegotiationHarness::builder()
        .with_band(band())
        .build()
        .await
        .unwrap();
    let mut buyer_rx = h.connect("buyer-1");
    let _seller_rx = h.connect("seller-1");

    h.dispatch(join(ROOM, ParticipantRole::Buyer, "Asha", "hi"), "buyer-1")
        .await
        .unwrap();
    h.dispatch(join(ROOM, ParticipantRole::Seller, "Bharat", "mr"), "seller-1")
        .await
        .unwrap();
    h.dispatch(
        InboundEvent::SubmitOffer {
            room_key: key(ROOM),
            quantity: 10.0,
            unit_price: 1900.0,
            purpose: None,
        },
        "buyer-1",
    )
    .await
    .unwrap();
    h.dispatch(
        InboundEvent::SellerDecision {
            room_key: key(ROOM),
            decision: SellerChoice::Counter,
            counter_price: Some(2100.0),
        },
        "seller-1",
    )
    .await
    .unwrap();

    let room = h.storage.load_room(&key(ROOM)).await.unwrap().unwrap();
    assert_eq!(room.phase, RoomPhase::BuyerCounterReview);
    assert!(room.counter_offer.is_some());

    h.dispatch(
        InboundEvent::BuyerDecision {
            room_key: key(ROOM),
            decision: BuyerChoice::Accept,
        },
        "buyer-1",
    )
    .await
    .unwrap();

    let room = h.storage.load_room(&key(ROOM)).await.unwrap().unwrap();
    assert_eq!(room.phase, RoomPhase::Chat);

    h.dispatch(
        InboundEvent::SendMessage {
            room_key: key(ROOM),
            role: ParticipantRole::Buyer,
            text: "pickup from the mandi gate tomorrow".to_string(),
            language: "hi".to_string(),
            audio_ref: None,
        },
        "buyer-1",
    )
    .await
    .unwrap();

    let log = h.storage.load_messages(&key(ROOM)).await.unwrap();
    assert!(log.iter().any(|m| m.text.contains("mandi gate")));

    // The buyer saw both review decisions go by.
    let mut decisions = 0;
    while let Ok(event) = buyer_rx.try_recv() {
        if matches!(event, OutboundEvent::DecisionUpdate { .. }) {
            decisions += 1;
        }
    }
    assert!(decisions >= 2, "expected two decision updates, saw {decisions}");
}

// ---- Test 2: Deal lifecycle after the room closes ----

#[tokio::test]
async fn signed_deal_walks_draft_agreed_closed() {
    let h = NegotiationHarness::builder()
        .with_band(band())
        .build()
        .await
        .unwrap();
    let _buyer_rx = h.connect("buyer-1");
    let _seller_rx = h.connect("seller-1");

    h.dispatch(join(ROOM, ParticipantRole::Buyer, "Asha", "hi"), "buyer-1")
        .await
        .unwrap();
    h.dispatch(join(ROOM, ParticipantRole::Seller, "Bharat", "mr"), "seller-1")
        .await
        .unwrap();
    h.dispatch(
        InboundEvent::SubmitOffer {
            room_key: key(ROOM),
            quantity: 10.0,
            unit_price: 1950.0,
            purpose: None,
        },
        "buyer-1",
    )
    .await
    .unwrap();
    h.dispatch(
        InboundEvent::SellerDecision {
            room_key: key(ROOM),
            decision: SellerChoice::Accept,
            counter_price: None,
        },
        "seller-1",
    )
    .await
    .unwrap();
    h.dispatch(
        InboundEvent::CreateDeal {
            room_key: key(ROOM),
            items: vec![ProposedItem {
                name: "Onion".to_string(),
                quantity: 10.0,
                unit_price: 1950.0,
            }],
            total: 0.0,
        },
        "buyer-1",
    )
    .await
    .unwrap();

    let room = h.storage.load_room(&key(ROOM)).await.unwrap().unwrap();
    let deal_id = room.closure.unwrap().deal_id.unwrap();

    // Buyer signs, recording the delivery address.
    h.dispatch(
        InboundEvent::UpdateDealStatus {
            deal_id: deal_id.clone(),
            action: DealAction::SignBuyer,
            address: Some("Ward 4, Market Road, Nashik".to_string()),
        },
        "buyer-1",
    )
    .await
    .unwrap();
    let deal = h.storage.load_deal(&deal_id).await.unwrap().unwrap();
    assert!(deal.buyer_signed);
    assert!(!deal.seller_signed);
    assert_eq!(
        deal.delivery_address.as_deref(),
        Some("Ward 4, Market Road, Nashik")
    );
    assert_eq!(deal.status, DealStatus::Draft);

    // Seller's signature completes the pair.
    h.dispatch(
        InboundEvent::UpdateDealStatus {
            deal_id: deal_id.clone(),
            action: DealAction::SignSeller,
            address: None,
        },
        "seller-1",
    )
    .await
    .unwrap();
    let deal = h.storage.load_deal(&deal_id).await.unwrap().unwrap();
    assert_eq!(deal.status, DealStatus::Agreed);
    assert_eq!(deal.total, 19500.0);

    h.dispatch(
        InboundEvent::UpdateDealStatus {
            deal_id: deal_id.clone(),
            action: DealAction::Close,
            address: None,
        },
        "seller-1",
    )
    .await
    .unwrap();
    let deal = h.storage.load_deal(&deal_id).await.unwrap().unwrap();
    assert_eq!(deal.status, DealStatus::Closed);

    // Closed is terminal.
    let err = h
        .dispatch(
            InboundEvent::UpdateDealStatus {
                deal_id,
                action: DealAction::FailDelivery,
                address: None,
            },
            "seller-1",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SaudaError::InvalidDealTransition { .. }));
}

// ---- Test 3: Per-room ordering ----

#[tokio::test]
async fn room_log_preserves_send_order() {
    let h = NegotiationHarness::builder().build().await.unwrap();
    let _rx = h.connect("buyer-1");
    h.dispatch(join(ROOM, ParticipantRole::Buyer, "Asha", "hi"), "buyer-1")
        .await
        .unwrap();

    for i in 0..12 {
        h.dispatch(
            InboundEvent::SendMessage {
                room_key: key(ROOM),
                role: ParticipantRole::Buyer,
                text: format!("shipment note {i}"),
                language: "hi".to_string(),
                audio_ref: None,
            },
            "buyer-1",
        )
        .await
        .unwrap();
    }

    let log = h.storage.load_messages(&key(ROOM)).await.unwrap();
    let notes: Vec<&str> = log
        .iter()
        .filter(|m| m.sender == ParticipantRole::Buyer)
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(notes.len(), 12);
    for (i, text) in notes.iter().enumerate() {
        assert_eq!(*text, format!("shipment note {i}"));
    }
    assert!(log.windows(2).all(|pair| pair[0].seq < pair[1].seq));
}

// ---- Test 4: Room isolation ----

#[tokio::test]
async fn rooms_progress_independently() {
    const ROOM_A: &str = "room-seller-21-buyer-7-1";
    const ROOM_B: &str = "room-seller-21-buyer-8-1";

    let h = NegotiationHarness::builder().build().await.unwrap();
    let _a = h.connect("buyer-a");
    let _b = h.connect("buyer-b");
    h.dispatch(join(ROOM_A, ParticipantRole::Buyer, "Asha", "hi"), "buyer-a")
        .await
        .unwrap();
    h.dispatch(join(ROOM_B, ParticipantRole::Buyer, "Ravi", "mr"), "buyer-b")
        .await
        .unwrap();

    h.dispatch(
        InboundEvent::EndNegotiation {
            room_key: key(ROOM_A),
            initiator: ParticipantRole::Buyer,
        },
        "buyer-a",
    )
    .await
    .unwrap();

    // Room B still takes traffic.
    h.dispatch(
        InboundEvent::SendMessage {
            room_key: key(ROOM_B),
            role: ParticipantRole::Buyer,
            text: "is the lot still available".to_string(),
            language: "mr".to_string(),
            audio_ref: None,
        },
        "buyer-b",
    )
    .await
    .unwrap();

    // Room A does not.
    let err = h
        .dispatch(
            InboundEvent::SendMessage {
                room_key: key(ROOM_A),
                role: ParticipantRole::Buyer,
                text: "one more thing".to_string(),
                language: "hi".to_string(),
                audio_ref: None,
            },
            "buyer-a",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SaudaError::RoomClosed { .. }));

    assert!(h
        .storage
        .load_room(&key(ROOM_A))
        .await
        .unwrap()
        .unwrap()
        .is_closed());
    assert!(!h
        .storage
        .load_room(&key(ROOM_B))
        .await
        .unwrap()
        .unwrap()
        .is_closed());
}

// ---- Test 5: Join idempotence ----

#[tokio::test]
async fn join_is_idempotent_before_any_mutation() {
    let h = NegotiationHarness::builder().build().await.unwrap();
    let mut rx = h.connect("buyer-1");

    h.dispatch(join(ROOM, ParticipantRole::Buyer, "Asha", "hi"), "buyer-1")
        .await
        .unwrap();
    let first = h.storage.load_room(&key(ROOM)).await.unwrap().unwrap();
    let log_before = h.storage.load_messages(&key(ROOM)).await.unwrap().len();

    h.dispatch(join(ROOM, ParticipantRole::Buyer, "Asha", "hi"), "buyer-1")
        .await
        .unwrap();
    let second = h.storage.load_room(&key(ROOM)).await.unwrap().unwrap();

    assert_eq!(second.phase, first.phase);
    assert_eq!(second.greeting, first.greeting);
    assert_eq!(
        h.storage.load_messages(&key(ROOM)).await.unwrap().len(),
        log_before
    );

    // Both joins answered with a full snapshot.
    let mut syncs = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, OutboundEvent::RoomStateSync { .. }) {
            syncs += 1;
        }
    }
    assert_eq!(syncs, 2);
}
