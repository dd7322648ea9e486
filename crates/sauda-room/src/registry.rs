// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection fan-out and the live room registry.
//!
//! The `Broadcaster` owns two directions of plumbing: a registry of
//! connections and their outbound queues, and subscription lists per room
//! and per seller channel. The `Dispatcher` owns the map of running room
//! actors. It routes every inbound event to the right actor, creating or
//! resurrecting rooms on demand, and applies deal lifecycle updates,
//! which outlive their rooms.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use sauda_core::events::{InboundEvent, OutboundEvent};
use sauda_core::types::{DealAction, DealId, DealStatus, RoomKey, VendorId};
use sauda_core::SaudaError;

use crate::actor::{RoomActor, RoomDeps, RoomHandle};
use crate::state;

/// Opaque per-connection identifier assigned by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnId(pub String);

struct Subscriber {
    conn: ConnId,
    tx: mpsc::Sender<OutboundEvent>,
}

/// Fans outbound events to connections, rooms, and seller channels.
///
/// Delivery never blocks a room actor: events go out with `try_send`, a
/// full queue drops the event (the client recovers with a join resync),
/// and a closed queue prunes the subscriber.
#[derive(Default)]
pub struct Broadcaster {
    conns: DashMap<ConnId, mpsc::Sender<OutboundEvent>>,
    rooms: DashMap<RoomKey, Vec<Subscriber>>,
    sellers: DashMap<VendorId, Vec<Subscriber>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outbound queue. The transport calls this
    /// once per socket, before any event is dispatched for it.
    pub fn register(&self, conn: ConnId, tx: mpsc::Sender<OutboundEvent>) {
        self.conns.insert(conn, tx);
    }

    /// Subscribes a registered connection to a room's broadcast events.
    pub fn subscribe(&self, room: &RoomKey, conn: &ConnId) {
        let Some(tx) = self.conns.get(conn).map(|tx| tx.clone()) else {
            warn!(conn = %conn.0, room = %room.0, "subscribe from unregistered connection");
            return;
        };
        let mut subs = self.rooms.entry(room.clone()).or_default();
        if subs.iter().all(|sub| sub.conn != *conn) {
            subs.push(Subscriber {
                conn: conn.clone(),
                tx,
            });
        }
    }

    /// Subscribes a registered connection to a seller's notification
    /// channel.
    pub fn join_seller_channel(&self, vendor: &VendorId, conn: &ConnId) {
        let Some(tx) = self.conns.get(conn).map(|tx| tx.clone()) else {
            warn!(conn = %conn.0, seller = %vendor.0, "subscribe from unregistered connection");
            return;
        };
        let mut subs = self.sellers.entry(vendor.clone()).or_default();
        if subs.iter().all(|sub| sub.conn != *conn) {
            subs.push(Subscriber {
                conn: conn.clone(),
                tx,
            });
        }
    }

    /// Drops a connection and every subscription it holds.
    pub fn disconnect(&self, conn: &ConnId) {
        self.conns.remove(conn);
        self.rooms.retain(|_, subs| {
            subs.retain(|sub| sub.conn != *conn);
            !subs.is_empty()
        });
        self.sellers.retain(|_, subs| {
            subs.retain(|sub| sub.conn != *conn);
            !subs.is_empty()
        });
    }

    /// Delivers an event to every subscriber of a room.
    pub fn broadcast(&self, room: &RoomKey, event: OutboundEvent) {
        if let Some(mut subs) = self.rooms.get_mut(room) {
            deliver(&mut subs, &event);
        }
    }

    /// Delivers an event to every subscriber of a seller channel.
    pub fn notify_seller(&self, vendor: &VendorId, event: OutboundEvent) {
        if let Some(mut subs) = self.sellers.get_mut(vendor) {
            deliver(&mut subs, &event);
        }
    }

    /// Delivers an event to a single connection.
    pub fn send_to(&self, conn: &ConnId, event: OutboundEvent) {
        if let Some(tx) = self.conns.get(conn) {
            match tx.try_send(event) {
                Ok(()) | Err(TrySendError::Closed(_)) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(conn = %conn.0, "outbound queue full, event dropped");
                }
            }
        }
    }
}

fn deliver(subs: &mut Vec<Subscriber>, event: &OutboundEvent) {
    subs.retain(|sub| match sub.tx.try_send(event.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(conn = %sub.conn.0, "outbound queue full, event dropped");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    });
}

/// Routes inbound events to room actors and owns their lifecycle.
pub struct Dispatcher {
    deps: RoomDeps,
    rooms: DashMap<RoomKey, RoomHandle>,
    deal_locks: DashMap<DealId, Arc<Mutex<()>>>,
}

impl Dispatcher {
    pub fn new(deps: RoomDeps) -> Self {
        Self {
            deps,
            rooms: DashMap::new(),
            deal_locks: DashMap::new(),
        }
    }

    /// The broadcaster shared with room actors.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.deps.broadcaster
    }

    /// Number of rooms with a running actor.
    pub fn live_rooms(&self) -> usize {
        self.rooms.len()
    }

    /// Routes one inbound event. Room-scoped events go through the room's
    /// actor mailbox; seller-channel and deal events are handled here.
    pub async fn dispatch(&self, event: InboundEvent, conn: &ConnId) -> Result<(), SaudaError> {
        match event {
            InboundEvent::JoinSellerChannel { seller_id } => {
                self.deps.broadcaster.join_seller_channel(&seller_id, conn);
                Ok(())
            }
            InboundEvent::UpdateDealStatus {
                deal_id,
                action,
                address,
            } => self.update_deal_status(deal_id, action, address).await,
            event => {
                let handle = match &event {
                    InboundEvent::Join {
                        room_key,
                        commodity,
                        location,
                        seller_id,
                        ..
                    } => {
                        // Subscribe before the actor runs so the join's
                        // own broadcasts reach this connection too.
                        self.deps.broadcaster.subscribe(room_key, conn);
                        self.resolve_or_create(room_key, commodity, location, seller_id)
                            .await?
                    }
                    _ => {
                        let Some(room_key) = event.room_key() else {
                            return Err(SaudaError::Internal(
                                "event is not room-scoped".to_string(),
                            ));
                        };
                        self.resolve(room_key).await?
                    }
                };
                handle.send(event, conn.clone()).await
            }
        }
    }

    /// Removes a room's live handle. The actor exits once its queued
    /// commands drain; later traffic resurrects the room from storage.
    pub fn retire(&self, key: &RoomKey) {
        self.rooms.remove(key);
    }

    /// Evicts live handles whose rooms have closed.
    pub fn prune_closed(&self) {
        self.rooms.retain(|_, handle| !handle.is_closed());
    }

    /// Queues an idle-close check on a room, resurrecting it if needed,
    /// then retires the handle. Called by the idle sweep.
    pub async fn close_if_idle(
        &self,
        key: &RoomKey,
        cutoff: DateTime<Utc>,
    ) -> Result<(), SaudaError> {
        let handle = self.resolve(key).await?;
        handle.close_if_idle(cutoff).await?;
        self.retire(key);
        Ok(())
    }

    /// Live handle for an existing room, resurrecting its actor from
    /// storage when it is not in memory.
    async fn resolve(&self, key: &RoomKey) -> Result<RoomHandle, SaudaError> {
        if let Some(handle) = self.rooms.get(key) {
            return Ok(handle.clone());
        }
        let Some(room) = self.deps.storage.load_room(key).await? else {
            return Err(SaudaError::RoomNotFound {
                room_key: key.0.clone(),
            });
        };
        let messages = self.deps.storage.load_messages(key).await?;
        debug!(room = %key.0, messages = messages.len(), "room resurrected from storage");
        Ok(self.install(key, RoomActor::resume(room, messages, self.deps.clone())))
    }

    /// Like [`Dispatcher::resolve`], but a storage miss creates a fresh
    /// room instead of failing. Only a join may create.
    async fn resolve_or_create(
        &self,
        key: &RoomKey,
        commodity: &str,
        location: &str,
        seller_id: &VendorId,
    ) -> Result<RoomHandle, SaudaError> {
        if let Some(handle) = self.rooms.get(key) {
            return Ok(handle.clone());
        }
        let (room, messages) = match self.deps.storage.load_room(key).await? {
            Some(room) => {
                let messages = self.deps.storage.load_messages(key).await?;
                (room, messages)
            }
            None => (
                state::new_room(
                    key.clone(),
                    commodity.to_string(),
                    location.to_string(),
                    seller_id.clone(),
                    self.deps.clock.now(),
                ),
                Vec::new(),
            ),
        };
        Ok(self.install(key, RoomActor::resume(room, messages, self.deps.clone())))
    }

    /// Spawns and registers an actor unless another task won the race, in
    /// which case the freshly built actor is dropped unspawned. Nothing
    /// is persisted until an actor processes its first command, so the
    /// loser leaves no trace.
    fn install(&self, key: &RoomKey, actor: RoomActor) -> RoomHandle {
        match self.rooms.entry(key.clone()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                let handle = actor.spawn();
                slot.insert(handle.clone());
                handle
            }
        }
    }

    /// Applies one deal lifecycle action. Deals are addressed by id and
    /// serialized per deal, since both parties may sign at once long
    /// after the owning room closed.
    async fn update_deal_status(
        &self,
        deal_id: DealId,
        action: DealAction,
        address: Option<String>,
    ) -> Result<(), SaudaError> {
        let lock = {
            let entry = self.deal_locks.entry(deal_id.clone()).or_default();
            Arc::clone(&entry)
        };
        let _guard = lock.lock().await;

        let Some(mut deal) = self.deps.storage.load_deal(&deal_id).await? else {
            return Err(SaudaError::DealNotFound {
                deal_id: deal_id.0.clone(),
            });
        };
        deal.apply(action, address, self.deps.clock.now())?;
        self.deps.storage.update_deal(&deal).await?;
        debug!(deal = %deal.id.0, status = %deal.status, "deal updated");

        if matches!(
            deal.status,
            DealStatus::Closed | DealStatus::Rejected | DealStatus::DeliveryFailed
        ) {
            self.deal_locks.remove(&deal_id);
        }

        let room_key = deal.room_key.clone();
        self.deps
            .broadcaster
            .broadcast(&room_key, OutboundEvent::DealUpdated { deal });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use sauda_config::model::NegotiationConfig;
    use sauda_core::types::{
        ClosureReason, Deal, DealItem, ParticipantRole, RoomPhase, StructuredOffer,
    };
    use sauda_core::{Clock, StorageAdapter};
    use sauda_test_utils::{ManualClock, MemoryStorage, MockMarket, MockMediator};
    use sauda_trust::TrustEngine;

    use crate::policy::NegotiationPolicy;

    const ROOM: &str = "room-seller-7-buyer-3-1";
    const SELLER: &str = "seller-7";

    struct Fixture {
        dispatcher: Dispatcher,
        storage: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
        broadcaster: Arc<Broadcaster>,
    }

    fn fixture() -> Fixture {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new());
        let broadcaster = Arc::new(Broadcaster::new());
        let deps = RoomDeps {
            storage: storage.clone(),
            market: Arc::new(MockMarket::new()),
            mediator: Arc::new(MockMediator::new()),
            trust: Arc::new(TrustEngine::new(storage.clone(), clock.clone())),
            policy: Arc::new(NegotiationPolicy::new(&NegotiationConfig::default())),
            clock: clock.clone(),
            broadcaster: broadcaster.clone(),
        };
        Fixture {
            dispatcher: Dispatcher::new(deps),
            storage,
            clock,
            broadcaster,
        }
    }

    fn connect(
        broadcaster: &Broadcaster,
        id: &str,
    ) -> (ConnId, mpsc::Receiver<OutboundEvent>) {
        let conn = ConnId(id.to_string());
        let (tx, rx) = mpsc::channel(16);
        broadcaster.register(conn.clone(), tx);
        (conn, rx)
    }

    fn join_event(role: ParticipantRole, name: &str, lang: &str) -> InboundEvent {
        InboundEvent::Join {
            room_key: RoomKey(ROOM.to_string()),
            role,
            display_name: name.to_string(),
            language: lang.to_string(),
            commodity: "Wheat".to_string(),
            location: "Nashik".to_string(),
            seller_id: VendorId(SELLER.to_string()),
        }
    }

    fn draft_deal(fixture: &Fixture, id: &str) -> Deal {
        Deal {
            id: DealId(id.to_string()),
            room_key: RoomKey(ROOM.to_string()),
            items: vec![DealItem {
                name: "Wheat".to_string(),
                quantity: 100.0,
                unit_price: 21.0,
                subtotal: 2100.0,
            }],
            total: 2100.0,
            buyer_signed: false,
            seller_signed: false,
            delivery_address: None,
            status: DealStatus::Draft,
            created_at: fixture.clock.now(),
            updated_at: fixture.clock.now(),
        }
    }

    #[tokio::test]
    async fn dispatching_to_unknown_room_is_not_found() {
        let f = fixture();
        let (conn, _rx) = connect(&f.broadcaster, "c1");

        let err = f
            .dispatcher
            .dispatch(
                InboundEvent::SendMessage {
                    room_key: RoomKey("room-nobody-nowhere-1".to_string()),
                    role: ParticipantRole::Buyer,
                    text: "hello".to_string(),
                    language: "en".to_string(),
                    audio_ref: None,
                },
                &conn,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SaudaError::RoomNotFound { .. }));
        assert_eq!(f.dispatcher.live_rooms(), 0);
    }

    #[tokio::test]
    async fn join_creates_room_and_notifies_seller_channel() {
        let f = fixture();
        let (buyer, mut buyer_rx) = connect(&f.broadcaster, "buyer");
        let (seller, mut seller_rx) = connect(&f.broadcaster, "seller");

        f.dispatcher
            .dispatch(
                InboundEvent::JoinSellerChannel {
                    seller_id: VendorId(SELLER.to_string()),
                },
                &seller,
            )
            .await
            .unwrap();
        f.dispatcher
            .dispatch(join_event(ParticipantRole::Buyer, "Ravi", "hi"), &buyer)
            .await
            .unwrap();

        match seller_rx.try_recv().unwrap() {
            OutboundEvent::NewNegotiationRequest {
                buyer_name,
                commodity,
                ..
            } => {
                assert_eq!(buyer_name, "Ravi");
                assert_eq!(commodity, "Wheat");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            buyer_rx.try_recv().unwrap(),
            OutboundEvent::RoomStateSync {
                phase: RoomPhase::Offer,
                ..
            }
        ));
        assert_eq!(f.storage.room_count().await, 1);
        assert_eq!(f.dispatcher.live_rooms(), 1);
    }

    #[tokio::test]
    async fn retired_room_resurrects_from_storage() {
        let f = fixture();
        let (buyer, mut buyer_rx) = connect(&f.broadcaster, "buyer");

        f.dispatcher
            .dispatch(join_event(ParticipantRole::Buyer, "Ravi", "hi"), &buyer)
            .await
            .unwrap();
        f.dispatcher
            .dispatch(
                InboundEvent::SubmitOffer {
                    room_key: RoomKey(ROOM.to_string()),
                    quantity: 100.0,
                    unit_price: 20.0,
                    purpose: None,
                },
                &buyer,
            )
            .await
            .unwrap();

        f.dispatcher.retire(&RoomKey(ROOM.to_string()));
        assert_eq!(f.dispatcher.live_rooms(), 0);

        f.dispatcher
            .dispatch(join_event(ParticipantRole::Seller, "Lakshmi", "te"), &buyer)
            .await
            .unwrap();

        let mut resynced = None;
        while let Ok(event) = buyer_rx.try_recv() {
            if let OutboundEvent::RoomStateSync {
                phase,
                current_offer,
                ..
            } = event
            {
                resynced = Some((phase, current_offer));
            }
        }
        let (phase, offer): (RoomPhase, Option<StructuredOffer>) = resynced.unwrap();
        assert_eq!(phase, RoomPhase::SellerReview);
        assert_eq!(offer.unwrap().unit_price, 20.0);
        assert_eq!(f.storage.message_count(&RoomKey(ROOM.to_string())).await, 1);
        assert_eq!(f.dispatcher.live_rooms(), 1);
    }

    #[tokio::test]
    async fn missing_deal_update_is_not_found() {
        let f = fixture();
        let (conn, _rx) = connect(&f.broadcaster, "c1");

        let err = f
            .dispatcher
            .dispatch(
                InboundEvent::UpdateDealStatus {
                    deal_id: DealId("deal-404".to_string()),
                    action: DealAction::SignBuyer,
                    address: None,
                },
                &conn,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SaudaError::DealNotFound { .. }));
    }

    #[tokio::test]
    async fn both_signatures_move_deal_to_agreed() {
        let f = fixture();
        let (conn, mut rx) = connect(&f.broadcaster, "c1");
        f.broadcaster.subscribe(&RoomKey(ROOM.to_string()), &conn);
        f.storage.create_deal(&draft_deal(&f, "deal-1")).await.unwrap();

        f.dispatcher
            .dispatch(
                InboundEvent::UpdateDealStatus {
                    deal_id: DealId("deal-1".to_string()),
                    action: DealAction::SignBuyer,
                    address: Some("Market Yard, Nashik".to_string()),
                },
                &conn,
            )
            .await
            .unwrap();
        f.dispatcher
            .dispatch(
                InboundEvent::UpdateDealStatus {
                    deal_id: DealId("deal-1".to_string()),
                    action: DealAction::SignSeller,
                    address: None,
                },
                &conn,
            )
            .await
            .unwrap();

        let stored = f
            .storage
            .load_deal(&DealId("deal-1".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, DealStatus::Agreed);
        assert!(stored.buyer_signed && stored.seller_signed);
        assert_eq!(stored.delivery_address.as_deref(), Some("Market Yard, Nashik"));

        assert!(matches!(
            rx.try_recv().unwrap(),
            OutboundEvent::DealUpdated { .. }
        ));
        match rx.try_recv().unwrap() {
            OutboundEvent::DealUpdated { deal } => assert_eq!(deal.status, DealStatus::Agreed),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn closing_twice_is_an_invalid_transition() {
        let f = fixture();
        let (conn, _rx) = connect(&f.broadcaster, "c1");
        let mut deal = draft_deal(&f, "deal-2");
        deal.status = DealStatus::Agreed;
        f.storage.create_deal(&deal).await.unwrap();

        f.dispatcher
            .dispatch(
                InboundEvent::UpdateDealStatus {
                    deal_id: DealId("deal-2".to_string()),
                    action: DealAction::Close,
                    address: None,
                },
                &conn,
            )
            .await
            .unwrap();
        let err = f
            .dispatcher
            .dispatch(
                InboundEvent::UpdateDealStatus {
                    deal_id: DealId("deal-2".to_string()),
                    action: DealAction::Close,
                    address: None,
                },
                &conn,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SaudaError::InvalidDealTransition { .. }));
    }

    #[tokio::test]
    async fn idle_room_closes_as_abandoned_and_rejects_later_traffic() {
        let f = fixture();
        let (buyer, _buyer_rx) = connect(&f.broadcaster, "buyer");
        f.dispatcher
            .dispatch(join_event(ParticipantRole::Buyer, "Ravi", "hi"), &buyer)
            .await
            .unwrap();

        f.clock.advance(Duration::hours(25));
        let cutoff = f.clock.now() - Duration::hours(24);
        f.dispatcher
            .close_if_idle(&RoomKey(ROOM.to_string()), cutoff)
            .await
            .unwrap();
        assert_eq!(f.dispatcher.live_rooms(), 0);

        let err = f
            .dispatcher
            .dispatch(
                InboundEvent::SendMessage {
                    room_key: RoomKey(ROOM.to_string()),
                    role: ParticipantRole::Buyer,
                    text: "still there?".to_string(),
                    language: "en".to_string(),
                    audio_ref: None,
                },
                &buyer,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SaudaError::RoomClosed {
                reason: ClosureReason::Abandoned,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn prune_drops_handles_of_closed_rooms() {
        let f = fixture();
        let (buyer, _buyer_rx) = connect(&f.broadcaster, "buyer");
        f.dispatcher
            .dispatch(join_event(ParticipantRole::Buyer, "Ravi", "hi"), &buyer)
            .await
            .unwrap();

        f.dispatcher.prune_closed();
        assert_eq!(f.dispatcher.live_rooms(), 1);

        f.dispatcher
            .dispatch(
                InboundEvent::EndNegotiation {
                    room_key: RoomKey(ROOM.to_string()),
                    initiator: ParticipantRole::Buyer,
                },
                &buyer,
            )
            .await
            .unwrap();
        f.dispatcher.prune_closed();
        assert_eq!(f.dispatcher.live_rooms(), 0);
    }

    #[tokio::test]
    async fn disconnect_prunes_every_subscription() {
        let f = fixture();
        let (buyer, mut buyer_rx) = connect(&f.broadcaster, "buyer");
        f.dispatcher
            .dispatch(join_event(ParticipantRole::Buyer, "Ravi", "hi"), &buyer)
            .await
            .unwrap();
        while buyer_rx.try_recv().is_ok() {}

        f.broadcaster.disconnect(&buyer);
        f.broadcaster.broadcast(
            &RoomKey(ROOM.to_string()),
            OutboundEvent::ModerationWarning {
                room_key: RoomKey(ROOM.to_string()),
                reason: "never delivered".to_string(),
            },
        );
        assert!(buyer_rx.try_recv().is_err());
    }
}
