// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-room actor.
//!
//! Each live room runs one actor task owning the room record and message
//! log. Commands arrive through an mpsc mailbox, so at most one mutation
//! is in flight per room while different rooms proceed in parallel. The
//! actor writes through to storage on every mutation; the in-memory copy
//! is authoritative between writes.
//!
//! Trust scoring is fire-and-forget: the actor emits events to the trust
//! engine and never waits for them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use sauda_core::events::{
    BuyerChoice, DecisionOutcome, InboundEvent, OutboundEvent, ProposedItem, SellerChoice,
};
use sauda_core::traits::market::MarketDataSource;
use sauda_core::traits::mediator::MediatorGateway;
use sauda_core::traits::storage::StorageAdapter;
use sauda_core::types::{
    ChatMessage, ClosureReason, CounterOffer, Deal, DealId, DealItem, DealStatus,
    LocalizedText, MarketSnapshot, MessageMeta, ParticipantRole, PriceBand, RoomPhase,
    RoomRecord, RoomStatus, StructuredOffer,
};
use sauda_core::{Clock, SaudaError};
use sauda_trust::{TrustEngine, TrustEvent};

use crate::policy::NegotiationPolicy;
use crate::registry::{Broadcaster, ConnId};
use crate::state;

/// Commands queued per message approximately; bursts beyond this apply
/// backpressure to the sending connection.
const MAILBOX_CAPACITY: usize = 64;

/// Shared collaborators handed to every room actor.
#[derive(Clone)]
pub struct RoomDeps {
    pub storage: Arc<dyn StorageAdapter>,
    pub market: Arc<dyn MarketDataSource>,
    pub mediator: Arc<dyn MediatorGateway>,
    pub trust: Arc<TrustEngine>,
    pub policy: Arc<NegotiationPolicy>,
    pub clock: Arc<dyn Clock>,
    pub broadcaster: Arc<Broadcaster>,
}

/// A command in a room actor's mailbox.
pub enum RoomCommand {
    /// A participant operation, answered through `reply`. Targeted events
    /// (snapshots, warnings) go straight to `conn` via the broadcaster.
    Client {
        event: InboundEvent,
        conn: ConnId,
        reply: oneshot::Sender<Result<(), SaudaError>>,
    },
    /// Close the room as abandoned if its last activity is at or before
    /// the cutoff. Sent by the idle sweep; `done` fires once the check
    /// ran, whether or not it closed anything.
    CloseIfIdle {
        cutoff: DateTime<Utc>,
        done: oneshot::Sender<()>,
    },
}

/// Cloneable handle to a running room actor.
#[derive(Clone)]
pub struct RoomHandle {
    tx: mpsc::Sender<RoomCommand>,
    closed: Arc<AtomicBool>,
}

impl RoomHandle {
    /// Whether the room behind this handle has closed. Lets the registry
    /// evict idle actors without a mailbox round trip.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Sends one participant operation and waits for its outcome.
    pub async fn send(&self, event: InboundEvent, conn: ConnId) -> Result<(), SaudaError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RoomCommand::Client {
                event,
                conn,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SaudaError::Internal("room actor is gone".to_string()))?;
        reply_rx
            .await
            .map_err(|_| SaudaError::Internal("room actor dropped the request".to_string()))?
    }

    /// Runs an idle-close check and waits until the actor has applied it.
    pub async fn close_if_idle(&self, cutoff: DateTime<Utc>) -> Result<(), SaudaError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(RoomCommand::CloseIfIdle {
                cutoff,
                done: done_tx,
            })
            .await
            .map_err(|_| SaudaError::Internal("room actor is gone".to_string()))?;
        done_rx
            .await
            .map_err(|_| SaudaError::Internal("room actor dropped the request".to_string()))
    }
}

/// Owns one room's record and message log and applies all mutations.
pub struct RoomActor {
    room: RoomRecord,
    messages: Vec<ChatMessage>,
    deps: RoomDeps,
}

impl RoomActor {
    /// Builds an actor around existing state, freshly created or loaded
    /// back from storage.
    pub fn resume(room: RoomRecord, messages: Vec<ChatMessage>, deps: RoomDeps) -> Self {
        Self {
            room,
            messages,
            deps,
        }
    }

    /// Spawns the actor task and returns its mailbox handle.
    pub fn spawn(self) -> RoomHandle {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let closed = Arc::new(AtomicBool::new(self.room.is_closed()));
        tokio::spawn(self.run(rx, Arc::clone(&closed)));
        RoomHandle { tx, closed }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<RoomCommand>, closed: Arc<AtomicBool>) {
        debug!(room = %self.room.key.0, "room actor started");
        while let Some(command) = rx.recv().await {
            match command {
                RoomCommand::Client { event, conn, reply } => {
                    let result = self.handle(event, &conn).await;
                    if let Err(err) = &result {
                        debug!(room = %self.room.key.0, error = %err, "room operation rejected");
                    }
                    closed.store(self.room.is_closed(), Ordering::Relaxed);
                    let _ = reply.send(result);
                }
                RoomCommand::CloseIfIdle { cutoff, done } => {
                    self.close_if_idle(cutoff).await;
                    closed.store(self.room.is_closed(), Ordering::Relaxed);
                    let _ = done.send(());
                }
            }
        }
        debug!(room = %self.room.key.0, "room actor stopped");
    }

    async fn handle(&mut self, event: InboundEvent, conn: &ConnId) -> Result<(), SaudaError> {
        match event {
            InboundEvent::Join {
                role,
                display_name,
                language,
                ..
            } => self.join(conn, role, display_name, language).await,
            InboundEvent::UpdatePreference { role, language, .. } => {
                self.update_preference(conn, role, language).await
            }
            InboundEvent::SubmitOffer {
                quantity,
                unit_price,
                purpose,
                ..
            } => self.submit_offer(quantity, unit_price, purpose).await,
            InboundEvent::SellerDecision {
                decision,
                counter_price,
                ..
            } => self.seller_decision(decision, counter_price).await,
            InboundEvent::BuyerDecision { decision, .. } => self.buyer_decision(decision).await,
            InboundEvent::SendMessage {
                role,
                text,
                language,
                audio_ref,
                ..
            } => self.send_message(conn, role, text, language, audio_ref).await,
            InboundEvent::PreviewDeal {
                proposer, items, ..
            } => self.preview_deal(proposer, &items),
            InboundEvent::CreateDeal { items, .. } => self.create_deal(&items).await,
            InboundEvent::EndNegotiation { initiator, .. } => {
                self.end_negotiation(initiator).await
            }
            InboundEvent::JoinSellerChannel { .. } | InboundEvent::UpdateDealStatus { .. } => {
                Err(SaudaError::Internal("event is not room-scoped".to_string()))
            }
        }
    }

    /// Join is idempotent. The first join runs the greeting flow: capture
    /// the market band, generate and localize the greeting, advance to
    /// the offer phase, and ping the seller's notification channel. Every
    /// join answers with a full snapshot; a join to a closed room is a
    /// plain resync.
    async fn join(
        &mut self,
        conn: &ConnId,
        role: ParticipantRole,
        display_name: String,
        language: String,
    ) -> Result<(), SaudaError> {
        if role == ParticipantRole::Mediator {
            return Err(SaudaError::InvalidRequest(
                "the mediator is not a joinable role".to_string(),
            ));
        }
        if self.room.is_closed() {
            self.send_snapshot(conn, role);
            return Ok(());
        }

        let now = self.deps.clock.now();
        if !display_name.is_empty() {
            match role {
                ParticipantRole::Buyer => self.room.buyer_name = Some(display_name),
                ParticipantRole::Seller => self.room.seller_name = Some(display_name),
                ParticipantRole::Mediator => unreachable!("rejected above"),
            }
        }
        let lang_changed = !language.is_empty() && self.room.language_of(role) != language;
        if lang_changed {
            match role {
                ParticipantRole::Buyer => self.room.buyer_lang = language.clone(),
                ParticipantRole::Seller => self.room.seller_lang = language.clone(),
                ParticipantRole::Mediator => unreachable!("rejected above"),
            }
        }

        let newly_opened = self.room.phase == RoomPhase::Greeting;
        if newly_opened {
            let band = self
                .deps
                .market
                .current_price(&self.room.commodity, &self.room.location)
                .await?;
            self.room.market = Some(MarketSnapshot {
                commodity: self.room.commodity.clone(),
                location: self.room.location.clone(),
                band,
                captured_at: now,
            });
            let greeting = self
                .deps
                .mediator
                .greeting(&self.room.commodity, &self.room.location, &band, "en")
                .await?;
            self.room.greeting = Some(self.localize(&greeting).await?);
            self.room.phase = RoomPhase::Offer;
        } else if lang_changed {
            // A mid-room join with a new language behaves like an explicit
            // preference change: existing content is re-localized so the
            // snapshot below is already in the right language.
            self.retranslate_for(role, &language).await?;
        }

        self.room.last_activity_at = now;
        self.deps.storage.upsert_room(&self.room).await?;

        if newly_opened {
            self.deps.broadcaster.notify_seller(
                &self.room.seller_id,
                OutboundEvent::NewNegotiationRequest {
                    room_key: self.room.key.clone(),
                    buyer_name: self.room.display_name_of(ParticipantRole::Buyer),
                    commodity: self.room.commodity.clone(),
                    location: self.room.location.clone(),
                    at: now,
                },
            );
            info!(
                room = %self.room.key.0,
                seller = %self.room.seller_id.0,
                commodity = %self.room.commodity,
                "negotiation opened"
            );
        }

        self.send_snapshot(conn, role);
        Ok(())
    }

    /// Re-translates the history into the participant's new language and
    /// re-emits the snapshot to the caller only. Messages originally in
    /// the new language drop their cached entry and fall back to the
    /// original text.
    async fn update_preference(
        &mut self,
        conn: &ConnId,
        role: ParticipantRole,
        language: String,
    ) -> Result<(), SaudaError> {
        state::require_open(&self.room)?;
        if role == ParticipantRole::Mediator {
            return Err(SaudaError::InvalidRequest(
                "the mediator has no language preference".to_string(),
            ));
        }
        if language.is_empty() {
            return Err(SaudaError::InvalidRequest(
                "language preference is empty".to_string(),
            ));
        }

        match role {
            ParticipantRole::Buyer => self.room.buyer_lang = language.clone(),
            ParticipantRole::Seller => self.room.seller_lang = language.clone(),
            ParticipantRole::Mediator => unreachable!("rejected above"),
        }
        self.retranslate_for(role, &language).await?;

        self.room.last_activity_at = self.deps.clock.now();
        self.deps.storage.upsert_room(&self.room).await?;
        debug!(
            room = %self.room.key.0,
            role = %role,
            language = %language,
            messages = self.messages.len(),
            "preference updated, history re-translated"
        );
        self.send_snapshot(conn, role);
        Ok(())
    }

    /// Records the buyer's structured offer, has the mediator assess it
    /// against the market band, and hands the room to the seller.
    async fn submit_offer(
        &mut self,
        quantity: f64,
        unit_price: f64,
        purpose: Option<String>,
    ) -> Result<(), SaudaError> {
        state::require_phase(&self.room, RoomPhase::Offer, "submit_offer")?;
        if !(quantity > 0.0 && quantity.is_finite())
            || !(unit_price > 0.0 && unit_price.is_finite())
        {
            return Err(SaudaError::InvalidRequest(
                "offer quantity and unit price must be positive".to_string(),
            ));
        }

        let band = self.band()?;
        let now = self.deps.clock.now();
        let offer = StructuredOffer {
            quantity,
            unit_price,
            purpose,
            submitted_at: now,
        };
        let assessment = self
            .deps
            .mediator
            .evaluate_offer(&offer, &self.room.commodity, &band)
            .await?;
        let too_low =
            self.deps.policy.offer_below_floor(unit_price, &band) || assessment.is_too_low;

        let mut text = format!(
            "Offered {} quintals of {} at ₹{} per quintal",
            offer.quantity, self.room.commodity, offer.unit_price
        );
        if let Some(purpose) = &offer.purpose {
            text.push_str(&format!(" for {purpose}"));
        }
        text.push('.');

        let seq = self.next_seq();
        let offer_message = self
            .system_message(
                seq,
                ParticipantRole::Buyer,
                text,
                Some(MessageMeta::Offer {
                    quantity,
                    unit_price,
                }),
            )
            .await?;
        let mut turn = vec![offer_message];
        if let Some(insight) = assessment.insight {
            self.room.insight = Some(self.localize(&insight).await?);
            let insight_message = self
                .system_message(seq + 1, ParticipantRole::Mediator, insight, None)
                .await?;
            turn.push(insight_message);
        }

        self.room.current_offer = Some(offer.clone());
        self.room.offer_too_low = Some(too_low);
        self.room.phase = RoomPhase::SellerReview;
        self.room.last_activity_at = now;
        self.deps.storage.commit_turn(&self.room, &turn).await?;

        info!(
            room = %self.room.key.0,
            quantity,
            unit_price,
            too_low,
            "offer submitted"
        );

        self.broadcast(OutboundEvent::OfferSubmitted {
            room_key: self.room.key.clone(),
            offer,
            too_low,
        });
        self.broadcast(OutboundEvent::NewMessage {
            room_key: self.room.key.clone(),
            message: turn[0].clone(),
        });
        if let Some(insight_message) = turn.get(1) {
            self.broadcast(OutboundEvent::AiInsight {
                room_key: self.room.key.clone(),
                message: insight_message.clone(),
            });
        }
        self.messages.extend(turn);
        Ok(())
    }

    /// The seller's verdict on the current offer: accept opens free chat,
    /// counter hands the price back to the buyer, reject ends the room.
    async fn seller_decision(
        &mut self,
        decision: SellerChoice,
        counter_price: Option<f64>,
    ) -> Result<(), SaudaError> {
        state::require_phase(&self.room, RoomPhase::SellerReview, "seller_decision")?;
        let now = self.deps.clock.now();

        match decision {
            SellerChoice::Accept => {
                self.room.phase = RoomPhase::Chat;
                self.room.status = RoomStatus::Active;
                self.room.last_activity_at = now;
                let message = self
                    .system_message(
                        self.next_seq(),
                        ParticipantRole::Seller,
                        "Offer accepted. Let's settle the details.".to_string(),
                        None,
                    )
                    .await?;
                self.deps
                    .storage
                    .commit_turn(&self.room, std::slice::from_ref(&message))
                    .await?;
                self.broadcast(OutboundEvent::DecisionUpdate {
                    room_key: self.room.key.clone(),
                    by: ParticipantRole::Seller,
                    decision: DecisionOutcome::Accepted,
                    counter_price: None,
                });
                self.broadcast(OutboundEvent::NewMessage {
                    room_key: self.room.key.clone(),
                    message: message.clone(),
                });
                self.messages.push(message);
            }
            SellerChoice::Counter => {
                let Some(price) = counter_price else {
                    return Err(SaudaError::InvalidRequest(
                        "counter decision requires a counter price".to_string(),
                    ));
                };
                if !(price > 0.0 && price.is_finite()) {
                    return Err(SaudaError::InvalidRequest(
                        "counter price must be positive".to_string(),
                    ));
                }
                let band = self.band()?;
                let Some(current) = self.room.current_offer.clone() else {
                    return Err(SaudaError::Internal(
                        "seller review without a current offer".to_string(),
                    ));
                };

                // The counter is evaluated as an offer at the countered
                // price for the same quantity.
                let probe = StructuredOffer {
                    quantity: current.quantity,
                    unit_price: price,
                    purpose: None,
                    submitted_at: now,
                };
                let assessment = self
                    .deps
                    .mediator
                    .evaluate_offer(&probe, &self.room.commodity, &band)
                    .await?;

                self.room.counter_offer = Some(CounterOffer {
                    unit_price: price,
                    submitted_at: now,
                });
                self.room.phase = RoomPhase::BuyerCounterReview;
                self.room.status = RoomStatus::Active;
                self.room.last_activity_at = now;

                let seq = self.next_seq();
                let counter_message = self
                    .system_message(
                        seq,
                        ParticipantRole::Seller,
                        format!("Countered at ₹{price} per quintal."),
                        Some(MessageMeta::Counter { unit_price: price }),
                    )
                    .await?;
                let mut turn = vec![counter_message];
                if let Some(insight) = assessment.insight {
                    self.room.insight = Some(self.localize(&insight).await?);
                    let insight_message = self
                        .system_message(seq + 1, ParticipantRole::Mediator, insight, None)
                        .await?;
                    turn.push(insight_message);
                }
                self.deps.storage.commit_turn(&self.room, &turn).await?;

                self.deps.trust.spawn_record(
                    self.room.seller_id.clone(),
                    TrustEvent::CounterOffer {
                        counter_price: price,
                        modal_price: band.modal_price,
                    },
                );

                self.broadcast(OutboundEvent::DecisionUpdate {
                    room_key: self.room.key.clone(),
                    by: ParticipantRole::Seller,
                    decision: DecisionOutcome::Countered,
                    counter_price: Some(price),
                });
                self.broadcast(OutboundEvent::NewMessage {
                    room_key: self.room.key.clone(),
                    message: turn[0].clone(),
                });
                if let Some(insight_message) = turn.get(1) {
                    self.broadcast(OutboundEvent::AiInsight {
                        room_key: self.room.key.clone(),
                        message: insight_message.clone(),
                    });
                }
                self.messages.extend(turn);
            }
            SellerChoice::Reject => {
                let closure =
                    state::close(&mut self.room, ClosureReason::SellerRejected, None, now);
                self.deps.storage.upsert_room(&self.room).await?;
                self.broadcast(OutboundEvent::DecisionUpdate {
                    room_key: self.room.key.clone(),
                    by: ParticipantRole::Seller,
                    decision: DecisionOutcome::Rejected,
                    counter_price: None,
                });
                self.broadcast(OutboundEvent::ConversationClosed {
                    room_key: self.room.key.clone(),
                    closure,
                });
                info!(room = %self.room.key.0, "seller rejected the opening offer");
            }
        }
        Ok(())
    }

    /// The buyer's verdict on the counter. Both outcomes open free chat;
    /// declining a counter is reversible, not terminal.
    async fn buyer_decision(&mut self, decision: BuyerChoice) -> Result<(), SaudaError> {
        state::require_phase(&self.room, RoomPhase::BuyerCounterReview, "buyer_decision")?;
        let now = self.deps.clock.now();

        let (text, outcome) = match decision {
            BuyerChoice::Accept => (
                "Counter accepted. Let's settle the details.",
                DecisionOutcome::Accepted,
            ),
            BuyerChoice::Reject => (
                "Counter declined. Let's keep discussing.",
                DecisionOutcome::Rejected,
            ),
        };

        self.room.phase = RoomPhase::Chat;
        self.room.last_activity_at = now;
        let message = self
            .system_message(self.next_seq(), ParticipantRole::Buyer, text.to_string(), None)
            .await?;
        self.deps
            .storage
            .commit_turn(&self.room, std::slice::from_ref(&message))
            .await?;

        self.broadcast(OutboundEvent::DecisionUpdate {
            room_key: self.room.key.clone(),
            by: ParticipantRole::Buyer,
            decision: outcome,
            counter_price: None,
        });
        self.broadcast(OutboundEvent::NewMessage {
            room_key: self.room.key.clone(),
            message: message.clone(),
        });
        self.messages.push(message);
        Ok(())
    }

    /// Moderates, translates, appends, and broadcasts one live message,
    /// then runs dispute detection and the intervention triggers.
    async fn send_message(
        &mut self,
        conn: &ConnId,
        role: ParticipantRole,
        text: String,
        language: String,
        audio_ref: Option<String>,
    ) -> Result<(), SaudaError> {
        state::require_open(&self.room)?;
        if role == ParticipantRole::Mediator {
            return Err(SaudaError::InvalidRequest(
                "only the buyer and seller send messages".to_string(),
            ));
        }
        if text.trim().is_empty() {
            return Err(SaudaError::InvalidRequest("message text is empty".to_string()));
        }
        let language = if language.is_empty() {
            self.room.language_of(role).to_string()
        } else {
            language
        };

        // Tier one: the local deny list, every message, every phase.
        if self.deps.policy.banned_word_in(&text).is_some() {
            debug!(room = %self.room.key.0, role = %role, "message blocked by deny list");
            self.deps.broadcaster.send_to(
                conn,
                OutboundEvent::ModerationWarning {
                    room_key: self.room.key.clone(),
                    reason: "message contains language that is not allowed here".to_string(),
                },
            );
            return Ok(());
        }

        // Tier two: the gateway moderation pass, structured phases only.
        if self.room.phase != RoomPhase::Chat {
            let verdict = self
                .deps
                .mediator
                .check_safety(&text, &self.messages)
                .await?;
            if !verdict.is_safe {
                let reason = verdict
                    .reason
                    .unwrap_or_else(|| "message flagged by moderation".to_string());
                debug!(room = %self.room.key.0, role = %role, "message blocked by moderation");
                self.deps.broadcaster.send_to(
                    conn,
                    OutboundEvent::ModerationWarning {
                        room_key: self.room.key.clone(),
                        reason,
                    },
                );
                return Ok(());
            }
        }

        let consult = self
            .deps
            .policy
            .should_consult_mediator(&text, &self.messages, self.room.phase);

        let message = self
            .participant_message(self.next_seq(), role, text.clone(), language, audio_ref)
            .await?;
        let mut turn = vec![message];
        let mut extracted = None;
        if consult {
            let band = self.band()?;
            let analysis = self
                .deps
                .mediator
                .analyze(
                    role,
                    &text,
                    &self.room.commodity,
                    &band,
                    &self.messages,
                    self.room.phase,
                )
                .await?;
            if analysis.should_intervene
                && let Some(note) = analysis.message
            {
                let intervention_message = self
                    .system_message(turn[0].seq + 1, ParticipantRole::Mediator, note, None)
                    .await?;
                turn.push(intervention_message);
            }
            extracted = analysis.extracted_deal;
        }

        if self.deps.policy.mentions_dispute(&text) {
            self.deps
                .trust
                .spawn_record(self.room.seller_id.clone(), TrustEvent::Dispute);
        }

        self.room.last_activity_at = self.deps.clock.now();
        self.deps.storage.commit_turn(&self.room, &turn).await?;

        for message in &turn {
            self.broadcast(OutboundEvent::NewMessage {
                room_key: self.room.key.clone(),
                message: message.clone(),
            });
        }
        if let Some(deal) = extracted
            && !deal.items.is_empty()
        {
            let (items, total) = reprice(deal.items);
            self.broadcast(OutboundEvent::DealPreview {
                room_key: self.room.key.clone(),
                proposer: ParticipantRole::Mediator,
                items,
                total,
            });
        }
        self.messages.extend(turn);
        Ok(())
    }

    /// Shares a draft deal with the room. Totals are recomputed here;
    /// nothing is persisted and no state changes.
    fn preview_deal(
        &self,
        proposer: ParticipantRole,
        items: &[ProposedItem],
    ) -> Result<(), SaudaError> {
        state::require_open(&self.room)?;
        if proposer == ParticipantRole::Mediator {
            return Err(SaudaError::InvalidRequest(
                "deal previews come from the buyer or seller".to_string(),
            ));
        }
        validate_items(items)?;
        let (items, total) = price_proposed(items);
        self.broadcast(OutboundEvent::DealPreview {
            room_key: self.room.key.clone(),
            proposer,
            items,
            total,
        });
        Ok(())
    }

    /// Creates the deal draft, scores the seller, and closes the room as
    /// a success. The deal then lives on independently of the room.
    async fn create_deal(&mut self, items: &[ProposedItem]) -> Result<(), SaudaError> {
        state::require_open(&self.room)?;
        validate_items(items)?;

        let now = self.deps.clock.now();
        let (items, total) = price_proposed(items);
        let deal = Deal {
            id: DealId::new(),
            room_key: self.room.key.clone(),
            items,
            total,
            buyer_signed: false,
            seller_signed: false,
            delivery_address: None,
            status: DealStatus::Draft,
            created_at: now,
            updated_at: now,
        };
        self.deps.storage.create_deal(&deal).await?;

        if let Some(snapshot) = &self.room.market {
            // Validation guarantees a positive total quantity.
            let quantity: f64 = deal.items.iter().map(|item| item.quantity).sum();
            let final_price = deal.total / quantity;
            self.deps.trust.spawn_record(
                self.room.seller_id.clone(),
                TrustEvent::DealStruck {
                    final_price,
                    modal_price: snapshot.band.modal_price,
                    dispute_count: self.deps.policy.deal_dispute_count(&self.messages),
                },
            );
        }

        let closure = state::close(
            &mut self.room,
            ClosureReason::DealSuccess,
            Some(deal.id.clone()),
            now,
        );
        self.deps.storage.upsert_room(&self.room).await?;

        info!(
            room = %self.room.key.0,
            deal = %deal.id.0,
            total = deal.total,
            "deal created, negotiation closed"
        );
        self.broadcast(OutboundEvent::DealCreated {
            room_key: self.room.key.clone(),
            deal,
        });
        self.broadcast(OutboundEvent::ConversationClosed {
            room_key: self.room.key.clone(),
            closure,
        });
        Ok(())
    }

    /// Ends the negotiation without a deal.
    async fn end_negotiation(&mut self, initiator: ParticipantRole) -> Result<(), SaudaError> {
        state::require_open(&self.room)?;
        let now = self.deps.clock.now();
        let closure = state::close(&mut self.room, ClosureReason::MutuallyEnded, None, now);
        self.deps.storage.upsert_room(&self.room).await?;
        info!(room = %self.room.key.0, initiator = %initiator, "negotiation ended");
        self.broadcast(OutboundEvent::ConversationClosed {
            room_key: self.room.key.clone(),
            closure,
        });
        Ok(())
    }

    /// Sweep request: close as abandoned when the room has been idle past
    /// the cutoff. Failures are logged; the sweep retries next cycle.
    async fn close_if_idle(&mut self, cutoff: DateTime<Utc>) {
        if self.room.is_closed() || self.room.last_activity_at > cutoff {
            return;
        }
        let now = self.deps.clock.now();
        let closure = state::close(&mut self.room, ClosureReason::Abandoned, None, now);
        match self.deps.storage.upsert_room(&self.room).await {
            Ok(()) => {
                info!(room = %self.room.key.0, "idle room closed as abandoned");
                self.broadcast(OutboundEvent::ConversationClosed {
                    room_key: self.room.key.clone(),
                    closure,
                });
            }
            Err(err) => {
                warn!(room = %self.room.key.0, error = %err, "failed to close idle room");
            }
        }
    }

    /// The market band captured at greeting time. Present in every phase
    /// past greeting.
    fn band(&self) -> Result<PriceBand, SaudaError> {
        match &self.room.market {
            Some(snapshot) => Ok(snapshot.band),
            None => Err(SaudaError::Internal(
                "room has no market snapshot".to_string(),
            )),
        }
    }

    fn next_seq(&self) -> u64 {
        self.messages.last().map_or(0, |m| m.seq + 1)
    }

    fn broadcast(&self, event: OutboundEvent) {
        self.deps.broadcaster.broadcast(&self.room.key, event);
    }

    fn send_snapshot(&self, conn: &ConnId, role: ParticipantRole) {
        self.deps
            .broadcaster
            .send_to(conn, state::snapshot_for(&self.room, &self.messages, role));
    }

    /// English mediator text with cached translations for each human
    /// participant whose preference is not English.
    async fn localize(&self, original: &str) -> Result<LocalizedText, SaudaError> {
        let mut localized = LocalizedText {
            original: original.to_string(),
            translations: HashMap::new(),
        };
        for role in [ParticipantRole::Buyer, ParticipantRole::Seller] {
            let target = self.room.language_of(role);
            if target != "en" {
                let translated = self.deps.mediator.translate(original, "en", target).await?;
                localized.translations.insert(role, translated);
            }
        }
        Ok(localized)
    }

    /// Re-localizes the greeting, insight, and message history for one
    /// participant whose language changed. A participant's own messages
    /// are left alone; messages already in the target language drop
    /// their cached entry and fall back to the original text.
    async fn retranslate_for(
        &mut self,
        role: ParticipantRole,
        language: &str,
    ) -> Result<(), SaudaError> {
        if let Some(mut greeting) = self.room.greeting.clone() {
            self.relocalize(&mut greeting, role, language).await?;
            self.room.greeting = Some(greeting);
        }
        if let Some(mut insight) = self.room.insight.clone() {
            self.relocalize(&mut insight, role, language).await?;
            self.room.insight = Some(insight);
        }

        for index in 0..self.messages.len() {
            let (sender, seq, text, source_lang) = {
                let m = &self.messages[index];
                (m.sender, m.seq, m.text.clone(), m.language.clone())
            };
            if sender == role {
                continue;
            }
            let translation = if source_lang == language {
                None
            } else {
                Some(
                    self.deps
                        .mediator
                        .translate(&text, &source_lang, language)
                        .await?,
                )
            };
            let message = &mut self.messages[index];
            match translation {
                Some(translated) => {
                    message.translations.insert(role, translated);
                }
                None => {
                    message.translations.remove(&role);
                }
            }
            self.deps
                .storage
                .update_message_translations(&self.room.key, seq, &message.translations)
                .await?;
        }
        Ok(())
    }

    /// Replaces one role's cached translation after a preference change.
    async fn relocalize(
        &self,
        text: &mut LocalizedText,
        role: ParticipantRole,
        language: &str,
    ) -> Result<(), SaudaError> {
        if language == "en" {
            text.translations.remove(&role);
            return Ok(());
        }
        let translated = self
            .deps
            .mediator
            .translate(&text.original, "en", language)
            .await?;
        text.translations.insert(role, translated);
        Ok(())
    }

    /// A system-composed English message attributed to `sender` and
    /// translated for both human participants.
    async fn system_message(
        &self,
        seq: u64,
        sender: ParticipantRole,
        text: String,
        meta: Option<MessageMeta>,
    ) -> Result<ChatMessage, SaudaError> {
        let localized = self.localize(&text).await?;
        Ok(ChatMessage {
            seq,
            sender,
            sender_name: self.room.display_name_of(sender),
            text,
            language: "en".to_string(),
            translations: localized.translations,
            audio_ref: None,
            meta,
            sent_at: self.deps.clock.now(),
        })
    }

    /// A participant's own words, translated for the counterpart when
    /// their languages differ.
    async fn participant_message(
        &self,
        seq: u64,
        role: ParticipantRole,
        text: String,
        language: String,
        audio_ref: Option<String>,
    ) -> Result<ChatMessage, SaudaError> {
        let mut translations = HashMap::new();
        if let Some(counterpart) = role.counterpart() {
            let target = self.room.language_of(counterpart);
            if target != language {
                let translated = self
                    .deps
                    .mediator
                    .translate(&text, &language, target)
                    .await?;
                translations.insert(counterpart, translated);
            }
        }
        Ok(ChatMessage {
            seq,
            sender: role,
            sender_name: self.room.display_name_of(role),
            text,
            language,
            translations,
            audio_ref,
            meta: None,
            sent_at: self.deps.clock.now(),
        })
    }
}

fn validate_items(items: &[ProposedItem]) -> Result<(), SaudaError> {
    if items.is_empty() {
        return Err(SaudaError::InvalidRequest(
            "a deal needs at least one line item".to_string(),
        ));
    }
    for item in items {
        if item.name.trim().is_empty() {
            return Err(SaudaError::InvalidRequest(
                "every deal item needs a name".to_string(),
            ));
        }
        if !(item.quantity > 0.0 && item.quantity.is_finite())
            || !(item.unit_price > 0.0 && item.unit_price.is_finite())
        {
            return Err(SaudaError::InvalidRequest(
                "deal item quantities and prices must be positive".to_string(),
            ));
        }
    }
    Ok(())
}

/// Prices wire items server-side; client-sent totals are never trusted.
fn price_proposed(items: &[ProposedItem]) -> (Vec<DealItem>, f64) {
    let mut total = 0.0;
    let priced = items
        .iter()
        .map(|item| {
            let subtotal = item.quantity * item.unit_price;
            total += subtotal;
            DealItem {
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal,
            }
        })
        .collect();
    (priced, total)
}

/// Recomputes subtotals on mediator-extracted items before previewing.
fn reprice(items: Vec<DealItem>) -> (Vec<DealItem>, f64) {
    let mut total = 0.0;
    let priced = items
        .into_iter()
        .map(|mut item| {
            item.subtotal = item.quantity * item.unit_price;
            total += item.subtotal;
            item
        })
        .collect();
    (priced, total)
}
