// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Negotiation rooms for the Sauda mediation framework.
//!
//! A room is the unit of negotiation: one buyer, one seller, one
//! commodity, one mediated conversation. Each live room runs as its own
//! actor task ([`actor::RoomActor`]) that owns the room record and its
//! message log, so every mutation of a room is serialized through one
//! mailbox while different rooms run fully in parallel.
//!
//! The [`registry::Dispatcher`] routes wire events to room actors,
//! resurrecting rooms from storage on demand, and the
//! [`registry::Broadcaster`] fans outbound events to subscribed
//! connections. [`sweep::IdleSweep`] closes rooms that have gone quiet.

pub mod actor;
pub mod policy;
pub mod registry;
pub mod shutdown;
pub mod state;
pub mod sweep;

pub use actor::{RoomActor, RoomCommand, RoomDeps, RoomHandle};
pub use policy::NegotiationPolicy;
pub use registry::{Broadcaster, ConnId, Dispatcher};
pub use sweep::{IdleSweep, SweepStats};
