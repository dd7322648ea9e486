// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket gateway for the Sauda negotiation service.
//!
//! One WebSocket connection per participant device. Inbound frames are
//! JSON [`sauda_core::events::InboundEvent`]s routed through the
//! dispatcher; outbound frames are [`sauda_core::events::OutboundEvent`]s
//! fanned out by the broadcaster, so a connection sees exactly the rooms
//! and seller channels it subscribed to. A plain `/health` route serves
//! process liveness.

pub mod handlers;
pub mod server;
pub mod ws;

pub use server::{build_router, start_server, GatewayState, ServerConfig};
