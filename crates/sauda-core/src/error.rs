// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sauda negotiation mediator.

use thiserror::Error;

use crate::types::{ClosureReason, DealAction, DealStatus, RoomPhase};

/// The primary error type used across all Sauda adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SaudaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Market data errors (unknown commodity, feed failure).
    #[error("market data error: {message}")]
    Market {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Mediation gateway errors (translation/evaluation transport failure).
    ///
    /// These are recovered close to the call site with passthrough fallbacks
    /// and must never surface to a negotiation participant.
    #[error("mediation gateway error: {message}")]
    Mediator {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Delivery channel errors (websocket send failure, closed connection).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The referenced room has never existed.
    #[error("room not found: {room_key}")]
    RoomNotFound { room_key: String },

    /// The room exists but the negotiation has ended.
    ///
    /// Distinct from [`SaudaError::RoomNotFound`] so callers can tell a
    /// finished negotiation apart from one that never existed.
    #[error("negotiation has ended ({reason}): {room_key}")]
    RoomClosed {
        room_key: String,
        reason: ClosureReason,
    },

    /// The operation is not allowed in the room's current phase.
    #[error("operation '{operation}' not allowed in phase '{phase}'")]
    InvalidPhase {
        phase: RoomPhase,
        operation: &'static str,
    },

    /// The referenced deal does not exist.
    #[error("deal not found: {deal_id}")]
    DealNotFound { deal_id: String },

    /// The deal action is not allowed in the deal's current status.
    #[error("deal action '{action}' not allowed in status '{status}'")]
    InvalidDealTransition {
        status: DealStatus,
        action: DealAction,
    },

    /// A structurally well-formed request carrying invalid content
    /// (missing counter price, empty deal items, unknown role).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
