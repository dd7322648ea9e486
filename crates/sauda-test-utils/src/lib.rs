// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Sauda integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockMediator`] - Mock mediation gateway with scripted verdicts
//! - [`MockMarket`] - Mock market source with a fixed price band
//! - [`MemoryStorage`] - In-memory storage adapter
//! - [`ManualClock`] - Hand-advanced clock for idle-timeout tests
//! - [`NegotiationHarness`] - Full dispatcher stack over temp SQLite

pub mod clock;
pub mod harness;
pub mod memory_storage;
pub mod mock_market;
pub mod mock_mediator;

pub use clock::ManualClock;
pub use harness::NegotiationHarness;
pub use memory_storage::MemoryStorage;
pub use mock_market::MockMarket;
pub use mock_mediator::MockMediator;
