// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle trait shared by every pluggable collaborator.

use async_trait::async_trait;

use crate::error::SaudaError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for every pluggable Sauda collaborator.
///
/// Market sources, the mediation gateway, and storage backends all
/// implement this, which provides identity, lifecycle, and health check
/// capabilities so the serve loop can treat them uniformly.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short identifier used in logs and health reports.
    fn name(&self) -> &str;

    /// Version advertised for this adapter implementation.
    fn version(&self) -> semver::Version;

    /// Which slot this adapter fills (market, mediator, storage, channel).
    fn adapter_type(&self) -> AdapterType;

    /// Probes the adapter and reports how usable it currently is.
    async fn health_check(&self) -> Result<HealthStatus, SaudaError>;

    /// Releases held resources ahead of process exit.
    async fn shutdown(&self) -> Result<(), SaudaError>;
}
