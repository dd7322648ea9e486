// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks applied after deserialization.
//!
//! serde can enforce shape but not meaning; these checks cover bind
//! addresses, URL schemes, and threshold ranges, and report every
//! violation at once instead of stopping at the first.

use crate::diagnostic::ConfigError;
use crate::model::{
    GatewayConfig, MediatorConfig, NegotiationConfig, SaudaConfig, StorageConfig,
};

/// Checks a parsed configuration for constraint violations.
///
/// Collects every problem rather than failing fast, so one run of
/// `sauda config validate` surfaces the whole list.
pub fn validate_config(config: &SaudaConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    check_gateway(&config.gateway, &mut errors);
    check_storage(&config.storage, &mut errors);
    check_mediator(&config.mediator, &mut errors);
    check_negotiation(&config.negotiation, &mut errors);

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn fail(errors: &mut Vec<ConfigError>, message: String) {
    errors.push(ConfigError::Validation { message });
}

fn check_gateway(gateway: &GatewayConfig, errors: &mut Vec<ConfigError>) {
    let addr = gateway.bind_address.trim();
    if addr.is_empty() {
        fail(errors, "gateway.bind_address must not be empty".to_string());
    } else if addr.parse::<std::net::IpAddr>().is_err() && !hostname_like(addr) {
        fail(
            errors,
            format!("gateway.bind_address `{addr}` is not a valid IP address or hostname"),
        );
    }

    if gateway.port == 0 {
        fail(errors, "gateway.port must not be 0".to_string());
    }
}

fn hostname_like(addr: &str) -> bool {
    addr.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | ':'))
}

fn check_storage(storage: &StorageConfig, errors: &mut Vec<ConfigError>) {
    if storage.database_path.trim().is_empty() {
        fail(errors, "storage.database_path must not be empty".to_string());
    }
}

fn check_mediator(mediator: &MediatorConfig, errors: &mut Vec<ConfigError>) {
    let base_url = mediator.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        fail(
            errors,
            format!("mediator.base_url `{base_url}` must start with http:// or https://"),
        );
    }

    if mediator.timeout_secs < 1 {
        fail(
            errors,
            format!(
                "mediator.timeout_secs must be at least 1, got {}",
                mediator.timeout_secs
            ),
        );
    }
}

fn check_negotiation(negotiation: &NegotiationConfig, errors: &mut Vec<ConfigError>) {
    if negotiation.auto_close_hours < 1 {
        fail(
            errors,
            format!(
                "negotiation.auto_close_hours must be at least 1, got {}",
                negotiation.auto_close_hours
            ),
        );
    }

    if negotiation.sweep_interval_secs < 1 {
        fail(
            errors,
            format!(
                "negotiation.sweep_interval_secs must be at least 1, got {}",
                negotiation.sweep_interval_secs
            ),
        );
    }

    let ratio = negotiation.too_low_ratio;
    if !(ratio > 0.0 && ratio <= 1.0) {
        fail(
            errors,
            format!("negotiation.too_low_ratio must be within (0, 1], got {ratio}"),
        );
    }
}
