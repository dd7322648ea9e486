// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sauda.toml` > `~/.config/sauda/sauda.toml` >
//! `/etc/sauda/sauda.toml` with environment variable overrides via the
//! `SAUDA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SaudaConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sauda/sauda.toml` (system-wide)
/// 3. `~/.config/sauda/sauda.toml` (user XDG config)
/// 4. `./sauda.toml` (local directory)
/// 5. `SAUDA_*` environment variables
pub fn load_config() -> Result<SaudaConfig, figment::Error> {
    let user_config = dirs::config_dir()
        .map(|d| d.join("sauda/sauda.toml"))
        .unwrap_or_default();
    for candidate in [Path::new("/etc/sauda/sauda.toml"), &user_config, Path::new("sauda.toml")] {
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "merging config file");
        }
    }

    Figment::new()
        .merge(Serialized::defaults(SaudaConfig::default()))
        .merge(Toml::file("/etc/sauda/sauda.toml"))
        .merge(Toml::file(&user_config))
        .merge(Toml::file("sauda.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and inline configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SaudaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SaudaConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SaudaConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SaudaConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `SAUDA_NEGOTIATION_AUTO_CLOSE_HOURS`
/// must map to `negotiation.auto_close_hours`, not `negotiation.auto.close.hours`.
fn env_provider() -> Env {
    Env::prefixed("SAUDA_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped,
        // e.g. SAUDA_STORAGE_DATABASE_PATH -> "storage_database_path".
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("mediator_", "mediator.", 1)
            .replacen("market_", "market.", 1)
            .replacen("negotiation_", "negotiation.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("gateway_", "gateway.", 1);
        mapped.into()
    })
}
