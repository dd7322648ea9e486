// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sauda negotiation mediator.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Sauda configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SaudaConfig {
    /// Service identity and logging settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Mediation gateway (translation/evaluation service) settings.
    #[serde(default)]
    pub mediator: MediatorConfig,

    /// Market price provider settings.
    #[serde(default)]
    pub market: MarketConfig,

    /// Negotiation policy knobs (thresholds and keyword lists).
    #[serde(default)]
    pub negotiation: NegotiationConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WebSocket gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name of the service instance.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "sauda".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Mediation gateway configuration.
///
/// The gateway is an HTTP sidecar exposing translation, greeting,
/// offer-evaluation, moderation, and intervention endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediatorConfig {
    /// Base URL of the mediation service.
    #[serde(default = "default_mediator_base_url")]
    pub base_url: String,

    /// Bearer token for the mediation service. `None` sends no auth header.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_mediator_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MediatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_mediator_base_url(),
            api_key: None,
            timeout_secs: default_mediator_timeout_secs(),
        }
    }
}

fn default_mediator_base_url() -> String {
    "http://127.0.0.1:8091".to_string()
}

fn default_mediator_timeout_secs() -> u64 {
    12
}

/// Market price provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarketConfig {
    /// How long a fetched price band stays fresh, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// Negotiation policy configuration.
///
/// The keyword lists and the too-low threshold are demo-calibrated
/// rather than principled, so they live here instead of in code.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NegotiationConfig {
    /// Hours of inactivity after which the idle sweep closes a room.
    #[serde(default = "default_auto_close_hours")]
    pub auto_close_hours: u64,

    /// Seconds between idle sweep cycles.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// An offer is flagged too-low when its unit price is below
    /// `min_price * too_low_ratio`.
    #[serde(default = "default_too_low_ratio")]
    pub too_low_ratio: f64,

    /// Deny-list checked locally on every message, every phase.
    #[serde(default = "default_banned_words")]
    pub banned_words: Vec<String>,

    /// Terms in a live message that signal a translation/honesty dispute.
    #[serde(default = "default_dispute_keywords")]
    pub dispute_keywords: Vec<String>,

    /// Terms counted across the whole conversation at deal time for the
    /// language-reliability score.
    #[serde(default = "default_deal_dispute_keywords")]
    pub deal_dispute_keywords: Vec<String>,

    /// Terms that signal a party is trying to close a deal.
    #[serde(default = "default_deal_signal_words")]
    pub deal_signal_words: Vec<String>,

    /// Tone markers that draw a mediator intervention outside free chat.
    #[serde(default = "default_aggression_words")]
    pub aggression_words: Vec<String>,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            auto_close_hours: default_auto_close_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
            too_low_ratio: default_too_low_ratio(),
            banned_words: default_banned_words(),
            dispute_keywords: default_dispute_keywords(),
            deal_dispute_keywords: default_deal_dispute_keywords(),
            deal_signal_words: default_deal_signal_words(),
            aggression_words: default_aggression_words(),
        }
    }
}

fn default_auto_close_hours() -> u64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    3600
}

fn default_too_low_ratio() -> f64 {
    0.95
}

fn default_banned_words() -> Vec<String> {
    ["idiot", "stupid", "scam", "cheat", "fraud", "moorka", "badava", "poda"]
        .map(str::to_string)
        .to_vec()
}

fn default_dispute_keywords() -> Vec<String> {
    [
        "wrong translation",
        "misunderstood",
        "fraud",
        "cheat",
        "not correct",
        "गलत",
        "धोखा",
    ]
    .map(str::to_string)
    .to_vec()
}

fn default_deal_dispute_keywords() -> Vec<String> {
    [
        "dispute",
        "wrong translation",
        "misunderstood",
        "fraud",
        "cheat",
        "tampering",
    ]
    .map(str::to_string)
    .to_vec()
}

fn default_deal_signal_words() -> Vec<String> {
    ["confirm", "deal", "final", "pakka", "agree"]
        .map(str::to_string)
        .to_vec()
}

fn default_aggression_words() -> Vec<String> {
    ["useless", "waste of time", "shut up", "nonsense", "bekar", "faltu"]
        .map(str::to_string)
        .to_vec()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("sauda").join("sauda.db"))
        .and_then(|p| p.to_str().map(str::to_string))
        .unwrap_or_else(|| "sauda.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// WebSocket gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address the gateway binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Port the gateway listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins. `["*"]` allows any origin.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}
