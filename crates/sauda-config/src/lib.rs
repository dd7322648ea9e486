// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for the Sauda mediation service.
//!
//! TOML files from the XDG hierarchy and `SAUDA_` environment variables are
//! merged through figment into a strictly typed [`SaudaConfig`]
//! (`deny_unknown_fields`). Failures come back as miette diagnostics that
//! point into the offending file and suggest corrections for typos.
//!
//! # Usage
//!
//! ```no_run
//! use sauda_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("Serving on port {}", config.gateway.port);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::SaudaConfig;

/// Loads the layered configuration and checks it end to end.
///
/// Deserialization failures are exploded into per-field diagnostics with
/// source spans; a config that parses still has to pass the semantic checks
/// in [`validation`].
pub fn load_and_validate() -> Result<SaudaConfig, Vec<ConfigError>> {
    let config = loader::load_config()
        .map_err(|err| diagnostic::figment_to_config_errors(err, &read_layer_sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Same pipeline as [`load_and_validate`], fed from an inline TOML string.
pub fn load_and_validate_str(toml_content: &str) -> Result<SaudaConfig, Vec<ConfigError>> {
    let config = loader::load_config_from_str(toml_content).map_err(|err| {
        let sources = vec![("<inline>".to_string(), toml_content.to_string())];
        diagnostic::figment_to_config_errors(err, &sources)
    })?;
    validation::validate_config(&config)?;
    Ok(config)
}

/// Contents of every TOML layer that exists on disk, for span resolution.
fn read_layer_sources() -> Vec<(String, String)> {
    let local = std::env::current_dir()
        .map(|dir| dir.join("sauda.toml"))
        .unwrap_or_else(|_| "sauda.toml".into());
    let user = dirs::config_dir().map(|dir| dir.join("sauda/sauda.toml"));
    let system = std::path::PathBuf::from("/etc/sauda/sauda.toml");

    [Some(local), user, Some(system)]
        .into_iter()
        .flatten()
        .filter_map(|path| {
            let content = std::fs::read_to_string(&path).ok()?;
            Some((path.display().to_string(), content))
        })
        .collect()
}
