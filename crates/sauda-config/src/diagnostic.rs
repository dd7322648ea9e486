// SPDX-FileCopyrightText: 2026 Sauda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Startup diagnostics for configuration mistakes.
//!
//! Figment deserialization failures are rebuilt as miette diagnostics
//! carrying the offending TOML span, the section's valid keys, and a
//! "did you mean?" correction picked by Jaro-Winkler similarity.

#![allow(unused_assignments)] // the Diagnostic derive expands to code tripping this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Floor on the Jaro-Winkler score before a correction is offered.
/// 0.75 admits typos like `auto_close_hrs` -> `auto_close_hours` and
/// rejects unrelated keys.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One startup configuration problem, renderable as a miette report.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key no section of the config model defines.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(sauda::config::unknown_key),
        help("{}", format_unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Correction offered by fuzzy matching, when one clears the floor.
        suggestion: Option<String>,
        /// Comma-separated valid keys for the section.
        valid_keys: String,
        #[label("not a key in this section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value that does not deserialize into its field's type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(sauda::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("value has the wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key the model requires that no layer provided.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(sauda::config::missing_key),
        help("add `{key} = <value>` to your sauda.toml")
    )]
    MissingKey { key: String },

    /// A parsed value that failed a semantic check.
    #[error("validation error: {message}")]
    #[diagnostic(code(sauda::config::validation))]
    Validation { message: String },

    /// Anything figment reports that has no richer mapping here.
    #[error("configuration error: {0}")]
    #[diagnostic(code(sauda::config::other))]
    Other(String),
}

fn format_unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    let hint = suggestion
        .map(|best| format!("did you mean `{best}`? "))
        .unwrap_or_default();
    format!("{hint}valid keys: {valid_keys}")
}

/// Explodes a `figment::Error` into per-field [`ConfigError`]s.
///
/// One extraction can fail on several fields at once; each failure
/// becomes its own diagnostic, with fuzzy suggestions for unknown keys.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| classify_error(error, toml_sources))
        .collect()
}

/// Maps one figment failure onto the matching diagnostic variant.
fn classify_error(error: figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    use figment::error::Kind;

    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let valid_keys = expected.to_vec();
            let (span, src) = find_source_span(&error, field, toml_sources);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, &valid_keys),
                valid_keys: valid_keys.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.clone().into_owned(),
        },
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: dotted_path(&error),
            detail: format!("found {actual}, expected {expected}"),
            expected: expected.to_string(),
            span: None,
            src: None,
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

fn dotted_path(error: &figment::Error) -> String {
    let segments: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
    segments.join(".")
}

/// Span and source text for `field`, when the failing layer is a TOML
/// file we read and the key can be located inside it.
fn find_source_span(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let Some(path) = source_file_path(error) else {
        return (None, None);
    };
    let Some((_, content)) = toml_sources.iter().find(|(p, _)| *p == path) else {
        return (None, None);
    };

    let section_path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
    match find_key_offset(content, &section_path, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(&path, content.clone())),
        ),
        None => (None, None),
    }
}

/// File path of the layer that produced `error`, for file-backed layers.
fn source_file_path(error: &figment::error::Error) -> Option<String> {
    match error.metadata.as_ref()?.source.as_ref()? {
        figment::Source::File(path) => Some(path.display().to_string()),
        _ => None,
    }
}

/// Byte offset of `field` within `content`, scoped to its section.
///
/// For `path = ["negotiation"]` and `field = "auto_close_hrs"`, finds the
/// `[negotiation]` header then searches for the field after it. Top-level
/// fields are searched from the start.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let tail_start = match path.first() {
        None => 0,
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
    };

    let mut offset = tail_start;
    for line in content[tail_start..].split_inclusive('\n') {
        let key = line.trim_start();
        let indent = line.len() - key.len();
        // The match only counts when the key name ends there.
        if let Some(rest) = key.strip_prefix(field)
            && matches!(rest.as_bytes().first(), Some(b' ' | b'=' | b'\t'))
        {
            return Some(offset + indent);
        }
        offset += line.len();
    }

    None
}

/// The closest valid key above the similarity floor, if any.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|&key| (strsim::jaro_winkler(unknown, key), key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, key)| key.to_string())
}

/// Prints each diagnostic to stderr through miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_auto_close_hours_for_typo() {
        let valid = &["auto_close_hours", "sweep_interval_secs", "too_low_ratio"];
        assert_eq!(
            suggest_key("auto_close_hrs", valid),
            Some("auto_close_hours".to_string())
        );
    }

    #[test]
    fn suggests_base_url_for_baseurl() {
        let valid = &["base_url", "api_key", "timeout_secs"];
        assert_eq!(suggest_key("baseurl", valid), Some("base_url".to_string()));
    }

    #[test]
    fn distant_typo_gets_no_suggestion() {
        let valid = &["bind_address", "port", "allowed_origins"];
        assert!(suggest_key("zzzzzz", valid).is_none());
    }

    #[test]
    fn key_offset_lands_inside_its_section() {
        let content = "[negotiation]\nauto_close_hrs = 12\n";
        let path = vec!["negotiation".to_string()];
        let offset = find_key_offset(content, &path, "auto_close_hrs").unwrap();
        assert_eq!(&content[offset..offset + 14], "auto_close_hrs");
    }

    #[test]
    fn find_key_offset_skips_prefix_matches() {
        // `port` must not match inside `allowed_origins` values or names
        // that merely start with the field.
        let content = "[gateway]\nportal = 1\nport = 9000\n";
        let path = vec!["gateway".to_string()];
        let offset = find_key_offset(content, &path, "port").unwrap();
        assert_eq!(&content[offset..offset + 4], "port");
        assert_eq!(&content[offset..offset + 11], "port = 9000");
    }

    #[test]
    fn unknown_key_error_carries_suggestion() {
        let err = crate::loader::load_config_from_str("[service]\nlog_lvl = \"debug\"\n")
            .unwrap_err();
        let errors = figment_to_config_errors(err, &[]);
        assert!(!errors.is_empty());
        match &errors[0] {
            ConfigError::UnknownKey { key, suggestion, .. } => {
                assert_eq!(key, "log_lvl");
                assert_eq!(suggestion.as_deref(), Some("log_level"));
            }
            other => panic!("expected UnknownKey, got {other:?}"),
        }
    }
}
