// error.rs - Error types for rule parsing, loading and compilation.
//
// Lenient parsing never surfaces most of these: malformed input is dropped
// and logged instead. Strict parsing and the explicit `parse_*` entry points
// return them to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, validating or emitting policy data.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A pattern's `type` discriminant is missing or not "sequence"/"logic".
    #[error("unknown pattern type '{found}' (expected 'sequence' or 'logic')")]
    UnknownPatternType { found: String },

    /// A pattern has the right discriminant but an unusable body.
    #[error("malformed {kind} pattern: {reason}")]
    MalformedPattern { kind: &'static str, reason: String },

    /// A rule has no `action` field.
    #[error("rule is missing an action")]
    MissingAction,

    /// A rule's `action` is not one of the four taint actions.
    #[error("unknown taint action '{found}'")]
    UnknownAction { found: String },

    /// A taint class string is not one of the seven known classes.
    #[error("unknown taint class '{found}'")]
    UnknownTaintClass { found: String },

    /// A static rule value is neither ALLOW nor DENY.
    #[error("unknown static action '{found}' for tool '{tool}'")]
    UnknownStaticAction { tool: String, found: String },

    /// A simple rule must target exactly one of a tool or a tool class.
    #[error("invalid rule target: {reason}")]
    InvalidTarget { reason: String },

    /// A document could not be parsed or rendered in the given format.
    #[error("failed to parse {format}: {reason}")]
    Parse { format: &'static str, reason: String },

    /// A preset or policy file could not be read or written.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The builder configuration file is invalid.
    #[error("invalid configuration at {path}: {reason}")]
    Config { path: PathBuf, reason: String },
}

impl From<serde_json::Error> for PolicyError {
    fn from(err: serde_json::Error) -> Self {
        PolicyError::Parse {
            format: "json",
            reason: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for PolicyError {
    fn from(err: serde_yaml::Error) -> Self {
        PolicyError::Parse {
            format: "yaml",
            reason: err.to_string(),
        }
    }
}
