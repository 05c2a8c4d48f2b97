//! Crate-level error type and `Result` alias.
//!
//! Every failure in the pipeline is reported as an [`Error`] variant. Errors
//! raised while reading a source carry a [`Location`] pointing at the
//! offending argument or line.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Where an occurrence came from.
///
/// `position` is the 0-based index into the argument list for the command
/// line, and the 1-based line number for config-file text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub origin: String,
    pub position: usize,
}

impl Location {
    pub fn new(origin: impl Into<String>, position: usize) -> Self {
        Self {
            origin: origin.into(),
            position,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.origin, self.position)
    }
}

fn fmt_at(location: &Option<Location>) -> String {
    match location {
        Some(loc) => format!(" (at {})", loc),
        None => String::new(),
    }
}

/// Errors produced by tokenizers, schema construction, matching and the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("syntax error at {at}: {message}: {text:?}")]
    Syntax {
        text: String,
        message: String,
        at: Location,
    },

    #[error("unknown option: {token}{}", fmt_at(.at))]
    UnknownOption { token: String, at: Option<Location> },

    #[error(
        "ambiguous option '{token}' could be any of: {}{}",
        .candidates.join(", "),
        fmt_at(.at)
    )]
    AmbiguousOption {
        token: String,
        candidates: Vec<String>,
        at: Option<Location>,
    },

    #[error("duplicate option name: {0}")]
    DuplicateName(String),

    #[error("option '{option}' does not take a value, got {value:?} (at {at})")]
    UnexpectedValue {
        option: String,
        value: String,
        at: Location,
    },

    #[error("missing value for option: {option} (at {at})")]
    MissingValue { option: String, at: Location },

    #[error("invalid value {text:?} for option '{option}': expected {kind}{}", fmt_at(.at))]
    TypeConversion {
        option: String,
        text: String,
        kind: String,
        at: Option<Location>,
    },

    #[error("invalid value for option '{option}': {message}{}", fmt_at(.at))]
    Validation {
        option: String,
        message: String,
        at: Option<Location>,
    },

    #[error("option '{option}' given more than once (at {at})")]
    DuplicateOption { option: String, at: Location },

    #[error("unexpected positional argument: {token} (at {at})")]
    UnrecognizedPositional { token: String, at: Location },

    #[error("missing required option(s): {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("option not set: {0}")]
    NotSet(String),

    #[error("store is finalized and no longer accepts sources")]
    AlreadyFinalized,

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("failed to parse JSON schema: {0}")]
    SchemaJson(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SchemaJson(err.to_string())
    }
}
