//! Syntax-level output of the tokenizers.

use crate::error::Location;

/// How an option token was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenForm {
    /// `--name` or `--name=value`
    Long,
    /// `-x`, possibly from a bundle like `-xyz`
    Short,
    /// `key = value` in config-file text
    ConfigKey,
}

/// One syntactic appearance of an option in a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// Option name without dashes, as written
    pub token: String,
    pub raw_value: Option<String>,
    /// Argument index (command line) or line number (config file)
    pub position: usize,
    pub form: TokenForm,
    /// The tokenizer could not match the token against its arity hints.
    /// Whether it is unknown or merely abbreviated is up to the matcher.
    pub unknown: bool,
}

impl Occurrence {
    /// The occurrence as the user wrote it, for diagnostics and
    /// unrecognized-token collection.
    pub fn original_text(&self) -> String {
        let (prefix, sep) = match self.form {
            TokenForm::Long => ("--", "="),
            TokenForm::Short => ("-", ""),
            TokenForm::ConfigKey => ("", "="),
        };
        match &self.raw_value {
            Some(v) => format!("{}{}{}{}", prefix, self.token, sep, v),
            None => format!("{}{}", prefix, self.token),
        }
    }
}

/// A bare token that is not an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalToken {
    pub value: String,
    pub position: usize,
}

/// Everything a tokenizer found in one source, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOccurrences {
    /// Source identifier (e.g., "command line" or a file name)
    pub origin: String,
    pub options: Vec<Occurrence>,
    pub positional: Vec<PositionalToken>,
    /// Long tokens were tokenized with prefix matching allowed, so the
    /// matcher must resolve them the same way.
    pub guessing: bool,
}

impl ParsedOccurrences {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            options: Vec::new(),
            positional: Vec::new(),
            guessing: false,
        }
    }

    pub fn location(&self, position: usize) -> Location {
        Location::new(self.origin.clone(), position)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty() && self.positional.is_empty()
    }
}

/// How many following tokens an option consumes on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenArity {
    /// Never takes a value (flags)
    Zero,
    /// Takes a value only when joined (`--opt=v`, `-ov`)
    Optional,
    /// Takes exactly one value
    One,
    /// Takes every following non-option token
    Many,
}

/// Arity hints for the command-line tokenizer.
///
/// Lets the tokenizer decide whether the next token is a value without
/// knowing anything else about the option.
pub trait ArityLookup {
    fn long_arity(&self, token: &str, allow_prefix: bool) -> Option<TokenArity>;
    fn short_arity(&self, short: char) -> Option<TokenArity>;
}
