//! Option declarations and name resolution.
//!
//! A [`Schema`] is an ordered registry of [`OptionSpec`]s plus the mapping of
//! bare positional tokens onto declared options. It is built append-only and
//! then shared by reference with the matcher and store.

use crate::error::{Error, Result};
use crate::occurrence::{ArityLookup, TokenArity};
use crate::value::{Value, ValueKind};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// How many values an option consumes per occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arity {
    /// A boolean switch (e.g., --verbose)
    Flag,
    /// Exactly one value (e.g., --output file.txt)
    Single,
    /// Any number of occurrences, each adding values
    Multi,
}

/// Post-conversion check. Returns the accepted value or a rejection message.
pub type Validator = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;

/// Declaration of a single option.
#[derive(Clone)]
pub struct OptionSpec {
    /// Canonical name, matched by `--name` and by config-file keys
    pub name: String,
    /// Short alias character (e.g., 'v' for -v)
    pub short: Option<char>,
    pub arity: Arity,
    pub kind: ValueKind,
    /// Used at finalize time when no source contributed a value
    pub default: Option<Value>,
    /// Used when the option appears without a value
    pub implicit: Option<Value>,
    pub required: bool,
    /// Contributions from all sources accumulate instead of overriding
    pub composing: bool,
    /// On the command line, consume every following non-option token
    pub multi_token: bool,
    /// Split each raw value on this character before conversion
    pub delimiter: Option<char>,
    pub validator: Option<Validator>,
    pub help: Option<String>,
}

impl fmt::Debug for OptionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSpec")
            .field("name", &self.name)
            .field("short", &self.short)
            .field("arity", &self.arity)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("implicit", &self.implicit)
            .field("required", &self.required)
            .field("composing", &self.composing)
            .field("multi_token", &self.multi_token)
            .field("delimiter", &self.delimiter)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl OptionSpec {
    fn new(name: impl Into<String>, arity: Arity, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            short: None,
            arity,
            kind,
            default: None,
            implicit: None,
            required: false,
            composing: false,
            multi_token: false,
            delimiter: None,
            validator: None,
            help: None,
        }
    }

    /// A boolean switch. Flags default to `false` when never given.
    pub fn flag(name: impl Into<String>) -> Self {
        let mut spec = Self::new(name, Arity::Flag, ValueKind::Bool);
        spec.default = Some(Value::Bool(false));
        spec
    }

    pub fn single(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::new(name, Arity::Single, kind)
    }

    pub fn multi(name: impl Into<String>, kind: ValueKind) -> Self {
        Self::new(name, Arity::Multi, kind)
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn implicit_value(mut self, value: impl Into<Value>) -> Self {
        self.implicit = Some(value.into());
        self
    }

    pub fn composing(mut self) -> Self {
        self.composing = true;
        self
    }

    pub fn multi_token(mut self) -> Self {
        self.multi_token = true;
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// How the command-line tokenizer should treat values for this option.
    pub fn token_arity(&self) -> TokenArity {
        match self.arity {
            Arity::Flag => TokenArity::Zero,
            _ if self.implicit.is_some() => TokenArity::Optional,
            Arity::Multi if self.multi_token => TokenArity::Many,
            _ => TokenArity::One,
        }
    }

    fn validate(&self) -> Result<()> {
        let name = &self.name;
        if name.is_empty()
            || name.starts_with('-')
            || name.contains('=')
            || name.chars().any(char::is_whitespace)
        {
            return Err(Error::InvalidSchema(format!("invalid option name '{}'", name)));
        }

        if let Some(short) = self.short {
            if !short.is_ascii_alphanumeric() {
                return Err(Error::InvalidSchema(format!(
                    "invalid short option '{}' on '{}': must be a single ASCII letter or digit",
                    short, name
                )));
            }
        }

        if let ValueKind::Enum(ref choices) = self.kind {
            if choices.is_empty() {
                return Err(Error::InvalidSchema(format!(
                    "choices on option '{}' are empty",
                    name
                )));
            }
            let mut seen = HashSet::new();
            for choice in choices {
                if !seen.insert(choice) {
                    return Err(Error::InvalidSchema(format!(
                        "choices on option '{}' contain duplicate value '{}'",
                        name, choice
                    )));
                }
            }
        }

        if self.arity != Arity::Multi && (self.multi_token || self.delimiter.is_some()) {
            return Err(Error::InvalidSchema(format!(
                "multi_token and delimiter require a multi option ('{}')",
                name
            )));
        }

        Ok(())
    }
}

/// Assignment of positional tokens to a declared option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionalSlot {
    pub name: String,
    /// Number of tokens taken by this slot; `None` takes all the rest
    pub max: Option<usize>,
}

/// Ordered registry of option declarations.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    options: Vec<OptionSpec>,
    positional: Vec<PositionalSlot>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an option. Fails if its name or short alias is already taken.
    ///
    /// A one-character name and a short alias share the same token space, so
    /// they may not collide either.
    pub fn declare(&mut self, spec: OptionSpec) -> Result<&mut Self> {
        spec.validate()?;

        if self.options.iter().any(|o| o.name == spec.name) {
            return Err(Error::DuplicateName(spec.name));
        }
        if let Some(short) = spec.short {
            let taken = self
                .options
                .iter()
                .any(|o| o.short == Some(short) || single_char(&o.name) == Some(short));
            if taken {
                return Err(Error::DuplicateName(format!("-{}", short)));
            }
        }
        if let Some(c) = single_char(&spec.name) {
            if self.options.iter().any(|o| o.short == Some(c)) {
                return Err(Error::DuplicateName(spec.name));
            }
        }

        self.options.push(spec);
        Ok(self)
    }

    /// Route positional tokens to the declared option `name`.
    ///
    /// Slots are filled in declaration order; `max: None` absorbs every
    /// remaining token and must be the last slot.
    pub fn add_positional(&mut self, name: &str, max: Option<usize>) -> Result<&mut Self> {
        let spec = self.get(name).ok_or_else(|| Error::UnknownOption {
            token: name.to_string(),
            at: None,
        })?;

        if spec.arity == Arity::Flag {
            return Err(Error::InvalidSchema(format!(
                "flag '{}' cannot take positional arguments",
                name
            )));
        }
        if max == Some(0) {
            return Err(Error::InvalidSchema(format!(
                "positional slot '{}' must take at least one token",
                name
            )));
        }
        if spec.arity == Arity::Single && max != Some(1) {
            return Err(Error::InvalidSchema(format!(
                "single option '{}' can take only one positional token",
                name
            )));
        }
        if self.positional.iter().any(|slot| slot.max.is_none()) {
            return Err(Error::InvalidSchema(format!(
                "positional slot '{}' follows an unbounded slot",
                name
            )));
        }

        self.positional.push(PositionalSlot {
            name: name.to_string(),
            max,
        });
        Ok(self)
    }

    /// Append every declaration of `other`, failing without changes on any
    /// name conflict.
    pub fn extend(&mut self, other: Schema) -> Result<&mut Self> {
        let mut merged = self.clone();
        for spec in other.options {
            merged.declare(spec)?;
        }
        for slot in other.positional {
            merged.add_positional(&slot.name, slot.max)?;
        }
        *self = merged;
        Ok(self)
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    pub fn positional_slots(&self) -> &[PositionalSlot] {
        &self.positional
    }

    /// Exact canonical-name lookup.
    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Resolve a token to its declaration.
    ///
    /// An exact canonical name or short alias wins outright. Otherwise the
    /// token is treated as an abbreviated long name.
    pub fn find(&self, token: &str) -> Result<&OptionSpec> {
        if let Some(spec) = self.get(token) {
            return Ok(spec);
        }
        if let Some(c) = single_char(token) {
            if let Some(spec) = self.options.iter().find(|o| o.short == Some(c)) {
                return Ok(spec);
            }
        }
        self.find_long(token, true)
    }

    /// Resolve a long-form token, optionally accepting an unambiguous prefix.
    pub fn find_long(&self, token: &str, allow_prefix: bool) -> Result<&OptionSpec> {
        if let Some(spec) = self.get(token) {
            return Ok(spec);
        }

        let unknown = || Error::UnknownOption {
            token: token.to_string(),
            at: None,
        };
        if !allow_prefix || token.is_empty() {
            return Err(unknown());
        }

        let candidates: Vec<&OptionSpec> = self
            .options
            .iter()
            .filter(|o| o.name.starts_with(token))
            .collect();

        match candidates.as_slice() {
            [] => Err(unknown()),
            [only] => Ok(*only),
            many => Err(Error::AmbiguousOption {
                token: token.to_string(),
                candidates: many.iter().map(|o| o.name.clone()).collect(),
                at: None,
            }),
        }
    }

    /// Resolve a short alias. Short aliases are never abbreviated.
    pub fn find_short(&self, short: char) -> Result<&OptionSpec> {
        self.options
            .iter()
            .find(|o| o.short == Some(short))
            .ok_or_else(|| Error::UnknownOption {
                token: format!("-{}", short),
                at: None,
            })
    }

    /// The option receiving the positional token at `index`, if any.
    pub fn positional_slot(&self, index: usize) -> Option<&OptionSpec> {
        let mut start = 0usize;
        for slot in &self.positional {
            match slot.max {
                None => return self.get(&slot.name),
                Some(n) if index < start + n => return self.get(&slot.name),
                Some(n) => start += n,
            }
        }
        None
    }
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl ArityLookup for Schema {
    fn long_arity(&self, token: &str, allow_prefix: bool) -> Option<TokenArity> {
        self.find_long(token, allow_prefix)
            .ok()
            .map(OptionSpec::token_arity)
    }

    fn short_arity(&self, short: char) -> Option<TokenArity> {
        self.find_short(short).ok().map(OptionSpec::token_arity)
    }
}
