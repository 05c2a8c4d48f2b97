//! Schema-driven matching of occurrences to typed values.

use crate::error::{Error, Location, Result};
use crate::occurrence::{Occurrence, ParsedOccurrences, TokenForm};
use crate::schema::{Arity, OptionSpec, Schema};
use crate::value::{parse_bool, Value};
use std::collections::HashSet;
use tracing::{debug, trace};

/// One typed value for a canonical option name.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub name: String,
    pub value: Value,
    pub at: Location,
}

/// Output of matching one source against a schema.
#[derive(Debug, Clone)]
pub struct Resolved<'s> {
    pub schema: &'s Schema,
    pub origin: String,
    /// Values in encounter order
    pub contributions: Vec<Contribution>,
    /// Unknown options and excess positionals, as written.
    /// Only filled when unregistered input is allowed.
    pub unrecognized: Vec<String>,
}

impl Resolved<'_> {
    /// Values contributed for `name`, in encounter order.
    pub fn values_of(&self, name: &str) -> Vec<&Value> {
        self.contributions
            .iter()
            .filter(|c| c.name == name)
            .map(|c| &c.value)
            .collect()
    }
}

/// Resolves occurrences against a schema.
#[derive(Debug, Clone)]
pub struct Matcher<'s> {
    schema: &'s Schema,
    allow_unregistered: bool,
}

impl<'s> Matcher<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        Self {
            schema,
            allow_unregistered: false,
        }
    }

    /// Collect unknown options and excess positionals instead of failing.
    pub fn allow_unregistered(mut self, allow: bool) -> Self {
        self.allow_unregistered = allow;
        self
    }

    /// Match every occurrence of one source.
    ///
    /// Long tokens accept unambiguous prefixes only when the tokenizer that
    /// produced `parsed` did.
    pub fn resolve(&self, parsed: &ParsedOccurrences) -> Result<Resolved<'s>> {
        let mut resolved = Resolved {
            schema: self.schema,
            origin: parsed.origin.clone(),
            contributions: Vec::new(),
            unrecognized: Vec::new(),
        };
        let mut seen: HashSet<&str> = HashSet::new();

        for occurrence in &parsed.options {
            let at = parsed.location(occurrence.position);
            let spec = match self.lookup(occurrence, parsed.guessing) {
                Ok(spec) => spec,
                Err(Error::UnknownOption { .. }) if self.allow_unregistered => {
                    trace!(token = %occurrence.token, "collecting unregistered option");
                    resolved.unrecognized.push(occurrence.original_text());
                    continue;
                }
                Err(err) => return Err(with_location(err, &at)),
            };

            let values = self.values_for(spec, occurrence.raw_value.as_deref(), &at)?;
            self.check_duplicate(spec, &mut seen, &at)?;
            for value in values {
                resolved.contributions.push(Contribution {
                    name: spec.name.clone(),
                    value,
                    at: at.clone(),
                });
            }
        }

        for (index, token) in parsed.positional.iter().enumerate() {
            let at = parsed.location(token.position);
            let spec = match self.schema.positional_slot(index) {
                Some(spec) => spec,
                None if self.allow_unregistered => {
                    resolved.unrecognized.push(token.value.clone());
                    continue;
                }
                None => {
                    return Err(Error::UnrecognizedPositional {
                        token: token.value.clone(),
                        at,
                    })
                }
            };

            let values = self.values_for(spec, Some(&token.value), &at)?;
            self.check_duplicate(spec, &mut seen, &at)?;
            for value in values {
                resolved.contributions.push(Contribution {
                    name: spec.name.clone(),
                    value,
                    at: at.clone(),
                });
            }
        }

        debug!(
            origin = %resolved.origin,
            contributions = resolved.contributions.len(),
            unrecognized = resolved.unrecognized.len(),
            "resolved source"
        );
        Ok(resolved)
    }

    fn lookup(&self, occurrence: &Occurrence, guessing: bool) -> Result<&'s OptionSpec> {
        match occurrence.form {
            TokenForm::Long => self.schema.find_long(&occurrence.token, guessing),
            TokenForm::Short => {
                let mut chars = occurrence.token.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => self.schema.find_short(c),
                    _ => Err(Error::UnknownOption {
                        token: format!("-{}", occurrence.token),
                        at: None,
                    }),
                }
            }
            TokenForm::ConfigKey => {
                self.schema
                    .get(&occurrence.token)
                    .ok_or_else(|| Error::UnknownOption {
                        token: occurrence.token.clone(),
                        at: None,
                    })
            }
        }
    }

    /// A single-arity option may appear only once per source unless composing.
    fn check_duplicate<'a>(
        &self,
        spec: &'a OptionSpec,
        seen: &mut HashSet<&'a str>,
        at: &Location,
    ) -> Result<()> {
        if spec.arity == Arity::Single
            && !spec.composing
            && !seen.insert(spec.name.as_str())
        {
            return Err(Error::DuplicateOption {
                option: spec.name.clone(),
                at: at.clone(),
            });
        }
        Ok(())
    }

    /// Convert one occurrence's raw value into typed values.
    fn values_for(
        &self,
        spec: &OptionSpec,
        raw: Option<&str>,
        at: &Location,
    ) -> Result<Vec<Value>> {
        if spec.arity == Arity::Flag {
            return match raw {
                None => Ok(vec![Value::Bool(true)]),
                Some(text) if parse_bool(text) == Some(true) => Ok(vec![Value::Bool(true)]),
                Some(text) => Err(Error::UnexpectedValue {
                    option: spec.name.clone(),
                    value: text.to_string(),
                    at: at.clone(),
                }),
            };
        }

        let text = match raw {
            Some(text) => text,
            None => {
                let implicit = spec.implicit.clone().ok_or_else(|| Error::MissingValue {
                    option: spec.name.clone(),
                    at: at.clone(),
                })?;
                return Ok(vec![self.validate(spec, implicit, at)?]);
            }
        };

        let pieces: Vec<&str> = match spec.delimiter {
            Some(delim) if spec.arity == Arity::Multi => text.split(delim).collect(),
            _ => vec![text],
        };

        pieces
            .into_iter()
            .map(|piece| {
                let value = spec.kind.convert(piece).map_err(|kind| Error::TypeConversion {
                    option: spec.name.clone(),
                    text: piece.to_string(),
                    kind,
                    at: Some(at.clone()),
                })?;
                self.validate(spec, value, at)
            })
            .collect()
    }

    fn validate(&self, spec: &OptionSpec, value: Value, at: &Location) -> Result<Value> {
        match spec.validator {
            Some(ref validator) => validator(value).map_err(|message| Error::Validation {
                option: spec.name.clone(),
                message,
                at: Some(at.clone()),
            }),
            None => Ok(value),
        }
    }
}

/// Attach a source location to a lookup error.
fn with_location(err: Error, location: &Location) -> Error {
    match err {
        Error::UnknownOption { token, .. } => Error::UnknownOption {
            token,
            at: Some(location.clone()),
        },
        Error::AmbiguousOption {
            token, candidates, ..
        } => Error::AmbiguousOption {
            token,
            candidates,
            at: Some(location.clone()),
        },
        other => other,
    }
}
