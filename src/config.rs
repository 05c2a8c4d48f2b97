//! JSON schema documents.
//!
//! Lets a schema (and the command-line style) be declared as data instead of
//! through the builder API. Validators cannot be expressed in JSON; attach
//! them with [`Schema::declare`] on a builder-made spec instead.

use crate::cmdline::Style;
use crate::error::{Error, Result};
use crate::schema::{Arity, OptionSpec, Schema};
use crate::value::{Value, ValueKind};
use serde::Deserialize;

/// Value kind names accepted in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KindName {
    /// Any string value (default)
    #[default]
    String,
    /// Signed 64-bit integer
    Int,
    Float,
    Bool,
    /// One of `choices`
    Enum,
}

fn default_arity() -> Arity {
    Arity::Single
}

fn default_slot_max() -> Option<usize> {
    Some(1)
}

/// Configuration for a single option.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OptionConfig {
    pub name: String,
    pub short: Option<char>,
    #[serde(default = "default_arity")]
    pub arity: Arity,
    #[serde(default)]
    pub kind: KindName,
    /// Allowed values; implies the enum kind
    pub choices: Option<Vec<String>>,
    #[serde(default)]
    pub required: bool,
    /// Default value as text, converted through the option's kind
    pub default: Option<String>,
    /// Value used when the option is given without one, as text
    pub implicit: Option<String>,
    #[serde(default)]
    pub composing: bool,
    #[serde(default)]
    pub multi_token: bool,
    pub delimiter: Option<char>,
    pub help: Option<String>,
}

/// A positional slot; `"max": null` takes every remaining token.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionalConfig {
    pub name: String,
    #[serde(default = "default_slot_max")]
    pub max: Option<usize>,
}

/// Top-level schema document.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub options: Vec<OptionConfig>,
    #[serde(default)]
    pub positional: Vec<PositionalConfig>,
    #[serde(default)]
    pub style: Style,
}

impl SchemaDocument {
    /// Parse a JSON string into a document.
    pub fn from_json(json: &str) -> Result<SchemaDocument> {
        let doc: SchemaDocument = serde_json::from_str(json)?;
        Ok(doc)
    }

    /// Declare every option and positional slot into a new schema.
    pub fn to_schema(&self) -> Result<Schema> {
        let mut schema = Schema::new();
        for option in &self.options {
            schema.declare(option.to_spec()?)?;
        }
        for slot in &self.positional {
            schema.add_positional(&slot.name, slot.max)?;
        }
        Ok(schema)
    }
}

impl OptionConfig {
    fn kind(&self) -> Result<ValueKind> {
        match (&self.choices, self.kind) {
            (Some(choices), KindName::String | KindName::Enum) => {
                Ok(ValueKind::Enum(choices.clone()))
            }
            (Some(_), _) => Err(Error::InvalidSchema(format!(
                "'choices' on option '{}' require the enum kind",
                self.name
            ))),
            (None, KindName::Enum) => Err(Error::InvalidSchema(format!(
                "enum option '{}' has no choices",
                self.name
            ))),
            (None, KindName::String) => Ok(ValueKind::String),
            (None, KindName::Int) => Ok(ValueKind::Int),
            (None, KindName::Float) => Ok(ValueKind::Float),
            (None, KindName::Bool) => Ok(ValueKind::Bool),
        }
    }

    fn convert(&self, kind: &ValueKind, text: &str) -> Result<Value> {
        let convert_one = |piece: &str| {
            kind.convert(piece).map_err(|expected| Error::TypeConversion {
                option: self.name.clone(),
                text: piece.to_string(),
                kind: expected,
                at: None,
            })
        };

        match (self.arity, self.delimiter) {
            (Arity::Multi, Some(delim)) => text
                .split(delim)
                .map(convert_one)
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            _ => convert_one(text),
        }
    }

    /// Build the option declaration described by this entry.
    pub fn to_spec(&self) -> Result<OptionSpec> {
        if self.arity == Arity::Flag {
            if self.choices.is_some() {
                return Err(Error::InvalidSchema(format!(
                    "'choices' cannot be used on flag '{}'",
                    self.name
                )));
            }
            if !matches!(self.kind, KindName::String | KindName::Bool) {
                return Err(Error::InvalidSchema(format!(
                    "'kind' cannot be used on flag '{}'",
                    self.name
                )));
            }
        }

        let kind = self.kind()?;
        let mut spec = match self.arity {
            Arity::Flag => OptionSpec::flag(self.name.clone()),
            Arity::Single => OptionSpec::single(self.name.clone(), kind.clone()),
            Arity::Multi => OptionSpec::multi(self.name.clone(), kind.clone()),
        };

        spec.short = self.short;
        spec.required = self.required;
        spec.composing = self.composing;
        spec.multi_token = self.multi_token;
        spec.delimiter = self.delimiter;
        spec.help = self.help.clone();

        if let Some(ref default) = self.default {
            let flag_kind = ValueKind::Bool;
            let kind = if self.arity == Arity::Flag { &flag_kind } else { &kind };
            spec.default = Some(self.convert(kind, default)?);
        }
        if let Some(ref implicit) = self.implicit {
            spec.implicit = Some(self.convert(&kind, implicit)?);
        }

        Ok(spec)
    }
}

impl Schema {
    /// Parse and declare a JSON schema document.
    pub fn from_json(json: &str) -> Result<Schema> {
        SchemaDocument::from_json(json)?.to_schema()
    }
}
