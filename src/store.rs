//! The variables map: merges resolved sources by priority.
//!
//! A [`Store`] starts in the building state and accepts [`Resolved`] sources
//! through [`Store::notify`]. [`Store::finalize`] applies precedence, fills in
//! defaults and checks required options; after that the store is read-only.
//!
//! Lower priority numbers win. For non-composing options only the values of
//! the single best source survive; composing options concatenate every
//! source's values in increasing priority order. Sources notified with equal
//! priority rank in notification order.

use crate::error::{Error, Result};
use crate::matcher::Resolved;
use crate::schema::Arity;
use crate::value::{FromValue, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Source label recorded for values that came from a declared default.
pub const DEFAULT_SOURCE: &str = "default";

/// Accumulated values for one option after finalize.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCell {
    values: Vec<Value>,
    sources: Vec<String>,
    merged: Value,
    defaulted: bool,
}

impl ValueCell {
    /// Individual values in merge order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Origin of each value, parallel to [`values`](Self::values).
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// The option's final value: a list for multi-valued or composing
    /// options, otherwise the single value.
    pub fn value(&self) -> &Value {
        &self.merged
    }

    pub fn is_defaulted(&self) -> bool {
        self.defaulted
    }
}

#[derive(Debug, Clone)]
struct Declared {
    arity: Arity,
    composing: bool,
    required: bool,
    default: Option<Value>,
}

#[derive(Debug, Clone)]
struct Pending {
    name: String,
    value: Value,
    origin: String,
    priority: u32,
    /// Notification sequence number, identifies the source
    seq: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Building,
    Finalized,
}

/// Mapping from canonical option name to its final value.
#[derive(Debug, Clone)]
pub struct Store {
    state: State,
    declared: BTreeMap<String, Declared>,
    pending: Vec<Pending>,
    cells: BTreeMap<String, ValueCell>,
    notified: usize,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            state: State::Building,
            declared: BTreeMap::new(),
            pending: Vec::new(),
            cells: BTreeMap::new(),
            notified: 0,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.state == State::Finalized
    }

    /// Add one resolved source. Lower `priority` takes precedence.
    ///
    /// Fails with [`Error::AlreadyFinalized`] once the store is finalized.
    pub fn notify(&mut self, resolved: &Resolved<'_>, priority: u32) -> Result<()> {
        if self.is_finalized() {
            return Err(Error::AlreadyFinalized);
        }

        for spec in resolved.schema.options() {
            self.declared
                .entry(spec.name.clone())
                .or_insert_with(|| Declared {
                    arity: spec.arity,
                    composing: spec.composing,
                    required: spec.required,
                    default: spec.default.clone(),
                });
        }

        let seq = self.notified;
        self.notified += 1;
        self.pending
            .extend(resolved.contributions.iter().map(|c| Pending {
                name: c.name.clone(),
                value: c.value.clone(),
                origin: resolved.origin.clone(),
                priority,
                seq,
            }));

        debug!(
            origin = %resolved.origin,
            priority,
            contributions = resolved.contributions.len(),
            "notified store"
        );
        Ok(())
    }

    /// Resolve precedence, apply defaults and check required options.
    ///
    /// Every missing required option is reported at once. On failure the
    /// store stays in the building state. Calling this again after success
    /// does nothing.
    pub fn finalize(&mut self) -> Result<()> {
        if self.is_finalized() {
            return Ok(());
        }

        let mut by_name: BTreeMap<&str, Vec<&Pending>> = BTreeMap::new();
        for pending in &self.pending {
            by_name.entry(pending.name.as_str()).or_default().push(pending);
        }

        let mut cells = BTreeMap::new();
        let mut missing = Vec::new();

        for (name, declared) in &self.declared {
            let listed = declared.arity == Arity::Multi || declared.composing;

            match by_name.get_mut(name.as_str()) {
                Some(contributions) if !contributions.is_empty() => {
                    // Stable: encounter order is kept within a source
                    contributions.sort_by_key(|p| (p.priority, p.seq));
                    let best = (contributions[0].priority, contributions[0].seq);
                    let kept: Vec<&Pending> = contributions
                        .iter()
                        .copied()
                        .filter(|p| declared.composing || (p.priority, p.seq) == best)
                        .collect();

                    let values: Vec<Value> = kept.iter().map(|p| p.value.clone()).collect();
                    let sources = kept.iter().map(|p| p.origin.clone()).collect();
                    let merged = if listed {
                        Value::List(values.clone())
                    } else {
                        values[0].clone()
                    };
                    cells.insert(
                        name.clone(),
                        ValueCell {
                            values,
                            sources,
                            merged,
                            defaulted: false,
                        },
                    );
                }
                _ => {
                    if let Some(default) = &declared.default {
                        let values = match default {
                            Value::List(items) => items.clone(),
                            single => vec![single.clone()],
                        };
                        let merged = if listed {
                            Value::List(values.clone())
                        } else {
                            default.clone()
                        };
                        cells.insert(
                            name.clone(),
                            ValueCell {
                                sources: vec![DEFAULT_SOURCE.to_string(); values.len()],
                                values,
                                merged,
                                defaulted: true,
                            },
                        );
                    } else if declared.required {
                        missing.push(name.clone());
                    }
                }
            }
        }

        if !missing.is_empty() {
            debug!(missing = ?missing, "finalize failed");
            return Err(Error::MissingRequired(missing));
        }

        debug!(options = cells.len(), "finalized store");
        self.cells = cells;
        self.pending.clear();
        self.state = State::Finalized;
        Ok(())
    }

    fn cell(&self, name: &str) -> Result<&ValueCell> {
        if !self.is_finalized() {
            return Err(Error::NotSet(name.to_string()));
        }
        self.cells
            .get(name)
            .ok_or_else(|| Error::NotSet(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cell(name).is_ok()
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.cell(name).map(ValueCell::value)
    }

    /// Typed access, e.g. `store.get_as::<i64>("port")`.
    pub fn get_as<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.get(name)?;
        T::from_value(value).ok_or_else(|| Error::TypeConversion {
            option: name.to_string(),
            text: value.to_string(),
            kind: T::EXPECTED.to_string(),
            at: None,
        })
    }

    /// Number of values contributed by sources for `name`.
    ///
    /// A value that came only from the declared default counts as 0, so a
    /// flag never given reports 0 and `-vvv` reports 3.
    pub fn count(&self, name: &str) -> usize {
        match self.cell(name) {
            Ok(cell) if !cell.defaulted => cell.values.len(),
            _ => 0,
        }
    }

    pub fn values(&self, name: &str) -> Result<&[Value]> {
        self.cell(name).map(ValueCell::values)
    }

    pub fn sources(&self, name: &str) -> Result<&[String]> {
        self.cell(name).map(ValueCell::sources)
    }

    pub fn is_defaulted(&self, name: &str) -> bool {
        self.cell(name).map_or(false, ValueCell::is_defaulted)
    }

    /// Final values sorted by name. Empty before finalize.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells
            .iter()
            .map(|(name, cell)| (name.as_str(), cell.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmdline::{tokenize_command_line, Style};
    use crate::config_file::tokenize_config_file;
    use crate::matcher::Matcher;
    use crate::schema::{OptionSpec, Schema};
    use crate::value::ValueKind;

    fn args(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .declare(OptionSpec::single("x", ValueKind::Int))
            .unwrap()
            .declare(OptionSpec::single("y", ValueKind::Int).composing())
            .unwrap()
            .declare(OptionSpec::multi("inc", ValueKind::String))
            .unwrap()
            .declare(OptionSpec::flag("verbose").short('v'))
            .unwrap();
        schema
    }

    fn from_args<'s>(schema: &'s Schema, list: &[&str]) -> Resolved<'s> {
        let parsed = tokenize_command_line(&args(list), &Style::default(), schema).unwrap();
        Matcher::new(schema).resolve(&parsed).unwrap()
    }

    fn from_config<'s>(schema: &'s Schema, text: &str) -> Resolved<'s> {
        let parsed = tokenize_config_file(text, "app.ini").unwrap();
        Matcher::new(schema).resolve(&parsed).unwrap()
    }

    #[test]
    fn test_earlier_priority_wins() {
        let schema = schema();
        let mut store = Store::new();
        store.notify(&from_args(&schema, &["--x", "1"]), 0).unwrap();
        store.notify(&from_config(&schema, "x = 2\n"), 1).unwrap();
        store.finalize().unwrap();

        assert_eq!(store.get("x").unwrap(), &Value::Int(1));
        assert_eq!(store.count("x"), 1);
        assert_eq!(store.sources("x").unwrap(), ["command line"]);
    }

    #[test]
    fn test_priority_not_notification_order() {
        let schema = schema();
        let mut store = Store::new();
        store.notify(&from_config(&schema, "x = 2\n"), 5).unwrap();
        store.notify(&from_args(&schema, &["--x", "1"]), 0).unwrap();
        store.finalize().unwrap();
        assert_eq!(store.get_as::<i64>("x").unwrap(), 1);
    }

    #[test]
    fn test_equal_priority_first_notified_wins() {
        let schema = schema();
        let mut store = Store::new();
        store.notify(&from_config(&schema, "x = 7\n"), 1).unwrap();
        store.notify(&from_config(&schema, "x = 8\n"), 1).unwrap();
        store.finalize().unwrap();
        assert_eq!(store.get("x").unwrap(), &Value::Int(7));
    }

    #[test]
    fn test_composing_concatenates_in_priority_order() {
        let schema = schema();
        let mut store = Store::new();
        store.notify(&from_config(&schema, "y = 2\n"), 1).unwrap();
        store.notify(&from_args(&schema, &["--y", "1"]), 0).unwrap();
        store.finalize().unwrap();

        assert_eq!(store.count("y"), 2);
        assert_eq!(store.values("y").unwrap(), [Value::Int(1), Value::Int(2)]);
        assert_eq!(store.get_as::<Vec<i64>>("y").unwrap(), vec![1, 2]);
        assert_eq!(store.sources("y").unwrap(), ["command line", "app.ini"]);
    }

    #[test]
    fn test_multi_non_composing_takes_best_source_only() {
        let schema = schema();
        let mut store = Store::new();
        store
            .notify(&from_args(&schema, &["--inc", "a", "--inc", "b"]), 0)
            .unwrap();
        store.notify(&from_config(&schema, "inc = c\n"), 1).unwrap();
        store.finalize().unwrap();

        assert_eq!(
            store.get("inc").unwrap(),
            &Value::List(vec![Value::Str("a".into()), Value::Str("b".into())])
        );
    }

    #[test]
    fn test_defaults_and_flags() {
        let mut schema = schema();
        schema
            .declare(OptionSpec::single("host", ValueKind::String).default_value("localhost"))
            .unwrap();
        let mut store = Store::new();
        store.notify(&from_args(&schema, &[]), 0).unwrap();
        store.finalize().unwrap();

        assert_eq!(store.get_as::<String>("host").unwrap(), "localhost");
        assert!(store.is_defaulted("host"));
        assert_eq!(store.sources("host").unwrap(), [DEFAULT_SOURCE]);
        assert_eq!(store.get_as::<bool>("verbose").unwrap(), false);
        assert_eq!(store.count("host"), 0);
        assert!(!store.contains("x"));
        assert!(matches!(store.get("x"), Err(Error::NotSet(_))));
    }

    #[test]
    fn test_default_ignored_once_contributed() {
        let mut schema = Schema::new();
        schema
            .declare(
                OptionSpec::multi("path", ValueKind::String)
                    .composing()
                    .default_value(vec!["/usr/lib"]),
            )
            .unwrap();
        let mut store = Store::new();
        store.notify(&from_config(&schema, "path = /opt\n"), 1).unwrap();
        store.finalize().unwrap();
        assert_eq!(store.get_as::<Vec<String>>("path").unwrap(), vec!["/opt"]);
        assert!(!store.is_defaulted("path"));
    }

    #[test]
    fn test_flag_count() {
        let schema = schema();
        let mut store = Store::new();
        store.notify(&from_args(&schema, &["-vvv"]), 0).unwrap();
        store.finalize().unwrap();
        assert_eq!(store.count("verbose"), 3);
        assert_eq!(store.get("verbose").unwrap(), &Value::Bool(true));
    }

    #[test]
    fn test_flag_never_given_counts_zero() {
        let schema = schema();
        let mut store = Store::new();
        store.notify(&from_args(&schema, &[]), 0).unwrap();
        store.finalize().unwrap();
        assert_eq!(store.count("verbose"), 0);
        assert!(store.contains("verbose"));
        assert!(store.is_defaulted("verbose"));

        let mut store = Store::new();
        store.notify(&from_args(&schema, &["-v"]), 0).unwrap();
        store.finalize().unwrap();
        assert_eq!(store.count("verbose"), 1);
    }

    #[test]
    fn test_missing_required_reports_all() {
        let mut schema = Schema::new();
        schema
            .declare(OptionSpec::single("host", ValueKind::String).required())
            .unwrap()
            .declare(OptionSpec::single("port", ValueKind::Int).required())
            .unwrap();
        let mut store = Store::new();
        store.notify(&from_args(&schema, &[]), 0).unwrap();

        match store.finalize() {
            Err(Error::MissingRequired(names)) => assert_eq!(names, vec!["host", "port"]),
            other => panic!("Expected MissingRequired, got {:?}", other),
        }
        assert!(!store.is_finalized());

        // Still building: another source can fill the gap
        store
            .notify(&from_config(&schema, "host = h\nport = 1\n"), 1)
            .unwrap();
        store.finalize().unwrap();
        assert_eq!(store.get_as::<i64>("port").unwrap(), 1);
    }

    #[test]
    fn test_required_with_default_passes() {
        let mut schema = Schema::new();
        schema
            .declare(
                OptionSpec::single("host", ValueKind::String)
                    .required()
                    .default_value("db.local"),
            )
            .unwrap();
        let mut store = Store::new();
        store.notify(&from_args(&schema, &[]), 0).unwrap();
        store.finalize().unwrap();
        assert_eq!(store.get("host").unwrap(), &Value::Str("db.local".into()));
    }

    #[test]
    fn test_get_before_finalize() {
        let schema = schema();
        let mut store = Store::new();
        store.notify(&from_args(&schema, &["--x", "1"]), 0).unwrap();
        assert!(matches!(store.get("x"), Err(Error::NotSet(_))));
        assert!(!store.contains("x"));
        assert_eq!(store.count("x"), 0);
    }

    #[test]
    fn test_notify_after_finalize_rejected() {
        let schema = schema();
        let mut store = Store::new();
        store.finalize().unwrap();
        let result = store.notify(&from_args(&schema, &["--x", "1"]), 0);
        assert_eq!(result, Err(Error::AlreadyFinalized));
    }

    #[test]
    fn test_finalize_twice_is_idempotent() {
        let schema = schema();
        let mut store = Store::new();
        store.notify(&from_args(&schema, &["--x", "3", "-v"]), 0).unwrap();
        store.finalize().unwrap();
        let first: Vec<(String, Value)> = store
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        store.finalize().unwrap();
        let second: Vec<(String, Value)> = store
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_as_mismatch() {
        let schema = schema();
        let mut store = Store::new();
        store.notify(&from_args(&schema, &["--x", "3"]), 0).unwrap();
        store.finalize().unwrap();
        assert!(matches!(
            store.get_as::<String>("x"),
            Err(Error::TypeConversion { .. })
        ));
    }

    #[test]
    fn test_finalized_store_is_shareable() {
        fn assert_sync<T: Send + Sync>(_: &T) {}
        let mut store = Store::new();
        store.finalize().unwrap();
        assert_sync(&store);
    }
}
