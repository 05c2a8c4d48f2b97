//! Rendering a finalized store as shell exports or JSON, and a schema as a
//! plain option listing.

use crate::schema::{Arity, Schema};
use crate::store::Store;
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Escape a string for safe use in a shell double-quoted context.
///
/// Escapes: $, `, \, ", and !
fn escape_shell_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '$' => escaped.push_str("\\$"),
            '`' => escaped.push_str("\\`"),
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '!' => escaped.push_str("\\!"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Convert an option name to a valid shell variable name.
///
/// Uppercases and turns `-` and `.` (section separator) into `_`.
fn to_shell_var_name(name: &str) -> String {
    name.to_uppercase().replace(['-', '.'], "_")
}

/// Render `export PREFIX_NAME="value"` lines, sorted by option name.
///
/// List values are joined with single spaces.
pub fn render_exports(store: &Store, prefix: &str) -> String {
    let mut output = String::new();
    for (name, value) in store.iter() {
        let var_name = format!("{}{}", prefix, to_shell_var_name(name));
        let escaped_value = escape_shell_value(&value.to_string());
        output.push_str(&format!("export {}=\"{}\"\n", var_name, escaped_value));
    }
    output
}

/// Write the export lines to a temporary file and return its path.
///
/// The file persists until it is manually deleted.
pub fn write_exports(store: &Store, prefix: &str) -> Result<PathBuf> {
    let mut file = NamedTempFile::new()?;
    file.write_all(render_exports(store, prefix).as_bytes())?;

    // Persist the file (don't delete on drop)
    let path = file.into_temp_path().keep()?;
    Ok(path)
}

/// Render the store as a pretty-printed JSON object.
pub fn render_json(store: &Store) -> Result<String> {
    let map: BTreeMap<&str, _> = store.iter().collect();
    Ok(serde_json::to_string_pretty(&map)?)
}

/// One tab-separated line per declared option, in declaration order:
/// names, arity, value kind and help text when present.
pub fn render_schema(schema: &Schema) -> String {
    let mut output = String::new();
    for spec in schema.options() {
        let names = match spec.short {
            Some(short) => format!("--{}, -{}", spec.name, short),
            None => format!("--{}", spec.name),
        };
        let arity = match spec.arity {
            Arity::Flag => "flag",
            Arity::Single => "single",
            Arity::Multi => "multi",
        };
        output.push_str(&format!("{}\t{}\t{}", names, arity, spec.kind.describe()));
        if let Some(ref help) = spec.help {
            output.push('\t');
            output.push_str(help);
        }
        output.push('\n');
    }
    output
}
