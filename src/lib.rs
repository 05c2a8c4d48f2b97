//! optlayer - schema-driven option parsing over layered sources.
//!
//! A program declares the options it accepts in a [`Schema`], tokenizes each
//! raw source (the command line, config-file text), matches the occurrences
//! against the schema to get typed values, and merges the sources into a
//! [`Store`] by priority.
//!
//! ```
//! use optlayer::{
//!     parse_command_line, parse_config_file, OptionSpec, Schema, Store, Style, ValueKind,
//! };
//!
//! let mut schema = Schema::new();
//! schema
//!     .declare(OptionSpec::single("port", ValueKind::Int).default_value(80i64))?
//!     .declare(OptionSpec::single("host", ValueKind::String).required())?;
//!
//! let args = vec!["--port".to_string(), "8080".to_string()];
//! let mut store = Store::new();
//! store.notify(&parse_command_line(&schema, &Style::default(), &args)?, 0)?;
//! store.notify(&parse_config_file(&schema, "host = example.com\nport = 9\n", "app.ini")?, 1)?;
//! store.finalize()?;
//!
//! assert_eq!(store.get_as::<i64>("port")?, 8080);
//! assert_eq!(store.get_as::<String>("host")?, "example.com");
//! # Ok::<(), optlayer::Error>(())
//! ```

pub mod cmdline;
pub mod config;
pub mod config_file;
pub mod error;
pub mod matcher;
pub mod occurrence;
pub mod output;
pub mod schema;
pub mod store;
pub mod value;

pub use cmdline::{tokenize_command_line, Style, COMMAND_LINE};
pub use config::SchemaDocument;
pub use config_file::tokenize_config_file;
pub use error::{Error, Location, Result};
pub use matcher::{Contribution, Matcher, Resolved};
pub use occurrence::{Occurrence, ParsedOccurrences, TokenForm};
pub use output::{render_exports, render_json, render_schema, write_exports};
pub use schema::{Arity, OptionSpec, Schema};
pub use store::Store;
pub use value::{FromValue, Value, ValueKind};

/// Tokenize and match a command line in one step.
pub fn parse_command_line<'s>(
    schema: &'s Schema,
    style: &Style,
    args: &[String],
) -> Result<Resolved<'s>> {
    let parsed = tokenize_command_line(args, style, schema)?;
    Matcher::new(schema).resolve(&parsed)
}

/// Tokenize and match config-file text in one step.
pub fn parse_config_file<'s>(
    schema: &'s Schema,
    text: &str,
    origin: &str,
) -> Result<Resolved<'s>> {
    let parsed = tokenize_config_file(text, origin)?;
    Matcher::new(schema).resolve(&parsed)
}
