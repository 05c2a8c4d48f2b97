//! optlayer - resolve options from the command line and config files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use optlayer::{
    parse_config_file, render_json, render_schema, tokenize_command_line, write_exports,
    Matcher, SchemaDocument, Store,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Resolve typed options from layered sources.
#[derive(Parser, Debug)]
#[command(name = "optlayer", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Path to a temporary file of shell export statements
    Exports,
    /// JSON object on stdout
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve arguments and config files against a schema
    Resolve {
        /// JSON schema document
        #[arg(long)]
        schema: String,

        /// Config file to read; earlier files take precedence over later ones
        #[arg(long = "config-file", value_name = "PATH")]
        config_files: Vec<PathBuf>,

        /// Environment variable prefix for exports
        #[arg(long, default_value = "OPT_")]
        prefix: String,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Exports)]
        format: Format,

        /// Collect unknown options instead of failing
        #[arg(long)]
        allow_unregistered: bool,

        /// Arguments to resolve
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Validate a JSON schema document and list its options
    Check {
        /// JSON schema document
        #[arg(long)]
        schema: String,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("OPTLAYER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            schema,
            config_files,
            prefix,
            format,
            allow_unregistered,
            args,
        } => {
            let doc = SchemaDocument::from_json(&schema).context("failed to parse schema JSON")?;
            let schema = doc.to_schema().context("invalid schema")?;

            let mut store = Store::new();

            // The command line always wins
            let parsed = tokenize_command_line(&args, &doc.style, &schema)
                .context("failed to parse arguments")?;
            let resolved = Matcher::new(&schema)
                .allow_unregistered(allow_unregistered)
                .resolve(&parsed)
                .context("failed to parse arguments")?;
            for token in &resolved.unrecognized {
                tracing::warn!(token = %token, "ignoring unrecognized argument");
            }
            store.notify(&resolved, 0)?;

            for (i, path) in config_files.iter().enumerate() {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let origin = path.display().to_string();
                let resolved = parse_config_file(&schema, &text, &origin)
                    .with_context(|| format!("failed to parse {}", origin))?;
                store.notify(&resolved, i as u32 + 1)?;
            }

            store.finalize().context("failed to resolve options")?;

            match format {
                Format::Exports => {
                    let path = write_exports(&store, &prefix)
                        .context("failed to generate output file")?;
                    println!("{}", path.display());
                }
                Format::Json => println!("{}", render_json(&store)?),
            }
        }
        Commands::Check { schema } => {
            let doc = SchemaDocument::from_json(&schema).context("failed to parse schema JSON")?;
            let schema = doc.to_schema().context("invalid schema")?;
            println!(
                "schema ok: {} option(s), {} positional slot(s)",
                schema.options().len(),
                schema.positional_slots().len()
            );
            print!("{}", render_schema(&schema));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_resolve_subcommand_parses_schema() {
        let cli = Cli::try_parse_from(["optlayer", "resolve", "--schema", r#"{}"#, "--"]).unwrap();

        match cli.command {
            Commands::Resolve {
                schema,
                config_files,
                prefix,
                format,
                allow_unregistered,
                args,
            } => {
                assert_eq!(schema, "{}");
                assert!(config_files.is_empty());
                assert_eq!(prefix, "OPT_");
                assert_eq!(format, Format::Exports);
                assert!(!allow_unregistered);
                assert!(args.is_empty());
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_resolve_subcommand_parses_config_files_in_order() {
        let cli = Cli::try_parse_from([
            "optlayer",
            "resolve",
            "--schema",
            "{}",
            "--config-file",
            "local.ini",
            "--config-file",
            "global.ini",
            "--format",
            "json",
            "--",
        ])
        .unwrap();

        match cli.command {
            Commands::Resolve {
                config_files,
                format,
                ..
            } => {
                assert_eq!(
                    config_files,
                    vec![PathBuf::from("local.ini"), PathBuf::from("global.ini")]
                );
                assert_eq!(format, Format::Json);
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_resolve_subcommand_parses_args() {
        let cli = Cli::try_parse_from([
            "optlayer",
            "resolve",
            "--schema",
            "{}",
            "--",
            "-v",
            "--output",
            "file.txt",
            "input.txt",
        ])
        .unwrap();

        match cli.command {
            Commands::Resolve { args, .. } => {
                assert_eq!(args, vec!["-v", "--output", "file.txt", "input.txt"]);
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_resolve_requires_schema() {
        let result = Cli::try_parse_from(["optlayer", "resolve", "--"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_subcommand() {
        let cli =
            Cli::try_parse_from(["optlayer", "check", "--schema", r#"{"options":[]}"#]).unwrap();
        match cli.command {
            Commands::Check { schema } => assert_eq!(schema, r#"{"options":[]}"#),
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let result = Cli::try_parse_from(["optlayer"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_help() {
        // Verify the command can generate help without panicking
        Cli::command().debug_assert();
    }
}
