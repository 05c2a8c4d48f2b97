//! End-to-end: JSON schema, command line and config files merged in one store.

use optlayer::{
    parse_command_line, parse_config_file, render_exports, Error, OptionSpec, Schema, Store,
    Style, Value, ValueKind,
};

const SCHEMA: &str = r#"{
    "options": [
        {"name": "verbose", "short": "v", "arity": "flag"},
        {"name": "host", "required": true},
        {"name": "port", "short": "p", "kind": "int", "default": "80"},
        {"name": "include", "short": "I", "arity": "multi", "composing": true},
        {"name": "log.level", "choices": ["debug", "info", "warn"], "default": "info"},
        {"name": "files", "arity": "multi"}
    ],
    "positional": [{"name": "files", "max": null}]
}"#;

fn args(s: &[&str]) -> Vec<String> {
    s.iter().map(|s| s.to_string()).collect()
}

fn resolve(cmdline: &[&str], files: &[(&str, &str)]) -> Result<Store, Error> {
    let schema = Schema::from_json(SCHEMA)?;
    let mut store = Store::new();
    store.notify(
        &parse_command_line(&schema, &Style::default(), &args(cmdline))?,
        0,
    )?;
    for (i, (origin, text)) in files.iter().enumerate() {
        store.notify(&parse_config_file(&schema, text, origin)?, i as u32 + 1)?;
    }
    store.finalize()?;
    Ok(store)
}

#[test]
fn test_command_line_overrides_config() {
    let store = resolve(
        &["-p", "8080", "--host", "cli.example"],
        &[("app.ini", "host = file.example\nport = 9000\n")],
    )
    .unwrap();

    assert_eq!(store.get_as::<i64>("port").unwrap(), 8080);
    assert_eq!(store.get_as::<String>("host").unwrap(), "cli.example");
}

#[test]
fn test_config_fills_gaps_and_sections_nest() {
    let store = resolve(
        &["-v", "a.txt", "b.txt"],
        &[(
            "app.ini",
            "host = file.example\n\n[log]\nlevel = debug\n",
        )],
    )
    .unwrap();

    assert_eq!(store.get_as::<String>("host").unwrap(), "file.example");
    assert_eq!(store.get_as::<String>("log.level").unwrap(), "debug");
    assert_eq!(store.get_as::<bool>("verbose").unwrap(), true);
    assert_eq!(
        store.get_as::<Vec<String>>("files").unwrap(),
        vec!["a.txt", "b.txt"]
    );
    assert!(store.is_defaulted("port"));
    assert_eq!(store.get("port").unwrap(), &Value::Int(80));
}

#[test]
fn test_composing_across_three_sources() {
    let store = resolve(
        &["--host", "h", "-I", "cli"],
        &[
            ("local.ini", "include = local\n"),
            ("global.ini", "include = global1\ninclude = global2\n"),
        ],
    )
    .unwrap();

    assert_eq!(store.count("include"), 4);
    assert_eq!(
        store.get_as::<Vec<String>>("include").unwrap(),
        vec!["cli", "local", "global1", "global2"]
    );
    assert_eq!(
        store.sources("include").unwrap(),
        ["command line", "local.ini", "global.ini", "global.ini"]
    );
}

#[test]
fn test_missing_required_host() {
    let result = resolve(&["-v"], &[("app.ini", "port = 1\n")]);
    assert_eq!(result.unwrap_err(), Error::MissingRequired(vec!["host".into()]));
}

#[test]
fn test_errors_surface_from_each_layer() {
    // Tokenizer
    let result = resolve(&["--host"], &[]);
    assert!(matches!(result, Err(Error::Syntax { .. })));

    // Matcher: conversion in a config file, with its line number
    match resolve(&["--host", "h"], &[("app.ini", "\n\nport = eighty\n")]) {
        Err(Error::TypeConversion { at: Some(at), .. }) => {
            assert_eq!(at.origin, "app.ini");
            assert_eq!(at.position, 3);
        }
        other => panic!("Expected TypeConversion, got {:?}", other),
    }

    // Matcher: enum choice
    let result = resolve(&["--host", "h", "--log.level", "loud"], &[]);
    assert!(matches!(result, Err(Error::TypeConversion { .. })));

    // Matcher: unknown config key
    let result = resolve(&["--host", "h"], &[("app.ini", "colour = red\n")]);
    assert!(matches!(result, Err(Error::UnknownOption { .. })));
}

#[test]
fn test_abbreviated_long_option() {
    let store = resolve(&["--ho", "h", "--po=7"], &[]).unwrap();
    assert_eq!(store.get_as::<i64>("port").unwrap(), 7);
}

#[test]
fn test_builder_schema_with_validator() {
    let mut schema = Schema::new();
    schema
        .declare(
            OptionSpec::single("threads", ValueKind::Int)
                .default_value(1i64)
                .validator(|v| match v {
                    Value::Int(n) if n > 0 => Ok(v),
                    _ => Err("must be positive".to_string()),
                }),
        )
        .unwrap();

    let result = parse_config_file(&schema, "threads = -2\n", "app.ini");
    assert!(matches!(result, Err(Error::Validation { .. })));

    let mut store = Store::new();
    store
        .notify(&parse_config_file(&schema, "threads = 6\n", "app.ini").unwrap(), 1)
        .unwrap();
    store.finalize().unwrap();
    assert_eq!(render_exports(&store, "APP_"), "export APP_THREADS=\"6\"\n");
}

#[test]
fn test_finalized_store_shared_across_threads() {
    let store = resolve(&["--host", "h"], &[]).unwrap();
    let store = std::sync::Arc::new(store);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = std::sync::Arc::clone(&store);
            std::thread::spawn(move || store.get_as::<i64>("port").unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 80);
    }
}
