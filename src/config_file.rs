//! Config-file tokenizer.
//!
//! Line-oriented `key = value` / `key value` text with `#` or `;` comments and
//! `[section]` headers that prefix the following keys as `section.key`.
//! A key without a value is recorded with no raw value; whether that means
//! "flag set" is decided by the matcher.

use crate::error::{Error, Result};
use crate::occurrence::{Occurrence, ParsedOccurrences, TokenForm};
use tracing::{debug, trace};

/// Tokenize already-decoded config text. `origin` names the source in errors.
pub fn tokenize_config_file(text: &str, origin: &str) -> Result<ParsedOccurrences> {
    let mut parsed = ParsedOccurrences::new(origin);
    let mut section = String::new();

    for (index, raw_line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();

        if line.is_empty() || is_comment_start(line) {
            continue;
        }

        let syntax = |message: &str| Error::Syntax {
            text: raw_line.to_string(),
            message: message.to_string(),
            at: parsed.location(line_no),
        };

        if let Some(header) = line.strip_prefix('[') {
            let name = strip_comment(header)
                .strip_suffix(']')
                .ok_or_else(|| syntax("unterminated section header"))?
                .trim();
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(syntax("invalid section name"));
            }
            section = name.to_string();
            trace!(origin, section = %section, line = line_no, "config section");
            continue;
        }

        // The key runs up to the first whitespace or '='; the next
        // non-space character decides between `key = value` and `key value`.
        let key_end = line
            .find(|c: char| c.is_whitespace() || c == '=')
            .unwrap_or(line.len());
        let key = &line[..key_end];
        let after = line[key_end..].trim_start();
        let (rest, explicit) = match after.strip_prefix('=') {
            Some(rest) => (Some(rest), true),
            None if after.is_empty() => (None, false),
            None => (Some(after), false),
        };

        if key.is_empty() {
            return Err(syntax("missing key"));
        }
        if key.contains(['"', '\'']) {
            return Err(syntax("invalid key"));
        }

        let raw_value = match rest {
            Some(rest) => parse_value(rest, explicit).map_err(syntax)?,
            None => None,
        };

        let token = if section.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", section, key)
        };

        trace!(origin, token = %token, value = ?raw_value, line = line_no, "config occurrence");
        parsed.options.push(Occurrence {
            token,
            raw_value,
            position: line_no,
            form: TokenForm::ConfigKey,
            unknown: false,
        });
    }

    debug!(origin, options = parsed.options.len(), "tokenized config file");
    Ok(parsed)
}

fn is_comment_start(s: &str) -> bool {
    s.starts_with('#') || s.starts_with(';')
}

/// Drop a trailing comment: `#` or `;` at the start or after whitespace.
fn strip_comment(s: &str) -> &str {
    let mut prev_ws = true;
    for (i, c) in s.char_indices() {
        if prev_ws && (c == '#' || c == ';') {
            return s[..i].trim_end();
        }
        prev_ws = c.is_whitespace();
    }
    s.trim_end()
}

/// Parse the text after the key. `explicit` is true when an `=` was present,
/// in which case an empty value is kept as `Some("")`.
fn parse_value(rest: &str, explicit: bool) -> std::result::Result<Option<String>, &'static str> {
    let rest = rest.trim_start();

    let quote = match rest.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => {
            let value = strip_comment(rest);
            return Ok(if value.is_empty() && !explicit {
                None
            } else {
                Some(value.to_string())
            });
        }
    };

    let mut value = String::new();
    let mut chars = rest[1..].char_indices();
    let mut end = None;
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if quote == '"' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, other)) => value.push(other),
                None => return Err("unterminated quote"),
            },
            c if c == quote => {
                end = Some(i + 1 + c.len_utf8());
                break;
            }
            c => value.push(c),
        }
    }

    let end = end.ok_or("unterminated quote")?;
    let trailing = rest[end..].trim();
    if !trailing.is_empty() && !is_comment_start(trailing) {
        return Err("unexpected text after quoted value");
    }
    Ok(Some(value))
}
