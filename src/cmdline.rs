//! Command-line tokenizer.
//!
//! Splits an argument list into option occurrences and positional tokens.
//! The only knowledge it has of the options is the [`ArityLookup`] hint used
//! to decide whether the next argument is a value.

use crate::error::{Error, Result};
use crate::occurrence::{
    ArityLookup, Occurrence, ParsedOccurrences, PositionalToken, TokenArity, TokenForm,
};
use serde::Deserialize;
use std::iter::{Enumerate, Peekable};
use std::slice::Iter;
use tracing::{debug, trace};

/// Source identifier used for command-line occurrences.
pub const COMMAND_LINE: &str = "command line";

/// Which command-line syntaxes are accepted. Everything is on by default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Style {
    /// `--name`
    pub long: bool,
    /// `-x`
    pub short: bool,
    /// `-abc` is `-a -b -c`
    pub bundling: bool,
    /// `--name=value`
    pub equals_value: bool,
    /// `--name value` and `-x value`
    pub space_value: bool,
    /// `-xvalue`
    pub attached_value: bool,
    /// `--` ends option parsing
    pub double_dash: bool,
    /// Unambiguous prefixes of long names are accepted
    pub guessing: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            long: true,
            short: true,
            bundling: true,
            equals_value: true,
            space_value: true,
            attached_value: true,
            double_dash: true,
            guessing: true,
        }
    }
}

type ArgsIter<'a> = Peekable<Enumerate<Iter<'a, String>>>;

/// Tokenize an argument list (without the program name).
pub fn tokenize_command_line<L>(
    args: &[String],
    style: &Style,
    lookup: &L,
) -> Result<ParsedOccurrences>
where
    L: ArityLookup + ?Sized,
{
    let mut tokenizer = Tokenizer::new(style, lookup);
    tokenizer.run(args)?;

    let parsed = tokenizer.out;
    debug!(
        origin = COMMAND_LINE,
        options = parsed.options.len(),
        positional = parsed.positional.len(),
        "tokenized command line"
    );
    Ok(parsed)
}

/// Internal tokenizer state.
struct Tokenizer<'a, L: ?Sized> {
    style: &'a Style,
    lookup: &'a L,
    out: ParsedOccurrences,
}

impl<'a, L: ArityLookup + ?Sized> Tokenizer<'a, L> {
    fn new(style: &'a Style, lookup: &'a L) -> Self {
        let mut out = ParsedOccurrences::new(COMMAND_LINE);
        out.guessing = style.guessing;
        Self { style, lookup, out }
    }

    fn run(&mut self, args: &[String]) -> Result<()> {
        let mut iter = args.iter().enumerate().peekable();
        let mut parsing_options = true;

        while let Some((pos, arg)) = iter.next() {
            if parsing_options && self.style.double_dash && arg == "--" {
                // Everything after is positional
                parsing_options = false;
                continue;
            }

            if parsing_options && self.is_long(arg) {
                self.long_option(pos, arg, &mut iter)?;
            } else if parsing_options && self.is_short(arg) {
                self.short_options(pos, arg, &mut iter)?;
            } else {
                self.out.positional.push(PositionalToken {
                    value: arg.clone(),
                    position: pos,
                });
            }
        }

        Ok(())
    }

    fn is_long(&self, arg: &str) -> bool {
        self.style.long && arg.starts_with("--") && arg.len() > 2
    }

    fn is_short(&self, arg: &str) -> bool {
        self.style.short
            && arg.starts_with('-')
            && !arg.starts_with("--")
            && arg.len() > 1
            && !self.is_negative_number(arg)
    }

    /// `-5` or `-0.5`, unless some short option is literally named after the digit.
    fn is_negative_number(&self, arg: &str) -> bool {
        let body = &arg[1..];
        match body.chars().next() {
            Some(c) if c.is_ascii_digit() || c == '.' => {
                body.parse::<f64>().is_ok() && self.lookup.short_arity(c).is_none()
            }
            _ => false,
        }
    }

    /// Whether `arg` would start a new option rather than serve as a value.
    fn looks_like_option(&self, arg: &str) -> bool {
        (self.style.double_dash && arg == "--") || self.is_long(arg) || self.is_short(arg)
    }

    fn push(
        &mut self,
        token: impl Into<String>,
        raw_value: Option<String>,
        pos: usize,
        form: TokenForm,
        unknown: bool,
    ) {
        let occurrence = Occurrence {
            token: token.into(),
            raw_value,
            position: pos,
            form,
            unknown,
        };
        trace!(
            token = %occurrence.token,
            value = ?occurrence.raw_value,
            position = pos,
            unknown,
            "command-line occurrence"
        );
        self.out.options.push(occurrence);
    }

    fn syntax(&self, pos: usize, text: &str, message: impl Into<String>) -> Error {
        Error::Syntax {
            text: text.to_string(),
            message: message.into(),
            at: self.out.location(pos),
        }
    }

    fn take_value(&self, pos: usize, arg: &str, iter: &mut ArgsIter<'_>) -> Result<String> {
        if self.style.space_value {
            if let Some((_, value)) = iter.next_if(|(_, next)| !self.looks_like_option(next)) {
                return Ok(value.clone());
            }
        }
        Err(self.syntax(pos, arg, "option requires a value"))
    }

    fn take_values(&self, pos: usize, arg: &str, iter: &mut ArgsIter<'_>) -> Result<Vec<String>> {
        let mut values = Vec::new();
        if self.style.space_value {
            while let Some((_, value)) = iter.next_if(|(_, next)| !self.looks_like_option(next)) {
                values.push(value.clone());
            }
        }
        if values.is_empty() {
            return Err(self.syntax(pos, arg, "option requires at least one value"));
        }
        Ok(values)
    }

    fn long_option(&mut self, pos: usize, arg: &str, iter: &mut ArgsIter<'_>) -> Result<()> {
        let body = &arg[2..]; // Strip "--"

        // Check for --option=value format
        let (name, inline_value) = match body.find('=') {
            Some(eq) if self.style.equals_value => (&body[..eq], Some(body[eq + 1..].to_string())),
            _ => (body, None),
        };

        let arity = self.lookup.long_arity(name, self.style.guessing);
        let unknown = arity.is_none();

        if inline_value.is_some() {
            self.push(name, inline_value, pos, TokenForm::Long, unknown);
            return Ok(());
        }

        match arity {
            None | Some(TokenArity::Zero) | Some(TokenArity::Optional) => {
                self.push(name, None, pos, TokenForm::Long, unknown);
            }
            Some(TokenArity::One) => {
                let value = self.take_value(pos, arg, iter)?;
                self.push(name, Some(value), pos, TokenForm::Long, false);
            }
            Some(TokenArity::Many) => {
                for value in self.take_values(pos, arg, iter)? {
                    self.push(name, Some(value), pos, TokenForm::Long, false);
                }
            }
        }

        Ok(())
    }

    fn short_options(&mut self, pos: usize, arg: &str, iter: &mut ArgsIter<'_>) -> Result<()> {
        let chars: Vec<char> = arg[1..].chars().collect(); // Strip "-"
        let first = match chars.first() {
            Some(c) => *c,
            None => return Ok(()),
        };

        // -ofile.txt: the rest of the token is the value
        if chars.len() > 1 && self.style.attached_value {
            if let Some(TokenArity::One | TokenArity::Many | TokenArity::Optional) =
                self.lookup.short_arity(first)
            {
                let rest: String = chars[1..].iter().collect();
                self.push(first, Some(rest), pos, TokenForm::Short, false);
                return Ok(());
            }
        }

        if chars.len() > 1 && !self.style.bundling {
            self.push(&arg[1..], None, pos, TokenForm::Short, true);
            return Ok(());
        }

        for (i, c) in chars.iter().enumerate() {
            let last = i + 1 == chars.len();
            match self.lookup.short_arity(*c) {
                None => self.push(*c, None, pos, TokenForm::Short, true),
                Some(TokenArity::Zero) | Some(TokenArity::Optional) => {
                    self.push(*c, None, pos, TokenForm::Short, false)
                }
                Some(TokenArity::One) if last => {
                    let value = self.take_value(pos, arg, iter)?;
                    self.push(*c, Some(value), pos, TokenForm::Short, false);
                }
                Some(TokenArity::Many) if last => {
                    for value in self.take_values(pos, arg, iter)? {
                        self.push(*c, Some(value), pos, TokenForm::Short, false);
                    }
                }
                Some(TokenArity::One) | Some(TokenArity::Many) => {
                    return Err(self.syntax(
                        pos,
                        arg,
                        format!("option '-{}' takes a value and must come last in a bundle", c),
                    ));
                }
            }
        }

        Ok(())
    }
}
