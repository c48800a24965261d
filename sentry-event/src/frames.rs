//! Turn raw V8-style stack traces into Sentry stack frames.
use serde::{Deserialize, Serialize};

/// Shortest run of dashes that makes a line a separator.
const SEPARATOR_MIN_DASHES: usize = 4;

/// Location reported for frames that have no source file, like builtins.
const NATIVE_LOCATION: &str = "native";

/// A single frame as understood by Sentry's `stacktrace.frames` interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colno: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_app: Option<bool>,
}

impl StackFrame {
    /// A boundary marker: only the filename carries the raw line.
    fn separator(line: &str) -> Self {
        Self {
            filename: Some(line.to_owned()),
            ..Default::default()
        }
    }

    pub fn is_separator(&self) -> bool {
        self.function.is_none()
            && self.lineno.is_none()
            && self.colno.is_none()
            && self.in_app.is_none()
            && self.filename.as_deref().is_some_and(is_separator_line)
    }
}

/// Parse a stack trace into frames, top of the stack first.
///
/// The first line is the error banner (`TypeError: boom`) and is skipped. Lines that
/// are neither a separator nor a recognizable frame are dropped.
pub fn parse_stack(stack: Option<&str>) -> Vec<StackFrame> {
    stack
        .unwrap_or_default()
        .lines()
        .skip(1)
        .filter_map(parse_line)
        .collect()
}

/// Parse a single line of a stack trace. The separator check always wins over the
/// frame grammar.
pub fn parse_line(line: &str) -> Option<StackFrame> {
    if is_separator_line(line) {
        return Some(StackFrame::separator(line));
    }

    let rest = line.trim_start().strip_prefix("at ")?;
    let (function, location) = split_function(rest)?;

    let frame = match location {
        Location::Position {
            filename,
            line,
            column,
        } => StackFrame {
            function: function.map(str::to_owned),
            filename: Some(filename.to_owned()),
            lineno: coerce_number(line),
            colno: column.and_then(coerce_number),
            in_app: Some(true),
        },
        Location::Token(token) => StackFrame {
            function: function.map(str::to_owned),
            in_app: (token != NATIVE_LOCATION).then_some(true),
            ..Default::default()
        },
    };

    Some(frame)
}

/// Where a frame points: a source position, or a bare marker like `native`.
#[derive(Debug, PartialEq, Eq)]
enum Location<'a> {
    Position {
        filename: &'a str,
        line: &'a str,
        column: Option<&'a str>,
    },
    Token(&'a str),
}

fn is_separator_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= SEPARATOR_MIN_DASHES && trimmed.bytes().all(|b| b == b'-')
}

/// Split `foo (bar.js:1:2)` into the function name and its location.
///
/// The rightmost `(` preceded by whitespace whose remainder is a valid location opens
/// the location, so `eval (eval at f (a.js:1:2), <anonymous>:1:1)` is named
/// `eval (eval at f`. Without any such parenthesis the whole text is the location.
fn split_function(rest: &str) -> Option<(Option<&str>, Location<'_>)> {
    for (open, _) in rest.rmatch_indices('(') {
        let head = &rest[..open];
        let function = head.trim_end();
        if function.is_empty() || function.len() == head.len() {
            continue;
        }

        if let Some(location) = parse_location(&rest[open + 1..]) {
            return Some((Some(function), location));
        }
    }

    parse_location(rest).map(|location| (None, location))
}

/// The first `file:line[:column]` wins and anything after it is ignored, so trailing
/// text and nested eval locations do not leak into the filename. Otherwise the text up
/// to the first `)` is a bare token.
fn parse_location(location: &str) -> Option<Location<'_>> {
    if let Some(position) = first_position(location) {
        return Some(position);
    }

    let token = location.split(')').next().unwrap_or_default();
    (!token.is_empty()).then_some(Location::Token(token))
}

fn first_position(location: &str) -> Option<Location<'_>> {
    for (colon, _) in location.match_indices(':') {
        if colon == 0 {
            continue;
        }

        let line = leading_digits(&location[colon + 1..]);
        if line.is_empty() {
            continue;
        }

        let after_line = &location[colon + 1 + line.len()..];
        let column = after_line
            .strip_prefix(':')
            .map(leading_digits)
            .filter(|column| !column.is_empty());

        return Some(Location::Position {
            filename: &location[..colon],
            line,
            column,
        });
    }

    None
}

fn leading_digits(s: &str) -> &str {
    let end = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    &s[..end]
}

/// Line and column numbers are 1-based, so zero is as good as missing. Numbers that do
/// not fit in a `u64` are dropped too.
fn coerce_number(digits: &str) -> Option<u64> {
    digits.parse::<u64>().ok().filter(|n| *n > 0)
}
