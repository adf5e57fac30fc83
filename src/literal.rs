//! Literal rendering for generated statements.
//!
//! String quoting, number formatting, date rendering and the lexical
//! predicates the selector syntax relies on. Function sources are inspected
//! with oxc so the dumper knows which construction artifacts evaluating a
//! source text will leave behind.

use chrono::Datelike;
use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::Expression;
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;
use std::collections::HashSet;

lazy_static! {
    static ref IDENTIFIER_NAME_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    static ref ARRAY_INDEX_RE: Regex = Regex::new(r"^(?:0|[1-9][0-9]*)$").unwrap();

    /// Words that may follow a `.` but can never be a variable name.
    pub static ref RESERVED_WORDS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for word in [
            "break", "case", "catch", "class", "const", "continue", "debugger", "default",
            "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
            "function", "if", "import", "in", "instanceof", "new", "null", "return", "super",
            "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
            "implements", "interface", "let", "package", "private", "protected", "public",
            "static", "yield",
        ] {
            s.insert(word);
        }
        s
    };

    /// Global names whose values can never change.
    pub static ref IMMUTABLE_GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        s.insert("undefined");
        s.insert("NaN");
        s.insert("Infinity");
        s
    };
}

/// True for names usable after a `.` in a member expression.
pub fn is_identifier_name(s: &str) -> bool {
    IDENTIFIER_NAME_RE.is_match(s)
}

/// True for names usable as a variable.
pub fn is_identifier(s: &str) -> bool {
    is_identifier_name(s) && !RESERVED_WORDS.contains(s)
}

/// True for canonical array index strings (`"0"`, `"17"`, not `"01"`).
pub fn is_array_index(s: &str) -> bool {
    ARRAY_INDEX_RE.is_match(s) && s.parse::<u32>().map_or(false, |n| n != u32::MAX)
}

/// Renders `s` as a single-quoted string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            '\u{2028}' | '\u{2029}' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Undoes the escapes `quote` (and hand-written selectors) may contain.
pub fn unescape(s: &str) -> Option<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next()? {
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            't' => result.push('\t'),
            'b' => result.push('\u{8}'),
            'v' => result.push('\u{b}'),
            'f' => result.push('\u{c}'),
            '0' => result.push('\0'),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                result.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return None;
                }
                result.push(char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            other => result.push(other),
        }
    }

    Some(result)
}

/// Formats a number the way the interpreter's `String(n)` would.
pub fn number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let abs = n.abs();
    if (1e-6..1e21).contains(&abs) {
        return format!("{}", n);
    }
    let s = format!("{:e}", n);
    match s.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => s,
    }
}

/// ISO-8601 rendering of a time value, as `Date.prototype.toISOString` gives.
/// Years outside 0..=9999 use the six-digit signed form `Date` parses.
pub fn iso_date(ms: f64) -> Option<String> {
    if !ms.is_finite() {
        return None;
    }
    let date = chrono::DateTime::from_timestamp_millis(ms as i64)?;
    let year = date.year();
    let year = if (0..=9999).contains(&year) {
        format!("{:04}", year)
    } else {
        format!("{:+07}", year)
    };
    Some(format!("{}{}", year, date.format("-%m-%dT%H:%M:%S%.3fZ")))
}

/// What evaluating a function source text produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionShape {
    /// Name bound by a named function expression.
    pub name: Option<String>,
    pub params: usize,
    /// Arrow functions get no `.prototype` object.
    pub arrow: bool,
}

/// Parses `source` as a single expression and describes the function it
/// evaluates to. `None` if the text is not a function expression.
pub fn function_shape(source: &str) -> Option<FunctionShape> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::default()).parse_expression();

    match ret {
        Ok(Expression::FunctionExpression(func)) => Some(FunctionShape {
            name: func.id.as_ref().map(|id| id.name.to_string()),
            params: func.params.items.len(),
            arrow: false,
        }),
        Ok(Expression::ArrowFunctionExpression(arrow)) => Some(FunctionShape {
            name: None,
            params: arrow.params.items.len(),
            arrow: true,
        }),
        _ => None,
    }
}
