//! Selectors: paths naming one binding, starting from a variable.
//!
//! Syntax: `root.name`, `root[3]`, `root['any key']`, `root{proto}`,
//! `root{owner}`, with `^` accepted as shorthand for `{proto}`. The canonical
//! form written by `Display` always uses `{proto}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::literal;

// ═══════════════════════════════════════════════════════════════════════════════
// PARTS
// ═══════════════════════════════════════════════════════════════════════════════

const IDENTIFIER_BADNESS: u32 = 1;
const INDEX_BADNESS: u32 = 2;
const QUOTED_BADNESS: u32 = 4;
const SPECIAL_BADNESS: u32 = 8;

/// One step of a selector.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Part {
    /// A variable name or property key.
    Name(String),
    /// The `[[Prototype]]` slot.
    Prototype,
    /// The owner slot.
    Owner,
}

impl Part {
    pub fn name(name: impl Into<String>) -> Self {
        Part::Name(name.into())
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Part::Name(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_special(&self) -> bool {
        !matches!(self, Part::Name(_))
    }

    pub fn badness(&self) -> u32 {
        match self {
            Part::Name(name) if literal::is_identifier_name(name) => IDENTIFIER_BADNESS,
            Part::Name(name) if literal::is_array_index(name) => INDEX_BADNESS,
            Part::Name(_) => QUOTED_BADNESS,
            Part::Prototype | Part::Owner => SPECIAL_BADNESS,
        }
    }

    /// The member-access suffix for a property key: `.a`, `[0]` or `['a b']`.
    fn accessor(key: &str) -> String {
        if literal::is_identifier_name(key) {
            format!(".{}", key)
        } else if literal::is_array_index(key) {
            format!("[{}]", key)
        } else {
            format!("[{}]", literal::quote(key))
        }
    }

    /// Expression reading this part of the object `base` evaluates to.
    pub fn read_expr(&self, base: &str) -> String {
        match self {
            Part::Name(key) => format!("{}{}", member_base(base), Part::accessor(key)),
            Part::Prototype => format!("Object.getPrototypeOf({})", base),
            Part::Owner => format!("Object.getOwnerOf({})", base),
        }
    }

    /// Expression storing `value` into this part of `base`.
    pub fn write_expr(&self, base: &str, value: &str) -> String {
        match self {
            Part::Name(key) => format!("{}{} = {}", member_base(base), Part::accessor(key), value),
            Part::Prototype => format!("Object.setPrototypeOf({}, {})", base, value),
            Part::Owner => format!("Object.setOwnerOf({}, {})", base, value),
        }
    }
}

/// `new 'X'` binds looser than member access.
fn member_base(base: &str) -> String {
    if base.starts_with("new ") {
        format!("({})", base)
    } else {
        base.to_string()
    }
}

impl From<String> for Part {
    fn from(s: String) -> Self {
        match s.as_str() {
            "{proto}" | "^" => Part::Prototype,
            "{owner}" => Part::Owner,
            _ => Part::Name(s),
        }
    }
}

impl From<&str> for Part {
    fn from(s: &str) -> Self {
        Part::from(s.to_string())
    }
}

impl From<Part> for String {
    fn from(part: Part) -> Self {
        part.to_string()
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Name(name) => write!(f, "{}", name),
            Part::Prototype => write!(f, "{{proto}}"),
            Part::Owner => write!(f, "{{owner}}"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTOR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("selector must begin with a variable name, not {0:?}")]
    BadRoot(String),
    #[error("bad selector {input:?} at offset {offset}: {message}")]
    Syntax {
        input: String,
        offset: usize,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Selector {
    parts: Vec<Part>,
}

impl Selector {
    pub fn new(parts: Vec<Part>) -> Result<Self, SelectorError> {
        match parts.first() {
            None => Err(SelectorError::Empty),
            Some(Part::Name(root)) if literal::is_identifier(root) => Ok(Selector { parts }),
            Some(other) => Err(SelectorError::BadRoot(other.to_string())),
        }
    }

    /// Selector for a bare variable.
    pub fn variable(name: &str) -> Result<Self, SelectorError> {
        Selector::new(vec![Part::name(name)])
    }

    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        SelectorParser::new(input).parse()
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_variable(&self) -> bool {
        self.parts.len() == 1
    }

    pub fn root(&self) -> &str {
        match &self.parts[0] {
            Part::Name(name) => name,
            _ => unreachable!("selector root is always a name"),
        }
    }

    pub fn last(&self) -> &Part {
        &self.parts[self.parts.len() - 1]
    }

    /// A new selector one part longer.
    pub fn child(&self, part: Part) -> Selector {
        let mut parts = self.parts.clone();
        parts.push(part);
        Selector { parts }
    }

    pub fn parent(&self) -> Option<Selector> {
        if self.is_variable() {
            return None;
        }
        Some(Selector {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
        })
    }

    pub fn badness(&self) -> u32 {
        self.parts.iter().map(Part::badness).sum()
    }

    /// Expression evaluating to the value this selector names.
    pub fn to_expr(&self) -> String {
        let mut expr = self.root().to_string();
        for part in &self.parts[1..] {
            expr = part.read_expr(&expr);
        }
        expr
    }

    /// Expression storing `value` into the binding this selector names.
    pub fn to_set_expr(&self, value: &str) -> String {
        match self.parent() {
            None => format!("{} = {}", self.root(), value),
            Some(parent) => self.last().write_expr(&parent.to_expr(), value),
        }
    }

    pub fn to_set_statement(&self, value: &str) -> String {
        format!("{};", self.to_set_expr(value))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root())?;
        for part in &self.parts[1..] {
            match part {
                Part::Name(key) => write!(f, "{}", Part::accessor(key))?,
                special => write!(f, "{}", special)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Selector::parse(s)
    }
}

impl Serialize for Selector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Selector::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

struct SelectorParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn new(input: &'a str) -> Self {
        SelectorParser { input, pos: 0 }
    }

    fn error(&self, message: &str) -> SelectorError {
        SelectorError::Syntax {
            input: self.input.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn eat(&mut self, s: &str) -> bool {
        if self.rest().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn word(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|&(i, c)| {
                !(c.is_ascii_alphanumeric() || c == '_' || c == '$') || (i == 0 && c.is_ascii_digit())
            })
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    fn digits(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn string(&mut self, quote: char) -> Result<String, SelectorError> {
        let start = self.pos;
        let mut escaped = false;
        for (i, c) in self.rest().char_indices() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                let raw = &self.input[start..start + i];
                self.pos = start + i + c.len_utf8();
                return literal::unescape(raw).ok_or_else(|| self.error("bad escape sequence"));
            }
        }
        Err(self.error("unterminated string"))
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        if self.input.is_empty() {
            return Err(SelectorError::Empty);
        }
        let root = self
            .word()
            .ok_or_else(|| self.error("expected a variable name"))?;
        if !literal::is_identifier(root) {
            return Err(SelectorError::BadRoot(root.to_string()));
        }
        let mut parts = vec![Part::name(root)];

        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    let name = self
                        .word()
                        .ok_or_else(|| self.error("expected a property name after '.'"))?;
                    parts.push(Part::name(name));
                }
                '[' => {
                    self.pos += 1;
                    let key = match self.peek() {
                        Some(q @ ('\'' | '"')) => {
                            self.pos += 1;
                            self.string(q)?
                        }
                        Some(d) if d.is_ascii_digit() => {
                            let digits = self.digits();
                            if !literal::is_array_index(digits) {
                                return Err(self.error("not a canonical array index"));
                            }
                            digits.to_string()
                        }
                        _ => return Err(self.error("expected an index or a quoted key")),
                    };
                    if !self.eat("]") {
                        return Err(self.error("expected ']'"));
                    }
                    parts.push(Part::Name(key));
                }
                '{' => {
                    if self.eat("{proto}") {
                        parts.push(Part::Prototype);
                    } else if self.eat("{owner}") {
                        parts.push(Part::Owner);
                    } else {
                        return Err(self.error("expected {proto} or {owner}"));
                    }
                }
                '^' => {
                    self.pos += 1;
                    parts.push(Part::Prototype);
                }
                _ => return Err(self.error("unexpected character")),
            }
        }

        Selector::new(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_print_canonical() {
        let cases = [
            ("foo", "foo"),
            ("foo.bar", "foo.bar"),
            ("foo[0]", "foo[0]"),
            ("foo['0']", "foo[0]"),
            ("foo['01']", "foo['01']"),
            ("foo[\"a b\"]", "foo['a b']"),
            ("foo['bar']", "foo.bar"),
            ("foo{proto}.x", "foo{proto}.x"),
            ("foo^.x", "foo{proto}.x"),
            ("foo{owner}", "foo{owner}"),
            ("foo['it\\'s']", "foo['it\\'s']"),
        ];
        for (input, canonical) in cases {
            let selector = Selector::parse(input).unwrap();
            assert_eq!(selector.to_string(), canonical, "printing {}", input);
            let reparsed = Selector::parse(canonical).unwrap();
            assert_eq!(reparsed, selector, "reparsing {}", canonical);
        }
    }

    #[test]
    fn test_parts() {
        let selector = Selector::parse("$.users[3]{proto}['x-y']").unwrap();
        assert_eq!(
            selector.parts(),
            &[
                Part::name("$"),
                Part::name("users"),
                Part::name("3"),
                Part::Prototype,
                Part::name("x-y"),
            ]
        );
    }

    #[test]
    fn test_malformed_selectors() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert!(matches!(Selector::parse("if.x"), Err(SelectorError::BadRoot(_))));
        assert!(matches!(Selector::parse("1abc"), Err(SelectorError::Syntax { .. })));
        assert!(matches!(Selector::parse("foo."), Err(SelectorError::Syntax { .. })));
        assert!(matches!(Selector::parse("foo[01]"), Err(SelectorError::Syntax { .. })));
        assert!(matches!(Selector::parse("foo['x"), Err(SelectorError::Syntax { .. })));
        assert!(matches!(Selector::parse("foo{bar}"), Err(SelectorError::Syntax { .. })));
        assert!(matches!(Selector::parse("foo bar"), Err(SelectorError::Syntax { .. })));
        assert!(matches!(
            Selector::new(vec![Part::Prototype]),
            Err(SelectorError::BadRoot(_))
        ));
    }

    #[test]
    fn test_expressions() {
        let selector = Selector::parse("a.b{proto}[1]").unwrap();
        assert_eq!(selector.to_expr(), "Object.getPrototypeOf(a.b)[1]");
        assert_eq!(
            selector.to_set_statement("42"),
            "Object.getPrototypeOf(a.b)[1] = 42;"
        );

        let proto = Selector::parse("a.b{proto}").unwrap();
        assert_eq!(proto.to_set_expr("null"), "Object.setPrototypeOf(a.b, null)");

        let owner = Selector::parse("a{owner}").unwrap();
        assert_eq!(owner.to_expr(), "Object.getOwnerOf(a)");
        assert_eq!(owner.to_set_expr("$.root"), "Object.setOwnerOf(a, $.root)");

        let var = Selector::parse("x").unwrap();
        assert_eq!(var.to_set_statement("{}"), "x = {};");
    }

    #[test]
    fn test_badness_prefers_plain_names() {
        let plain = Selector::parse("a.b").unwrap();
        let index = Selector::parse("a[0]").unwrap();
        let quoted = Selector::parse("a['b c']").unwrap();
        let special = Selector::parse("a{proto}").unwrap();
        assert!(plain.badness() < index.badness());
        assert!(index.badness() < quoted.badness());
        assert!(quoted.badness() < special.badness());
    }

    #[test]
    fn test_part_serde_round_trip() {
        let parts = vec![Part::name("x"), Part::Prototype, Part::Owner];
        let json = serde_json::to_string(&parts).unwrap();
        assert_eq!(json, r#"["x","{proto}","{owner}"]"#);
        let back: Vec<Part> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, parts);
    }
}
