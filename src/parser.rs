// src/parser.rs
use crate::condition::Condition;
use crate::errors::{EvalError, Result};
use crate::selector::Selector;

/// Parses the next segment of `remaining`. Returns the canonical selector and
/// how many bytes of `remaining` it consumed, or `None` once only separators
/// are left.
pub fn parse_segment(remaining: &str) -> Result<Option<(Selector, usize)>> {
    let mut parser = Parser::new(remaining);
    let Some(raw) = parser.next_raw()? else {
        return Ok(None);
    };
    let selector = canonicalize(raw)?;
    Ok(Some((selector, parser.i)))
}

/// Parses a whole selector string into its segments.
pub fn parse_all(selector: &str) -> Result<Vec<Selector>> {
    let mut out = Vec::new();
    let mut rest = selector;
    while let Some((sel, consumed)) = parse_segment(rest)? {
        out.push(sel);
        rest = &rest[consumed..];
    }
    Ok(out)
}

pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// Raw text of the next segment with escapes left in place. A segment
    /// ends at a `.` outside brackets, or at a `[` opening a new index group.
    fn next_raw(&mut self) -> Result<Option<&'a str>> {
        while self.consume_char('.') {}
        let start = self.i;
        let mut depth = 0i32;
        while let Some(c) = self.peek_char() {
            match c {
                '\\' => {
                    self.advance(c);
                    if let Some(escaped) = self.peek_char() {
                        self.advance(escaped);
                    }
                    continue;
                }
                '.' if depth == 0 => break,
                '[' if depth == 0 && self.i > start => break,
                '(' | '[' => depth += 1,
                ')' | ']' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(EvalError::BracketMismatch(self.s.to_string()));
                    }
                }
                _ => {}
            }
            self.advance(c);
        }
        if depth != 0 {
            return Err(EvalError::BracketMismatch(self.s.to_string()));
        }
        if self.i == start {
            return Ok(None);
        }
        Ok(Some(&self.s[start..self.i]))
    }

    fn advance(&mut self, c: char) {
        self.i += c.len_utf8();
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }
}

fn canonicalize(raw: &str) -> Result<Selector> {
    if raw.starts_with("(?:") && raw.ends_with(')') {
        let groups = split_groups(raw)?;
        let [group] = groups.as_slice() else {
            return Err(EvalError::unexpected_args(
                "search",
                &groups,
                "search selectors take exactly one group",
            ));
        };
        let group = group.strip_prefix("?:").unwrap_or(group).to_string();
        Condition::parse(&group)?;
        return Ok(Selector::new("search", vec![group]));
    }
    if raw.starts_with('(') && raw.ends_with(')') {
        let groups = split_groups(raw)?;
        for group in &groups {
            Condition::parse(group)?;
        }
        return Ok(Selector::new("dynamic", groups));
    }
    match raw {
        "[]" => return Ok(Selector::new("append", Vec::new())),
        "[*]" => return Ok(Selector::new("all", Vec::new())),
        "[#]" => return Ok(Selector::new("len", Vec::new())),
        "[@]" => return Ok(Selector::new("type", Vec::new())),
        _ => {}
    }
    if let Some(content) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let digits = content.strip_suffix('?').unwrap_or(content);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(EvalError::InvalidIndex(content.to_string()));
        }
        return Ok(Selector::new("index", vec![content.to_string()]));
    }
    if let Some((name, inner)) = split_call(raw) {
        return Ok(Selector::new(name, split_args(inner)));
    }
    Ok(Selector::new("property", vec![raw.to_string()]))
}

/// Splits `name(inner)` when the first opening bracket closes at the very end.
fn split_call(raw: &str) -> Option<(&str, &str)> {
    let open = raw.find('(')?;
    let name = &raw[..open];
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let mut depth = 0i32;
    let mut escaped = false;
    for (pos, c) in raw[open..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' | '[' => depth += 1,
            ')' | ']' => {
                depth -= 1;
                if depth == 0 {
                    let close = open + pos;
                    return (close == raw.len() - 1).then(|| (name, &raw[open + 1..close]));
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits function arguments on top-level commas. `\,` at the top level
/// becomes a literal comma; every other escape is kept for the consumer.
pub fn split_args(inner: &str) -> Vec<String> {
    if inner.is_empty() {
        return Vec::new();
    }
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(',') if depth == 0 => current.push(','),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => args.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    args.push(current);
    args
}

/// Inner text of each top-level `( ... )` group, e.g. `(a=1)(b=2)`.
fn split_groups(raw: &str) -> Result<Vec<String>> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            '(' => {
                if depth > 0 {
                    current.push(c);
                } else {
                    current.clear();
                }
                depth += 1;
            }
            ')' => {
                depth -= 1;
                if depth == 0 {
                    groups.push(std::mem::take(&mut current));
                } else if depth < 0 {
                    return Err(EvalError::BracketMismatch(raw.to_string()));
                } else {
                    current.push(c);
                }
            }
            _ => current.push(c),
        }
    }
    if depth != 0 {
        return Err(EvalError::BracketMismatch(raw.to_string()));
    }
    Ok(groups)
}

/// Drops the backslash from every escaped character.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
