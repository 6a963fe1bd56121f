//! Boolean conditions for `@media` and `@supports` preludes.
//!
//! Both at-rules share one condition tree: `and`/`or`/`not` combinations
//! over leaf predicates (a media type, a parenthesized media feature, or a
//! parenthesized `property: value` support check). Serialization must keep
//! a space on both sides of the keywords even when minified; `a and(b)` is
//! not valid CSS.

use corvus_shared::errors::{CssError, CssResult, ErrorKind};
use lazy_static::lazy_static;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

lazy_static! {
    /// Media feature names from mediaqueries-4/5. Used to downgrade
    /// unknown features to warnings instead of hard errors.
    pub static ref MEDIA_FEATURES: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for name in [
            "width", "height", "aspect-ratio", "orientation", "resolution", "scan", "grid", "update",
            "overflow-block", "overflow-inline", "color", "color-index", "color-gamut", "monochrome",
            "dynamic-range", "inverted-colors", "pointer", "hover", "any-pointer", "any-hover",
            "prefers-color-scheme", "prefers-contrast", "prefers-reduced-motion", "prefers-reduced-data",
            "prefers-reduced-transparency", "forced-colors", "display-mode", "scripting", "video-dynamic-range",
            "device-width", "device-height", "device-aspect-ratio",
        ] {
            s.insert(name);
        }
        s
    };
}

pub fn is_known_media_feature(name: &str) -> bool {
    let name = name.strip_prefix("min-").or_else(|| name.strip_prefix("max-")).unwrap_or(name);
    MEDIA_FEATURES.contains(name)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BooleanCondition {
    And(Vec<BooleanCondition>),
    Or(Vec<BooleanCondition>),
    Not(Box<BooleanCondition>),
    /// A bare media type, optionally prefixed with `only`
    MediaType { only: bool, name: String },
    /// A parenthesized media feature, `(name)` or `(name: value)`
    MediaFeature {
        name: String,
        value: Option<String>,
    },
    /// A parenthesized `property: value` check inside `@supports`
    SupportsDeclaration {
        property: String,
        value: String,
    },
}

impl BooleanCondition {
    /// Leaf predicates are self-delimiting; `and`/`or` chains and `not`
    /// need parentheses when nested inside another combination
    fn needs_parens(&self) -> bool {
        matches!(
            self,
            BooleanCondition::And(_) | BooleanCondition::Or(_) | BooleanCondition::Not(_)
        )
    }

    fn write_css(&self, out: &mut String, minified: bool) {
        match self {
            BooleanCondition::And(items) => self.write_chain(out, items, "and", minified),
            BooleanCondition::Or(items) => self.write_chain(out, items, "or", minified),
            BooleanCondition::Not(inner) => {
                out.push_str("not ");
                if inner.needs_parens() {
                    out.push('(');
                    inner.write_css(out, minified);
                    out.push(')');
                } else {
                    inner.write_css(out, minified);
                }
            }
            BooleanCondition::MediaType { only, name } => {
                if *only {
                    out.push_str("only ");
                }
                out.push_str(name);
            }
            BooleanCondition::MediaFeature { name, value } => {
                out.push('(');
                out.push_str(name);
                if let Some(value) = value {
                    out.push(':');
                    if !minified {
                        out.push(' ');
                    }
                    out.push_str(value);
                }
                out.push(')');
            }
            BooleanCondition::SupportsDeclaration { property, value } => {
                out.push('(');
                out.push_str(property);
                out.push(':');
                if !minified {
                    out.push(' ');
                }
                out.push_str(value);
                out.push(')');
            }
        }
    }

    fn write_chain(&self, out: &mut String, items: &[BooleanCondition], keyword: &str, minified: bool) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                // the keyword keeps its spaces even when minified
                out.push(' ');
                out.push_str(keyword);
                out.push(' ');
            }
            if item.needs_parens() {
                out.push('(');
                item.write_css(out, minified);
                out.push(')');
            } else {
                item.write_css(out, minified);
            }
        }
    }

    pub fn css_text(&self) -> String {
        let mut out = String::new();
        self.write_css(&mut out, false);
        out
    }

    pub fn minified_text(&self) -> String {
        let mut out = String::new();
        self.write_css(&mut out, true);
        out
    }
}

impl fmt::Display for BooleanCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css_text())
    }
}

/// Parse a comma-separated media query list, e.g.
/// `screen and (min-width: 600px), print`
pub fn parse_media_query_list(input: &str) -> CssResult<Vec<BooleanCondition>> {
    log::trace!("parse_media_query_list");

    let mut queries = Vec::new();
    for query in split_top_level_commas(input) {
        let query = query.trim();
        if query.is_empty() {
            return Err(CssError::new(ErrorKind::UnexpectedToken, "empty media query"));
        }
        queries.push(Cursor::new(query).media_query()?);
    }
    if queries.is_empty() {
        return Err(CssError::new(ErrorKind::UnexpectedEof, "empty media query list"));
    }
    Ok(queries)
}

/// Parse an `@supports` prelude, e.g.
/// `(display: grid) and (not (display: inline-grid))`
pub fn parse_supports_condition(input: &str) -> CssResult<BooleanCondition> {
    log::trace!("parse_supports_condition");

    let mut cursor = Cursor::new(input);
    let condition = cursor.supports_condition()?;
    cursor.skip_whitespace();
    if !cursor.at_end() {
        return Err(cursor.error("trailing input after supports condition"));
    }
    Ok(condition)
}

fn split_top_level_commas(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Character-level cursor for the condition grammars. Plain recursive
/// descent; condition nesting depth is small in practice.
struct Cursor<'i> {
    input: &'i str,
    pos: usize,
}

impl<'i> Cursor<'i> {
    fn new(input: &'i str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'i str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn error(&self, message: &str) -> CssError {
        CssError::new(ErrorKind::UnexpectedToken, message)
    }

    /// Case-insensitive keyword followed by a delimiter
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let rest = self.rest();
        if rest.len() >= keyword.len() && rest[..keyword.len()].eq_ignore_ascii_case(keyword) {
            let after = rest[keyword.len()..].chars().next();
            if after.is_none() || matches!(after, Some(c) if c.is_whitespace() || c == '(') {
                self.pos += keyword.len();
                return true;
            }
        }
        false
    }

    fn ident(&mut self) -> CssResult<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            self.bump();
        }
        if self.pos == start {
            return Err(self.error("expected an identifier"));
        }
        Ok(self.input[start..self.pos].to_ascii_lowercase())
    }

    /// Balanced text up to the closing parenthesis of the current group
    fn balanced_until_close(&mut self) -> CssResult<&'i str> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '(' => depth += 1,
                ')' => {
                    if depth == 0 {
                        return Ok(self.input[start..self.pos].trim());
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.bump();
        }
        Err(CssError::new(ErrorKind::UnmatchedBracket, "unclosed parenthesis in condition"))
    }

    fn expect(&mut self, expected: char) -> CssResult<()> {
        if self.bump() == Some(expected) {
            Ok(())
        } else {
            Err(self.error("unexpected character in condition"))
        }
    }

    // ---- media queries ----

    fn media_query(&mut self) -> CssResult<BooleanCondition> {
        self.skip_whitespace();

        let negated = self.eat_keyword("not");
        self.skip_whitespace();
        let only = !negated && self.eat_keyword("only");
        self.skip_whitespace();

        let mut parts = Vec::new();
        if self.peek() == Some('(') {
            if only {
                return Err(self.error("'only' requires a media type"));
            }
            parts.push(self.media_in_parens()?);
        } else {
            let name = self.ident()?;
            parts.push(BooleanCondition::MediaType { only, name });
        }

        loop {
            self.skip_whitespace();
            if self.at_end() {
                break;
            }
            if !self.eat_keyword("and") {
                return Err(self.error("expected 'and' between media conditions"));
            }
            self.skip_whitespace();
            parts.push(self.media_in_parens()?);
        }

        let query = if parts.len() == 1 {
            parts.remove(0)
        } else {
            BooleanCondition::And(parts)
        };
        Ok(if negated {
            BooleanCondition::Not(Box::new(query))
        } else {
            query
        })
    }

    fn media_in_parens(&mut self) -> CssResult<BooleanCondition> {
        self.expect('(')?;
        self.skip_whitespace();

        if self.eat_keyword("not") {
            self.skip_whitespace();
            let inner = self.media_in_parens()?;
            self.skip_whitespace();
            self.expect(')')?;
            return Ok(BooleanCondition::Not(Box::new(inner)));
        }

        if self.peek() == Some('(') {
            // nested boolean group
            let mut parts = vec![self.media_in_parens()?];
            let mut keyword: Option<&str> = None;
            loop {
                self.skip_whitespace();
                if self.peek() == Some(')') {
                    break;
                }
                let next = if self.eat_keyword("and") {
                    "and"
                } else if self.eat_keyword("or") {
                    "or"
                } else {
                    return Err(self.error("expected 'and' or 'or' in media condition"));
                };
                if keyword.is_some_and(|k| k != next) {
                    return Err(self.error("cannot mix 'and' and 'or' without parentheses"));
                }
                keyword = Some(next);
                self.skip_whitespace();
                parts.push(self.media_in_parens()?);
            }
            self.expect(')')?;
            return Ok(match keyword {
                Some("or") => BooleanCondition::Or(parts),
                Some(_) => BooleanCondition::And(parts),
                None => parts.remove(0),
            });
        }

        let name = self.ident()?;
        self.skip_whitespace();
        let value = if self.peek() == Some(':') {
            self.bump();
            Some(self.balanced_until_close()?.to_string())
        } else {
            None
        };
        self.expect(')')?;
        Ok(BooleanCondition::MediaFeature { name, value })
    }

    // ---- @supports ----

    fn supports_condition(&mut self) -> CssResult<BooleanCondition> {
        self.skip_whitespace();

        if self.eat_keyword("not") {
            self.skip_whitespace();
            let inner = self.supports_in_parens()?;
            return Ok(BooleanCondition::Not(Box::new(inner)));
        }

        let mut parts = vec![self.supports_in_parens()?];
        let mut keyword: Option<&str> = None;
        loop {
            self.skip_whitespace();
            if self.at_end() || self.peek() == Some(')') {
                break;
            }
            let next = if self.eat_keyword("and") {
                "and"
            } else if self.eat_keyword("or") {
                "or"
            } else {
                return Err(self.error("expected 'and' or 'or' in supports condition"));
            };
            if keyword.is_some_and(|k| k != next) {
                return Err(self.error("cannot mix 'and' and 'or' without parentheses"));
            }
            keyword = Some(next);
            self.skip_whitespace();
            parts.push(self.supports_in_parens()?);
        }

        Ok(match keyword {
            Some("or") => BooleanCondition::Or(parts),
            Some(_) => BooleanCondition::And(parts),
            None => parts.remove(0),
        })
    }

    fn supports_in_parens(&mut self) -> CssResult<BooleanCondition> {
        self.expect('(')?;
        self.skip_whitespace();

        let checkpoint = self.pos;
        if self.eat_keyword("not") || matches!(self.peek(), Some('(')) {
            // reparse from the checkpoint so the inner grammar sees 'not'
            self.pos = checkpoint;
            let inner = self.supports_condition()?;
            self.skip_whitespace();
            self.expect(')')?;
            return Ok(inner);
        }

        let property = self.ident()?;
        self.skip_whitespace();
        self.expect(':')?;
        let value = self.balanced_until_close()?.to_string();
        if value.is_empty() {
            return Err(self.error("empty value in supports declaration"));
        }
        self.expect(')')?;
        Ok(BooleanCondition::SupportsDeclaration { property, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_media_type() {
        let queries = parse_media_query_list("screen").unwrap();
        assert_eq!(
            queries,
            vec![BooleanCondition::MediaType {
                only: false,
                name: "screen".to_string()
            }]
        );
    }

    #[test]
    fn media_type_with_features_round_trips() {
        let queries = parse_media_query_list("only screen and (min-width: 600px)").unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].css_text(), "only screen and (min-width: 600px)");
        assert_eq!(queries[0].minified_text(), "only screen and (min-width:600px)");
    }

    #[test]
    fn negated_query_keeps_keyword_spacing() {
        let queries = parse_media_query_list("not print").unwrap();
        assert_eq!(queries[0].css_text(), "not print");
        assert_eq!(queries[0].minified_text(), "not print");
    }

    #[test]
    fn comma_separates_queries() {
        let queries = parse_media_query_list("screen and (color), print").unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0].css_text(), "screen and (color)");
        assert_eq!(queries[1].css_text(), "print");
    }

    #[test]
    fn supports_condition_round_trips() {
        let condition = parse_supports_condition("(display: grid) and (gap: 1rem)").unwrap();
        assert_eq!(condition.css_text(), "(display: grid) and (gap: 1rem)");
    }

    #[test]
    fn supports_not_and_nesting() {
        let condition = parse_supports_condition("(display: flex) and (not (display: grid))").unwrap();
        assert_eq!(
            condition.css_text(),
            "(display: flex) and (not (display: grid))"
        );
        // the serialized form must parse back to the same tree
        let reparsed = parse_supports_condition(&condition.css_text()).unwrap();
        assert_eq!(reparsed, condition);
    }

    #[test]
    fn mixed_and_or_without_parens_is_rejected() {
        assert!(parse_supports_condition("(a: b) and (c: d) or (e: f)").is_err());
    }

    #[test]
    fn known_feature_lookup_strips_min_max() {
        assert!(is_known_media_feature("min-width"));
        assert!(is_known_media_feature("hover"));
        assert!(!is_known_media_feature("frobnication"));
    }
}
