//! Selector and condition trees, with CSS Nesting substitution.
//!
//! A selector is either a simple selector (universal or type, optionally
//! conditioned), or two selectors joined by a combinator. Conditions cover
//! classes, ids, attributes, pseudo-classes/elements, positional (`nth-*`)
//! arguments, nested selector lists (`:is()`, `:not()`, ...) and the
//! nesting marker `&`. Trees are immutable once built; the nesting
//! substitution returns a new tree.

use serde::Serialize;
use std::fmt;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Combinator {
    Descendant,
    Child,
    NextSibling,
    SubsequentSibling,
    Column,
}

impl Combinator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Combinator::Descendant => " ",
            Combinator::Child => ">",
            Combinator::NextSibling => "+",
            Combinator::SubsequentSibling => "~",
            Combinator::Column => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttributeOp {
    Equals,
    Includes,
    DashMatch,
    Prefix,
    Suffix,
    Substring,
}

impl AttributeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeOp::Equals => "=",
            AttributeOp::Includes => "~=",
            AttributeOp::DashMatch => "|=",
            AttributeOp::Prefix => "^=",
            AttributeOp::Suffix => "$=",
            AttributeOp::Substring => "*=",
        }
    }
}

/// Case-sensitivity flag on an attribute condition (`[a=b i]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum CaseFlag {
    #[default]
    Default,
    Insensitive,
    Sensitive,
}

/// The An+B linear index of `:nth-child()`-family pseudo-classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnB {
    pub step: i32,
    pub offset: i32,
    /// Parsed from the `even`/`odd` keyword rather than digits
    pub keyword: bool,
}

impl AnB {
    pub fn new(step: i32, offset: i32) -> Self {
        Self {
            step,
            offset,
            keyword: false,
        }
    }
}

impl fmt::Display for AnB {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keyword {
            return match (self.step, self.offset) {
                (2, 0) => f.write_str("even"),
                _ => f.write_str("odd"),
            };
        }
        match self.step {
            0 => write!(f, "{}", self.offset),
            1 => f.write_str("n"),
            -1 => f.write_str("-n"),
            n => write!(f, "{n}n"),
        }?;
        if self.step != 0 && self.offset != 0 {
            if self.offset > 0 {
                write!(f, "+{}", self.offset)?;
            } else {
                write!(f, "{}", self.offset)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Condition {
    Class(String),
    Id(String),
    Attribute {
        name: String,
        op: Option<AttributeOp>,
        value: Option<String>,
        case: CaseFlag,
    },
    PseudoClass {
        name: String,
        argument: Option<String>,
    },
    PseudoElement {
        name: String,
        argument: Option<String>,
    },
    Lang(String),
    /// `:nth-child()`-family, with an optional `of <selector-list>` clause
    Positional {
        name: String,
        anb: AnB,
        of: Option<SelectorList>,
    },
    /// A pseudo-class holding a nested selector list (`:is`, `:not`, ...)
    SelectorArgument {
        name: String,
        list: SelectorList,
    },
    /// The CSS Nesting marker `&`
    Nesting,
    And(Vec<Condition>),
}

impl Condition {
    pub fn contains_nesting(&self) -> bool {
        match self {
            Condition::Nesting => true,
            Condition::And(conditions) => conditions.iter().any(Condition::contains_nesting),
            Condition::SelectorArgument { list, .. } => {
                list.selectors.iter().any(Selector::contains_nesting)
            }
            Condition::Positional { of: Some(list), .. } => {
                list.selectors.iter().any(Selector::contains_nesting)
            }
            _ => false,
        }
    }

    fn replace_nesting(&self, base: &SelectorList) -> Condition {
        match self {
            Condition::Nesting => Condition::SelectorArgument {
                name: "is".to_string(),
                list: base.clone(),
            },
            Condition::And(conditions) => {
                Condition::And(conditions.iter().map(|c| c.replace_nesting(base)).collect())
            }
            Condition::SelectorArgument { name, list } => Condition::SelectorArgument {
                name: name.clone(),
                list: list.replace_nesting_inner(base),
            },
            Condition::Positional { name, anb, of: Some(list) } => Condition::Positional {
                name: name.clone(),
                anb: *anb,
                of: Some(list.replace_nesting_inner(base)),
            },
            other => other.clone(),
        }
    }

    fn write_css(&self, out: &mut String, minified: bool) {
        match self {
            Condition::Class(name) => {
                out.push('.');
                out.push_str(name);
            }
            Condition::Id(name) => {
                out.push('#');
                out.push_str(name);
            }
            Condition::Attribute { name, op, value, case } => {
                out.push('[');
                out.push_str(name);
                if let (Some(op), Some(value)) = (op, value) {
                    out.push_str(op.as_str());
                    out.push('"');
                    out.push_str(value);
                    out.push('"');
                    match case {
                        CaseFlag::Default => {}
                        CaseFlag::Insensitive => out.push_str(" i"),
                        CaseFlag::Sensitive => out.push_str(" s"),
                    }
                }
                out.push(']');
            }
            Condition::PseudoClass { name, argument } => {
                out.push(':');
                out.push_str(name);
                if let Some(argument) = argument {
                    out.push('(');
                    out.push_str(argument);
                    out.push(')');
                }
            }
            Condition::PseudoElement { name, argument } => {
                out.push_str("::");
                out.push_str(name);
                if let Some(argument) = argument {
                    out.push('(');
                    out.push_str(argument);
                    out.push(')');
                }
            }
            Condition::Lang(tags) => {
                out.push_str(":lang(");
                out.push_str(tags);
                out.push(')');
            }
            Condition::Positional { name, anb, of } => {
                out.push(':');
                out.push_str(name);
                out.push('(');
                // fmt::Write on String never fails
                let _ = write!(out, "{anb}");
                if let Some(list) = of {
                    out.push_str(" of ");
                    list.write_css(out, minified);
                }
                out.push(')');
            }
            Condition::SelectorArgument { name, list } => {
                out.push(':');
                out.push_str(name);
                out.push('(');
                list.write_css(out, minified);
                out.push(')');
            }
            Condition::Nesting => out.push('&'),
            Condition::And(conditions) => {
                for condition in conditions {
                    condition.write_css(out, minified);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Selector {
    Universal,
    Type {
        prefix: Option<String>,
        name: String,
    },
    Conditional {
        base: Box<Selector>,
        condition: Condition,
    },
    Combined {
        combinator: Combinator,
        ancestor: Box<Selector>,
        simple: Box<Selector>,
    },
}

impl Selector {
    pub fn with_condition(self, condition: Condition) -> Selector {
        match self {
            // collapse stacked conditions into one AND
            Selector::Conditional { base, condition: existing } => {
                let merged = match existing {
                    Condition::And(mut conditions) => {
                        conditions.push(condition);
                        Condition::And(conditions)
                    }
                    other => Condition::And(vec![other, condition]),
                };
                Selector::Conditional {
                    base,
                    condition: merged,
                }
            }
            base => Selector::Conditional {
                base: Box::new(base),
                condition,
            },
        }
    }

    pub fn contains_nesting(&self) -> bool {
        match self {
            Selector::Universal | Selector::Type { .. } => false,
            Selector::Conditional { base, condition } => {
                base.contains_nesting() || condition.contains_nesting()
            }
            Selector::Combined { ancestor, simple, .. } => {
                ancestor.contains_nesting() || simple.contains_nesting()
            }
        }
    }

    /// Substitute the nesting marker with `:is(<base>)`, or prepend an
    /// implicit descendant of the base when no marker occurs
    pub fn replace_nesting(&self, base: &SelectorList) -> Selector {
        if !self.contains_nesting() {
            return Selector::Combined {
                combinator: Combinator::Descendant,
                ancestor: Box::new(Selector::Conditional {
                    base: Box::new(Selector::Universal),
                    condition: Condition::SelectorArgument {
                        name: "is".to_string(),
                        list: base.clone(),
                    },
                }),
                simple: Box::new(self.clone()),
            };
        }
        self.replace_nesting_deep(base)
    }

    fn replace_nesting_deep(&self, base: &SelectorList) -> Selector {
        match self {
            Selector::Universal | Selector::Type { .. } => self.clone(),
            Selector::Conditional { base: inner, condition } => Selector::Conditional {
                base: inner.clone(),
                condition: condition.replace_nesting(base),
            },
            Selector::Combined { combinator, ancestor, simple } => Selector::Combined {
                combinator: *combinator,
                ancestor: Box::new(ancestor.replace_nesting_deep(base)),
                simple: Box::new(simple.replace_nesting_deep(base)),
            },
        }
    }

    fn write_css(&self, out: &mut String, minified: bool) {
        match self {
            Selector::Universal => out.push('*'),
            Selector::Type { prefix, name } => {
                if let Some(prefix) = prefix {
                    out.push_str(prefix);
                    out.push('|');
                }
                out.push_str(name);
            }
            Selector::Conditional { base, condition } => {
                // a conditioned universal serializes as the bare condition
                if !matches!(**base, Selector::Universal) {
                    base.write_css(out, minified);
                }
                condition.write_css(out, minified);
            }
            Selector::Combined { combinator, ancestor, simple } => {
                ancestor.write_css(out, minified);
                match combinator {
                    Combinator::Descendant => out.push(' '),
                    other => {
                        if minified {
                            out.push_str(other.as_str());
                        } else {
                            out.push(' ');
                            out.push_str(other.as_str());
                            out.push(' ');
                        }
                    }
                }
                simple.write_css(out, minified);
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

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css_text())
    }
}

/// An ordered, duplicate-free selector list
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SelectorList {
    pub selectors: Vec<Selector>,
}

impl SelectorList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append, dropping structural duplicates
    pub fn push(&mut self, selector: Selector) {
        if !self.selectors.contains(&selector) {
            self.selectors.push(selector);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    /// Substitute the nesting marker in every member against `base`
    pub fn replace_nesting(&self, base: &SelectorList) -> SelectorList {
        let mut list = SelectorList::new();
        for selector in &self.selectors {
            list.push(selector.replace_nesting(base));
        }
        list
    }

    /// Substitution inside nested argument lists: members without a marker
    /// stay untouched rather than gaining an implicit descendant
    fn replace_nesting_inner(&self, base: &SelectorList) -> SelectorList {
        let mut list = SelectorList::new();
        for selector in &self.selectors {
            if selector.contains_nesting() {
                list.push(selector.replace_nesting_deep(base));
            } else {
                list.push(selector.clone());
            }
        }
        list
    }

    fn write_css(&self, out: &mut String, minified: bool) {
        for (i, selector) in self.selectors.iter().enumerate() {
            if i > 0 {
                out.push(',');
                if !minified {
                    out.push(' ');
                }
            }
            selector.write_css(out, minified);
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

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_sel(name: &str) -> Selector {
        Selector::Type {
            prefix: None,
            name: name.to_string(),
        }
    }

    fn base_list() -> SelectorList {
        let mut list = SelectorList::new();
        list.push(type_sel("div"));
        list.push(type_sel("span"));
        list
    }

    #[test]
    fn nesting_marker_becomes_is_wrapper() {
        // &.foo against (div, span)
        let selector = Selector::Conditional {
            base: Box::new(Selector::Universal),
            condition: Condition::And(vec![Condition::Nesting, Condition::Class("foo".to_string())]),
        };
        let replaced = selector.replace_nesting(&base_list());
        assert_eq!(replaced.css_text(), ":is(div, span).foo");
    }

    #[test]
    fn selector_without_marker_becomes_descendant() {
        let selector = Selector::Conditional {
            base: Box::new(Selector::Universal),
            condition: Condition::Class("foo".to_string()),
        };
        let replaced = selector.replace_nesting(&base_list());
        assert_eq!(replaced.css_text(), ":is(div, span) .foo");
    }

    #[test]
    fn substitution_leaves_the_original_untouched() {
        let selector = Selector::Conditional {
            base: Box::new(Selector::Universal),
            condition: Condition::Nesting,
        };
        let _ = selector.replace_nesting(&base_list());
        assert_eq!(selector.css_text(), "&");
    }

    #[test]
    fn lists_drop_structural_duplicates() {
        let mut list = SelectorList::new();
        list.push(type_sel("div"));
        list.push(type_sel("div"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn combinators_serialize_with_and_without_spaces() {
        let selector = Selector::Combined {
            combinator: Combinator::Child,
            ancestor: Box::new(type_sel("ul")),
            simple: Box::new(type_sel("li")),
        };
        assert_eq!(selector.css_text(), "ul > li");
        assert_eq!(selector.minified_text(), "ul>li");
    }

    #[test]
    fn anb_serialization() {
        assert_eq!(AnB::new(2, 1).to_string(), "2n+1");
        assert_eq!(AnB::new(-1, 6).to_string(), "-n+6");
        assert_eq!(AnB::new(0, 4).to_string(), "4");
        assert_eq!(AnB::new(2, 0).to_string(), "2n");
        assert_eq!(
            AnB {
                step: 2,
                offset: 0,
                keyword: true
            }
            .to_string(),
            "even"
        );
    }

    #[test]
    fn positional_condition_serializes_the_of_clause() {
        let condition = Condition::Positional {
            name: "nth-child".to_string(),
            anb: AnB::new(2, 1),
            of: Some(base_list()),
        };
        let selector = Selector::Conditional {
            base: Box::new(Selector::Universal),
            condition,
        };
        assert_eq!(selector.css_text(), ":nth-child(2n+1 of div, span)");
    }
}
