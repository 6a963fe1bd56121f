//! Selector list assembly from token events.
//!
//! Compound selectors grow condition by condition; whitespace and
//! combinator characters fold the compound into the combined-selector
//! spine. Pseudo-class arguments are captured as raw text and routed to
//! the matching micro-grammar (`An+B`, nested selector lists, `:lang()`).

use crate::parser::anplusb::parse_nth_argument;
use crate::parser::raw::RawHandler;
use crate::parser::{Css3Parser, Outcome, ParseContext, Step, TokenHandler};
use crate::selector::{
    AttributeOp, CaseFlag, Combinator, Condition, Selector, SelectorList,
};
use crate::tokenizer::Event;
use corvus_shared::errors::{CssResult, ErrorKind};

/// What the next committed word means
#[derive(Debug, Clone, Copy, PartialEq)]
enum Expect {
    Type,
    Class,
    Id,
    Pseudo { element: bool },
}

/// Separation seen since the last compound token
#[derive(Debug, Clone, Copy, PartialEq)]
enum Gap {
    None,
    Space,
    Comb(Combinator),
}

/// How the list terminates
#[derive(Debug, Clone, Copy, PartialEq)]
enum ListEnd {
    /// End of input pops the list (independent parses)
    Stream,
    /// An unconsumed `{` pops the list (rule preludes)
    Block,
}

pub struct SelectorListHandler {
    list: SelectorList,
    /// Folded combined-selector spine left of the current compound
    ancestor: Option<Selector>,
    /// Combinator between `ancestor` and the current compound
    combinator: Combinator,
    current: Option<Selector>,
    buffer: String,
    expect: Expect,
    gap: Gap,
    /// A completed pseudo name that may still take `(...)` arguments
    pending_pseudo: Option<(String, bool)>,
    /// A namespace prefix waiting for its local name
    ns_prefix: Option<String>,
    end: ListEnd,
}

impl SelectorListHandler {
    pub fn standalone() -> Self {
        Self::new(ListEnd::Stream)
    }

    pub fn prelude() -> Self {
        Self::new(ListEnd::Block)
    }

    fn new(end: ListEnd) -> Self {
        Self {
            list: SelectorList::new(),
            ancestor: None,
            combinator: Combinator::Descendant,
            current: None,
            buffer: String::new(),
            expect: Expect::Type,
            gap: Gap::None,
            pending_pseudo: None,
            ns_prefix: None,
            end,
        }
    }

    /// Fold the current compound into the spine when separation demands it
    fn maybe_fold(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        if self.gap == Gap::None {
            return Ok(());
        }
        let gap = std::mem::replace(&mut self.gap, Gap::None);
        let Some(current) = self.current.take() else {
            if matches!(gap, Gap::Comb(_)) && self.ancestor.is_none() {
                return Err(cx.error(ErrorKind::UnexpectedToken, "combinator without a selector"));
            }
            // leading whitespace
            if let Gap::Comb(_) = gap {
                return Err(cx.error(ErrorKind::UnexpectedToken, "doubled combinator"));
            }
            return Ok(());
        };
        self.ancestor = Some(match self.ancestor.take() {
            None => current,
            Some(ancestor) => Selector::Combined {
                combinator: self.combinator,
                ancestor: Box::new(ancestor),
                simple: Box::new(current),
            },
        });
        self.combinator = match gap {
            Gap::Comb(c) => c,
            _ => Combinator::Descendant,
        };
        Ok(())
    }

    fn attach_condition(&mut self, cx: &mut ParseContext, condition: Condition) -> CssResult<()> {
        self.maybe_fold(cx)?;
        let base = self.current.take().unwrap_or(Selector::Universal);
        self.current = Some(base.with_condition(condition));
        Ok(())
    }

    fn commit_word(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let word = std::mem::take(&mut self.buffer);
        match self.expect {
            Expect::Type => {
                self.maybe_fold(cx)?;
                if self.current.is_some() && self.ns_prefix.is_none() {
                    return Err(cx.error(
                        ErrorKind::UnexpectedToken,
                        format!("unexpected type selector '{word}'"),
                    ));
                }
                let prefix = self.ns_prefix.take();
                if let Some(prefix) = &prefix {
                    if prefix != "*" && !cx.namespaces.contains_key(prefix) {
                        return Err(cx.error(
                            ErrorKind::UnknownNamespacePrefix,
                            format!("undeclared namespace prefix '{prefix}'"),
                        ));
                    }
                }
                self.current = Some(Selector::Type {
                    prefix,
                    name: word.to_ascii_lowercase(),
                });
            }
            Expect::Class => self.attach_condition(cx, Condition::Class(word))?,
            Expect::Id => self.attach_condition(cx, Condition::Id(word))?,
            Expect::Pseudo { element } => {
                self.pending_pseudo = Some((word.to_ascii_lowercase(), element));
            }
        }
        self.expect = Expect::Type;
        Ok(())
    }

    /// An argumentless pseudo reached a boundary
    fn finalize_pseudo(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        let Some((name, element)) = self.pending_pseudo.take() else {
            return Ok(());
        };
        // single-colon legacy pseudo-elements keep their css2 spelling
        let element = element
            || matches!(name.as_str(), "before" | "after" | "first-line" | "first-letter");
        let condition = if element {
            Condition::PseudoElement {
                name,
                argument: None,
            }
        } else {
            Condition::PseudoClass {
                name,
                argument: None,
            }
        };
        self.attach_condition(cx, condition)
    }

    /// Boundary shared by every structural event
    fn settle(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        self.commit_word(cx)?;
        self.finalize_pseudo(cx)
    }

    fn finish_selector(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        self.settle(cx)?;
        if matches!(self.gap, Gap::Comb(_)) {
            return Err(cx.error(ErrorKind::UnexpectedToken, "dangling combinator"));
        }
        let current = self.current.take();
        let ancestor = self.ancestor.take();
        self.gap = Gap::None;
        self.ns_prefix = None;

        let selector = match (ancestor, current) {
            (None, Some(sel)) => sel,
            (Some(anc), Some(sel)) => Selector::Combined {
                combinator: self.combinator,
                ancestor: Box::new(anc),
                simple: Box::new(sel),
            },
            (Some(_), None) => {
                return Err(cx.error(ErrorKind::UnexpectedToken, "dangling combinator"));
            }
            (None, None) => {
                return Err(cx.error(ErrorKind::UnexpectedToken, "empty selector"));
            }
        };
        self.combinator = Combinator::Descendant;
        self.list.push(selector);
        Ok(())
    }

    fn set_combinator(&mut self, cx: &mut ParseContext, combinator: Combinator) -> CssResult<()> {
        self.settle(cx)?;
        if self.current.is_none() && self.ancestor.is_none() {
            return Err(cx.error(ErrorKind::UnexpectedToken, "combinator without a selector"));
        }
        if matches!(self.gap, Gap::Comb(_)) {
            return Err(cx.error(ErrorKind::UnexpectedToken, "doubled combinator"));
        }
        self.gap = Gap::Comb(combinator);
        Ok(())
    }

    /// Route a captured pseudo argument to its micro-grammar
    fn apply_pseudo_argument(&mut self, cx: &mut ParseContext, text: String) -> CssResult<Step> {
        let Some((name, element)) = self.pending_pseudo.take() else {
            return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected '(' in selector"));
        };

        let condition = if element {
            Condition::PseudoElement {
                name,
                argument: Some(text),
            }
        } else {
            match name.as_str() {
                "is" | "not" | "where" | "has" | "matches" | "any" => {
                    let list = Css3Parser::default()
                        .parse_selector_list(&text)
                        .map_err(|e| e.with_location(cx.location))?;
                    Condition::SelectorArgument { name, list }
                }
                "nth-child" | "nth-last-child" | "nth-of-type" | "nth-last-of-type" => {
                    let (anb, of) =
                        parse_nth_argument(&text).map_err(|e| e.with_location(cx.location))?;
                    Condition::Positional { name, anb, of }
                }
                "lang" => Condition::Lang(text),
                _ => Condition::PseudoClass {
                    name,
                    argument: Some(text),
                },
            }
        };
        self.attach_condition(cx, condition)?;
        Ok(Step::Stay)
    }
}

impl TokenHandler for SelectorListHandler {
    fn name(&self) -> &'static str {
        "selector_list"
    }

    fn event(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<Step> {
        match event {
            Event::Word(word) => {
                if self.buffer.is_empty() && self.pending_pseudo.is_some() {
                    self.finalize_pseudo(cx)?;
                }
                self.buffer.push_str(word);
            }
            Event::Escaped(c) => self.buffer.push(*c),
            Event::Comment(_) => {}
            Event::Separator(_) => {
                self.settle(cx)?;
                if self.current.is_some() && self.gap == Gap::None {
                    self.gap = Gap::Space;
                }
            }
            Event::Character('.') => {
                self.settle(cx)?;
                self.expect = Expect::Class;
            }
            Event::Character('#') => {
                self.settle(cx)?;
                self.expect = Expect::Id;
            }
            Event::Character(':') => {
                self.commit_word(cx)?;
                match self.expect {
                    // `::element`
                    Expect::Pseudo { element: false } if self.pending_pseudo.is_none() => {
                        self.expect = Expect::Pseudo { element: true };
                    }
                    _ => {
                        self.finalize_pseudo(cx)?;
                        self.expect = Expect::Pseudo { element: false };
                    }
                }
            }
            Event::Character('&') => {
                self.settle(cx)?;
                self.attach_condition(cx, Condition::Nesting)?;
            }
            Event::Character('*') => {
                self.settle(cx)?;
                if let Some(prefix) = self.ns_prefix.take() {
                    if prefix != "*" && !cx.namespaces.contains_key(&prefix) {
                        return Err(cx.error(
                            ErrorKind::UnknownNamespacePrefix,
                            format!("undeclared namespace prefix '{prefix}'"),
                        ));
                    }
                    self.current = Some(Selector::Type {
                        prefix: Some(prefix),
                        name: "*".to_string(),
                    });
                } else {
                    self.maybe_fold(cx)?;
                    if self.current.is_some() {
                        return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected '*' in compound"));
                    }
                    self.current = Some(Selector::Universal);
                }
            }
            Event::Character('|') => {
                self.commit_word(cx)?;
                if self.ns_prefix.is_some() {
                    // second pipe: this is the column combinator
                    self.current = self.ns_prefix.take().map(|name| Selector::Type {
                        prefix: None,
                        name,
                    });
                    self.set_combinator(cx, Combinator::Column)?;
                } else {
                    match self.current.take() {
                        Some(Selector::Type { prefix: None, name }) => {
                            self.ns_prefix = Some(name);
                        }
                        Some(Selector::Universal) => {
                            self.ns_prefix = Some("*".to_string());
                        }
                        other => {
                            self.current = other;
                            return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected '|' in selector"));
                        }
                    }
                }
            }
            Event::Character('>') => self.set_combinator(cx, Combinator::Child)?,
            Event::Character('+') => self.set_combinator(cx, Combinator::NextSibling)?,
            Event::Character('~') => self.set_combinator(cx, Combinator::SubsequentSibling)?,
            Event::Character(',') => self.finish_selector(cx)?,
            Event::LeftParen => {
                self.commit_word(cx)?;
                if self.pending_pseudo.is_none() {
                    return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected '(' in selector"));
                }
                return Ok(Step::Push(Box::new(RawHandler::until_close_paren())));
            }
            Event::LeftBracket => {
                self.settle(cx)?;
                return Ok(Step::Push(Box::new(AttributeHandler::new())));
            }
            Event::LeftCurly => {
                if self.end == ListEnd::Block {
                    self.finish_selector(cx)?;
                    return Ok(Step::PopReplay(Outcome::SelectorList(std::mem::take(
                        &mut self.list,
                    ))));
                }
                return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected '{' in selector"));
            }
            Event::EndOfStream => {
                if self.end == ListEnd::Stream {
                    self.finish_selector(cx)?;
                    return Ok(Step::Pop(Outcome::SelectorList(std::mem::take(&mut self.list))));
                }
                return Err(cx.error(ErrorKind::UnexpectedEof, "unterminated rule prelude"));
            }
            Event::Quoted { .. } => {
                return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected string in selector"));
            }
            Event::Character(c) => {
                return Err(cx.error(ErrorKind::UnexpectedChar, format!("unexpected '{c}' in selector")));
            }
            Event::RightParen | Event::RightBracket | Event::RightCurly => {
                return Err(cx.error(ErrorKind::UnmatchedBracket, "unmatched closing bracket in selector"));
            }
        }
        Ok(Step::Stay)
    }

    fn child_done(&mut self, outcome: Outcome, cx: &mut ParseContext) -> CssResult<Step> {
        match outcome {
            Outcome::Raw(text) => self.apply_pseudo_argument(cx, text),
            Outcome::Condition(condition) => {
                self.attach_condition(cx, condition)?;
                Ok(Step::Stay)
            }
            _ => Ok(Step::Stay),
        }
    }
}

/// `[attr]`, `[attr=value]`, `[ns|attr^="v" i]`
enum AttrStage {
    Name,
    Op,
    Value,
    Flag,
}

pub struct AttributeHandler {
    stage: AttrStage,
    name: String,
    op: Option<AttributeOp>,
    value: Option<String>,
    case: CaseFlag,
    /// A pending `~`/`^`/`$`/`*`/`|` waiting for `=`
    op_prefix: Option<char>,
}

impl AttributeHandler {
    pub fn new() -> Self {
        Self {
            stage: AttrStage::Name,
            name: String::new(),
            op: None,
            value: None,
            case: CaseFlag::Default,
            op_prefix: None,
        }
    }

    fn finish(&mut self, cx: &mut ParseContext) -> CssResult<Step> {
        if self.name.is_empty() {
            return Err(cx.error(ErrorKind::UnexpectedToken, "empty attribute selector"));
        }
        if self.op.is_some() && self.value.is_none() {
            return Err(cx.error(ErrorKind::UnexpectedToken, "attribute operator without a value"));
        }
        Ok(Step::Pop(Outcome::Condition(Condition::Attribute {
            name: std::mem::take(&mut self.name),
            op: self.op.take(),
            value: self.value.take(),
            case: self.case,
        })))
    }

    fn apply_operator(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        let op = match self.op_prefix.take() {
            None => AttributeOp::Equals,
            Some('~') => AttributeOp::Includes,
            Some('|') => AttributeOp::DashMatch,
            Some('^') => AttributeOp::Prefix,
            Some('$') => AttributeOp::Suffix,
            Some('*') => AttributeOp::Substring,
            Some(c) => {
                return Err(cx.error(ErrorKind::UnexpectedChar, format!("invalid attribute operator '{c}='")));
            }
        };
        self.op = Some(op);
        self.stage = AttrStage::Value;
        Ok(())
    }
}

impl TokenHandler for AttributeHandler {
    fn name(&self) -> &'static str {
        "attribute"
    }

    fn event(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<Step> {
        match event {
            Event::Separator(_) | Event::Comment(_) => {
                if matches!(self.stage, AttrStage::Value) && self.value.is_some() {
                    self.stage = AttrStage::Flag;
                }
            }
            Event::Word(word) => match self.stage {
                AttrStage::Name => {
                    self.name.push_str(word);
                    self.stage = AttrStage::Op;
                }
                AttrStage::Op => {
                    // a pipe followed by an ident is a namespace separator
                    if self.op_prefix.take() == Some('|') {
                        self.name.push('|');
                        self.name.push_str(word);
                    } else {
                        return Err(cx.error(
                            ErrorKind::UnexpectedToken,
                            "expected an attribute operator",
                        ));
                    }
                }
                AttrStage::Value => {
                    self.value = Some((*word).to_string());
                    self.stage = AttrStage::Flag;
                }
                AttrStage::Flag => {
                    self.case = match *word {
                        "i" | "I" => CaseFlag::Insensitive,
                        "s" | "S" => CaseFlag::Sensitive,
                        _ => {
                            return Err(cx.error(
                                ErrorKind::UnexpectedToken,
                                format!("invalid attribute flag '{word}'"),
                            ));
                        }
                    };
                }
            },
            Event::Quoted { value, .. } => {
                if !matches!(self.stage, AttrStage::Value) {
                    return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected string in attribute selector"));
                }
                self.value = Some(value.clone());
                self.stage = AttrStage::Flag;
            }
            Event::Character('=') => {
                if !matches!(self.stage, AttrStage::Op) {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "unexpected '=' in attribute selector"));
                }
                self.apply_operator(cx)?;
            }
            Event::Character(c @ ('~' | '^' | '$' | '*')) => {
                if !matches!(self.stage, AttrStage::Op) || self.op_prefix.is_some() {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "unexpected operator in attribute selector"));
                }
                self.op_prefix = Some(*c);
            }
            Event::Character('|') => {
                // either a namespaced attribute name or the |= operator
                if matches!(self.stage, AttrStage::Op) && self.op_prefix.is_none() {
                    self.op_prefix = Some('|');
                } else {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "unexpected '|' in attribute selector"));
                }
            }
            Event::Escaped(c) => match self.stage {
                AttrStage::Name => self.name.push(*c),
                AttrStage::Value => {
                    self.value.get_or_insert_with(String::new).push(*c);
                }
                _ => {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "unexpected escape in attribute selector"));
                }
            },
            Event::RightBracket => return self.finish(cx),
            Event::EndOfStream => {
                return Err(cx.error(ErrorKind::UnexpectedEof, "unterminated attribute selector"));
            }
            _ => {
                return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected token in attribute selector"));
            }
        }
        Ok(Step::Stay)
    }
}

#[cfg(test)]
mod tests {
    use crate::selector::{Combinator, Condition, Selector};
    use crate::Css3Parser;

    fn parse(input: &str) -> crate::selector::SelectorList {
        Css3Parser::default().parse_selector_list(input).unwrap()
    }

    #[test]
    fn compound_selectors() {
        let list = parse("div.foo#bar");
        assert_eq!(list.css_text(), "div.foo#bar");
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn combinators_fold_left() {
        assert_eq!(parse("ul > li a").css_text(), "ul > li a");
        assert_eq!(parse("a + b ~ c").css_text(), "a + b ~ c");
    }

    #[test]
    fn pseudo_classes_and_elements() {
        assert_eq!(parse("a:hover").css_text(), "a:hover");
        assert_eq!(parse("p::first-line").css_text(), "p::first-line");
        // css2 spelling upgrades to a pseudo-element
        let list = parse("p:before");
        assert_eq!(list.css_text(), "p::before");
    }

    #[test]
    fn nth_child_with_of_clause() {
        let list = parse("li:nth-child(2n+1 of .item)");
        assert_eq!(list.css_text(), "li:nth-child(2n+1 of .item)");
    }

    #[test]
    fn argument_pseudo_holds_a_nested_list() {
        let list = parse("div:is(.a, .b)");
        let Selector::Conditional { condition, .. } = &list.selectors[0] else {
            panic!("expected a conditional selector");
        };
        let Condition::SelectorArgument { name, list } = condition else {
            panic!("expected a selector argument");
        };
        assert_eq!(name, "is");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn attribute_selectors() {
        assert_eq!(parse("[disabled]").css_text(), "[disabled]");
        assert_eq!(parse("a[href^='https']").css_text(), "a[href^=\"https\"]");
        assert_eq!(parse("[data-x='y' i]").css_text(), "[data-x=\"y\" i]");
    }

    #[test]
    fn nesting_marker_parses_as_condition() {
        let list = parse("&.foo");
        assert!(list.selectors[0].contains_nesting());
        assert_eq!(list.css_text(), "&.foo");
    }

    #[test]
    fn selector_lists_split_on_commas() {
        let list = parse("div, span, div");
        // duplicates collapse
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn malformed_selectors_are_rejected() {
        let parser = Css3Parser::default();
        assert!(parser.parse_selector_list("div >").is_err());
        assert!(parser.parse_selector_list("> div").is_err());
        assert!(parser.parse_selector_list(",div").is_err());
        assert!(parser.parse_selector_list("[=x]").is_err());
    }

    #[test]
    fn column_combinator() {
        let list = parse("col || td");
        let Selector::Combined { combinator, .. } = &list.selectors[0] else {
            panic!("expected a combined selector");
        };
        assert_eq!(*combinator, Combinator::Column);
    }
}
