//! Declaration blocks: `property: value !important;` sequences plus the
//! nested rules CSS Nesting allows inside a style rule body.

use crate::parser::selector::SelectorListHandler;
use crate::parser::value::ValueHandler;
use crate::parser::{Css3Parser, Outcome, ParseContext, Step, TokenHandler};
use crate::parser::rule::AtRuleHandler;
use crate::selector::SelectorList;
use crate::sink::AtRule;
use crate::syntax;
use crate::tokenizer::Event;
use crate::unit::{LexicalKind, LexicalPool, LexicalValue, UnitId};
use corvus_shared::errors::{CssResult, ErrorKind};

/// What closes this block and which end callback it fires
enum BlockKind {
    /// A style rule body, closed with `end_rule`
    Rule,
    /// A declaration-only at-rule body, closed with `end_at_rule`
    AtRule(AtRule),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DeclStage {
    /// Collecting a property name, or deciding this is a nested rule
    Name,
    /// A value arrived, waiting for its terminator
    HaveValue,
    /// `!` seen, the next word must be `important`
    AwaitImportant,
    /// `!important` complete, only `;` or `}` may follow
    AfterImportant,
}

pub struct DeclarationListHandler {
    kind: BlockKind,
    stage: DeclStage,
    name: String,
    /// Whitespace seen since the last name fragment
    name_gap: bool,
    /// First unit of the pending value chain in the shared pool
    value: Option<UnitId>,
    important: bool,
    /// A completed nested-rule prelude waiting for its `{`
    pending_prelude: Option<SelectorList>,
}

impl DeclarationListHandler {
    pub fn for_rule() -> Self {
        Self::new(BlockKind::Rule)
    }

    pub fn for_at_rule(rule: AtRule) -> Self {
        Self::new(BlockKind::AtRule(rule))
    }

    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            stage: DeclStage::Name,
            name: String::new(),
            name_gap: false,
            value: None,
            important: false,
            pending_prelude: None,
        }
    }

    fn reset(&mut self) {
        self.stage = DeclStage::Name;
        self.name.clear();
        self.name_gap = false;
        self.value = None;
        self.important = false;
    }

    /// Emit the pending declaration through the sink
    fn flush(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        let Some(first) = self.value.take() else {
            self.reset();
            return Ok(());
        };
        let name = std::mem::take(&mut self.name);

        let mut pool = LexicalPool::new();
        let first = cx.pool.copy_chain_into(first, &mut pool);
        let value = LexicalValue::new(pool, Some(first));

        // the `syntax` descriptor of @property carries a value grammar
        if let BlockKind::AtRule(AtRule::Property(property)) = &self.kind {
            if name.eq_ignore_ascii_case("syntax") {
                if let Some(id) = value.first_unit() {
                    if let LexicalKind::QuotedString(text) = value.pool().kind(id) {
                        let chain = syntax::parse(text)
                            .map_err(|e| e.with_location(cx.location))?;
                        let property = property.clone();
                        cx.sink.syntax_descriptor(&property, &chain);
                    }
                }
            }
        }

        cx.sink.declaration(&name, value, self.important, cx.location);
        self.reset();
        Ok(())
    }

    /// Close the block and fire the matching end callback
    fn close(&mut self, cx: &mut ParseContext) -> CssResult<Step> {
        self.flush(cx)?;
        match &self.kind {
            BlockKind::Rule => cx.sink.end_rule(),
            BlockKind::AtRule(rule) => cx.sink.end_at_rule(rule),
        }
        Ok(Step::Pop(Outcome::None))
    }

    fn in_rule(&self) -> bool {
        matches!(self.kind, BlockKind::Rule)
    }

    /// `name {` with no colon is a nested rule with a type-selector prelude
    fn reinterpret_as_prelude(&mut self, cx: &mut ParseContext) -> CssResult<SelectorList> {
        let prelude = std::mem::take(&mut self.name);
        self.name_gap = false;
        Css3Parser::default()
            .parse_selector_list(&prelude)
            .map_err(|e| e.with_location(cx.location))
    }
}

impl TokenHandler for DeclarationListHandler {
    fn name(&self) -> &'static str {
        "declarations"
    }

    fn event(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<Step> {
        match event {
            Event::Comment(_) => {}
            Event::Separator(_) => {
                if !self.name.is_empty() {
                    self.name_gap = true;
                }
            }
            Event::Word(word) => match self.stage {
                DeclStage::Name => {
                    if self.name_gap {
                        self.name.push(' ');
                        self.name_gap = false;
                    }
                    self.name.push_str(word);
                }
                DeclStage::AwaitImportant => {
                    if !word.eq_ignore_ascii_case("important") {
                        return Err(cx.error(
                            ErrorKind::UnexpectedToken,
                            format!("expected 'important', found '{word}'"),
                        ));
                    }
                    self.important = true;
                    self.stage = DeclStage::AfterImportant;
                }
                _ => {
                    return Err(cx.error(
                        ErrorKind::UnexpectedToken,
                        format!("unexpected '{word}' after value"),
                    ));
                }
            },
            Event::Escaped(c) => {
                if self.stage != DeclStage::Name {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "unexpected escape"));
                }
                if self.name_gap {
                    self.name.push(' ');
                    self.name_gap = false;
                }
                self.name.push(*c);
            }
            Event::Character(':') => match self.stage {
                DeclStage::Name if !self.name.is_empty() => {
                    if self.name.contains(' ') {
                        return Err(cx.error(
                            ErrorKind::UnexpectedChar,
                            format!("malformed property name '{}'", self.name),
                        ));
                    }
                    return Ok(Step::Push(Box::new(ValueHandler::new())));
                }
                // a nested `:hover { ... }` rule
                DeclStage::Name if self.in_rule() => {
                    return Ok(Step::PushReplay(Box::new(SelectorListHandler::prelude())));
                }
                _ => {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "unexpected ':'"));
                }
            },
            Event::Character(';') => match self.stage {
                DeclStage::Name if self.name.is_empty() => {}
                DeclStage::Name => {
                    return Err(cx.error(
                        ErrorKind::UnexpectedChar,
                        format!("declaration '{}' has no value", self.name),
                    ));
                }
                DeclStage::HaveValue | DeclStage::AfterImportant => self.flush(cx)?,
                DeclStage::AwaitImportant => {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "dangling '!'"));
                }
            },
            Event::Character('!') => {
                if self.stage != DeclStage::HaveValue {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "unexpected '!'"));
                }
                self.stage = DeclStage::AwaitImportant;
            }
            Event::Character('@') => {
                if self.stage != DeclStage::Name || !self.name.is_empty() {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "unexpected '@'"));
                }
                return Ok(Step::Push(Box::new(AtRuleHandler::new())));
            }
            // unambiguous selector starts open a nested rule
            Event::Character('&' | '>' | '+' | '~' | '*' | '.' | '#')
                if self.in_rule() && self.stage == DeclStage::Name && self.name.is_empty() =>
            {
                return Ok(Step::PushReplay(Box::new(SelectorListHandler::prelude())));
            }
            Event::LeftBracket
                if self.in_rule() && self.stage == DeclStage::Name && self.name.is_empty() =>
            {
                return Ok(Step::PushReplay(Box::new(SelectorListHandler::prelude())));
            }
            Event::LeftCurly => {
                if let Some(prelude) = self.pending_prelude.take() {
                    cx.sink.start_rule(&prelude, cx.location);
                    return Ok(Step::Push(Box::new(DeclarationListHandler::for_rule())));
                }
                if self.in_rule() && self.stage == DeclStage::Name && !self.name.is_empty() {
                    let prelude = self.reinterpret_as_prelude(cx)?;
                    cx.sink.start_rule(&prelude, cx.location);
                    return Ok(Step::Push(Box::new(DeclarationListHandler::for_rule())));
                }
                return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected '{'"));
            }
            Event::RightCurly => {
                if self.stage == DeclStage::Name && !self.name.is_empty() {
                    let error = cx.error(
                        ErrorKind::UnexpectedChar,
                        format!("declaration '{}' has no value", self.name),
                    );
                    if !cx.ignore_errors {
                        return Err(error);
                    }
                    cx.sink.error(&error);
                    self.reset();
                }
                return self.close(cx);
            }
            Event::EndOfStream => {
                // unclosed blocks close implicitly at end of input
                return self.close(cx);
            }
            Event::Quoted { .. } => {
                return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected string"));
            }
            Event::Character(c) => {
                return Err(cx.error(ErrorKind::UnexpectedChar, format!("unexpected '{c}'")));
            }
            Event::LeftParen | Event::RightParen | Event::LeftBracket | Event::RightBracket => {
                return Err(cx.error(ErrorKind::UnmatchedBracket, "unexpected bracket"));
            }
        }
        Ok(Step::Stay)
    }

    fn child_done(&mut self, outcome: Outcome, cx: &mut ParseContext) -> CssResult<Step> {
        match outcome {
            Outcome::Value(first) => {
                if first.is_none() {
                    return Err(cx.error(
                        ErrorKind::UnexpectedToken,
                        format!("declaration '{}' has an empty value", self.name),
                    ));
                }
                self.value = first;
                self.stage = DeclStage::HaveValue;
                Ok(Step::Stay)
            }
            Outcome::SelectorList(list) => {
                self.pending_prelude = Some(list);
                Ok(Step::Stay)
            }
            // a nested rule or at-rule block finished
            Outcome::None => Ok(Step::Stay),
            _ => Ok(Step::Stay),
        }
    }

    fn is_recovery_point(&self) -> bool {
        true
    }

    fn recover(&mut self) {
        self.reset();
        self.pending_prelude = None;
    }
}
