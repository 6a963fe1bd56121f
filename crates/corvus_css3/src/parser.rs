//! The character-event handler machine.
//!
//! Parsing is driven by [`TokenProducer`] events delivered to a stack of
//! [`TokenHandler`]s. A handler consumes events until its construct is
//! complete, then pops with an [`Outcome`] that the parent handler receives
//! through `child_done`. Nested constructs push a child handler instead of
//! recursing, so nesting depth costs one heap frame and mid-parse recovery
//! can unwind the stack explicitly. Block-structured at-rules (`@media`,
//! `@supports`, ...) open a nested [`Manager`] with its own stack and
//! recovery state.

use crate::parser_config::ParserConfig;
use crate::selector::SelectorList;
use crate::sink::{NullSink, StyleSink};
use crate::tokenizer::{Event, TokenProducer};
use crate::unit::{LexicalPool, LexicalValue, UnitId};
use corvus_shared::errors::{CssError, CssResult, ErrorKind};
use corvus_shared::location::Location;
use std::collections::HashMap;

mod anplusb;
mod declaration;
mod raw;
mod rule;
mod selector;
mod value;

pub use anplusb::{parse_anb, parse_nth_argument};

use rule::RuleBodyHandler;
use selector::SelectorListHandler;
use value::ValueHandler;

/// Mutable parse state shared by all handlers of one parse
pub(crate) struct ParseContext<'s> {
    pub pool: LexicalPool,
    pub sink: &'s mut dyn StyleSink,
    /// Prefix to uri map built from `@namespace` rules
    pub namespaces: HashMap<String, String>,
    /// Location of the event currently being dispatched
    pub location: Location,
    pub ignore_errors: bool,
}

impl ParseContext<'_> {
    pub fn error(&self, kind: ErrorKind, message: impl Into<String>) -> CssError {
        CssError::new(kind, message).with_location(self.location)
    }
}

/// What a completed handler hands back to its parent
#[derive(Debug)]
pub(crate) enum Outcome {
    None,
    /// First unit of a chain in the shared pool
    Value(Option<UnitId>),
    SelectorList(SelectorList),
    /// A single completed condition, e.g. an attribute selector
    Condition(crate::selector::Condition),
    /// Raw balanced text, e.g. an unparsed prelude or pseudo argument
    Raw(String),
}

/// Transition returned by a handler for each event
pub(crate) enum Step {
    /// Keep consuming
    Stay,
    /// Hand subsequent events to a child handler
    Push(Box<dyn TokenHandler>),
    /// Push a child and replay the current event to it
    PushReplay(Box<dyn TokenHandler>),
    /// This construct is complete
    Pop(Outcome),
    /// Complete, and the current event belongs to the parent
    PopReplay(Outcome),
    /// Open a nested manager rooted at the given handler
    BeginManager(Box<dyn TokenHandler>),
    /// Close the current manager
    EndManager,
}

pub(crate) trait TokenHandler {
    /// Handler name for trace logging
    fn name(&self) -> &'static str;

    fn event(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<Step>;

    /// Receives the outcome of a popped child handler
    fn child_done(&mut self, outcome: Outcome, cx: &mut ParseContext) -> CssResult<Step> {
        let _ = (outcome, cx);
        Ok(Step::Stay)
    }

    /// True when error recovery may resume on this handler
    fn is_recovery_point(&self) -> bool {
        false
    }

    /// Drop any half-built construct before recovery resumes here
    fn recover(&mut self) {}
}

/// Sticky error-recovery state: skip events until a synchronization point
struct Recovery {
    depth: u32,
}

/// One handler stack plus its recovery state
struct Manager {
    stack: Vec<Box<dyn TokenHandler>>,
    recovery: Option<Recovery>,
}

impl Manager {
    fn rooted(handler: Box<dyn TokenHandler>) -> Self {
        Self {
            stack: vec![handler],
            recovery: None,
        }
    }
}

enum Action {
    Event,
    ChildDone(Outcome),
}

/// The dispatch machine: a chain of managers, innermost last
pub(crate) struct HandlerMachine {
    managers: Vec<Manager>,
    final_outcome: Outcome,
}

impl HandlerMachine {
    fn new(root: Box<dyn TokenHandler>) -> Self {
        Self {
            managers: vec![Manager::rooted(root)],
            final_outcome: Outcome::None,
        }
    }

    fn run(&mut self, producer: &mut TokenProducer, cx: &mut ParseContext) -> CssResult<()> {
        loop {
            let (event, location) = match producer.next_event() {
                Ok(Some(next)) => next,
                Ok(None) => return Ok(()),
                Err(error) => {
                    self.lex_error(error, cx)?;
                    continue;
                }
            };
            cx.location = location;
            if matches!(event, Event::EndOfStream) {
                return self.finish(cx);
            }
            self.dispatch(&event, cx)?;
        }
    }

    /// Lexical errors go through the same recovery policy as handler
    /// errors: skip input to the next synchronization point
    fn lex_error(&mut self, error: CssError, cx: &mut ParseContext) -> CssResult<()> {
        if !cx.ignore_errors {
            return Err(error);
        }
        cx.sink.error(&error);
        self.unwind_to_recovery_point();
        if let Some(manager) = self.managers.last_mut() {
            manager.recovery = Some(Recovery { depth: 0 });
        }
        Ok(())
    }

    fn dispatch(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<()> {
        if self.skip_for_recovery(event) {
            return Ok(());
        }
        match self.deliver(event, cx) {
            Ok(()) => Ok(()),
            Err(error) => self.handle_error(error, event, cx),
        }
    }

    /// Returns true when the event was consumed by recovery skipping
    fn skip_for_recovery(&mut self, event: &Event) -> bool {
        let Some(manager) = self.managers.last_mut() else {
            return true;
        };
        let Some(recovery) = manager.recovery.as_mut() else {
            return false;
        };

        match event {
            Event::LeftParen | Event::LeftBracket | Event::LeftCurly => recovery.depth += 1,
            Event::RightParen | Event::RightBracket => {
                recovery.depth = recovery.depth.saturating_sub(1);
            }
            Event::RightCurly => {
                if recovery.depth > 1 {
                    recovery.depth -= 1;
                } else if recovery.depth == 1 {
                    // the skipped construct's block is now closed
                    manager.recovery = None;
                } else {
                    // the closing brace belongs to the enclosing construct
                    manager.recovery = None;
                    return false;
                }
            }
            Event::Character(';') if recovery.depth == 0 => {
                manager.recovery = None;
            }
            Event::EndOfStream => {
                manager.recovery = None;
                return false;
            }
            _ => {}
        }
        true
    }

    fn handle_error(&mut self, error: CssError, event: &Event, cx: &mut ParseContext) -> CssResult<()> {
        if !cx.ignore_errors {
            return Err(error);
        }
        cx.sink.error(&error);
        self.unwind_to_recovery_point();

        match event {
            // a semicolon is itself the synchronization point
            Event::Character(';') => Ok(()),
            // a closing brace may close the resumed handler's own block
            Event::RightCurly => {
                if let Err(error) = self.deliver(event, cx) {
                    cx.sink.error(&error);
                }
                Ok(())
            }
            _ => {
                let depth = match event {
                    Event::LeftParen | Event::LeftBracket | Event::LeftCurly => 1,
                    _ => 0,
                };
                if let Some(manager) = self.managers.last_mut() {
                    manager.recovery = Some(Recovery { depth });
                }
                Ok(())
            }
        }
    }

    /// Pop handlers down to the nearest recovery point, keeping the root,
    /// and let the resumed handler drop its half-built construct
    fn unwind_to_recovery_point(&mut self) {
        let Some(manager) = self.managers.last_mut() else {
            return;
        };
        while manager.stack.len() > 1
            && !manager.stack.last().is_some_and(|h| h.is_recovery_point())
        {
            manager.stack.pop();
        }
        if let Some(handler) = manager.stack.last_mut() {
            handler.recover();
        }
    }

    fn deliver(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<()> {
        let mut action = Action::Event;
        let mut replay_pending = false;

        loop {
            let step = {
                let manager = self
                    .managers
                    .last_mut()
                    .ok_or_else(|| cx.error(ErrorKind::UnexpectedToken, "no active handler"))?;
                let handler = manager
                    .stack
                    .last_mut()
                    .ok_or_else(|| cx.error(ErrorKind::UnexpectedToken, "handler stack exhausted"))?;
                match action {
                    Action::Event => {
                        log::trace!("event {:?} -> {}", event, handler.name());
                        handler.event(event, cx)?
                    }
                    Action::ChildDone(outcome) => handler.child_done(outcome, cx)?,
                }
            };
            action = Action::Event;

            match step {
                Step::Stay => {
                    if replay_pending {
                        replay_pending = false;
                        continue;
                    }
                    return Ok(());
                }
                Step::Push(handler) => {
                    self.push(handler);
                    if replay_pending {
                        replay_pending = false;
                        continue;
                    }
                    return Ok(());
                }
                Step::PushReplay(handler) => {
                    self.push(handler);
                    continue;
                }
                Step::Pop(outcome) => {
                    if self.pop() {
                        self.final_outcome = outcome;
                        return Ok(());
                    }
                    action = Action::ChildDone(outcome);
                }
                Step::PopReplay(outcome) => {
                    if self.pop() {
                        self.final_outcome = outcome;
                        return Ok(());
                    }
                    replay_pending = true;
                    action = Action::ChildDone(outcome);
                }
                Step::BeginManager(handler) => {
                    self.managers.push(Manager::rooted(handler));
                    if replay_pending {
                        replay_pending = false;
                        continue;
                    }
                    return Ok(());
                }
                Step::EndManager => {
                    self.managers.pop();
                    if self.managers.is_empty() {
                        return Ok(());
                    }
                    action = Action::ChildDone(Outcome::None);
                }
            }
        }
    }

    fn push(&mut self, handler: Box<dyn TokenHandler>) {
        if let Some(manager) = self.managers.last_mut() {
            manager.stack.push(handler);
        }
    }

    /// Pops the top handler; true when the outermost stack ran empty
    fn pop(&mut self) -> bool {
        if let Some(manager) = self.managers.last_mut() {
            manager.stack.pop();
            return self.managers.len() == 1 && self.managers[0].stack.is_empty();
        }
        true
    }

    /// Unwind every handler by replaying end-of-stream until all managers
    /// collapse. Each delivery must retire at least one handler.
    fn finish(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        loop {
            if self.managers.len() <= 1 && self.managers.first().map_or(true, |m| m.stack.is_empty()) {
                return Ok(());
            }
            let before = self.handler_count();
            if let Some(manager) = self.managers.last_mut() {
                manager.recovery = None;
            }
            match self.deliver(&Event::EndOfStream, cx) {
                Ok(()) => {}
                Err(error) => self.handle_error(error, &Event::EndOfStream, cx)?,
            }
            if self.handler_count() >= before {
                return Err(cx.error(ErrorKind::UnexpectedEof, "unexpected end of stylesheet"));
            }
        }
    }

    fn handler_count(&self) -> usize {
        self.managers.iter().map(|m| m.stack.len()).sum()
    }
}

/// The parser entry points
pub struct Css3Parser {
    pub config: ParserConfig,
}

impl Default for Css3Parser {
    fn default() -> Self {
        Self {
            config: ParserConfig::default(),
        }
    }
}

impl Css3Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    fn producer<'i>(&self, input: &'i str) -> TokenProducer<'i> {
        if self.config.allow_high_controls {
            TokenProducer::new(input).with_high_controls(true)
        } else {
            TokenProducer::new(input)
        }
    }

    /// Parse a full stylesheet, reporting constructs through the sink
    pub fn parse_stylesheet(&self, input: &str, sink: &mut dyn StyleSink) -> CssResult<()> {
        log::trace!("parse_stylesheet ({} bytes)", input.len());

        let mut producer = self.producer(input);
        let mut cx = ParseContext {
            pool: LexicalPool::new(),
            sink,
            namespaces: HashMap::new(),
            location: Location::default(),
            ignore_errors: self.config.ignore_errors,
        };
        let mut machine = HandlerMachine::new(Box::new(RuleBodyHandler::top_level()));
        machine.run(&mut producer, &mut cx)
    }

    /// Parse one property value into a self-contained lexical chain
    pub fn parse_value(&self, input: &str) -> CssResult<LexicalValue> {
        log::trace!("parse_value: {input}");

        let mut sink = NullSink;
        let mut producer = self.producer(input);
        let mut cx = ParseContext {
            pool: LexicalPool::new(),
            sink: &mut sink,
            namespaces: HashMap::new(),
            location: Location::default(),
            ignore_errors: false,
        };
        let mut machine = HandlerMachine::new(Box::new(ValueHandler::new()));
        machine.run(&mut producer, &mut cx)?;

        match machine.final_outcome {
            Outcome::Value(Some(first)) => {
                let mut pool = LexicalPool::new();
                let first = cx.pool.copy_chain_into(first, &mut pool);
                Ok(LexicalValue::new(pool, Some(first)))
            }
            Outcome::Value(None) => Ok(LexicalValue::empty()),
            _ => Err(CssError::new(ErrorKind::UnexpectedEof, "empty value")),
        }
    }

    /// Parse a selector list, e.g. a rule prelude
    pub fn parse_selector_list(&self, input: &str) -> CssResult<SelectorList> {
        log::trace!("parse_selector_list: {input}");

        let mut sink = NullSink;
        let mut producer = self.producer(input);
        let mut cx = ParseContext {
            pool: LexicalPool::new(),
            sink: &mut sink,
            namespaces: HashMap::new(),
            location: Location::default(),
            ignore_errors: false,
        };
        let mut machine = HandlerMachine::new(Box::new(SelectorListHandler::standalone()));
        machine.run(&mut producer, &mut cx)?;

        match machine.final_outcome {
            Outcome::SelectorList(list) if !list.is_empty() => Ok(list),
            _ => Err(CssError::new(ErrorKind::UnexpectedEof, "empty selector list")),
        }
    }
}
