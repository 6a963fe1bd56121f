//! The downstream consumer interface.
//!
//! A [`StyleSink`] receives ordered start/end events per stylesheet
//! construct while the parse runs. All methods default to no-ops so a
//! consumer only implements what it cares about.

use crate::condition::BooleanCondition;
use crate::selector::SelectorList;
use crate::syntax::SyntaxChain;
use crate::unit::LexicalValue;
use corvus_shared::errors::CssError;
use corvus_shared::location::Location;
use serde::Serialize;

/// A recognized at-rule, carried on the start/end events of its block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AtRule {
    Media(Vec<BooleanCondition>),
    Supports(BooleanCondition),
    Page(Option<String>),
    /// `@top-left` and friends inside `@page`
    MarginBox(String),
    FontFace,
    CounterStyle(String),
    Keyframes(String),
    /// One keyframe block inside `@keyframes`, keyed by its selector text
    Keyframe(String),
    FontFeatureValues(String),
    /// `@styleset` and friends inside `@font-feature-values`
    FeatureMap(String),
    Viewport,
    Property(String),
    Import {
        href: String,
        media: Vec<BooleanCondition>,
    },
    Namespace {
        prefix: Option<String>,
        uri: String,
    },
    Charset(String),
    Unknown {
        name: String,
        prelude: String,
    },
}

/// Callback consumer for parse results
pub trait StyleSink {
    fn start_rule(&mut self, _selectors: &SelectorList, _location: Location) {}
    fn end_rule(&mut self) {}
    fn start_at_rule(&mut self, _rule: &AtRule, _location: Location) {}
    fn end_at_rule(&mut self, _rule: &AtRule) {}
    fn declaration(&mut self, _name: &str, _value: LexicalValue, _important: bool, _location: Location) {}
    /// A `syntax` descriptor seen inside `@property`
    fn syntax_descriptor(&mut self, _property: &str, _syntax: &SyntaxChain) {}
    fn error(&mut self, _error: &CssError) {}
    fn warning(&mut self, _message: &str, _location: Location) {}
}

/// A sink that ignores everything
pub struct NullSink;

impl StyleSink for NullSink {}

/// Everything the parser reported, in order. Mainly for tests and tools.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    StartRule(SelectorList),
    EndRule,
    StartAtRule(AtRule),
    EndAtRule(AtRule),
    Declaration {
        name: String,
        value: String,
        important: bool,
    },
    SyntaxDescriptor {
        property: String,
        syntax: String,
    },
    Error(String),
    Warning(String),
}

#[derive(Debug, Default)]
pub struct CollectingSink {
    pub events: Vec<SinkEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> impl Iterator<Item = &SinkEvent> {
        self.events.iter().filter(|e| matches!(e, SinkEvent::Error(_)))
    }
}

impl StyleSink for CollectingSink {
    fn start_rule(&mut self, selectors: &SelectorList, _location: Location) {
        self.events.push(SinkEvent::StartRule(selectors.clone()));
    }

    fn end_rule(&mut self) {
        self.events.push(SinkEvent::EndRule);
    }

    fn start_at_rule(&mut self, rule: &AtRule, _location: Location) {
        self.events.push(SinkEvent::StartAtRule(rule.clone()));
    }

    fn end_at_rule(&mut self, rule: &AtRule) {
        self.events.push(SinkEvent::EndAtRule(rule.clone()));
    }

    fn declaration(&mut self, name: &str, value: LexicalValue, important: bool, _location: Location) {
        self.events.push(SinkEvent::Declaration {
            name: name.to_string(),
            value: value.css_text(),
            important,
        });
    }

    fn syntax_descriptor(&mut self, property: &str, syntax: &SyntaxChain) {
        self.events.push(SinkEvent::SyntaxDescriptor {
            property: property.to_string(),
            syntax: syntax.to_string(),
        });
    }

    fn error(&mut self, error: &CssError) {
        self.events.push(SinkEvent::Error(error.to_string()));
    }

    fn warning(&mut self, message: &str, _location: Location) {
        self.events.push(SinkEvent::Warning(message.to_string()));
    }
}
