//! Rule-level handlers: stylesheet bodies, at-rules and keyframe blocks.

use crate::condition::{parse_media_query_list, parse_supports_condition};
use crate::parser::declaration::DeclarationListHandler;
use crate::parser::raw::RawHandler;
use crate::parser::selector::SelectorListHandler;
use crate::parser::{Outcome, ParseContext, Step, TokenHandler};
use crate::selector::SelectorList;
use crate::sink::AtRule;
use crate::tokenizer::Event;
use corvus_shared::errors::{CssResult, ErrorKind};

const MARGIN_BOXES: [&str; 16] = [
    "top-left-corner",
    "top-left",
    "top-center",
    "top-right",
    "top-right-corner",
    "bottom-left-corner",
    "bottom-left",
    "bottom-center",
    "bottom-right",
    "bottom-right-corner",
    "left-top",
    "left-middle",
    "left-bottom",
    "right-top",
    "right-middle",
    "right-bottom",
];

const FEATURE_MAPS: [&str; 6] = [
    "styleset",
    "swash",
    "ornaments",
    "annotation",
    "stylistic",
    "character-variant",
];

/// Where a sequence of rules lives
enum BodyKind {
    TopLevel,
    /// Inside a grouping at-rule such as `@media`
    Nested(AtRule),
}

/// Consumes a sequence of style rules and at-rules
pub struct RuleBodyHandler {
    kind: BodyKind,
    /// A completed rule prelude waiting for its `{`
    pending_prelude: Option<SelectorList>,
}

impl RuleBodyHandler {
    pub fn top_level() -> Self {
        Self {
            kind: BodyKind::TopLevel,
            pending_prelude: None,
        }
    }

    pub fn nested(rule: AtRule) -> Self {
        Self {
            kind: BodyKind::Nested(rule),
            pending_prelude: None,
        }
    }

    fn close(&mut self, cx: &mut ParseContext) -> Step {
        match &self.kind {
            BodyKind::TopLevel => Step::Pop(Outcome::None),
            BodyKind::Nested(rule) => {
                cx.sink.end_at_rule(rule);
                Step::EndManager
            }
        }
    }
}

impl TokenHandler for RuleBodyHandler {
    fn name(&self) -> &'static str {
        "rule_body"
    }

    fn event(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<Step> {
        match event {
            Event::Separator(_) | Event::Comment(_) => {}
            Event::Character(';') => {}
            Event::Character('@') => {
                return Ok(Step::Push(Box::new(AtRuleHandler::new())));
            }
            Event::Word(_)
            | Event::Escaped(_)
            | Event::LeftBracket
            | Event::Character('.' | '#' | ':' | '*' | '&' | '>' | '+' | '~' | '|') => {
                return Ok(Step::PushReplay(Box::new(SelectorListHandler::prelude())));
            }
            Event::LeftCurly => {
                let Some(prelude) = self.pending_prelude.take() else {
                    return Err(cx.error(ErrorKind::UnexpectedToken, "'{' without a selector"));
                };
                cx.sink.start_rule(&prelude, cx.location);
                return Ok(Step::Push(Box::new(DeclarationListHandler::for_rule())));
            }
            Event::RightCurly => {
                if matches!(self.kind, BodyKind::TopLevel) {
                    return Err(cx.error(ErrorKind::UnmatchedBracket, "unmatched '}'"));
                }
                return Ok(self.close(cx));
            }
            Event::EndOfStream => {
                return Ok(self.close(cx));
            }
            Event::Quoted { .. } => {
                return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected string"));
            }
            Event::Character(c) => {
                return Err(cx.error(ErrorKind::UnexpectedChar, format!("unexpected '{c}'")));
            }
            Event::LeftParen | Event::RightParen | Event::RightBracket => {
                return Err(cx.error(ErrorKind::UnmatchedBracket, "unexpected bracket"));
            }
        }
        Ok(Step::Stay)
    }

    fn child_done(&mut self, outcome: Outcome, _cx: &mut ParseContext) -> CssResult<Step> {
        if let Outcome::SelectorList(list) = outcome {
            self.pending_prelude = Some(list);
        }
        Ok(Step::Stay)
    }

    fn is_recovery_point(&self) -> bool {
        true
    }

    fn recover(&mut self) {
        self.pending_prelude = None;
    }
}

/// Parses `@name prelude` and routes to the matching body handler
pub struct AtRuleHandler {
    name: Option<String>,
    prelude: String,
}

impl AtRuleHandler {
    pub fn new() -> Self {
        Self {
            name: None,
            prelude: String::new(),
        }
    }

    /// A statement at-rule ended with `;` or end of input
    fn dispatch_statement(&mut self, cx: &mut ParseContext) -> CssResult<Step> {
        let name = self.name.take().unwrap_or_default();
        let prelude = std::mem::take(&mut self.prelude);
        let prelude = prelude.trim();

        let rule = match name.as_str() {
            "import" => {
                let (href, rest) = split_resource(prelude)
                    .ok_or_else(|| cx.error(ErrorKind::UnexpectedToken, "@import without a target"))?;
                let media = if rest.is_empty() {
                    Vec::new()
                } else {
                    parse_media_query_list(rest).map_err(|e| e.with_location(cx.location))?
                };
                AtRule::Import { href, media }
            }
            "namespace" => {
                let (prefix, uri) = match split_resource(prelude) {
                    // no prefix, just the namespace uri
                    Some((uri, "")) => (None, uri),
                    _ => {
                        let (prefix, rest) = prelude
                            .split_once(char::is_whitespace)
                            .ok_or_else(|| cx.error(ErrorKind::UnexpectedToken, "malformed @namespace"))?;
                        let (uri, rest) = split_resource(rest.trim_start())
                            .ok_or_else(|| cx.error(ErrorKind::UnexpectedToken, "malformed @namespace"))?;
                        if !rest.is_empty() {
                            return Err(cx.error(ErrorKind::UnexpectedToken, "malformed @namespace"));
                        }
                        (Some(prefix.to_string()), uri)
                    }
                };
                cx.namespaces
                    .insert(prefix.clone().unwrap_or_default(), uri.clone());
                AtRule::Namespace { prefix, uri }
            }
            "charset" => {
                let encoding = strip_quotes(prelude).ok_or_else(|| {
                    cx.error(ErrorKind::UnexpectedToken, "@charset requires a quoted encoding")
                })?;
                AtRule::Charset(encoding)
            }
            _ => {
                cx.sink
                    .warning(&format!("ignoring unknown at-rule '@{name}'"), cx.location);
                return Ok(Step::Pop(Outcome::None));
            }
        };
        cx.sink.start_at_rule(&rule, cx.location);
        cx.sink.end_at_rule(&rule);
        Ok(Step::Pop(Outcome::None))
    }

    /// A block at-rule reached its `{`
    fn dispatch_block(&mut self, cx: &mut ParseContext) -> CssResult<Step> {
        let name = self.name.take().unwrap_or_default();
        let prelude = std::mem::take(&mut self.prelude);
        let prelude = prelude.trim().to_string();

        // vendor-prefixed grouping rules map onto their standard form
        let base = name
            .strip_prefix('-')
            .and_then(|s| s.split_once('-').map(|(_, rest)| rest))
            .unwrap_or(&name)
            .to_string();

        let step = match base.as_str() {
            "media" => {
                let queries =
                    parse_media_query_list(&prelude).map_err(|e| e.with_location(cx.location))?;
                let rule = AtRule::Media(queries);
                cx.sink.start_at_rule(&rule, cx.location);
                Step::BeginManager(Box::new(RuleBodyHandler::nested(rule)))
            }
            "supports" => {
                let condition =
                    parse_supports_condition(&prelude).map_err(|e| e.with_location(cx.location))?;
                let rule = AtRule::Supports(condition);
                cx.sink.start_at_rule(&rule, cx.location);
                Step::BeginManager(Box::new(RuleBodyHandler::nested(rule)))
            }
            "keyframes" => {
                let rule = AtRule::Keyframes(prelude);
                cx.sink.start_at_rule(&rule, cx.location);
                Step::BeginManager(Box::new(KeyframesBodyHandler::new(rule)))
            }
            "font-face" => declaration_block(AtRule::FontFace, cx),
            "counter-style" => declaration_block(AtRule::CounterStyle(prelude), cx),
            "viewport" => declaration_block(AtRule::Viewport, cx),
            "property" => declaration_block(AtRule::Property(prelude), cx),
            "page" => {
                let selector = if prelude.is_empty() {
                    None
                } else {
                    Some(prelude)
                };
                declaration_block(AtRule::Page(selector), cx)
            }
            "font-feature-values" => declaration_block(AtRule::FontFeatureValues(prelude), cx),
            _ if MARGIN_BOXES.contains(&name.as_str()) => {
                declaration_block(AtRule::MarginBox(name), cx)
            }
            _ if FEATURE_MAPS.contains(&name.as_str()) => {
                declaration_block(AtRule::FeatureMap(name), cx)
            }
            _ => {
                cx.sink
                    .warning(&format!("ignoring unknown at-rule '@{name}'"), cx.location);
                Step::Push(Box::new(IgnoreBlockHandler::new()))
            }
        };
        Ok(step)
    }
}

/// Open a declaration-only at-rule body
fn declaration_block(rule: AtRule, cx: &mut ParseContext) -> Step {
    cx.sink.start_at_rule(&rule, cx.location);
    Step::Push(Box::new(DeclarationListHandler::for_at_rule(rule)))
}

impl TokenHandler for AtRuleHandler {
    fn name(&self) -> &'static str {
        "at_rule"
    }

    fn event(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<Step> {
        match event {
            Event::Comment(_) => Ok(Step::Stay),
            Event::Word(word) if self.name.is_none() => {
                self.name = Some(word.to_ascii_lowercase());
                Ok(Step::Push(Box::new(RawHandler::until_block_or_semicolon())))
            }
            // the prelude capture replays the terminator to us
            Event::LeftCurly => self.dispatch_block(cx),
            Event::Character(';') | Event::EndOfStream => self.dispatch_statement(cx),
            _ => Err(cx.error(ErrorKind::UnexpectedToken, "malformed at-rule")),
        }
    }

    fn child_done(&mut self, outcome: Outcome, _cx: &mut ParseContext) -> CssResult<Step> {
        match outcome {
            Outcome::Raw(text) => {
                self.prelude = text;
                Ok(Step::Stay)
            }
            // the at-rule body finished
            _ => Ok(Step::Pop(Outcome::None)),
        }
    }
}

/// The body of `@keyframes`: selector preludes like `0%, 50%` followed
/// by declaration blocks
pub struct KeyframesBodyHandler {
    rule: AtRule,
    prelude: String,
}

impl KeyframesBodyHandler {
    pub fn new(rule: AtRule) -> Self {
        Self {
            rule,
            prelude: String::new(),
        }
    }
}

impl TokenHandler for KeyframesBodyHandler {
    fn name(&self) -> &'static str {
        "keyframes_body"
    }

    fn event(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<Step> {
        match event {
            Event::Comment(_) => {}
            Event::Separator(_) => {
                if !self.prelude.is_empty() && !self.prelude.ends_with(' ') {
                    self.prelude.push(' ');
                }
            }
            Event::Word(word) => self.prelude.push_str(word),
            Event::Character(c @ ('%' | ',' | '.')) => {
                if *c == ',' {
                    self.prelude.push_str(", ");
                } else {
                    self.prelude.push(*c);
                }
            }
            Event::LeftCurly => {
                let selector = std::mem::take(&mut self.prelude);
                let selector = selector.trim().trim_end_matches(',').trim_end().to_string();
                if selector.is_empty() {
                    return Err(cx.error(ErrorKind::UnexpectedToken, "keyframe without a selector"));
                }
                let keyframe = AtRule::Keyframe(selector);
                cx.sink.start_at_rule(&keyframe, cx.location);
                return Ok(Step::Push(Box::new(DeclarationListHandler::for_at_rule(
                    keyframe,
                ))));
            }
            Event::RightCurly | Event::EndOfStream => {
                if !self.prelude.trim().is_empty() {
                    return Err(cx.error(ErrorKind::UnexpectedToken, "dangling keyframe selector"));
                }
                cx.sink.end_at_rule(&self.rule);
                return Ok(Step::EndManager);
            }
            _ => {
                return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected token in @keyframes"));
            }
        }
        Ok(Step::Stay)
    }

    fn is_recovery_point(&self) -> bool {
        true
    }

    fn recover(&mut self) {
        self.prelude.clear();
    }
}

/// Skips a balanced `{ ... }` block whose opener was already consumed
struct IgnoreBlockHandler {
    depth: u32,
}

impl IgnoreBlockHandler {
    fn new() -> Self {
        Self { depth: 0 }
    }
}

impl TokenHandler for IgnoreBlockHandler {
    fn name(&self) -> &'static str {
        "ignore_block"
    }

    fn event(&mut self, event: &Event, _cx: &mut ParseContext) -> CssResult<Step> {
        match event {
            Event::LeftCurly => self.depth += 1,
            Event::RightCurly => {
                if self.depth == 0 {
                    return Ok(Step::Pop(Outcome::None));
                }
                self.depth -= 1;
            }
            Event::EndOfStream => return Ok(Step::Pop(Outcome::None)),
            _ => {}
        }
        Ok(Step::Stay)
    }
}

/// Splits a leading `url(...)` or quoted string off `input`, returning
/// the unquoted resource and the remainder
fn split_resource(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    if input.len() >= 4 && input[..4].eq_ignore_ascii_case("url(") {
        let close = input.find(')')?;
        let inner = input[4..close].trim();
        let href = strip_quotes(inner).unwrap_or_else(|| inner.to_string());
        return Some((href, input[close + 1..].trim_start()));
    }
    let mut chars = input.char_indices();
    let (_, quote) = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let mut value = String::new();
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            value.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some((value, input[i + 1..].trim_start()));
        } else {
            value.push(c);
        }
    }
    None
}

/// Strips one level of matching quotes, unescaping the contents
fn strip_quotes(input: &str) -> Option<String> {
    let (value, rest) = split_resource_quoted(input)?;
    rest.is_empty().then_some(value)
}

fn split_resource_quoted(input: &str) -> Option<(String, &str)> {
    let first = input.chars().next()?;
    if first != '"' && first != '\'' {
        return None;
    }
    split_resource(input)
}
