//! Raw balanced-text capture.
//!
//! At-rule preludes and unparsed pseudo-class arguments are collected as
//! flat text first and parsed by the specialized grammars afterwards. The
//! handler tracks bracket depth so embedded groups stay intact.

use crate::parser::{Outcome, ParseContext, Step, TokenHandler};
use crate::tokenizer::Event;
use corvus_shared::errors::{CssResult, ErrorKind};

/// Where the capture stops
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawStop {
    /// An unconsumed `{` or `;` at depth zero; the terminator is replayed
    BlockOrSemicolon,
    /// The matching `)`; the parenthesis is consumed
    CloseParen,
}

pub struct RawHandler {
    stop: RawStop,
    text: String,
    depth: u32,
}

impl RawHandler {
    pub fn until_block_or_semicolon() -> Self {
        Self::new(RawStop::BlockOrSemicolon)
    }

    pub fn until_close_paren() -> Self {
        Self::new(RawStop::CloseParen)
    }

    fn new(stop: RawStop) -> Self {
        Self {
            stop,
            text: String::new(),
            depth: 0,
        }
    }

    fn push_space(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with(' ') {
            self.text.push(' ');
        }
    }

    fn finish(&mut self) -> Outcome {
        let text = std::mem::take(&mut self.text);
        Outcome::Raw(text.trim_end().to_string())
    }
}

impl TokenHandler for RawHandler {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn event(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<Step> {
        match event {
            Event::Word(word) => self.text.push_str(word),
            Event::Character(';') if self.depth == 0 && self.stop == RawStop::BlockOrSemicolon => {
                return Ok(Step::PopReplay(self.finish()));
            }
            Event::Character(c) => self.text.push(*c),
            Event::Separator(_) => self.push_space(),
            Event::Comment(_) => {}
            Event::Quoted { value, quote } => {
                self.text.push(*quote);
                for c in value.chars() {
                    if c == *quote || c == '\\' {
                        self.text.push('\\');
                    }
                    self.text.push(c);
                }
                self.text.push(*quote);
            }
            Event::Escaped(c) => self.text.push(*c),
            Event::LeftParen => {
                self.depth += 1;
                self.text.push('(');
            }
            Event::RightParen => {
                if self.depth == 0 {
                    return match self.stop {
                        RawStop::CloseParen => Ok(Step::Pop(self.finish())),
                        RawStop::BlockOrSemicolon => {
                            Err(cx.error(ErrorKind::UnmatchedBracket, "unexpected ')'"))
                        }
                    };
                }
                self.depth -= 1;
                self.text.push(')');
            }
            Event::LeftBracket => {
                self.depth += 1;
                self.text.push('[');
            }
            Event::RightBracket => {
                if self.depth == 0 {
                    return Err(cx.error(ErrorKind::UnmatchedBracket, "unexpected ']'"));
                }
                self.depth -= 1;
                self.text.push(']');
            }
            Event::LeftCurly => {
                if self.depth == 0 && self.stop == RawStop::BlockOrSemicolon {
                    return Ok(Step::PopReplay(self.finish()));
                }
                self.depth += 1;
                self.text.push('{');
            }
            Event::RightCurly => {
                if self.depth == 0 {
                    return Err(cx.error(ErrorKind::UnmatchedBracket, "unexpected '}'"));
                }
                self.depth -= 1;
                self.text.push('}');
            }
            Event::EndOfStream => {
                return match self.stop {
                    // a prelude may legitimately end the input
                    RawStop::BlockOrSemicolon => Ok(Step::PopReplay(self.finish())),
                    RawStop::CloseParen => {
                        Err(cx.error(ErrorKind::UnexpectedEof, "unterminated group"))
                    }
                };
            }
        }
        Ok(Step::Stay)
    }
}
