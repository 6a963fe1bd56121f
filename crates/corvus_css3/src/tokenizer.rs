//! Reference event source for the handler state machine.
//!
//! The producer walks a stream of code points and hands out primitive
//! lexical events: words, individual characters, separators, comments,
//! quoted strings, escaped code points and bracket pairs. It performs no
//! grammar work at all; everything structural happens in the handlers.

use crate::unicode::UnicodeChar;
use corvus_shared::errors::{CssError, CssResult, ErrorKind};
use corvus_shared::location::{Location, LocationTracker};

/// A primitive lexical event, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<'i> {
    /// A run of word code points (ASCII alphanumerics, `-`, `_`, non-ASCII)
    Word(&'i str),
    /// A single non-word, non-separator code point
    Character(char),
    /// A whitespace separator, tagged by its (normalized) code point
    Separator(char),
    /// A block comment, delimiters stripped
    Comment(&'i str),
    /// A quoted string, quotes stripped and escapes resolved
    Quoted { value: String, quote: char },
    /// A code point produced by a backslash escape
    Escaped(char),
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftCurly,
    RightCurly,
    /// End of the input stream. Emitted exactly once.
    EndOfStream,
}

/// Pull-based producer over a source string. The parser drains it event by
/// event and dispatches each to the currently active token handler.
pub struct TokenProducer<'i> {
    input: &'i str,
    pos: usize,
    tracker: LocationTracker,
    /// True once [`Event::EndOfStream`] has been handed out
    finished: bool,
    /// Allow C1 control code points instead of flagging them
    allow_high_controls: bool,
}

impl<'i> TokenProducer<'i> {
    pub fn new(input: &'i str) -> Self {
        Self {
            input,
            pos: 0,
            tracker: LocationTracker::new(Location::default()),
            finished: false,
            allow_high_controls: false,
        }
    }

    pub fn with_high_controls(mut self, allow: bool) -> Self {
        self.allow_high_controls = allow;
        self
    }

    /// Location of the most recently produced event
    pub fn current_location(&self) -> Location {
        self.tracker.current()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        self.tracker.advance(c);
        Some(c)
    }

    fn is_word_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_' || (c >= UnicodeChar::FIRST_NON_ASCII && !Self::is_control(c))
    }

    fn is_control(c: char) -> bool {
        (c < ' ' && c != '\t' && c != '\n' && c != '\r' && c != UnicodeChar::FORM_FEED)
            || c == UnicodeChar::DELETE
            || (UnicodeChar::C1_START..=UnicodeChar::C1_END).contains(&c)
    }

    /// Produce the next event, or `None` once the stream is exhausted.
    /// Line endings (CR, CRLF, FF) are normalized to a single line feed
    /// separator before they reach any handler.
    pub fn next_event(&mut self) -> CssResult<Option<(Event<'i>, Location)>> {
        if self.finished {
            return Ok(None);
        }

        let loc = self.tracker.current();
        let Some(c) = self.peek() else {
            self.finished = true;
            return Ok(Some((Event::EndOfStream, loc)));
        };

        let ev = match c {
            ' ' | '\t' => {
                self.bump();
                Event::Separator(c)
            }
            '\n' => {
                self.bump();
                Event::Separator('\n')
            }
            '\r' => {
                self.bump();
                if self.peek() == Some('\n') {
                    self.bump();
                }
                Event::Separator('\n')
            }
            c if c == UnicodeChar::FORM_FEED => {
                self.bump();
                Event::Separator('\n')
            }
            '/' if self.peek_at(1) == Some('*') => return self.consume_comment().map(Some),
            '"' | '\'' => return self.consume_string().map(Some),
            '\\' => return self.consume_escape().map(Some),
            '(' => {
                self.bump();
                Event::LeftParen
            }
            ')' => {
                self.bump();
                Event::RightParen
            }
            '[' => {
                self.bump();
                Event::LeftBracket
            }
            ']' => {
                self.bump();
                Event::RightBracket
            }
            '{' => {
                self.bump();
                Event::LeftCurly
            }
            '}' => {
                self.bump();
                Event::RightCurly
            }
            c if Self::is_control(c) => {
                if self.allow_high_controls && c >= UnicodeChar::C1_START {
                    self.bump();
                    Event::Character(c)
                } else {
                    self.bump();
                    return Err(CssError::new(
                        ErrorKind::UnexpectedChar,
                        format!("control character U+{:04X} is not allowed", c as u32),
                    )
                    .with_location(loc));
                }
            }
            c if Self::is_word_char(c) => {
                let start = self.pos;
                while self.peek().map(Self::is_word_char) == Some(true) {
                    self.bump();
                }
                Event::Word(&self.input[start..self.pos])
            }
            c => {
                self.bump();
                Event::Character(c)
            }
        };

        Ok(Some((ev, loc)))
    }

    fn consume_comment(&mut self) -> CssResult<(Event<'i>, Location)> {
        let loc = self.tracker.current();
        self.bump();
        self.bump();
        let start = self.pos;

        loop {
            match self.peek() {
                None => {
                    return Err(CssError::new(ErrorKind::UnexpectedEof, "unterminated comment").with_location(loc));
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    let end = self.pos;
                    self.bump();
                    self.bump();
                    return Ok((Event::Comment(&self.input[start..end]), loc));
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn consume_string(&mut self) -> CssResult<(Event<'i>, Location)> {
        let loc = self.tracker.current();
        let quote = self.bump().unwrap_or('"');
        let mut value = String::new();

        loop {
            match self.peek() {
                None | Some('\n') | Some('\r') => {
                    return Err(CssError::new(ErrorKind::UnexpectedEof, "unterminated string").with_location(loc));
                }
                Some(c) if c == quote => {
                    self.bump();
                    return Ok((Event::Quoted { value, quote }, loc));
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        // escaped newline: line continuation
                        Some(c2) if c2 == '\n' || c2 == '\r' || c2 == UnicodeChar::FORM_FEED => {
                            self.bump();
                            if c2 == '\r' && self.peek() == Some('\n') {
                                self.bump();
                            }
                        }
                        _ => value.push(self.resolve_escape()),
                    }
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
    }

    fn consume_escape(&mut self) -> CssResult<(Event<'i>, Location)> {
        let loc = self.tracker.current();
        self.bump();
        if self.peek().is_none() {
            return Err(CssError::new(ErrorKind::UnexpectedEof, "stream ends with a backslash").with_location(loc));
        }
        Ok((Event::Escaped(self.resolve_escape()), loc))
    }

    /// Resolve the code point after a backslash: up to six hex digits
    /// (followed by an optional single whitespace), or the literal character.
    fn resolve_escape(&mut self) -> char {
        let Some(c) = self.peek() else {
            return UnicodeChar::REPLACEMENT;
        };

        if !c.is_ascii_hexdigit() {
            self.bump();
            return c;
        }

        let mut code: u32 = 0;
        let mut digits = 0;
        while digits < 6 {
            match self.peek() {
                Some(h) if h.is_ascii_hexdigit() => {
                    code = code * 16 + h.to_digit(16).unwrap_or(0);
                    digits += 1;
                    self.bump();
                }
                _ => break,
            }
        }
        // a single whitespace terminates the escape and is consumed
        match self.peek() {
            Some(' ') | Some('\t') | Some('\n') => {
                self.bump();
            }
            Some('\r') => {
                self.bump();
                if self.peek() == Some('\n') {
                    self.bump();
                }
            }
            _ => {}
        }

        char::from_u32(code).filter(|c| *c != UnicodeChar::NULL).unwrap_or(UnicodeChar::REPLACEMENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_events(input: &str) -> Vec<Event> {
        let mut producer = TokenProducer::new(input);
        let mut events = Vec::new();
        while let Some((ev, _)) = producer.next_event().unwrap() {
            events.push(ev);
        }
        events
    }

    #[test]
    fn words_and_characters() {
        let events = all_events("margin-top:1px");
        assert_eq!(
            events,
            vec![
                Event::Word("margin-top"),
                Event::Character(':'),
                Event::Word("1px"),
                Event::EndOfStream,
            ]
        );
    }

    #[test]
    fn line_endings_normalize_to_lf() {
        let events = all_events("a\r\nb\u{0c}c\rd");
        assert_eq!(
            events,
            vec![
                Event::Word("a"),
                Event::Separator('\n'),
                Event::Word("b"),
                Event::Separator('\n'),
                Event::Word("c"),
                Event::Separator('\n'),
                Event::Word("d"),
                Event::EndOfStream,
            ]
        );
    }

    #[test]
    fn comments_and_strings() {
        let events = all_events("/* note */'a\\'b'");
        assert_eq!(
            events,
            vec![
                Event::Comment(" note "),
                Event::Quoted {
                    value: "a'b".to_string(),
                    quote: '\'',
                },
                Event::EndOfStream,
            ]
        );
    }

    #[test]
    fn hex_escape_resolves_code_point() {
        let events = all_events("\\66 oo");
        assert_eq!(events, vec![Event::Escaped('f'), Event::Word("oo"), Event::EndOfStream]);
    }

    #[test]
    fn nul_is_rejected() {
        let mut producer = TokenProducer::new("a\u{0000}b");
        assert!(matches!(producer.next_event(), Ok(Some((Event::Word("a"), _)))));
        let err = producer.next_event().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnexpectedChar);
    }

    #[test]
    fn c1_controls_pass_only_when_allowed() {
        let mut producer = TokenProducer::new("a\u{0090}");
        producer.next_event().unwrap();
        assert!(producer.next_event().is_err());

        let mut producer = TokenProducer::new("a\u{0090}").with_high_controls(true);
        producer.next_event().unwrap();
        assert!(matches!(
            producer.next_event(),
            Ok(Some((Event::Character('\u{0090}'), _)))
        ));

        // C0 controls stay rejected regardless
        let mut producer = TokenProducer::new("\u{0001}").with_high_controls(true);
        assert!(producer.next_event().is_err());
    }

    #[test]
    fn locations_track_lines() {
        let mut producer = TokenProducer::new("a\nbc");
        producer.next_event().unwrap();
        producer.next_event().unwrap();
        let (ev, loc) = producer.next_event().unwrap().unwrap();
        assert_eq!(ev, Event::Word("bc"));
        assert_eq!((loc.line, loc.column), (2, 1));
    }
}
