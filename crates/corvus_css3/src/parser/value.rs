//! The property-value handler: builds lexical-unit chains from events.
//!
//! Words accumulate in a text buffer until a structural event commits them
//! as a numeric, dimension, percentage or identifier unit. Function calls
//! nest through the unit owner links rather than through child handlers;
//! only constructs with their own micro-grammar (`url()`, `type()`,
//! `element()`, hex colors, unicode ranges) leave the main loop.

use crate::dimension::MATH_FUNCTIONS;
use crate::parser::raw::RawHandler;
use crate::parser::{Outcome, ParseContext, Step, TokenHandler};
use crate::syntax;
use crate::tokenizer::Event;
use crate::unit::{LexicalKind, UnitId};
use corvus_shared::errors::{CssError, CssResult, ErrorKind};

/// Which specialized capture is in flight
enum RawTarget {
    Url,
    Syntax,
    Element,
}

pub struct ValueHandler {
    first: Option<UnitId>,
    /// Innermost open function-like unit; new units become its parameters
    current_func: Option<UnitId>,
    buffer: String,
    pending_comments: Vec<String>,
    raw_target: Option<RawTarget>,
    hex_pending: bool,
    unicode_pending: bool,
    unicode_text: String,
}

impl ValueHandler {
    pub fn new() -> Self {
        Self {
            first: None,
            current_func: None,
            buffer: String::new(),
            pending_comments: Vec::new(),
            raw_target: None,
            hex_pending: false,
            unicode_pending: false,
            unicode_text: String::new(),
        }
    }

    fn append_unit(&mut self, cx: &mut ParseContext, kind: LexicalKind) -> UnitId {
        let id = cx.pool.alloc(kind);
        for comment in self.pending_comments.drain(..) {
            cx.pool.push_comment_before(id, &comment);
        }
        match self.current_func {
            Some(func) => cx.pool.add_parameter(func, id),
            None => match self.first {
                Some(first) => cx.pool.append(first, id),
                None => self.first = Some(id),
            },
        }
        id
    }

    /// True when an enclosing function is algebraic, enabling operators
    fn in_math_context(&self, cx: &ParseContext) -> bool {
        let mut cursor = self.current_func;
        while let Some(id) = cursor {
            match cx.pool.kind(id) {
                LexicalKind::MathFunction { .. } => return true,
                LexicalKind::SubExpression => {}
                _ => return false,
            }
            cursor = cx.pool.owner(id);
        }
        false
    }

    fn commit_buffer(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.buffer);

        if text == "-" || text == "+" {
            if self.in_math_context(cx) {
                let op = if text == "-" {
                    LexicalKind::OperatorMinus
                } else {
                    LexicalKind::OperatorPlus
                };
                self.append_unit(cx, op);
                return Ok(());
            }
            return Err(cx.error(ErrorKind::UnexpectedChar, format!("stray '{text}' in value")));
        }

        if text.eq_ignore_ascii_case("inherit") {
            self.append_unit(cx, LexicalKind::Inherit);
        } else if text.eq_ignore_ascii_case("initial") {
            self.append_unit(cx, LexicalKind::Initial);
        } else if text.eq_ignore_ascii_case("unset") {
            self.append_unit(cx, LexicalKind::Unset);
        } else if text.eq_ignore_ascii_case("revert") {
            self.append_unit(cx, LexicalKind::Revert);
        } else if let Some(kind) = Self::parse_numeric(&text, cx)? {
            self.append_unit(cx, kind);
        } else {
            self.append_unit(cx, LexicalKind::Ident(text));
        }
        Ok(())
    }

    /// `Ok(None)` means the text is not numeric at all (an identifier);
    /// a numeric prefix with a malformed remainder is an error
    fn parse_numeric(text: &str, cx: &ParseContext) -> CssResult<Option<LexicalKind>> {
        let bytes = text.as_bytes();
        let mut pos = 0;
        if matches!(bytes.first(), Some(b'+' | b'-')) {
            pos += 1;
        }
        let digits_start = pos;
        let mut saw_dot = false;
        let mut saw_exp = false;
        while pos < bytes.len() {
            let b = bytes[pos];
            if b.is_ascii_digit() {
                pos += 1;
            } else if b == b'.' && !saw_dot && !saw_exp {
                saw_dot = true;
                pos += 1;
            } else if (b == b'e' || b == b'E')
                && !saw_exp
                && pos > digits_start
                && bytes
                    .get(pos + 1)
                    .is_some_and(|n| n.is_ascii_digit() || *n == b'+' || *n == b'-')
                && bytes[pos + 1..].iter().any(u8::is_ascii_digit)
            {
                saw_exp = true;
                pos += 1;
                if matches!(bytes.get(pos), Some(b'+' | b'-')) {
                    pos += 1;
                }
            } else {
                break;
            }
        }
        if pos == digits_start || !bytes[digits_start..pos].iter().any(u8::is_ascii_digit) {
            return Ok(None);
        }

        let numeric = &text[..pos];
        let rest = &text[pos..];
        let invalid = || cx.error(ErrorKind::InvalidNumber, format!("malformed numeric value '{text}'"));

        if rest.is_empty() {
            if saw_dot || saw_exp {
                let value: f32 = numeric.parse().map_err(|_| invalid())?;
                return Ok(Some(LexicalKind::Real(value)));
            }
            let value: i32 = numeric.parse().map_err(|_| invalid())?;
            return Ok(Some(LexicalKind::Integer(value)));
        }
        if rest == "%" {
            let value: f32 = numeric.parse().map_err(|_| invalid())?;
            return Ok(Some(LexicalKind::Percentage(value)));
        }
        if rest.chars().all(|c| c.is_ascii_alphabetic()) {
            let value: f32 = numeric.parse().map_err(|_| invalid())?;
            return Ok(Some(LexicalKind::Dimension {
                value,
                unit: rest.to_ascii_lowercase(),
            }));
        }
        Err(invalid())
    }

    /// Classify a function by its (lowercased) name
    fn classify_function(name: &str) -> LexicalKind {
        if let Some((index, _, _)) = MATH_FUNCTIONS.get(name).copied() {
            return LexicalKind::MathFunction {
                name: name.to_string(),
                index,
            };
        }
        match name {
            "var" => LexicalKind::Var,
            "attr" => LexicalKind::Attr,
            "env" => LexicalKind::Env,
            "rgb" | "rgba" => LexicalKind::RgbColor,
            "hsl" | "hsla" => LexicalKind::HslColor,
            "hwb" => LexicalKind::HwbColor,
            "lab" => LexicalKind::LabColor,
            "lch" => LexicalKind::LchColor,
            "oklab" => LexicalKind::OklabColor,
            "oklch" => LexicalKind::OklchColor,
            "color" => LexicalKind::ColorFunction,
            "color-mix" => LexicalKind::ColorMix,
            "counter" => LexicalKind::CounterFunction,
            "counters" => LexicalKind::CountersFunction,
            "cubic-bezier" => LexicalKind::CubicBezier,
            "steps" => LexicalKind::Steps,
            "rect" => LexicalKind::Rect,
            _ => {
                if name.starts_with('-') {
                    LexicalKind::PrefixedFunction(name.to_string())
                } else if name.ends_with("-gradient") {
                    LexicalKind::Gradient(name.to_string())
                } else if is_transform_function(name) {
                    LexicalKind::TransformFunction(name.to_string())
                } else {
                    LexicalKind::Function(name.to_string())
                }
            }
        }
    }

    fn open_function(&mut self, cx: &mut ParseContext) -> CssResult<Step> {
        let name = std::mem::take(&mut self.buffer).to_ascii_lowercase();

        match name.as_str() {
            "url" => {
                self.raw_target = Some(RawTarget::Url);
                return Ok(Step::Push(Box::new(RawHandler::until_close_paren())));
            }
            "type" => {
                self.raw_target = Some(RawTarget::Syntax);
                return Ok(Step::Push(Box::new(RawHandler::until_close_paren())));
            }
            "element" => {
                self.raw_target = Some(RawTarget::Element);
                return Ok(Step::Push(Box::new(RawHandler::until_close_paren())));
            }
            _ => {}
        }

        let kind = if name.is_empty() {
            LexicalKind::SubExpression
        } else {
            Self::classify_function(&name)
        };
        let id = self.append_unit(cx, kind);
        self.current_func = Some(id);
        Ok(Step::Stay)
    }

    fn close_function(&mut self, cx: &mut ParseContext) -> CssResult<Step> {
        let Some(func) = self.current_func else {
            return Err(cx.error(ErrorKind::UnmatchedBracket, "unexpected ')'"));
        };

        // arity is a semantic concern checked by the dimensional analyzer
        if let Some(last) = cx.pool.params(func).last() {
            if cx.pool.kind(last).is_operator() {
                return Err(cx.error(ErrorKind::DanglingOperator, "expression ends with an operator"));
            }
        }

        self.current_func = cx.pool.owner(func);
        Ok(Step::Stay)
    }

    /// Expand a hex color word into an `rgb()` unit
    fn append_hex_color(&mut self, cx: &mut ParseContext, hex: &str) -> CssResult<()> {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) || !matches!(hex.len(), 3 | 4 | 6 | 8) {
            return Err(cx.error(ErrorKind::InvalidHexColor, format!("invalid hex color '#{hex}'")));
        }

        let wide = hex.len() >= 6;
        let digit = |i: usize| -> i32 {
            i32::from_str_radix(&hex[i..=i], 16).unwrap_or(0)
        };
        let component = |i: usize| -> i32 {
            if wide {
                digit(2 * i) * 16 + digit(2 * i + 1)
            } else {
                digit(i) * 17
            }
        };
        let has_alpha = matches!(hex.len(), 4 | 8);

        let rgb = self.append_unit(cx, LexicalKind::RgbColor);
        for i in 0..3 {
            let value = cx.pool.alloc(LexicalKind::Integer(component(i)));
            cx.pool.add_parameter(rgb, value);
        }
        if has_alpha {
            let slash = cx.pool.alloc(LexicalKind::OperatorSlash);
            cx.pool.add_parameter(rgb, slash);
            // round to three decimals so the value re-serializes cleanly
            let alpha = (component(3) as f32 / 255.0 * 1000.0).round() / 1000.0;
            let alpha = cx.pool.alloc(LexicalKind::Real(alpha));
            cx.pool.add_parameter(rgb, alpha);
        }
        Ok(())
    }

    fn finish_unicode(&mut self, cx: &mut ParseContext) -> CssResult<()> {
        if !self.unicode_pending {
            return Ok(());
        }
        self.unicode_pending = false;
        let text = std::mem::take(&mut self.unicode_text);
        let location = cx.location;
        let invalid = || {
            CssError::new(
                ErrorKind::InvalidUnicodeRange,
                format!("invalid unicode range 'U+{text}'"),
            )
            .with_location(location)
        };

        let (start, end) = match text.split_once('-') {
            Some((start, end)) => (start, Some(end)),
            None => (text.as_str(), None),
        };
        if start.is_empty() || start.len() > 6 {
            return Err(invalid());
        }

        let wildcard_at = start.find('?');
        if let Some(at) = wildcard_at {
            // wildcards form a trailing run and exclude a second bound
            if end.is_some()
                || !start[at..].chars().all(|c| c == '?')
                || !start[..at].chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(invalid());
            }
            let range = self.append_unit(cx, LexicalKind::UnicodeRange);
            let pattern = cx.pool.alloc(LexicalKind::UnicodeWildcard(start.to_uppercase()));
            cx.pool.add_parameter(range, pattern);
            return Ok(());
        }

        let parse_bound = |s: &str| -> CssResult<i32> {
            if s.is_empty() || s.len() > 6 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            i32::from_str_radix(s, 16).map_err(|_| invalid())
        };

        let range = self.append_unit(cx, LexicalKind::UnicodeRange);
        let lo = cx.pool.alloc(LexicalKind::Integer(parse_bound(start)?));
        cx.pool.add_parameter(range, lo);
        if let Some(end) = end {
            let hi = cx.pool.alloc(LexicalKind::Integer(parse_bound(end)?));
            cx.pool.add_parameter(range, hi);
        }
        Ok(())
    }

    fn finish_value(&mut self, cx: &mut ParseContext) -> CssResult<Outcome> {
        self.commit_buffer(cx)?;
        self.finish_unicode(cx)?;
        if self.current_func.is_some() {
            return Err(cx.error(ErrorKind::UnmatchedBracket, "unterminated function in value"));
        }
        if let Some(first) = self.first {
            let tail = cx.pool.chain_tail(first);
            if cx.pool.kind(tail).is_algebraic_operator() {
                return Err(cx.error(ErrorKind::DanglingOperator, "value ends with an operator"));
            }
            if !self.pending_comments.is_empty() {
                for comment in self.pending_comments.drain(..) {
                    cx.pool.push_comment_after(tail, &comment);
                }
            }
        }
        Ok(Outcome::Value(self.first))
    }

    fn append_operator(&mut self, cx: &mut ParseContext, kind: LexicalKind) -> CssResult<()> {
        self.commit_buffer(cx)?;
        self.append_unit(cx, kind);
        Ok(())
    }
}

impl TokenHandler for ValueHandler {
    fn name(&self) -> &'static str {
        "value"
    }

    fn event(&mut self, event: &Event, cx: &mut ParseContext) -> CssResult<Step> {
        if self.unicode_pending {
            match event {
                Event::Word(word) => {
                    self.unicode_text.push_str(word);
                    return Ok(Step::Stay);
                }
                Event::Character('?') => {
                    self.unicode_text.push('?');
                    return Ok(Step::Stay);
                }
                _ => self.finish_unicode(cx)?,
            }
        }
        if self.hex_pending {
            self.hex_pending = false;
            match event {
                Event::Word(word) => {
                    let word = (*word).to_string();
                    self.append_hex_color(cx, &word)?;
                    return Ok(Step::Stay);
                }
                _ => return Err(cx.error(ErrorKind::InvalidHexColor, "'#' without hex digits")),
            }
        }

        match event {
            Event::Word(word) => self.buffer.push_str(word),
            Event::Escaped(c) => self.buffer.push(*c),
            Event::Separator(_) => self.commit_buffer(cx)?,
            Event::Comment(text) => self.pending_comments.push((*text).to_string()),
            Event::Quoted { value, .. } => {
                self.commit_buffer(cx)?;
                self.append_unit(cx, LexicalKind::QuotedString(value.clone()));
            }
            Event::LeftParen => return self.open_function(cx),
            Event::RightParen => {
                self.commit_buffer(cx)?;
                return self.close_function(cx);
            }
            Event::Character('.') => self.buffer.push('.'),
            Event::Character('%') => {
                self.buffer.push('%');
                self.commit_buffer(cx)?;
            }
            Event::Character('#') => {
                self.commit_buffer(cx)?;
                self.hex_pending = true;
            }
            Event::Character('+') => {
                if self.buffer.eq_ignore_ascii_case("u") {
                    // start of a unicode range literal
                    self.buffer.clear();
                    self.unicode_pending = true;
                } else if self.in_math_context(cx) {
                    self.append_operator(cx, LexicalKind::OperatorPlus)?;
                } else {
                    self.commit_buffer(cx)?;
                    // sign of the next numeric word
                    self.buffer.push('+');
                }
            }
            Event::Character('*') => {
                if !self.in_math_context(cx) {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "'*' outside a math expression"));
                }
                self.append_operator(cx, LexicalKind::OperatorMultiply)?;
            }
            Event::Character('^') => {
                if !self.in_math_context(cx) {
                    return Err(cx.error(ErrorKind::UnexpectedChar, "'^' outside a math expression"));
                }
                self.append_operator(cx, LexicalKind::OperatorExp)?;
            }
            Event::Character('/') => self.append_operator(cx, LexicalKind::OperatorSlash)?,
            Event::Character(',') => self.append_operator(cx, LexicalKind::OperatorComma)?,
            Event::Character(c @ (';' | '!')) => {
                if self.current_func.is_some() {
                    return Err(cx.error(ErrorKind::UnexpectedChar, format!("'{c}' inside a function")));
                }
                let outcome = self.finish_value(cx)?;
                return Ok(Step::PopReplay(outcome));
            }
            Event::RightCurly => {
                if self.current_func.is_some() {
                    return Err(cx.error(ErrorKind::UnmatchedBracket, "'}' inside a function"));
                }
                let outcome = self.finish_value(cx)?;
                return Ok(Step::PopReplay(outcome));
            }
            Event::Character(c) => {
                return Err(cx.error(ErrorKind::UnexpectedChar, format!("unexpected '{c}' in value")));
            }
            Event::LeftBracket | Event::RightBracket | Event::LeftCurly => {
                return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected bracket in value"));
            }
            Event::EndOfStream => {
                let outcome = self.finish_value(cx)?;
                return Ok(Step::Pop(outcome));
            }
        }
        Ok(Step::Stay)
    }

    fn child_done(&mut self, outcome: Outcome, cx: &mut ParseContext) -> CssResult<Step> {
        let Outcome::Raw(text) = outcome else {
            return Ok(Step::Stay);
        };
        match self.raw_target.take() {
            Some(RawTarget::Url) => {
                let url = strip_quotes(text.trim());
                self.append_unit(cx, LexicalKind::Uri(url));
            }
            Some(RawTarget::Syntax) => {
                let chain = syntax::parse(&text).map_err(|e| match e.location {
                    Some(_) => e,
                    None => e.with_location(cx.location),
                })?;
                self.append_unit(cx, LexicalKind::Syntax(chain));
            }
            Some(RawTarget::Element) => {
                let name = text.trim().strip_prefix('#').map(str::to_string).ok_or_else(|| {
                    cx.error(ErrorKind::UnexpectedToken, "element() expects an id reference")
                })?;
                self.append_unit(cx, LexicalKind::ElementReference(name));
            }
            None => {
                return Err(cx.error(ErrorKind::UnexpectedToken, "unexpected raw capture"));
            }
        }
        Ok(Step::Stay)
    }
}

fn strip_quotes(text: &str) -> String {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'\'' || bytes[0] == b'"') && bytes[bytes.len() - 1] == bytes[0] {
        text[1..text.len() - 1].to_string()
    } else {
        text.to_string()
    }
}

fn is_transform_function(name: &str) -> bool {
    matches!(
        name,
        "matrix"
            | "matrix3d"
            | "translate"
            | "translatex"
            | "translatey"
            | "translatez"
            | "translate3d"
            | "scale"
            | "scalex"
            | "scaley"
            | "scalez"
            | "scale3d"
            | "rotate"
            | "rotatex"
            | "rotatey"
            | "rotatez"
            | "rotate3d"
            | "skew"
            | "skewx"
            | "skewy"
            | "perspective"
    )
}

#[cfg(test)]
mod tests {
    use crate::unit::LexicalKind;
    use crate::Css3Parser;

    fn parse(css: &str) -> crate::unit::LexicalValue {
        Css3Parser::default().parse_value(css).unwrap()
    }

    #[test]
    fn numbers_dimensions_and_idents() {
        let value = parse("12px auto 1.5 50%");
        let kinds: Vec<_> = value.iter().map(|u| value.pool().kind(u).clone()).collect();
        assert_eq!(
            kinds,
            vec![
                LexicalKind::Dimension {
                    value: 12.0,
                    unit: "px".to_string()
                },
                LexicalKind::Ident("auto".to_string()),
                LexicalKind::Real(1.5),
                LexicalKind::Percentage(50.0),
            ]
        );
    }

    #[test]
    fn function_nesting_through_owner_links() {
        let value = parse("calc(min(1px, 2px) * 3)");
        assert_eq!(value.css_text(), "calc(min(1px, 2px) * 3)");
        assert_eq!(value.minified_text(), "calc(min(1px,2px)*3)");
    }

    #[test]
    fn hex_colors_expand_to_rgb() {
        let value = parse("#abc");
        assert_eq!(value.css_text(), "rgb(170 187 204)");

        let value = parse("#11223344");
        assert_eq!(value.css_text(), "rgb(17 34 51 / 0.267)");
        assert_eq!(value.minified_text(), "rgb(17 34 51/0.267)");
    }

    #[test]
    fn eight_digit_hex_alpha_is_byte_over_255() {
        let value = parse("#000000ff");
        let first = value.first_unit().unwrap();
        let alpha = value.pool().params(first).last().unwrap();
        assert_eq!(value.pool().kind(alpha), &LexicalKind::Real(1.0));
    }

    #[test]
    fn unicode_ranges() {
        assert_eq!(parse("U+0025-00FF").css_text(), "U+25-FF");
        assert_eq!(parse("u+4??").css_text(), "U+4??");
        assert!(Css3Parser::default().parse_value("U+4??-5??").is_err());
        assert!(Css3Parser::default().parse_value("U+1234567").is_err());
    }

    #[test]
    fn url_and_strings() {
        let value = parse("url(image.png) 'label'");
        assert_eq!(value.css_text(), "url('image.png') 'label'");
        assert_eq!(parse("url('a b.png')").css_text(), "url('a b.png')");
    }

    #[test]
    fn css_wide_keywords() {
        let value = parse("inherit");
        let first = value.first_unit().unwrap();
        assert_eq!(value.pool().kind(first), &LexicalKind::Inherit);
        assert_eq!(parse("INITIAL").css_text(), "initial");
    }

    #[test]
    fn operators_require_math_context() {
        assert!(Css3Parser::default().parse_value("1px * 2").is_err());
        assert!(Css3Parser::default().parse_value("calc(1px *)").is_err());
        assert!(Css3Parser::default().parse_value("calc(1px").is_err());
        assert_eq!(parse("calc(1px * 2)").css_text(), "calc(1px * 2)");
    }

    #[test]
    fn arity_is_checked_by_the_analyzer_not_the_parser() {
        // too few arguments still parse; the dimensional analyzer objects
        let value = parse("clamp(1px)");
        assert_eq!(value.css_text(), "clamp(1px)");
        assert!(value.dimension().is_err());
        assert!(parse("calc()").dimension().is_err());
    }

    #[test]
    fn type_syntax_inside_attr() {
        let value = parse("attr(data-size type(<length>), 0px)");
        assert_eq!(value.css_text(), "attr(data-size type(<length>), 0px)");
    }

    #[test]
    fn slash_and_comma_spacing() {
        let value = parse("1px/2px, 3px");
        assert_eq!(value.css_text(), "1px/2px, 3px");
        assert_eq!(value.minified_text(), "1px/2px,3px");
    }

    #[test]
    fn comments_attach_to_the_next_unit() {
        let value = parse("/* leading */ 10px");
        assert_eq!(value.css_text(), "/* leading */ 10px");
        assert_eq!(value.minified_text(), "10px");
    }

    #[test]
    fn signed_numbers_outside_math() {
        assert_eq!(parse("+5px").css_text(), "5px");
        assert_eq!(parse("-5px").css_text(), "-5px");
    }
}
