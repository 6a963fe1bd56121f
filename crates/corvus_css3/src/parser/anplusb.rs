//! The An+B microsyntax of `:nth-child()`-family pseudo-classes.

use crate::parser::Css3Parser;
use crate::selector::{AnB, SelectorList};
use corvus_shared::errors::{CssError, CssResult, ErrorKind};

/// Parse an An+B expression: `even`, `odd`, `3`, `2n`, `2n+1`, `-n+6`.
/// Whitespace is tolerated around the sign of B only.
pub fn parse_anb(input: &str) -> CssResult<AnB> {
    log::trace!("parse_anb: {input}");

    let text = input.trim();
    if text.eq_ignore_ascii_case("even") {
        return Ok(AnB {
            step: 2,
            offset: 0,
            keyword: true,
        });
    }
    if text.eq_ignore_ascii_case("odd") {
        return Ok(AnB {
            step: 2,
            offset: 1,
            keyword: true,
        });
    }

    let malformed = || CssError::new(ErrorKind::InvalidAnB, format!("malformed An+B expression '{input}'"));
    let mut chars = text.chars().peekable();

    let sign_a = match chars.peek() {
        Some('-') => {
            chars.next();
            -1
        }
        Some('+') => {
            chars.next();
            1
        }
        _ => 1,
    };

    let mut digits_a = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits_a.push(c);
        chars.next();
    }

    let has_n = matches!(chars.peek(), Some('n' | 'N'));
    if !has_n {
        // plain integer form
        if digits_a.is_empty() || chars.next().is_some() {
            return Err(malformed());
        }
        let offset: i32 = digits_a.parse().map_err(|_| malformed())?;
        return Ok(AnB::new(0, sign_a * offset));
    }
    chars.next();

    let step = if digits_a.is_empty() {
        sign_a
    } else {
        sign_a * digits_a.parse::<i32>().map_err(|_| malformed())?
    };

    while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
        chars.next();
    }
    let sign_b = match chars.peek() {
        Some('+') => {
            chars.next();
            1
        }
        Some('-') => {
            chars.next();
            -1
        }
        None => return Ok(AnB::new(step, 0)),
        _ => return Err(malformed()),
    };
    while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
        chars.next();
    }

    let mut digits_b = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits_b.push(c);
        chars.next();
    }
    if digits_b.is_empty() || chars.next().is_some() {
        return Err(malformed());
    }
    let offset: i32 = digits_b.parse().map_err(|_| malformed())?;
    Ok(AnB::new(step, sign_b * offset))
}

/// Parse the full argument of an `:nth-*` pseudo-class, including the
/// optional `of <selector-list>` clause. The clause goes through the
/// regular selector entry point as an independent parse.
pub fn parse_nth_argument(input: &str) -> CssResult<(AnB, Option<SelectorList>)> {
    let lowered = input.to_ascii_lowercase();
    if let Some(pos) = find_of_clause(&lowered) {
        let anb = parse_anb(&input[..pos])?;
        let list = Css3Parser::default().parse_selector_list(&input[pos + 4..])?;
        Ok((anb, Some(list)))
    } else {
        Ok((parse_anb(input)?, None))
    }
}

/// Byte position of a ` of ` clause delimiter, if any
fn find_of_clause(lowered: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(rel) = lowered[search_from..].find(" of ") {
        let pos = search_from + rel;
        // the left side must end the An+B part, not an identifier
        let before = lowered[..pos].chars().last();
        if before.map_or(false, |c| c.is_ascii_digit() || c == 'n' || c.is_whitespace() || c == 'd') {
            return Some(pos);
        }
        search_from = pos + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        let anb = parse_anb("even").unwrap();
        assert_eq!((anb.step, anb.offset, anb.keyword), (2, 0, true));
        let anb = parse_anb("odd").unwrap();
        assert_eq!((anb.step, anb.offset, anb.keyword), (2, 1, true));
    }

    #[test]
    fn standard_forms() {
        let anb = parse_anb("2n+1").unwrap();
        assert_eq!((anb.step, anb.offset), (2, 1));
        let anb = parse_anb("-n+6").unwrap();
        assert_eq!((anb.step, anb.offset), (-1, 6));
        let anb = parse_anb("n").unwrap();
        assert_eq!((anb.step, anb.offset), (1, 0));
        let anb = parse_anb("4").unwrap();
        assert_eq!((anb.step, anb.offset), (0, 4));
        let anb = parse_anb("2n-1").unwrap();
        assert_eq!((anb.step, anb.offset), (2, -1));
    }

    #[test]
    fn whitespace_around_the_offset_sign() {
        let anb = parse_anb("2n + 1").unwrap();
        assert_eq!((anb.step, anb.offset), (2, 1));
        let anb = parse_anb("3n -2").unwrap();
        assert_eq!((anb.step, anb.offset), (3, -2));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        assert!(parse_anb("n+").is_err());
        assert!(parse_anb("+-1").is_err());
        assert!(parse_anb("").is_err());
        assert!(parse_anb("2m+1").is_err());
        assert!(parse_anb("n 5").is_err());
    }

    #[test]
    fn of_clause_parses_a_selector_list() {
        let (anb, list) = parse_nth_argument("2n+1 of li.item, p").unwrap();
        assert_eq!((anb.step, anb.offset), (2, 1));
        let list = list.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.css_text(), "li.item, p");
    }
}
