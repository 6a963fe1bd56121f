//! The value-syntax grammar used to validate registered custom-property
//! values: an ordered chain of `|`-separated alternatives, each a category
//! (or a literal keyword) with an optional repetition multiplier.
//!
//! Descriptor strings like `<length-percentage># | auto` are compiled with
//! nom into a [`SyntaxChain`].

use corvus_shared::errors::{CssError, CssResult, ErrorKind};
use itertools::Itertools;
use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::{char, multispace0, one_of};
use nom::combinator::{map, opt};
use nom::multi::separated_list1;
use nom::sequence::delimited;
use nom::{IResult, Parser};
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Grammar category of one syntax component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Category {
    /// `*`, matching anything
    Universal,
    Length,
    Percentage,
    LengthPercentage,
    Number,
    Integer,
    Angle,
    Time,
    Frequency,
    Resolution,
    Flex,
    Color,
    Image,
    Url,
    TransformFunction,
    TransformList,
    CustomIdent,
    Counter,
    String,
    UnicodeRange,
    /// A literal keyword; the keyword itself lives on the component
    Ident,
}

impl Category {
    pub fn from_name(name: &str) -> Option<Category> {
        Some(match name {
            "length" => Category::Length,
            "percentage" => Category::Percentage,
            "length-percentage" => Category::LengthPercentage,
            "number" => Category::Number,
            "integer" => Category::Integer,
            "angle" => Category::Angle,
            "time" => Category::Time,
            "frequency" => Category::Frequency,
            "resolution" => Category::Resolution,
            "flex" => Category::Flex,
            "color" => Category::Color,
            "image" => Category::Image,
            "url" => Category::Url,
            "transform-function" => Category::TransformFunction,
            "transform-list" => Category::TransformList,
            "custom-ident" => Category::CustomIdent,
            "counter" => Category::Counter,
            "string" => Category::String,
            "unicode-range" => Category::UnicodeRange,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Universal => "*",
            Category::Length => "length",
            Category::Percentage => "percentage",
            Category::LengthPercentage => "length-percentage",
            Category::Number => "number",
            Category::Integer => "integer",
            Category::Angle => "angle",
            Category::Time => "time",
            Category::Frequency => "frequency",
            Category::Resolution => "resolution",
            Category::Flex => "flex",
            Category::Color => "color",
            Category::Image => "image",
            Category::Url => "url",
            Category::TransformFunction => "transform-function",
            Category::TransformList => "transform-list",
            Category::CustomIdent => "custom-ident",
            Category::Counter => "counter",
            Category::String => "string",
            Category::UnicodeRange => "unicode-range",
            Category::Ident => "ident",
        }
    }
}

/// Repetition multiplier on a syntax component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Multiplier {
    #[default]
    Once,
    /// `+`: a space-separated list of one or more
    SpaceList,
    /// `#`: a comma-separated list of one or more
    CommaList,
}

impl Display for Multiplier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Multiplier::Once => Ok(()),
            Multiplier::SpaceList => write!(f, "+"),
            Multiplier::CommaList => write!(f, "#"),
        }
    }
}

/// One alternative in a syntax chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxComponent {
    pub category: Category,
    /// The keyword, for [`Category::Ident`] components
    pub ident: Option<String>,
    pub multiplier: Multiplier,
}

impl SyntaxComponent {
    pub fn new(category: Category, multiplier: Multiplier) -> Self {
        Self {
            category,
            ident: None,
            multiplier,
        }
    }

    pub fn keyword(ident: &str, multiplier: Multiplier) -> Self {
        Self {
            category: Category::Ident,
            ident: Some(ident.to_string()),
            multiplier,
        }
    }
}

impl Display for SyntaxComponent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.category, &self.ident) {
            (Category::Ident, Some(kw)) => write!(f, "{}{}", kw, self.multiplier),
            (Category::Universal, _) => write!(f, "*"),
            (category, _) => write!(f, "<{}>{}", category.as_str(), self.multiplier),
        }
    }
}

/// An ordered chain of alternatives, e.g. `<length># | auto`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxChain {
    pub components: Vec<SyntaxComponent>,
}

impl SyntaxChain {
    pub fn universal() -> Self {
        SyntaxChain {
            components: vec![SyntaxComponent::new(Category::Universal, Multiplier::Once)],
        }
    }

    pub fn is_universal(&self) -> bool {
        self.components.iter().any(|c| c.category == Category::Universal)
    }

    /// True when any alternative has the given category
    pub fn has_category(&self, category: Category) -> bool {
        self.components.iter().any(|c| c.category == category)
    }
}

impl Display for SyntaxChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.components.iter().map(|c| c.to_string()).join(" | "))
    }
}

/// Parse a syntax descriptor string into a chain
pub fn parse(input: &str) -> CssResult<SyntaxChain> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CssError::new(ErrorKind::InvalidSyntax, "empty syntax descriptor"));
    }
    if trimmed == "*" {
        return Ok(SyntaxChain::universal());
    }

    match parse_chain(trimmed) {
        Ok((rest, chain)) if rest.trim().is_empty() => Ok(chain),
        Ok((rest, _)) => Err(CssError::new(
            ErrorKind::InvalidSyntax,
            &format!("trailing input in syntax descriptor: '{}'", rest),
        )),
        Err(err) => Err(CssError::new(
            ErrorKind::InvalidSyntax,
            &format!("cannot parse syntax descriptor '{}': {}", trimmed, err),
        )),
    }
}

fn parse_chain(input: &str) -> IResult<&str, SyntaxChain> {
    map(separated_list1(ws(char('|')), ws(component)), |components| SyntaxChain {
        components,
    })
    .parse(input)
}

fn ws<'a, O, F>(inner: F) -> impl Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>
where
    F: Parser<&'a str, Output = O, Error = nom::error::Error<&'a str>>,
{
    delimited(multispace0, inner, multispace0)
}

fn ident_chars(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_').parse(input)
}

fn component(input: &str) -> IResult<&str, SyntaxComponent> {
    let (input, inner) = alt((
        map(delimited(char('<'), ident_chars, char('>')), |name: &str| {
            (Some(name), None)
        }),
        map(ident_chars, |kw: &str| (None, Some(kw))),
    ))
    .parse(input)?;

    let (input, multiplier) = opt(one_of("+#")).parse(input)?;
    let multiplier = match multiplier {
        Some('+') => Multiplier::SpaceList,
        Some('#') => Multiplier::CommaList,
        _ => Multiplier::Once,
    };

    let component = match inner {
        (Some(name), _) => match Category::from_name(name) {
            Some(category) => SyntaxComponent::new(category, multiplier),
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Tag,
                )))
            }
        },
        (_, Some(kw)) => SyntaxComponent::keyword(kw, multiplier),
        _ => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Alt,
            )))
        }
    };

    Ok((input, component))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn universal() {
        let chain = parse("*").unwrap();
        assert!(chain.is_universal());
        assert_eq!(chain.to_string(), "*");
    }

    #[test]
    fn single_category() {
        let chain = parse("<length>").unwrap();
        assert_eq!(chain.components.len(), 1);
        assert_eq!(chain.components[0].category, Category::Length);
        assert_eq!(chain.components[0].multiplier, Multiplier::Once);
    }

    #[test]
    fn alternatives_with_multipliers() {
        let chain = parse("<length-percentage># | auto | <color>+").unwrap();
        assert_eq!(chain.components.len(), 3);
        assert_eq!(chain.components[0].category, Category::LengthPercentage);
        assert_eq!(chain.components[0].multiplier, Multiplier::CommaList);
        assert_eq!(chain.components[1].category, Category::Ident);
        assert_eq!(chain.components[1].ident.as_deref(), Some("auto"));
        assert_eq!(chain.components[2].multiplier, Multiplier::SpaceList);
        assert_eq!(chain.to_string(), "<length-percentage># | auto | <color>+");
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = parse("<bogus>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSyntax);
        assert!(parse("").is_err());
        assert!(parse("<length> |").is_err());
    }
}
