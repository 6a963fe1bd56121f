//! Error results that can be returned from the css3 parser

use crate::location::Location;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error classification, handed to error sinks alongside the message
/// so that consumers can react without string matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A code point that is not allowed at the current position
    UnexpectedChar,
    /// A token that is not allowed at the current position
    UnexpectedToken,
    /// A closing bracket without a matching opening bracket, or vice versa
    UnmatchedBracket,
    /// The stream ended inside an open construct
    UnexpectedEof,
    /// An algebraic operator with a missing operand
    DanglingOperator,
    /// A numeric literal that could not be parsed
    InvalidNumber,
    /// A malformed An+B expression
    InvalidAnB,
    /// A malformed unicode-range literal
    InvalidUnicodeRange,
    /// A malformed hex color word
    InvalidHexColor,
    /// A malformed value-syntax descriptor
    InvalidSyntax,
    /// Two dimensions that cannot be combined (semantic error)
    IncompatibleDimensions,
    /// A function invoked with too few arguments (semantic error)
    MissingArgument,
    /// A namespace prefix that was never declared. Distinguished sub-kind
    /// of the syntax errors so consumers can handle it separately.
    UnknownNamespacePrefix,
}

/// Parser error that defines an error (message) on the given position
#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}{}", .location.map(|l| format!(" at {l}")).unwrap_or_default())]
pub struct CssError {
    /// Coarse classification of the error
    pub kind: ErrorKind,
    /// Error message
    pub message: String,
    /// Location of the error, if available (during parsing mostly)
    pub location: Option<Location>,
}

impl CssError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CssError {
            kind,
            message: message.into(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

pub type CssResult<T> = Result<T, CssError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location() {
        let err = CssError::new(ErrorKind::UnexpectedChar, "unexpected '}'").with_location(Location::new(3, 7, 42));
        assert_eq!(err.to_string(), "unexpected '}' at 3:7");

        let err = CssError::new(ErrorKind::UnexpectedEof, "unexpected end of stream");
        assert_eq!(err.to_string(), "unexpected end of stream");
    }
}
