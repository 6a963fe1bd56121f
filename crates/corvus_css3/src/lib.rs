//! Event-driven CSS lexical and syntactic analysis.
//!
//! [`Css3Parser`] tokenizes a stylesheet and reports every construct to a
//! [`StyleSink`](sink::StyleSink) as it is recognized. Property values
//! come back as [`LexicalValue`](unit::LexicalValue) chains that can be
//! cloned, spliced and re-serialized, checked against a value grammar
//! with the [`matcher`], and dimensionally analyzed through the
//! `calc()` family with the [`dimension`] module.

pub mod condition;
pub mod dimension;
pub mod matcher;
mod parser;
pub mod parser_config;
pub mod selector;
pub mod sink;
pub mod syntax;
mod tokenizer;
mod unicode;
pub mod unit;

pub use parser::{parse_anb, parse_nth_argument, Css3Parser};
pub use parser_config::ParserConfig;
