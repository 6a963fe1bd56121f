//! Shared building blocks for the Corvus CSS engine: source locations and
//! the common error model used by the parser and its downstream consumers.

pub mod errors;
pub mod location;
