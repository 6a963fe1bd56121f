//! Dimensional analysis of algebraic (`calc()`-family) expressions.
//!
//! The analyzer walks a lexical-unit tree and propagates a
//! `(category, exponent)` pair through operators and math functions. The
//! result is ephemeral: dimensions are computed on demand and never stored
//! on the tree. An unresolved `var()` anywhere in the expression makes the
//! whole dimension indeterminate (`Ok(None)`); semantic failures such as
//! summing a length and a time abort the computation with an error.

use crate::syntax::Category;
use crate::unit::{LexicalKind, LexicalPool, MathIndex, UnitId};
use lazy_static::lazy_static;
use std::collections::HashMap;
use thiserror::Error;

/// Ephemeral result of analyzing an expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension {
    pub category: Category,
    pub exponent: i32,
    /// Set when the dimension is a CSS-native `length-percentage` sum whose
    /// resolution is deferred to computed-value time
    pub css_native: bool,
    /// Set when accuracy slack was recorded (e.g. a non-integer `pow()`
    /// exponent), allowing `sqrt()` of odd exponents
    pub approximate: bool,
}

impl Dimension {
    fn new(category: Category, exponent: i32) -> Self {
        Self {
            category,
            exponent,
            css_native: false,
            approximate: false,
        }
    }

    fn number() -> Self {
        Self::new(Category::Number, 0)
    }

    /// Collapse to the number category when the exponent reaches zero
    fn normalized(mut self) -> Self {
        if self.exponent == 0 {
            self.category = Category::Number;
            self.css_native = false;
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DimensionError {
    #[error("incompatible dimensions: {0:?} and {1:?}")]
    Incompatible(Category, Category),
    #[error("function '{0}' is missing arguments")]
    MissingArgument(String),
    #[error("invalid exponent in '{0}'")]
    InvalidExponent(String),
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    #[error("operator without operand")]
    DanglingOperator,
}

lazy_static! {
    /// Math function lookup: name -> (index, min arguments, max arguments).
    /// Initialized once; no runtime mutation.
    pub static ref MATH_FUNCTIONS: HashMap<&'static str, (MathIndex, usize, usize)> = {
        let mut m = HashMap::new();
        m.insert("calc", (MathIndex::Calc, 1, 1));
        m.insert("min", (MathIndex::Min, 1, usize::MAX));
        m.insert("max", (MathIndex::Max, 1, usize::MAX));
        m.insert("clamp", (MathIndex::Clamp, 3, 3));
        m.insert("round", (MathIndex::Round, 1, 3));
        m.insert("mod", (MathIndex::Mod, 2, 2));
        m.insert("rem", (MathIndex::Rem, 2, 2));
        m.insert("hypot", (MathIndex::Hypot, 1, usize::MAX));
        m.insert("abs", (MathIndex::Abs, 1, 1));
        m.insert("sign", (MathIndex::Sign, 1, 1));
        m.insert("sin", (MathIndex::Sin, 1, 1));
        m.insert("cos", (MathIndex::Cos, 1, 1));
        m.insert("tan", (MathIndex::Tan, 1, 1));
        m.insert("asin", (MathIndex::Asin, 1, 1));
        m.insert("acos", (MathIndex::Acos, 1, 1));
        m.insert("atan", (MathIndex::Atan, 1, 1));
        m.insert("atan2", (MathIndex::Atan2, 2, 2));
        m.insert("pow", (MathIndex::Pow, 2, 2));
        m.insert("sqrt", (MathIndex::Sqrt, 1, 1));
        m.insert("exp", (MathIndex::Exp, 1, 1));
        m.insert("log", (MathIndex::Log, 1, 2));
        m.insert("anchor-size", (MathIndex::AnchorSize, 1, 3));
        m
    };
}

/// Category of a dimension unit string, lowercased
pub fn unit_category(unit: &str) -> Option<Category> {
    const LENGTH_UNITS: [&str; 31] = [
        "cap", "ch", "em", "ex", "ic", "lh", "rcap", "rch", "rem", "rex", "ric", "rlh", "vh", "vw", "vmax", "vmin",
        "vb", "vi", "cqw", "cqh", "cqi", "cqb", "cqmin", "cqmax", "px", "cm", "mm", "q", "in", "pc", "pt",
    ];

    let unit = unit.to_ascii_lowercase();
    if LENGTH_UNITS.contains(&unit.as_str()) {
        return Some(Category::Length);
    }
    match unit.as_str() {
        "deg" | "grad" | "rad" | "turn" => Some(Category::Angle),
        "s" | "ms" => Some(Category::Time),
        "hz" | "khz" => Some(Category::Frequency),
        "dpi" | "dpcm" | "dppx" | "x" => Some(Category::Resolution),
        "fr" => Some(Category::Flex),
        _ => None,
    }
}

/// The analysis result: `None` means indeterminate (unresolved `var()` or
/// untyped `attr()` somewhere in the expression)
pub type DimResult = Result<Option<Dimension>, DimensionError>;

pub struct DimensionalAnalyzer<'a> {
    pool: &'a LexicalPool,
}

impl<'a> DimensionalAnalyzer<'a> {
    pub fn new(pool: &'a LexicalPool) -> Self {
        Self { pool }
    }

    /// Dimension of an operand/operator chain starting at `first`
    pub fn expression_dimension(&self, first: Option<UnitId>) -> DimResult {
        let Some(first) = first else {
            return Err(DimensionError::MissingArgument("calc".to_string()));
        };

        let mut acc: Option<Dimension> = None;
        let mut indeterminate = false;
        let mut pending: Option<LexicalKind> = None;

        for unit in self.pool.chain(first) {
            let kind = self.pool.kind(unit);
            if kind.is_algebraic_operator() {
                if acc.is_none() && !indeterminate && pending.is_some() {
                    return Err(DimensionError::DanglingOperator);
                }
                pending = Some(kind.clone());
                continue;
            }
            if matches!(kind, LexicalKind::OperatorComma) {
                // argument boundaries are split by the caller
                return Err(DimensionError::DanglingOperator);
            }

            let operand = self.unit_dimension(unit)?;
            let operand = match operand {
                Some(d) => d,
                None => {
                    indeterminate = true;
                    acc = None;
                    pending = None;
                    continue;
                }
            };
            if indeterminate {
                pending = None;
                continue;
            }

            acc = Some(match (acc, pending.take()) {
                (None, _) => operand,
                (Some(left), Some(op)) => self.combine(left, &op, operand, unit)?,
                // juxtaposed operands must still be mutually consistent
                (Some(left), None) => self.sum(left, operand)?,
            });
        }

        if pending.is_some() {
            return Err(DimensionError::DanglingOperator);
        }
        if indeterminate {
            return Ok(None);
        }
        Ok(acc.map(Dimension::normalized))
    }

    fn combine(&self, left: Dimension, op: &LexicalKind, right: Dimension, right_unit: UnitId) -> Result<Dimension, DimensionError> {
        match op {
            LexicalKind::OperatorPlus | LexicalKind::OperatorMinus => self.sum(left, right),
            LexicalKind::OperatorMultiply => self.product(left, right, false),
            LexicalKind::OperatorSlash => self.product(left, right, true),
            LexicalKind::OperatorExp => {
                // the right operand must be a literal integer
                match self.pool.kind(right_unit) {
                    LexicalKind::Integer(n) => {
                        let mut d = left;
                        d.exponent *= n;
                        Ok(d)
                    }
                    _ => Err(DimensionError::InvalidExponent("^".to_string())),
                }
            }
            _ => Err(DimensionError::DanglingOperator),
        }
    }

    /// Addition/subtraction: operand dimensions must be equal, except that a
    /// length and a percentage sum to a CSS-native length-percentage
    fn sum(&self, left: Dimension, right: Dimension) -> Result<Dimension, DimensionError> {
        if left.category == right.category {
            if left.exponent != right.exponent {
                return Err(DimensionError::Incompatible(left.category, right.category));
            }
            let mut d = left;
            d.approximate |= right.approximate;
            d.css_native |= right.css_native;
            return Ok(d);
        }

        if Self::is_length_percentage_pair(left.category, right.category) {
            if left.exponent != right.exponent {
                return Err(DimensionError::Incompatible(left.category, right.category));
            }
            let mut d = Dimension::new(Category::LengthPercentage, left.exponent);
            d.css_native = true;
            d.approximate = left.approximate || right.approximate;
            return Ok(d);
        }

        Err(DimensionError::Incompatible(left.category, right.category))
    }

    fn is_length_percentage_pair(a: Category, b: Category) -> bool {
        let lp = |c| matches!(c, Category::Length | Category::Percentage | Category::LengthPercentage);
        lp(a) && lp(b)
    }

    /// Multiplication/division: exponents add/subtract
    fn product(&self, left: Dimension, right: Dimension, divide: bool) -> Result<Dimension, DimensionError> {
        let r_exp = if divide { -right.exponent } else { right.exponent };

        let category = if left.category == Category::Number && left.exponent == 0 {
            right.category
        } else if right.category == Category::Number && right.exponent == 0 {
            left.category
        } else if left.category == right.category {
            left.category
        } else if Self::is_length_percentage_pair(left.category, right.category) {
            Category::LengthPercentage
        } else {
            return Err(DimensionError::Incompatible(left.category, right.category));
        };

        let mut d = Dimension::new(category, left.exponent + r_exp);
        d.approximate = left.approximate || right.approximate;
        d.css_native = left.css_native || right.css_native;
        Ok(d.normalized())
    }

    /// Dimension of a single operand
    pub fn unit_dimension(&self, id: UnitId) -> DimResult {
        match self.pool.kind(id) {
            LexicalKind::Integer(_) | LexicalKind::Real(_) => Ok(Some(Dimension::number())),
            LexicalKind::Percentage(_) => Ok(Some(Dimension::new(Category::Percentage, 1))),
            LexicalKind::Dimension { unit, .. } => match unit_category(unit) {
                Some(category) => Ok(Some(Dimension::new(category, 1))),
                None => Err(DimensionError::UnknownUnit(unit.clone())),
            },
            LexicalKind::Var => Ok(None),
            LexicalKind::Attr => Ok(self.attr_dimension(id)),
            LexicalKind::Env => Ok(None),
            LexicalKind::SubExpression => self.expression_dimension(self.pool.parameters(id)),
            LexicalKind::MathFunction { name, index } => self.function_dimension(id, name, *index),
            // idents (e.g. rounding strategies, `e`, `pi`) are dimensionless
            LexicalKind::Ident(_) => Ok(Some(Dimension::number())),
            kind => Err(DimensionError::Incompatible(
                Category::Number,
                // no meaningful category; report as a unit failure
                match kind {
                    LexicalKind::QuotedString(_) => Category::String,
                    _ => Category::Universal,
                },
            )),
        }
    }

    /// `attr()` can only be classified when its `type()` or unit component
    /// pins the category down; everything else stays indeterminate
    fn attr_dimension(&self, id: UnitId) -> Option<Dimension> {
        let mut params = self.pool.params(id);
        let _name = params.next()?;

        let declared = params.find(|p| !matches!(self.pool.kind(*p), LexicalKind::OperatorComma))?;
        match self.pool.kind(declared) {
            LexicalKind::Syntax(chain) => {
                if chain.components.len() != 1 {
                    return None;
                }
                let category = chain.components[0].category;
                match category {
                    Category::Length | Category::Percentage | Category::LengthPercentage | Category::Angle
                    | Category::Time | Category::Frequency | Category::Resolution | Category::Flex => {
                        Some(Dimension::new(category, 1))
                    }
                    Category::Number | Category::Integer => Some(Dimension::number()),
                    _ => None,
                }
            }
            LexicalKind::Ident(unit_name) => unit_category(unit_name).map(|c| Dimension::new(c, 1)),
            _ => None,
        }
    }

    /// Split a parameter chain on top-level commas
    fn split_arguments(&self, id: UnitId) -> Vec<Vec<UnitId>> {
        let mut args = Vec::new();
        let mut cur = Vec::new();
        for unit in self.pool.params(id) {
            if matches!(self.pool.kind(unit), LexicalKind::OperatorComma) {
                args.push(std::mem::take(&mut cur));
            } else {
                cur.push(unit);
            }
        }
        if !cur.is_empty() || !args.is_empty() {
            args.push(cur);
        }
        args
    }

    /// Dimension of a sub-chain given as a comma-split slice of units
    fn slice_dimension(&self, units: &[UnitId]) -> DimResult {
        let mut acc: Option<Dimension> = None;
        let mut indeterminate = false;
        let mut pending: Option<LexicalKind> = None;

        for &unit in units {
            let kind = self.pool.kind(unit);
            if kind.is_algebraic_operator() {
                pending = Some(kind.clone());
                continue;
            }

            let operand = match self.unit_dimension(unit)? {
                Some(d) => d,
                None => {
                    indeterminate = true;
                    acc = None;
                    pending = None;
                    continue;
                }
            };
            if indeterminate {
                pending = None;
                continue;
            }

            acc = Some(match (acc, pending.take()) {
                (None, _) => operand,
                (Some(left), Some(op)) => self.combine(left, &op, operand, unit)?,
                (Some(left), None) => self.sum(left, operand)?,
            });
        }

        if pending.is_some() {
            return Err(DimensionError::DanglingOperator);
        }
        if indeterminate {
            return Ok(None);
        }
        Ok(acc.map(Dimension::normalized))
    }

    fn function_dimension(&self, id: UnitId, name: &str, index: MathIndex) -> DimResult {
        let args = self.split_arguments(id);
        let check_arity = |min: usize| {
            if args.len() < min {
                Err(DimensionError::MissingArgument(name.to_string()))
            } else {
                Ok(())
            }
        };

        match index {
            MathIndex::Calc => self.expression_dimension(self.pool.parameters(id)),
            MathIndex::Min | MathIndex::Max | MathIndex::Clamp | MathIndex::Round | MathIndex::Mod
            | MathIndex::Rem | MathIndex::Hypot | MathIndex::AnchorSize => {
                let (_, min_args, _) = MATH_FUNCTIONS
                    .get(name)
                    .copied()
                    .unwrap_or((index, 1, usize::MAX));
                check_arity(min_args)?;
                let base = if index == MathIndex::AnchorSize {
                    Some(Dimension::new(Category::Length, 1))
                } else {
                    None
                };
                self.scaling_dimension(&args, base, name)
            }
            MathIndex::Abs => {
                check_arity(1)?;
                self.slice_dimension(&args[0])
            }
            MathIndex::Sign | MathIndex::Exp | MathIndex::Log => {
                check_arity(1)?;
                match self.slice_dimension(&args[0])? {
                    None => Ok(None),
                    Some(_) => Ok(Some(Dimension::number())),
                }
            }
            MathIndex::Sin | MathIndex::Cos | MathIndex::Tan => {
                check_arity(1)?;
                match self.slice_dimension(&args[0])? {
                    None => Ok(None),
                    Some(d) if matches!(d.category, Category::Angle | Category::Number) => {
                        Ok(Some(Dimension::number()))
                    }
                    Some(d) => Err(DimensionError::Incompatible(Category::Angle, d.category)),
                }
            }
            MathIndex::Asin | MathIndex::Acos | MathIndex::Atan | MathIndex::Atan2 => {
                check_arity(if index == MathIndex::Atan2 { 2 } else { 1 })?;
                for arg in &args {
                    if self.slice_dimension(arg)?.is_none() {
                        return Ok(None);
                    }
                }
                Ok(Some(Dimension::new(Category::Angle, 1)))
            }
            MathIndex::Pow => {
                check_arity(2)?;
                let base = match self.slice_dimension(&args[0])? {
                    Some(d) => d,
                    None => return Ok(None),
                };
                let exponent_literal = args[1]
                    .iter()
                    .map(|u| self.pool.kind(*u))
                    .find(|k| matches!(k, LexicalKind::Integer(_) | LexicalKind::Real(_)));
                match exponent_literal {
                    Some(LexicalKind::Integer(n)) => {
                        let mut d = base;
                        d.exponent *= n;
                        Ok(Some(d.normalized()))
                    }
                    Some(LexicalKind::Real(r)) => {
                        let scaled = (base.exponent as f32) * r;
                        let mut d = base;
                        d.approximate = true;
                        d.exponent = scaled.round() as i32;
                        if (scaled - scaled.round()).abs() > 1.0e-6 {
                            return Err(DimensionError::InvalidExponent(name.to_string()));
                        }
                        Ok(Some(d.normalized()))
                    }
                    _ => Err(DimensionError::InvalidExponent(name.to_string())),
                }
            }
            MathIndex::Sqrt => {
                check_arity(1)?;
                let base = match self.slice_dimension(&args[0])? {
                    Some(d) => d,
                    None => return Ok(None),
                };
                if base.exponent % 2 != 0 {
                    if !base.approximate {
                        return Err(DimensionError::InvalidExponent(name.to_string()));
                    }
                    let mut d = base;
                    d.exponent = (base.exponent + 1) / 2;
                    return Ok(Some(d.normalized()));
                }
                let mut d = base;
                d.exponent = base.exponent / 2;
                Ok(Some(d.normalized()))
            }
        }
    }

    /// Multi-argument scaling functions take the dimension of whichever
    /// argument actually carries one. The first argument's dimension wins
    /// unless it is indeterminate; remaining arguments must stay consistent
    /// under the sum rule.
    fn scaling_dimension(&self, args: &[Vec<UnitId>], base: Option<Dimension>, name: &str) -> DimResult {
        let mut result = base;
        let mut saw_indeterminate = false;

        for arg in args {
            if arg.is_empty() {
                return Err(DimensionError::MissingArgument(name.to_string()));
            }
            // rounding strategy keywords and similar idents do not take part
            if arg.len() == 1 && matches!(self.pool.kind(arg[0]), LexicalKind::Ident(_)) {
                continue;
            }

            match self.slice_dimension(arg)? {
                None => saw_indeterminate = true,
                Some(d) => {
                    result = Some(match result {
                        None => d,
                        Some(cur) => self.sum(cur, d)?,
                    });
                }
            }
        }

        if result.is_none() && saw_indeterminate {
            return Ok(None);
        }
        match result {
            Some(d) => Ok(Some(d.normalized())),
            None => Err(DimensionError::MissingArgument(name.to_string())),
        }
    }
}

impl crate::unit::LexicalValue {
    /// Dimension of the whole value chain
    pub fn dimension(&self) -> DimResult {
        DimensionalAnalyzer::new(self.pool()).expression_dimension(self.first_unit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Css3Parser;

    fn dimension_of(css: &str) -> DimResult {
        let value = Css3Parser::default().parse_value(css).unwrap();
        let first = value.first_unit().unwrap();
        let analyzer = DimensionalAnalyzer::new(value.pool());
        analyzer.unit_dimension(first)
    }

    #[test]
    fn length_plus_percentage_is_css_native() {
        let dim = dimension_of("calc(1px + 1%)").unwrap().unwrap();
        assert_eq!(dim.category, Category::LengthPercentage);
        assert_eq!(dim.exponent, 1);
        assert!(dim.css_native);
    }

    #[test]
    fn length_plus_time_fails() {
        let err = dimension_of("calc(1px + 1s)").unwrap_err();
        assert!(matches!(err, DimensionError::Incompatible(..)));
    }

    #[test]
    fn length_plus_bare_number_fails() {
        let err = dimension_of("calc(1px + 1)").unwrap_err();
        assert!(matches!(err, DimensionError::Incompatible(..)));
    }

    #[test]
    fn pow_multiplies_the_exponent() {
        let dim = dimension_of("pow(2px, 3)").unwrap().unwrap();
        assert_eq!(dim.category, Category::Length);
        assert_eq!(dim.exponent, 3);
    }

    #[test]
    fn sqrt_halves_even_exponents() {
        let dim = dimension_of("sqrt(4px*1px*1px*1px)").unwrap().unwrap();
        assert_eq!(dim.category, Category::Length);
        assert_eq!(dim.exponent, 2);
    }

    #[test]
    fn sqrt_of_odd_exponent_fails_without_slack() {
        let err = dimension_of("sqrt(4px*1px*1px)").unwrap_err();
        assert!(matches!(err, DimensionError::InvalidExponent(_)));
    }

    #[test]
    fn var_makes_the_dimension_indeterminate() {
        assert_eq!(dimension_of("calc(1px + var(--x))").unwrap(), None);
        assert_eq!(dimension_of("calc(var(--x) * 2)").unwrap(), None);
    }

    #[test]
    fn division_subtracts_exponents() {
        let dim = dimension_of("calc(1px * 1px / 1px)").unwrap().unwrap();
        assert_eq!(dim.category, Category::Length);
        assert_eq!(dim.exponent, 1);

        let dim = dimension_of("calc(1px / 1px)").unwrap().unwrap();
        assert_eq!(dim.category, Category::Number);
        assert_eq!(dim.exponent, 0);
    }

    #[test]
    fn clamp_requires_consistent_arguments() {
        let dim = dimension_of("clamp(1px, 2%, 3px)").unwrap().unwrap();
        assert_eq!(dim.category, Category::LengthPercentage);

        let err = dimension_of("clamp(1px, 2s, 3px)").unwrap_err();
        assert!(matches!(err, DimensionError::Incompatible(..)));
    }

    #[test]
    fn round_ignores_strategy_keyword() {
        let dim = dimension_of("round(nearest, 1px, 2px)").unwrap().unwrap();
        assert_eq!(dim.category, Category::Length);
        assert_eq!(dim.exponent, 1);
    }

    #[test]
    fn first_argument_dimension_wins_unless_indeterminate() {
        // first argument carries var(): the second argument decides
        let dim = dimension_of("min(var(--a), 2px)").unwrap().unwrap();
        assert_eq!(dim.category, Category::Length);
    }

    #[test]
    fn trig_yields_number_and_inverse_trig_yields_angle() {
        let dim = dimension_of("sin(45deg)").unwrap().unwrap();
        assert_eq!(dim.category, Category::Number);

        let dim = dimension_of("atan2(1px, 2px)").unwrap().unwrap();
        assert_eq!(dim.category, Category::Angle);
    }

    #[test]
    fn missing_arguments_are_reported() {
        let err = dimension_of("clamp(1px)").unwrap_err();
        assert!(matches!(err, DimensionError::MissingArgument(_)));
    }
}
