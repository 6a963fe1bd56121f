//! Three-valued matching of lexical values against custom-property grammars.
//!
//! A grammar is a [`SyntaxChain`] of alternatives; each alternative names a
//! category (or a keyword) and a repetition multiplier. Matching a value
//! against the chain yields [`Match::True`] when any alternative definitely
//! accepts the value, [`Match::Pending`] when the verdict depends on a value
//! only known at computed-value time (`var()`, untyped `attr()`, unresolved
//! `env()`), and [`Match::False`] otherwise.

use crate::dimension::{unit_category, DimensionalAnalyzer};
use crate::syntax::{Category, Multiplier, SyntaxChain, SyntaxComponent};
use crate::unit::{LexicalKind, LexicalPool, LexicalValue, UnitId};

/// The tri-state match verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    True,
    False,
    Pending,
}

impl Match {
    /// `a OR b` over alternatives: one definite acceptance wins, an
    /// indeterminate operand blocks the collapse to `False`
    fn either(self, other: Match) -> Match {
        match (self, other) {
            (Match::True, _) | (_, Match::True) => Match::True,
            (Match::Pending, _) | (_, Match::Pending) => Match::Pending,
            _ => Match::False,
        }
    }

    /// `a AND b` over list items: one definite rejection wins
    fn both(self, other: Match) -> Match {
        match (self, other) {
            (Match::False, _) | (_, Match::False) => Match::False,
            (Match::Pending, _) | (_, Match::Pending) => Match::Pending,
            _ => Match::True,
        }
    }
}

/// Resolver for `env()` variables, injected by the embedder. The parser
/// itself never knows what environment variables exist.
pub trait EnvironmentResolver {
    /// Grammar category the named variable resolves to, when known
    fn category(&self, name: &str) -> Option<Category>;
}

/// A resolver that knows nothing; every `env()` stays pending
pub struct NoEnvironment;

impl EnvironmentResolver for NoEnvironment {
    fn category(&self, _name: &str) -> Option<Category> {
        None
    }
}

pub struct SyntaxMatcher<'a> {
    pool: &'a LexicalPool,
    env: &'a dyn EnvironmentResolver,
}

impl<'a> SyntaxMatcher<'a> {
    pub fn new(pool: &'a LexicalPool) -> Self {
        Self {
            pool,
            env: &NoEnvironment,
        }
    }

    pub fn with_environment(pool: &'a LexicalPool, env: &'a dyn EnvironmentResolver) -> Self {
        Self { pool, env }
    }

    /// Match a unit chain against a full grammar chain
    pub fn match_chain(&self, first: Option<UnitId>, syntax: &SyntaxChain) -> Match {
        if syntax.is_universal() {
            return Match::True;
        }
        let Some(first) = first else {
            return Match::False;
        };

        let units: Vec<UnitId> = self.pool.chain(first).collect();
        let mut verdict = Match::False;
        for component in &syntax.components {
            verdict = verdict.either(self.match_component(&units, component, syntax));
            if verdict == Match::True {
                return verdict;
            }
        }
        verdict
    }

    fn match_component(&self, units: &[UnitId], component: &SyntaxComponent, syntax: &SyntaxChain) -> Match {
        match component.multiplier {
            Multiplier::Once => {
                if units.len() != 1 {
                    return Match::False;
                }
                self.match_unit(units[0], component, syntax)
            }
            Multiplier::SpaceList => {
                // no commas allowed anywhere in the chain
                let mut verdict = Match::True;
                for &unit in units {
                    if matches!(self.pool.kind(unit), LexicalKind::OperatorComma) {
                        return Match::False;
                    }
                    verdict = verdict.both(self.match_unit(unit, component, syntax));
                    if verdict == Match::False {
                        return verdict;
                    }
                }
                verdict
            }
            Multiplier::CommaList => {
                // items separated by single commas, no leading/trailing comma
                let mut verdict = Match::True;
                let mut expecting_item = true;
                for &unit in units {
                    if matches!(self.pool.kind(unit), LexicalKind::OperatorComma) {
                        if expecting_item {
                            return Match::False;
                        }
                        expecting_item = true;
                        continue;
                    }
                    if !expecting_item {
                        // two items without a comma between them
                        return Match::False;
                    }
                    expecting_item = false;
                    verdict = verdict.both(self.match_unit(unit, component, syntax));
                    if verdict == Match::False {
                        return verdict;
                    }
                }
                if expecting_item {
                    return Match::False;
                }
                verdict
            }
        }
    }

    /// Match a single unit against one alternative. The full chain is also
    /// passed so the length-percentage duality can inspect its siblings.
    fn match_unit(&self, unit: UnitId, component: &SyntaxComponent, syntax: &SyntaxChain) -> Match {
        let kind = self.pool.kind(unit);

        // deferred substitutions match everything as pending
        if matches!(kind, LexicalKind::Var | LexicalKind::Attr) {
            return Match::Pending;
        }
        if matches!(kind, LexicalKind::Env) {
            return self.match_env(unit, component);
        }
        if let LexicalKind::PrefixedFunction(_) = kind {
            return Match::False;
        }

        match component.category {
            Category::Universal => Match::True,
            Category::Ident => match (kind, &component.ident) {
                (LexicalKind::Ident(name), Some(keyword)) => {
                    if name.eq_ignore_ascii_case(keyword) {
                        Match::True
                    } else {
                        Match::False
                    }
                }
                _ => Match::False,
            },
            Category::CustomIdent => match kind {
                LexicalKind::Ident(_) => Match::True,
                _ => Match::False,
            },
            Category::String => match kind {
                LexicalKind::QuotedString(_) => Match::True,
                _ => Match::False,
            },
            Category::Url => match kind {
                LexicalKind::Uri(_) => Match::True,
                _ => Match::False,
            },
            Category::Image => match kind {
                LexicalKind::Uri(_) | LexicalKind::Gradient(_) | LexicalKind::ElementReference(_) => Match::True,
                _ => Match::False,
            },
            Category::Color => match kind {
                LexicalKind::RgbColor
                | LexicalKind::HslColor
                | LexicalKind::HwbColor
                | LexicalKind::LabColor
                | LexicalKind::LchColor
                | LexicalKind::OklabColor
                | LexicalKind::OklchColor
                | LexicalKind::ColorFunction
                | LexicalKind::ColorMix => Match::True,
                _ => Match::False,
            },
            Category::TransformFunction => match kind {
                LexicalKind::TransformFunction(_) => Match::True,
                _ => Match::False,
            },
            Category::TransformList => match kind {
                LexicalKind::TransformFunction(_) => Match::True,
                _ => Match::False,
            },
            Category::Counter => match kind {
                LexicalKind::CounterFunction | LexicalKind::CountersFunction => Match::True,
                _ => Match::False,
            },
            Category::UnicodeRange => match kind {
                LexicalKind::UnicodeRange => Match::True,
                _ => Match::False,
            },
            Category::Integer => match kind {
                LexicalKind::Integer(_) => Match::True,
                LexicalKind::MathFunction { .. } | LexicalKind::SubExpression => {
                    self.match_numeric(unit, Category::Integer, syntax)
                }
                _ => Match::False,
            },
            Category::Number => match kind {
                LexicalKind::Integer(_) | LexicalKind::Real(_) => Match::True,
                LexicalKind::MathFunction { .. } | LexicalKind::SubExpression => {
                    self.match_numeric(unit, Category::Number, syntax)
                }
                _ => Match::False,
            },
            Category::Percentage
            | Category::Length
            | Category::LengthPercentage
            | Category::Angle
            | Category::Time
            | Category::Frequency
            | Category::Resolution
            | Category::Flex => self.match_dimensional(unit, component.category, syntax),
        }
    }

    fn match_env(&self, unit: UnitId, component: &SyntaxComponent) -> Match {
        if component.category == Category::Universal {
            return Match::True;
        }
        let name = self
            .pool
            .params(unit)
            .next()
            .and_then(|p| match self.pool.kind(p) {
                LexicalKind::Ident(name) => Some(name.clone()),
                _ => None,
            });
        let Some(name) = name else {
            return Match::Pending;
        };
        match self.env.category(&name) {
            Some(category) if category == component.category => Match::True,
            Some(Category::Length | Category::Percentage)
                if component.category == Category::LengthPercentage =>
            {
                Match::True
            }
            Some(_) => Match::False,
            None => Match::Pending,
        }
    }

    /// A numeric alternative against a math expression
    fn match_numeric(&self, unit: UnitId, wanted: Category, _syntax: &SyntaxChain) -> Match {
        let analyzer = DimensionalAnalyzer::new(self.pool);
        match analyzer.unit_dimension(unit) {
            Err(_) => Match::False,
            Ok(None) => Match::Pending,
            Ok(Some(dim)) => {
                if dim.category == Category::Number && dim.exponent == 0 {
                    // integer-ness of a calc() result is not decidable here;
                    // css-values treats a number-valued calc as matching both
                    if wanted == Category::Integer || wanted == Category::Number {
                        Match::True
                    } else {
                        Match::False
                    }
                } else {
                    Match::False
                }
            }
        }
    }

    /// A dimensioned alternative, including the length-percentage duality
    fn match_dimensional(&self, unit: UnitId, wanted: Category, syntax: &SyntaxChain) -> Match {
        let direct = match self.pool.kind(unit) {
            LexicalKind::Percentage(_) => Some(Category::Percentage),
            LexicalKind::Dimension { unit: u, .. } => unit_category(u),
            LexicalKind::Integer(0) if wanted == Category::Length => {
                // zero is a valid length
                return Match::True;
            }
            LexicalKind::MathFunction { .. } | LexicalKind::SubExpression => None,
            _ => return Match::False,
        };

        if let Some(actual) = direct {
            return self.category_verdict(actual, wanted, false, syntax);
        }

        let analyzer = DimensionalAnalyzer::new(self.pool);
        match analyzer.unit_dimension(unit) {
            Err(_) => Match::False,
            Ok(None) => Match::Pending,
            Ok(Some(dim)) => {
                if dim.exponent != 1 {
                    return Match::False;
                }
                self.category_verdict(dim.category, wanted, dim.css_native, syntax)
            }
        }
    }

    fn category_verdict(&self, actual: Category, wanted: Category, css_native: bool, syntax: &SyntaxChain) -> Match {
        if actual == wanted {
            return Match::True;
        }
        match (actual, wanted) {
            (Category::Length | Category::Percentage, Category::LengthPercentage) => Match::True,
            // a computed length-percentage sum matches a plain length or
            // percentage alternative only when the grammar carries both
            // halves of the duality, so either way resolution can succeed
            (Category::LengthPercentage, Category::Length | Category::Percentage) => {
                if css_native
                    && syntax.has_category(Category::Length)
                    && syntax.has_category(Category::Percentage)
                {
                    Match::True
                } else {
                    Match::False
                }
            }
            _ => Match::False,
        }
    }
}

impl LexicalValue {
    /// Match this value against a parsed grammar chain
    pub fn matches(&self, syntax: &SyntaxChain) -> Match {
        SyntaxMatcher::new(self.pool()).match_chain(self.first_unit(), syntax)
    }

    /// Match with an embedder-supplied `env()` resolver
    pub fn matches_with_environment(&self, syntax: &SyntaxChain, env: &dyn EnvironmentResolver) -> Match {
        SyntaxMatcher::with_environment(self.pool(), env).match_chain(self.first_unit(), syntax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax;
    use crate::Css3Parser;

    fn verdict(css: &str, grammar: &str) -> Match {
        let value = Css3Parser::default().parse_value(css).unwrap();
        let chain = syntax::parse(grammar).unwrap();
        value.matches(&chain)
    }

    #[test]
    fn universal_matches_everything() {
        assert_eq!(verdict("12px", "*"), Match::True);
        assert_eq!(verdict("var(--x)", "*"), Match::True);
    }

    #[test]
    fn var_is_pending_against_concrete_grammars() {
        assert_eq!(verdict("var(--x)", "<length>"), Match::Pending);
        assert_eq!(verdict("var(--x)", "<color>"), Match::Pending);
    }

    #[test]
    fn literal_categories_match_their_tags() {
        assert_eq!(verdict("12px", "<length>"), Match::True);
        assert_eq!(verdict("50%", "<percentage>"), Match::True);
        assert_eq!(verdict("12px", "<percentage>"), Match::False);
        assert_eq!(verdict("\"hi\"", "<string>"), Match::True);
        assert_eq!(verdict("url(a.png)", "<url> | <image>"), Match::True);
        assert_eq!(verdict("#abc", "<color>"), Match::True);
    }

    #[test]
    fn keywords_match_case_insensitively() {
        assert_eq!(verdict("auto", "auto | <length>"), Match::True);
        assert_eq!(verdict("AUTO", "auto | <length>"), Match::True);
        assert_eq!(verdict("none", "auto | <length>"), Match::False);
    }

    #[test]
    fn length_percentage_duality() {
        // a native length-percentage sum needs both halves in the grammar
        assert_eq!(verdict("calc(1px + 2%)", "<length> | <percentage>"), Match::True);
        assert_eq!(verdict("calc(1px + 2%)", "<length>"), Match::False);
        assert_eq!(verdict("calc(1px + 2%)", "<length-percentage>"), Match::True);
        assert_eq!(verdict("calc(1px + 2px)", "<length>"), Match::True);
    }

    #[test]
    fn calc_with_var_is_pending() {
        assert_eq!(verdict("calc(1px + var(--x))", "<length>"), Match::Pending);
    }

    #[test]
    fn prefixed_functions_never_match_concrete_categories() {
        assert_eq!(verdict("-webkit-gradient(linear)", "<image>"), Match::False);
        assert_eq!(verdict("-webkit-gradient(linear)", "*"), Match::True);
    }

    #[test]
    fn multipliers_cover_lists() {
        assert_eq!(verdict("1px 2px 3px", "<length>+"), Match::True);
        assert_eq!(verdict("1px, 2px", "<length>+"), Match::False);
        assert_eq!(verdict("1px, 2px", "<length>#"), Match::True);
        assert_eq!(verdict("1px 2px", "<length>"), Match::False);
        assert_eq!(verdict("1px, var(--x)", "<length>#"), Match::Pending);
    }

    struct Viewport;
    impl EnvironmentResolver for Viewport {
        fn category(&self, name: &str) -> Option<Category> {
            (name == "safe-area-inset-top").then_some(Category::Length)
        }
    }

    #[test]
    fn env_defers_to_the_resolver() {
        let value = Css3Parser::default().parse_value("env(safe-area-inset-top)").unwrap();
        let chain = syntax::parse("<length>").unwrap();
        assert_eq!(value.matches(&chain), Match::Pending);
        assert_eq!(value.matches_with_environment(&chain, &Viewport), Match::True);

        let chain = syntax::parse("<color>").unwrap();
        assert_eq!(value.matches_with_environment(&chain, &Viewport), Match::False);
    }
}
