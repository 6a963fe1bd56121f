//! The lexical-unit model: the parsed representation of CSS component
//! values.
//!
//! Units live in a [`LexicalPool`] arena and are addressed by [`UnitId`].
//! Each node carries a closed [`LexicalKind`] tag plus the four structural
//! links of the model: `next`/`prev` sibling links, a `parameters` link to
//! the first child of a function argument list, and an `owner` back link to
//! the enclosing function unit. A unit with `owner == None` is a root unit;
//! a unit with a `parameters` link is function-like.

use crate::syntax::SyntaxChain;
use serde::Serialize;

pub type Number = f32;

/// Index of a unit inside its [`LexicalPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct UnitId(u32);

impl UnitId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The math functions the dimensional analyzer understands, used as the
/// function index on [`LexicalKind::MathFunction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MathIndex {
    Calc,
    Min,
    Max,
    Clamp,
    Round,
    Mod,
    Rem,
    Hypot,
    Abs,
    Sign,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Pow,
    Sqrt,
    Exp,
    Log,
    AnchorSize,
}

/// Variant tag of a lexical unit. The set is fixed by the CSS grammar, so
/// this is a closed enum with exhaustive matching in the serializer, the
/// dimensional analyzer and the syntax matcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LexicalKind {
    Integer(i32),
    Real(Number),
    Percentage(Number),
    Dimension { value: Number, unit: String },
    Ident(String),
    QuotedString(String),
    Uri(String),
    /// `U+XXXX[-XXXX]` literal; the bounds live in the parameter chain
    UnicodeRange,
    /// A unicode-range pattern with a trailing wildcard run, e.g. `12??`
    UnicodeWildcard(String),
    Inherit,
    Initial,
    Unset,
    Revert,
    OperatorComma,
    OperatorSlash,
    OperatorPlus,
    OperatorMinus,
    OperatorMultiply,
    OperatorExp,
    /// A parenthesized group inside an algebraic expression
    SubExpression,
    /// A function the parser has no special knowledge of
    Function(String),
    /// A vendor-extension function (`-webkit-...`), never matching any
    /// concrete grammar category
    PrefixedFunction(String),
    MathFunction { name: String, index: MathIndex },
    Var,
    Attr,
    Env,
    RgbColor,
    HslColor,
    HwbColor,
    LabColor,
    LchColor,
    OklabColor,
    OklchColor,
    ColorFunction,
    ColorMix,
    CounterFunction,
    CountersFunction,
    CubicBezier,
    Steps,
    Rect,
    ElementReference(String),
    Gradient(String),
    TransformFunction(String),
    /// A `type()` syntax descriptor, as found inside `attr()`
    Syntax(SyntaxChain),
    /// Placeholder for an empty argument slot
    Empty,
}

impl LexicalKind {
    /// True for function-like kinds, i.e. anything that may own parameters
    pub fn is_function(&self) -> bool {
        self.function_name().is_some() || matches!(self, LexicalKind::SubExpression | LexicalKind::UnicodeRange)
    }

    /// The serialized function name, for function-like kinds
    pub fn function_name(&self) -> Option<&str> {
        match self {
            LexicalKind::Function(name)
            | LexicalKind::PrefixedFunction(name)
            | LexicalKind::MathFunction { name, .. }
            | LexicalKind::Gradient(name)
            | LexicalKind::TransformFunction(name) => Some(name),
            LexicalKind::Var => Some("var"),
            LexicalKind::Attr => Some("attr"),
            LexicalKind::Env => Some("env"),
            LexicalKind::RgbColor => Some("rgb"),
            LexicalKind::HslColor => Some("hsl"),
            LexicalKind::HwbColor => Some("hwb"),
            LexicalKind::LabColor => Some("lab"),
            LexicalKind::LchColor => Some("lch"),
            LexicalKind::OklabColor => Some("oklab"),
            LexicalKind::OklchColor => Some("oklch"),
            LexicalKind::ColorFunction => Some("color"),
            LexicalKind::ColorMix => Some("color-mix"),
            LexicalKind::CounterFunction => Some("counter"),
            LexicalKind::CountersFunction => Some("counters"),
            LexicalKind::CubicBezier => Some("cubic-bezier"),
            LexicalKind::Steps => Some("steps"),
            LexicalKind::Rect => Some("rect"),
            _ => None,
        }
    }

    /// True for the color function kinds, whose alpha slash serializes
    /// with surrounding spaces
    pub fn is_color_function(&self) -> bool {
        matches!(
            self,
            LexicalKind::RgbColor
                | LexicalKind::HslColor
                | LexicalKind::HwbColor
                | LexicalKind::LabColor
                | LexicalKind::LchColor
                | LexicalKind::OklabColor
                | LexicalKind::OklchColor
                | LexicalKind::ColorFunction
                | LexicalKind::ColorMix
        )
    }

    /// True for the algebraic operator kinds
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            LexicalKind::OperatorComma
                | LexicalKind::OperatorSlash
                | LexicalKind::OperatorPlus
                | LexicalKind::OperatorMinus
                | LexicalKind::OperatorMultiply
                | LexicalKind::OperatorExp
        )
    }

    /// True for operators that leave a dangling expression when they end a
    /// parameter chain
    pub fn is_algebraic_operator(&self) -> bool {
        matches!(
            self,
            LexicalKind::OperatorSlash
                | LexicalKind::OperatorPlus
                | LexicalKind::OperatorMinus
                | LexicalKind::OperatorMultiply
                | LexicalKind::OperatorExp
        )
    }
}

/// A single arena node
#[derive(Debug, Clone, PartialEq, Serialize)]
struct UnitData {
    kind: LexicalKind,
    parameters: Option<UnitId>,
    next: Option<UnitId>,
    prev: Option<UnitId>,
    owner: Option<UnitId>,
    comments_before: Vec<String>,
    comments_after: Vec<String>,
}

impl UnitData {
    fn new(kind: LexicalKind) -> Self {
        Self {
            kind,
            parameters: None,
            next: None,
            prev: None,
            owner: None,
            comments_before: Vec::new(),
            comments_after: Vec::new(),
        }
    }
}

/// Arena owning a tree of lexical units
#[derive(Debug, Clone, Default, Serialize)]
pub struct LexicalPool {
    units: Vec<UnitData>,
}

impl LexicalPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: LexicalKind) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        self.units.push(UnitData::new(kind));
        id
    }

    fn data(&self, id: UnitId) -> &UnitData {
        &self.units[id.index()]
    }

    fn data_mut(&mut self, id: UnitId) -> &mut UnitData {
        &mut self.units[id.index()]
    }

    pub fn kind(&self, id: UnitId) -> &LexicalKind {
        &self.data(id).kind
    }

    pub fn set_kind(&mut self, id: UnitId, kind: LexicalKind) {
        self.data_mut(id).kind = kind;
    }

    pub fn next(&self, id: UnitId) -> Option<UnitId> {
        self.data(id).next
    }

    pub fn prev(&self, id: UnitId) -> Option<UnitId> {
        self.data(id).prev
    }

    pub fn owner(&self, id: UnitId) -> Option<UnitId> {
        self.data(id).owner
    }

    pub fn parameters(&self, id: UnitId) -> Option<UnitId> {
        self.data(id).parameters
    }

    /// Walk the sibling chain to its last unit
    pub fn chain_tail(&self, id: UnitId) -> UnitId {
        let mut cur = id;
        while let Some(next) = self.next(cur) {
            cur = next;
        }
        cur
    }

    /// Append `unit` at the end of the sibling chain containing `chain`.
    /// The new unit inherits the chain's owner.
    pub fn append(&mut self, chain: UnitId, unit: UnitId) {
        let tail = self.chain_tail(chain);
        let owner = self.owner(tail);
        self.data_mut(tail).next = Some(unit);
        let data = self.data_mut(unit);
        data.prev = Some(tail);
        data.owner = owner;
    }

    /// Append `unit` at the end of the parameter chain of `owner`
    pub fn add_parameter(&mut self, owner: UnitId, unit: UnitId) {
        match self.parameters(owner) {
            Some(first) => self.append(first, unit),
            None => {
                self.data_mut(owner).parameters = Some(unit);
                self.data_mut(unit).owner = Some(owner);
            }
        }
    }

    /// Number of units in the parameter chain of `owner`, counting operator
    /// units as parameters
    pub fn parameter_count(&self, owner: UnitId) -> usize {
        self.params(owner).count()
    }

    /// Iterator over a sibling chain starting at `first`
    pub fn chain(&self, first: UnitId) -> ChainIter<'_> {
        ChainIter {
            pool: self,
            cur: Some(first),
        }
    }

    /// Iterator over the parameter chain of `owner`
    pub fn params(&self, owner: UnitId) -> ChainIter<'_> {
        ChainIter {
            pool: self,
            cur: self.parameters(owner),
        }
    }

    pub fn push_comment_before(&mut self, id: UnitId, text: &str) {
        self.data_mut(id).comments_before.push(text.to_string());
    }

    pub fn push_comment_after(&mut self, id: UnitId, text: &str) {
        self.data_mut(id).comments_after.push(text.to_string());
    }

    pub fn comments_before(&self, id: UnitId) -> &[String] {
        &self.data(id).comments_before
    }

    pub fn comments_after(&self, id: UnitId) -> &[String] {
        &self.data(id).comments_after
    }

    /// Shallow clone: copies the unit and (recursively) its parameter
    /// subtree only. Sibling and owner links are not carried over; the
    /// clone is a root unit.
    pub fn shallow_clone(&mut self, id: UnitId) -> UnitId {
        let copy = self.alloc(self.data(id).kind.clone());
        self.data_mut(copy).comments_before = self.data(id).comments_before.clone();
        self.data_mut(copy).comments_after = self.data(id).comments_after.clone();

        let params: Vec<UnitId> = self.params(id).collect();
        for param in params {
            let param_copy = self.shallow_clone(param);
            self.add_parameter(copy, param_copy);
        }
        copy
    }

    /// Replace the unit `id` inside its chain with the (detached) unit
    /// `with`, splicing `with`'s own sibling chain into place. Used by
    /// substitution visitors rewriting e.g. `var()` references.
    pub fn replace(&mut self, id: UnitId, with: UnitId) {
        debug_assert!(self.prev(with).is_none());
        let prev = self.prev(id);
        let next = self.next(id);
        let owner = self.owner(id);
        let with_tail = self.chain_tail(with);

        for u in self.chain(with).collect::<Vec<_>>() {
            self.data_mut(u).owner = owner;
        }

        match prev {
            Some(p) => {
                self.data_mut(p).next = Some(with);
                self.data_mut(with).prev = Some(p);
            }
            None => {
                if let Some(o) = owner {
                    self.data_mut(o).parameters = Some(with);
                }
            }
        }
        if let Some(n) = next {
            self.data_mut(with_tail).next = Some(n);
            self.data_mut(n).prev = Some(with_tail);
        }

        let old = self.data_mut(id);
        old.next = None;
        old.prev = None;
        old.owner = None;
    }

    /// Deep-copy the chain starting at `first` into `target`, returning the
    /// id of the first copied unit
    pub fn copy_chain_into(&self, first: UnitId, target: &mut LexicalPool) -> UnitId {
        let mut head = None;
        let mut tail: Option<UnitId> = None;
        for unit in self.chain(first) {
            let copy = self.copy_unit_into(unit, target);
            match tail {
                Some(t) => target.append(t, copy),
                None => head = Some(copy),
            }
            tail = Some(copy);
        }
        // the chain iterator yields at least `first`
        head.unwrap_or_else(|| target.alloc(LexicalKind::Empty))
    }

    fn copy_unit_into(&self, id: UnitId, target: &mut LexicalPool) -> UnitId {
        let copy = target.alloc(self.data(id).kind.clone());
        target.data_mut(copy).comments_before = self.data(id).comments_before.clone();
        target.data_mut(copy).comments_after = self.data(id).comments_after.clone();
        if let Some(first_param) = self.parameters(id) {
            let param_copy = self.copy_chain_into(first_param, target);
            for u in target.chain(param_copy).collect::<Vec<_>>() {
                target.data_mut(u).owner = Some(copy);
            }
            target.data_mut(copy).parameters = Some(param_copy);
        }
        copy
    }

    /// Structural equality of two units (and their parameter subtrees),
    /// ignoring arena indices and comments
    pub fn tree_eq(&self, a: UnitId, other: &LexicalPool, b: UnitId) -> bool {
        if self.kind(a) != other.kind(b) {
            return false;
        }
        let mut pa = self.parameters(a);
        let mut pb = other.parameters(b);
        loop {
            match (pa, pb) {
                (None, None) => return true,
                (Some(ua), Some(ub)) => {
                    if !self.tree_eq(ua, other, ub) {
                        return false;
                    }
                    pa = self.next(ua);
                    pb = other.next(ub);
                }
                _ => return false,
            }
        }
    }

    /// Structural equality of two whole chains
    pub fn chain_eq(&self, a: UnitId, other: &LexicalPool, b: UnitId) -> bool {
        let mut ca = Some(a);
        let mut cb = Some(b);
        loop {
            match (ca, cb) {
                (None, None) => return true,
                (Some(ua), Some(ub)) => {
                    if !self.tree_eq(ua, other, ub) {
                        return false;
                    }
                    ca = self.next(ua);
                    cb = other.next(ub);
                }
                _ => return false,
            }
        }
    }

    /// CSS text of a single unit (including its parameters)
    pub fn css_text(&self, id: UnitId) -> String {
        let mut out = String::new();
        self.write_unit(id, &mut out, false);
        out
    }

    /// Minified CSS text of a single unit
    pub fn minified_text(&self, id: UnitId) -> String {
        let mut out = String::new();
        self.write_unit(id, &mut out, true);
        out
    }

    /// CSS text of the whole chain starting at `first`
    pub fn chain_text(&self, first: UnitId, minified: bool) -> String {
        let mut out = String::new();
        self.write_chain(first, &mut out, minified);
        out
    }

    fn write_chain(&self, first: UnitId, out: &mut String, minified: bool) {
        self.write_chain_spaced(first, out, minified, false);
    }

    fn write_chain_spaced(&self, first: UnitId, out: &mut String, minified: bool, spaced_slash: bool) {
        let mut prev_kind: Option<&LexicalKind> = None;
        for unit in self.chain(first) {
            let kind = self.kind(unit);
            if prev_kind.is_some() && Self::needs_space(prev_kind, kind, minified, spaced_slash) {
                out.push(' ');
            }
            self.write_unit(unit, out, minified);
            prev_kind = Some(kind);
        }
    }

    /// Whether a space is required between two adjacent units in a chain.
    /// Commas attach to the left; slashes attach on both sides except the
    /// non-minified alpha slash of color functions; the additive operators
    /// always keep their spaces since `calc(a -b)` does not mean
    /// `calc(a - b)`.
    fn needs_space(prev: Option<&LexicalKind>, cur: &LexicalKind, minified: bool, spaced_slash: bool) -> bool {
        match (prev, cur) {
            (_, LexicalKind::OperatorComma) => false,
            (Some(LexicalKind::OperatorComma), _) => !minified,
            (_, LexicalKind::OperatorSlash) | (Some(LexicalKind::OperatorSlash), _) => spaced_slash,
            (Some(LexicalKind::OperatorMultiply | LexicalKind::OperatorExp), _) if minified => false,
            (_, LexicalKind::OperatorMultiply | LexicalKind::OperatorExp) if minified => false,
            _ => true,
        }
    }

    fn write_unit(&self, id: UnitId, out: &mut String, minified: bool) {
        if !minified {
            for comment in self.comments_before(id) {
                out.push_str("/*");
                out.push_str(comment);
                out.push_str("*/ ");
            }
        }

        match self.kind(id) {
            LexicalKind::Integer(i) => out.push_str(&i.to_string()),
            LexicalKind::Real(r) => out.push_str(&format_number(*r)),
            LexicalKind::Percentage(p) => {
                out.push_str(&format_number(*p));
                out.push('%');
            }
            LexicalKind::Dimension { value, unit } => {
                out.push_str(&format_number(*value));
                out.push_str(unit);
            }
            LexicalKind::Ident(name) => out.push_str(name),
            LexicalKind::QuotedString(s) => {
                out.push('\'');
                out.push_str(&s.replace('\\', "\\\\").replace('\'', "\\'"));
                out.push('\'');
            }
            LexicalKind::Uri(url) => {
                out.push_str("url('");
                out.push_str(url);
                out.push_str("')");
            }
            LexicalKind::UnicodeRange => {
                out.push_str("U+");
                let mut first = true;
                for param in self.params(id) {
                    if !first {
                        out.push('-');
                    }
                    match self.kind(param) {
                        LexicalKind::Integer(cp) => out.push_str(&format!("{:X}", cp)),
                        LexicalKind::UnicodeWildcard(pattern) => out.push_str(pattern),
                        _ => {}
                    }
                    first = false;
                }
            }
            LexicalKind::UnicodeWildcard(pattern) => {
                out.push_str("U+");
                out.push_str(pattern);
            }
            LexicalKind::Inherit => out.push_str("inherit"),
            LexicalKind::Initial => out.push_str("initial"),
            LexicalKind::Unset => out.push_str("unset"),
            LexicalKind::Revert => out.push_str("revert"),
            LexicalKind::OperatorComma => out.push(','),
            LexicalKind::OperatorSlash => out.push('/'),
            LexicalKind::OperatorPlus => out.push('+'),
            LexicalKind::OperatorMinus => out.push('-'),
            LexicalKind::OperatorMultiply => out.push('*'),
            LexicalKind::OperatorExp => out.push('^'),
            LexicalKind::SubExpression => {
                out.push('(');
                if let Some(first) = self.parameters(id) {
                    self.write_chain(first, out, minified);
                }
                out.push(')');
            }
            LexicalKind::Syntax(chain) => {
                out.push_str("type(");
                out.push_str(&chain.to_string());
                out.push(')');
            }
            LexicalKind::ElementReference(name) => {
                out.push_str("element(#");
                out.push_str(name);
                out.push(')');
            }
            LexicalKind::Empty => {}
            kind => {
                // everything else is function-like and serializes by name
                if let Some(name) = kind.function_name() {
                    out.push_str(name);
                    out.push('(');
                    if let Some(first) = self.parameters(id) {
                        self.write_chain_spaced(first, out, minified, !minified && kind.is_color_function());
                    }
                    out.push(')');
                }
            }
        }

        if !minified {
            for comment in self.comments_after(id) {
                out.push_str(" /*");
                out.push_str(comment);
                out.push_str("*/");
            }
        }
    }
}

/// Iterator over a sibling chain
pub struct ChainIter<'a> {
    pool: &'a LexicalPool,
    cur: Option<UnitId>,
}

impl Iterator for ChainIter<'_> {
    type Item = UnitId;

    fn next(&mut self) -> Option<UnitId> {
        let cur = self.cur?;
        self.cur = self.pool.next(cur);
        Some(cur)
    }
}

/// Format a float the way CSS serializes it: no trailing `.0`, no
/// exponent for the magnitudes the parser produces
fn format_number(value: Number) -> String {
    if value == value.trunc() && value.abs() < 1.0e7 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// A completed value: a self-contained pool plus the first unit of the
/// top-level sibling chain. This is what the parser hands to consumers.
#[derive(Debug, Clone, Serialize)]
pub struct LexicalValue {
    pool: LexicalPool,
    first: Option<UnitId>,
}

impl LexicalValue {
    pub(crate) fn new(pool: LexicalPool, first: Option<UnitId>) -> Self {
        Self { pool, first }
    }

    pub fn empty() -> Self {
        Self {
            pool: LexicalPool::new(),
            first: None,
        }
    }

    pub fn pool(&self) -> &LexicalPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut LexicalPool {
        &mut self.pool
    }

    pub fn first_unit(&self) -> Option<UnitId> {
        self.first
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Iterator over the top-level sibling chain
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            pool: &self.pool,
            cur: self.first,
        }
    }

    pub fn css_text(&self) -> String {
        match self.first {
            Some(first) => self.pool.chain_text(first, false),
            None => String::new(),
        }
    }

    pub fn minified_text(&self) -> String {
        match self.first {
            Some(first) => self.pool.chain_text(first, true),
            None => String::new(),
        }
    }

    /// Structural equality, ignoring arena layout and comments
    pub fn tree_eq(&self, other: &LexicalValue) -> bool {
        match (self.first, other.first) {
            (None, None) => true,
            (Some(a), Some(b)) => self.pool.chain_eq(a, &other.pool, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(pool: &mut LexicalPool, value: Number, unit: &str) -> UnitId {
        pool.alloc(LexicalKind::Dimension {
            value,
            unit: unit.to_string(),
        })
    }

    #[test]
    fn chain_append_links_siblings() {
        let mut pool = LexicalPool::new();
        let a = dim(&mut pool, 1.0, "px");
        let b = pool.alloc(LexicalKind::Ident("solid".to_string()));
        let c = pool.alloc(LexicalKind::Ident("red".to_string()));
        pool.append(a, b);
        pool.append(a, c);

        assert_eq!(pool.chain(a).count(), 3);
        assert_eq!(pool.prev(c), Some(b));
        assert_eq!(pool.chain_text(a, false), "1px solid red");
    }

    #[test]
    fn function_parameters_have_owner() {
        let mut pool = LexicalPool::new();
        let func = pool.alloc(LexicalKind::MathFunction {
            name: "calc".to_string(),
            index: MathIndex::Calc,
        });
        let one = dim(&mut pool, 1.0, "em");
        let plus = pool.alloc(LexicalKind::OperatorPlus);
        let two = dim(&mut pool, 2.0, "px");
        pool.add_parameter(func, one);
        pool.add_parameter(func, plus);
        pool.add_parameter(func, two);

        assert_eq!(pool.owner(two), Some(func));
        assert_eq!(pool.owner(func), None);
        assert_eq!(pool.parameter_count(func), 3);
        assert_eq!(pool.css_text(func), "calc(1em + 2px)");
    }

    #[test]
    fn comma_serialization() {
        let mut pool = LexicalPool::new();
        let a = pool.alloc(LexicalKind::Ident("serif".to_string()));
        let comma = pool.alloc(LexicalKind::OperatorComma);
        let b = pool.alloc(LexicalKind::Ident("monospace".to_string()));
        pool.append(a, comma);
        pool.append(a, b);

        assert_eq!(pool.chain_text(a, false), "serif, monospace");
        assert_eq!(pool.chain_text(a, true), "serif,monospace");
    }

    #[test]
    fn clone_is_shallow_and_preserves_text() {
        let mut pool = LexicalPool::new();
        let func = pool.alloc(LexicalKind::RgbColor);
        for component in [170, 187, 204] {
            let c = pool.alloc(LexicalKind::Integer(component));
            pool.add_parameter(func, c);
        }
        let sibling = pool.alloc(LexicalKind::Ident("red".to_string()));
        pool.append(func, sibling);

        let copy = pool.shallow_clone(func);
        // sibling and owner links are not deep-copied
        assert_eq!(pool.next(copy), None);
        assert_eq!(pool.owner(copy), None);
        assert_eq!(pool.css_text(copy), pool.css_text(func));
        assert!(pool.tree_eq(func, &pool.clone(), copy));
    }

    #[test]
    fn replace_splices_chains() {
        let mut pool = LexicalPool::new();
        let func = pool.alloc(LexicalKind::Function("foo".to_string()));
        let var = pool.alloc(LexicalKind::Var);
        let name = pool.alloc(LexicalKind::Ident("--x".to_string()));
        pool.add_parameter(var, name);
        pool.add_parameter(func, var);

        let replacement = dim(&mut pool, 4.0, "px");
        let extra = pool.alloc(LexicalKind::Ident("solid".to_string()));
        pool.append(replacement, extra);

        pool.replace(var, replacement);
        assert_eq!(pool.css_text(func), "foo(4px solid)");
        assert_eq!(pool.owner(extra), Some(func));
    }

    #[test]
    fn unicode_range_serialization() {
        let mut pool = LexicalPool::new();
        let range = pool.alloc(LexicalKind::UnicodeRange);
        let start = pool.alloc(LexicalKind::Integer(0x4E00));
        let end = pool.alloc(LexicalKind::Integer(0x9FFF));
        pool.add_parameter(range, start);
        pool.add_parameter(range, end);
        assert_eq!(pool.css_text(range), "U+4E00-9FFF");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-1.25), "-1.25");
    }
}
