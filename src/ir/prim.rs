//! Primitive functions and operators of the array language.
//!
//! Every primitive and operator is identified by the name the parser uses
//! in its tree output (`Add`, `Slash`, ...) and rendered by its glyph. Both
//! directions are driven by the tables below, so glyphs never enter the
//! identifier namespace.

use std::fmt;

// ─── Valence ───────────────────────────────────────────────────────

/// Number of arguments a function (or operator) is applied to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Valence {
    /// Right argument only.
    Monadic,
    /// Left and right arguments.
    Dyadic,
}

impl Valence {
    /// Valence implied by an argument count. Anything but one or two
    /// arguments has no valence.
    pub fn from_arity(arity: usize) -> Option<Self> {
        match arity {
            1 => Some(Valence::Monadic),
            2 => Some(Valence::Dyadic),
            _ => None,
        }
    }

    /// Suffix used when naming a (function, valence) pair, e.g. `TimesDy`.
    pub fn suffix(self) -> &'static str {
        match self {
            Valence::Monadic => "Mon",
            Valence::Dyadic => "Dy",
        }
    }
}

// ─── Primitive functions ───────────────────────────────────────────

/// A primitive function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Prim {
    Add,
    And,
    Cat,
    Circ,
    Circstar,
    Disclose,
    Div,
    Drop,
    Enclose,
    Eq,
    Gradedown,
    Gradeup,
    Gt,
    Gteq,
    In,
    Iota,
    Lt,
    Lteq,
    Match,
    Max,
    Min,
    Nand,
    Nmatch,
    Nor,
    Or,
    Pipe,
    Pow,
    Rho,
    Rot,
    Squad,
    Sub,
    Take,
    Tilde,
    Times,
    Trans,
    Vcat,
    Vrot,
}

/// Parser name and glyph of every primitive.
const PRIMITIVES: &[(Prim, &str, char)] = &[
    (Prim::Add, "Add", '+'),
    (Prim::And, "And", '∧'),
    (Prim::Cat, "Cat", ','),
    (Prim::Circ, "Circ", '○'),
    (Prim::Circstar, "Circstar", '⍟'),
    (Prim::Disclose, "Disclose", '⊃'),
    (Prim::Div, "Div", '÷'),
    (Prim::Drop, "Drop", '↓'),
    (Prim::Enclose, "Enclose", '⊂'),
    (Prim::Eq, "Eq", '='),
    (Prim::Gradedown, "Gradedown", '⍒'),
    (Prim::Gradeup, "Gradeup", '⍋'),
    (Prim::Gt, "Gt", '>'),
    (Prim::Gteq, "Gteq", '≥'),
    (Prim::In, "In", '∊'),
    (Prim::Iota, "Iota", '⍳'),
    (Prim::Lt, "Lt", '<'),
    (Prim::Lteq, "Lteq", '≤'),
    (Prim::Match, "Match", '≡'),
    (Prim::Max, "Max", '⌈'),
    (Prim::Min, "Min", '⌊'),
    (Prim::Nand, "Nand", '⍲'),
    (Prim::Nmatch, "Nmatch", '≢'),
    (Prim::Nor, "Nor", '⍱'),
    (Prim::Or, "Or", '∨'),
    (Prim::Pipe, "Pipe", '|'),
    (Prim::Pow, "Pow", '*'),
    (Prim::Rho, "Rho", '⍴'),
    (Prim::Rot, "Rot", '⌽'),
    (Prim::Squad, "Squad", '⌷'),
    (Prim::Sub, "Sub", '-'),
    (Prim::Take, "Take", '↑'),
    (Prim::Tilde, "Tilde", '~'),
    (Prim::Times, "Times", '×'),
    (Prim::Trans, "Trans", '⍉'),
    (Prim::Vcat, "Vcat", '⍪'),
    (Prim::Vrot, "Vrot", '⊖'),
];

impl Prim {
    /// All primitives, in table order.
    #[cfg(test)]
    pub(crate) fn all() -> impl Iterator<Item = Prim> {
        PRIMITIVES.iter().map(|&(prim, _, _)| prim)
    }

    /// Look up a primitive by its parser name.
    pub fn from_name(name: &str) -> Option<Prim> {
        PRIMITIVES
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|&(prim, _, _)| prim)
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn glyph(self) -> char {
        self.entry().2
    }

    fn entry(self) -> &'static (Prim, &'static str, char) {
        // Rows are in declaration order.
        &PRIMITIVES[self as usize]
    }
}

impl fmt::Display for Prim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

// ─── Operators ─────────────────────────────────────────────────────

/// A primitive operator: takes function (or array) operands and derives
/// a new function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// `\` scan. Only produced by adjoints; scan itself has no adjoint.
    Backslash,
    /// `.` inner product.
    Dot,
    /// `⍤` rank.
    JotDia,
    /// `/` reduce.
    Slash,
    /// `⌿` reduce-first.
    Slashbar,
}

const OPERATORS: &[(Operator, &str, char)] = &[
    (Operator::Backslash, "Backslash", '\\'),
    (Operator::Dot, "Dot", '.'),
    (Operator::JotDia, "JotDia", '⍤'),
    (Operator::Slash, "Slash", '/'),
    (Operator::Slashbar, "Slashbar", '⌿'),
];

impl Operator {
    #[cfg(test)]
    pub(crate) fn all() -> impl Iterator<Item = Operator> {
        OPERATORS.iter().map(|&(op, _, _)| op)
    }

    pub fn from_name(name: &str) -> Option<Operator> {
        OPERATORS
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|&(op, _, _)| op)
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn glyph(self) -> char {
        self.entry().2
    }

    fn entry(self) -> &'static (Operator, &'static str, char) {
        &OPERATORS[self as usize]
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Names a user variable may not take: they are indistinguishable from
/// primitives, operators, arguments or vector markers in parser output.
pub fn is_reserved_name(name: &str) -> bool {
    matches!(name, "Alpha" | "Omega" | "Inline")
        || Prim::from_name(name).is_some()
        || Operator::from_name(name).is_some()
}
