//! Call-tree intermediate representation shared by lowering, the
//! differentiator and rendering.
//!
//! A dfn becomes a [`Function`]: an ordered list of statements ending in a
//! single `Return`. Expressions are explicit call trees. Valence is always
//! resolved, and an operator applied to its operands and then called is a
//! single [`OpCall`] node, so the differentiator can dispatch on the
//! operator together with both valences.

pub mod helpers;
pub mod prim;

use std::fmt;

pub use prim::{is_reserved_name, Operator, Prim, Valence};

// ─── Names ─────────────────────────────────────────────────────────

/// The implicit arguments of a dfn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Param {
    /// `⍺`, the left argument.
    Alpha,
    /// `⍵`, the right argument.
    Omega,
}

/// A variable. User names come from source; everything else is generated
/// and spelled with `∆`/`⍙`, which user names cannot contain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Name {
    /// `⍺` or `⍵`.
    Param(Param),
    /// A variable named in source.
    User(String),
    /// The n-th redefinition of a user variable.
    Version(String, u32),
    /// A temporary introduced by normalization or an adjoint.
    Temp(u32),
    /// An argument of a dyadic function after unpacking it from the
    /// gradient function's right argument.
    Unpacked(Param),
    /// The gradient of another name.
    Grad(Box<Name>),
}

impl Name {
    pub fn alpha() -> Self {
        Name::Param(Param::Alpha)
    }

    pub fn omega() -> Self {
        Name::Param(Param::Omega)
    }

    pub fn user(name: &str) -> Self {
        Name::User(name.to_string())
    }

    /// The name holding this name's gradient.
    pub fn grad(&self) -> Self {
        Name::Grad(Box::new(self.clone()))
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Name::Param(Param::Alpha) => write!(f, "⍺"),
            Name::Param(Param::Omega) => write!(f, "⍵"),
            Name::User(name) => write!(f, "{}", name),
            Name::Version(name, n) => write!(f, "{}⍙{}", name, n),
            Name::Temp(n) => write!(f, "⍙{}", n),
            Name::Unpacked(Param::Alpha) => write!(f, "⍙a"),
            Name::Unpacked(Param::Omega) => write!(f, "⍙w"),
            Name::Grad(inner) => match inner.as_ref() {
                Name::Param(Param::Alpha) | Name::Unpacked(Param::Alpha) => write!(f, "⍙da"),
                Name::Param(Param::Omega) | Name::Unpacked(Param::Omega) => write!(f, "⍙dw"),
                other => write!(f, "∆{}", other),
            },
        }
    }
}

// ─── Expressions ───────────────────────────────────────────────────

/// An expression in the call tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Var(Name),
    /// A numeric scalar, spelled as in source (`2`, `¯1`, `1.5`).
    Num(String),
    /// Opaque source text passed through verbatim (vector literals).
    Literal(String),
    Call(Call),
    OpCall(OpCall),
    /// Juxtaposed items forming a vector, e.g. a pair of gradients.
    Strand(Vec<Expr>),
}

/// The function being called by a [`Call`].
#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    Prim(Prim),
    /// An inline dfn, rendered as `{…}` in place.
    Block(Box<Function>),
}

/// A primitive (or inline dfn) applied to one or two arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Call {
    pub callee: Callee,
    pub valence: Valence,
    /// `[right]` when monadic, `[left, right]` when dyadic.
    pub operands: Vec<Expr>,
}

/// An operand of an operator: a function or an array.
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Prim(Prim),
    Block(Box<Function>),
    Array(Expr),
}

/// An operator applied to its operands, with the derived function called
/// immediately, e.g. `+/⍵` or `a(+.×)b`.
#[derive(Clone, Debug, PartialEq)]
pub struct OpCall {
    pub operator: Operator,
    /// Monadic operators take one operand (`f/`), dyadic two (`f⍤k`).
    pub operator_valence: Valence,
    /// How the derived function is called.
    pub derived_valence: Valence,
    pub operator_operands: Vec<Operand>,
    pub call_operands: Vec<Expr>,
}

impl Call {
    /// Build a call, deriving valence from the operand count.
    pub fn new(callee: Callee, operands: Vec<Expr>) -> Self {
        debug_assert!(matches!(operands.len(), 1 | 2));
        let valence = if operands.len() == 2 {
            Valence::Dyadic
        } else {
            Valence::Monadic
        };
        Self {
            callee,
            valence,
            operands,
        }
    }

    /// The right argument.
    pub fn right(&self) -> &Expr {
        &self.operands[self.operands.len() - 1]
    }

    /// The left argument, if dyadic.
    pub fn left(&self) -> Option<&Expr> {
        match self.valence {
            Valence::Dyadic => self.operands.first(),
            Valence::Monadic => None,
        }
    }

    pub fn prim(&self) -> Option<Prim> {
        match self.callee {
            Callee::Prim(p) => Some(p),
            Callee::Block(_) => None,
        }
    }
}

impl OpCall {
    pub fn new(operator: Operator, operands: Vec<Operand>, args: Vec<Expr>) -> Self {
        debug_assert!(matches!(operands.len(), 1 | 2) && matches!(args.len(), 1 | 2));
        let valence = |n: usize| {
            if n == 2 {
                Valence::Dyadic
            } else {
                Valence::Monadic
            }
        };
        Self {
            operator,
            operator_valence: valence(operands.len()),
            derived_valence: valence(args.len()),
            operator_operands: operands,
            call_operands: args,
        }
    }

    /// Key used in diagnostics and adjoint lookup, e.g. `SlashMonMon`.
    pub fn key(&self) -> String {
        format!(
            "{}{}{}",
            self.operator.name(),
            self.operator_valence.suffix(),
            self.derived_valence.suffix()
        )
    }
}

impl Operand {
    pub fn prim(&self) -> Option<Prim> {
        match self {
            Operand::Prim(p) => Some(*p),
            _ => None,
        }
    }
}

impl Expr {
    /// Atoms are the only expressions allowed as operands after
    /// normalization.
    pub fn is_atom(&self) -> bool {
        matches!(self, Expr::Var(_) | Expr::Num(_) | Expr::Literal(_))
    }

    /// Visit every variable referenced by this expression, including those
    /// inside array operands of operators. Inline blocks are separate
    /// scopes and are not entered.
    pub fn for_each_var(&self, f: &mut impl FnMut(&Name)) {
        match self {
            Expr::Var(name) => f(name),
            Expr::Num(_) | Expr::Literal(_) => {}
            Expr::Call(call) => {
                for operand in &call.operands {
                    operand.for_each_var(f);
                }
            }
            Expr::OpCall(op) => {
                for operand in &op.operator_operands {
                    if let Operand::Array(expr) = operand {
                        expr.for_each_var(f);
                    }
                }
                for arg in &op.call_operands {
                    arg.for_each_var(f);
                }
            }
            Expr::Strand(items) => {
                for item in items {
                    item.for_each_var(f);
                }
            }
        }
    }

    /// Visit this expression and every sub-expression, outermost first.
    pub fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Var(_) | Expr::Num(_) | Expr::Literal(_) => {}
            Expr::Call(call) => {
                for operand in &call.operands {
                    operand.for_each_expr(f);
                }
            }
            Expr::OpCall(op) => {
                for operand in &op.operator_operands {
                    if let Operand::Array(expr) = operand {
                        expr.for_each_expr(f);
                    }
                }
                for arg in &op.call_operands {
                    arg.for_each_expr(f);
                }
            }
            Expr::Strand(items) => {
                for item in items {
                    item.for_each_expr(f);
                }
            }
        }
    }

    /// Rewrite every variable in place.
    pub fn rename(&mut self, f: &mut impl FnMut(&Name) -> Option<Name>) {
        match self {
            Expr::Var(name) => {
                if let Some(new) = f(name) {
                    *name = new;
                }
            }
            Expr::Num(_) | Expr::Literal(_) => {}
            Expr::Call(call) => {
                for operand in &mut call.operands {
                    operand.rename(f);
                }
            }
            Expr::OpCall(op) => {
                for operand in &mut op.operator_operands {
                    if let Operand::Array(expr) = operand {
                        expr.rename(f);
                    }
                }
                for arg in &mut op.call_operands {
                    arg.rename(f);
                }
            }
            Expr::Strand(items) => {
                for item in items {
                    item.rename(f);
                }
            }
        }
    }
}

// ─── Statements and functions ──────────────────────────────────────

/// One statement of a dfn body.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    /// `name←expr`
    Assign(Name, Expr),
    /// `(selector)←value`: write `value` into the part of the selector's
    /// target variable that the selecting function picks out.
    SelectiveAssign(Expr, Expr),
    /// The dfn's result. Always the last statement.
    Return(Expr),
}

impl Stmt {
    pub fn for_each_expr(&self, f: &mut impl FnMut(&Expr)) {
        match self {
            Stmt::Assign(_, expr) | Stmt::Return(expr) => expr.for_each_expr(f),
            Stmt::SelectiveAssign(selector, value) => {
                selector.for_each_expr(f);
                value.for_each_expr(f);
            }
        }
    }

    pub fn rename(&mut self, f: &mut impl FnMut(&Name) -> Option<Name>) {
        match self {
            Stmt::Assign(name, expr) => {
                if let Some(new) = f(name) {
                    *name = new;
                }
                expr.rename(f);
            }
            Stmt::Return(expr) => expr.rename(f),
            Stmt::SelectiveAssign(selector, value) => {
                selector.rename(f);
                value.rename(f);
            }
        }
    }
}

/// A dfn.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    /// Dyadic iff the body refers to `⍺`.
    pub valence: Valence,
    pub body: Vec<Stmt>,
}

impl Function {
    /// Build a function, inferring valence from references to `⍺`.
    pub fn new(name: impl Into<String>, body: Vec<Stmt>) -> Self {
        let mut uses_alpha = false;
        for stmt in &body {
            stmt.for_each_expr(&mut |expr| {
                if let Expr::Var(Name::Param(Param::Alpha)) = expr {
                    uses_alpha = true;
                }
            });
        }
        Self {
            name: name.into(),
            valence: if uses_alpha {
                Valence::Dyadic
            } else {
                Valence::Monadic
            },
            body,
        }
    }

    /// The returned expression.
    pub fn result(&self) -> Option<&Expr> {
        match self.body.last() {
            Some(Stmt::Return(expr)) => Some(expr),
            _ => None,
        }
    }

    /// Visit every expression in the body, outermost first.
    pub fn for_each_expr(&self, mut f: impl FnMut(&Expr)) {
        for stmt in &self.body {
            stmt.for_each_expr(&mut f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::helpers::*;
    use super::*;

    #[test]
    fn test_generated_names_are_spelled_apart_from_user_names() {
        assert_eq!(Name::user("x").to_string(), "x");
        assert_eq!(Name::user("x").grad().to_string(), "∆x");
        assert_eq!(Name::Version("x".into(), 2).to_string(), "x⍙2");
        assert_eq!(Name::Version("x".into(), 2).grad().to_string(), "∆x⍙2");
        assert_eq!(Name::Temp(3).to_string(), "⍙3");
        assert_eq!(Name::Temp(3).grad().to_string(), "∆⍙3");
        assert_eq!(Name::omega().grad().to_string(), "⍙dw");
        assert_eq!(Name::Unpacked(Param::Alpha).to_string(), "⍙a");
        assert_eq!(Name::Unpacked(Param::Alpha).grad().to_string(), "⍙da");
    }

    #[test]
    fn test_function_valence_follows_alpha() {
        let scaled = dyadic(Prim::Times, num("2"), omega());
        let monadic = Function::new("f", vec![Stmt::Return(scaled)]);
        assert_eq!(monadic.valence, Valence::Monadic);
        let sum = dyadic(Prim::Add, alpha(), omega());
        let dyadic_fn = Function::new("g", vec![Stmt::Return(sum)]);
        assert_eq!(dyadic_fn.valence, Valence::Dyadic);
    }

    #[test]
    fn test_for_each_var_enters_array_operands() {
        let expr = rank_monadic(Prim::Pow, var(Name::user("k")), var(Name::user("x")));
        let mut seen = Vec::new();
        expr.for_each_var(&mut |n| seen.push(n.clone()));
        assert_eq!(seen, vec![Name::user("k"), Name::user("x")]);
    }

    #[test]
    fn test_rename_rewrites_nested_vars() {
        let x = || var(Name::user("x"));
        let mut expr = dyadic(Prim::Add, x(), monadic(Prim::Sub, x()));
        expr.rename(&mut |n| (n == &Name::user("x")).then(|| Name::Temp(1)));
        let mut seen = Vec::new();
        expr.for_each_var(&mut |n| seen.push(n.clone()));
        assert_eq!(seen, vec![Name::Temp(1), Name::Temp(1)]);
    }

    #[test]
    fn test_opcall_key() {
        let expr = reduce(Operator::Slash, Prim::Add, omega());
        match expr {
            Expr::OpCall(op) => assert_eq!(op.key(), "SlashMonMon"),
            other => panic!("expected operator call, got {:?}", other),
        }
    }
}
