//! Constructors for IR expressions.
//!
//! Adjoint templates are written with these, so a rule reads close to the
//! array code it produces: `dyadic(Times, dy, right)` is `dy×right`.

use super::{Call, Callee, Expr, Function, Name, OpCall, Operand, Operator, Prim};

pub fn var(name: Name) -> Expr {
    Expr::Var(name)
}

pub fn alpha() -> Expr {
    Expr::Var(Name::alpha())
}

pub fn omega() -> Expr {
    Expr::Var(Name::omega())
}

/// A numeric literal. A leading `-` is spelled as APL's high minus.
pub fn num(text: &str) -> Expr {
    match text.strip_prefix('-') {
        Some(rest) => Expr::Num(format!("¯{}", rest)),
        None => Expr::Num(text.to_string()),
    }
}

pub fn monadic(prim: Prim, right: Expr) -> Expr {
    Expr::Call(Call::new(Callee::Prim(prim), vec![right]))
}

pub fn dyadic(prim: Prim, left: Expr, right: Expr) -> Expr {
    Expr::Call(Call::new(Callee::Prim(prim), vec![left, right]))
}

/// Call an inline dfn dyadically.
pub fn block_dyadic(block: Function, left: Expr, right: Expr) -> Expr {
    Expr::Call(Call::new(Callee::Block(Box::new(block)), vec![left, right]))
}

/// `0×x`: zeros shaped like `x`.
pub fn zeros_like(x: Expr) -> Expr {
    dyadic(Prim::Times, num("0"), x)
}

/// `1+0×x`: ones shaped like `x`.
pub fn ones_like(x: Expr) -> Expr {
    dyadic(Prim::Add, num("1"), zeros_like(x))
}

/// `f/⍵`, `f⌿⍵` or `f\⍵`.
pub fn reduce(operator: Operator, f: Prim, right: Expr) -> Expr {
    Expr::OpCall(OpCall::new(operator, vec![Operand::Prim(f)], vec![right]))
}

/// `(f⍤k)⍵`
pub fn rank_monadic(f: Prim, k: Expr, right: Expr) -> Expr {
    Expr::OpCall(OpCall::new(
        Operator::JotDia,
        vec![Operand::Prim(f), Operand::Array(k)],
        vec![right],
    ))
}

/// `⍺(f⍤k)⍵`
pub fn rank_dyadic(f: Prim, k: Expr, left: Expr, right: Expr) -> Expr {
    Expr::OpCall(OpCall::new(
        Operator::JotDia,
        vec![Operand::Prim(f), Operand::Array(k)],
        vec![left, right],
    ))
}

/// `(f⍤k)⍵` with an inline dfn as the ranked function.
pub fn rank_block_monadic(f: Function, k: Expr, right: Expr) -> Expr {
    Expr::OpCall(OpCall::new(
        Operator::JotDia,
        vec![Operand::Block(Box::new(f)), Operand::Array(k)],
        vec![right],
    ))
}

/// `⍺(f⍤k)⍵` with an inline dfn as the ranked function.
pub fn rank_block_dyadic(f: Function, k: Expr, left: Expr, right: Expr) -> Expr {
    Expr::OpCall(OpCall::new(
        Operator::JotDia,
        vec![Operand::Block(Box::new(f)), Operand::Array(k)],
        vec![left, right],
    ))
}

/// `⍺(+.×)⍵`
pub fn matmul(left: Expr, right: Expr) -> Expr {
    Expr::OpCall(OpCall::new(
        Operator::Dot,
        vec![Operand::Prim(Prim::Add), Operand::Prim(Prim::Times)],
        vec![left, right],
    ))
}
