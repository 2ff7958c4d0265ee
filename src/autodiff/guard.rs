//! Known limits of the adjoint table, checked over the whole forward
//! function before any differentiation starts.

use crate::error::{Error, Result};
use crate::ir::*;
use crate::render::render_expr;

/// Reject constructs whose adjoints only cover part of their domain.
pub(crate) fn check(function: &Function) -> Result<()> {
    let mut first_error = None;
    function.for_each_expr(|expr| {
        if first_error.is_none() {
            if let Err(err) = check_expr(expr) {
                first_error = Some(err);
            }
        }
    });
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn check_expr(expr: &Expr) -> Result<()> {
    match expr {
        Expr::Call(call) if call.prim() == Some(Prim::Circ) && call.valence == Valence::Dyadic => {
            match call.left() {
                Some(Expr::Num(n)) if n == "1" || n == "2" => Ok(()),
                _ => Err(Error::UnsupportedTrig {
                    construct: render_expr(expr),
                }),
            }
        }
        Expr::OpCall(op) => match op.operator {
            Operator::Dot => {
                let operands: Vec<_> = op.operator_operands.iter().map(Operand::prim).collect();
                if operands == [Some(Prim::Add), Some(Prim::Times)] {
                    Ok(())
                } else {
                    Err(Error::UnsupportedInnerProduct {
                        construct: render_expr(expr),
                    })
                }
            }
            Operator::JotDia => check_rank(op, expr),
            Operator::Slash | Operator::Slashbar
                if op.operator_valence == Valence::Monadic
                    && op.derived_valence == Valence::Monadic =>
            {
                match op.operator_operands[0].prim() {
                    Some(
                        Prim::Add | Prim::And | Prim::Max | Prim::Min | Prim::Or | Prim::Times,
                    ) => Ok(()),
                    _ => Err(Error::UnsupportedReduce {
                        construct: render_expr(expr),
                    }),
                }
            }
            _ => Ok(()),
        },
        _ => Ok(()),
    }
}

fn check_rank(op: &OpCall, expr: &Expr) -> Result<()> {
    let unsupported = |reason: &str| Error::UnsupportedRank {
        construct: render_expr(expr),
        reason: reason.to_string(),
    };
    match op.operator_operands.get(1) {
        Some(Operand::Array(Expr::Num(_))) => {}
        _ => return Err(unsupported("rank only supports scalar numeric right operands")),
    }
    match op.operator_operands[0].prim() {
        Some(prim) if is_structural(prim) => {
            Err(unsupported("rank does not support structural or selection functions"))
        }
        Some(_) => Ok(()),
        None => Err(unsupported("rank only supports primitive functions as its left operand")),
    }
}

/// Primitives that rearrange or select rather than compute elementwise.
fn is_structural(prim: Prim) -> bool {
    matches!(
        prim,
        Prim::Cat
            | Prim::Disclose
            | Prim::Drop
            | Prim::Enclose
            | Prim::In
            | Prim::Iota
            | Prim::Squad
            | Prim::Take
            | Prim::Trans
            | Prim::Vcat
    )
}
