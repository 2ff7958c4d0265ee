//! Adjoints of operator calls, keyed by operator, operator valence and
//! derived valence.
//!
//! Operators whose derivative depends on their function operand
//! (rank, reduce) differentiate that operand recursively with
//! [`meta_derivative`] and inline the result as a block.

use crate::error::{Error, Result};
use crate::ir::helpers::*;
use crate::ir::*;
use crate::ir::Valence::{Dyadic as Dy, Monadic as Mon};

use super::adjoint::{Pos, RuleCtx, Template};
use super::meta_derivative;

pub(crate) struct OperatorAdjoint {
    pub operator: Operator,
    pub operator_valence: Valence,
    pub derived_valence: Valence,
    pub rule: Template,
}

const fn entry(
    operator: Operator,
    operator_valence: Valence,
    derived_valence: Valence,
    rule: Template,
) -> OperatorAdjoint {
    OperatorAdjoint {
        operator,
        operator_valence,
        derived_valence,
        rule,
    }
}

pub(crate) static OPERATOR_ADJOINTS: &[OperatorAdjoint] = &[
    entry(Operator::Dot, Dy, Dy, inner_product),
    entry(Operator::JotDia, Dy, Mon, rank_monadic_call),
    entry(Operator::JotDia, Dy, Dy, rank_dyadic_call),
    entry(Operator::Slash, Mon, Mon, reduce_last),
    entry(Operator::Slashbar, Mon, Mon, reduce_first),
];

pub(crate) fn operator_adjoint(op: &OpCall) -> Option<Template> {
    OPERATOR_ADJOINTS
        .iter()
        .find(|e| {
            e.operator == op.operator
                && e.operator_valence == op.operator_valence
                && e.derived_valence == op.derived_valence
        })
        .map(|e| e.rule)
}

fn function_operand(c: &RuleCtx<'_>) -> Result<Prim> {
    let op = c
        .op_call()
        .ok_or_else(|| Error::MissingAdjoint("operator rule on a function call".into()))?;
    match op.operator_operands.first().and_then(Operand::prim) {
        Some(prim) => Ok(prim),
        None => Err(Error::unsupported(format!(
            "`{}` with a non-primitive function operand",
            op.operator.glyph()
        ))),
    }
}

fn array_operand(c: &RuleCtx<'_>) -> Result<Expr> {
    match c.op_call().and_then(|op| op.operator_operands.get(1)) {
        Some(Operand::Array(k)) => Ok(k.clone()),
        _ => Err(Error::unsupported("rank without an array right operand")),
    }
}

// ─── Inner product ─────────────────────────────────────────────────

/// `l(+.×)r`: fold both sides into matrices, differentiate the matrix
/// product, and reshape back.
fn inner_product(c: &mut RuleCtx<'_>) -> Result<()> {
    let (l, r) = (c.l(), c.r());
    let rows = c.bind(reduce(
        Operator::Slash,
        Prim::Times,
        dyadic(Prim::Drop, num("-1"), monadic(Prim::Rho, l.clone())),
    ));
    let cols = c.bind(reduce(
        Operator::Slash,
        Prim::Times,
        dyadic(Prim::Drop, num("1"), monadic(Prim::Rho, r.clone())),
    ));
    let mat_dy = c.bind(dyadic(Prim::Rho, dyadic(Prim::Cat, rows.clone(), cols.clone()), c.dy()));

    if c.wants(Pos::Left) {
        let shape = dyadic(
            Prim::Cat,
            dyadic(Prim::Take, num("1"), monadic(Prim::Rho, r.clone())),
            cols,
        );
        let mat_r = c.bind(dyadic(Prim::Rho, shape, r.clone()));
        let product = matmul(mat_dy.clone(), monadic(Prim::Trans, mat_r));
        c.contribute(Pos::Left, dyadic(Prim::Rho, monadic(Prim::Rho, l.clone()), product));
    }
    if c.wants(Pos::Right) {
        let shape = dyadic(
            Prim::Cat,
            rows,
            dyadic(Prim::Take, num("-1"), monadic(Prim::Rho, l.clone())),
        );
        let mat_l = c.bind(dyadic(Prim::Rho, shape, l));
        let product = matmul(monadic(Prim::Trans, mat_l), mat_dy);
        c.contribute(Pos::Right, dyadic(Prim::Rho, monadic(Prim::Rho, r), product));
    }
    Ok(())
}

// ─── Rank ──────────────────────────────────────────────────────────

/// `(f⍤k)r`: `dr = dy×(f′⍤k)r`.
fn rank_monadic_call(c: &mut RuleCtx<'_>) -> Result<()> {
    if !c.wants(Pos::Right) {
        return Ok(());
    }
    let f = function_operand(c)?;
    let k = array_operand(c)?;
    let df = meta_derivative(f, Valence::Monadic, Param::Omega)?;
    let d = dyadic(Prim::Times, c.dy(), rank_block_monadic(df, k, c.r()));
    c.contribute(Pos::Right, d);
    Ok(())
}

/// `l(f⍤k)r`: full-rank gradients `dy(×⍤k)l(f′⍤k)r`, summed over the axes
/// an argument of lower rank was broadcast along.
fn rank_dyadic_call(c: &mut RuleCtx<'_>) -> Result<()> {
    let f = function_operand(c)?;
    let k = array_operand(c)?;
    for (pos, param) in [(Pos::Left, Param::Alpha), (Pos::Right, Param::Omega)] {
        if !c.wants(pos) {
            continue;
        }
        let df = meta_derivative(f, Valence::Dyadic, param)?;
        let local = rank_block_dyadic(df, k.clone(), c.l(), c.r());
        let full = c.bind(rank_dyadic(Prim::Times, k.clone(), c.dy(), local));
        let excess = dyadic(
            Prim::Sub,
            monadic(Prim::Nmatch, monadic(Prim::Rho, full.clone())),
            monadic(Prim::Nmatch, monadic(Prim::Rho, c.arg(pos))),
        );
        let summed = rank_block_monadic(sum_cells(), excess, monadic(Prim::Trans, full));
        c.contribute(pos, monadic(Prim::Trans, summed));
    }
    Ok(())
}

/// `{+/,⍵}`
fn sum_cells() -> Function {
    Function::new(
        "sum",
        vec![Stmt::Return(reduce(
            Operator::Slash,
            Prim::Add,
            monadic(Prim::Cat, omega()),
        ))],
    )
}

// ─── Reduce ────────────────────────────────────────────────────────

fn reduce_last(c: &mut RuleCtx<'_>) -> Result<()> {
    reduce_along(c, false)
}

/// Reduce-first is reduce on the transposed argument.
fn reduce_first(c: &mut RuleCtx<'_>) -> Result<()> {
    reduce_along(c, true)
}

/// `f/r` through its scan `s←f\r`: the gradient of each item is the product
/// of the partial derivatives chained from it to the end (`chain`) times
/// its own local derivative (`cons`).
fn reduce_along(c: &mut RuleCtx<'_>, first_axis: bool) -> Result<()> {
    if !c.wants(Pos::Right) {
        return Ok(());
    }
    let f = function_operand(c)?;
    log::trace!("reduce adjoint through `{}`", f.name());
    let (r, dy) = if first_axis {
        let r = c.bind(monadic(Prim::Trans, c.r()));
        let dy = c.bind(monadic(Prim::Trans, c.dy()));
        (r, dy)
    } else {
        (c.r(), c.dy())
    };
    let df_left = meta_derivative(f, Valence::Dyadic, Param::Alpha)?;
    let df_right = meta_derivative(f, Valence::Dyadic, Param::Omega)?;

    let scan = c.bind(reduce(Operator::Backslash, f, r.clone()));
    // chain←(⌽×\1(↓⍤1)⌽s f′ₗ 1⌽r),1
    let local = block_dyadic(df_left, scan.clone(), dyadic(Prim::Rot, num("1"), r.clone()));
    let products = reduce(
        Operator::Backslash,
        Prim::Times,
        rank_dyadic(Prim::Drop, num("1"), num("1"), monadic(Prim::Rot, local)),
    );
    let chain = c.bind(dyadic(Prim::Cat, monadic(Prim::Rot, products), num("1")));
    // cons←1,1(↓⍤1)(¯1⌽s)f′ᵣ r
    let shifted = dyadic(Prim::Rot, num("-1"), scan);
    let cons = c.bind(dyadic(
        Prim::Cat,
        num("1"),
        rank_dyadic(Prim::Drop, num("1"), num("1"), block_dyadic(df_right, shifted, r)),
    ));

    let spread = dyadic(
        Prim::Rho,
        dyadic(Prim::Cat, monadic(Prim::Rho, dy.clone()), num("1")),
        dy,
    );
    let d = rank_dyadic(Prim::Times, num("1"), spread, dyadic(Prim::Times, chain, cons));
    let d = if first_axis {
        monadic(Prim::Trans, d)
    } else {
        d
    };
    c.contribute(Pos::Right, d);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autodiff::normalize::Temps;
    use crate::render::{render_expr, render_stmt};

    fn run(call: &Expr, wants: [bool; 2]) -> (Vec<String>, Vec<String>) {
        let Expr::OpCall(op) = call else {
            panic!("not an operator call");
        };
        let rule = operator_adjoint(op).expect("operator adjoint");
        let mut temps = Temps::default();
        let mut ctx = RuleCtx::new(Name::Temp(100), Name::alpha(), call, wants, &mut temps);
        rule(&mut ctx).unwrap();
        let (prelude, contributions) = ctx.finish();
        (
            prelude.iter().map(render_stmt).collect(),
            contributions.iter().map(|c| render_expr(&c.expr)).collect(),
        )
    }

    fn w() -> Expr {
        var(Name::user("w"))
    }

    #[test]
    fn test_scan_and_reduce_with_left_argument_have_no_adjoint() {
        let Expr::OpCall(scan) = reduce(Operator::Backslash, Prim::Add, w()) else {
            unreachable!()
        };
        assert!(operator_adjoint(&scan).is_none());
        let windowed = OpCall::new(
            Operator::Slash,
            vec![Operand::Prim(Prim::Add)],
            vec![num("2"), w()],
        );
        assert!(operator_adjoint(&windowed).is_none());
    }

    #[test]
    fn test_matrix_product() {
        let (prelude, contributions) = run(&matmul(var(Name::user("a")), w()), [true, true]);
        assert_eq!(
            prelude,
            vec![
                "⍙1←×/¯1↓⍴a",
                "⍙2←×/1↓⍴w",
                "⍙3←(⍙1,⍙2)⍴⍺",
                "⍙4←((1↑⍴w),⍙2)⍴w",
                "⍙5←(⍙1,¯1↑⍴a)⍴a",
            ]
        );
        assert_eq!(
            contributions,
            vec!["(⍴a)⍴⍙3(+.×)⍉⍙4", "(⍴w)⍴(⍉⍙5)(+.×)⍙3"]
        );
    }

    #[test]
    fn test_monadic_rank_inlines_the_operand_derivative() {
        let (prelude, contributions) = run(&rank_monadic(Prim::Pow, num("1"), w()), [false, true]);
        assert!(prelude.is_empty());
        assert_eq!(
            contributions,
            vec!["⍺×({⍙1←*⍵ ⋄ ∆⍙1←1+0×⍙1 ⋄ ⍙dw←∆⍙1×⍙1 ⋄ ⍙dw}⍤1)w"]
        );
    }

    #[test]
    fn test_dyadic_rank_sums_broadcast_axes() {
        let call = rank_dyadic(Prim::Times, num("0"), var(Name::user("a")), w());
        let (prelude, contributions) = run(&call, [true, false]);
        assert_eq!(
            prelude,
            vec!["⍙1←⍺(×⍤0)a({⍙1←⍺×⍵ ⋄ ∆⍙1←1+0×⍙1 ⋄ ⍙da←∆⍙1×⍵ ⋄ ⍙da}⍤0)w"]
        );
        assert_eq!(contributions, vec!["⍉({+/,⍵}⍤((≢⍴⍙1)-≢⍴a))⍉⍙1"]);
    }

    #[test]
    fn test_sum_reduce() {
        let (prelude, contributions) = run(&reduce(Operator::Slash, Prim::Add, w()), [false, true]);
        assert_eq!(
            prelude,
            vec![
                "⍙1←+\\w",
                "⍙2←(⌽×\\1(↓⍤1)⌽⍙1{⍙1←⍺+⍵ ⋄ ∆⍙1←1+0×⍙1 ⋄ ⍙da←∆⍙1 ⋄ ⍙da}1⌽w),1",
                "⍙3←1,1(↓⍤1)(¯1⌽⍙1){⍙1←⍺+⍵ ⋄ ∆⍙1←1+0×⍙1 ⋄ ⍙dw←∆⍙1 ⋄ ⍙dw}w",
            ]
        );
        assert_eq!(contributions, vec!["(((⍴⍺),1)⍴⍺)(×⍤1)⍙2×⍙3"]);
    }

    #[test]
    fn test_reduce_first_transposes() {
        let (prelude, contributions) =
            run(&reduce(Operator::Slashbar, Prim::Times, w()), [false, true]);
        assert_eq!(&prelude[..3], &["⍙1←⍉w", "⍙2←⍉⍺", "⍙3←×\\⍙1"]);
        assert_eq!(contributions, vec!["⍉(((⍴⍙2),1)⍴⍙2)(×⍤1)⍙4×⍙5"]);
    }
}
