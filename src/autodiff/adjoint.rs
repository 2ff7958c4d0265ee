//! The adjoint table for primitive functions.
//!
//! Each entry maps a `(primitive, valence)` pair to the partial derivative
//! rules for its operands. A rule is a template over a [`RuleCtx`]: it reads
//! handles to the output `y`, the output gradient `dy` and the operands, may
//! emit prelude statements, and records one contribution per operand that
//! wants a gradient.
//!
//! Operands named `l` and `r` below are the left and right arguments.

use crate::error::Result;
use crate::ir::helpers::*;
use crate::ir::*;
use crate::ir::Valence::{Dyadic as Dy, Monadic as Mon};

use super::normalize::Temps;

/// Operand position of a contribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pos {
    Left,
    Right,
}

/// A gradient contribution to one operand.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Contribution {
    pub pos: Pos,
    pub expr: Expr,
    /// Shape-preserving zeros; dropped when the operand already has a
    /// gradient.
    pub zero: bool,
}

pub(crate) type Template = fn(&mut RuleCtx<'_>) -> Result<()>;

#[derive(Clone, Copy)]
pub(crate) enum Adjoint {
    /// Non-differentiable: zeros shaped like each operand.
    Zero,
    Rule(Template),
}

pub(crate) struct PrimAdjoint {
    pub prim: Prim,
    pub valence: Valence,
    pub adjoint: Adjoint,
}

/// Everything a rule can see and do while differentiating one statement.
pub(crate) struct RuleCtx<'a> {
    /// The statement's output.
    pub y: Name,
    /// The name holding the output's gradient.
    pub dy: Name,
    /// The forward call, operands already atoms.
    pub call: &'a Expr,
    wants: [bool; 2],
    temps: &'a mut Temps,
    prelude: Vec<Stmt>,
    contributions: Vec<Contribution>,
}

impl<'a> RuleCtx<'a> {
    pub(crate) fn new(
        y: Name,
        dy: Name,
        call: &'a Expr,
        wants: [bool; 2],
        temps: &'a mut Temps,
    ) -> Self {
        Self {
            y,
            dy,
            call,
            wants,
            temps,
            prelude: Vec::new(),
            contributions: Vec::new(),
        }
    }

    fn args(&self) -> &'a [Expr] {
        match self.call {
            Expr::Call(call) => &call.operands,
            Expr::OpCall(op) => &op.call_operands,
            _ => &[],
        }
    }

    /// The argument at `pos`. For monadic calls only `Right` exists.
    pub(crate) fn arg(&self, pos: Pos) -> Expr {
        let args = self.args();
        match pos {
            Pos::Left if args.len() == 2 => args[0].clone(),
            _ => args[args.len() - 1].clone(),
        }
    }

    pub(crate) fn l(&self) -> Expr {
        self.arg(Pos::Left)
    }

    pub(crate) fn r(&self) -> Expr {
        self.arg(Pos::Right)
    }

    pub(crate) fn y(&self) -> Expr {
        Expr::Var(self.y.clone())
    }

    pub(crate) fn dy(&self) -> Expr {
        Expr::Var(self.dy.clone())
    }

    /// Whether the argument at `pos` is active.
    pub(crate) fn wants(&self, pos: Pos) -> bool {
        match pos {
            Pos::Left => self.wants[0],
            Pos::Right => self.wants[1],
        }
    }

    /// The operator call being differentiated.
    pub(crate) fn op_call(&self) -> Option<&'a OpCall> {
        match self.call {
            Expr::OpCall(op) => Some(op),
            _ => None,
        }
    }

    /// Bind `expr` to a fresh temporary in the prelude.
    pub(crate) fn bind(&mut self, expr: Expr) -> Expr {
        let temp = self.temps.fresh();
        self.prelude.push(Stmt::Assign(temp.clone(), expr));
        Expr::Var(temp)
    }

    pub(crate) fn emit(&mut self, stmt: Stmt) {
        self.prelude.push(stmt);
    }

    pub(crate) fn contribute(&mut self, pos: Pos, expr: Expr) {
        if self.wants(pos) {
            self.contributions.push(Contribution {
                pos,
                expr,
                zero: false,
            });
        }
    }

    pub(crate) fn contribute_zeros(&mut self, pos: Pos) {
        if self.wants(pos) {
            let expr = zeros_like(self.arg(pos));
            self.contributions.push(Contribution {
                pos,
                expr,
                zero: true,
            });
        }
    }

    pub(crate) fn finish(self) -> (Vec<Stmt>, Vec<Contribution>) {
        (self.prelude, self.contributions)
    }
}

/// Apply an adjoint to a context, whichever kind it is.
pub(crate) fn apply(adjoint: Adjoint, ctx: &mut RuleCtx<'_>) -> Result<()> {
    match adjoint {
        Adjoint::Zero => {
            if ctx.args().len() == 2 {
                ctx.contribute_zeros(Pos::Left);
            }
            ctx.contribute_zeros(Pos::Right);
            Ok(())
        }
        Adjoint::Rule(template) => template(ctx),
    }
}

pub(crate) fn primitive_adjoint(prim: Prim, valence: Valence) -> Option<Adjoint> {
    PRIMITIVE_ADJOINTS
        .iter()
        .find(|entry| entry.prim == prim && entry.valence == valence)
        .map(|entry| entry.adjoint)
}

const fn rule(prim: Prim, valence: Valence, template: Template) -> PrimAdjoint {
    PrimAdjoint {
        prim,
        valence,
        adjoint: Adjoint::Rule(template),
    }
}

const fn zero(prim: Prim, valence: Valence) -> PrimAdjoint {
    PrimAdjoint {
        prim,
        valence,
        adjoint: Adjoint::Zero,
    }
}

pub(crate) static PRIMITIVE_ADJOINTS: &[PrimAdjoint] = &[
    // Arithmetic.
    rule(Prim::Add, Dy, add_dy),
    rule(Prim::Sub, Mon, sub_mon),
    rule(Prim::Sub, Dy, sub_dy),
    rule(Prim::Times, Dy, times_dy),
    rule(Prim::Div, Mon, div_mon),
    rule(Prim::Div, Dy, div_dy),
    rule(Prim::Pow, Mon, pow_mon),
    rule(Prim::Pow, Dy, pow_dy),
    rule(Prim::Circstar, Mon, circstar_mon),
    rule(Prim::Circstar, Dy, circstar_dy),
    rule(Prim::Circ, Mon, circ_mon),
    rule(Prim::Circ, Dy, circ_dy),
    rule(Prim::Pipe, Mon, pipe_mon),
    rule(Prim::Max, Dy, max_dy),
    rule(Prim::Min, Dy, min_dy),
    // Structural.
    rule(Prim::Cat, Mon, reshape_like_r),
    rule(Prim::Vcat, Mon, reshape_like_r),
    rule(Prim::Rho, Dy, reshape_like_r),
    rule(Prim::Cat, Dy, cat_dy),
    rule(Prim::Vcat, Dy, vcat_dy),
    rule(Prim::Rot, Mon, rot_mon),
    rule(Prim::Vrot, Mon, vrot_mon),
    rule(Prim::Rot, Dy, rot_dy),
    rule(Prim::Vrot, Dy, vrot_dy),
    rule(Prim::Trans, Mon, trans_mon),
    rule(Prim::Enclose, Mon, enclose_mon),
    // Selection: scatter the gradient back into zeros.
    rule(Prim::Disclose, Mon, select_into_zeros),
    rule(Prim::Disclose, Dy, select_into_zeros),
    rule(Prim::Take, Dy, select_into_zeros),
    rule(Prim::Drop, Dy, select_into_zeros),
    rule(Prim::Squad, Dy, select_into_zeros),
    rule(Prim::Trans, Dy, select_into_zeros),
    rule(Prim::In, Mon, enlist_mon),
    // Non-differentiable.
    zero(Prim::Gradedown, Mon),
    zero(Prim::Gradeup, Mon),
    zero(Prim::Iota, Mon),
    zero(Prim::Match, Mon),
    zero(Prim::Max, Mon),
    zero(Prim::Min, Mon),
    zero(Prim::Nmatch, Mon),
    zero(Prim::Rho, Mon),
    zero(Prim::Tilde, Mon),
    zero(Prim::Times, Mon),
    zero(Prim::And, Dy),
    zero(Prim::Eq, Dy),
    zero(Prim::Gt, Dy),
    zero(Prim::Gteq, Dy),
    zero(Prim::Lt, Dy),
    zero(Prim::Lteq, Dy),
    zero(Prim::Match, Dy),
    zero(Prim::Nand, Dy),
    zero(Prim::Nmatch, Dy),
    zero(Prim::Nor, Dy),
    zero(Prim::Or, Dy),
];

// ─── Arithmetic ────────────────────────────────────────────────────

fn add_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Left, c.dy());
    c.contribute(Pos::Right, c.dy());
    Ok(())
}

fn sub_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, monadic(Prim::Sub, c.dy()));
    Ok(())
}

fn sub_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Left, c.dy());
    c.contribute(Pos::Right, monadic(Prim::Sub, c.dy()));
    Ok(())
}

fn times_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Left, dyadic(Prim::Times, c.dy(), c.r()));
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), c.l()));
    Ok(())
}

/// `dr = dy×-÷r×r`
fn div_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    let rr = dyadic(Prim::Times, c.r(), c.r());
    let d = monadic(Prim::Sub, monadic(Prim::Div, rr));
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), d));
    Ok(())
}

/// `dl = dy÷r`, `dr = dy×-l÷r×r`
fn div_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Left, dyadic(Prim::Div, c.dy(), c.r()));
    let rr = dyadic(Prim::Times, c.r(), c.r());
    let d = monadic(Prim::Sub, dyadic(Prim::Div, c.l(), rr));
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), d));
    Ok(())
}

fn pow_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), c.y()));
    Ok(())
}

/// `dl = dy×r×l*r-1`, `dr = dy×(⍟l)×l*r`
fn pow_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    let power = dyadic(Prim::Pow, c.l(), dyadic(Prim::Sub, c.r(), num("1")));
    let dl = dyadic(Prim::Times, c.r(), power);
    c.contribute(Pos::Left, dyadic(Prim::Times, c.dy(), dl));
    // ⍟l is undefined for a non-positive base; left as is.
    let dr = dyadic(
        Prim::Times,
        monadic(Prim::Circstar, c.l()),
        dyadic(Prim::Pow, c.l(), c.r()),
    );
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), dr));
    Ok(())
}

fn circstar_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, dyadic(Prim::Div, c.dy(), c.r()));
    Ok(())
}

/// `dl = dy×-(l⍟r)÷l×⍟l`, `dr = dy÷(⍟l)×r`
fn circstar_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    let log = dyadic(Prim::Circstar, c.l(), c.r());
    let scale = dyadic(Prim::Times, c.l(), monadic(Prim::Circstar, c.l()));
    let dl = monadic(Prim::Sub, dyadic(Prim::Div, log, scale));
    c.contribute(Pos::Left, dyadic(Prim::Times, c.dy(), dl));
    let dr = dyadic(Prim::Times, monadic(Prim::Circstar, c.l()), c.r());
    c.contribute(Pos::Right, dyadic(Prim::Div, c.dy(), dr));
    Ok(())
}

fn circ_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), monadic(Prim::Circ, num("1"))));
    Ok(())
}

/// Sine and cosine: `dr = dy×(×1.5-l)×((~l-1)+1)○r`. The sign is `+` for
/// sine and `-` for cosine; `(~l-1)+1` swaps 1 and 2.
fn circ_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    let sign = monadic(Prim::Times, dyadic(Prim::Sub, num("1.5"), c.l()));
    let other = dyadic(
        Prim::Add,
        monadic(Prim::Tilde, dyadic(Prim::Sub, c.l(), num("1"))),
        num("1"),
    );
    let d = dyadic(Prim::Times, sign, dyadic(Prim::Circ, other, c.r()));
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), d));
    Ok(())
}

fn pipe_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), monadic(Prim::Times, c.r())));
    Ok(())
}

fn max_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Left, dyadic(Prim::Times, c.dy(), dyadic(Prim::Gteq, c.l(), c.r())));
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), dyadic(Prim::Gteq, c.r(), c.l())));
    Ok(())
}

fn min_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Left, dyadic(Prim::Times, c.dy(), dyadic(Prim::Lteq, c.l(), c.r())));
    c.contribute(Pos::Right, dyadic(Prim::Times, c.dy(), dyadic(Prim::Lteq, c.r(), c.l())));
    Ok(())
}

// ─── Structural ────────────────────────────────────────────────────

/// `dr = (⍴r)⍴dy`
fn reshape_like_r(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, dyadic(Prim::Rho, monadic(Prim::Rho, c.r()), c.dy()));
    Ok(())
}

/// Catenation along the last axis: split the transposed gradient at the
/// length of `l`'s last axis.
fn cat_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    let t = c.bind(monadic(Prim::Trans, c.dy()));
    let n = c.bind(monadic(Prim::Nmatch, monadic(Prim::Trans, c.l())));
    c.contribute(Pos::Left, monadic(Prim::Trans, dyadic(Prim::Take, n.clone(), t.clone())));
    c.contribute(Pos::Right, monadic(Prim::Trans, dyadic(Prim::Drop, n, t)));
    Ok(())
}

fn vcat_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    let n = c.bind(monadic(Prim::Nmatch, c.l()));
    c.contribute(Pos::Left, dyadic(Prim::Take, n.clone(), c.dy()));
    c.contribute(Pos::Right, dyadic(Prim::Drop, n, c.dy()));
    Ok(())
}

fn rot_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, monadic(Prim::Rot, c.dy()));
    Ok(())
}

fn vrot_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, monadic(Prim::Vrot, c.dy()));
    Ok(())
}

fn rot_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, dyadic(Prim::Rot, monadic(Prim::Sub, c.l()), c.dy()));
    Ok(())
}

fn vrot_dy(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, dyadic(Prim::Vrot, monadic(Prim::Sub, c.l()), c.dy()));
    Ok(())
}

fn trans_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, monadic(Prim::Trans, c.dy()));
    Ok(())
}

fn enclose_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    c.contribute(Pos::Right, monadic(Prim::Disclose, c.dy()));
    Ok(())
}

// ─── Selection ─────────────────────────────────────────────────────

/// `z←0×r ⋄ (F z)←dy`, then `dr = z`, where `F` is the forward selection.
fn select_into_zeros(c: &mut RuleCtx<'_>) -> Result<()> {
    if c.wants(Pos::Right) {
        let z = c.bind(zeros_like(c.r()));
        scatter(c, z)?;
    }
    Ok(())
}

/// Like [`select_into_zeros`], but into a copy of `r`: enlisting selects
/// every simple scalar, so nothing of the copy survives.
fn enlist_mon(c: &mut RuleCtx<'_>) -> Result<()> {
    if c.wants(Pos::Right) {
        let z = c.bind(c.r());
        scatter(c, z)?;
    }
    Ok(())
}

fn scatter(c: &mut RuleCtx<'_>, z: Expr) -> Result<()> {
    let forward: &Expr = c.call;
    let Expr::Call(call) = forward else {
        return Ok(());
    };
    let mut selector = call.clone();
    let last = selector.operands.len() - 1;
    selector.operands[last] = z.clone();
    c.emit(Stmt::SelectiveAssign(Expr::Call(selector), c.dy()));
    c.contribute(Pos::Right, z);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{render_expr, render_stmt};

    fn run(call: &Expr, wants: [bool; 2]) -> (Vec<String>, Vec<(Pos, String)>) {
        let mut temps = Temps::default();
        let mut ctx = RuleCtx::new(Name::Temp(100), Name::alpha(), call, wants, &mut temps);
        let adjoint = match call {
            Expr::Call(c) => primitive_adjoint(c.prim().unwrap(), c.valence).unwrap(),
            _ => panic!("not a primitive call"),
        };
        apply(adjoint, &mut ctx).unwrap();
        let (prelude, contributions) = ctx.finish();
        (
            prelude.iter().map(render_stmt).collect(),
            contributions
                .into_iter()
                .map(|c| (c.pos, render_expr(&c.expr)))
                .collect(),
        )
    }

    fn x() -> Expr {
        var(Name::user("x"))
    }

    fn w() -> Expr {
        var(Name::user("w"))
    }

    #[test]
    fn test_every_entry_is_unique() {
        for (i, a) in PRIMITIVE_ADJOINTS.iter().enumerate() {
            for b in &PRIMITIVE_ADJOINTS[i + 1..] {
                assert!(
                    !(a.prim == b.prim && a.valence == b.valence),
                    "{:?} {:?} listed twice",
                    a.prim,
                    a.valence
                );
            }
        }
    }

    #[test]
    fn test_missing_entries() {
        assert!(primitive_adjoint(Prim::Squad, Valence::Monadic).is_none());
        assert!(primitive_adjoint(Prim::Add, Valence::Monadic).is_none());
        assert!(primitive_adjoint(Prim::Add, Valence::Dyadic).is_some());
    }

    #[test]
    fn test_product_rule() {
        let (prelude, contributions) = run(&dyadic(Prim::Times, x(), w()), [true, true]);
        assert!(prelude.is_empty());
        assert_eq!(
            contributions,
            vec![(Pos::Left, "⍺×w".to_string()), (Pos::Right, "⍺×x".to_string())]
        );
    }

    #[test]
    fn test_only_wanted_positions_contribute() {
        let (_, contributions) = run(&dyadic(Prim::Div, x(), w()), [false, true]);
        assert_eq!(contributions, vec![(Pos::Right, "⍺×-x÷w×w".to_string())]);
    }

    #[test]
    fn test_trig_rule() {
        let (_, contributions) = run(&dyadic(Prim::Circ, num("1"), w()), [false, true]);
        assert_eq!(
            contributions,
            vec![(Pos::Right, "⍺×(×1.5-1)×((~1-1)+1)○w".to_string())]
        );
    }

    #[test]
    fn test_catenate_splits_transposed_gradient() {
        let (prelude, contributions) = run(&dyadic(Prim::Cat, x(), w()), [true, true]);
        assert_eq!(prelude, vec!["⍙1←⍉⍺", "⍙2←≢⍉x"]);
        assert_eq!(
            contributions,
            vec![(Pos::Left, "⍉⍙2↑⍙1".to_string()), (Pos::Right, "⍉⍙2↓⍙1".to_string())]
        );
    }

    #[test]
    fn test_take_scatters_into_zeros() {
        let (prelude, contributions) = run(&dyadic(Prim::Take, num("2"), w()), [false, true]);
        assert_eq!(prelude, vec!["⍙1←0×w", "(2↑⍙1)←⍺"]);
        assert_eq!(contributions, vec![(Pos::Right, "⍙1".to_string())]);
    }

    #[test]
    fn test_enlist_scatters_into_a_copy() {
        let (prelude, _) = run(&monadic(Prim::In, w()), [false, true]);
        assert_eq!(prelude, vec!["⍙1←w", "(∊⍙1)←⍺"]);
    }

    #[test]
    fn test_non_differentiable_gives_zeros() {
        let (_, contributions) = run(&dyadic(Prim::Eq, x(), w()), [true, true]);
        assert_eq!(
            contributions,
            vec![(Pos::Left, "0×x".to_string()), (Pos::Right, "0×w".to_string())]
        );
        let (_, monadic_zero) = run(&monadic(Prim::Rho, w()), [false, true]);
        assert_eq!(monadic_zero, vec![(Pos::Right, "0×w".to_string())]);
    }
}
