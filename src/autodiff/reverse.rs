//! The backward pass: walk a normalized body in reverse and accumulate
//! gradients.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::ir::helpers::*;
use crate::ir::*;
use crate::lower::{retarget, selection_target};
use crate::render::render_expr;

use super::adjoint::{self, Contribution, Pos, RuleCtx};
use super::normalize::Temps;
use super::operators::operator_adjoint;

pub(crate) struct Backward<'a> {
    active: &'a HashSet<Name>,
    temps: &'a mut Temps,
    /// Name currently holding each variable's gradient. Absent means zero.
    acc: HashMap<Name, Name>,
    out: Vec<Stmt>,
}

impl<'a> Backward<'a> {
    pub(crate) fn new(active: &'a HashSet<Name>, temps: &'a mut Temps) -> Self {
        Self {
            active,
            temps,
            acc: HashMap::new(),
            out: Vec::new(),
        }
    }

    /// Declare that `holder` holds the gradient of `result`.
    pub(crate) fn seed(&mut self, result: Name, holder: Name) {
        self.acc.insert(result, holder);
    }

    /// Emit the backward statements for `stmts`, returning them together
    /// with the final accumulator.
    pub(crate) fn run(mut self, stmts: &[Stmt]) -> Result<(Vec<Stmt>, HashMap<Name, Name>)> {
        for stmt in stmts.iter().rev() {
            match stmt {
                Stmt::Assign(y, value) => self.assign(y, value)?,
                Stmt::SelectiveAssign(selector, value) => self.selective(selector, value)?,
                Stmt::Return(_) => {}
            }
        }
        Ok((self.out, self.acc))
    }

    fn is_active(&self, expr: &Expr) -> bool {
        matches!(expr, Expr::Var(name) if self.active.contains(name))
    }

    fn assign(&mut self, y: &Name, value: &Expr) -> Result<()> {
        let Some(dy) = self.acc.get(y).cloned() else {
            return Ok(());
        };
        let args: &[Expr] = match value {
            Expr::Var(x) => {
                if self.active.contains(x) {
                    self.pass_through(x, dy);
                }
                return Ok(());
            }
            Expr::Num(_) | Expr::Literal(_) => return Ok(()),
            Expr::Call(call) => &call.operands,
            Expr::OpCall(op) => &op.call_operands,
            Expr::Strand(items) => items,
        };
        let wants = match args {
            [left, right] => [self.is_active(left), self.is_active(right)],
            [right] => [false, self.is_active(right)],
            _ if args.iter().any(|a| self.is_active(a)) => {
                return Err(Error::MissingAdjoint(render_expr(value)))
            }
            _ => [false, false],
        };
        if wants == [false, false] {
            return Ok(());
        }

        let missing = || Error::MissingAdjoint(render_expr(value));
        let mut ctx = RuleCtx::new(y.clone(), dy, value, wants, &mut *self.temps);
        match value {
            Expr::Call(call) => {
                let prim = call.prim().ok_or_else(missing)?;
                let rule = adjoint::primitive_adjoint(prim, call.valence).ok_or_else(missing)?;
                log::trace!("adjoint {}{} for {}", prim.name(), call.valence.suffix(), y);
                adjoint::apply(rule, &mut ctx)?;
            }
            Expr::OpCall(op) => {
                let rule = operator_adjoint(op).ok_or_else(missing)?;
                log::trace!("adjoint {} for {}", op.key(), y);
                rule(&mut ctx)?;
            }
            _ => return Err(missing()),
        }
        let (prelude, contributions) = ctx.finish();
        self.out.extend(prelude);
        for Contribution { pos, expr, zero } in contributions {
            let operand = match (pos, args) {
                (Pos::Left, [left, _]) => left,
                (_, args) => &args[args.len() - 1],
            };
            if let Expr::Var(target) = operand {
                self.accumulate(target, expr, zero);
            }
        }
        Ok(())
    }

    /// `y←x`: the gradient of `y` flows to `x` unchanged.
    fn pass_through(&mut self, x: &Name, dy: Name) {
        match self.acc.get(x).cloned() {
            None => {
                self.acc.insert(x.clone(), dy);
            }
            Some(existing) => {
                let sum = dyadic(Prim::Add, var(existing), var(dy));
                self.out.push(Stmt::Assign(x.grad(), sum));
                self.acc.insert(x.clone(), x.grad());
            }
        }
    }

    fn accumulate(&mut self, target: &Name, expr: Expr, zero: bool) {
        let grad = target.grad();
        match self.acc.get(target).cloned() {
            None => self.out.push(Stmt::Assign(grad.clone(), expr)),
            Some(_) if zero => return,
            Some(existing) => {
                self.out.push(Stmt::Assign(grad.clone(), dyadic(Prim::Add, var(existing), expr)))
            }
        }
        self.acc.insert(target.clone(), grad);
    }

    /// `(F t)←v`: `v` receives `F` of the gradient of `t`, and the selected
    /// part of that gradient is then zeroed, since it was overwritten.
    fn selective(&mut self, selector: &Expr, value: &Expr) -> Result<()> {
        let target = selection_target(selector)?;
        let Some(g) = self.acc.get(&target).cloned() else {
            return Ok(());
        };
        if let Expr::Var(v) = value {
            if self.active.contains(v) {
                self.accumulate(v, retarget(selector, var(g.clone())), false);
            }
        }
        let grad = target.grad();
        if g != grad {
            self.out.push(Stmt::Assign(grad.clone(), var(g)));
            self.acc.insert(target.clone(), grad.clone());
        }
        self.out
            .push(Stmt::SelectiveAssign(retarget(selector, var(grad)), num("0")));
        Ok(())
    }
}
