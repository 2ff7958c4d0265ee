//! Normalization to single-assignment form.
//!
//! After this pass every call's operands are atoms, every name is assigned
//! exactly once (reassigned user variables become versions), and the result
//! is a variable. The backward pass relies on all three.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::ir::*;
use crate::lower::{retarget, selection_target};

/// Source of fresh temporaries. Shared by normalization and the backward
/// pass, so numbering continues across both.
#[derive(Debug, Default)]
pub(crate) struct Temps {
    next: u32,
}

impl Temps {
    pub(crate) fn fresh(&mut self) -> Name {
        self.next += 1;
        Name::Temp(self.next)
    }
}

/// A normalized body: statements without the `Return`, and the name it
/// returned.
#[derive(Debug)]
pub(crate) struct Normalized {
    pub stmts: Vec<Stmt>,
    pub result: Name,
}

pub(crate) fn normalize(body: &[Stmt], temps: &mut Temps) -> Result<Normalized> {
    let mut cx = Normalizer {
        temps,
        current: HashMap::new(),
        versions: HashMap::new(),
        out: Vec::with_capacity(body.len() * 2),
    };
    for stmt in body {
        match stmt {
            Stmt::Assign(name, value) => {
                let value = cx.flatten_value(value)?;
                let target = cx.define(name);
                cx.out.push(Stmt::Assign(target, value));
            }
            Stmt::SelectiveAssign(selector, value) => cx.selective_assign(selector, value)?,
            Stmt::Return(value) => {
                let result = match cx.atom(value)? {
                    Expr::Var(name) => name,
                    constant => cx.bind(constant),
                };
                return Ok(Normalized {
                    stmts: cx.out,
                    result,
                });
            }
        }
    }
    Err(Error::unsupported("dfn without a result"))
}

struct Normalizer<'a> {
    temps: &'a mut Temps,
    /// Latest definition of each user variable.
    current: HashMap<String, Name>,
    versions: HashMap<String, u32>,
    out: Vec<Stmt>,
}

impl Normalizer<'_> {
    /// The name a fresh assignment to `name` defines.
    fn define(&mut self, name: &Name) -> Name {
        match name {
            Name::User(user) => {
                let defined = match self.current.get(user) {
                    None => name.clone(),
                    Some(_) => {
                        let n = self.versions.entry(user.clone()).or_insert(0);
                        *n += 1;
                        Name::Version(user.clone(), *n)
                    }
                };
                self.current.insert(user.clone(), defined.clone());
                defined
            }
            other => other.clone(),
        }
    }

    fn resolve(&self, name: &Name) -> Name {
        match name {
            Name::User(user) => self.current.get(user).cloned().unwrap_or_else(|| name.clone()),
            other => other.clone(),
        }
    }

    fn bind(&mut self, expr: Expr) -> Name {
        let temp = self.temps.fresh();
        self.out.push(Stmt::Assign(temp.clone(), expr));
        temp
    }

    /// Flatten an expression into an atom, binding compound parts to
    /// temporaries.
    fn atom(&mut self, expr: &Expr) -> Result<Expr> {
        let flat = self.flatten_value(expr)?;
        if flat.is_atom() {
            Ok(flat)
        } else {
            Ok(Expr::Var(self.bind(flat)))
        }
    }

    /// Flatten an expression so that its operands are atoms. The expression
    /// itself may stay compound.
    fn flatten_value(&mut self, expr: &Expr) -> Result<Expr> {
        Ok(match expr {
            Expr::Var(name) => Expr::Var(self.resolve(name)),
            Expr::Num(_) | Expr::Literal(_) => expr.clone(),
            Expr::Call(call) => Expr::Call(Call {
                callee: call.callee.clone(),
                valence: call.valence,
                operands: self.atoms(&call.operands)?,
            }),
            Expr::OpCall(op) => {
                let mut operator_operands = Vec::with_capacity(op.operator_operands.len());
                for operand in &op.operator_operands {
                    operator_operands.push(match operand {
                        Operand::Array(expr) => Operand::Array(self.atom(expr)?),
                        other => other.clone(),
                    });
                }
                Expr::OpCall(OpCall {
                    operator: op.operator,
                    operator_valence: op.operator_valence,
                    derived_valence: op.derived_valence,
                    operator_operands,
                    call_operands: self.atoms(&op.call_operands)?,
                })
            }
            Expr::Strand(items) => Expr::Strand(self.atoms(items)?),
        })
    }

    fn atoms(&mut self, exprs: &[Expr]) -> Result<Vec<Expr>> {
        exprs.iter().map(|e| self.atom(e)).collect()
    }

    /// `(F x)←v` becomes `x⍙n←x` followed by `(F x⍙n)←v`. Operands off the
    /// selector's right spine are flattened; the spine stays nested so the
    /// selection still names its target.
    fn selective_assign(&mut self, selector: &Expr, value: &Expr) -> Result<()> {
        let target = selection_target(selector)?;
        let value = self.atom(value)?;
        let selector = self.flatten_selector(selector)?;
        let previous = self.resolve(&target);
        let user = match &target {
            Name::User(user) => user.clone(),
            other => {
                return Err(Error::unsupported(format!(
                    "selective assignment into `{}`",
                    other
                )))
            }
        };
        let n = self.versions.entry(user.clone()).or_insert(0);
        *n += 1;
        let version = Name::Version(user.clone(), *n);
        self.current.insert(user, version.clone());
        self.out.push(Stmt::Assign(version.clone(), Expr::Var(previous)));
        let selector = retarget(&selector, Expr::Var(version));
        self.out.push(Stmt::SelectiveAssign(selector, value));
        Ok(())
    }

    fn flatten_selector(&mut self, selector: &Expr) -> Result<Expr> {
        match selector {
            Expr::Call(call) => {
                let right = self.flatten_selector(call.right())?;
                let mut operands = Vec::with_capacity(call.operands.len());
                if let Some(left) = call.left() {
                    operands.push(self.atom(left)?);
                }
                operands.push(right);
                Ok(Expr::Call(Call {
                    callee: call.callee.clone(),
                    valence: call.valence,
                    operands,
                }))
            }
            // The target itself; renamed to its new version by the caller.
            other => Ok(other.clone()),
        }
    }
}
