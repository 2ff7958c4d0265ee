//! Surface→IR lowering.
//!
//! The oracle's tree is first turned into a [`Surface`] call tree that
//! mirrors its shape: function applications (`App1`, `App2`) and operator
//! applications (`AppOpr1`, `AppOpr2`) are both "something applied to
//! arguments". Two passes then normalize it:
//!
//! 1. **Valence resolution** marks every application monadic or dyadic
//!    from its argument count, never from the callee's name.
//! 2. **Operator fusion** rewrites "operator applied to operands, then
//!    called" into a single [`OpCall`] carrying both the operator's and the
//!    derived function's valence. Arguments are fused before their parent,
//!    since operands may themselves be operator calls.
//!
//! The result is the forward [`Function`].


use crate::error::{Error, Result};
use crate::ir::*;
use crate::syntax::TreeNode;

/// Name given to a dfn whose tree carries no name.
pub const ANONYMOUS: &str = "f";

/// The oracle's call tree before valence resolution and fusion.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Surface {
    Leaf(String),
    /// Tokens of an inlined vector literal.
    Inline(String),
    Apply {
        func: Box<Surface>,
        args: Vec<Surface>,
        valence: Option<Valence>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SurfaceStmt {
    Assign(Surface, Surface),
    Expr(Surface),
}

/// Lower a dfn tree (`Assign(name,Lam(…))` or `Lam(…)`) to IR.
pub fn lower(tree: &TreeNode) -> Result<Function> {
    let (name, lam) = match (tree.name.as_str(), tree.children.as_slice()) {
        ("Assign", [target, lam]) if target.is_leaf() && lam.name == "Lam" => {
            check_identifier(&target.name)?;
            (target.name.clone(), lam)
        }
        ("Lam", _) => (ANONYMOUS.to_string(), tree),
        _ => {
            return Err(Error::unsupported(format!(
                "expected a dfn definition, found `{}`",
                tree.name
            )))
        }
    };
    if lam.children.is_empty() {
        return Err(Error::unsupported(format!("dfn `{}` has an empty body", name)));
    }

    let mut stmts = lam
        .children
        .iter()
        .map(surface_stmt)
        .collect::<Result<Vec<_>>>()?;
    for stmt in &mut stmts {
        match stmt {
            SurfaceStmt::Assign(target, value) => {
                resolve_valence(target)?;
                resolve_valence(value)?;
            }
            SurfaceStmt::Expr(expr) => resolve_valence(expr)?,
        }
    }

    let last = stmts.len() - 1;
    let mut body = Vec::with_capacity(stmts.len() + 1);
    for (i, stmt) in stmts.into_iter().enumerate() {
        match stmt {
            SurfaceStmt::Assign(target, value) => {
                let result = lower_assign(target, value, &mut body)?;
                if i == last {
                    body.push(Stmt::Return(result));
                }
            }
            SurfaceStmt::Expr(expr) if i == last => body.push(Stmt::Return(fuse(expr)?)),
            SurfaceStmt::Expr(_) => {
                return Err(Error::unsupported(format!(
                    "dfn `{}` has a bare expression before its result (guards and branches are not supported)",
                    name
                )))
            }
        }
    }
    log::debug!("lowered `{}` to {} statements", name, body.len());
    Ok(Function::new(name, body))
}

/// Lower one assignment, returning an expression for the assigned value.
fn lower_assign(target: Surface, value: Surface, body: &mut Vec<Stmt>) -> Result<Expr> {
    let value = fuse(value)?;
    match target {
        Surface::Leaf(name) => {
            check_identifier(&name)?;
            let name = Name::User(name);
            body.push(Stmt::Assign(name.clone(), value));
            Ok(Expr::Var(name))
        }
        selector @ Surface::Apply { .. } => {
            let selector = fuse(selector)?;
            let target = selection_target(&selector)?;
            body.push(Stmt::SelectiveAssign(selector, value));
            Ok(Expr::Var(target))
        }
        Surface::Inline(text) => Err(Error::unsupported(format!(
            "cannot assign to the literal `{}`",
            text
        ))),
    }
}

/// The variable a selective assignment writes into: the innermost right
/// argument of the selecting calls.
pub(crate) fn selection_target(selector: &Expr) -> Result<Name> {
    match selector {
        Expr::Call(call) if call.prim().is_some_and(is_selecting) => {
            match call.right() {
                Expr::Var(name) => Ok(name.clone()),
                inner @ Expr::Call(_) => selection_target(inner),
                other => Err(Error::unsupported(format!(
                    "selective assignment into {:?}",
                    other
                ))),
            }
        }
        _ => Err(Error::unsupported(
            "selective assignment needs a selecting function (⊃ ↑ ↓ ⌷ ⍉ ∊)",
        )),
    }
}

/// Replace the target at the bottom of a selector's right spine.
pub(crate) fn retarget(selector: &Expr, target: Expr) -> Expr {
    match selector {
        Expr::Call(call) => {
            let mut call = call.clone();
            let last = call.operands.len() - 1;
            call.operands[last] = retarget(&call.operands[last], target);
            Expr::Call(call)
        }
        _ => target,
    }
}

/// Primitives that can appear in a selective assignment.
pub(crate) fn is_selecting(prim: Prim) -> bool {
    matches!(
        prim,
        Prim::Disclose | Prim::Take | Prim::Drop | Prim::Squad | Prim::Trans | Prim::In
    )
}

// ─── Tree → Surface ────────────────────────────────────────────────

fn surface_stmt(node: &TreeNode) -> Result<SurfaceStmt> {
    match (node.name.as_str(), node.children.as_slice()) {
        ("Assign", [target, value]) => Ok(SurfaceStmt::Assign(surface(target)?, surface(value)?)),
        _ => Ok(SurfaceStmt::Expr(surface(node)?)),
    }
}

fn surface(node: &TreeNode) -> Result<Surface> {
    if node.is_leaf() {
        return Ok(Surface::Leaf(node.name.clone()));
    }
    match node.name.as_str() {
        "App1" | "App2" => {
            let (func, args) = split_first(node)?;
            Ok(Surface::Apply {
                func: Box::new(surface(func)?),
                args: args.iter().map(surface).collect::<Result<_>>()?,
                valence: None,
            })
        }
        "AppOpr1" | "AppOpr2" => {
            let (op, operands) = split_first(node)?;
            if !op.is_leaf() {
                return Err(Error::unsupported(format!("operator `{}`", op)));
            }
            Ok(Surface::Apply {
                func: Box::new(Surface::Leaf(op.name.clone())),
                args: operands.iter().map(surface).collect::<Result<_>>()?,
                valence: None,
            })
        }
        "Inline" => {
            let mut tokens = Vec::with_capacity(node.children.len());
            for child in &node.children {
                if !child.is_leaf() {
                    return Err(Error::unsupported(format!("vector literal item `{}`", child)));
                }
                tokens.push(child.name.as_str());
            }
            Ok(Surface::Inline(tokens.join(" ")))
        }
        "Lam" => Err(Error::unsupported("nested dfns")),
        "Assign" => Err(Error::unsupported(format!("assignment inside an expression `{}`", node))),
        other => Err(Error::unsupported(format!("parser node `{}`", other))),
    }
}

fn split_first(node: &TreeNode) -> Result<(&TreeNode, &[TreeNode])> {
    match node.children.split_first() {
        Some((first, rest)) if !rest.is_empty() => Ok((first, rest)),
        _ => Err(Error::unsupported(format!("`{}` without arguments", node))),
    }
}

// ─── Pass 1: valence resolution ────────────────────────────────────

/// Mark every application with the valence implied by its argument count.
pub(crate) fn resolve_valence(surface: &mut Surface) -> Result<()> {
    if let Surface::Apply {
        func,
        args,
        valence,
    } = surface
    {
        resolve_valence(func)?;
        for arg in args.iter_mut() {
            resolve_valence(arg)?;
        }
        *valence = Some(Valence::from_arity(args.len()).ok_or_else(|| {
            match func.as_ref() {
                Surface::Leaf(name) if Operator::from_name(name).is_some() => {
                    Error::unsupported(format!(
                        "operator `{}` applied to {} operands",
                        name,
                        args.len()
                    ))
                }
                _ => Error::unsupported(format!("function applied to {} arguments", args.len())),
            }
        })?);
    }
    Ok(())
}

// ─── Pass 2: operator fusion ───────────────────────────────────────

/// Convert a valence-resolved surface expression into IR, fusing operator
/// applications with the call of their derived function.
pub(crate) fn fuse(surface: Surface) -> Result<Expr> {
    match surface {
        Surface::Leaf(name) => leaf(name),
        Surface::Inline(text) => Ok(Expr::Literal(text)),
        Surface::Apply {
            func,
            args,
            valence,
        } => {
            let valence = valence.ok_or_else(|| Error::unsupported("unresolved valence"))?;
            match *func {
                Surface::Leaf(name) => {
                    if let Some(prim) = Prim::from_name(&name) {
                        let operands = args.into_iter().map(fuse).collect::<Result<Vec<_>>>()?;
                        Ok(Expr::Call(Call {
                            callee: Callee::Prim(prim),
                            valence,
                            operands,
                        }))
                    } else if let Some(op) = Operator::from_name(&name) {
                        Err(Error::unsupported(format!(
                            "derived function `{}` used as a value",
                            op.glyph()
                        )))
                    } else {
                        Err(Error::unsupported(format!(
                            "call to user-defined function `{}`",
                            name
                        )))
                    }
                }
                Surface::Apply {
                    func: op,
                    args: op_args,
                    valence: op_valence,
                } => {
                    let operator = match *op {
                        Surface::Leaf(ref name) => Operator::from_name(name),
                        _ => None,
                    }
                    .ok_or_else(|| Error::unsupported("function returning a function"))?;
                    let operator_valence =
                        op_valence.ok_or_else(|| Error::unsupported("unresolved valence"))?;
                    let operator_operands =
                        op_args.into_iter().map(operand).collect::<Result<Vec<_>>>()?;
                    let call_operands = args.into_iter().map(fuse).collect::<Result<Vec<_>>>()?;
                    Ok(Expr::OpCall(OpCall {
                        operator,
                        operator_valence,
                        derived_valence: valence,
                        operator_operands,
                        call_operands,
                    }))
                }
                Surface::Inline(text) => Err(Error::unsupported(format!(
                    "literal `{}` called as a function",
                    text
                ))),
            }
        }
    }
}

fn operand(surface: Surface) -> Result<Operand> {
    if let Surface::Leaf(name) = &surface {
        if let Some(prim) = Prim::from_name(name) {
            return Ok(Operand::Prim(prim));
        }
    }
    Ok(Operand::Array(fuse(surface)?))
}

fn leaf(name: String) -> Result<Expr> {
    match name.as_str() {
        "Alpha" => return Ok(Expr::Var(Name::alpha())),
        "Omega" => return Ok(Expr::Var(Name::omega())),
        _ => {}
    }
    if is_number(&name) {
        return Ok(Expr::Num(name));
    }
    if name.starts_with('\'') {
        return Ok(Expr::Literal(name));
    }
    if Prim::from_name(&name).is_some() || Operator::from_name(&name).is_some() {
        return Err(Error::unsupported(format!(
            "function `{}` used as a value",
            name
        )));
    }
    check_identifier(&name)?;
    Ok(Expr::Var(Name::User(name)))
}

fn is_number(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('¯') | Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit() || c == '.'),
        _ => false,
    }
}

/// Reject user names that collide with reserved or generated names.
pub(crate) fn check_identifier(name: &str) -> Result<()> {
    if is_reserved_name(name) || name.contains(['∆', '⍙']) || is_number(name) {
        return Err(Error::IllegalIdentifier(name.to_string()));
    }
    Ok(())
}
