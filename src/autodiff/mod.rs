//! Reverse-mode differentiation of IR functions.
//!
//! `differentiate` turns a forward dfn into its gradient dfn:
//!
//! 1. guards reject constructs whose adjoints are known to be partial,
//! 2. the body is normalized to single-assignment form,
//! 3. activity analysis finds the variables gradients must reach,
//! 4. the output gradient is seeded,
//! 5. the backward pass accumulates contributions statement by statement,
//! 6. each parameter's gradient is assigned and returned.
//!
//! Gradient functions take the output gradient as `⍺`, defaulting to ones
//! shaped like the output. A dyadic function's arguments arrive as a pair
//! in `⍵` and the gradient returns the pair `⍙da ⍙dw`.

mod activity;
mod adjoint;
mod guard;
mod normalize;
mod operators;
mod reverse;


use crate::error::{Error, Result};
use crate::ir::helpers::*;
use crate::ir::*;

use normalize::{normalize, Temps};
use reverse::Backward;

/// Prefix of a gradient function's name.
pub const GRADIENT_PREFIX: &str = "d";

/// How a gradient body receives its output gradient and returns its result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// A named gradient function: `dy df ⍵` or `dy df ⍺ ⍵`, with the pair
    /// unpacked from `⍵` when dyadic.
    TopLevel,
    /// An inline derivative of a primitive with respect to one argument,
    /// seeded with ones.
    Meta,
}

/// Differentiate a forward function with respect to all its arguments.
pub fn differentiate(function: &Function) -> Result<Function> {
    guard::check(function)?;
    let wrt: &[Param] = match function.valence {
        Valence::Monadic => &[Param::Omega],
        Valence::Dyadic => &[Param::Alpha, Param::Omega],
    };
    let body = gradient_body(function, Mode::TopLevel, wrt)?;
    let gradient = Function::new(format!("{}{}", GRADIENT_PREFIX, function.name), body);
    log::debug!(
        "differentiated `{}` into {} statements",
        function.name,
        gradient.body.len()
    );
    Ok(gradient)
}

/// The derivative of a primitive with respect to one of its arguments, as
/// a function suitable for inlining as a block.
pub fn meta_derivative(prim: Prim, valence: Valence, wrt: Param) -> Result<Function> {
    let call = match (valence, wrt) {
        (Valence::Monadic, Param::Omega) => monadic(prim, omega()),
        (Valence::Dyadic, _) => dyadic(prim, alpha(), omega()),
        (Valence::Monadic, Param::Alpha) => {
            return Err(Error::unsupported(format!(
                "derivative of monadic `{}` with respect to ⍺",
                prim.glyph()
            )))
        }
    };
    let function = Function::new(prim.name(), vec![Stmt::Return(call)]);
    let body = gradient_body(&function, Mode::Meta, &[wrt])?;
    Ok(Function::new(
        format!("{}{}", GRADIENT_PREFIX, prim.name()),
        body,
    ))
}

fn gradient_body(function: &Function, mode: Mode, wrt: &[Param]) -> Result<Vec<Stmt>> {
    let mut temps = Temps::default();
    let mut out = Vec::new();
    let mut forward = function.body.clone();

    let unpack = mode == Mode::TopLevel && function.valence == Valence::Dyadic;
    if unpack {
        out.push(Stmt::Assign(
            Name::Unpacked(Param::Alpha),
            monadic(Prim::Disclose, omega()),
        ));
        out.push(Stmt::Assign(
            Name::Unpacked(Param::Omega),
            dyadic(Prim::Disclose, num("2"), omega()),
        ));
        for stmt in &mut forward {
            stmt.rename(&mut |name| match name {
                Name::Param(p) => Some(Name::Unpacked(*p)),
                _ => None,
            });
        }
    }
    let params: Vec<Name> = wrt
        .iter()
        .map(|&p| if unpack { Name::Unpacked(p) } else { Name::Param(p) })
        .collect();

    let normalized = normalize(&forward, &mut temps)?;
    let active = activity::active_names(&normalized.stmts, &params, &normalized.result);
    out.extend(normalized.stmts.iter().cloned());

    let y = normalized.result;
    let seed = match mode {
        Mode::TopLevel => Name::alpha(),
        Mode::Meta => y.grad(),
    };
    out.push(Stmt::Assign(seed.clone(), ones_like(var(y.clone()))));

    let mut backward = Backward::new(&active, &mut temps);
    backward.seed(y, seed);
    let (stmts, acc) = backward.run(&normalized.stmts)?;
    out.extend(stmts);

    for param in &params {
        let grad = param.grad();
        match acc.get(param) {
            None => out.push(Stmt::Assign(grad, zeros_like(var(param.clone())))),
            Some(holder) if *holder != grad => out.push(Stmt::Assign(grad, var(holder.clone()))),
            Some(_) => {}
        }
    }
    let result = match params.as_slice() {
        [single] => var(single.grad()),
        pair => Expr::Strand(pair.iter().map(|p| var(p.grad())).collect()),
    };
    out.push(Stmt::Return(result));
    Ok(out)
}
