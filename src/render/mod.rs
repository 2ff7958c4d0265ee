//! IR→surface rendering.
//!
//! Array languages evaluate right to left, so a right argument never needs
//! parentheses and a left argument needs them unless it is a single token.
//! Parentheses are therefore decided structurally while rendering; nothing
//! is patched up textually afterwards.


use crate::ir::*;

const INDENT: &str = "    ";

/// Render a function as a multi-line dfn definition.
pub fn render_function(function: &Function) -> String {
    let mut out = format!("{}←{{\n", function.name);
    for line in statement_lines(&function.body) {
        out.push_str(INDENT);
        out.push_str(&line);
        out.push('\n');
    }
    out.push('}');
    out
}

/// Render a function as an inline block, `{s1 ⋄ s2 ⋄ result}`.
pub fn render_block(function: &Function) -> String {
    format!("{{{}}}", statement_lines(&function.body).join(" ⋄ "))
}

/// Render an expression in argument-free position (a statement's value or
/// a right argument).
pub fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Var(name) => name.to_string(),
        Expr::Num(text) | Expr::Literal(text) => text.clone(),
        Expr::Call(call) => render_call(call),
        Expr::OpCall(op) => render_op_call(op),
        Expr::Strand(items) => items.iter().map(render_left).collect::<Vec<_>>().join(" "),
    }
}

pub fn render_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Assign(name, value) => format!("{}←{}", name, render_expr(value)),
        Stmt::SelectiveAssign(selector, value) => {
            format!("({})←{}", render_expr(selector), render_expr(value))
        }
        Stmt::Return(value) => render_expr(value),
    }
}

/// One line per statement, except that a selective assignment shares its
/// line with the statement after it.
fn statement_lines(body: &[Stmt]) -> Vec<String> {
    let mut lines: Vec<String> = Vec::with_capacity(body.len());
    let mut join_next = false;
    for stmt in body {
        let text = render_stmt(stmt);
        match lines.last_mut() {
            Some(line) if join_next => {
                line.push_str(" ⋄ ");
                line.push_str(&text);
            }
            _ => lines.push(text),
        }
        join_next = matches!(stmt, Stmt::SelectiveAssign(..));
    }
    lines
}

/// A single token renders bare anywhere.
fn is_simple(expr: &Expr) -> bool {
    match expr {
        Expr::Var(_) | Expr::Num(_) => true,
        Expr::Literal(text) => !text.contains(' '),
        _ => false,
    }
}

/// Render an expression in left-argument position.
fn render_left(expr: &Expr) -> String {
    if is_simple(expr) {
        render_expr(expr)
    } else {
        format!("({})", render_expr(expr))
    }
}

fn render_callee(callee: &Callee) -> String {
    match callee {
        Callee::Prim(prim) => prim.glyph().to_string(),
        Callee::Block(block) => render_block(block),
    }
}

fn render_call(call: &Call) -> String {
    let callee = render_callee(&call.callee);
    let right = render_expr(call.right());
    match call.left() {
        Some(left) => format!("{}{}{}", render_left(left), callee, right),
        None => format!("{}{}", callee, right),
    }
}

fn render_operand(operand: &Operand) -> String {
    match operand {
        Operand::Prim(prim) => prim.glyph().to_string(),
        Operand::Block(block) => render_block(block),
        Operand::Array(expr) => render_left(expr),
    }
}

fn render_op_call(op: &OpCall) -> String {
    let operands: Vec<String> = op.operator_operands.iter().map(render_operand).collect();
    let derived = match op.operator_valence {
        Valence::Monadic => format!("{}{}", operands[0], op.operator.glyph()),
        Valence::Dyadic => format!("({}{}{})", operands[0], op.operator.glyph(), operands[1]),
    };
    let right = op.call_operands.last().map(render_expr).unwrap_or_default();
    match op.derived_valence {
        Valence::Monadic => format!("{}{}", derived, right),
        Valence::Dyadic => format!("{}{}{}", render_left(&op.call_operands[0]), derived, right),
    }
}
