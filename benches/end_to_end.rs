//! End-to-end latency benchmark for the in-process pipeline.
//!
//! Measures each stage from tree string to rendered derivative:
//! 1. Tree building + lowering
//! 2. Differentiation (guards, normalization, activity, backward pass)
//! 3. Rendering
//! 4. Total end-to-end

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ada::autodiff::differentiate;
use ada::render::render_function;
use ada::{differentiate_tree, forward_tree};

/// A dense layer with a softmax-free loss: matrix product, bias, tanh-like
/// squashing via exponentials, and a summed square.
const LAYER: &str = "Assign(layer,Lam(\
Assign(h,App2(AppOpr2(Dot,Add,Times),Alpha,Omega)),\
Assign(e,App1(Pow,App1(Sub,h))),\
Assign(s,App2(Div,1,App2(Add,1,e))),\
App1(AppOpr1(Slash,Add),App2(Times,s,s))))";

/// A chain of `n` scalar updates of one variable.
fn synthetic_chain(n: usize) -> String {
    let mut stmts = vec!["Assign(x,Omega)".to_string()];
    for i in 0..n {
        let step = match i % 4 {
            0 => "App2(Times,2,x)",
            1 => "App2(Add,x,Omega)",
            2 => "App1(Pow,x)",
            _ => "App2(Max,x,0)",
        };
        stmts.push(format!("Assign(x,{})", step));
    }
    stmts.push("x".to_string());
    format!("Assign(chain,Lam({}))", stmts.join(","))
}

fn bench_lowering(c: &mut Criterion) {
    let chain = synthetic_chain(100);
    let mut group = c.benchmark_group("lower");
    group.bench_function("layer", |b| b.iter(|| forward_tree(black_box(LAYER))));
    group.bench_function("chain_100", |b| b.iter(|| forward_tree(black_box(&chain))));
    group.finish();
}

fn bench_differentiate(c: &mut Criterion) {
    let layer = match forward_tree(LAYER) {
        Ok(f) => f,
        Err(e) => panic!("layer does not lower: {}", e),
    };
    let chain = match forward_tree(&synthetic_chain(100)) {
        Ok(f) => f,
        Err(e) => panic!("chain does not lower: {}", e),
    };
    let mut group = c.benchmark_group("differentiate");
    group.bench_function("layer", |b| b.iter(|| differentiate(black_box(&layer))));
    group.bench_function("chain_100", |b| b.iter(|| differentiate(black_box(&chain))));
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let gradient = match differentiate_tree(LAYER) {
        Ok(g) => g,
        Err(e) => panic!("layer does not differentiate: {}", e),
    };
    c.bench_function("render/layer", |b| b.iter(|| render_function(black_box(&gradient))));
}

fn bench_end_to_end(c: &mut Criterion) {
    c.bench_function("end_to_end/layer", |b| {
        b.iter(|| differentiate_tree(black_box(LAYER)).map(|g| render_function(&g)))
    });
}

criterion_group!(
    benches,
    bench_lowering,
    bench_differentiate,
    bench_render,
    bench_end_to_end
);
criterion_main!(benches);
