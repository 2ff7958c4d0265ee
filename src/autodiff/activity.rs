//! Activity analysis over a normalized body.
//!
//! A variable is active when it depends on a differentiated parameter and
//! the result depends on it. Only active operands receive gradient
//! contributions; everything else is a constant to the backward pass.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use crate::ir::*;
use crate::lower::selection_target;

/// Data-flow graph: an edge `u → v` means `v` is computed from `u`.
struct FlowGraph {
    graph: DiGraph<Name, ()>,
    nodes: HashMap<Name, NodeIndex>,
}

impl FlowGraph {
    fn build(stmts: &[Stmt]) -> Self {
        let mut flow = FlowGraph {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        };
        for stmt in stmts {
            match stmt {
                Stmt::Assign(target, value) => {
                    let to = flow.node(target);
                    value.for_each_var(&mut |from| {
                        let from = flow.node(from);
                        flow.graph.update_edge(from, to, ());
                    });
                }
                Stmt::SelectiveAssign(selector, value) => {
                    let Ok(target) = selection_target(selector) else {
                        continue;
                    };
                    let to = flow.node(&target);
                    let mut sources = Vec::new();
                    selector.for_each_var(&mut |n| sources.push(n.clone()));
                    value.for_each_var(&mut |n| sources.push(n.clone()));
                    for from in sources.iter().filter(|n| **n != target) {
                        let from = flow.node(from);
                        flow.graph.update_edge(from, to, ());
                    }
                }
                Stmt::Return(_) => {}
            }
        }
        flow
    }

    fn node(&mut self, name: &Name) -> NodeIndex {
        if let Some(&index) = self.nodes.get(name) {
            return index;
        }
        let index = self.graph.add_node(name.clone());
        self.nodes.insert(name.clone(), index);
        index
    }

    fn descendants<'a>(&self, roots: impl IntoIterator<Item = &'a Name>) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        for root in roots {
            if let Some(&start) = self.nodes.get(root) {
                let mut dfs = Dfs::new(&self.graph, start);
                while let Some(n) = dfs.next(&self.graph) {
                    seen.insert(n);
                }
            }
        }
        seen
    }

    fn ancestors(&self, root: &Name) -> HashSet<NodeIndex> {
        let mut seen = HashSet::new();
        if let Some(&start) = self.nodes.get(root) {
            let reversed = Reversed(&self.graph);
            let mut dfs = Dfs::new(reversed, start);
            while let Some(n) = dfs.next(reversed) {
                seen.insert(n);
            }
        }
        seen
    }
}

/// Names that lie on a path from one of `wrt` to `result`.
pub(crate) fn active_names(stmts: &[Stmt], wrt: &[Name], result: &Name) -> HashSet<Name> {
    let flow = FlowGraph::build(stmts);
    let forward = flow.descendants(wrt);
    let backward = flow.ancestors(result);
    let active: HashSet<Name> = forward
        .intersection(&backward)
        .map(|&i| flow.graph[i].clone())
        .collect();
    log::trace!(
        "{} of {} names are active",
        active.len(),
        flow.graph.node_count()
    );
    active
}
