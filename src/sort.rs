//! Topological ordering of graph nodes, one independent sort per sink.
//!
//! The walk is an iterative depth-first traversal from the sink along
//! connected-input edges, with an explicit work stack of (node, phase)
//! frames so deep graphs cannot overflow the call stack.

use std::collections::HashSet;

use crate::error::CompileError;
use crate::graph::{self, Graph, Node};

/// Returns node ids in a valid evaluation order ending with `sink_id`.
///
/// `deps_override` lets a node substitute its dependency set for the one
/// derived from port connections (used by nodes whose data dependencies are
/// not ordinary connections); returning `None` keeps the derived set. Value
/// nodes are constant-like and never scheduled.
///
/// Dependencies are pushed in reverse so the first-declared input is
/// explored first, keeping the order deterministic. A node already on the
/// exploration path means the graph has a cycle, which fails the sort.
pub fn topological_order<F>(
    graph: &Graph,
    sink_id: &str,
    deps_override: F,
) -> Result<Vec<String>, CompileError>
where
    F: Fn(&Node) -> Option<Vec<String>>,
{
    let mut order: Vec<String> = Vec::new();
    let mut visiting: HashSet<String> = HashSet::new();
    let mut visited: HashSet<String> = HashSet::new();
    // (node id, is_post_visit)
    let mut stack: Vec<(String, bool)> = vec![(sink_id.to_string(), false)];

    while let Some((id, is_post_visit)) = stack.pop() {
        if is_post_visit {
            visiting.remove(&id);
            visited.insert(id.clone());
            order.push(id);
            continue;
        }
        if visited.contains(&id) {
            continue;
        }
        if visiting.contains(&id) {
            return Err(CompileError::CycleDetected(id));
        }
        visiting.insert(id.clone());
        stack.push((id.clone(), true));

        let node = graph.node(&id)?;
        let deps = match deps_override(node) {
            Some(custom) => custom,
            None => {
                let mut deps = Vec::new();
                for conn in graph.incoming_connections(&id) {
                    let producer = graph.node(&conn.from.node_id)?;
                    if !graph::is_value_node_type(&producer.node_type) {
                        deps.push(producer.id.clone());
                    }
                }
                deps
            }
        };
        for dep in deps.iter().rev() {
            if !visited.contains(dep) {
                stack.push((dep.clone(), false));
            }
        }
    }

    Ok(order)
}
