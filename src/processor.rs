//! Build/execute orchestration.
//!
//! `build_graph` validates structure (one topological order per sink);
//! `execute_graph` runs the full per-sink codegen → inline → emit pipeline,
//! hands the source to the dispatch layer, binds library variables, and
//! dispatches one kernel per sink. A failing sink is reported and skipped
//! without aborting its siblings.

use std::collections::{HashMap, HashSet};

use tracing::{debug, error, warn};

use crate::codegen::compiler::{InstructionCompiler, THREAD_GROUP_SIZE};
use crate::codegen::context::CodeGenContext;
use crate::codegen::library::ShaderLibrary;
use crate::dispatch::ComputeDispatch;
use crate::error::CompileError;
use crate::graph::{self, Graph};
use crate::nodes::{self, CodeGenNode};
use crate::sort;

const SINK_NODE_TYPE: &str = "WriteTexture2D";
const DEFAULT_TARGET_SIZE: (u32, u32) = (512, 512);

#[derive(Debug)]
pub struct ExecutionReport {
    pub kernel_source: String,
    /// Sink node ids in kernel-index order.
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

pub struct GraphProcessor {
    graph: Graph,
    behaviors: HashMap<String, Box<dyn CodeGenNode>>,
    library: ShaderLibrary,
    sink_orders: Vec<(String, Vec<String>)>,
    built: bool,
}

impl std::fmt::Debug for GraphProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphProcessor")
            .field("graph", &self.graph)
            .field("sink_orders", &self.sink_orders)
            .field("built", &self.built)
            .finish_non_exhaustive()
    }
}

impl GraphProcessor {
    pub fn new(graph: Graph) -> Result<GraphProcessor, CompileError> {
        let keep: HashSet<&str> = graph
            .nodes
            .iter()
            .filter(|n| n.node_type == SINK_NODE_TYPE)
            .map(|n| n.id.as_str())
            .collect();
        let graph = graph.treeshake_unlinked_nodes(&keep);

        let mut behaviors: HashMap<String, Box<dyn CodeGenNode>> = HashMap::new();
        for node in &graph.nodes {
            if graph::is_value_node_type(&node.node_type) {
                continue;
            }
            behaviors.insert(node.id.clone(), nodes::create_node_behavior(node)?);
        }

        Ok(GraphProcessor {
            graph,
            behaviors,
            library: ShaderLibrary::new(),
            sink_orders: Vec::new(),
            built: false,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Sorts the graph once per sink, in document order, validating that no
    /// cycle is reachable from any sink.
    pub fn build_graph(&mut self) -> Result<(), CompileError> {
        let graph = &self.graph;
        let behaviors = &self.behaviors;

        let sinks: Vec<String> = graph
            .nodes
            .iter()
            .filter(|n| behaviors.get(&n.id).is_some_and(|b| b.is_output()))
            .map(|n| n.id.clone())
            .collect();

        let mut sink_orders = Vec::with_capacity(sinks.len());
        for sink in sinks {
            let order = sort::topological_order(graph, &sink, |node| {
                behaviors.get(&node.id).and_then(|b| b.custom_dependencies())
            })?;
            debug!(sink = %sink, nodes = order.len(), "sorted sink");
            sink_orders.push((sink, order));
        }

        self.sink_orders = sink_orders;
        self.built = true;
        Ok(())
    }

    /// Emits the full kernel source without touching a dispatch layer.
    pub fn generate_code_only(&mut self) -> Result<String, CompileError> {
        if !self.built {
            return Err(CompileError::GraphNotBuilt);
        }
        self.library.clear();
        self.initialize_behaviors()?;
        let (compiler, _, failed) = self.codegen_sinks();
        for (sink, detail) in &failed {
            warn!(sink = %sink, detail = %detail, "sink skipped during code generation");
        }
        compiler.compile(&self.library)
    }

    /// Full pipeline: codegen, compile, load, bind, dispatch, cleanup.
    pub fn execute_graph(
        &mut self,
        dispatch: &mut dyn ComputeDispatch,
    ) -> Result<ExecutionReport, CompileError> {
        if !self.built {
            return Err(CompileError::GraphNotBuilt);
        }
        self.library.clear();
        self.initialize_behaviors()?;

        let (compiler, kernel_sinks, failed) = self.codegen_sinks();
        for (sink, detail) in &failed {
            warn!(sink = %sink, detail = %detail, "sink failed; siblings continue");
        }

        let source = compiler.compile(&self.library)?;
        dispatch.load_kernel_source(&source)?;

        for (kernel, sink) in kernel_sinks.iter().enumerate() {
            let (width, height) = self
                .behaviors
                .get(sink)
                .and_then(|b| b.output_size())
                .unwrap_or(DEFAULT_TARGET_SIZE);
            dispatch.set_vector(
                kernel,
                "textureSize",
                [
                    width as f32,
                    height as f32,
                    1.0 / width as f32,
                    1.0 / height as f32,
                ],
            )?;
            self.library.bind_all(dispatch, kernel)?;
            dispatch.dispatch(
                kernel,
                width.div_ceil(THREAD_GROUP_SIZE),
                height.div_ceil(THREAD_GROUP_SIZE),
                1,
            )?;
            debug!(sink = %sink, kernel, width, height, "dispatched");
        }

        for node in &self.graph.nodes {
            if let Some(behavior) = self.behaviors.get_mut(&node.id) {
                if let Err(e) = behavior.cleanup(dispatch) {
                    error!(node = %node.id, error = %e, "cleanup failed");
                }
            }
        }

        Ok(ExecutionReport {
            kernel_source: source,
            succeeded: kernel_sinks,
            failed,
        })
    }

    fn initialize_behaviors(&mut self) -> Result<(), CompileError> {
        for node in &self.graph.nodes {
            if let Some(behavior) = self.behaviors.get_mut(&node.id) {
                behavior.initialize(&mut self.library)?;
            }
        }
        Ok(())
    }

    /// Replays each sink's sorted order through a fresh context. A sink whose
    /// codegen fails contributes no kernel; the rest proceed.
    fn codegen_sinks(&mut self) -> (InstructionCompiler, Vec<String>, Vec<(String, String)>) {
        let graph = &self.graph;
        let behaviors = &mut self.behaviors;
        let sink_orders = &self.sink_orders;

        let mut compiler = InstructionCompiler::new();
        let mut kernel_sinks = Vec::new();
        let mut failed = Vec::new();

        'sinks: for (sink, order) in sink_orders {
            let mut ctx = CodeGenContext::new(graph);
            for id in order {
                let Some(behavior) = behaviors.get_mut(id) else {
                    failed.push((sink.clone(), format!("no behavior for node {id}")));
                    continue 'sinks;
                };
                if let Err(e) = behavior.generate_code(&mut ctx) {
                    failed.push((sink.clone(), e.to_string()));
                    continue 'sinks;
                }
            }
            compiler.add_kernel(ctx.into_instructions());
            kernel_sinks.push(sink.clone());
        }

        (compiler, kernel_sinks, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn execute_before_build_is_an_error() {
        let g: Graph = serde_json::from_value(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [{ "id": "w1", "type": "WriteTexture2D", "params": {} }],
            "connections": []
        }))
        .unwrap();
        let mut p = GraphProcessor::new(g).unwrap();
        let err = p.generate_code_only().unwrap_err();
        assert!(matches!(err, CompileError::GraphNotBuilt));
    }

    #[test]
    fn unknown_node_type_fails_at_construction() {
        let g: Graph = serde_json::from_value(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [
                { "id": "x", "type": "Mystery", "params": {} },
                { "id": "w1", "type": "WriteTexture2D", "params": {} }
            ],
            "connections": [
                { "id": "c1", "from": { "nodeId": "x", "portId": "output" },
                  "to": { "nodeId": "w1", "portId": "color" } }
            ]
        }))
        .unwrap();
        let err = GraphProcessor::new(g).unwrap_err();
        assert!(matches!(err, CompileError::UnknownNodeType { .. }));
    }

    #[test]
    fn unlinked_editor_leftovers_are_dropped() {
        let g: Graph = serde_json::from_value(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [
                { "id": "orphan", "type": "Mystery", "params": {} },
                { "id": "w1", "type": "WriteTexture2D", "params": {} }
            ],
            "connections": []
        }))
        .unwrap();
        // The orphan has an unknown type but no links, so it is shaken out
        // before behavior construction.
        let p = GraphProcessor::new(g).unwrap();
        assert_eq!(p.graph().nodes.len(), 1);
    }
}
