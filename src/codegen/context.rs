//! Per-kernel code-generation state.
//!
//! One context lives for exactly one sink's compilation: it owns the
//! port-to-variable-name table, the append-only instruction log, and the
//! materialization of constant/default inputs. Contexts are never shared
//! across sinks; a node feeding two sinks gets a fresh name in each.

use std::collections::{HashMap, HashSet};

use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, ShaderType, VarDecl};
use crate::error::CompileError;
use crate::graph::{self, ConstValue, Graph, Node};

/// The closed set of dispatch built-ins a node may reference. Total mapping;
/// never extended at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltIn {
    DispatchThreadId,
    GroupId,
    GroupIndex,
    GroupThreadId,
    PixelCoordinate,
    Uv,
}

impl BuiltIn {
    pub fn var_name(self) -> &'static str {
        match self {
            BuiltIn::DispatchThreadId => "dispatchThreadID",
            BuiltIn::GroupId => "groupID",
            BuiltIn::GroupIndex => "groupIndex",
            BuiltIn::GroupThreadId => "groupThreadID",
            BuiltIn::PixelCoordinate => "pixelCoordinate",
            BuiltIn::Uv => "uv",
        }
    }

    pub fn ty(self) -> ShaderType {
        match self {
            BuiltIn::DispatchThreadId => ShaderType::Uint3,
            BuiltIn::GroupId => ShaderType::Uint3,
            BuiltIn::GroupIndex => ShaderType::Uint,
            BuiltIn::GroupThreadId => ShaderType::Uint3,
            BuiltIn::PixelCoordinate => ShaderType::Uint2,
            BuiltIn::Uv => ShaderType::Float2,
        }
    }
}

pub struct CodeGenContext<'g> {
    graph: &'g Graph,
    names: HashMap<(String, String), String>,
    used_names: HashSet<String>,
    instructions: Vec<Instruction>,
    local_counter: usize,
}

impl<'g> CodeGenContext<'g> {
    pub fn new(graph: &'g Graph) -> CodeGenContext<'g> {
        CodeGenContext {
            graph,
            names: HashMap::new(),
            used_names: HashSet::new(),
            instructions: Vec::new(),
            local_counter: 0,
        }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Appends to the ordered instruction log.
    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn into_instructions(self) -> Vec<Instruction> {
        self.instructions
    }

    /// Derives and registers the variable name for an output port. Repeated
    /// calls for the same port return the identical name.
    pub fn output_var(&mut self, node_id: &str, port: &str) -> String {
        let key = (node_id.to_string(), port.to_string());
        if let Some(name) = self.names.get(&key) {
            return name.clone();
        }
        let name = self.unique_name(&format!("{}_{}", sanitize(port), sanitize(node_id)));
        self.names.insert(key, name.clone());
        name
    }

    /// Registers an exact variable name for an output port, used by nodes
    /// whose output is a library-scoped resource rather than a kernel local.
    pub fn register_output_name(&mut self, node_id: &str, port: &str, name: &str) {
        self.names
            .insert((node_id.to_string(), port.to_string()), name.to_string());
        self.used_names.insert(name.to_string());
    }

    /// Resolves the variable name feeding `node.port`.
    ///
    /// Connected to a real producer: returns the producer output port's
    /// registered name (deriving it if the producer has not run yet, which a
    /// correct topological order prevents; the derivation is pure so the name
    /// matches what the producer will register). Unconnected or fed by a
    /// value node: materializes the resolved constant (or `default`) as a
    /// fresh declaration of type `expected`, exactly once per port.
    pub fn input_var(
        &mut self,
        node: &Node,
        port: &str,
        expected: ShaderType,
        default: ConstValue,
    ) -> Result<String, CompileError> {
        // Key the materialized constant under the producing side, so two
        // consumers of one value node share a single declaration.
        let const_key = match self.graph.incoming_connection(&node.id, port) {
            Some(conn) => {
                let producer = self.graph.node(&conn.from.node_id)?;
                if !graph::is_value_node_type(&producer.node_type) {
                    let key = (conn.from.node_id.clone(), conn.from.port_id.clone());
                    if let Some(name) = self.names.get(&key) {
                        return Ok(name.clone());
                    }
                    return Ok(self.output_var(&conn.from.node_id, &conn.from.port_id));
                }
                (conn.from.node_id.clone(), conn.from.port_id.clone())
            }
            None => (node.id.clone(), port.to_string()),
        };

        if let Some(name) = self.names.get(&const_key) {
            return Ok(name.clone());
        }

        let value = self
            .graph
            .const_input_value(node, port)?
            .unwrap_or(default);
        let expr = const_expr(expected, &value).map_err(|e| CompileError::PortResolution {
            node_id: node.id.clone(),
            port: port.to_string(),
            detail: e.to_string(),
        })?;

        let name = self.fresh_local(port);
        self.names.insert(const_key, name.clone());
        self.instructions
            .push(Instruction::new(VarDecl::new(expected, &name), expr));
        Ok(name)
    }

    /// Fixed textual name of a dispatch built-in. Total over the closed set.
    pub fn builtin_var(&self, builtin: BuiltIn) -> &'static str {
        builtin.var_name()
    }

    /// A fresh kernel-local name that cannot collide with port-derived names.
    pub fn fresh_local(&mut self, hint: &str) -> String {
        let n = self.local_counter;
        self.local_counter += 1;
        self.unique_name(&format!("{}_c{}", sanitize(hint), n))
    }

    fn unique_name(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut suffix = 1usize;
        while self.used_names.contains(&name) {
            suffix += 1;
            name = format!("{base}_{suffix}");
        }
        self.used_names.insert(name.clone());
        name
    }
}

/// Builds the emission expression for a resolved constant. A scalar value is
/// splatted when a vector type is expected.
pub fn const_expr(expected: ShaderType, value: &ConstValue) -> Result<Expr, CompileError> {
    let scalar = |v: f32| -> Option<Expr> {
        let lit = graph::fmt_f32(v);
        match expected {
            ShaderType::Float => Some(Expr::constant(lit)),
            ShaderType::Int => Some(Expr::constant(format!("{}", v as i64))),
            ShaderType::Uint => Some(Expr::constant(format!("{}", v as i64))),
            ShaderType::Float2 => Some(Expr::call(
                "float2",
                vec![Expr::constant(lit.clone()), Expr::constant(lit)],
            )),
            ShaderType::Float3 => Some(Expr::call(
                "float3",
                vec![
                    Expr::constant(lit.clone()),
                    Expr::constant(lit.clone()),
                    Expr::constant(lit),
                ],
            )),
            ShaderType::Float4 => Some(Expr::call(
                "float4",
                vec![
                    Expr::constant(lit.clone()),
                    Expr::constant(lit.clone()),
                    Expr::constant(lit.clone()),
                    Expr::constant("1.0"),
                ],
            )),
            _ => None,
        }
    };

    let vector = |name: &str, comps: &[f32]| -> Expr {
        Expr::call(
            name,
            comps
                .iter()
                .map(|c| Expr::constant(graph::fmt_f32(*c)))
                .collect(),
        )
    };

    let expr = match value {
        ConstValue::Float(v) => scalar(*v),
        ConstValue::Int(v) => scalar(*v as f32),
        ConstValue::Bool(b) => match expected {
            ShaderType::Bool => Some(Expr::constant(if *b { "true" } else { "false" })),
            _ => scalar(if *b { 1.0 } else { 0.0 }),
        },
        ConstValue::Vec2(c) => Some(vector("float2", c)),
        ConstValue::Vec3(c) => Some(vector("float3", c)),
        ConstValue::Vec4(c) => Some(vector("float4", c)),
    };

    expr.ok_or_else(|| {
        CompileError::UnsupportedType(format!(
            "cannot materialize {value:?} as {}",
            expected.hlsl_str()
        ))
    })
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph_json(v: serde_json::Value) -> Graph {
        serde_json::from_value(v).unwrap()
    }

    fn empty_graph() -> Graph {
        graph_json(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [],
            "connections": []
        }))
    }

    #[test]
    fn output_var_is_idempotent() {
        let g = empty_graph();
        let mut ctx = CodeGenContext::new(&g);
        let a = ctx.output_var("node-1", "output");
        let b = ctx.output_var("node-1", "output");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_ports_never_collide() {
        let g = empty_graph();
        let mut ctx = CodeGenContext::new(&g);
        let a = ctx.output_var("n_1", "out");
        let b = ctx.output_var("n", "1_out");
        assert_ne!(a, b);
    }

    #[test]
    fn unconnected_float_default_materializes_once() {
        let g = graph_json(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [{ "id": "b1", "type": "Brightness", "params": {} }],
            "connections": []
        }));
        let mut ctx = CodeGenContext::new(&g);
        let node = g.node("b1").unwrap().clone();

        let first = ctx
            .input_var(&node, "amount", ShaderType::Float, ConstValue::Float(1.0))
            .unwrap();
        let second = ctx
            .input_var(&node, "amount", ShaderType::Float, ConstValue::Float(1.0))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(ctx.instructions().len(), 1);
        assert_eq!(ctx.instructions()[0].expr, Expr::constant("1.0"));
        assert_eq!(ctx.instructions()[0].result.ty, ShaderType::Float);
    }

    #[test]
    fn value_node_constant_is_shared_between_consumers() {
        let g = graph_json(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [
                { "id": "f1", "type": "FloatInput", "params": { "value": 0.25 } },
                { "id": "a", "type": "Brightness", "params": {} },
                { "id": "b", "type": "Contrast", "params": {} }
            ],
            "connections": [
                { "id": "c1", "from": { "nodeId": "f1", "portId": "value" },
                  "to": { "nodeId": "a", "portId": "amount" } },
                { "id": "c2", "from": { "nodeId": "f1", "portId": "value" },
                  "to": { "nodeId": "b", "portId": "amount" } }
            ]
        }));
        let mut ctx = CodeGenContext::new(&g);
        let a = g.node("a").unwrap().clone();
        let b = g.node("b").unwrap().clone();

        let na = ctx
            .input_var(&a, "amount", ShaderType::Float, ConstValue::Float(0.0))
            .unwrap();
        let nb = ctx
            .input_var(&b, "amount", ShaderType::Float, ConstValue::Float(0.0))
            .unwrap();

        assert_eq!(na, nb);
        assert_eq!(ctx.instructions().len(), 1);
        assert_eq!(ctx.instructions()[0].expr, Expr::constant("0.25"));
    }

    #[test]
    fn connected_producer_resolves_to_registered_name() {
        let g = graph_json(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [
                { "id": "n1", "type": "NoiseGenerator", "params": {} },
                { "id": "b1", "type": "Brightness", "params": {} }
            ],
            "connections": [
                { "id": "c1", "from": { "nodeId": "n1", "portId": "output" },
                  "to": { "nodeId": "b1", "portId": "color" } }
            ]
        }));
        let mut ctx = CodeGenContext::new(&g);
        let producer_name = ctx.output_var("n1", "output");

        let b1 = g.node("b1").unwrap().clone();
        let resolved = ctx
            .input_var(&b1, "color", ShaderType::Float4, ConstValue::Float(0.0))
            .unwrap();
        assert_eq!(resolved, producer_name);
        assert!(ctx.instructions().is_empty());
    }

    #[test]
    fn out_of_order_resolution_derives_the_name_the_producer_registers() {
        // A correct topological order never hits this path; if it does, the
        // derived name must match what the producer registers later.
        let g = graph_json(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [
                { "id": "n1", "type": "NoiseGenerator", "params": {} },
                { "id": "b1", "type": "Brightness", "params": {} }
            ],
            "connections": [
                { "id": "c1", "from": { "nodeId": "n1", "portId": "output" },
                  "to": { "nodeId": "b1", "portId": "color" } }
            ]
        }));
        let mut ctx = CodeGenContext::new(&g);
        let b1 = g.node("b1").unwrap().clone();

        let early = ctx
            .input_var(&b1, "color", ShaderType::Float4, ConstValue::Float(0.0))
            .unwrap();
        let registered = ctx.output_var("n1", "output");
        assert_eq!(early, registered);
    }
}
