//! Channel packing, unpacking, and rearranging.

use crate::codegen::context::CodeGenContext;
use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, ShaderType, VarDecl};
use crate::error::CompileError;
use crate::graph::{ConstValue, Node};
use crate::nodes::{CodeGenNode, OUTPUT_PORT};

const CHANNELS: [&str; 4] = ["r", "g", "b", "a"];

/// Packs four scalars into a float4.
pub struct CombineNode {
    node: Node,
}

impl CombineNode {
    pub fn new(node: Node) -> CombineNode {
        CombineNode { node }
    }
}

impl CodeGenNode for CombineNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let mut args = Vec::with_capacity(4);
        for (i, port) in CHANNELS.iter().enumerate() {
            let default = if i == 3 { 1.0 } else { 0.0 };
            let v = ctx.input_var(
                &self.node,
                port,
                ShaderType::Float,
                ConstValue::Float(default),
            )?;
            args.push(Expr::variable(v));
        }
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float4, out),
            Expr::call("float4", args),
        ));
        Ok(())
    }
}

/// Unpacks the first `count` channels of a float4 as scalar outputs. The
/// outputs are pure aliases, so they are marked inlineable and vanish from
/// the final instruction stream.
pub struct SplitNode {
    node: Node,
    count: u32,
}

impl SplitNode {
    pub fn new(node: Node) -> Result<SplitNode, CompileError> {
        let count = node.param_u32("count", 4);
        if !(1..=4).contains(&count) {
            return Err(CompileError::InvalidOption {
                node_id: node.id.clone(),
                option: "count".to_string(),
                detail: format!("expected 1..=4, got {count}"),
            });
        }
        Ok(SplitNode { node, count })
    }
}

impl CodeGenNode for SplitNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let input = ctx.input_var(
            &self.node,
            "input",
            ShaderType::Float4,
            ConstValue::Vec4([0.0, 0.0, 0.0, 1.0]),
        )?;
        for channel in CHANNELS.iter().take(self.count as usize) {
            let out = ctx.output_var(&self.node.id, channel);
            ctx.push(Instruction::new(
                VarDecl::new(ShaderType::Float, out),
                Expr::inlineable(Expr::variable(format!("{input}.{channel}"))),
            ));
        }
        Ok(())
    }
}

/// Rearranges channels; each output channel selects a source channel via the
/// node's `r`/`g`/`b`/`a` options.
#[derive(Debug)]
pub struct ShuffleNode {
    node: Node,
    sources: [String; 4],
}

impl ShuffleNode {
    pub fn new(node: Node) -> Result<ShuffleNode, CompileError> {
        let mut sources: [String; 4] = Default::default();
        for (i, channel) in CHANNELS.iter().enumerate() {
            let src = node.param_str(channel).unwrap_or(channel).to_string();
            if !CHANNELS.contains(&src.as_str()) {
                return Err(CompileError::InvalidOption {
                    node_id: node.id.clone(),
                    option: channel.to_string(),
                    detail: format!("channel source must be one of r/g/b/a, got '{src}'"),
                });
            }
            sources[i] = src;
        }
        Ok(ShuffleNode { node, sources })
    }
}

impl CodeGenNode for ShuffleNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let input = ctx.input_var(
            &self.node,
            "input",
            ShaderType::Float4,
            ConstValue::Vec4([0.0, 0.0, 0.0, 1.0]),
        )?;
        let swizzle: String = self.sources.concat();
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float4, out),
            Expr::variable(format!("{input}.{swizzle}")),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::compiler::InstructionCompiler;
    use crate::graph::Graph;
    use serde_json::json;

    fn single_node_graph(node_type: &str, params: serde_json::Value) -> Graph {
        serde_json::from_value(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [{ "id": "ch1", "type": node_type, "params": params }],
            "connections": []
        }))
        .unwrap()
    }

    #[test]
    fn split_outputs_are_aliases_that_inline_away() {
        let g = single_node_graph("Split", json!({ "count": 2 }));
        let mut ctx = CodeGenContext::new(&g);
        let mut node = SplitNode::new(g.node("ch1").unwrap().clone()).unwrap();
        node.generate_code(&mut ctx).unwrap();

        // One materialized input constant plus two alias declarations.
        assert_eq!(ctx.instructions().len(), 3);
        let inlined =
            InstructionCompiler::inline_instructions(ctx.into_instructions()).unwrap();
        assert!(inlined.iter().all(|i| !matches!(i.expr, Expr::Inlineable(_))));
    }

    #[test]
    fn shuffle_emits_a_swizzle() {
        let g = single_node_graph(
            "Shuffle",
            json!({ "r": "b", "g": "g", "b": "r", "a": "a" }),
        );
        let mut ctx = CodeGenContext::new(&g);
        let mut node = ShuffleNode::new(g.node("ch1").unwrap().clone()).unwrap();
        node.generate_code(&mut ctx).unwrap();
        let last = ctx.instructions().last().unwrap();
        assert!(last.expr.emit().ends_with(".bgra"));
    }

    #[test]
    fn shuffle_rejects_a_bad_channel_source() {
        let g = single_node_graph("Shuffle", json!({ "r": "q" }));
        let err = ShuffleNode::new(g.node("ch1").unwrap().clone()).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOption { .. }));
    }
}
