//! Arithmetic nodes, dimension-polymorphic over float..float4.

use crate::codegen::context::CodeGenContext;
use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, ShaderType, VarDecl};
use crate::error::CompileError;
use crate::graph::{ConstValue, Node};
use crate::nodes::{CodeGenNode, OUTPUT_PORT};

fn value_type(node: &Node) -> Result<ShaderType, CompileError> {
    let dim = node.param_u32("dimension", 1);
    ShaderType::float_vec(dim).map_err(|_| CompileError::InvalidOption {
        node_id: node.id.clone(),
        option: "dimension".to_string(),
        detail: format!("expected 1..=4, got {dim}"),
    })
}

#[derive(Debug, Clone, Copy)]
enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
}

pub struct BinaryMathNode {
    node: Node,
    op: BinaryOp,
}

impl BinaryMathNode {
    pub fn new(node: Node) -> Result<BinaryMathNode, CompileError> {
        let op = match node.node_type.as_str() {
            "Add" => BinaryOp::Add,
            "Subtract" => BinaryOp::Subtract,
            "Multiply" => BinaryOp::Multiply,
            "Divide" => BinaryOp::Divide,
            "Modulo" => BinaryOp::Modulo,
            "Power" => BinaryOp::Power,
            other => {
                return Err(CompileError::UnknownNodeType {
                    node_id: node.id.clone(),
                    node_type: other.to_string(),
                });
            }
        };
        Ok(BinaryMathNode { node, op })
    }
}

impl CodeGenNode for BinaryMathNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let ty = value_type(&self.node)?;
        let a = ctx.input_var(&self.node, "a", ty, ConstValue::Float(0.0))?;
        let b = ctx.input_var(&self.node, "b", ty, ConstValue::Float(0.0))?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);

        let expr = match self.op {
            BinaryOp::Add => Expr::binary(Expr::variable(a), "+", Expr::variable(b)),
            BinaryOp::Subtract => Expr::binary(Expr::variable(a), "-", Expr::variable(b)),
            BinaryOp::Multiply => Expr::binary(Expr::variable(a), "*", Expr::variable(b)),
            BinaryOp::Divide => Expr::binary(Expr::variable(a), "/", Expr::variable(b)),
            BinaryOp::Modulo => Expr::call("fmod", vec![Expr::variable(a), Expr::variable(b)]),
            BinaryOp::Power => Expr::call("pow", vec![Expr::variable(a), Expr::variable(b)]),
        };
        ctx.push(Instruction::new(VarDecl::new(ty, out), expr));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum UnaryOp {
    Sqrt,
    Abs,
    Exp,
    Log,
    Negate,
    Normalize,
    Reciprocal,
    ReciprocalSqrt,
    Length,
}

pub struct UnaryMathNode {
    node: Node,
    op: UnaryOp,
}

impl UnaryMathNode {
    pub fn new(node: Node) -> Result<UnaryMathNode, CompileError> {
        let op = match node.node_type.as_str() {
            "Sqrt" => UnaryOp::Sqrt,
            "Abs" => UnaryOp::Abs,
            "Exp" => UnaryOp::Exp,
            "Log" => UnaryOp::Log,
            "Negate" => UnaryOp::Negate,
            "Normalize" => UnaryOp::Normalize,
            "Reciprocal" => UnaryOp::Reciprocal,
            "ReciprocalSqrt" => UnaryOp::ReciprocalSqrt,
            "Length" => UnaryOp::Length,
            other => {
                return Err(CompileError::UnknownNodeType {
                    node_id: node.id.clone(),
                    node_type: other.to_string(),
                });
            }
        };
        Ok(UnaryMathNode { node, op })
    }
}

impl CodeGenNode for UnaryMathNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let ty = value_type(&self.node)?;
        let x = ctx.input_var(&self.node, "input", ty, ConstValue::Float(0.0))?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);
        let x = Expr::variable(x);

        // Length reduces any dimension to a scalar; everything else keeps it.
        let (result_ty, expr) = match self.op {
            UnaryOp::Sqrt => (ty, Expr::call("sqrt", vec![x])),
            UnaryOp::Abs => (ty, Expr::call("abs", vec![x])),
            UnaryOp::Exp => (ty, Expr::call("exp", vec![x])),
            UnaryOp::Log => (ty, Expr::call("log", vec![x])),
            UnaryOp::Negate => (
                ty,
                Expr::Sequence(vec![Expr::Operator("-".to_string()), x]),
            ),
            UnaryOp::Normalize => (ty, Expr::call("normalize", vec![x])),
            UnaryOp::Reciprocal => (ty, Expr::binary(Expr::constant("1.0"), "/", x)),
            UnaryOp::ReciprocalSqrt => (ty, Expr::call("rsqrt", vec![x])),
            UnaryOp::Length => (ShaderType::Float, Expr::call("length", vec![x])),
        };
        ctx.push(Instruction::new(VarDecl::new(result_ty, out), expr));
        Ok(())
    }
}

/// Quantizes the input to a fixed number of steps.
pub struct PosterizeNode {
    node: Node,
}

impl PosterizeNode {
    pub fn new(node: Node) -> PosterizeNode {
        PosterizeNode { node }
    }
}

impl CodeGenNode for PosterizeNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let ty = value_type(&self.node)?;
        let x = ctx.input_var(&self.node, "input", ty, ConstValue::Float(0.0))?;
        let steps = ctx.input_var(
            &self.node,
            "steps",
            ShaderType::Float,
            ConstValue::Float(4.0),
        )?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);

        let quantized = Expr::binary(
            Expr::call(
                "floor",
                vec![Expr::binary(
                    Expr::variable(x),
                    "*",
                    Expr::variable(steps.clone()),
                )],
            ),
            "/",
            Expr::variable(steps),
        );
        ctx.push(Instruction::new(VarDecl::new(ty, out), quantized));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use serde_json::json;

    fn single_node_graph(node_type: &str, params: serde_json::Value) -> Graph {
        serde_json::from_value(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [{ "id": "m1", "type": node_type, "params": params }],
            "connections": []
        }))
        .unwrap()
    }

    #[test]
    fn add_emits_binary_with_materialized_defaults() {
        let g = single_node_graph("Add", json!({ "a": 2.0, "b": 3.0 }));
        let mut ctx = CodeGenContext::new(&g);
        let mut node = BinaryMathNode::new(g.node("m1").unwrap().clone()).unwrap();
        node.generate_code(&mut ctx).unwrap();

        let instructions = ctx.instructions();
        assert_eq!(instructions.len(), 3);
        assert_eq!(instructions[0].expr, Expr::constant("2.0"));
        assert_eq!(instructions[1].expr, Expr::constant("3.0"));
        assert!(matches!(instructions[2].expr, Expr::Binary { .. }));
    }

    #[test]
    fn power_emits_pow_call() {
        let g = single_node_graph("Power", json!({}));
        let mut ctx = CodeGenContext::new(&g);
        let mut node = BinaryMathNode::new(g.node("m1").unwrap().clone()).unwrap();
        node.generate_code(&mut ctx).unwrap();
        let last = ctx.instructions().last().unwrap();
        assert!(last.expr.emit().starts_with("pow("));
    }

    #[test]
    fn length_always_declares_a_scalar() {
        let g = single_node_graph("Length", json!({ "dimension": 3 }));
        let mut ctx = CodeGenContext::new(&g);
        let mut node = UnaryMathNode::new(g.node("m1").unwrap().clone()).unwrap();
        node.generate_code(&mut ctx).unwrap();
        let last = ctx.instructions().last().unwrap();
        assert_eq!(last.result.ty, ShaderType::Float);
    }

    #[test]
    fn bad_dimension_is_an_invalid_option() {
        let g = single_node_graph("Add", json!({ "dimension": 7 }));
        let mut ctx = CodeGenContext::new(&g);
        let mut node = BinaryMathNode::new(g.node("m1").unwrap().clone()).unwrap();
        let err = node.generate_code(&mut ctx).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOption { .. }));
    }
}
