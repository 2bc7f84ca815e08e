//! Boolean and comparison nodes.

use crate::codegen::context::CodeGenContext;
use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, ShaderType, VarDecl};
use crate::error::CompileError;
use crate::graph::{ConstValue, Node};
use crate::nodes::{CodeGenNode, OUTPUT_PORT};

const COMPARE_OPS: &[&str] = &["==", "!=", ">", ">=", "<", "<="];

#[derive(Debug)]
pub struct CompareNode {
    node: Node,
    op: String,
}

impl CompareNode {
    pub fn new(node: Node) -> Result<CompareNode, CompileError> {
        let op = node.param_str("operator").unwrap_or("==").to_string();
        if !COMPARE_OPS.contains(&op.as_str()) {
            return Err(CompileError::InvalidOption {
                node_id: node.id.clone(),
                option: "operator".to_string(),
                detail: format!("unknown comparison operator '{op}'"),
            });
        }
        Ok(CompareNode { node, op })
    }
}

impl CodeGenNode for CompareNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let a = ctx.input_var(&self.node, "a", ShaderType::Float, ConstValue::Float(0.0))?;
        let b = ctx.input_var(&self.node, "b", ShaderType::Float, ConstValue::Float(0.0))?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Bool, out),
            Expr::binary(Expr::variable(a), self.op.clone(), Expr::variable(b)),
        ));
        Ok(())
    }
}

pub struct BinaryLogicNode {
    node: Node,
    op: &'static str,
}

impl BinaryLogicNode {
    pub fn new(node: Node) -> Result<BinaryLogicNode, CompileError> {
        let op = match node.node_type.as_str() {
            "And" => "&&",
            "Or" => "||",
            other => {
                return Err(CompileError::UnknownNodeType {
                    node_id: node.id.clone(),
                    node_type: other.to_string(),
                });
            }
        };
        Ok(BinaryLogicNode { node, op })
    }
}

impl CodeGenNode for BinaryLogicNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let a = ctx.input_var(&self.node, "a", ShaderType::Bool, ConstValue::Bool(false))?;
        let b = ctx.input_var(&self.node, "b", ShaderType::Bool, ConstValue::Bool(false))?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Bool, out),
            Expr::binary(Expr::variable(a), self.op, Expr::variable(b)),
        ));
        Ok(())
    }
}

pub struct NotNode {
    node: Node,
}

impl NotNode {
    pub fn new(node: Node) -> NotNode {
        NotNode { node }
    }
}

impl CodeGenNode for NotNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let x = ctx.input_var(&self.node, "input", ShaderType::Bool, ConstValue::Bool(false))?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Bool, out),
            Expr::Sequence(vec![Expr::Operator("!".to_string()), Expr::variable(x)]),
        ));
        Ok(())
    }
}

/// Ternary select; there is no dedicated expression shape for `?:`, so a
/// sequence carries the operator tokens.
pub struct ConditionNode {
    node: Node,
}

impl ConditionNode {
    pub fn new(node: Node) -> Result<ConditionNode, CompileError> {
        Ok(ConditionNode { node })
    }
}

impl CodeGenNode for ConditionNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let dim = self.node.param_u32("dimension", 1);
        let ty = ShaderType::float_vec(dim).map_err(|_| CompileError::InvalidOption {
            node_id: self.node.id.clone(),
            option: "dimension".to_string(),
            detail: format!("expected 1..=4, got {dim}"),
        })?;

        let cond = ctx.input_var(
            &self.node,
            "condition",
            ShaderType::Bool,
            ConstValue::Bool(false),
        )?;
        let if_true = ctx.input_var(&self.node, "ifTrue", ty, ConstValue::Float(1.0))?;
        let if_false = ctx.input_var(&self.node, "ifFalse", ty, ConstValue::Float(0.0))?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);

        ctx.push(Instruction::new(
            VarDecl::new(ty, out),
            Expr::Sequence(vec![
                Expr::variable(cond),
                Expr::Operator("?".to_string()),
                Expr::variable(if_true),
                Expr::Operator(":".to_string()),
                Expr::variable(if_false),
            ]),
        ));
        Ok(())
    }
}
