//! Exposes dispatch built-ins as graph values.

use crate::codegen::context::{BuiltIn, CodeGenContext};
use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, VarDecl};
use crate::error::CompileError;
use crate::graph::Node;
use crate::nodes::{CodeGenNode, OUTPUT_PORT};

#[derive(Debug)]
pub struct BuiltInDataNode {
    node: Node,
    builtin: BuiltIn,
}

impl BuiltInDataNode {
    pub fn new(node: Node) -> Result<BuiltInDataNode, CompileError> {
        let builtin = match node.param_str("data").unwrap_or("uv") {
            "dispatchThreadID" => BuiltIn::DispatchThreadId,
            "groupID" => BuiltIn::GroupId,
            "groupIndex" => BuiltIn::GroupIndex,
            "groupThreadID" => BuiltIn::GroupThreadId,
            "pixelCoordinate" => BuiltIn::PixelCoordinate,
            "uv" => BuiltIn::Uv,
            other => {
                return Err(CompileError::InvalidOption {
                    node_id: node.id.clone(),
                    option: "data".to_string(),
                    detail: format!("unknown built-in '{other}'"),
                });
            }
        };
        Ok(BuiltInDataNode { node, builtin })
    }
}

impl CodeGenNode for BuiltInDataNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);
        let name = ctx.builtin_var(self.builtin);
        // Pure alias of the built-in; the inlining pass removes the copy.
        ctx.push(Instruction::new(
            VarDecl::new(self.builtin.ty(), out),
            Expr::inlineable(Expr::variable(name)),
        ));
        Ok(())
    }
}
