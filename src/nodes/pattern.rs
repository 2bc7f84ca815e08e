//! Procedural pattern generation (checkerboard, stripes, grid).

use crate::codegen::context::{BuiltIn, CodeGenContext};
use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, ShaderType, VarDecl};
use crate::codegen::library::{FnParam, ShaderFunction, ShaderLibrary};
use crate::error::CompileError;
use crate::graph::{self, Node};
use crate::nodes::{CodeGenNode, OUTPUT_PORT};

const CHECKERBOARD_BODY: &str = "    float2 c = floor({0});\n\
                                 \x20   return fmod(abs(c.x + c.y), 2.0);";

const STRIPES_BODY: &str = "    return step(frac({0}.x), {1});";

const GRID_BODY: &str = "    float2 f = frac({0});\n\
                         \x20   float2 hit = step(f, float2({1}, {1}));\n\
                         \x20   return max(hit.x, hit.y);";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pattern {
    Checkerboard,
    Stripes,
    Grid,
}

#[derive(Debug)]
pub struct PatternGeneratorNode {
    node: Node,
    pattern: Pattern,
}

impl PatternGeneratorNode {
    pub fn new(node: Node) -> Result<PatternGeneratorNode, CompileError> {
        let pattern = match node.param_str("pattern").unwrap_or("checkerboard") {
            "checkerboard" => Pattern::Checkerboard,
            "stripes" => Pattern::Stripes,
            "grid" => Pattern::Grid,
            other => {
                return Err(CompileError::InvalidOption {
                    node_id: node.id.clone(),
                    option: "pattern".to_string(),
                    detail: format!("unknown pattern '{other}'"),
                });
            }
        };
        Ok(PatternGeneratorNode { node, pattern })
    }

    fn function_name(&self) -> &'static str {
        match self.pattern {
            Pattern::Checkerboard => "pattern_checkerboard",
            Pattern::Stripes => "pattern_stripes",
            Pattern::Grid => "pattern_grid",
        }
    }

    fn position_expr(&self) -> Expr {
        let scale = self.node.param_f32("scale", 8.0);
        let ox = self.node.param_f32("offsetX", 0.0);
        let oy = self.node.param_f32("offsetY", 0.0);
        Expr::binary(
            Expr::binary(
                Expr::variable(BuiltIn::Uv.var_name()),
                "*",
                Expr::constant(graph::fmt_f32(scale)),
            ),
            "+",
            Expr::call(
                "float2",
                vec![
                    Expr::constant(graph::fmt_f32(ox)),
                    Expr::constant(graph::fmt_f32(oy)),
                ],
            ),
        )
    }
}

impl CodeGenNode for PatternGeneratorNode {
    fn initialize(&mut self, library: &mut ShaderLibrary) -> Result<(), CompileError> {
        let (body, params) = match self.pattern {
            Pattern::Checkerboard => (
                CHECKERBOARD_BODY,
                vec![FnParam::input(ShaderType::Float2, "p")],
            ),
            Pattern::Stripes => (
                STRIPES_BODY,
                vec![
                    FnParam::input(ShaderType::Float2, "p"),
                    FnParam::input(ShaderType::Float, "thickness"),
                ],
            ),
            Pattern::Grid => (
                GRID_BODY,
                vec![
                    FnParam::input(ShaderType::Float2, "p"),
                    FnParam::input(ShaderType::Float, "thickness"),
                ],
            ),
        };
        library.add_function(ShaderFunction {
            name: self.function_name().to_string(),
            ret: ShaderType::Float,
            params,
            body_template: body.to_string(),
            inlineable: false,
        });
        Ok(())
    }

    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let position = self.position_expr();
        let mut args = vec![position];
        if self.pattern != Pattern::Checkerboard {
            let thickness = self.node.param_f32("thickness", 0.1);
            args.push(Expr::constant(graph::fmt_f32(thickness)));
        }

        let raw = ctx.fresh_local("pattern");
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float, &raw),
            Expr::call(self.function_name(), args),
        ));

        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float4, out),
            Expr::call(
                "float4",
                vec![
                    Expr::variable(&raw),
                    Expr::variable(&raw),
                    Expr::variable(&raw),
                    Expr::constant("1.0"),
                ],
            ),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use serde_json::json;

    fn pattern_node(params: serde_json::Value) -> (Graph, Node) {
        let g: Graph = serde_json::from_value(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [{ "id": "p1", "type": "PatternGenerator", "params": params }],
            "connections": []
        }))
        .unwrap();
        let n = g.node("p1").unwrap().clone();
        (g, n)
    }

    #[test]
    fn grid_registers_its_helper_and_passes_thickness() {
        let (g, n) = pattern_node(json!({ "pattern": "grid", "thickness": 0.05 }));
        let mut behavior = PatternGeneratorNode::new(n).unwrap();
        let mut lib = ShaderLibrary::new();
        behavior.initialize(&mut lib).unwrap();
        assert_eq!(lib.functions()[0].name, "pattern_grid");

        let mut ctx = CodeGenContext::new(&g);
        behavior.generate_code(&mut ctx).unwrap();
        assert!(ctx.instructions()[0].expr.emit().contains("0.05"));
    }

    #[test]
    fn unknown_pattern_is_rejected() {
        let (_, n) = pattern_node(json!({ "pattern": "voronoi" }));
        let err = PatternGeneratorNode::new(n).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOption { .. }));
    }
}
