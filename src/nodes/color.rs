//! Color adjustment and compositing nodes.

use crate::codegen::context::CodeGenContext;
use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, ShaderType, VarDecl};
use crate::codegen::library::{FnParam, ShaderFunction, ShaderLibrary};
use crate::error::CompileError;
use crate::graph::{ConstValue, Node};
use crate::nodes::{CodeGenNode, OUTPUT_PORT};

/// Scales RGB by a factor, leaving alpha untouched.
pub struct BrightnessNode {
    node: Node,
}

impl BrightnessNode {
    pub fn new(node: Node) -> BrightnessNode {
        BrightnessNode { node }
    }
}

impl CodeGenNode for BrightnessNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let color = ctx.input_var(
            &self.node,
            "color",
            ShaderType::Float4,
            ConstValue::Vec4([0.0, 0.0, 0.0, 1.0]),
        )?;
        let amount = ctx.input_var(
            &self.node,
            "amount",
            ShaderType::Float,
            ConstValue::Float(1.0),
        )?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);

        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float4, out),
            Expr::call(
                "float4",
                vec![
                    Expr::binary(
                        Expr::variable(format!("{color}.rgb")),
                        "*",
                        Expr::variable(amount),
                    ),
                    Expr::variable(format!("{color}.a")),
                ],
            ),
        ));
        Ok(())
    }
}

/// Remaps RGB around mid-gray: `(rgb - 0.5) * contrast + 0.5`.
pub struct ContrastNode {
    node: Node,
}

impl ContrastNode {
    pub fn new(node: Node) -> ContrastNode {
        ContrastNode { node }
    }
}

impl CodeGenNode for ContrastNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let color = ctx.input_var(
            &self.node,
            "color",
            ShaderType::Float4,
            ConstValue::Vec4([0.0, 0.0, 0.0, 1.0]),
        )?;
        let amount = ctx.input_var(
            &self.node,
            "amount",
            ShaderType::Float,
            ConstValue::Float(1.0),
        )?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);

        let rgb = Expr::binary(
            Expr::binary(
                Expr::binary(
                    Expr::variable(format!("{color}.rgb")),
                    "-",
                    Expr::constant("0.5"),
                ),
                "*",
                Expr::variable(amount),
            ),
            "+",
            Expr::constant("0.5"),
        );
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float4, out),
            Expr::call("float4", vec![rgb, Expr::variable(format!("{color}.a"))]),
        ));
        Ok(())
    }
}

const BLEND_MODES: &[&str] = &["normal", "add", "multiply", "screen", "overlay"];

/// Composites two colors through a shared library helper, one helper per
/// blend mode. Two Blend nodes with the same mode share one function.
#[derive(Debug)]
pub struct BlendNode {
    node: Node,
    mode: String,
}

impl BlendNode {
    pub fn new(node: Node) -> Result<BlendNode, CompileError> {
        let mode = node.param_str("mode").unwrap_or("normal").to_string();
        if !BLEND_MODES.contains(&mode.as_str()) {
            return Err(CompileError::InvalidOption {
                node_id: node.id.clone(),
                option: "mode".to_string(),
                detail: format!("unknown blend mode '{mode}'"),
            });
        }
        Ok(BlendNode { node, mode })
    }

    fn function_name(&self) -> String {
        format!("blend_{}", self.mode)
    }
}

impl CodeGenNode for BlendNode {
    fn initialize(&mut self, library: &mut ShaderLibrary) -> Result<(), CompileError> {
        let body = match self.mode.as_str() {
            "normal" => "    return lerp({0}, {1}, {2});",
            "add" => "    return lerp({0}, saturate({0} + {1}), {2});",
            "multiply" => "    return lerp({0}, {0} * {1}, {2});",
            "screen" => "    return lerp({0}, 1.0 - (1.0 - {0}) * (1.0 - {1}), {2});",
            "overlay" => {
                "    float4 lo = 2.0 * {0} * {1};\n\
                 \x20   float4 hi = 1.0 - 2.0 * (1.0 - {0}) * (1.0 - {1});\n\
                 \x20   return lerp({0}, lerp(lo, hi, step(0.5, {0})), {2});"
            }
            _ => unreachable!("mode validated in BlendNode::new"),
        };
        library.add_function(ShaderFunction {
            name: self.function_name(),
            ret: ShaderType::Float4,
            params: vec![
                FnParam::input(ShaderType::Float4, "base"),
                FnParam::input(ShaderType::Float4, "blend"),
                FnParam::input(ShaderType::Float, "opacity"),
            ],
            body_template: body.to_string(),
            inlineable: false,
        });
        Ok(())
    }

    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let base = ctx.input_var(
            &self.node,
            "base",
            ShaderType::Float4,
            ConstValue::Vec4([0.0, 0.0, 0.0, 1.0]),
        )?;
        let blend = ctx.input_var(
            &self.node,
            "blend",
            ShaderType::Float4,
            ConstValue::Vec4([0.0, 0.0, 0.0, 1.0]),
        )?;
        let opacity = ctx.input_var(
            &self.node,
            "opacity",
            ShaderType::Float,
            ConstValue::Float(1.0),
        )?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);

        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float4, out),
            Expr::call(
                self.function_name(),
                vec![
                    Expr::variable(base),
                    Expr::variable(blend),
                    Expr::variable(opacity),
                ],
            ),
        ));
        Ok(())
    }
}

/// sRGB/linear conversion through small inlineable library helpers.
pub struct ColorSpaceConversionNode {
    node: Node,
    to_linear: bool,
}

impl ColorSpaceConversionNode {
    pub fn new(node: Node) -> Result<ColorSpaceConversionNode, CompileError> {
        let mode = node.param_str("mode").unwrap_or("srgb_to_linear");
        let to_linear = match mode {
            "srgb_to_linear" => true,
            "linear_to_srgb" => false,
            other => {
                return Err(CompileError::InvalidOption {
                    node_id: node.id.clone(),
                    option: "mode".to_string(),
                    detail: format!("unknown conversion '{other}'"),
                });
            }
        };
        Ok(ColorSpaceConversionNode { node, to_linear })
    }

    fn function_name(&self) -> &'static str {
        if self.to_linear {
            "srgb_to_linear"
        } else {
            "linear_to_srgb"
        }
    }
}

impl CodeGenNode for ColorSpaceConversionNode {
    fn initialize(&mut self, library: &mut ShaderLibrary) -> Result<(), CompileError> {
        let body = if self.to_linear {
            "    return float4(pow({0}.rgb, 2.2), {0}.a);"
        } else {
            "    return float4(pow({0}.rgb, 1.0 / 2.2), {0}.a);"
        };
        library.add_function(ShaderFunction {
            name: self.function_name().to_string(),
            ret: ShaderType::Float4,
            params: vec![FnParam::input(ShaderType::Float4, "c")],
            body_template: body.to_string(),
            inlineable: true,
        });
        Ok(())
    }

    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let color = ctx.input_var(
            &self.node,
            "color",
            ShaderType::Float4,
            ConstValue::Vec4([0.0, 0.0, 0.0, 1.0]),
        )?;
        let out = ctx.output_var(&self.node.id, OUTPUT_PORT);
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float4, out),
            Expr::call(self.function_name(), vec![Expr::variable(color)]),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use serde_json::json;

    fn node(node_type: &str, params: serde_json::Value) -> Node {
        let g: Graph = serde_json::from_value(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [{ "id": "c1", "type": node_type, "params": params }],
            "connections": []
        }))
        .unwrap();
        g.node("c1").unwrap().clone()
    }

    #[test]
    fn two_blend_nodes_with_same_mode_share_one_library_function() {
        let mut lib = ShaderLibrary::new();
        let mut a = BlendNode::new(node("Blend", json!({ "mode": "multiply" }))).unwrap();
        let mut b = BlendNode::new(node("Blend", json!({ "mode": "multiply" }))).unwrap();
        a.initialize(&mut lib).unwrap();
        b.initialize(&mut lib).unwrap();
        assert_eq!(lib.functions().len(), 1);
    }

    #[test]
    fn blend_rejects_unknown_mode() {
        let err = BlendNode::new(node("Blend", json!({ "mode": "dissolve" }))).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOption { .. }));
    }

    #[test]
    fn colorspace_function_is_inlineable() {
        let mut lib = ShaderLibrary::new();
        let mut n =
            ColorSpaceConversionNode::new(node("ColorSpaceConversion", json!({}))).unwrap();
        n.initialize(&mut lib).unwrap();
        assert!(lib.functions()[0].inlineable);
        assert!(lib.functions()[0].emit().starts_with("inline "));
    }
}
