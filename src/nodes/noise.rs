//! Procedural noise generation.

use crate::codegen::context::{BuiltIn, CodeGenContext};
use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, ShaderType, VarDecl};
use crate::codegen::library::{FnParam, ShaderFunction, ShaderLibrary};
use crate::error::CompileError;
use crate::graph::{self, Node};
use crate::nodes::{CodeGenNode, OUTPUT_PORT};

const HASH_BODY: &str = "    float2 k = frac({0} * float2(123.34, 345.45));\n\
                         \x20   k += dot(k, k + 34.345);\n\
                         \x20   return frac(k.x * k.y);";

const VALUE_NOISE_BODY: &str = "    float2 i = floor({0});\n\
                                \x20   float2 f = frac({0});\n\
                                \x20   float2 u = f * f * (3.0 - 2.0 * f);\n\
                                \x20   float a = hash21(i);\n\
                                \x20   float b = hash21(i + float2(1.0, 0.0));\n\
                                \x20   float c = hash21(i + float2(0.0, 1.0));\n\
                                \x20   float d = hash21(i + float2(1.0, 1.0));\n\
                                \x20   return lerp(lerp(a, b, u.x), lerp(c, d, u.x), u.y);";

const FBM_BODY: &str = "    float sum = 0.0;\n\
                        \x20   float amplitude = 1.0;\n\
                        \x20   float total = 0.0;\n\
                        \x20   float2 q = {0};\n\
                        \x20   for (int i = 0; i < {1}; i++)\n\
                        \x20   {\n\
                        \x20       sum += value_noise(q) * amplitude;\n\
                        \x20       total += amplitude;\n\
                        \x20       amplitude *= {2};\n\
                        \x20       q *= {3};\n\
                        \x20   }\n\
                        \x20   return sum / max(total, 1e-5);";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoiseMode {
    Value,
    Fbm,
}

#[derive(Debug)]
pub struct NoiseGeneratorNode {
    node: Node,
    mode: NoiseMode,
}

impl NoiseGeneratorNode {
    pub fn new(node: Node) -> Result<NoiseGeneratorNode, CompileError> {
        let mode = match node.param_str("mode").unwrap_or("fbm") {
            "value" => NoiseMode::Value,
            "fbm" => NoiseMode::Fbm,
            other => {
                return Err(CompileError::InvalidOption {
                    node_id: node.id.clone(),
                    option: "mode".to_string(),
                    detail: format!("unknown noise mode '{other}'"),
                });
            }
        };
        Ok(NoiseGeneratorNode { node, mode })
    }

    /// Sample position: uv scaled, then shifted by offset and a seed-derived
    /// displacement. All factors are codegen-time constants.
    fn position_expr(&self) -> Expr {
        let scale = self.node.param_f32("scale", 8.0);
        let seed = self.node.param_f32("seed", 0.0);
        let ox = self.node.param_f32("offsetX", 0.0) + seed * 127.1;
        let oy = self.node.param_f32("offsetY", 0.0) + seed * 311.7;

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

impl CodeGenNode for NoiseGeneratorNode {
    fn initialize(&mut self, library: &mut ShaderLibrary) -> Result<(), CompileError> {
        library.add_function(ShaderFunction {
            name: "hash21".to_string(),
            ret: ShaderType::Float,
            params: vec![FnParam::input(ShaderType::Float2, "p")],
            body_template: HASH_BODY.to_string(),
            inlineable: false,
        });
        library.add_function(ShaderFunction {
            name: "value_noise".to_string(),
            ret: ShaderType::Float,
            params: vec![FnParam::input(ShaderType::Float2, "p")],
            body_template: VALUE_NOISE_BODY.to_string(),
            inlineable: false,
        });
        if self.mode == NoiseMode::Fbm {
            library.add_function(ShaderFunction {
                name: "fbm_noise".to_string(),
                ret: ShaderType::Float,
                params: vec![
                    FnParam::input(ShaderType::Float2, "p"),
                    FnParam::input(ShaderType::Int, "octaves"),
                    FnParam::input(ShaderType::Float, "persistence"),
                    FnParam::input(ShaderType::Float, "lacunarity"),
                ],
                body_template: FBM_BODY.to_string(),
                inlineable: false,
            });
        }
        Ok(())
    }

    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let position = self.position_expr();
        let sample = match self.mode {
            NoiseMode::Value => Expr::call("value_noise", vec![position]),
            NoiseMode::Fbm => {
                let octaves = self.node.param_u32("octaves", 4);
                let persistence = self.node.param_f32("persistence", 0.5);
                let lacunarity = self.node.param_f32("lacunarity", 2.0);
                Expr::call(
                    "fbm_noise",
                    vec![
                        position,
                        Expr::constant(octaves.to_string()),
                        Expr::constant(graph::fmt_f32(persistence)),
                        Expr::constant(graph::fmt_f32(lacunarity)),
                    ],
                )
            }
        };

        let raw = ctx.fresh_local("noise");
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float, &raw),
            sample,
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
