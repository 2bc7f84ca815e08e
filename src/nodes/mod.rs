//! Per-node-type code generation behaviors.
//!
//! Every participating node type implements [`CodeGenNode`]: register shared
//! declarations at `initialize`, append instructions at `generate_code`
//! (reading inputs exclusively through the context), release external
//! resources at `cleanup`. Value node types (FloatInput etc.) have no
//! behavior; the context resolves them inline.

use crate::codegen::context::CodeGenContext;
use crate::codegen::library::ShaderLibrary;
use crate::dispatch::ComputeDispatch;
use crate::error::CompileError;
use crate::graph::{self, Node};

pub mod builtin;
pub mod channel;
pub mod color;
pub mod logic;
pub mod math;
pub mod noise;
pub mod output;
pub mod pattern;
pub mod texture;

pub trait CodeGenNode {
    /// Called once per build, before any instruction emission.
    fn initialize(&mut self, _library: &mut ShaderLibrary) -> Result<(), CompileError> {
        Ok(())
    }

    /// Called once per occurrence of this node in a sink's sorted order.
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError>;

    /// Called once per build after all kernels have executed.
    fn cleanup(&mut self, _dispatch: &mut dyn ComputeDispatch) -> Result<(), CompileError> {
        Ok(())
    }

    /// Explicit dependency node ids, replacing port-connection inference.
    fn custom_dependencies(&self) -> Option<Vec<String>> {
        None
    }

    /// True for sink nodes: each gets its own kernel entry point.
    fn is_output(&self) -> bool {
        false
    }

    /// Target dimensions, for sinks only.
    fn output_size(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Instantiates the behavior for a graph node. Value node types carry no
/// behavior and must not be passed here.
pub fn create_node_behavior(node: &Node) -> Result<Box<dyn CodeGenNode>, CompileError> {
    debug_assert!(!graph::is_value_node_type(&node.node_type));

    let behavior: Box<dyn CodeGenNode> = match node.node_type.as_str() {
        "Add" | "Subtract" | "Multiply" | "Divide" | "Modulo" | "Power" => {
            Box::new(math::BinaryMathNode::new(node.clone())?)
        }
        "Sqrt" | "Abs" | "Exp" | "Log" | "Negate" | "Normalize" | "Reciprocal"
        | "ReciprocalSqrt" | "Length" => Box::new(math::UnaryMathNode::new(node.clone())?),
        "Posterize" => Box::new(math::PosterizeNode::new(node.clone())),
        "Compare" => Box::new(logic::CompareNode::new(node.clone())?),
        "And" | "Or" => Box::new(logic::BinaryLogicNode::new(node.clone())?),
        "Not" => Box::new(logic::NotNode::new(node.clone())),
        "Condition" => Box::new(logic::ConditionNode::new(node.clone())?),
        "Combine" => Box::new(channel::CombineNode::new(node.clone())),
        "Split" => Box::new(channel::SplitNode::new(node.clone())?),
        "Shuffle" => Box::new(channel::ShuffleNode::new(node.clone())?),
        "Brightness" => Box::new(color::BrightnessNode::new(node.clone())),
        "Contrast" => Box::new(color::ContrastNode::new(node.clone())),
        "Blend" => Box::new(color::BlendNode::new(node.clone())?),
        "ColorSpaceConversion" => Box::new(color::ColorSpaceConversionNode::new(node.clone())?),
        "NoiseGenerator" => Box::new(noise::NoiseGeneratorNode::new(node.clone())?),
        "PatternGenerator" => Box::new(pattern::PatternGeneratorNode::new(node.clone())?),
        "BuiltInData" => Box::new(builtin::BuiltInDataNode::new(node.clone())?),
        "SampleTexture2D" => Box::new(texture::SampleTexture2DNode::new(node.clone())),
        "ImportTexture2D" => Box::new(texture::ImportTexture2DNode::new(node.clone())),
        "WriteTexture2D" => Box::new(output::WriteTexture2DNode::new(node.clone())),
        other => {
            return Err(CompileError::UnknownNodeType {
                node_id: node.id.clone(),
                node_type: other.to_string(),
            });
        }
    };
    Ok(behavior)
}

/// Shared output-port name; most nodes expose exactly one output.
pub(crate) const OUTPUT_PORT: &str = "output";
