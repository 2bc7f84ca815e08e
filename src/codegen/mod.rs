//! Graph-to-kernel code generation.
//!
//! The pipeline is: a topological order per sink (see [`crate::sort`]) is
//! replayed through a fresh [`context::CodeGenContext`], each node behavior
//! appending typed [`instruction::Instruction`]s built from
//! [`expr::Expr`] trees; the [`compiler::InstructionCompiler`] then collapses
//! constant/alias intermediates and emits one HLSL compute kernel source with
//! one entry point per sink, pulling shared declarations from the
//! [`library::ShaderLibrary`].

pub mod compiler;
pub mod context;
pub mod expr;
pub mod instruction;
pub mod library;

pub use compiler::InstructionCompiler;
pub use context::{BuiltIn, CodeGenContext};
pub use expr::{Expr, SubstitutionTable};
pub use instruction::{Instruction, ShaderType, VarDecl};
pub use library::{BindFn, FnParam, ParamModifier, ShaderFunction, ShaderLibrary};
