//! Inlining and kernel source emission.
//!
//! The compiler holds one instruction list per kernel (one kernel per sink),
//! collapses constant and alias intermediates, and emits the complete HLSL
//! compute source: library declarations once at file scope, then one
//! `CSMain<i>` entry point per sink.

use std::collections::HashSet;

use crate::codegen::expr::{Expr, SubstitutionTable};
use crate::codegen::instruction::Instruction;
use crate::codegen::library::ShaderLibrary;
use crate::error::CompileError;

pub const THREAD_GROUP_SIZE: u32 = 8;

#[derive(Default)]
pub struct InstructionCompiler {
    kernels: Vec<Vec<Instruction>>,
}

impl InstructionCompiler {
    pub fn new() -> InstructionCompiler {
        InstructionCompiler::default()
    }

    /// Registers one sink's instruction list; returns its kernel index.
    pub fn add_kernel(&mut self, instructions: Vec<Instruction>) -> usize {
        self.kernels.push(instructions);
        self.kernels.len() - 1
    }

    pub fn kernel_count(&self) -> usize {
        self.kernels.len()
    }

    /// Collapses trivially-foldable definitions, two passes.
    ///
    /// Pass 1 records every valid declaration whose expression is a bare
    /// constant. Pass 2 drops those definitions, rewrites every remaining
    /// expression through the substitution table, and additionally aliases
    /// through (and drops) instructions whose rewritten expression is an
    /// [`Expr::Inlineable`] wrapper. Relative order of retained instructions
    /// is preserved; the count never grows.
    pub fn inline_instructions(
        instructions: Vec<Instruction>,
    ) -> Result<Vec<Instruction>, CompileError> {
        let mut seen: HashSet<String> = HashSet::new();
        for inst in &instructions {
            if inst.result.is_decl() && !seen.insert(inst.result.name.clone()) {
                return Err(CompileError::DuplicateResult(inst.result.name.clone()));
            }
        }

        let mut table = SubstitutionTable::new();
        for inst in &instructions {
            if inst.result.is_decl() && matches!(inst.expr, Expr::Constant(_)) {
                table.insert(inst.result.name.clone(), inst.expr.clone());
            }
        }

        let mut out = Vec::with_capacity(instructions.len());
        for inst in instructions {
            if inst.result.is_decl() && table.contains_key(&inst.result.name) {
                continue;
            }
            let rewritten = inst.expr.inline(&table);
            if let Expr::Inlineable(inner) = rewritten {
                if inst.result.is_valid() {
                    table.insert(inst.result.name.clone(), (*inner).clone());
                }
                continue;
            }
            out.push(Instruction::new(inst.result, rewritten));
        }
        Ok(out)
    }

    /// Emits the full kernel source for every registered kernel.
    pub fn compile(&self, library: &ShaderLibrary) -> Result<String, CompileError> {
        let mut src = String::new();
        src.push_str("// Auto-generated shader code\n");
        for i in 0..self.kernels.len() {
            src.push_str(&format!("#pragma kernel CSMain{i}\n"));
        }
        src.push('\n');

        if !library.includes().is_empty() {
            for inc in library.includes() {
                src.push_str(&format!("#include \"{inc}\"\n"));
            }
            src.push('\n');
        }

        if !library.defines().is_empty() {
            for (name, value) in library.defines() {
                src.push_str(&format!("#define {name} {value}\n"));
            }
            src.push('\n');
        }

        src.push_str("float4 textureSize; // width, height, 1/width, 1/height\n\n");

        if !library.variables().is_empty() {
            for v in library.variables() {
                src.push_str(&v.decl);
                src.push('\n');
            }
            src.push('\n');
        }

        for f in library.functions() {
            src.push_str(&f.emit());
            src.push('\n');
        }

        for (i, instructions) in self.kernels.iter().enumerate() {
            let inlined = Self::inline_instructions(instructions.clone())?;
            src.push_str(&format!(
                "[numthreads({n},{n},1)]\n",
                n = THREAD_GROUP_SIZE
            ));
            src.push_str(&format!(
                "void CSMain{i} (uint3 dispatchThreadID : SV_DispatchThreadID, \
                 uint3 groupID : SV_GroupID, uint groupIndex : SV_GroupIndex, \
                 uint3 groupThreadID : SV_GroupThreadID)\n",
            ));
            src.push_str("{\n");
            src.push_str("    uint2 pixelCoordinate = dispatchThreadID.xy;\n");
            src.push_str("    float2 uv = (pixelCoordinate + 0.5f) * textureSize.zw;\n\n");
            for inst in &inlined {
                src.push_str(&inst.emit(1));
            }
            src.push_str("}\n");
            if i + 1 < self.kernels.len() {
                src.push('\n');
            }
        }

        Ok(src)
    }
}
