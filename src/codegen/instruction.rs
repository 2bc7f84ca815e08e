//! Typed instructions: the flat IR between graph traversal and emission.

use crate::codegen::expr::Expr;
use crate::error::CompileError;

/// The emission-time type vocabulary. `None` is reserved for instructions
/// with no declared result (side-effecting stores).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderType {
    None,
    Void,
    Float,
    Float2,
    Float3,
    Float4,
    Int,
    Int2,
    Int3,
    Int4,
    Uint,
    Uint2,
    Uint3,
    Uint4,
    Bool,
    Texture2D,
    RwTexture2D,
    SamplerState,
}

impl ShaderType {
    pub fn hlsl_str(self) -> &'static str {
        match self {
            ShaderType::None => "",
            ShaderType::Void => "void",
            ShaderType::Float => "float",
            ShaderType::Float2 => "float2",
            ShaderType::Float3 => "float3",
            ShaderType::Float4 => "float4",
            ShaderType::Int => "int",
            ShaderType::Int2 => "int2",
            ShaderType::Int3 => "int3",
            ShaderType::Int4 => "int4",
            ShaderType::Uint => "uint",
            ShaderType::Uint2 => "uint2",
            ShaderType::Uint3 => "uint3",
            ShaderType::Uint4 => "uint4",
            ShaderType::Bool => "bool",
            ShaderType::Texture2D => "Texture2D",
            ShaderType::RwTexture2D => "RWTexture2D<float4>",
            ShaderType::SamplerState => "SamplerState",
        }
    }

    /// Float vector type for a channel count of 1..=4.
    pub fn float_vec(dimension: u32) -> Result<ShaderType, CompileError> {
        match dimension {
            1 => Ok(ShaderType::Float),
            2 => Ok(ShaderType::Float2),
            3 => Ok(ShaderType::Float3),
            4 => Ok(ShaderType::Float4),
            d => Err(CompileError::UnsupportedType(format!(
                "no float vector type of dimension {d}"
            ))),
        }
    }
}

/// A result declaration. Valid iff the name is non-empty; a valid declaration
/// with type `None` is the store form (`tex[pixelCoordinate] = ...`), which
/// emits as a bare assignment target with no type token.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: ShaderType,
    pub name: String,
}

impl VarDecl {
    pub fn new(ty: ShaderType, name: impl Into<String>) -> VarDecl {
        VarDecl {
            ty,
            name: name.into(),
        }
    }

    /// A "no result" declaration for pure expression statements.
    pub fn none() -> VarDecl {
        VarDecl {
            ty: ShaderType::None,
            name: String::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }

    /// True when this is a declaration-bearing result (`type name = ...`),
    /// as opposed to the store form or no result at all.
    pub fn is_decl(&self) -> bool {
        self.is_valid() && self.ty != ShaderType::None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub result: VarDecl,
    pub expr: Expr,
}

impl Instruction {
    pub fn new(result: VarDecl, expr: Expr) -> Instruction {
        Instruction { result, expr }
    }

    /// A statement with no result declaration.
    pub fn statement(expr: Expr) -> Instruction {
        Instruction {
            result: VarDecl::none(),
            expr,
        }
    }

    pub fn emit(&self, indent: usize) -> String {
        let pad = "    ".repeat(indent);
        let mut out = String::new();

        let mut out_decls = Vec::new();
        self.expr.collect_out_decls(&mut out_decls);
        for d in &out_decls {
            out.push_str(&format!("{pad}{} {};\n", d.ty.hlsl_str(), d.name));
        }

        if self.result.is_decl() {
            out.push_str(&format!(
                "{pad}{} {} = {};\n",
                self.result.ty.hlsl_str(),
                self.result.name,
                self.expr.emit()
            ));
        } else if self.result.is_valid() {
            out.push_str(&format!("{pad}{} = {};\n", self.result.name, self.expr.emit()));
        } else {
            out.push_str(&format!("{pad}{};\n", self.expr.emit()));
        }
        out
    }
}
