//! Shared shader-level registries: includes, defines, externally bound
//! variables, and reusable functions.
//!
//! One library spans one full build and is shared read-only across all
//! per-sink contexts during emission. Every registry is insertion-ordered
//! with a key guard, so emission order is stable and recompiling an
//! unchanged graph is byte-identical.

use std::collections::HashSet;

use crate::codegen::instruction::ShaderType;
use crate::dispatch::ComputeDispatch;
use crate::error::CompileError;

/// Invoked once per kernel dispatch with the dispatch handle, the kernel slot
/// index, and the variable's resolved name. This is how runtime value binding
/// is handed to the external dispatch layer.
pub type BindFn = Box<dyn Fn(&mut dyn ComputeDispatch, usize, &str) -> Result<(), CompileError>>;

pub struct ShaderVariable {
    pub name: String,
    pub decl: String,
    pub bind: BindFn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamModifier {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnParam {
    pub modifier: ParamModifier,
    pub ty: ShaderType,
    pub name: String,
}

impl FnParam {
    pub fn input(ty: ShaderType, name: impl Into<String>) -> FnParam {
        FnParam {
            modifier: ParamModifier::In,
            ty,
            name: name.into(),
        }
    }

    pub fn output(ty: ShaderType, name: impl Into<String>) -> FnParam {
        FnParam {
            modifier: ParamModifier::Out,
            ty,
            name: name.into(),
        }
    }
}

/// A reusable function declaration. The body is a template where `{0}`,
/// `{1}`, ... are replaced by the corresponding parameter names at emission.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderFunction {
    pub name: String,
    pub ret: ShaderType,
    pub params: Vec<FnParam>,
    pub body_template: String,
    pub inlineable: bool,
}

impl ShaderFunction {
    /// Dedup key: name plus parameter signature.
    fn key(&self) -> String {
        let sig: Vec<&str> = self.params.iter().map(|p| p.ty.hlsl_str()).collect();
        format!("{}({})", self.name, sig.join(","))
    }

    pub fn emit(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| {
                let modifier = match p.modifier {
                    ParamModifier::In => "",
                    ParamModifier::Out => "out ",
                    ParamModifier::InOut => "inout ",
                };
                format!("{}{} {}", modifier, p.ty.hlsl_str(), p.name)
            })
            .collect();

        let mut body = self.body_template.clone();
        for (i, p) in self.params.iter().enumerate() {
            body = body.replace(&format!("{{{i}}}"), &p.name);
        }

        let qualifier = if self.inlineable { "inline " } else { "" };
        format!(
            "{}{} {}({})\n{{\n{}\n}}\n",
            qualifier,
            self.ret.hlsl_str(),
            self.name,
            params.join(", "),
            body
        )
    }
}

#[derive(Default)]
pub struct ShaderLibrary {
    includes: Vec<String>,
    include_keys: HashSet<String>,
    defines: Vec<(String, String)>,
    define_keys: HashSet<String>,
    variables: Vec<ShaderVariable>,
    variable_keys: HashSet<String>,
    functions: Vec<ShaderFunction>,
    function_keys: HashSet<String>,
    counter: usize,
}

impl ShaderLibrary {
    pub fn new() -> ShaderLibrary {
        ShaderLibrary::default()
    }

    pub fn add_include(&mut self, path: &str) {
        if self.include_keys.insert(path.to_string()) {
            self.includes.push(path.to_string());
        }
    }

    pub fn add_define(&mut self, name: &str, value: &str) {
        if self.define_keys.insert(name.to_string()) {
            self.defines.push((name.to_string(), value.to_string()));
        }
    }

    /// Registers a shader variable under a counter-suffixed unique name and
    /// returns that name. `ty_decl` is the declaration type text, e.g.
    /// `RWTexture2D<float4>`.
    pub fn add_variable(&mut self, prefix: &str, ty_decl: &str, bind: BindFn) -> String {
        let name = format!("{}_{}", prefix, self.counter);
        self.counter += 1;
        let decl = format!("{ty_decl} {name};");
        self.variable_keys.insert(name.clone());
        self.variables.push(ShaderVariable {
            name: name.clone(),
            decl,
            bind,
        });
        name
    }

    /// Registers a variable under the exact name the caller chose. A second
    /// registration of the same name is a no-op.
    pub fn add_variable_exact_name(&mut self, name: &str, ty_decl: &str, bind: BindFn) -> String {
        if self.variable_keys.insert(name.to_string()) {
            self.variables.push(ShaderVariable {
                name: name.to_string(),
                decl: format!("{ty_decl} {name};"),
                bind,
            });
        }
        name.to_string()
    }

    /// Registers a function, deduplicated by (name, parameter signature).
    pub fn add_function(&mut self, function: ShaderFunction) {
        if self.function_keys.insert(function.key()) {
            self.functions.push(function);
        }
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn defines(&self) -> &[(String, String)] {
        &self.defines
    }

    pub fn variables(&self) -> &[ShaderVariable] {
        &self.variables
    }

    pub fn functions(&self) -> &[ShaderFunction] {
        &self.functions
    }

    /// Runs every variable's binding callback for one kernel slot.
    pub fn bind_all(
        &self,
        dispatch: &mut dyn ComputeDispatch,
        kernel_index: usize,
    ) -> Result<(), CompileError> {
        for v in &self.variables {
            (v.bind)(dispatch, kernel_index, &v.name)?;
        }
        Ok(())
    }

    /// Resets every registry and the naming counter. Must run once at the
    /// start of each build so no binding from a previous execution survives.
    pub fn clear(&mut self) {
        self.includes.clear();
        self.include_keys.clear();
        self.defines.clear();
        self.define_keys.clear();
        self.variables.clear();
        self.variable_keys.clear();
        self.functions.clear();
        self.function_keys.clear();
        self.counter = 0;
    }
}
