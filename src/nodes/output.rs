//! Sink nodes: each one becomes a kernel entry point writing a target
//! texture, optionally exported to disk on cleanup.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::codegen::context::CodeGenContext;
use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, ShaderType, VarDecl};
use crate::codegen::library::ShaderLibrary;
use crate::dispatch::{ComputeDispatch, TextureId};
use crate::error::CompileError;
use crate::graph::{ConstValue, Node};
use crate::nodes::CodeGenNode;

pub struct WriteTexture2DNode {
    node: Node,
    width: u32,
    height: u32,
    path: Option<PathBuf>,
    texture: Rc<Cell<Option<TextureId>>>,
    var_name: Option<String>,
}

impl WriteTexture2DNode {
    pub fn new(node: Node) -> WriteTexture2DNode {
        let width = node.param_u32("width", 512);
        let height = node.param_u32("height", 512);
        let path = node.param_str("path").map(PathBuf::from);
        WriteTexture2DNode {
            node,
            width,
            height,
            path,
            texture: Rc::new(Cell::new(None)),
            var_name: None,
        }
    }
}

/// Checked up front so a bad path never wastes a compile.
fn validate_output_path(path: &Path) -> Result<(), CompileError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png" | "jpg" | "jpeg") => {}
        _ => {
            return Err(CompileError::InvalidOutputPath {
                path: path.display().to_string(),
                detail: "expected a .png, .jpg or .jpeg extension".to_string(),
            });
        }
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(CompileError::InvalidOutputPath {
                path: path.display().to_string(),
                detail: format!("directory {} does not exist", parent.display()),
            });
        }
    }
    Ok(())
}

impl CodeGenNode for WriteTexture2DNode {
    fn initialize(&mut self, library: &mut ShaderLibrary) -> Result<(), CompileError> {
        if let Some(path) = &self.path {
            validate_output_path(path)?;
        }

        let texture = Rc::clone(&self.texture);
        let (width, height) = (self.width, self.height);
        let name = library.add_variable(
            "outputTex",
            "RWTexture2D<float4>",
            Box::new(move |dispatch, kernel, name| {
                let id = match texture.get() {
                    Some(id) => id,
                    None => {
                        let id = dispatch.create_texture(width, height)?;
                        texture.set(Some(id));
                        id
                    }
                };
                dispatch.bind_texture(kernel, name, id)
            }),
        );
        self.var_name = Some(name);
        Ok(())
    }

    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let color = ctx.input_var(
            &self.node,
            "color",
            ShaderType::Float4,
            ConstValue::Vec4([0.0, 0.0, 0.0, 1.0]),
        )?;
        let name = self
            .var_name
            .as_deref()
            .ok_or(CompileError::GraphNotBuilt)?;
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::None, format!("{name}[pixelCoordinate]")),
            Expr::variable(color),
        ));
        Ok(())
    }

    fn cleanup(&mut self, dispatch: &mut dyn ComputeDispatch) -> Result<(), CompileError> {
        let Some(id) = self.texture.get() else {
            return Ok(());
        };
        if let Some(path) = &self.path {
            let pixels = dispatch.read_back(id)?;
            let img = image::RgbaImage::from_raw(self.width, self.height, pixels).ok_or_else(
                || {
                    CompileError::Dispatch(format!(
                        "read-back of {}x{} target returned a short buffer",
                        self.width, self.height
                    ))
                },
            )?;
            img.save(path)?;
            debug!(node = %self.node.id, path = %path.display(), "exported sink texture");
        }
        dispatch.release_texture(id)?;
        self.texture.set(None);
        Ok(())
    }

    fn is_output(&self) -> bool {
        true
    }

    fn output_size(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use serde_json::json;

    fn write_node(params: serde_json::Value) -> WriteTexture2DNode {
        let g: Graph = serde_json::from_value(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [{ "id": "w1", "type": "WriteTexture2D", "params": params }],
            "connections": []
        }))
        .unwrap();
        WriteTexture2DNode::new(g.node("w1").unwrap().clone())
    }

    #[test]
    fn bad_extension_fails_before_compilation() {
        let mut node = write_node(json!({ "path": "out.tga" }));
        let mut lib = ShaderLibrary::new();
        let err = node.initialize(&mut lib).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOutputPath { .. }));
    }

    #[test]
    fn missing_parent_directory_fails_before_compilation() {
        let mut node = write_node(json!({ "path": "/no/such/dir/out.png" }));
        let mut lib = ShaderLibrary::new();
        let err = node.initialize(&mut lib).unwrap_err();
        assert!(matches!(err, CompileError::InvalidOutputPath { .. }));
    }

    #[test]
    fn store_instruction_targets_the_registered_texture() {
        let g: Graph = serde_json::from_value(json!({
            "version": "1.0",
            "metadata": { "name": "t" },
            "nodes": [{ "id": "w1", "type": "WriteTexture2D", "params": {} }],
            "connections": []
        }))
        .unwrap();
        let mut node = WriteTexture2DNode::new(g.node("w1").unwrap().clone());
        let mut lib = ShaderLibrary::new();
        node.initialize(&mut lib).unwrap();

        let mut ctx = CodeGenContext::new(&g);
        node.generate_code(&mut ctx).unwrap();
        let store = ctx.instructions().last().unwrap();
        assert_eq!(store.result.ty, ShaderType::None);
        assert_eq!(store.result.name, "outputTex_0[pixelCoordinate]");
        assert!(store.result.is_valid());
    }
}
