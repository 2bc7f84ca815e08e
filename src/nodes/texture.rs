//! Texture import and sampling.

use std::cell::Cell;
use std::rc::Rc;

use crate::codegen::context::{BuiltIn, CodeGenContext};
use crate::codegen::expr::Expr;
use crate::codegen::instruction::{Instruction, ShaderType, VarDecl};
use crate::codegen::library::ShaderLibrary;
use crate::dispatch::{ComputeDispatch, TextureId};
use crate::error::CompileError;
use crate::graph::Node;
use crate::nodes::CodeGenNode;

/// Loads an image file at initialize and exposes it as a `Texture2D` library
/// variable; the actual device texture is created lazily inside the binding
/// callback and uploaded once.
pub struct ImportTexture2DNode {
    node: Node,
    texture: Rc<Cell<Option<TextureId>>>,
    var_name: Option<String>,
}

impl ImportTexture2DNode {
    pub fn new(node: Node) -> ImportTexture2DNode {
        ImportTexture2DNode {
            node,
            texture: Rc::new(Cell::new(None)),
            var_name: None,
        }
    }
}

impl CodeGenNode for ImportTexture2DNode {
    fn initialize(&mut self, library: &mut ShaderLibrary) -> Result<(), CompileError> {
        let path = self
            .node
            .param_str("path")
            .ok_or_else(|| CompileError::InvalidOption {
                node_id: self.node.id.clone(),
                option: "path".to_string(),
                detail: "ImportTexture2D requires a 'path' option".to_string(),
            })?;
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();
        let pixels = Rc::new(img.into_raw());

        let texture = Rc::clone(&self.texture);
        let name = library.add_variable(
            "tex",
            "Texture2D",
            Box::new(move |dispatch, kernel, name| {
                let id = match texture.get() {
                    Some(id) => id,
                    None => {
                        let id = dispatch.create_texture(width, height)?;
                        dispatch.upload_texture(id, &pixels)?;
                        texture.set(Some(id));
                        id
                    }
                };
                dispatch.bind_texture(kernel, name, id)
            }),
        );
        library.add_variable_exact_name(
            &format!("sampler_{name}"),
            "SamplerState",
            Box::new(|_, _, _| Ok(())),
        );
        self.var_name = Some(name);
        Ok(())
    }

    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let name = self
            .var_name
            .as_deref()
            .ok_or(CompileError::GraphNotBuilt)?
            .to_string();
        ctx.register_output_name(&self.node.id, "texture", &name);
        Ok(())
    }

    fn cleanup(&mut self, dispatch: &mut dyn ComputeDispatch) -> Result<(), CompileError> {
        if let Some(id) = self.texture.get() {
            dispatch.release_texture(id)?;
            self.texture.set(None);
        }
        Ok(())
    }
}

/// Samples a connected texture at a uv, defaulting to the dispatch uv.
pub struct SampleTexture2DNode {
    node: Node,
}

impl SampleTexture2DNode {
    pub fn new(node: Node) -> SampleTexture2DNode {
        SampleTexture2DNode { node }
    }
}

impl CodeGenNode for SampleTexture2DNode {
    fn generate_code(&mut self, ctx: &mut CodeGenContext<'_>) -> Result<(), CompileError> {
        let conn = ctx
            .graph()
            .incoming_connection(&self.node.id, "texture")
            .ok_or_else(|| CompileError::PortResolution {
                node_id: self.node.id.clone(),
                port: "texture".to_string(),
                detail: "texture input must be connected".to_string(),
            })?;
        let tex = ctx.output_var(&conn.from.node_id, &conn.from.port_id);
        let sampler = format!("sampler_{tex}");

        let uv = match ctx.graph().incoming_connection(&self.node.id, "uv") {
            Some(c) => ctx.output_var(&c.from.node_id, &c.from.port_id),
            None => ctx.builtin_var(BuiltIn::Uv).to_string(),
        };

        let out = ctx.output_var(&self.node.id, super::OUTPUT_PORT);
        ctx.push(Instruction::new(
            VarDecl::new(ShaderType::Float4, out),
            Expr::call(
                format!("{tex}.SampleLevel"),
                vec![
                    Expr::variable(sampler),
                    Expr::variable(uv),
                    Expr::constant("0"),
                ],
            ),
        ));
        Ok(())
    }
}
