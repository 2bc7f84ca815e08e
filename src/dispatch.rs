//! Boundary to the external GPU layer.
//!
//! The compiler produces source text; everything that actually touches a
//! device goes through [`ComputeDispatch`]. The [`RecordingDispatch`] double
//! backs the headless CLI and tests: it records every call and serves
//! zero-filled read-backs.

use std::collections::HashMap;

use crate::error::CompileError;

pub type TextureId = u32;

/// The full surface a real GPU backend implements. The compiler core only
/// drives the texture and dispatch calls itself; the scalar setters are part
/// of the contract for binding callbacks supplied by external node
/// implementations.
pub trait ComputeDispatch {
    fn load_kernel_source(&mut self, source: &str) -> Result<(), CompileError>;
    fn set_float(&mut self, kernel: usize, name: &str, value: f32) -> Result<(), CompileError>;
    fn set_int(&mut self, kernel: usize, name: &str, value: i32) -> Result<(), CompileError>;
    fn set_vector(&mut self, kernel: usize, name: &str, value: [f32; 4])
    -> Result<(), CompileError>;
    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, CompileError>;
    fn upload_texture(&mut self, texture: TextureId, rgba: &[u8]) -> Result<(), CompileError>;
    fn bind_texture(
        &mut self,
        kernel: usize,
        name: &str,
        texture: TextureId,
    ) -> Result<(), CompileError>;
    fn dispatch(
        &mut self,
        kernel: usize,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> Result<(), CompileError>;
    /// Reads a texture back as tightly packed RGBA8.
    fn read_back(&mut self, texture: TextureId) -> Result<Vec<u8>, CompileError>;
    fn release_texture(&mut self, texture: TextureId) -> Result<(), CompileError>;
}

/// Records every dispatch call without touching a device.
#[derive(Default)]
pub struct RecordingDispatch {
    pub calls: Vec<String>,
    pub kernel_source: Option<String>,
    textures: HashMap<TextureId, (u32, u32)>,
    next_texture: TextureId,
}

impl RecordingDispatch {
    pub fn new() -> RecordingDispatch {
        RecordingDispatch::default()
    }

    pub fn texture_size(&self, texture: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&texture).copied()
    }
}

impl ComputeDispatch for RecordingDispatch {
    fn load_kernel_source(&mut self, source: &str) -> Result<(), CompileError> {
        self.kernel_source = Some(source.to_string());
        self.calls.push("load_kernel_source".to_string());
        Ok(())
    }

    fn set_float(&mut self, kernel: usize, name: &str, value: f32) -> Result<(), CompileError> {
        self.calls.push(format!("set_float k{kernel} {name}={value}"));
        Ok(())
    }

    fn set_int(&mut self, kernel: usize, name: &str, value: i32) -> Result<(), CompileError> {
        self.calls.push(format!("set_int k{kernel} {name}={value}"));
        Ok(())
    }

    fn set_vector(
        &mut self,
        kernel: usize,
        name: &str,
        value: [f32; 4],
    ) -> Result<(), CompileError> {
        self.calls
            .push(format!("set_vector k{kernel} {name}={value:?}"));
        Ok(())
    }

    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, CompileError> {
        let id = self.next_texture;
        self.next_texture += 1;
        self.textures.insert(id, (width, height));
        self.calls.push(format!("create_texture t{id} {width}x{height}"));
        Ok(id)
    }

    fn upload_texture(&mut self, texture: TextureId, rgba: &[u8]) -> Result<(), CompileError> {
        self.calls
            .push(format!("upload_texture t{texture} {} bytes", rgba.len()));
        Ok(())
    }

    fn bind_texture(
        &mut self,
        kernel: usize,
        name: &str,
        texture: TextureId,
    ) -> Result<(), CompileError> {
        self.calls
            .push(format!("bind_texture k{kernel} {name}=t{texture}"));
        Ok(())
    }

    fn dispatch(
        &mut self,
        kernel: usize,
        groups_x: u32,
        groups_y: u32,
        groups_z: u32,
    ) -> Result<(), CompileError> {
        self.calls
            .push(format!("dispatch k{kernel} {groups_x}x{groups_y}x{groups_z}"));
        Ok(())
    }

    fn read_back(&mut self, texture: TextureId) -> Result<Vec<u8>, CompileError> {
        let (w, h) = self
            .textures
            .get(&texture)
            .copied()
            .ok_or_else(|| CompileError::Dispatch(format!("unknown texture t{texture}")))?;
        self.calls.push(format!("read_back t{texture}"));
        Ok(vec![0u8; (w * h * 4) as usize])
    }

    fn release_texture(&mut self, texture: TextureId) -> Result<(), CompileError> {
        self.textures.remove(&texture);
        self.calls.push(format!("release_texture t{texture}"));
        Ok(())
    }
}
