//! Do-nothing render backend.
//!
//! Hands out object ids so resource bookkeeping stays exercised, then
//! ignores every draw. Used when no real graphics context exists and the
//! application doesn't care (dedicated servers, CI smoke tests).

use glam::Mat4;
use lienzo_core::Color;

use crate::backend::{
    BlendMode, Brush, RenderBackend, RenderMode, SurfaceData, TextureData, VertexFormat,
};

/// Backend that accepts everything and draws nothing.
#[derive(Debug, Default)]
pub struct NullBackend {
    next_id: u32,
}

impl NullBackend {
    /// Create the backend. Cannot fail.
    pub fn new() -> Self {
        tracing::info!("null render backend initialized");
        Self { next_id: 0 }
    }

    fn next(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn upload_vertex_data(&mut self, _format: VertexFormat, _data: &[f32]) {}

    fn apply_projection(&mut self, _projection: &Mat4) {}

    fn apply_transform(&mut self, _transform: &Mat4) {}

    fn apply_surface(&mut self, _surface: &SurfaceData) {}

    fn apply_texture(&mut self, _texture: Option<&TextureData>) {}

    fn apply_clear_color(&mut self, _color: Color) {}

    fn apply_draw_color(&mut self, _color: Color) {}

    fn apply_brush(&mut self, _brush: Brush) {}

    fn apply_vertex_format(&mut self, _format: VertexFormat) {}

    fn apply_blend_mode(&mut self, _mode: BlendMode) {}

    fn exec_resize(&mut self, _width: i32, _height: i32) {}

    fn exec_clear(&mut self) {}

    fn exec_draw(&mut self, _mode: RenderMode, _first: u32, _count: u32) {}

    fn load_texture(&mut self, texture: &mut TextureData) {
        texture.gpu = self.next();
    }

    fn unload_texture(&mut self, texture: &mut TextureData) {
        texture.gpu = 0;
    }

    fn update_texture(
        &mut self,
        _texture: &TextureData,
        _x: u32,
        _y: u32,
        _width: u32,
        _height: u32,
        _pixels: &[u8],
    ) {
    }

    fn set_texture_smooth(&mut self, _texture: &TextureData, _smooth: bool) {}

    fn create_surface(&mut self, surface: &mut SurfaceData) {
        surface.texture.gpu = self.next();
        surface.framebuffer = self.next();
        surface.sample_count = 1;
        surface.framebuffer_ms = 0;
    }

    fn destroy_surface(&mut self, surface: &mut SurfaceData) {
        surface.texture.gpu = 0;
        surface.framebuffer = 0;
        surface.framebuffer_ms = 0;
    }

    fn set_surface_antialiasing_level(&mut self, surface: &mut SurfaceData, _level: u32) {
        surface.sample_count = 1;
    }
}
