//! Graphics backend abstraction.
//!
//! The renderer core (state cache, matrix stacks, primitives, atlas) is
//! backend-agnostic; everything device-specific goes through the
//! [`RenderBackend`] trait. The calls split into three families:
//!
//! - `apply_*` — state changes. The core elides redundant ones through its
//!   shadow state, so a backend may treat every call as a real change.
//! - `exec_*` — things that touch pixels (resize, clear, draw).
//! - resource management — textures and surfaces. The backend stamps its
//!   own object id into [`TextureData::gpu`] / [`SurfaceData`] on creation.
//!
//! In-tree implementations: [`NullBackend`](crate::NullBackend) (discards
//! everything) and [`SoftBackend`](crate::SoftBackend) (CPU rasterizer for
//! headless rendering and pixel-exact tests). OpenGL backends live outside
//! this workspace and implement the same trait over a GL context provided
//! by the platform driver.

use glam::Mat4;
use lienzo_core::Color;

/// Backend object id; `0` means "not created".
pub type GpuId = u32;

/// Shader-program/uniform combination used for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brush {
    /// One flat color.
    Solid,
    /// Sampler modulated by the draw color.
    Textured,
    /// Alpha taken from the texture's alpha/luminance pair, color from the
    /// draw color. Used by text rendering.
    Font,
}

/// Layout of the interleaved vertex stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    /// Two floats: x, y.
    Xy,
    /// Four floats: x, y, s, t.
    XySt,
}

impl VertexFormat {
    /// Floats per vertex.
    pub fn stride(self) -> usize {
        match self {
            Self::Xy => 2,
            Self::XySt => 4,
        }
    }
}

/// Primitive interpretation of the vertex stream, matching GL draw modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum RenderMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

/// Blend factor applied to source or destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

/// How the scaled source and destination combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum BlendEquation {
    Add,
    Subtract,
    ReverseSubtract,
}

/// A full blend configuration, color and alpha channels separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendMode {
    /// Factor applied to the source color.
    pub color_src: BlendFactor,
    /// Factor applied to the destination color.
    pub color_dst: BlendFactor,
    /// Color combination.
    pub color_eq: BlendEquation,
    /// Factor applied to the source alpha.
    pub alpha_src: BlendFactor,
    /// Factor applied to the destination alpha.
    pub alpha_dst: BlendFactor,
    /// Alpha combination.
    pub alpha_eq: BlendEquation,
}

impl BlendMode {
    /// No blending; source overwrites destination.
    pub const NONE: Self = Self::symmetric(BlendFactor::One, BlendFactor::Zero);

    /// Standard alpha blending.
    pub const ALPHA: Self =
        Self::symmetric(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);

    /// Additive blending.
    pub const ADD: Self = Self::symmetric(BlendFactor::SrcAlpha, BlendFactor::One);

    /// Multiplicative blending.
    pub const MUL: Self = Self {
        color_src: BlendFactor::Zero,
        color_dst: BlendFactor::SrcColor,
        color_eq: BlendEquation::Add,
        alpha_src: BlendFactor::Zero,
        alpha_dst: BlendFactor::SrcAlpha,
        alpha_eq: BlendEquation::Add,
    };

    /// Same factors for color and alpha, `Add` equation.
    pub const fn symmetric(src: BlendFactor, dst: BlendFactor) -> Self {
        Self {
            color_src: src,
            color_dst: dst,
            color_eq: BlendEquation::Add,
            alpha_src: src,
            alpha_dst: dst,
            alpha_eq: BlendEquation::Add,
        }
    }
}

impl Default for BlendMode {
    fn default() -> Self {
        Self::ALPHA
    }
}

/// CPU-side description of a texture.
#[derive(Debug, Clone, Default)]
pub struct TextureData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Color channels: 1 (gray), 2 (gray+alpha), 3 (RGB), 4 (RGBA).
    pub channels: u8,
    /// Linear filtering on sampling.
    pub smooth: bool,
    /// CPU pixel copy, `width * height * channels` bytes, row-major. Kept
    /// so textures survive backend reloads and content-preserving resizes.
    pub pixels: Option<Vec<u8>>,
    /// Backend object id, stamped by [`RenderBackend::load_texture`].
    pub gpu: GpuId,
}

/// CPU-side description of a render-target surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceData {
    /// The color attachment; its `gpu` id doubles as the sampling handle.
    pub texture: TextureData,
    /// Effective sample count (clamped to [`RenderBackend::max_samples`]).
    pub sample_count: u32,
    /// Backend framebuffer id; `0` is the window-default framebuffer.
    pub framebuffer: GpuId,
    /// Multisampled framebuffer id when `sample_count > 1`.
    pub framebuffer_ms: GpuId,
}

/// Device-specific half of the renderer.
pub trait RenderBackend {
    /// Backend name for logs ("gl3", "soft", "null", ...).
    fn name(&self) -> &str;

    /// Largest supported surface sample count.
    fn max_samples(&self) -> u32 {
        1
    }

    /// Replace the streaming vertex buffer for `format` with `data`.
    fn upload_vertex_data(&mut self, format: VertexFormat, data: &[f32]);

    /// Set the projection matrix.
    fn apply_projection(&mut self, projection: &Mat4);

    /// Set the modelview matrix.
    fn apply_transform(&mut self, transform: &Mat4);

    /// Bind a render target. Switching away from a multisampled surface
    /// resolves it into its color texture (backend-internal bookkeeping).
    fn apply_surface(&mut self, surface: &SurfaceData);

    /// Bind a texture for sampling, or none.
    fn apply_texture(&mut self, texture: Option<&TextureData>);

    /// Set the color used by [`exec_clear`](Self::exec_clear).
    fn apply_clear_color(&mut self, color: Color);

    /// Set the color modulating the active brush.
    fn apply_draw_color(&mut self, color: Color);

    /// Select the brush (shader program).
    fn apply_brush(&mut self, brush: Brush);

    /// Select the vertex layout.
    fn apply_vertex_format(&mut self, format: VertexFormat);

    /// Set the blend configuration.
    fn apply_blend_mode(&mut self, mode: BlendMode);

    /// The window framebuffer changed size.
    fn exec_resize(&mut self, width: i32, height: i32);

    /// Clear the bound target to the clear color.
    fn exec_clear(&mut self);

    /// Draw `count` vertices starting at `first` from the last uploaded
    /// vertex data, interpreted per `mode`.
    fn exec_draw(&mut self, mode: RenderMode, first: u32, count: u32);

    /// Create the backend object for a texture and stamp `texture.gpu`.
    fn load_texture(&mut self, texture: &mut TextureData);

    /// Destroy the backend object and clear `texture.gpu`.
    fn unload_texture(&mut self, texture: &mut TextureData);

    /// Upload a sub-rectangle of pixels into an existing texture.
    fn update_texture(
        &mut self,
        texture: &TextureData,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    );

    /// Toggle linear filtering.
    fn set_texture_smooth(&mut self, texture: &TextureData, smooth: bool);

    /// Create framebuffer objects for a surface, including its color
    /// texture, stamping the ids into `surface`.
    fn create_surface(&mut self, surface: &mut SurfaceData);

    /// Destroy a surface's backend objects.
    fn destroy_surface(&mut self, surface: &mut SurfaceData);

    /// Recreate a surface's attachments for a new sample count.
    fn set_surface_antialiasing_level(&mut self, surface: &mut SurfaceData, level: u32);
}
