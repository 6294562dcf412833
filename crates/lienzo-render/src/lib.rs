//! Lienzo Render - the immediate-mode 2D renderer
//!
//! This crate implements the drawing half of lienzo:
//!
//! # Core Abstractions
//!
//! ## Backend
//!
//! - [`RenderBackend`] - Object-safe trait over the graphics API
//!   (`apply_*` state changes, `exec_*` pixel work, resource management)
//! - [`NullBackend`] - Discards everything
//! - [`SoftBackend`] - CPU rasterizer; powers headless hosts and the
//!   pixel-level test suite
//!
//! OpenGL 1.x / 3.3 / ES 2 backends live out of tree and implement the same
//! trait over a context obtained from the platform driver.
//!
//! ## Renderer Core
//!
//! - [`Renderer`] - Texture/surface tables, per-target matrix stacks,
//!   dirty-bit state cache, primitives, canvas letterboxing
//! - [`Image`] - CPU-side decoded image (PNG/JPEG/BMP/TGA probe)
//!
//! ## Text
//!
//! - [`TextSystem`] - Font table, rustybuzz shaping, fontdue
//!   rasterization into per-font glyph atlases
//!
//! # Coordinate system
//!
//! Public coordinates are logical canvas units with the origin at the top
//! left and +y pointing down. Projections take care of the flip to GL-style
//! clip space; backends never see logical units.

pub mod backend;
pub mod image_data;
pub mod null;
pub mod renderer;
pub mod soft;
pub mod text;

pub use backend::{
    BlendEquation, BlendFactor, BlendMode, Brush, GpuId, RenderBackend, RenderMode, SurfaceData,
    TextureData, VertexFormat,
};
pub use image_data::Image;
pub use null::NullBackend;
pub use renderer::{Renderer, Surface, Texture};
pub use soft::SoftBackend;
pub use text::{Font, TextSystem};

/// Error types for rendering operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Image decode error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Nonsensical texture or surface dimensions.
    #[error("bad dimensions: {width}x{height}x{channels}")]
    BadDimensions {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
        /// Requested channel count.
        channels: u8,
    },

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for rendering operations.
pub type Result<T> = std::result::Result<T, Error>;
