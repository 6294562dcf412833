//! Software rasterizer backend.
//!
//! A complete CPU implementation of [`RenderBackend`]: per-framebuffer RGBA8
//! pixel buffers, edge-function triangle fill with barycentric texture
//! interpolation, Bresenham lines, and the full blend-mode model. Slow and
//! proud of it — this backend exists for headless hosts and for tests that
//! assert on actual pixels.
//!
//! The backend is a cheap cloneable handle over shared state, so a test can
//! keep one clone for [`read_pixel`](SoftBackend::read_pixel) while the
//! renderer owns another.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec4};
use lienzo_core::Color;
use parking_lot::Mutex;

use crate::backend::{
    BlendEquation, BlendFactor, BlendMode, Brush, GpuId, RenderBackend, RenderMode, SurfaceData,
    TextureData, VertexFormat,
};

enum SoftTexture {
    /// Ordinary texture with its own pixels.
    Pixels {
        width: u32,
        height: u32,
        channels: u8,
        pixels: Vec<u8>,
    },
    /// Color attachment of a surface: sampling reads the framebuffer.
    Target(GpuId),
}

struct Framebuffer {
    width: u32,
    height: u32,
    /// RGBA8, row-major, row 0 at the top.
    pixels: Vec<u8>,
}

impl Framebuffer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }
}

struct Inner {
    next_id: GpuId,
    textures: HashMap<GpuId, SoftTexture>,
    framebuffers: HashMap<GpuId, Framebuffer>,

    projection: Mat4,
    transform: Mat4,
    clear_color: Color,
    draw_color: Color,
    brush: Brush,
    blend: BlendMode,
    bound_texture: GpuId,
    bound_framebuffer: GpuId,

    vertex_data: Vec<f32>,
    vertex_stride: usize,
}

/// The window-default framebuffer id.
const WINDOW_FRAMEBUFFER: GpuId = 0;

/// CPU rasterizer implementing [`RenderBackend`].
#[derive(Clone)]
pub struct SoftBackend {
    inner: Arc<Mutex<Inner>>,
}

impl SoftBackend {
    /// Create the backend with a window framebuffer of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        tracing::info!(width, height, "soft render backend initialized");

        let mut framebuffers = HashMap::new();
        framebuffers.insert(WINDOW_FRAMEBUFFER, Framebuffer::new(width, height));

        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 0,
                textures: HashMap::new(),
                framebuffers,
                projection: Mat4::IDENTITY,
                transform: Mat4::IDENTITY,
                clear_color: Color::BLACK,
                draw_color: Color::WHITE,
                brush: Brush::Solid,
                blend: BlendMode::ALPHA,
                bound_texture: 0,
                bound_framebuffer: WINDOW_FRAMEBUFFER,
                vertex_data: Vec::new(),
                vertex_stride: 2,
            })),
        }
    }

    /// Read one pixel of a framebuffer (`0` = window). `None` out of range.
    pub fn read_pixel(&self, framebuffer: GpuId, x: u32, y: u32) -> Option<Color> {
        let inner = self.inner.lock();
        let fb = inner.framebuffers.get(&framebuffer)?;

        if x >= fb.width || y >= fb.height {
            return None;
        }

        let at = (y as usize * fb.width as usize + x as usize) * 4;
        Some(Color::rgba(
            fb.pixels[at],
            fb.pixels[at + 1],
            fb.pixels[at + 2],
            fb.pixels[at + 3],
        ))
    }

    /// Copy of a texture's pixel storage, if it has its own.
    pub fn texture_pixels(&self, texture: GpuId) -> Option<Vec<u8>> {
        let inner = self.inner.lock();
        match inner.textures.get(&texture)? {
            SoftTexture::Pixels { pixels, .. } => Some(pixels.clone()),
            SoftTexture::Target(_) => None,
        }
    }
}

impl Inner {
    fn alloc_id(&mut self) -> GpuId {
        self.next_id += 1;
        self.next_id
    }

    /// Project a vertex position to framebuffer pixel coordinates.
    fn to_screen(&self, x: f32, y: f32, fb_width: u32, fb_height: u32) -> Vec2 {
        let clip = self.projection * self.transform * Vec4::new(x, y, 0.0, 1.0);

        // Orthographic: w is 1, no perspective divide needed. The viewport
        // flip puts NDC +y at row 0.
        Vec2::new(
            (clip.x * 0.5 + 0.5) * fb_width as f32,
            (1.0 - (clip.y * 0.5 + 0.5)) * fb_height as f32,
        )
    }

    /// Sample the bound texture at normalized coordinates, RGBA in 0..=1.
    fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let Some(texture) = self.textures.get(&self.bound_texture) else {
            return [1.0, 1.0, 1.0, 1.0];
        };

        match texture {
            SoftTexture::Pixels {
                width,
                height,
                channels,
                pixels,
            } => {
                let x = ((u * *width as f32) as i64).clamp(0, i64::from(*width) - 1) as usize;
                let y = ((v * *height as f32) as i64).clamp(0, i64::from(*height) - 1) as usize;
                let at = (y * *width as usize + x) * *channels as usize;

                let byte = |offset: usize| f32::from(pixels[at + offset]) / 255.0;

                match channels {
                    1 => {
                        let g = byte(0);
                        [g, g, g, 1.0]
                    }
                    2 => {
                        let g = byte(0);
                        [g, g, g, byte(1)]
                    }
                    3 => [byte(0), byte(1), byte(2), 1.0],
                    _ => [byte(0), byte(1), byte(2), byte(3)],
                }
            }
            SoftTexture::Target(framebuffer) => {
                let Some(fb) = self.framebuffers.get(framebuffer) else {
                    return [0.0, 0.0, 0.0, 1.0];
                };

                let x = ((u * fb.width as f32) as i64).clamp(0, i64::from(fb.width) - 1) as usize;
                let y = ((v * fb.height as f32) as i64).clamp(0, i64::from(fb.height) - 1) as usize;
                let at = (y * fb.width as usize + x) * 4;

                [
                    f32::from(fb.pixels[at]) / 255.0,
                    f32::from(fb.pixels[at + 1]) / 255.0,
                    f32::from(fb.pixels[at + 2]) / 255.0,
                    f32::from(fb.pixels[at + 3]) / 255.0,
                ]
            }
        }
    }

    /// The fragment color of the active brush at interpolated coordinates.
    fn shade(&self, u: f32, v: f32) -> [f32; 4] {
        let draw = self.draw_color.to_f32_array();

        match self.brush {
            Brush::Solid => draw,
            Brush::Textured => {
                let texel = self.sample(u, v);
                [
                    texel[0] * draw[0],
                    texel[1] * draw[1],
                    texel[2] * draw[2],
                    texel[3] * draw[3],
                ]
            }
            Brush::Font => {
                let texel = self.sample(u, v);
                [draw[0], draw[1], draw[2], texel[3] * draw[3]]
            }
        }
    }

    fn blend_pixel(&mut self, x: i64, y: i64, src: [f32; 4]) {
        let Some(fb) = self.framebuffers.get_mut(&self.bound_framebuffer) else {
            return;
        };

        if x < 0 || y < 0 || x >= i64::from(fb.width) || y >= i64::from(fb.height) {
            return;
        }

        let at = (y as usize * fb.width as usize + x as usize) * 4;
        let dst = [
            f32::from(fb.pixels[at]) / 255.0,
            f32::from(fb.pixels[at + 1]) / 255.0,
            f32::from(fb.pixels[at + 2]) / 255.0,
            f32::from(fb.pixels[at + 3]) / 255.0,
        ];

        let blended = blend(self.blend, src, dst);

        for channel in 0..4 {
            fb.pixels[at + channel] = (blended[channel].clamp(0.0, 1.0) * 255.0).round() as u8;
        }
    }

    fn fill_triangle(&mut self, v: [(Vec2, Vec2); 3]) {
        let (a, b, c) = (v[0].0, v[1].0, v[2].0);

        let area = edge(a, b, c);
        if area.abs() < f32::EPSILON {
            return;
        }

        let Some(fb) = self.framebuffers.get(&self.bound_framebuffer) else {
            return;
        };
        let (fb_w, fb_h) = (fb.width as i64, fb.height as i64);

        let min_x = (a.x.min(b.x).min(c.x).floor() as i64).max(0);
        let max_x = (a.x.max(b.x).max(c.x).ceil() as i64).min(fb_w - 1);
        let min_y = (a.y.min(b.y).min(c.y).floor() as i64).max(0);
        let max_y = (a.y.max(b.y).max(c.y).ceil() as i64).min(fb_h - 1);

        // Winding-invariant: normalize the edge functions by the area sign.
        let sign = area.signum();

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);

                let w0 = edge(b, c, p) * sign;
                let w1 = edge(c, a, p) * sign;
                let w2 = edge(a, b, p) * sign;

                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                    let denom = area.abs();
                    let uv = (v[0].1 * w0 + v[1].1 * w1 + v[2].1 * w2) / denom;

                    let src = self.shade(uv.x, uv.y);
                    self.blend_pixel(x, y, src);
                }
            }
        }
    }

    fn draw_line(&mut self, from: (Vec2, Vec2), to: (Vec2, Vec2)) {
        let src = self.shade(from.1.x, from.1.y);

        let (mut x0, mut y0) = (from.0.x.round() as i64, from.0.y.round() as i64);
        let (x1, y1) = (to.0.x.round() as i64, to.0.y.round() as i64);

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.blend_pixel(x0, y0, src);

            if x0 == x1 && y0 == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn exec_draw(&mut self, mode: RenderMode, first: u32, count: u32) {
        // Fetch and project the requested vertex range.
        let stride = self.vertex_stride;
        let start = first as usize * stride;
        let end = (first + count) as usize * stride;

        if end > self.vertex_data.len() {
            tracing::warn!(first, count, "draw range exceeds uploaded vertex data");
            return;
        }

        let (fb_w, fb_h) = match self.framebuffers.get(&self.bound_framebuffer) {
            Some(fb) => (fb.width, fb.height),
            None => return,
        };

        let vertices: Vec<(Vec2, Vec2)> = self.vertex_data[start..end]
            .chunks(stride)
            .map(|chunk| {
                let position = self.to_screen(chunk[0], chunk[1], fb_w, fb_h);
                let uv = if stride == 4 {
                    Vec2::new(chunk[2], chunk[3])
                } else {
                    Vec2::ZERO
                };
                (position, uv)
            })
            .collect();

        let n = vertices.len();

        match mode {
            RenderMode::Points => {
                for &(position, uv) in &vertices {
                    let src = self.shade(uv.x, uv.y);
                    self.blend_pixel(position.x as i64, position.y as i64, src);
                }
            }
            RenderMode::Lines => {
                for pair in vertices.chunks_exact(2) {
                    self.draw_line(pair[0], pair[1]);
                }
            }
            RenderMode::LineStrip => {
                for window in vertices.windows(2) {
                    self.draw_line(window[0], window[1]);
                }
            }
            RenderMode::LineLoop => {
                for window in vertices.windows(2) {
                    self.draw_line(window[0], window[1]);
                }
                if n > 2 {
                    self.draw_line(vertices[n - 1], vertices[0]);
                }
            }
            RenderMode::Triangles => {
                for triple in vertices.chunks_exact(3) {
                    self.fill_triangle([triple[0], triple[1], triple[2]]);
                }
            }
            RenderMode::TriangleStrip => {
                for i in 2..n {
                    self.fill_triangle([vertices[i - 2], vertices[i - 1], vertices[i]]);
                }
            }
            RenderMode::TriangleFan => {
                for i in 2..n {
                    self.fill_triangle([vertices[0], vertices[i - 1], vertices[i]]);
                }
            }
        }
    }
}

/// 2D cross product of (b - a) and (p - a).
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn factor(f: BlendFactor, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    match f {
        BlendFactor::Zero => [0.0; 4],
        BlendFactor::One => [1.0; 4],
        BlendFactor::SrcColor => src,
        BlendFactor::OneMinusSrcColor => src.map(|c| 1.0 - c),
        BlendFactor::DstColor => dst,
        BlendFactor::OneMinusDstColor => dst.map(|c| 1.0 - c),
        BlendFactor::SrcAlpha => [src[3]; 4],
        BlendFactor::OneMinusSrcAlpha => [1.0 - src[3]; 4],
        BlendFactor::DstAlpha => [dst[3]; 4],
        BlendFactor::OneMinusDstAlpha => [1.0 - dst[3]; 4],
    }
}

fn combine(eq: BlendEquation, s: f32, d: f32) -> f32 {
    match eq {
        BlendEquation::Add => s + d,
        BlendEquation::Subtract => s - d,
        BlendEquation::ReverseSubtract => d - s,
    }
}

fn blend(mode: BlendMode, src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    let cs = factor(mode.color_src, src, dst);
    let cd = factor(mode.color_dst, src, dst);
    let als = factor(mode.alpha_src, src, dst);
    let ald = factor(mode.alpha_dst, src, dst);

    [
        combine(mode.color_eq, src[0] * cs[0], dst[0] * cd[0]),
        combine(mode.color_eq, src[1] * cs[1], dst[1] * cd[1]),
        combine(mode.color_eq, src[2] * cs[2], dst[2] * cd[2]),
        combine(mode.alpha_eq, src[3] * als[3], dst[3] * ald[3]),
    ]
}

impl RenderBackend for SoftBackend {
    fn name(&self) -> &str {
        "soft"
    }

    fn upload_vertex_data(&mut self, format: VertexFormat, data: &[f32]) {
        let mut inner = self.inner.lock();
        inner.vertex_data.clear();
        inner.vertex_data.extend_from_slice(data);
        inner.vertex_stride = format.stride();
    }

    fn apply_projection(&mut self, projection: &Mat4) {
        self.inner.lock().projection = *projection;
    }

    fn apply_transform(&mut self, transform: &Mat4) {
        self.inner.lock().transform = *transform;
    }

    fn apply_surface(&mut self, surface: &SurfaceData) {
        self.inner.lock().bound_framebuffer = surface.framebuffer;
    }

    fn apply_texture(&mut self, texture: Option<&TextureData>) {
        self.inner.lock().bound_texture = texture.map_or(0, |t| t.gpu);
    }

    fn apply_clear_color(&mut self, color: Color) {
        self.inner.lock().clear_color = color;
    }

    fn apply_draw_color(&mut self, color: Color) {
        self.inner.lock().draw_color = color;
    }

    fn apply_brush(&mut self, brush: Brush) {
        self.inner.lock().brush = brush;
    }

    fn apply_vertex_format(&mut self, _format: VertexFormat) {
        // The stride is taken at upload time; nothing further to bind.
    }

    fn apply_blend_mode(&mut self, mode: BlendMode) {
        self.inner.lock().blend = mode;
    }

    fn exec_resize(&mut self, width: i32, height: i32) {
        let mut inner = self.inner.lock();
        inner.framebuffers.insert(
            WINDOW_FRAMEBUFFER,
            Framebuffer::new(width.max(0) as u32, height.max(0) as u32),
        );
    }

    fn exec_clear(&mut self) {
        let mut inner = self.inner.lock();
        let clear = inner.clear_color;
        let target = inner.bound_framebuffer;

        if let Some(fb) = inner.framebuffers.get_mut(&target) {
            for pixel in fb.pixels.chunks_exact_mut(4) {
                pixel[0] = clear.r;
                pixel[1] = clear.g;
                pixel[2] = clear.b;
                pixel[3] = clear.a;
            }
        }
    }

    fn exec_draw(&mut self, mode: RenderMode, first: u32, count: u32) {
        self.inner.lock().exec_draw(mode, first, count);
    }

    fn load_texture(&mut self, texture: &mut TextureData) {
        let mut inner = self.inner.lock();
        let id = inner.alloc_id();

        let size = texture.width as usize * texture.height as usize * texture.channels as usize;
        let pixels = texture
            .pixels
            .clone()
            .unwrap_or_else(|| vec![0; size]);

        inner.textures.insert(
            id,
            SoftTexture::Pixels {
                width: texture.width,
                height: texture.height,
                channels: texture.channels,
                pixels,
            },
        );

        texture.gpu = id;
    }

    fn unload_texture(&mut self, texture: &mut TextureData) {
        self.inner.lock().textures.remove(&texture.gpu);
        texture.gpu = 0;
    }

    fn update_texture(
        &mut self,
        texture: &TextureData,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        let mut inner = self.inner.lock();

        let Some(SoftTexture::Pixels {
            width: tex_w,
            height: tex_h,
            channels,
            pixels: storage,
        }) = inner.textures.get_mut(&texture.gpu)
        else {
            return;
        };

        let channels = usize::from(*channels);

        for row in 0..height {
            let dst_y = y + row;
            if dst_y >= *tex_h {
                break;
            }

            for col in 0..width {
                let dst_x = x + col;
                if dst_x >= *tex_w {
                    break;
                }

                let src_at = (row as usize * width as usize + col as usize) * channels;
                let dst_at = (dst_y as usize * *tex_w as usize + dst_x as usize) * channels;

                if src_at + channels <= pixels.len() {
                    storage[dst_at..dst_at + channels]
                        .copy_from_slice(&pixels[src_at..src_at + channels]);
                }
            }
        }
    }

    fn set_texture_smooth(&mut self, _texture: &TextureData, _smooth: bool) {
        // Nearest sampling only; the flag is accepted and ignored.
    }

    fn create_surface(&mut self, surface: &mut SurfaceData) {
        let mut inner = self.inner.lock();

        let framebuffer = inner.alloc_id();
        inner.framebuffers.insert(
            framebuffer,
            Framebuffer::new(surface.texture.width, surface.texture.height),
        );

        let texture = inner.alloc_id();
        inner.textures.insert(texture, SoftTexture::Target(framebuffer));

        surface.framebuffer = framebuffer;
        surface.framebuffer_ms = 0;
        surface.sample_count = 1;
        surface.texture.gpu = texture;
        surface.texture.channels = 4;
    }

    fn destroy_surface(&mut self, surface: &mut SurfaceData) {
        let mut inner = self.inner.lock();
        inner.framebuffers.remove(&surface.framebuffer);
        inner.textures.remove(&surface.texture.gpu);

        surface.framebuffer = 0;
        surface.framebuffer_ms = 0;
        surface.texture.gpu = 0;
    }

    fn set_surface_antialiasing_level(&mut self, surface: &mut SurfaceData, _level: u32) {
        // Single-sample rasterizer: every surface stays at one sample.
        surface.sample_count = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ortho(width: f32, height: f32) -> Mat4 {
        Mat4::orthographic_rh_gl(0.0, width, height, 0.0, -1.0, 1.0)
    }

    #[test]
    fn test_clear_fills_framebuffer() {
        let mut backend = SoftBackend::new(8, 8);

        backend.apply_clear_color(Color::rgb(24, 24, 24));
        backend.exec_clear();

        assert_eq!(
            backend.read_pixel(0, 4, 4),
            Some(Color::rgba(24, 24, 24, 255))
        );
    }

    #[test]
    fn test_triangle_fill_covers_center() {
        let mut backend = SoftBackend::new(16, 16);

        backend.apply_projection(&ortho(16.0, 16.0));
        backend.apply_transform(&Mat4::IDENTITY);
        backend.apply_brush(Brush::Solid);
        backend.apply_blend_mode(BlendMode::NONE);
        backend.apply_draw_color(Color::rgb(255, 0, 0));

        backend.upload_vertex_data(
            VertexFormat::Xy,
            &[1.0, 1.0, 15.0, 1.0, 8.0, 15.0],
        );
        backend.exec_draw(RenderMode::Triangles, 0, 3);

        assert_eq!(
            backend.read_pixel(0, 8, 7),
            Some(Color::rgba(255, 0, 0, 255))
        );
        // A corner outside the triangle stays untouched.
        assert_eq!(backend.read_pixel(0, 0, 15), Some(Color::rgba(0, 0, 0, 0)));
    }

    #[test]
    fn test_winding_does_not_matter() {
        let mut backend = SoftBackend::new(16, 16);

        backend.apply_projection(&ortho(16.0, 16.0));
        backend.apply_transform(&Mat4::IDENTITY);
        backend.apply_brush(Brush::Solid);
        backend.apply_blend_mode(BlendMode::NONE);
        backend.apply_draw_color(Color::rgb(0, 255, 0));

        // Clockwise this time.
        backend.upload_vertex_data(
            VertexFormat::Xy,
            &[8.0, 15.0, 15.0, 1.0, 1.0, 1.0],
        );
        backend.exec_draw(RenderMode::Triangles, 0, 3);

        assert_eq!(
            backend.read_pixel(0, 8, 7),
            Some(Color::rgba(0, 255, 0, 255))
        );
    }

    #[test]
    fn test_alpha_blending() {
        let mut backend = SoftBackend::new(4, 4);

        backend.apply_clear_color(Color::rgb(0, 0, 0));
        backend.exec_clear();

        backend.apply_projection(&ortho(4.0, 4.0));
        backend.apply_transform(&Mat4::IDENTITY);
        backend.apply_brush(Brush::Solid);
        backend.apply_blend_mode(BlendMode::ALPHA);
        backend.apply_draw_color(Color::rgba(255, 255, 255, 128));

        backend.upload_vertex_data(
            VertexFormat::Xy,
            &[0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0],
        );
        backend.exec_draw(RenderMode::TriangleFan, 0, 4);

        let pixel = backend.read_pixel(0, 1, 1).unwrap();
        // ~50% white over black.
        assert!((i32::from(pixel.r) - 128).abs() <= 2, "got {}", pixel.r);
    }

    #[test]
    fn test_textured_sampling() {
        let mut backend = SoftBackend::new(4, 4);

        // 2x1 texture: left red, right blue.
        let mut texture = TextureData {
            width: 2,
            height: 1,
            channels: 4,
            smooth: false,
            pixels: Some(vec![255, 0, 0, 255, 0, 0, 255, 255]),
            gpu: 0,
        };
        backend.load_texture(&mut texture);

        backend.apply_projection(&ortho(4.0, 4.0));
        backend.apply_transform(&Mat4::IDENTITY);
        backend.apply_brush(Brush::Textured);
        backend.apply_blend_mode(BlendMode::NONE);
        backend.apply_draw_color(Color::WHITE);
        backend.apply_texture(Some(&texture));

        backend.upload_vertex_data(
            VertexFormat::XySt,
            &[
                0.0, 0.0, 0.0, 0.0, //
                4.0, 0.0, 1.0, 0.0, //
                4.0, 4.0, 1.0, 1.0, //
                0.0, 4.0, 0.0, 1.0,
            ],
        );
        backend.exec_draw(RenderMode::TriangleFan, 0, 4);

        assert_eq!(
            backend.read_pixel(0, 0, 2),
            Some(Color::rgba(255, 0, 0, 255))
        );
        assert_eq!(
            backend.read_pixel(0, 3, 2),
            Some(Color::rgba(0, 0, 255, 255))
        );
    }

    #[test]
    fn test_surface_texture_aliases_framebuffer() {
        let mut backend = SoftBackend::new(8, 8);

        let mut surface = SurfaceData {
            texture: TextureData {
                width: 4,
                height: 4,
                channels: 4,
                ..TextureData::default()
            },
            ..SurfaceData::default()
        };
        backend.create_surface(&mut surface);
        assert_ne!(surface.framebuffer, 0);
        assert_ne!(surface.texture.gpu, 0);

        // Draw into the surface...
        backend.apply_surface(&surface);
        backend.apply_clear_color(Color::rgb(10, 200, 30));
        backend.exec_clear();

        // ...then sample its texture while drawing to the window.
        let window = SurfaceData::default();
        backend.apply_surface(&window);

        backend.apply_projection(&ortho(8.0, 8.0));
        backend.apply_transform(&Mat4::IDENTITY);
        backend.apply_brush(Brush::Textured);
        backend.apply_blend_mode(BlendMode::NONE);
        backend.apply_draw_color(Color::WHITE);
        backend.apply_texture(Some(&surface.texture));

        backend.upload_vertex_data(
            VertexFormat::XySt,
            &[
                0.0, 0.0, 0.0, 0.0, //
                8.0, 0.0, 1.0, 0.0, //
                8.0, 8.0, 1.0, 1.0, //
                0.0, 8.0, 0.0, 1.0,
            ],
        );
        backend.exec_draw(RenderMode::TriangleFan, 0, 4);

        assert_eq!(
            backend.read_pixel(0, 4, 4),
            Some(Color::rgba(10, 200, 30, 255))
        );
    }
}
