//! The retained 2D renderer.
//!
//! [`Renderer`] sits between the public drawing API and a [`RenderBackend`].
//! It owns the texture and surface tables, the per-target matrix stacks and
//! a dirty-tracked shadow of every piece of backend state. `apply_*` calls
//! reach the backend only when a value actually changes, so issuing a
//! thousand identical draws costs one texture bind, one brush switch and one
//! vertex-format switch.
//!
//! ## Targets
//!
//! Drawing goes to one of three places: the window-default surface, the
//! optional *canvas* (a fixed-logical-size offscreen surface composited to
//! the window on present with aspect-preserving letterboxing), or a
//! user-created surface selected with [`Renderer::set_surface`]. Each target
//! carries its own projection and modelview stack.

use glam::{Mat4, Vec3};
use lienzo_core::{Color, Handle, HandleList};

use crate::backend::{
    BlendMode, Brush, GpuId, RenderBackend, RenderMode, SurfaceData, TextureData, VertexFormat,
};
use crate::image_data::Image;

/// Maximum modelview stack depth per target.
const MATRIX_STACK_DEPTH: usize = 32;

/// Circle tessellation: segments per radius unit, and bounds.
const CIRCLE_SEGMENTS_PER_UNIT: f32 = 0.5;
const MIN_CIRCLE_SEGMENTS: usize = 6;
const MAX_CIRCLE_SEGMENTS: usize = 64;

/// A texture living in the renderer's table.
pub struct Texture {
    data: TextureData,
}

/// Projection plus modelview stack of one render target.
struct TargetState {
    projection: Mat4,
    modelview: Vec<Mat4>,
}

impl TargetState {
    fn new(width: u32, height: u32) -> Self {
        Self {
            projection: ortho_pixels(width, height),
            modelview: vec![Mat4::IDENTITY],
        }
    }

    fn top(&self) -> Mat4 {
        *self.modelview.last().unwrap_or(&Mat4::IDENTITY)
    }
}

/// An offscreen render target with an embedded color texture.
pub struct Surface {
    data: SurfaceData,
    target: TargetState,
}

struct Canvas {
    data: SurfaceData,
    target: TargetState,
    letterbox: Letterbox,
}

/// Aspect-preserving mapping of the canvas onto the window.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
    width: f32,
    height: f32,
}

impl Letterbox {
    fn compute(window: (u32, u32), canvas: (u32, u32)) -> Self {
        let (ww, wh) = (window.0 as f32, window.1 as f32);
        let (cw, ch) = (canvas.0 as f32, canvas.1 as f32);

        let scale = (ww / cw).min(wh / ch);
        let width = cw * scale;
        let height = ch * scale;

        Self {
            scale,
            offset_x: (ww - width) / 2.0,
            offset_y: (wh - height) / 2.0,
            width,
            height,
        }
    }
}

/// Which target draws currently land on.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Bound {
    Display,
    Canvas,
    User(Handle<Surface>),
}

/// Last value sent to the backend for each piece of state; `None` = unknown.
#[derive(Default)]
struct Shadow {
    projection: Option<Mat4>,
    transform: Option<Mat4>,
    clear_color: Option<Color>,
    draw_color: Option<Color>,
    texture: Option<GpuId>,
    surface: Option<GpuId>,
    brush: Option<Brush>,
    vertex_format: Option<VertexFormat>,
    blend: Option<BlendMode>,
}

/// Texture source of a draw.
enum TexSource {
    None,
    Texture(Handle<Texture>),
    Surface(Handle<Surface>),
    Canvas,
}

/// The renderer core.
pub struct Renderer {
    backend: Box<dyn RenderBackend>,
    textures: HandleList<Texture>,
    surfaces: HandleList<Surface>,

    display_data: SurfaceData,
    display_target: TargetState,
    canvas: Option<Canvas>,
    bound: Bound,

    blend_mode: BlendMode,
    shadow: Shadow,
    scratch: Vec<f32>,
}

impl Renderer {
    /// Create the renderer for a window of the given pixel size.
    pub fn new(backend: Box<dyn RenderBackend>, width: u32, height: u32) -> Self {
        tracing::info!(backend = backend.name(), width, height, "renderer initialized");

        let mut renderer = Self {
            backend,
            textures: HandleList::new(),
            surfaces: HandleList::new(),
            display_data: SurfaceData {
                texture: TextureData {
                    width,
                    height,
                    channels: 4,
                    ..TextureData::default()
                },
                sample_count: 1,
                ..SurfaceData::default()
            },
            display_target: TargetState::new(width, height),
            canvas: None,
            bound: Bound::Display,
            blend_mode: BlendMode::ALPHA,
            shadow: Shadow::default(),
            scratch: Vec::new(),
        };

        renderer.backend.exec_resize(width as i32, height as i32);
        renderer
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    // --- Canvas ---

    /// Create the canvas: a fixed-size offscreen target that becomes the
    /// default destination for all drawing and is letterboxed onto the
    /// window on present.
    pub fn enable_canvas(&mut self, width: u32, height: u32) {
        let mut data = SurfaceData {
            texture: TextureData {
                width,
                height,
                channels: 4,
                smooth: false,
                ..TextureData::default()
            },
            sample_count: 1,
            ..SurfaceData::default()
        };

        self.backend.create_surface(&mut data);

        let window = self.window_size();
        self.canvas = Some(Canvas {
            data,
            target: TargetState::new(width, height),
            letterbox: Letterbox::compute(window, (width, height)),
        });

        if self.bound == Bound::Display {
            self.bound = Bound::Canvas;
        }
    }

    /// Toggle linear filtering of the canvas composite.
    pub fn set_canvas_flags(&mut self, smooth: bool) {
        let backend = self.backend.as_mut();

        if let Some(canvas) = self.canvas.as_mut() {
            canvas.data.texture.smooth = smooth;
            backend.set_texture_smooth(&canvas.data.texture, smooth);
        }
    }

    /// Logical canvas size, or the window size when no canvas exists.
    pub fn canvas_size(&self) -> (u32, u32) {
        self.canvas.as_ref().map_or(self.window_size(), |canvas| {
            (canvas.data.texture.width, canvas.data.texture.height)
        })
    }

    fn window_size(&self) -> (u32, u32) {
        (self.display_data.texture.width, self.display_data.texture.height)
    }

    /// The window was resized; recompute the default projection and the
    /// canvas letterbox.
    pub fn notify_window_resize(&mut self, width: i32, height: i32) {
        let (width, height) = (width.max(1) as u32, height.max(1) as u32);

        self.display_data.texture.width = width;
        self.display_data.texture.height = height;
        self.display_target = TargetState::new(width, height);
        self.backend.exec_resize(width as i32, height as i32);

        if let Some(canvas) = self.canvas.as_mut() {
            let size = (canvas.data.texture.width, canvas.data.texture.height);
            canvas.letterbox = Letterbox::compute((width, height), size);
        }
    }

    /// Map a window position to canvas coordinates, inverting the
    /// letterbox transform. Identity when no canvas exists.
    pub fn window_to_canvas(&self, position: (i32, i32)) -> (i32, i32) {
        let Some(canvas) = self.canvas.as_ref() else {
            return position;
        };

        let lb = canvas.letterbox;
        let (cw, ch) = (canvas.data.texture.width, canvas.data.texture.height);

        let x = (position.0 as f32 - lb.offset_x) / lb.scale;
        let y = (position.1 as f32 - lb.offset_y) / lb.scale;

        (
            (x as i32).clamp(0, cw as i32 - 1),
            (y as i32).clamp(0, ch as i32 - 1),
        )
    }

    /// Map a window-space delta to canvas units.
    pub fn window_delta_to_canvas(&self, delta: (i32, i32)) -> (i32, i32) {
        let Some(canvas) = self.canvas.as_ref() else {
            return delta;
        };

        let scale = canvas.letterbox.scale;
        (
            (delta.0 as f32 / scale) as i32,
            (delta.1 as f32 / scale) as i32,
        )
    }

    /// Composite the canvas onto the window. Called on present; a no-op
    /// without a canvas.
    pub fn present(&mut self) {
        let Some(canvas) = self.canvas.as_ref() else {
            return;
        };

        let lb = canvas.letterbox;
        let (x0, y0) = (lb.offset_x, lb.offset_y);
        let (x1, y1) = (lb.offset_x + lb.width, lb.offset_y + lb.height);

        let vertices = [
            x0, y0, 0.0, 0.0, //
            x1, y0, 1.0, 0.0, //
            x1, y1, 1.0, 1.0, //
            x0, y1, 0.0, 1.0,
        ];

        let (width, height) = self.window_size();

        self.submit(Submission {
            mode: RenderMode::TriangleFan,
            format: VertexFormat::XySt,
            brush: Brush::Textured,
            color: Color::WHITE,
            blend: BlendMode::NONE,
            texture: TexSource::Canvas,
            target: Some(TargetOverride {
                projection: ortho_pixels(width, height),
                transform: Mat4::IDENTITY,
                display: true,
            }),
            vertices: &vertices,
        });
    }

    // --- View and matrix stack ---

    /// Orthographic view centered at `(cx, cy)` spanning `w`×`h` logical
    /// units, rotated by `degrees`.
    pub fn set_view(&mut self, cx: f32, cy: f32, w: f32, h: f32, degrees: f32) {
        let mut projection = Mat4::orthographic_rh_gl(
            cx - w * 0.5,
            cx + w * 0.5,
            cy + h * 0.5,
            cy - h * 0.5,
            -1.0,
            1.0,
        );

        if degrees != 0.0 {
            let center = Vec3::new(cx, cy, 0.0);
            projection = projection
                * Mat4::from_translation(center)
                * Mat4::from_rotation_z(degrees.to_radians())
                * Mat4::from_translation(-center);
        }

        self.current_target_mut().projection = projection;
    }

    /// Restore the identity view covering the current target's pixel size.
    pub fn reset_view(&mut self) {
        let (width, height) = self.current_size();
        self.current_target_mut().projection = ortho_pixels(width, height);
    }

    /// Duplicate the top of the modelview stack.
    pub fn push_matrix(&mut self) {
        let target = self.current_target_mut();

        if target.modelview.len() >= MATRIX_STACK_DEPTH {
            tracing::warn!("matrix stack overflow");
            return;
        }

        target.modelview.push(target.top());
    }

    /// Discard the top of the modelview stack. Clamps at the bottom.
    pub fn pop_matrix(&mut self) {
        let target = self.current_target_mut();

        if target.modelview.len() <= 1 {
            tracing::warn!("matrix stack underflow");
            return;
        }

        target.modelview.pop();
    }

    /// Translate subsequent drawing.
    pub fn translate(&mut self, x: f32, y: f32) {
        self.multiply_top(Mat4::from_translation(Vec3::new(x, y, 0.0)));
    }

    /// Scale subsequent drawing.
    pub fn scale(&mut self, x: f32, y: f32) {
        self.multiply_top(Mat4::from_scale(Vec3::new(x, y, 1.0)));
    }

    /// Rotate subsequent drawing by `degrees`.
    pub fn rotate(&mut self, degrees: f32) {
        self.multiply_top(Mat4::from_rotation_z(degrees.to_radians()));
    }

    fn multiply_top(&mut self, matrix: Mat4) {
        let target = self.current_target_mut();

        if let Some(top) = target.modelview.last_mut() {
            *top = *top * matrix;
        }
    }

    // --- Clear and primitives ---

    /// Fill the current target with a color.
    pub fn clear(&mut self, color: Color) {
        let backend = self.backend.as_mut();
        let shadow = &mut self.shadow;

        let surface_data = match self.bound {
            Bound::Display => &self.display_data,
            Bound::Canvas => self
                .canvas
                .as_ref()
                .map_or(&self.display_data, |canvas| &canvas.data),
            Bound::User(handle) => self
                .surfaces
                .get(handle)
                .map_or(&self.display_data, |surface| &surface.data),
        };

        if shadow.surface != Some(surface_data.framebuffer) {
            backend.apply_surface(surface_data);
            shadow.surface = Some(surface_data.framebuffer);
        }

        if shadow.clear_color != Some(color) {
            backend.apply_clear_color(color);
            shadow.clear_color = Some(color);
        }

        backend.exec_clear();
    }

    /// Set the blend mode for subsequent draws.
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    /// Draw a single point.
    pub fn draw_point(&mut self, x: f32, y: f32, color: Color) {
        if !color.is_visible() {
            return;
        }

        self.draw_solid(RenderMode::Points, color, &[x, y]);
    }

    /// Draw a line segment.
    pub fn draw_line(&mut self, ax: f32, ay: f32, bx: f32, by: f32, color: Color) {
        if !color.is_visible() {
            return;
        }

        self.draw_solid(RenderMode::Lines, color, &[ax, ay, bx, by]);
    }

    /// Draw a triangle: fill first, then outline. Invisible colors skip
    /// their pass.
    pub fn draw_triangle(
        &mut self,
        ax: f32,
        ay: f32,
        bx: f32,
        by: f32,
        cx: f32,
        cy: f32,
        outline: Color,
        fill: Color,
    ) {
        let vertices = [ax, ay, bx, by, cx, cy];

        if fill.is_visible() {
            self.draw_solid(RenderMode::TriangleFan, fill, &vertices);
        }

        if outline.is_visible() {
            self.draw_solid(RenderMode::LineLoop, outline, &vertices);
        }
    }

    /// Draw an axis-aligned rectangle.
    pub fn draw_rectangle(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        outline: Color,
        fill: Color,
    ) {
        let vertices = [x, y, x + w, y, x + w, y + h, x, y + h];

        if fill.is_visible() {
            self.draw_solid(RenderMode::TriangleFan, fill, &vertices);
        }

        if outline.is_visible() {
            self.draw_solid(RenderMode::LineLoop, outline, &vertices);
        }
    }

    /// Draw a circle tessellated into segments proportional to its radius.
    pub fn draw_circle(&mut self, x: f32, y: f32, radius: f32, outline: Color, fill: Color) {
        let segments = ((radius * CIRCLE_SEGMENTS_PER_UNIT) as usize)
            .clamp(MIN_CIRCLE_SEGMENTS, MAX_CIRCLE_SEGMENTS);

        let mut vertices = Vec::with_capacity(segments * 2);
        for i in 0..segments {
            let angle = (i as f32 / segments as f32) * std::f32::consts::TAU;
            vertices.push(x + radius * angle.cos());
            vertices.push(y + radius * angle.sin());
        }

        if fill.is_visible() {
            self.draw_solid(RenderMode::TriangleFan, fill, &vertices);
        }

        if outline.is_visible() {
            self.draw_solid(RenderMode::LineLoop, outline, &vertices);
        }
    }

    fn draw_solid(&mut self, mode: RenderMode, color: Color, vertices: &[f32]) {
        let blend = self.blend_mode;

        self.submit(Submission {
            mode,
            format: VertexFormat::Xy,
            brush: Brush::Solid,
            color,
            blend,
            texture: TexSource::None,
            target: None,
            vertices,
        });
    }

    // --- Textures ---

    /// Create an empty texture. `channels` is 1..=4.
    pub fn create_texture(&mut self, width: u32, height: u32, channels: u8) -> Option<Handle<Texture>> {
        let image = match Image::blank(width, height, channels) {
            Ok(image) => image,
            Err(error) => {
                tracing::warn!(%error, "can't create texture");
                return None;
            }
        };

        self.adopt_image(image)
    }

    /// Decode an image file into a texture.
    pub fn load_texture(&mut self, path: impl AsRef<std::path::Path>) -> Option<Handle<Texture>> {
        let image = Image::load(path).ok()?;
        self.adopt_image(image)
    }

    /// Decode an in-memory image into a texture.
    pub fn load_texture_from_bytes(&mut self, name: &str, data: &[u8]) -> Option<Handle<Texture>> {
        let image = Image::from_bytes(name, data).ok()?;
        self.adopt_image(image)
    }

    fn adopt_image(&mut self, image: Image) -> Option<Handle<Texture>> {
        let mut data = TextureData {
            width: image.width,
            height: image.height,
            channels: image.channels,
            smooth: false,
            pixels: Some(image.pixels),
            gpu: 0,
        };

        self.backend.load_texture(&mut data);

        if data.gpu == 0 {
            tracing::warn!("backend rejected texture");
            return None;
        }

        self.textures.add(Texture { data })
    }

    /// Destroy a texture. Stale handles are ignored.
    pub fn destroy_texture(&mut self, handle: Handle<Texture>) {
        if let Some(mut texture) = self.textures.remove(handle) {
            if self.shadow.texture == Some(texture.data.gpu) {
                self.shadow.texture = None;
            }

            self.backend.unload_texture(&mut texture.data);
        }
    }

    /// Texture dimensions, if the handle is live.
    pub fn texture_size(&self, handle: Handle<Texture>) -> Option<(u32, u32)> {
        self.textures
            .get(handle)
            .map(|texture| (texture.data.width, texture.data.height))
    }

    /// Toggle linear filtering for a texture.
    pub fn set_texture_smooth(&mut self, handle: Handle<Texture>, smooth: bool) {
        let backend = self.backend.as_mut();

        if let Some(texture) = self.textures.get_mut(handle) {
            texture.data.smooth = smooth;
            backend.set_texture_smooth(&texture.data, smooth);
        }
    }

    /// Write a sub-rectangle of pixels (matching the texture's channel
    /// count) into a texture, CPU copy included.
    pub fn update_texture(
        &mut self,
        handle: Handle<Texture>,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) {
        let backend = self.backend.as_mut();

        let Some(texture) = self.textures.get_mut(handle) else {
            return;
        };

        let data = &mut texture.data;
        let channels = usize::from(data.channels);

        if let Some(storage) = data.pixels.as_mut() {
            for row in 0..height {
                let dst_y = y + row;
                if dst_y >= data.height {
                    break;
                }

                let copy_width = width.min(data.width.saturating_sub(x)) as usize;
                let src_at = row as usize * width as usize * channels;
                let dst_at = (dst_y as usize * data.width as usize + x as usize) * channels;

                let src_end = src_at + copy_width * channels;
                if src_end <= pixels.len() {
                    storage[dst_at..dst_at + copy_width * channels]
                        .copy_from_slice(&pixels[src_at..src_end]);
                }
            }
        }

        backend.update_texture(&texture.data, x, y, width, height, pixels);
    }

    /// Grow or shrink a texture, preserving the overlapping pixels. The
    /// backend object is recreated; the handle stays valid.
    pub fn resize_texture(&mut self, handle: Handle<Texture>, width: u32, height: u32) {
        let backend = self.backend.as_mut();
        let shadow = &mut self.shadow;

        let Some(texture) = self.textures.get_mut(handle) else {
            return;
        };

        let data = &mut texture.data;
        let channels = usize::from(data.channels);

        let mut next =
            vec![0u8; width as usize * height as usize * channels];

        if let Some(previous) = data.pixels.as_ref() {
            let copy_rows = data.height.min(height) as usize;
            let copy_cols = data.width.min(width) as usize;

            for row in 0..copy_rows {
                let src_at = row * data.width as usize * channels;
                let dst_at = row * width as usize * channels;
                next[dst_at..dst_at + copy_cols * channels]
                    .copy_from_slice(&previous[src_at..src_at + copy_cols * channels]);
            }
        }

        if shadow.texture == Some(data.gpu) {
            shadow.texture = None;
        }

        backend.unload_texture(data);

        data.width = width;
        data.height = height;
        data.pixels = Some(next);

        backend.load_texture(data);

        let smooth = data.smooth;
        backend.set_texture_smooth(data, smooth);
    }

    /// Draw the whole texture into the rectangle `(x, y, w, h)`.
    pub fn draw_texture(&mut self, handle: Handle<Texture>, x: f32, y: f32, w: f32, h: f32) {
        if self.textures.get(handle).is_none() {
            return;
        }

        let vertices = [
            x, y, 0.0, 0.0, //
            x + w, y, 1.0, 0.0, //
            x + w, y + h, 1.0, 1.0, //
            x, y + h, 0.0, 1.0,
        ];
        let blend = self.blend_mode;

        self.submit(Submission {
            mode: RenderMode::TriangleFan,
            format: VertexFormat::XySt,
            brush: Brush::Textured,
            color: Color::WHITE,
            blend,
            texture: TexSource::Texture(handle),
            target: None,
            vertices: &vertices,
        });
    }

    /// Draw the sub-rectangle `(rx, ry, rw, rh)` of a texture (in texels)
    /// into `(x, y, w, h)`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_subtexture(
        &mut self,
        handle: Handle<Texture>,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        rx: f32,
        ry: f32,
        rw: f32,
        rh: f32,
    ) {
        let Some((tex_w, tex_h)) = self.texture_size(handle) else {
            return;
        };

        let (tex_w, tex_h) = (tex_w as f32, tex_h as f32);
        let (s0, t0) = (rx / tex_w, ry / tex_h);
        let (s1, t1) = ((rx + rw) / tex_w, (ry + rh) / tex_h);

        let vertices = [
            x, y, s0, t0, //
            x + w, y, s1, t0, //
            x + w, y + h, s1, t1, //
            x, y + h, s0, t1,
        ];
        let blend = self.blend_mode;

        self.submit(Submission {
            mode: RenderMode::TriangleFan,
            format: VertexFormat::XySt,
            brush: Brush::Textured,
            color: Color::WHITE,
            blend,
            texture: TexSource::Texture(handle),
            target: None,
            vertices: &vertices,
        });
    }

    /// Draw glyph quads (position+UV triangles) from the text shaper with
    /// the font brush.
    pub(crate) fn draw_font(&mut self, atlas: Handle<Texture>, color: Color, vertices: &[f32]) {
        if self.textures.get(atlas).is_none() || vertices.is_empty() {
            return;
        }

        let blend = self.blend_mode;

        self.submit(Submission {
            mode: RenderMode::Triangles,
            format: VertexFormat::XySt,
            brush: Brush::Font,
            color,
            blend,
            texture: TexSource::Texture(atlas),
            target: None,
            vertices,
        });
    }

    // --- Surfaces ---

    /// Create an offscreen render target.
    pub fn create_surface(&mut self, width: u32, height: u32) -> Option<Handle<Surface>> {
        if width == 0 || height == 0 {
            tracing::warn!(width, height, "refusing zero-sized surface");
            return None;
        }

        let mut data = SurfaceData {
            texture: TextureData {
                width,
                height,
                channels: 4,
                ..TextureData::default()
            },
            sample_count: 1,
            ..SurfaceData::default()
        };

        self.backend.create_surface(&mut data);

        if data.framebuffer == 0 {
            tracing::warn!("backend rejected surface");
            return None;
        }

        self.surfaces.add(Surface {
            data,
            target: TargetState::new(width, height),
        })
    }

    /// Destroy a surface. If it was bound, drawing falls back to the
    /// canvas or window.
    pub fn destroy_surface(&mut self, handle: Handle<Surface>) {
        if let Some(mut surface) = self.surfaces.remove(handle) {
            if self.bound == Bound::User(handle) {
                self.reset_surface();
            }

            if self.shadow.surface == Some(surface.data.framebuffer) {
                self.shadow.surface = None;
            }

            self.backend.destroy_surface(&mut surface.data);
        }
    }

    /// Redirect drawing to a surface. Stale handles are ignored.
    pub fn set_surface(&mut self, handle: Handle<Surface>) {
        if self.surfaces.get(handle).is_some() {
            self.bound = Bound::User(handle);
        } else {
            tracing::warn!(handle = ?handle, "invalid surface handle");
        }
    }

    /// Redirect drawing back to the canvas (or the window if none).
    pub fn reset_surface(&mut self) {
        self.bound = if self.canvas.is_some() {
            Bound::Canvas
        } else {
            Bound::Display
        };
    }

    /// Request multisampling for a surface; the level is clamped to what
    /// the backend supports.
    pub fn set_surface_antialiasing(&mut self, handle: Handle<Surface>, level: u32) {
        let max = self.backend.max_samples();
        let clamped = level.clamp(1, max.max(1));

        if clamped != level {
            tracing::debug!(requested = level, clamped, "sample count clamped");
        }

        let backend = self.backend.as_mut();

        if let Some(surface) = self.surfaces.get_mut(handle) {
            backend.set_surface_antialiasing_level(&mut surface.data, clamped);
        }
    }

    /// Effective sample count of a surface.
    pub fn surface_sample_count(&self, handle: Handle<Surface>) -> Option<u32> {
        self.surfaces
            .get(handle)
            .map(|surface| surface.data.sample_count)
    }

    /// Draw a surface's color texture into a rectangle.
    pub fn draw_surface(&mut self, handle: Handle<Surface>, x: f32, y: f32, w: f32, h: f32) {
        if self.surfaces.get(handle).is_none() {
            return;
        }

        let vertices = [
            x, y, 0.0, 0.0, //
            x + w, y, 1.0, 0.0, //
            x + w, y + h, 1.0, 1.0, //
            x, y + h, 0.0, 1.0,
        ];
        let blend = self.blend_mode;

        self.submit(Submission {
            mode: RenderMode::TriangleFan,
            format: VertexFormat::XySt,
            brush: Brush::Textured,
            color: Color::WHITE,
            blend,
            texture: TexSource::Surface(handle),
            target: None,
            vertices: &vertices,
        });
    }

    // --- Internals ---

    fn current_size(&self) -> (u32, u32) {
        match self.bound {
            Bound::Display => self.window_size(),
            Bound::Canvas => self.canvas_size(),
            Bound::User(handle) => self
                .surfaces
                .get(handle)
                .map_or(self.window_size(), |surface| {
                    (surface.data.texture.width, surface.data.texture.height)
                }),
        }
    }

    fn current_target_mut(&mut self) -> &mut TargetState {
        match self.bound {
            Bound::Display => &mut self.display_target,
            Bound::Canvas => match self.canvas.as_mut() {
                Some(canvas) => &mut canvas.target,
                None => &mut self.display_target,
            },
            Bound::User(handle) => {
                if self.surfaces.get(handle).is_none() {
                    return &mut self.display_target;
                }

                match self.surfaces.get_mut(handle) {
                    Some(surface) => &mut surface.target,
                    None => &mut self.display_target,
                }
            }
        }
    }

    fn submit(&mut self, submission: Submission<'_>) {
        let backend = self.backend.as_mut();
        let shadow = &mut self.shadow;

        // Resolve the target: an explicit override (canvas composite), or
        // the currently bound surface with its own matrices.
        let (surface_data, projection, transform) = match submission.target {
            Some(over) => {
                debug_assert!(over.display);
                (&self.display_data, over.projection, over.transform)
            }
            None => match self.bound {
                Bound::Display => (
                    &self.display_data,
                    self.display_target.projection,
                    self.display_target.top(),
                ),
                Bound::Canvas => match self.canvas.as_ref() {
                    Some(canvas) => (&canvas.data, canvas.target.projection, canvas.target.top()),
                    None => (
                        &self.display_data,
                        self.display_target.projection,
                        self.display_target.top(),
                    ),
                },
                Bound::User(handle) => match self.surfaces.get(handle) {
                    Some(surface) => {
                        (&surface.data, surface.target.projection, surface.target.top())
                    }
                    None => (
                        &self.display_data,
                        self.display_target.projection,
                        self.display_target.top(),
                    ),
                },
            },
        };

        if shadow.surface != Some(surface_data.framebuffer) {
            backend.apply_surface(surface_data);
            shadow.surface = Some(surface_data.framebuffer);
        }

        if shadow.projection != Some(projection) {
            backend.apply_projection(&projection);
            shadow.projection = Some(projection);
        }

        if shadow.transform != Some(transform) {
            backend.apply_transform(&transform);
            shadow.transform = Some(transform);
        }

        if shadow.blend != Some(submission.blend) {
            backend.apply_blend_mode(submission.blend);
            shadow.blend = Some(submission.blend);
        }

        if shadow.draw_color != Some(submission.color) {
            backend.apply_draw_color(submission.color);
            shadow.draw_color = Some(submission.color);
        }

        let texture_data: Option<&TextureData> = match submission.texture {
            TexSource::None => None,
            TexSource::Texture(handle) => self.textures.get(handle).map(|t| &t.data),
            TexSource::Surface(handle) => {
                self.surfaces.get(handle).map(|s| &s.data.texture)
            }
            TexSource::Canvas => self.canvas.as_ref().map(|c| &c.data.texture),
        };

        let texture_gpu = texture_data.map_or(0, |data| data.gpu);
        if shadow.texture != Some(texture_gpu) {
            backend.apply_texture(texture_data);
            shadow.texture = Some(texture_gpu);
        }

        if shadow.brush != Some(submission.brush) {
            backend.apply_brush(submission.brush);
            shadow.brush = Some(submission.brush);
        }

        if shadow.vertex_format != Some(submission.format) {
            backend.apply_vertex_format(submission.format);
            shadow.vertex_format = Some(submission.format);
        }

        backend.upload_vertex_data(submission.format, submission.vertices);
        backend.exec_draw(
            submission.mode,
            0,
            (submission.vertices.len() / submission.format.stride()) as u32,
        );
    }
}

struct TargetOverride {
    projection: Mat4,
    transform: Mat4,
    /// Always the display surface for now (canvas composite).
    display: bool,
}

struct Submission<'a> {
    mode: RenderMode,
    format: VertexFormat,
    brush: Brush,
    color: Color,
    blend: BlendMode,
    texture: TexSource,
    target: Option<TargetOverride>,
    vertices: &'a [f32],
}

/// Top-left-origin orthographic projection over a pixel grid.
fn ortho_pixels(width: u32, height: u32) -> Mat4 {
    Mat4::orthographic_rh_gl(0.0, width.max(1) as f32, height.max(1) as f32, 0.0, -1.0, 1.0)
}
