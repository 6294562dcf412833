//! The runtime: backend selection, lifecycle, frame loop, public API.

use std::sync::Arc;

use lienzo_audio::{AudioBackend, AudioSystem, Music, Sound, VoiceId};
use lienzo_core::{Color, Handle};
use lienzo_platform::input::{KeyCallback, MotionCallback, MouseButtonCallback};
use lienzo_platform::{
    Clock, DateTime, Event, EventQueue, HeadlessDriver, Input, JoystickDriver, Key, KeyState,
    MouseButton, NullJoystick, PlatformDriver, WindowFlags,
};
use lienzo_render::{
    BlendMode, Font, NullBackend as NullRenderBackend, RenderBackend, Renderer, SoftBackend,
    Surface, TextSystem, Texture,
};

use crate::{Error, Result};

/// Startup parameters.
#[derive(Debug, Clone)]
pub struct Params {
    /// Window title.
    pub title: String,
    /// Window size in pixels.
    pub window_size: (i32, i32),
    /// Logical canvas size. `None` draws directly to the window.
    pub canvas_size: Option<(u32, u32)>,
    /// Window hints.
    pub window_flags: WindowFlags,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            title: "lienzo application".to_string(),
            window_size: (1280, 720),
            canvas_size: None,
            window_flags: WindowFlags::default(),
        }
    }
}

/// The framework context: every subsystem, initialized leaves-first and
/// torn down in reverse.
pub struct Context {
    // Field order is teardown order; [`Context::terminate`] runs the
    // explicit part (text needs the renderer, audio joins its workers).
    text: TextSystem,
    audio: AudioSystem,
    renderer: Renderer,
    input: Input,
    queue: EventQueue,
    joystick: Box<dyn JoystickDriver>,
    driver: Box<dyn PlatformDriver>,
    clock: Clock,
    terminated: bool,
}

impl Context {
    /// Probe the compiled-in backends and build the context.
    pub fn new(params: Params) -> Result<Self> {
        let driver = select_platform(&params)?;
        let render_backend = select_renderer(driver.as_ref())?;
        let audio_backend = lienzo_audio::select_backend();

        Ok(Self::assemble(driver, render_backend, audio_backend, params))
    }

    /// Build the context over explicit backends, skipping the probe. This
    /// is how out-of-tree platform drivers and GL backends plug in, and how
    /// tests inject scripted drivers.
    pub fn with_backends(
        driver: Box<dyn PlatformDriver>,
        render_backend: Box<dyn RenderBackend>,
        audio_backend: Arc<dyn AudioBackend>,
        params: Params,
    ) -> Self {
        Self::assemble(driver, render_backend, audio_backend, params)
    }

    fn assemble(
        mut driver: Box<dyn PlatformDriver>,
        render_backend: Box<dyn RenderBackend>,
        audio_backend: Arc<dyn AudioBackend>,
        params: Params,
    ) -> Self {
        driver.set_window_title(&params.title);
        driver.set_window_size(params.window_size.0, params.window_size.1);
        driver.set_window_flags(params.window_flags);

        let joystick = select_joystick();

        let (width, height) = driver.window_size();
        let mut renderer = Renderer::new(
            render_backend,
            width.max(1) as u32,
            height.max(1) as u32,
        );

        if let Some((cw, ch)) = params.canvas_size {
            renderer.enable_canvas(cw, ch);
        }

        let context = Self {
            text: TextSystem::new(),
            audio: AudioSystem::new(audio_backend),
            renderer,
            input: Input::new(),
            queue: EventQueue::new(),
            joystick,
            driver,
            clock: Clock::start(),
            terminated: false,
        };

        tracing::info!(
            platform = context.driver.name(),
            renderer = context.renderer.backend_name(),
            audio = context.audio.backend_name(),
            joystick = context.joystick.name(),
            "initialized"
        );

        context
    }

    /// Pump platform events and derive this frame's input snapshot.
    /// Returns `false` when the platform asked to close the window.
    pub fn process(&mut self) -> bool {
        self.input.begin_frame();

        if !self.driver.pump_events(&mut self.queue) {
            return false;
        }

        for event in self.queue.drain() {
            if let Event::WindowResized { width, height } = event {
                self.renderer.notify_window_resize(width, height);
            }

            self.input.handle_event(event);
        }

        self.input.end_frame();
        self.joystick.poll();

        true
    }

    /// Flush pending drawing, composite the canvas and swap buffers.
    pub fn present(&mut self) {
        self.renderer.present();
        self.driver.swap_buffers();
    }

    /// Convenience frame driver: runs `process`, then `loop_fn`, until
    /// either returns `false`; then tears everything down.
    pub fn execute(mut self, mut loop_fn: impl FnMut(&mut Self) -> bool) {
        while self.process() && loop_fn(&mut self) {}

        self.terminate();
    }

    /// Inject a synthetic event as if the platform driver produced it.
    /// Picked up by the next [`process`](Self::process).
    pub fn enqueue_event(&mut self, event: Event) {
        self.queue.push(event);
    }

    /// Explicit teardown in reverse initialization order: fonts and their
    /// atlases first, then the mixer (joins music workers), then the rest
    /// via drop. Idempotent; also runs on drop.
    pub fn terminate(&mut self) {
        if self.terminated {
            return;
        }

        self.text.shutdown(&mut self.renderer);
        self.audio.shutdown();
        self.terminated = true;

        tracing::info!("terminated");
    }

    // --- Window ---

    /// Current window title.
    pub fn window_title(&self) -> &str {
        self.driver.window_title()
    }

    /// Set the window title.
    pub fn set_window_title(&mut self, title: &str) {
        self.driver.set_window_title(title);
    }

    /// Window size in pixels.
    pub fn window_size(&self) -> (i32, i32) {
        self.driver.window_size()
    }

    /// Request a window size in pixels.
    pub fn set_window_size(&mut self, width: i32, height: i32) {
        self.driver.set_window_size(width, height);
    }

    /// Apply window hints.
    pub fn set_window_flags(&mut self, flags: WindowFlags) {
        self.driver.set_window_flags(flags);
    }

    /// Whether the window has input focus.
    pub fn is_window_active(&self) -> bool {
        self.input.is_window_active()
    }

    // --- Keyboard ---

    /// The whole keyboard state table.
    pub fn keyboard_state(&self) -> &[KeyState; Key::COUNT] {
        self.input.keyboard_state()
    }

    /// State of one key.
    pub fn key_state(&self, key: Key) -> KeyState {
        self.input.key_state(key)
    }

    /// Whether a key is held.
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.input.is_key_pressed(key)
    }

    /// Install the key-press callback.
    pub fn on_key_pressed(&mut self, callback: KeyCallback) {
        self.input.on_key_pressed(callback);
    }

    /// Install the key-repeat callback.
    pub fn on_key_repeated(&mut self, callback: KeyCallback) {
        self.input.on_key_repeated(callback);
    }

    /// Install the key-release callback.
    pub fn on_key_released(&mut self, callback: KeyCallback) {
        self.input.on_key_released(callback);
    }

    // --- Mouse ---

    /// Mouse button bitmask (bit 0 = left).
    pub fn mouse_button_state(&self) -> u8 {
        self.input.mouse_button_state()
    }

    /// Whether a mouse button is held.
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.input.is_mouse_button_pressed(button)
    }

    /// Cursor position in canvas coordinates.
    pub fn mouse_cursor_position(&self) -> (i32, i32) {
        self.renderer.window_to_canvas(self.input.cursor_position())
    }

    /// This frame's cursor movement in canvas units.
    pub fn mouse_cursor_delta(&self) -> (i32, i32) {
        self.renderer.window_delta_to_canvas(self.input.cursor_delta())
    }

    /// This frame's accumulated wheel scrolling.
    pub fn mouse_wheel_delta(&self) -> (i32, i32) {
        self.input.wheel_delta()
    }

    /// Install the mouse-button-press callback.
    pub fn on_mouse_button_pressed(&mut self, callback: MouseButtonCallback) {
        self.input.on_mouse_button_pressed(callback);
    }

    /// Install the mouse-button-release callback.
    pub fn on_mouse_button_released(&mut self, callback: MouseButtonCallback) {
        self.input.on_mouse_button_released(callback);
    }

    /// Install the once-per-frame cursor-motion callback.
    pub fn on_mouse_cursor_moved(&mut self, callback: MotionCallback) {
        self.input.on_mouse_cursor_moved(callback);
    }

    /// Install the once-per-frame wheel callback.
    pub fn on_mouse_wheel_scrolled(&mut self, callback: MotionCallback) {
        self.input.on_mouse_wheel_scrolled(callback);
    }

    // --- Touch ---

    /// Whether a touch point is down.
    pub fn is_touch_pressed(&self, index: usize) -> bool {
        self.input.is_touch_pressed(index)
    }

    /// Position of a touch point in canvas coordinates, if down.
    pub fn touch_position(&self, index: usize) -> Option<(i32, i32)> {
        self.input
            .touch_position(index)
            .map(|position| self.renderer.window_to_canvas(position))
    }

    /// This frame's movement of a touch point in canvas units, if down.
    pub fn touch_delta(&self, index: usize) -> Option<(i32, i32)> {
        self.input
            .touch_delta(index)
            .map(|delta| self.renderer.window_delta_to_canvas(delta))
    }

    // --- Joystick ---

    /// Whether a joystick is connected.
    pub fn is_joystick_connected(&self, index: usize) -> bool {
        self.joystick.is_connected(index)
    }

    /// Device name of a joystick.
    pub fn joystick_name(&self, index: usize) -> Option<&str> {
        self.joystick.joystick_name(index)
    }

    /// Button count of a joystick.
    pub fn joystick_button_count(&self, index: usize) -> usize {
        self.joystick.button_count(index)
    }

    /// Axis count of a joystick.
    pub fn joystick_axis_count(&self, index: usize) -> usize {
        self.joystick.axis_count(index)
    }

    /// Name of a joystick button.
    pub fn joystick_button_name(&self, index: usize, button: usize) -> Option<&str> {
        self.joystick.button_name(index, button)
    }

    /// Name of a joystick axis.
    pub fn joystick_axis_name(&self, index: usize, axis: usize) -> Option<&str> {
        self.joystick.axis_name(index, axis)
    }

    /// Whether a joystick button is held.
    pub fn is_joystick_button_pressed(&self, index: usize, button: usize) -> bool {
        self.joystick.is_button_pressed(index, button)
    }

    /// Position of a joystick axis in `-1.0..=1.0`.
    pub fn joystick_axis_value(&self, index: usize, axis: usize) -> f32 {
        self.joystick.axis_value(index, axis)
    }

    // --- Time ---

    /// Seconds since startup, millisecond granularity.
    pub fn time_mediump(&self) -> f32 {
        self.clock.time_mediump()
    }

    /// Seconds since startup, full resolution.
    pub fn time_highp(&self) -> f64 {
        self.clock.time_highp()
    }

    /// Current wall-clock date and time (UTC).
    pub fn date_time(&self) -> DateTime {
        DateTime::now()
    }

    // --- Graphics ---

    /// Fill the current target with a color.
    pub fn clear(&mut self, color: Color) {
        self.renderer.clear(color);
    }

    /// Set the blend mode for subsequent draws.
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.renderer.set_blend_mode(mode);
    }

    /// Orthographic view centered on `(cx, cy)`.
    pub fn set_view(&mut self, cx: f32, cy: f32, w: f32, h: f32, degrees: f32) {
        self.renderer.set_view(cx, cy, w, h, degrees);
    }

    /// Restore the pixel-identity view.
    pub fn reset_view(&mut self) {
        self.renderer.reset_view();
    }

    /// Duplicate the top of the matrix stack.
    pub fn push_matrix(&mut self) {
        self.renderer.push_matrix();
    }

    /// Discard the top of the matrix stack.
    pub fn pop_matrix(&mut self) {
        self.renderer.pop_matrix();
    }

    /// Translate subsequent drawing.
    pub fn translate(&mut self, x: f32, y: f32) {
        self.renderer.translate(x, y);
    }

    /// Scale subsequent drawing.
    pub fn scale(&mut self, x: f32, y: f32) {
        self.renderer.scale(x, y);
    }

    /// Rotate subsequent drawing by degrees.
    pub fn rotate(&mut self, degrees: f32) {
        self.renderer.rotate(degrees);
    }

    /// Draw a point.
    pub fn draw_point(&mut self, x: f32, y: f32, color: Color) {
        self.renderer.draw_point(x, y, color);
    }

    /// Draw a line.
    pub fn draw_line(&mut self, ax: f32, ay: f32, bx: f32, by: f32, color: Color) {
        self.renderer.draw_line(ax, ay, bx, by, color);
    }

    /// Draw a triangle.
    #[allow(clippy::too_many_arguments)]
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
        self.renderer.draw_triangle(ax, ay, bx, by, cx, cy, outline, fill);
    }

    /// Draw a rectangle.
    pub fn draw_rectangle(&mut self, x: f32, y: f32, w: f32, h: f32, outline: Color, fill: Color) {
        self.renderer.draw_rectangle(x, y, w, h, outline, fill);
    }

    /// Draw a circle.
    pub fn draw_circle(&mut self, x: f32, y: f32, radius: f32, outline: Color, fill: Color) {
        self.renderer.draw_circle(x, y, radius, outline, fill);
    }

    /// Load a texture from an image file.
    pub fn load_texture(&mut self, path: impl AsRef<std::path::Path>) -> Option<Handle<Texture>> {
        self.renderer.load_texture(path)
    }

    /// Decode a texture from an in-memory image.
    pub fn load_texture_from_bytes(&mut self, name: &str, data: &[u8]) -> Option<Handle<Texture>> {
        self.renderer.load_texture_from_bytes(name, data)
    }

    /// Create an empty texture.
    pub fn create_texture(&mut self, width: u32, height: u32, channels: u8) -> Option<Handle<Texture>> {
        self.renderer.create_texture(width, height, channels)
    }

    /// Destroy a texture.
    pub fn destroy_texture(&mut self, handle: Handle<Texture>) {
        self.renderer.destroy_texture(handle);
    }

    /// Toggle linear filtering of a texture.
    pub fn set_texture_smooth(&mut self, handle: Handle<Texture>, smooth: bool) {
        self.renderer.set_texture_smooth(handle, smooth);
    }

    /// Draw a whole texture.
    pub fn draw_texture(&mut self, handle: Handle<Texture>, x: f32, y: f32, w: f32, h: f32) {
        self.renderer.draw_texture(handle, x, y, w, h);
    }

    /// Draw part of a texture.
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
        self.renderer.draw_subtexture(handle, x, y, w, h, rx, ry, rw, rh);
    }

    /// Create an offscreen surface.
    pub fn create_surface(&mut self, width: u32, height: u32) -> Option<Handle<Surface>> {
        self.renderer.create_surface(width, height)
    }

    /// Destroy a surface.
    pub fn destroy_surface(&mut self, handle: Handle<Surface>) {
        self.renderer.destroy_surface(handle);
    }

    /// Redirect drawing to a surface.
    pub fn set_surface(&mut self, handle: Handle<Surface>) {
        self.renderer.set_surface(handle);
    }

    /// Redirect drawing back to the canvas or window.
    pub fn reset_surface(&mut self) {
        self.renderer.reset_surface();
    }

    /// Request surface multisampling (clamped to backend support).
    pub fn set_surface_antialiasing(&mut self, handle: Handle<Surface>, level: u32) {
        self.renderer.set_surface_antialiasing(handle, level);
    }

    /// Draw a surface's contents.
    pub fn draw_surface(&mut self, handle: Handle<Surface>, x: f32, y: f32, w: f32, h: f32) {
        self.renderer.draw_surface(handle, x, y, w, h);
    }

    /// Toggle linear filtering of the canvas composite.
    pub fn set_canvas_flags(&mut self, smooth: bool) {
        self.renderer.set_canvas_flags(smooth);
    }

    // --- Text ---

    /// Load a font at a pixel size.
    pub fn load_font(
        &mut self,
        path: impl AsRef<std::path::Path>,
        size: f32,
    ) -> Option<Handle<Font>> {
        self.text.load_font(&mut self.renderer, path, size)
    }

    /// Load a font from raw bytes.
    pub fn load_font_from_bytes(
        &mut self,
        name: &str,
        data: Vec<u8>,
        size: f32,
    ) -> Option<Handle<Font>> {
        self.text.load_font_from_bytes(&mut self.renderer, name, data, size)
    }

    /// Destroy a font and its atlas.
    pub fn destroy_font(&mut self, handle: Handle<Font>) {
        self.text.destroy_font(&mut self.renderer, handle);
    }

    /// Draw a string.
    pub fn draw_text(&mut self, font: Handle<Font>, x: f32, y: f32, color: Color, text: &str) {
        self.text.draw_text(&mut self.renderer, font, x, y, color, text);
    }

    /// Width and height a string would occupy.
    pub fn calculate_text_box(&self, font: Handle<Font>, text: &str) -> Option<(f32, f32)> {
        self.text.calculate_text_box(font, text)
    }

    // --- Audio ---

    /// Set the master volume in `0.0..=1.0`.
    pub fn set_master_volume(&self, volume: f32) {
        self.audio.set_master_volume(volume);
    }

    /// Load and fully decode a sound file.
    pub fn load_sound(&mut self, path: impl AsRef<std::path::Path>) -> Option<Handle<Sound>> {
        self.audio.load_sound(path)
    }

    /// Decode a sound from an in-memory buffer.
    pub fn load_sound_from_bytes(
        &mut self,
        name: &str,
        data: impl Into<Arc<[u8]>>,
    ) -> Option<Handle<Sound>> {
        self.audio.load_sound_from_bytes(name, data)
    }

    /// Free a sound.
    pub fn destroy_sound(&mut self, handle: Handle<Sound>) {
        self.audio.destroy_sound(handle);
    }

    /// Play a sound once.
    pub fn play_sound(&self, handle: Handle<Sound>) -> VoiceId {
        self.audio.play_sound(handle)
    }

    /// Play a sound looping.
    pub fn loop_sound(&self, handle: Handle<Sound>) -> VoiceId {
        self.audio.loop_sound(handle)
    }

    /// Open a music stream.
    pub fn open_music(&mut self, path: impl AsRef<std::path::Path>) -> Option<Handle<Music>> {
        self.audio.open_music(path)
    }

    /// Open a music stream over an in-memory buffer.
    pub fn open_music_from_bytes(
        &mut self,
        name: &str,
        data: impl Into<Arc<[u8]>>,
    ) -> Option<Handle<Music>> {
        self.audio.open_music_from_bytes(name, data)
    }

    /// Stop and close a music stream.
    pub fn close_music(&mut self, handle: Handle<Music>) {
        self.audio.close_music(handle);
    }

    /// Play a track once (idempotent while playing).
    pub fn play_music(&mut self, handle: Handle<Music>) -> VoiceId {
        self.audio.play_music(handle)
    }

    /// Play a track repeating forever.
    pub fn loop_music(&mut self, handle: Handle<Music>) -> VoiceId {
        self.audio.loop_music(handle)
    }

    /// Pause a playing voice.
    pub fn pause_voice(&self, voice: VoiceId) {
        self.audio.pause_voice(voice);
    }

    /// Resume a paused voice.
    pub fn unpause_voice(&self, voice: VoiceId) {
        self.audio.unpause_voice(voice);
    }

    /// Stop a voice for good.
    pub fn stop_voice(&self, voice: VoiceId) {
        self.audio.stop_voice(voice);
    }

    // --- Escape hatches ---

    /// Direct access to the renderer.
    pub fn renderer(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    /// Direct access to the mixer.
    pub fn audio(&self) -> &AudioSystem {
        &self.audio
    }

    /// Direct access to the mixer, mutably.
    pub fn audio_mut(&mut self) -> &mut AudioSystem {
        &mut self.audio
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.terminate();
    }
}

type PlatformProbe = (&'static str, fn(&Params) -> Option<Box<dyn PlatformDriver>>);

fn probe_headless(params: &Params) -> Option<Box<dyn PlatformDriver>> {
    Some(Box::new(HeadlessDriver::new(
        params.window_size.0,
        params.window_size.1,
    )))
}

/// Windowing drivers, most capable first. Real drivers (X11, Win32, ...)
/// are out-of-tree; in this tree the headless driver always accepts.
const PLATFORM_CANDIDATES: &[PlatformProbe] = &[("headless", probe_headless)];

fn select_platform(params: &Params) -> Result<Box<dyn PlatformDriver>> {
    for (name, probe) in PLATFORM_CANDIDATES {
        match probe(params) {
            Some(driver) => {
                tracing::info!(driver = name, "platform driver selected");
                return Ok(driver);
            }
            None => {
                tracing::debug!(driver = name, "platform probe rejected");
            }
        }
    }

    tracing::error!("no platform driver accepted");
    Err(Error::NoBackend("platform"))
}

type RenderProbe = (
    &'static str,
    fn(&dyn PlatformDriver) -> Option<Box<dyn RenderBackend>>,
);

fn probe_soft(driver: &dyn PlatformDriver) -> Option<Box<dyn RenderBackend>> {
    let (width, height) = driver.window_size();
    Some(Box::new(SoftBackend::new(
        width.max(1) as u32,
        height.max(1) as u32,
    )))
}

fn probe_null_render(_driver: &dyn PlatformDriver) -> Option<Box<dyn RenderBackend>> {
    Some(Box::new(NullRenderBackend::new()))
}

/// Graphics backends, most capable first. GL backends would precede these
/// and reject when the driver reports no usable context.
const RENDER_CANDIDATES: &[RenderProbe] =
    &[("soft", probe_soft), ("null", probe_null_render)];

fn select_renderer(driver: &dyn PlatformDriver) -> Result<Box<dyn RenderBackend>> {
    for (name, probe) in RENDER_CANDIDATES {
        match probe(driver) {
            Some(backend) => {
                tracing::info!(backend = name, "render backend selected");
                return Ok(backend);
            }
            None => {
                tracing::debug!(backend = name, "render probe rejected");
            }
        }
    }

    tracing::error!("no render backend accepted");
    Err(Error::NoBackend("graphics"))
}

type JoystickProbe = (&'static str, fn() -> Option<Box<dyn JoystickDriver>>);

fn probe_null_joystick() -> Option<Box<dyn JoystickDriver>> {
    Some(Box::new(NullJoystick::new()))
}

/// Joystick drivers, most capable first. Linux/Win32 drivers are
/// out-of-tree; null terminates the list and reports nothing connected.
const JOYSTICK_CANDIDATES: &[JoystickProbe] = &[("null", probe_null_joystick)];

fn select_joystick() -> Box<dyn JoystickDriver> {
    for (name, probe) in JOYSTICK_CANDIDATES {
        if let Some(driver) = probe() {
            tracing::info!(driver = name, "joystick driver selected");
            return driver;
        }

        tracing::debug!(driver = name, "joystick probe rejected");
    }

    Box::new(NullJoystick::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_selects_headless_and_soft() {
        let ctx = Context::new(Params::default()).unwrap();

        assert_eq!(ctx.window_size(), (1280, 720));
        assert!(ctx.is_window_active());
    }

    #[test]
    fn test_params_are_applied() {
        let ctx = Context::new(Params {
            title: "game".to_string(),
            window_size: (640, 360),
            canvas_size: Some((320, 180)),
            ..Params::default()
        })
        .unwrap();

        assert_eq!(ctx.window_title(), "game");
        assert_eq!(ctx.window_size(), (640, 360));
    }

    #[test]
    fn test_terminate_is_idempotent() {
        let mut ctx = Context::new(Params::default()).unwrap();

        ctx.terminate();
        ctx.terminate();
        // Drop runs it a third time.
    }
}
