//! Lienzo - a small 2D game framework
//!
//! Lienzo bundles windowing, input, timing, immediate-mode 2D graphics,
//! text layout and mixed sound/music playback behind one [`Context`]. An
//! application creates a context, then drives a per-frame loop:
//!
//! ```rust,ignore
//! use lienzo::{Color, Context, Params};
//!
//! let mut ctx = Context::new(Params {
//!     title: "hello".to_string(),
//!     canvas_size: Some((512, 512)),
//!     ..Params::default()
//! })?;
//!
//! let font = ctx.load_font("unispace.ttf", 16.0);
//! let music = ctx.open_music("dungeon.ogg");
//! ctx.loop_music(music);
//!
//! ctx.execute(|ctx| {
//!     ctx.clear(Color::rgb(0x18, 0x18, 0x18));
//!     ctx.draw_text(font, 16.0, 16.0, Color::WHITE, "HELLO");
//!     ctx.present();
//!     true
//! });
//! ```
//!
//! # Architecture
//!
//! Every subsystem sits behind a pluggable backend chosen at startup by
//! probing a candidate list:
//!
//! | Role | Trait | In-tree backends |
//! |---|---|---|
//! | Windowing | `PlatformDriver` | headless |
//! | Joystick | `JoystickDriver` | null |
//! | Graphics | `RenderBackend` | soft (CPU rasterizer), null |
//! | Audio | `AudioBackend` | cpal (feature), null, mock (tests) |
//!
//! Probe failures move on to the next candidate. Running out of audio
//! candidates is impossible (null always accepts); running out of platform
//! or graphics candidates fails [`Context::new`] with
//! [`Error::NoBackend`]. Concrete X11/Win32 drivers and OpenGL backends
//! implement the same traits out of tree and can be injected through
//! [`Context::with_backends`].
//!
//! # Handles
//!
//! Every resource (sound, music, texture, surface, font) is addressed by a
//! generation-stamped `Handle`. Creation returns `None` on failure; every
//! sink function tolerates stale handles as silent no-ops. There is no
//! other error channel on the hot path — logging is the operational
//! signal.

mod context;

pub use context::{Context, Params};

// The public vocabulary, re-exported from the subsystem crates.
pub use lienzo_core::{Color, Handle};
pub use lienzo_audio::{
    AudioBackend, Music, Sound, VoiceId, VoiceState, VoiceType,
};
pub use lienzo_platform::{
    DateTime, Event, HeadlessDriver, JoystickDriver, Key, KeyState, MouseButton, PlatformDriver,
    WindowFlags, MAX_TOUCH_POINTS,
};
pub use lienzo_render::{
    BlendEquation, BlendFactor, BlendMode, Font, Image, RenderBackend, Surface, Texture,
};

/// Error types for context construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every candidate for a mandatory backend role was rejected.
    #[error("no usable {0} backend")]
    NoBackend(&'static str),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, Error>;
