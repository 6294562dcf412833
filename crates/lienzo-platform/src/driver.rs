//! Driver traits and the in-tree headless implementations.
//!
//! A platform driver owns the window (or whatever stands in for one) and
//! feeds raw events into the runtime's queue once per frame. A joystick
//! driver is polled separately. Both traits are object-safe so the runtime
//! can pick an implementation at startup from a candidate list.

use crate::event::{Event, EventQueue};

/// Window creation hints.
///
/// Drivers that cannot honor a hint ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowFlags {
    /// Let the user resize the window.
    pub resizable: bool,
    /// Start fullscreen.
    pub fullscreen: bool,
}

/// A windowing backend.
///
/// Implementations pump native events into the shared [`EventQueue`], own
/// the GL context (if any) and perform the buffer swap. The runtime probes
/// candidates in order and keeps the first that constructs successfully.
pub trait PlatformDriver {
    /// Driver name for logs ("x11", "win32", "headless", ...).
    fn name(&self) -> &str;

    /// Translate pending native events into the queue. Returns `false` when
    /// the platform asked to close the window.
    fn pump_events(&mut self, queue: &mut EventQueue) -> bool;

    /// Present the back buffer. May block on vsync.
    fn swap_buffers(&mut self);

    /// Current window title.
    fn window_title(&self) -> &str;

    /// Set the window title.
    fn set_window_title(&mut self, title: &str);

    /// Current window size in pixels.
    fn window_size(&self) -> (i32, i32);

    /// Request a window size in pixels.
    fn set_window_size(&mut self, width: i32, height: i32);

    /// Apply window hints. Default: ignored.
    fn set_window_flags(&mut self, _flags: WindowFlags) {}

    /// Identity string of the graphics context ("OpenGL 3.3", "none", ...).
    /// Render backends use this to decide whether they can run.
    fn graphics_context_name(&self) -> &str;

    /// Number of samples the default framebuffer was created with.
    fn multisample_samples(&self) -> u32 {
        1
    }
}

/// A joystick backend, polled once per frame.
pub trait JoystickDriver {
    /// Driver name for logs.
    fn name(&self) -> &str;

    /// Refresh device state. Called from `process()` each frame.
    fn poll(&mut self);

    /// Whether a joystick is plugged in at `index`.
    fn is_connected(&self, index: usize) -> bool;

    /// Device name, if connected.
    fn joystick_name(&self, index: usize) -> Option<&str>;

    /// Number of buttons on the device, 0 if absent.
    fn button_count(&self, index: usize) -> usize;

    /// Number of axes on the device, 0 if absent.
    fn axis_count(&self, index: usize) -> usize;

    /// Name of one button, if the device and button exist.
    fn button_name(&self, index: usize, button: usize) -> Option<&str>;

    /// Name of one axis, if the device and axis exist.
    fn axis_name(&self, index: usize, axis: usize) -> Option<&str>;

    /// Whether a button is held. Absent devices read as not pressed.
    fn is_button_pressed(&self, index: usize, button: usize) -> bool;

    /// Axis position in `-1.0..=1.0`. Absent devices read as `0.0`.
    fn axis_value(&self, index: usize, axis: usize) -> f32;
}

/// Driver with no native window: events are injected programmatically.
///
/// This is the driver tests run against, and what a server-side host gets
/// when no real windowing system is compiled in. `pump_events` hands over
/// whatever was [`inject`](HeadlessDriver::inject)ed since the last frame.
pub struct HeadlessDriver {
    title: String,
    size: (i32, i32),
    flags: WindowFlags,
    pending: Vec<Event>,
    close_requested: bool,
    swap_count: u64,
}

impl HeadlessDriver {
    /// Create a headless "window" of the given size.
    pub fn new(width: i32, height: i32) -> Self {
        tracing::info!(width, height, "headless driver initialized");

        Self {
            title: String::new(),
            size: (width, height),
            flags: WindowFlags::default(),
            pending: Vec::new(),
            close_requested: false,
            swap_count: 0,
        }
    }

    /// Queue an event for the next `pump_events`.
    pub fn inject(&mut self, event: Event) {
        self.pending.push(event);
    }

    /// Make the next `pump_events` report a close request.
    pub fn request_close(&mut self) {
        self.close_requested = true;
    }

    /// How many times `swap_buffers` has been called.
    pub fn swap_count(&self) -> u64 {
        self.swap_count
    }

    /// The last applied window flags.
    pub fn window_flags(&self) -> WindowFlags {
        self.flags
    }
}

impl PlatformDriver for HeadlessDriver {
    fn name(&self) -> &str {
        "headless"
    }

    fn pump_events(&mut self, queue: &mut EventQueue) -> bool {
        for event in self.pending.drain(..) {
            queue.push(event);
        }

        !self.close_requested
    }

    fn swap_buffers(&mut self) {
        self.swap_count += 1;
    }

    fn window_title(&self) -> &str {
        &self.title
    }

    fn set_window_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    fn window_size(&self) -> (i32, i32) {
        self.size
    }

    fn set_window_size(&mut self, width: i32, height: i32) {
        self.size = (width, height);
    }

    fn set_window_flags(&mut self, flags: WindowFlags) {
        self.flags = flags;
    }

    fn graphics_context_name(&self) -> &str {
        "none"
    }
}

/// Joystick driver that reports no devices. The last candidate in the probe
/// list, so joystick queries always have something to answer them.
#[derive(Debug, Default)]
pub struct NullJoystick;

impl NullJoystick {
    /// Create the driver.
    pub fn new() -> Self {
        Self
    }
}

impl JoystickDriver for NullJoystick {
    fn name(&self) -> &str {
        "null"
    }

    fn poll(&mut self) {}

    fn is_connected(&self, _index: usize) -> bool {
        false
    }

    fn joystick_name(&self, _index: usize) -> Option<&str> {
        None
    }

    fn button_count(&self, _index: usize) -> usize {
        0
    }

    fn axis_count(&self, _index: usize) -> usize {
        0
    }

    fn button_name(&self, _index: usize, _button: usize) -> Option<&str> {
        None
    }

    fn axis_name(&self, _index: usize, _axis: usize) -> Option<&str> {
        None
    }

    fn is_button_pressed(&self, _index: usize, _button: usize) -> bool {
        false
    }

    fn axis_value(&self, _index: usize, _axis: usize) -> f32 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    #[test]
    fn test_headless_pump_hands_over_injected_events() {
        let mut driver = HeadlessDriver::new(640, 480);
        let mut queue = EventQueue::new();

        driver.inject(Event::KeyPressed { key: Key::Space });
        driver.inject(Event::KeyReleased { key: Key::Space });

        assert!(driver.pump_events(&mut queue));
        assert_eq!(queue.len(), 2);

        // Events are handed over once.
        let mut queue2 = EventQueue::new();
        assert!(driver.pump_events(&mut queue2));
        assert!(queue2.is_empty());
    }

    #[test]
    fn test_headless_close_request() {
        let mut driver = HeadlessDriver::new(640, 480);
        let mut queue = EventQueue::new();

        assert!(driver.pump_events(&mut queue));
        driver.request_close();
        assert!(!driver.pump_events(&mut queue));
    }

    #[test]
    fn test_headless_window_properties() {
        let mut driver = HeadlessDriver::new(640, 480);

        assert_eq!(driver.window_size(), (640, 480));
        driver.set_window_size(1280, 720);
        assert_eq!(driver.window_size(), (1280, 720));

        driver.set_window_title("game");
        assert_eq!(driver.window_title(), "game");

        driver.set_window_flags(WindowFlags { resizable: true, fullscreen: false });
        assert!(driver.window_flags().resizable);
    }

    #[test]
    fn test_null_joystick_reads_as_absent() {
        let joystick = NullJoystick::new();

        assert!(!joystick.is_connected(0));
        assert_eq!(joystick.button_count(0), 0);
        assert!(!joystick.is_button_pressed(0, 0));
        assert_eq!(joystick.axis_value(0, 0), 0.0);
    }
}
