//! Per-frame input state derivation.
//!
//! Raw driver events go through [`Input::handle_event`]; the runtime wraps a
//! frame with [`Input::begin_frame`] / [`Input::end_frame`]. Out the other
//! side comes the per-frame snapshot the public API reads (key states, mouse
//! bitmask, cursor position, touch table) plus edge-triggered callbacks:
//!
//! - `on_key_pressed` fires once per idle→pressed edge
//! - `on_key_repeated` fires for every further press while already pressed
//! - `on_key_released` fires once per pressed→released edge
//! - mouse button callbacks fire only on bitmask transitions
//! - cursor motion and wheel callbacks fire at most once per frame, with the
//!   accumulated delta
//!
//! Losing window focus force-releases everything that is held, with the same
//! callbacks an ordinary release would fire, so the application never
//! observes a phantom held key after alt-tab.

use crate::event::Event;
use crate::key::{Key, KeyState, MouseButton, MAX_TOUCH_POINTS};

/// Callback taking the affected key.
pub type KeyCallback = Box<dyn FnMut(Key)>;

/// Callback taking the affected mouse button.
pub type MouseButtonCallback = Box<dyn FnMut(MouseButton)>;

/// Callback taking an `(x, y)` pair (position delta or wheel steps).
pub type MotionCallback = Box<dyn FnMut(i32, i32)>;

/// Keyboard, mouse and touch state machine.
pub struct Input {
    window_active: bool,

    keys: [KeyState; Key::COUNT],
    mouse_buttons: u8,
    cursor_position: (i32, i32),
    cursor_delta: (i32, i32),
    wheel_delta: (i32, i32),

    touch_pressed: [bool; MAX_TOUCH_POINTS],
    touch_position: [(i32, i32); MAX_TOUCH_POINTS],
    touch_delta: [(i32, i32); MAX_TOUCH_POINTS],

    on_key_pressed: Option<KeyCallback>,
    on_key_repeated: Option<KeyCallback>,
    on_key_released: Option<KeyCallback>,
    on_mouse_button_pressed: Option<MouseButtonCallback>,
    on_mouse_button_released: Option<MouseButtonCallback>,
    on_mouse_cursor_moved: Option<MotionCallback>,
    on_mouse_wheel_scrolled: Option<MotionCallback>,
}

impl Input {
    /// Fresh state: window active, nothing pressed.
    pub fn new() -> Self {
        Self {
            window_active: true,
            keys: [KeyState::Idle; Key::COUNT],
            mouse_buttons: 0,
            cursor_position: (0, 0),
            cursor_delta: (0, 0),
            wheel_delta: (0, 0),
            touch_pressed: [false; MAX_TOUCH_POINTS],
            touch_position: [(0, 0); MAX_TOUCH_POINTS],
            touch_delta: [(0, 0); MAX_TOUCH_POINTS],
            on_key_pressed: None,
            on_key_repeated: None,
            on_key_released: None,
            on_mouse_button_pressed: None,
            on_mouse_button_released: None,
            on_mouse_cursor_moved: None,
            on_mouse_wheel_scrolled: None,
        }
    }

    /// Start a new frame: one-frame `Released` states decay to `Idle`, and
    /// the per-frame deltas reset.
    pub fn begin_frame(&mut self) {
        for state in &mut self.keys {
            if *state == KeyState::Released {
                *state = KeyState::Idle;
            }
        }

        self.cursor_delta = (0, 0);
        self.wheel_delta = (0, 0);
    }

    /// Feed one event into the state machine.
    ///
    /// Events that are not input-related (window resize) are ignored here;
    /// the runtime routes those elsewhere.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::KeyPressed { key } => self.key_press(key),
            Event::KeyReleased { key } => self.key_release(key),
            Event::MouseButtonPressed { button } => self.button_press(button),
            Event::MouseButtonReleased { button } => self.button_release(button),
            Event::MouseCursorMoved { x, y } => {
                let (ox, oy) = self.cursor_position;
                self.cursor_position = (x, y);
                self.cursor_delta.0 += x - ox;
                self.cursor_delta.1 += y - oy;
            }
            Event::MouseWheelScrolled { dx, dy } => {
                self.wheel_delta.0 += dx;
                self.wheel_delta.1 += dy;
            }
            Event::Activated => self.set_window_active(true),
            Event::Deactivated => self.set_window_active(false),
            Event::TouchStarted { index, x, y } => {
                if index < MAX_TOUCH_POINTS {
                    self.touch_pressed[index] = true;
                    self.touch_position[index] = (x, y);
                    self.touch_delta[index] = (0, 0);
                }
            }
            Event::TouchEnded { index } => {
                if index < MAX_TOUCH_POINTS {
                    self.touch_pressed[index] = false;
                }
            }
            Event::TouchMoved { index, x, y } => {
                if index < MAX_TOUCH_POINTS {
                    let (ox, oy) = self.touch_position[index];
                    self.touch_position[index] = (x, y);
                    self.touch_delta[index] = (x - ox, y - oy);
                }
            }
            Event::WindowResized { .. } => {}
        }
    }

    /// Finish the frame: fire the once-per-frame motion and wheel callbacks
    /// if their accumulated deltas are non-zero.
    pub fn end_frame(&mut self) {
        if self.cursor_delta != (0, 0) {
            if let Some(callback) = &mut self.on_mouse_cursor_moved {
                callback(self.cursor_delta.0, self.cursor_delta.1);
            }
        }

        if self.wheel_delta != (0, 0) {
            if let Some(callback) = &mut self.on_mouse_wheel_scrolled {
                callback(self.wheel_delta.0, self.wheel_delta.1);
            }
        }
    }

    fn key_press(&mut self, key: Key) {
        match self.keys[key.index()] {
            KeyState::Idle => {
                self.keys[key.index()] = KeyState::Pressed;

                if let Some(callback) = &mut self.on_key_pressed {
                    callback(key);
                }
            }
            KeyState::Pressed => {
                if let Some(callback) = &mut self.on_key_repeated {
                    callback(key);
                }
            }
            KeyState::Released => {}
        }
    }

    fn key_release(&mut self, key: Key) {
        if self.keys[key.index()] == KeyState::Pressed {
            self.keys[key.index()] = KeyState::Released;

            if let Some(callback) = &mut self.on_key_released {
                callback(key);
            }
        }
    }

    fn button_press(&mut self, button: MouseButton) {
        if self.mouse_buttons & button.mask() == 0 {
            self.mouse_buttons |= button.mask();

            if let Some(callback) = &mut self.on_mouse_button_pressed {
                callback(button);
            }
        }
    }

    fn button_release(&mut self, button: MouseButton) {
        if self.mouse_buttons & button.mask() != 0 {
            self.mouse_buttons &= !button.mask();

            if let Some(callback) = &mut self.on_mouse_button_released {
                callback(button);
            }
        }
    }

    /// Force-release every held key (in key order) and mouse button (in
    /// index order) through the regular release callbacks.
    fn release_all(&mut self) {
        for key in Key::all() {
            self.key_release(key);
        }

        for button in MouseButton::all() {
            self.button_release(button);
        }
    }

    fn set_window_active(&mut self, active: bool) {
        if self.window_active == active {
            return;
        }

        if !active {
            self.release_all();
        }

        self.window_active = active;
    }

    // --- Snapshot accessors ---

    /// Whether the window currently has focus.
    pub fn is_window_active(&self) -> bool {
        self.window_active
    }

    /// The full keyboard state table.
    pub fn keyboard_state(&self) -> &[KeyState; Key::COUNT] {
        &self.keys
    }

    /// State of one key.
    pub fn key_state(&self, key: Key) -> KeyState {
        self.keys[key.index()]
    }

    /// Whether a key is currently held.
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys[key.index()] == KeyState::Pressed
    }

    /// Mouse button bitmask (bit 0 = left, 1 = right, 2 = middle).
    pub fn mouse_button_state(&self) -> u8 {
        self.mouse_buttons
    }

    /// Whether a mouse button is currently held.
    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons & button.mask() != 0
    }

    /// Cursor position in window pixels (the runtime converts to canvas
    /// coordinates before exposing it).
    pub fn cursor_position(&self) -> (i32, i32) {
        self.cursor_position
    }

    /// Accumulated cursor delta of the current frame, window pixels.
    pub fn cursor_delta(&self) -> (i32, i32) {
        self.cursor_delta
    }

    /// Accumulated wheel delta of the current frame.
    pub fn wheel_delta(&self) -> (i32, i32) {
        self.wheel_delta
    }

    /// Whether a touch point is down. Out-of-range indices read as not
    /// pressed.
    pub fn is_touch_pressed(&self, index: usize) -> bool {
        index < MAX_TOUCH_POINTS && self.touch_pressed[index]
    }

    /// Position of a touch point, if it is down.
    pub fn touch_position(&self, index: usize) -> Option<(i32, i32)> {
        if self.is_touch_pressed(index) {
            Some(self.touch_position[index])
        } else {
            None
        }
    }

    /// Movement of a touch point during this frame, if it is down.
    pub fn touch_delta(&self, index: usize) -> Option<(i32, i32)> {
        if self.is_touch_pressed(index) {
            Some(self.touch_delta[index])
        } else {
            None
        }
    }

    // --- Callback registration ---

    /// Install the idle→pressed callback.
    pub fn on_key_pressed(&mut self, callback: KeyCallback) {
        self.on_key_pressed = Some(callback);
    }

    /// Install the auto-repeat callback.
    pub fn on_key_repeated(&mut self, callback: KeyCallback) {
        self.on_key_repeated = Some(callback);
    }

    /// Install the pressed→released callback.
    pub fn on_key_released(&mut self, callback: KeyCallback) {
        self.on_key_released = Some(callback);
    }

    /// Install the mouse button press callback.
    pub fn on_mouse_button_pressed(&mut self, callback: MouseButtonCallback) {
        self.on_mouse_button_pressed = Some(callback);
    }

    /// Install the mouse button release callback.
    pub fn on_mouse_button_released(&mut self, callback: MouseButtonCallback) {
        self.on_mouse_button_released = Some(callback);
    }

    /// Install the once-per-frame cursor motion callback.
    pub fn on_mouse_cursor_moved(&mut self, callback: MotionCallback) {
        self.on_mouse_cursor_moved = Some(callback);
    }

    /// Install the once-per-frame wheel callback.
    pub fn on_mouse_wheel_scrolled(&mut self, callback: MotionCallback) {
        self.on_mouse_wheel_scrolled = Some(callback);
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn run_frame(input: &mut Input, events: &[Event]) {
        input.begin_frame();
        for event in events {
            input.handle_event(*event);
        }
        input.end_frame();
    }

    #[test]
    fn test_press_hold_release_cycle() {
        let mut input = Input::new();

        run_frame(&mut input, &[Event::KeyPressed { key: Key::W }]);
        assert_eq!(input.key_state(Key::W), KeyState::Pressed);
        assert!(input.is_key_pressed(Key::W));

        // Held across frames with no further events.
        run_frame(&mut input, &[]);
        assert_eq!(input.key_state(Key::W), KeyState::Pressed);

        run_frame(&mut input, &[Event::KeyReleased { key: Key::W }]);
        assert_eq!(input.key_state(Key::W), KeyState::Released);

        // Released decays to idle at the start of the next frame.
        run_frame(&mut input, &[]);
        assert_eq!(input.key_state(Key::W), KeyState::Idle);
    }

    #[test]
    fn test_key_callback_edges() {
        let mut input = Input::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        input.on_key_pressed(Box::new(move |k| l.borrow_mut().push(("press", k))));
        let l = log.clone();
        input.on_key_repeated(Box::new(move |k| l.borrow_mut().push(("repeat", k))));
        let l = log.clone();
        input.on_key_released(Box::new(move |k| l.borrow_mut().push(("release", k))));

        run_frame(
            &mut input,
            &[
                Event::KeyPressed { key: Key::A },
                Event::KeyPressed { key: Key::A },
                Event::KeyPressed { key: Key::A },
                Event::KeyReleased { key: Key::A },
                // Release of an idle key: no callback.
                Event::KeyReleased { key: Key::B },
            ],
        );

        assert_eq!(
            *log.borrow(),
            vec![
                ("press", Key::A),
                ("repeat", Key::A),
                ("repeat", Key::A),
                ("release", Key::A),
            ]
        );
    }

    #[test]
    fn test_mouse_button_edge_triggering() {
        let mut input = Input::new();
        let presses = Rc::new(RefCell::new(0));
        let releases = Rc::new(RefCell::new(0));

        let p = presses.clone();
        input.on_mouse_button_pressed(Box::new(move |_| *p.borrow_mut() += 1));
        let r = releases.clone();
        input.on_mouse_button_released(Box::new(move |_| *r.borrow_mut() += 1));

        run_frame(
            &mut input,
            &[
                Event::MouseButtonPressed { button: MouseButton::Left },
                // Duplicate press: no edge, no callback.
                Event::MouseButtonPressed { button: MouseButton::Left },
                Event::MouseButtonReleased { button: MouseButton::Left },
                Event::MouseButtonReleased { button: MouseButton::Left },
            ],
        );

        assert_eq!(*presses.borrow(), 1);
        assert_eq!(*releases.borrow(), 1);
        assert_eq!(input.mouse_button_state(), 0);
    }

    #[test]
    fn test_cursor_delta_accumulates_within_frame() {
        let mut input = Input::new();
        let deltas = Rc::new(RefCell::new(Vec::new()));

        let d = deltas.clone();
        input.on_mouse_cursor_moved(Box::new(move |x, y| d.borrow_mut().push((x, y))));

        run_frame(
            &mut input,
            &[
                Event::MouseCursorMoved { x: 10, y: 5 },
                Event::MouseCursorMoved { x: 15, y: 25 },
            ],
        );

        // One callback with the summed delta, not one per motion event.
        assert_eq!(*deltas.borrow(), vec![(15, 25)]);
        assert_eq!(input.cursor_position(), (15, 25));

        // Quiet frame: no callback.
        run_frame(&mut input, &[]);
        assert_eq!(deltas.borrow().len(), 1);
    }

    #[test]
    fn test_wheel_delta_accumulates() {
        let mut input = Input::new();
        let scrolls = Rc::new(RefCell::new(Vec::new()));

        let s = scrolls.clone();
        input.on_mouse_wheel_scrolled(Box::new(move |x, y| s.borrow_mut().push((x, y))));

        run_frame(
            &mut input,
            &[
                Event::MouseWheelScrolled { dx: 0, dy: 1 },
                Event::MouseWheelScrolled { dx: 0, dy: 1 },
                Event::MouseWheelScrolled { dx: -1, dy: 0 },
            ],
        );

        assert_eq!(*scrolls.borrow(), vec![(-1, 2)]);
    }

    #[test]
    fn test_focus_loss_purges_held_input_in_order() {
        let mut input = Input::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        input.on_key_released(Box::new(move |k| l.borrow_mut().push(format!("{k:?}"))));
        let l = log.clone();
        input.on_mouse_button_released(Box::new(move |b| l.borrow_mut().push(format!("{b:?}"))));

        run_frame(
            &mut input,
            &[
                Event::KeyPressed { key: Key::S },
                Event::KeyPressed { key: Key::A },
                Event::KeyPressed { key: Key::W },
                Event::MouseButtonPressed { button: MouseButton::Right },
                Event::MouseButtonPressed { button: MouseButton::Left },
            ],
        );
        assert!(log.borrow().is_empty());

        run_frame(&mut input, &[Event::Deactivated]);

        // Keys purge in key order (A < S < W), then buttons in index order.
        assert_eq!(
            *log.borrow(),
            vec!["A", "S", "W", "Left", "Right"]
        );
        assert!(!input.is_window_active());
        assert_eq!(input.mouse_button_state(), 0);

        for key in [Key::A, Key::S, Key::W] {
            assert_ne!(input.key_state(key), KeyState::Pressed);
        }

        run_frame(&mut input, &[Event::Activated]);
        assert!(input.is_window_active());
        // Reactivation releases nothing extra.
        assert_eq!(log.borrow().len(), 5);
    }

    #[test]
    fn test_touch_tracking() {
        let mut input = Input::new();

        run_frame(&mut input, &[Event::TouchStarted { index: 2, x: 100, y: 50 }]);
        assert!(input.is_touch_pressed(2));
        assert_eq!(input.touch_position(2), Some((100, 50)));
        assert_eq!(input.touch_delta(2), Some((0, 0)));

        run_frame(&mut input, &[Event::TouchMoved { index: 2, x: 110, y: 45 }]);
        assert_eq!(input.touch_position(2), Some((110, 45)));
        assert_eq!(input.touch_delta(2), Some((10, -5)));

        run_frame(&mut input, &[Event::TouchEnded { index: 2 }]);
        assert!(!input.is_touch_pressed(2));
        assert_eq!(input.touch_position(2), None);

        // Out-of-range indices are inert.
        run_frame(&mut input, &[Event::TouchStarted { index: 99, x: 0, y: 0 }]);
        assert!(!input.is_touch_pressed(99));
    }
}
