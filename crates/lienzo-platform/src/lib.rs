//! Lienzo Platform - windowing, input and timing abstraction
//!
//! This crate defines the seam between the lienzo runtime and the host
//! platform, plus everything that sits directly on top of it:
//!
//! # Core Abstractions
//!
//! ## Drivers
//!
//! - [`PlatformDriver`] - Object-safe trait a windowing backend implements
//!   (event pump, buffer swap, window title/size)
//! - [`JoystickDriver`] - Object-safe trait for joystick polling
//! - [`HeadlessDriver`] - In-tree driver with a scriptable event source;
//!   serves tests and windowless hosts
//! - [`NullJoystick`] - Joystick driver that reports nothing connected
//!
//! Concrete X11/Win32/Android drivers live outside this workspace and plug
//! in through the same traits.
//!
//! ## Events and Input
//!
//! - [`Event`] - Tagged window/input event produced by a driver
//! - [`EventQueue`] - Growable FIFO between driver and runtime
//! - [`Input`] - Per-frame input state machine (keyboard, mouse, touch)
//!   with press/repeat/release callback dispatch
//!
//! ## Timing
//!
//! - [`Clock`] - Medium and high precision monotonic time since startup
//! - [`DateTime`] - Wall-clock calendar snapshot
//!
//! # Frame protocol
//!
//! Once per frame the runtime calls [`Input::begin_frame`], then the
//! driver's `pump_events` to fill the [`EventQueue`], feeds every event from
//! [`EventQueue::drain`] through [`Input::handle_event`], and closes with
//! [`Input::end_frame`] to fire the once-per-frame motion and wheel
//! callbacks. Everything here is single-threaded by contract.

pub mod clock;
pub mod driver;
pub mod event;
pub mod input;
pub mod key;

pub use clock::{Clock, DateTime};
pub use driver::{
    HeadlessDriver, JoystickDriver, NullJoystick, PlatformDriver, WindowFlags,
};
pub use event::{Event, EventQueue};
pub use input::Input;
pub use key::{Key, KeyState, MouseButton, MAX_TOUCH_POINTS};
