//! Lienzo Core - shared primitives for the lienzo framework
//!
//! This crate provides the building blocks every other lienzo crate relies on:
//!
//! # Core Abstractions
//!
//! ## Handles
//!
//! - [`Handle`] - Typed, generation-stamped 32-bit resource identifier
//! - [`HandleList`] - Slot table behind every resource kind (sounds, music,
//!   textures, surfaces, fonts)
//!
//! Handles are plain `Copy` values; they never own the resource they point
//! to. A handle whose slot has been freed (and possibly reused) is detected
//! by its generation stamp and simply resolves to nothing.
//!
//! ## Color
//!
//! - [`Color`] - RGBA8 color with const constructors and float conversion
//!   for render backends
//!
//! # Example
//!
//! ```
//! use lienzo_core::HandleList;
//!
//! let mut textures: HandleList<String> = HandleList::new();
//! let id = textures.add("bricks.png".to_string()).unwrap();
//!
//! assert_eq!(textures.get(id).map(String::as_str), Some("bricks.png"));
//!
//! textures.remove(id);
//! assert!(textures.get(id).is_none());
//! ```

pub mod color;
pub mod handle;

pub use color::Color;
pub use handle::{Handle, HandleList};
