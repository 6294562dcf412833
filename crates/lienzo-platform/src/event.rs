//! Window and input events, and the queue drivers push them through.

use crate::key::{Key, MouseButton};

/// A single event produced by a platform driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A key went down (or auto-repeated, which arrives as another press).
    KeyPressed {
        /// The key in question.
        key: Key,
    },
    /// A key went up.
    KeyReleased {
        /// The key in question.
        key: Key,
    },
    /// A mouse button went down.
    MouseButtonPressed {
        /// The button in question.
        button: MouseButton,
    },
    /// A mouse button went up.
    MouseButtonReleased {
        /// The button in question.
        button: MouseButton,
    },
    /// The cursor moved; coordinates are window pixels.
    MouseCursorMoved {
        /// Absolute cursor x.
        x: i32,
        /// Absolute cursor y.
        y: i32,
    },
    /// The wheel scrolled.
    MouseWheelScrolled {
        /// Horizontal scroll steps.
        dx: i32,
        /// Vertical scroll steps.
        dy: i32,
    },
    /// The window gained focus.
    Activated,
    /// The window lost focus. All held input is force-released.
    Deactivated,
    /// A touch point went down.
    TouchStarted {
        /// Touch slot, `0..MAX_TOUCH_POINTS`.
        index: usize,
        /// Window-pixel x.
        x: i32,
        /// Window-pixel y.
        y: i32,
    },
    /// A touch point lifted.
    TouchEnded {
        /// Touch slot.
        index: usize,
    },
    /// A touch point moved.
    TouchMoved {
        /// Touch slot.
        index: usize,
        /// Window-pixel x.
        x: i32,
        /// Window-pixel y.
        y: i32,
    },
    /// The window was resized.
    WindowResized {
        /// New width in pixels.
        width: i32,
        /// New height in pixels.
        height: i32,
    },
}

const INITIAL_QUEUE_CAPACITY: usize = 256;

/// FIFO event queue between the platform driver and the runtime.
///
/// Single producer (the driver, inside `pump_events`), single consumer (the
/// runtime's frame step) — by contract, not by type; everything runs on the
/// user thread. Enqueue never drops events; capacity starts at 256 and
/// doubles as needed.
#[derive(Debug)]
pub struct EventQueue {
    events: Vec<Event>,
}

impl EventQueue {
    /// Create an empty queue with the initial capacity pre-allocated.
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(INITIAL_QUEUE_CAPACITY),
        }
    }

    /// Append one event.
    pub fn push(&mut self, event: Event) {
        if self.events.len() == self.events.capacity() {
            tracing::debug!(
                from = self.events.capacity(),
                "growing event queue"
            );
        }

        self.events.push(event);
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove and return every queued event, in arrival order.
    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.events.drain(..)
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = EventQueue::new();
        queue.push(Event::Activated);
        queue.push(Event::KeyPressed { key: Key::A });
        queue.push(Event::Deactivated);

        let drained: Vec<Event> = queue.drain().collect();
        assert_eq!(
            drained,
            vec![
                Event::Activated,
                Event::KeyPressed { key: Key::A },
                Event::Deactivated,
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn test_growth_is_lossless() {
        let mut queue = EventQueue::new();

        for i in 0..10_000 {
            queue.push(Event::MouseCursorMoved { x: i, y: -i });
        }

        assert_eq!(queue.len(), 10_000);
        let last = queue.drain().last();
        assert_eq!(last, Some(Event::MouseCursorMoved { x: 9_999, y: -9_999 }));
    }
}
