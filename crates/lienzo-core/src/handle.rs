//! Generation-stamped handles and the slot table behind them.
//!
//! Every resource kind in lienzo (sounds, music tracks, textures, surfaces,
//! fonts) is stored in a [`HandleList`] and referenced by a [`Handle`]. The
//! handle is a tagged 32-bit value:
//!
//! ```text
//! bit 31      : unused, always 0
//! bits 24..31 : generation (7 bits)
//! bits 18..24 : tag sentinel, always 0b111111
//! bits  0..18 : slot index
//! ```
//!
//! The tag bits guarantee that no valid handle ever encodes to `0` (or to a
//! small integer someone passes by accident). The generation is bumped every
//! time a slot is freed, so a stale handle to a reused slot resolves to
//! `None` instead of the new occupant.
//!
//! The generation counter is 7 bits wide: freeing and reusing the *same* slot
//! 128 times wraps it around, at which point a sufficiently ancient handle
//! would collide with a fresh one. This is accepted; resource churn of that
//! shape does not occur in practice and the failure mode is a lookup hitting
//! the wrong live resource, never memory unsafety.

use std::marker::PhantomData;

const INDEX_BITS: u32 = 18;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const TAG_MASK: u32 = 0x3F << INDEX_BITS;
const GEN_SHIFT: u32 = 24;
const GEN_MASK: u32 = 0x7F;

/// Hard cap on slot count implied by the 18-bit index field.
const MAX_SLOTS: usize = 1 << INDEX_BITS;

/// Initial slot capacity of a fresh list.
const INITIAL_CAPACITY: usize = 16;

/// A typed, generation-stamped identifier into a [`HandleList`].
///
/// Handles are non-owning: dropping one frees nothing, copying one is free.
/// The type parameter only exists to keep handles of different resource
/// kinds apart at compile time; a `Handle<Sound>` and a `Handle<Font>` may
/// share the same numeric value without ambiguity because they index
/// different tables.
pub struct Handle<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Reconstruct a handle from its raw 32-bit value.
    ///
    /// Returns `None` if the value cannot be a handle at all (missing tag
    /// bits). A well-formed but stale raw value still produces a `Handle`;
    /// staleness is only detected at lookup time.
    pub fn from_raw(raw: u32) -> Option<Self> {
        if raw & TAG_MASK != TAG_MASK {
            return None;
        }

        Some(Self {
            raw,
            _marker: PhantomData,
        })
    }

    /// The raw 32-bit value. Never `0` for a constructed handle.
    pub fn raw(self) -> u32 {
        self.raw
    }

    fn encode(index: usize, r#gen: u8) -> Self {
        let raw = ((u32::from(r#gen) & GEN_MASK) << GEN_SHIFT) | TAG_MASK | (index as u32 & INDEX_MASK);

        Self {
            raw,
            _marker: PhantomData,
        }
    }

    fn index(self) -> usize {
        (self.raw & INDEX_MASK) as usize
    }

    fn generation(self) -> u8 {
        ((self.raw >> GEN_SHIFT) & GEN_MASK) as u8
    }
}

// Manual impls: `T` itself is never stored, so the usual derive bounds on
// `T` would be too strict.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({:#010x})", self.raw)
    }
}

struct Slot<T> {
    r#gen: u8,
    value: Option<T>,
}

/// A grow-only slot table addressed by generation-stamped handles.
///
/// Slots are reused: removing an element frees its slot and bumps the slot
/// generation, so the next element added may land in the same index under a
/// new generation. A just-freed index is remembered and handed out in O(1);
/// otherwise allocation scans for the first free slot.
///
/// Capacity starts at 16 slots and doubles whenever the table is full.
/// Dropping the list drops every live element.
pub struct HandleList<T> {
    slots: Vec<Slot<T>>,
    len: usize,
    last_free: Option<usize>,
}

impl<T> HandleList<T> {
    /// Create an empty list. No allocation happens until the first `add`.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
            last_free: None,
        }
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list holds no live elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total slot count, live or free. Grows, never shrinks.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Insert an element and return its handle.
    ///
    /// Returns `None` only when the 18-bit index space is exhausted, which
    /// means 262144 live elements of one resource kind.
    pub fn add(&mut self, value: T) -> Option<Handle<T>> {
        if self.len == self.slots.len() && !self.grow() {
            tracing::error!(len = self.len, "handle list index space exhausted");
            return None;
        }

        let index = self.find_free_index()?;
        let slot = &mut self.slots[index];

        slot.value = Some(value);
        self.len += 1;

        Some(Handle::encode(index, slot.r#gen))
    }

    /// Remove the element addressed by `handle`, returning it.
    ///
    /// A stale or foreign handle removes nothing. The freed slot's
    /// generation advances so the handle can never resolve again.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let index = self.check(handle)?;
        let slot = &mut self.slots[index];

        let value = slot.value.take()?;

        slot.r#gen = (slot.r#gen + 1) & GEN_MASK as u8;
        self.len -= 1;
        self.last_free = Some(index);

        Some(value)
    }

    /// Resolve a handle to a shared reference, or `None` if stale.
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let index = self.check(handle)?;
        self.slots[index].value.as_ref()
    }

    /// Resolve a handle to an exclusive reference, or `None` if stale.
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let index = self.check(handle)?;
        self.slots[index].value.as_mut()
    }

    /// Iterate over live elements in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::encode(index, slot.r#gen), value))
        })
    }

    /// Iterate over live elements in slot order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let r#gen = slot.r#gen;
                slot.value
                    .as_mut()
                    .map(move |value| (Handle::encode(index, r#gen), value))
            })
    }

    /// Validate tag, index range and generation; return the slot index.
    fn check(&self, handle: Handle<T>) -> Option<usize> {
        let index = handle.index();

        if index >= self.slots.len() {
            return None;
        }

        if self.slots[index].r#gen != handle.generation() {
            return None;
        }

        Some(index)
    }

    fn find_free_index(&mut self) -> Option<usize> {
        if let Some(index) = self.last_free.take() {
            if self.slots[index].value.is_none() {
                return Some(index);
            }
        }

        self.slots.iter().position(|slot| slot.value.is_none())
    }

    fn grow(&mut self) -> bool {
        let current = self.slots.len();

        if current >= MAX_SLOTS {
            return false;
        }

        let next = if current == 0 {
            INITIAL_CAPACITY
        } else {
            (current * 2).min(MAX_SLOTS)
        };

        tracing::debug!(from = current, to = next, "growing handle list");

        self.slots
            .resize_with(next, || Slot { r#gen: 0, value: None });

        true
    }
}

impl<T> Default for HandleList<T> {
    fn default() -> Self {
        Self::new()
    }
}
