//! Pluggable audio backend abstraction.
//!
//! This module defines the [`AudioBackend`] trait, which decouples the mixer
//! from any specific platform audio API. The default implementation wraps
//! cpal (feature `"cpal-backend"`), but the trait is designed so that
//! alternative backends can be swapped in:
//!
//! - **Desktop**: cpal (ALSA, CoreAudio, WASAPI) — the default
//! - **Android**: OpenSL ES / AAudio
//! - **Nothing at all**: [`NullBackend`](crate::NullBackend), the guaranteed
//!   fallback
//! - **Testing**: deterministic mock backend for CI (feature `"mock-audio"`)
//!
//! A backend exposes *sources*: streaming endpoints with a FIFO of PCM
//! buffers and play/pause control. The mixer queues int16 samples; the
//! backend consumes them at its own pace and reports how many buffers
//! remain queued, which is what throttles the music streaming thread.
//!
//! ## Object Safety
//!
//! The trait is object-safe and `Send + Sync`: the mixer shares one backend
//! instance (behind `Arc`) between the user thread and every music worker
//! thread. Implementations guard their own state internally.

use std::sync::Arc;

use crate::Result;

/// Identifier of a backend source. Meaningful only to the backend that
/// issued it; operations on a destroyed or foreign id are silent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub(crate) u64);

impl SourceId {
    /// Wrap a raw backend id. Out-of-tree backend implementations use this
    /// to mint their own ids.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value, for logs.
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Format of a source's sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceParams {
    /// Interleaved channel count (1 or 2).
    pub channels: u16,
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Whether the backend should restart queued buffers from the top when
    /// they run out. Used by looping sounds; music loops in the streaming
    /// thread instead and always passes `false`.
    pub looping: bool,
}

/// Platform audio API abstraction.
pub trait AudioBackend: Send + Sync {
    /// Human-readable backend name ("cpal", "null", "mock").
    fn name(&self) -> &str;

    /// Set the global output gain, clamped to `0.0..=1.0`.
    fn set_master_volume(&self, volume: f32);

    /// Create a source for the given stream format.
    fn create_source(&self, params: SourceParams) -> Result<SourceId>;

    /// Release a source and everything queued on it. Unknown ids are
    /// ignored.
    fn destroy_source(&self, source: SourceId);

    /// Whether the source still holds or plays data. Returns `false` once a
    /// non-looping source has drained its queue — the mixer uses this to
    /// detect voices that ended naturally.
    fn is_source_used(&self, source: SourceId) -> bool;

    /// Append a buffer of interleaved int16 samples to the source's queue.
    ///
    /// The buffer is shared, not copied: the backend holds its reference
    /// until the buffer is consumed or the source destroyed.
    fn queue_buffer(&self, source: SourceId, samples: Arc<[i16]>) -> Result<()>;

    /// Number of buffers queued and not yet fully consumed.
    fn queued_buffers(&self, source: SourceId) -> usize;

    /// Begin or resume playback.
    fn start_source(&self, source: SourceId) -> Result<()>;

    /// Halt playback, **preserving position**: a subsequent
    /// [`start_source`](Self::start_source) must continue where playback
    /// stopped. (Named after the OpenAL operation the original backends
    /// mapped to; semantically this is "pause".)
    fn stop_source(&self, source: SourceId) -> Result<()>;
}
