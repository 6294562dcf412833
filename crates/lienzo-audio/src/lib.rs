//! Lienzo Audio - the sound and music mixer
//!
//! This crate implements the audio half of lienzo:
//!
//! # Core Abstractions
//!
//! ## Backend
//!
//! - [`AudioBackend`] - Object-safe trait over the platform audio API:
//!   sources with a buffer queue, start/stop control, master volume
//! - [`NullBackend`] - Silent fallback; always available
//! - `CpalBackend` - Real output through cpal (feature `cpal-backend`,
//!   default on); a single output stream software-mixes every source
//! - `MockBackend` - Records calls and simulates consumption for tests
//!   (feature `mock-audio`)
//!
//! The important contract detail: [`AudioBackend::stop_source`] means
//! *pause*. Stopping a source must preserve its playback position so that
//! a later [`AudioBackend::start_source`] resumes where it left off.
//!
//! ## Decoding
//!
//! - [`Decoder`] - RIFF WAVE (via hound) and Ogg Vorbis (via symphonia)
//!   behind one uniform read/rewind interface, probed in that order
//!
//! ## Mixing
//!
//! - [`AudioSystem`] - Owns the sound/music tables and a fixed pool of
//!   [`MAX_VOICES`] voices with generation-stamped [`VoiceId`]s
//!
//! Sounds are fully decoded at load and played fire-and-forget. Music is
//! streamed: each playing track runs one background thread that keeps a
//! small ring of PCM buffers queued on its backend source, polling the
//! voice state under the mixer lock for pause/stop requests.
//!
//! # Example
//!
//! ```rust,ignore
//! use lienzo_audio::{AudioSystem, select_backend};
//!
//! let mut audio = AudioSystem::new(select_backend());
//!
//! let jump = audio.load_sound("jump.wav").unwrap();
//! audio.play_sound(jump);
//!
//! let dungeon = audio.open_music("dungeon.ogg").unwrap();
//! let voice = audio.loop_music(dungeon);
//! // ... later:
//! audio.stop_voice(voice);
//! audio.close_music(dungeon);
//! ```

pub mod backend;
pub mod decoder;
pub mod mixer;
pub mod null_backend;

#[cfg(feature = "cpal-backend")]
pub mod cpal_backend;

#[cfg(any(test, feature = "mock-audio"))]
pub mod mock;

pub use backend::{AudioBackend, SourceId, SourceParams};
pub use decoder::Decoder;
pub use mixer::{
    AudioSystem, Music, Sound, VoiceId, VoiceState, VoiceType, MAX_VOICES,
    MUSIC_BUFFER_LENGTH, TOTAL_MUSIC_BUFFERS,
};
pub use null_backend::NullBackend;

#[cfg(feature = "cpal-backend")]
pub use cpal_backend::CpalBackend;

#[cfg(any(test, feature = "mock-audio"))]
pub use mock::{MockBackend, MockCall};

use std::sync::Arc;

/// Error types for audio operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV decode error.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Ogg Vorbis decode error.
    #[error("Ogg Vorbis error: {0}")]
    Vorbis(#[from] symphonia::core::errors::Error),

    /// No decoder recognized the data.
    #[error("unrecognized audio format: {0}")]
    UnrecognizedFormat(String),

    /// The backend rejected an operation.
    #[error("audio backend error: {0}")]
    Backend(String),

    /// No output device is available.
    #[error("no audio output device available")]
    NoDevice,

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Probe the compiled-in backends in order and return the first that
/// initializes.
///
/// The null backend terminates the candidate list and always succeeds, so
/// audio can never be the reason startup fails — a machine without a sound
/// device simply plays into the void.
pub fn select_backend() -> Arc<dyn AudioBackend> {
    #[cfg(feature = "cpal-backend")]
    match CpalBackend::new() {
        Ok(backend) => {
            tracing::info!(backend = backend.name(), "audio backend selected");
            return Arc::new(backend);
        }
        Err(error) => {
            tracing::warn!(%error, "cpal backend unavailable, falling back");
        }
    }

    tracing::info!(backend = "null", "audio backend selected");
    Arc::new(NullBackend::new())
}
