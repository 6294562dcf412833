//! Voice pool, sound playback and streamed music.
//!
//! The mixer owns a table of fully-decoded [`Sound`]s, a table of open
//! [`Music`] streams and a fixed pool of [`MAX_VOICES`] voice slots. A voice
//! is one active (or recently active) playback: its slot index is permanent,
//! its generation advances on every allocation, and the two encode into the
//! opaque [`VoiceId`] handed to the application.
//!
//! One `parking_lot::Mutex` guards every voice state transition and the
//! music→voice back-references. It is held only across short critical
//! sections; backend I/O during streaming happens outside it.
//!
//! ## Music streaming
//!
//! Each playing music track runs one worker thread. The worker keeps a ring
//! of [`TOTAL_MUSIC_BUFFERS`] × [`MUSIC_BUFFER_LENGTH`]-sample chunks queued
//! on its backend source, decoding only as many chunks per cycle as the
//! backend reports consumed. Every cycle it snapshots its voice state under
//! the lock: `Paused` sleeps and retries, `Destroyed` exits. At 44.1 kHz
//! stereo one chunk is ≈46 ms and a full ring ≈370 ms, so the 250 ms cycle
//! leaves comfortable slack.
//!
//! Stopping a voice is the cancellation primitive; closing a music joins
//! the worker, which in the worst case takes one decode cycle.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lienzo_core::{Handle, HandleList};
use parking_lot::Mutex;

use crate::backend::{AudioBackend, SourceId, SourceParams};
use crate::decoder::Decoder;

/// Size of the voice pool.
pub const MAX_VOICES: usize = 64;

/// Samples per streaming chunk.
pub const MUSIC_BUFFER_LENGTH: usize = 4096;

/// Streaming chunks kept in flight per music track.
pub const TOTAL_MUSIC_BUFFERS: usize = 8;

/// Sleep while the owning voice is paused.
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// Sleep between streaming cycles.
const DECODE_CADENCE: Duration = Duration::from_millis(250);

/// Tag bits marking a raw value as a voice id.
const VOICE_TAG: u32 = 0x0000_CC00;

/// Voice generations wrap at 128 (7 bits).
const VOICE_GEN_MODULO: u8 = 128;

/// What occupies a voice slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceType {
    /// Never used, or fully reclaimed.
    None,
    /// A fire-and-forget sound.
    Sound,
    /// A streamed music track; the slot is managed by its worker thread.
    Music,
}

/// Playback state of a voice slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    /// Slot is idle.
    Inactive,
    /// Audible.
    Playing,
    /// Halted, position preserved.
    Paused,
    /// Explicitly stopped; the slot is a reusable husk, not a tombstone.
    Destroyed,
}

/// Opaque identifier of a voice. The zero value is invalid and inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceId(pub(crate) u32);

impl VoiceId {
    /// The invalid voice, returned when playback could not start.
    pub const INVALID: Self = Self(0);

    /// Raw value, `0` for [`INVALID`](Self::INVALID).
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Whether this id was ever worth anything.
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    fn encode(index: usize, r#gen: u8) -> Self {
        Self((u32::from(r#gen) << 16) | VOICE_TAG | index as u32)
    }

    fn decode(self) -> Option<(usize, u8)> {
        if self.0 & 0x0000_FF00 != VOICE_TAG {
            return None;
        }

        let index = (self.0 & 0xFF) as usize;
        let r#gen = ((self.0 >> 16) & 0x7F) as u8;

        if index >= MAX_VOICES {
            return None;
        }

        Some((index, r#gen))
    }
}

#[derive(Debug, Clone, Copy)]
struct VoiceSlot {
    r#gen: u8,
    kind: VoiceType,
    state: VoiceState,
    source: Option<SourceId>,
}

impl VoiceSlot {
    const fn empty() -> Self {
        Self {
            r#gen: 0,
            kind: VoiceType::None,
            state: VoiceState::Inactive,
            source: None,
        }
    }
}

struct Voices {
    slots: [VoiceSlot; MAX_VOICES],
}

/// A fully decoded sound effect. Cheap to play many times at once; every
/// playing voice shares the same PCM buffer.
pub struct Sound {
    channels: u16,
    sample_rate: u32,
    samples: Arc<[i16]>,
    name: String,
}

impl Sound {
    /// The file or buffer this sound was decoded from.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Shared cell linking a music track to its active voice. Written by the
/// user thread when playback starts and by the worker thread when it ends;
/// both do so while holding the mixer lock.
#[derive(Default)]
struct MusicLink {
    /// Raw [`VoiceId`]; `0` when the track is not playing.
    voice: AtomicU32,
    /// In-loop rewinds performed by the worker. Diagnostic.
    rewinds: AtomicU32,
}

/// An open music stream. The decoder stays open for the music's lifetime;
/// a worker thread exists only while the track plays.
pub struct Music {
    decoder: Arc<Mutex<Decoder>>,
    link: Arc<MusicLink>,
    worker: Option<thread::JoinHandle<()>>,
    name: String,
}

impl Music {
    /// The file or buffer this music streams from.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The mixer: sound and music tables plus the voice pool, over a pluggable
/// [`AudioBackend`].
pub struct AudioSystem {
    backend: Arc<dyn AudioBackend>,
    voices: Arc<Mutex<Voices>>,
    sounds: HandleList<Sound>,
    musics: HandleList<Music>,
}

impl AudioSystem {
    /// Create the mixer over the given backend.
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        tracing::info!(backend = backend.name(), "audio system initialized");

        Self {
            backend,
            voices: Arc::new(Mutex::new(Voices {
                slots: [VoiceSlot::empty(); MAX_VOICES],
            })),
            sounds: HandleList::new(),
            musics: HandleList::new(),
        }
    }

    /// Name of the selected backend.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Set the global output gain, clamped to `0.0..=1.0`.
    pub fn set_master_volume(&self, volume: f32) {
        self.backend.set_master_volume(volume);
    }

    // --- Sounds ---

    /// Decode an entire audio file into memory. Returns `None` if the file
    /// is missing or no decoder recognizes it.
    pub fn load_sound(&mut self, path: impl AsRef<std::path::Path>) -> Option<Handle<Sound>> {
        let name = path.as_ref().display().to_string();
        let decoder = Decoder::open(path.as_ref()).ok()?;

        self.finish_sound_load(decoder, name)
    }

    /// Decode a sound from an in-memory buffer.
    pub fn load_sound_from_bytes(
        &mut self,
        name: &str,
        data: impl Into<Arc<[u8]>>,
    ) -> Option<Handle<Sound>> {
        let decoder = Decoder::from_bytes(name, data).ok()?;

        self.finish_sound_load(decoder, name.to_string())
    }

    fn finish_sound_load(&mut self, mut decoder: Decoder, name: String) -> Option<Handle<Sound>> {
        let mut samples = Vec::with_capacity(decoder.total_samples() as usize);
        let mut chunk = vec![0i16; 8192];

        loop {
            match decoder.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => samples.extend_from_slice(&chunk[..n]),
                Err(error) => {
                    tracing::warn!(sound = %name, %error, "sound decode failed");
                    return None;
                }
            }
        }

        let sound = Sound {
            channels: decoder.channels(),
            sample_rate: decoder.sample_rate(),
            samples: samples.into(),
            name,
        };

        self.sounds.add(sound)
    }

    /// Free a sound. Voices still playing it keep the PCM buffer alive
    /// through their backend source; the handle itself dies immediately.
    pub fn destroy_sound(&mut self, handle: Handle<Sound>) {
        self.sounds.remove(handle);
    }

    /// Play a sound once. Returns [`VoiceId::INVALID`] if the handle is
    /// stale, no voice is free, or the backend fails.
    pub fn play_sound(&self, handle: Handle<Sound>) -> VoiceId {
        self.play_sound_internal(handle, false)
    }

    /// Play a sound looping until its voice is stopped.
    pub fn loop_sound(&self, handle: Handle<Sound>) -> VoiceId {
        self.play_sound_internal(handle, true)
    }

    fn play_sound_internal(&self, handle: Handle<Sound>, looping: bool) -> VoiceId {
        let Some(sound) = self.sounds.get(handle) else {
            tracing::error!(handle = ?handle, "invalid sound handle");
            return VoiceId::INVALID;
        };

        let mut voices = self.voices.lock();

        let Some((index, id)) = self.find_voice(&mut voices) else {
            tracing::error!(sound = %sound.name, "no free voice");
            return VoiceId::INVALID;
        };

        let params = SourceParams {
            channels: sound.channels,
            sample_rate: sound.sample_rate,
            looping,
        };

        let source = match self.backend.create_source(params) {
            Ok(source) => source,
            Err(error) => {
                tracing::error!(sound = %sound.name, %error, "failed to create source");
                return VoiceId::INVALID;
            }
        };

        if let Err(error) = self.backend.queue_buffer(source, sound.samples.clone()) {
            tracing::error!(sound = %sound.name, %error, "failed to queue samples");
            self.backend.destroy_source(source);
            return VoiceId::INVALID;
        }

        if let Err(error) = self.backend.start_source(source) {
            tracing::error!(sound = %sound.name, %error, "failed to start source");
            self.backend.destroy_source(source);
            return VoiceId::INVALID;
        }

        let slot = &mut voices.slots[index];
        slot.kind = VoiceType::Sound;
        slot.state = VoiceState::Playing;
        slot.source = Some(source);

        id
    }

    // --- Music ---

    /// Open a music file for streaming. The file stays open until
    /// [`close_music`](Self::close_music).
    pub fn open_music(&mut self, path: impl AsRef<std::path::Path>) -> Option<Handle<Music>> {
        let name = path.as_ref().display().to_string();
        let decoder = Decoder::open(path.as_ref()).ok()?;

        self.musics.add(Music {
            decoder: Arc::new(Mutex::new(decoder)),
            link: Arc::new(MusicLink::default()),
            worker: None,
            name,
        })
    }

    /// Open a music stream over an in-memory buffer.
    pub fn open_music_from_bytes(
        &mut self,
        name: &str,
        data: impl Into<Arc<[u8]>>,
    ) -> Option<Handle<Music>> {
        let decoder = Decoder::from_bytes(name, data).ok()?;

        self.musics.add(Music {
            decoder: Arc::new(Mutex::new(decoder)),
            link: Arc::new(MusicLink::default()),
            worker: None,
            name: name.to_string(),
        })
    }

    /// Stop the track if it is playing, join its worker and close the
    /// stream. Waits at most one decode cycle.
    pub fn close_music(&mut self, handle: Handle<Music>) {
        let Some(mut music) = self.musics.remove(handle) else {
            tracing::warn!(handle = ?handle, "invalid music handle");
            return;
        };

        let active = music.link.voice.load(Ordering::Acquire);
        if active != 0 {
            tracing::debug!(music = %music.name, "stopping voice before close");
            self.stop_voice(VoiceId(active));
        }

        if let Some(worker) = music.worker.take() {
            if worker.join().is_err() {
                tracing::error!(music = %music.name, "music worker panicked");
            }
        }
    }

    /// Play a track once. If it is already playing, return the existing
    /// voice instead of starting another.
    pub fn play_music(&mut self, handle: Handle<Music>) -> VoiceId {
        self.play_music_with_loops(handle, 0)
    }

    /// Play a track repeating forever.
    pub fn loop_music(&mut self, handle: Handle<Music>) -> VoiceId {
        self.play_music_with_loops(handle, -1)
    }

    /// Play a track with an explicit loop count: `0` plays it once, `n > 0`
    /// adds `n` extra passes, negative repeats forever.
    pub fn play_music_with_loops(&mut self, handle: Handle<Music>, loop_count: i32) -> VoiceId {
        let backend = self.backend.clone();
        let voices_arc = self.voices.clone();

        let Some(music) = self.musics.get_mut(handle) else {
            tracing::warn!(handle = ?handle, "invalid music handle");
            return VoiceId::INVALID;
        };

        let existing = music.link.voice.load(Ordering::Acquire);
        if existing != 0 {
            tracing::warn!(music = %music.name, "music is already playing");
            return VoiceId(existing);
        }

        // The previous worker (if any) has already cleared the link, so it
        // is moments from returning; reap it before spawning the next.
        if let Some(worker) = music.worker.take() {
            let _ = worker.join();
        }

        let (channels, sample_rate) = {
            let decoder = music.decoder.lock();
            (decoder.channels(), decoder.sample_rate())
        };

        let mut voices = voices_arc.lock();

        let Some((index, id)) = Self::find_voice_in(&backend, &mut voices) else {
            tracing::error!(music = %music.name, "no free voice");
            return VoiceId::INVALID;
        };

        // Source-level looping stays off; the worker implements looping by
        // rewinding the decoder.
        let params = SourceParams {
            channels,
            sample_rate,
            looping: false,
        };

        let source = match backend.create_source(params) {
            Ok(source) => source,
            Err(error) => {
                tracing::error!(music = %music.name, %error, "failed to create source");
                return VoiceId::INVALID;
            }
        };

        let slot = &mut voices.slots[index];
        slot.kind = VoiceType::Music;
        slot.state = VoiceState::Playing;
        slot.source = Some(source);
        music.link.voice.store(id.0, Ordering::Release);

        drop(voices);

        let context = WorkerContext {
            backend,
            voices: voices_arc,
            link: music.link.clone(),
            decoder: music.decoder.clone(),
            index,
            source,
            loop_count,
            name: music.name.clone(),
        };

        match thread::Builder::new()
            .name("music".to_string())
            .spawn(move || music_worker(context))
        {
            Ok(worker) => {
                music.worker = Some(worker);
                id
            }
            Err(error) => {
                tracing::error!(music = %music.name, %error, "failed to spawn music worker");

                let mut voices = self.voices.lock();
                self.backend.destroy_source(source);
                voices.slots[index] = VoiceSlot {
                    r#gen: voices.slots[index].r#gen,
                    ..VoiceSlot::empty()
                };
                music.link.voice.store(0, Ordering::Release);

                VoiceId::INVALID
            }
        }
    }

    // --- Voice control ---

    /// Pause a playing voice, keeping its position.
    pub fn pause_voice(&self, id: VoiceId) {
        let mut voices = self.voices.lock();

        let Some(index) = Self::resolve(&voices, id) else {
            tracing::error!(voice = id.0, "invalid voice id, can't pause");
            return;
        };

        let slot = &mut voices.slots[index];

        if slot.state != VoiceState::Playing {
            tracing::warn!(voice = id.0, "voice is not playing, can't pause");
            return;
        }

        if let Some(source) = slot.source {
            match self.backend.stop_source(source) {
                Ok(()) => slot.state = VoiceState::Paused,
                Err(error) => tracing::warn!(voice = id.0, %error, "failed to pause"),
            }
        }
    }

    /// Resume a paused voice.
    pub fn unpause_voice(&self, id: VoiceId) {
        let mut voices = self.voices.lock();

        let Some(index) = Self::resolve(&voices, id) else {
            tracing::error!(voice = id.0, "invalid voice id, can't resume");
            return;
        };

        let slot = &mut voices.slots[index];

        if slot.state != VoiceState::Paused {
            tracing::warn!(voice = id.0, "voice is not paused, can't resume");
            return;
        }

        if let Some(source) = slot.source {
            match self.backend.start_source(source) {
                Ok(()) => slot.state = VoiceState::Playing,
                Err(error) => tracing::warn!(voice = id.0, %error, "failed to resume"),
            }
        }
    }

    /// Stop a voice for good. Sound slots become reusable immediately;
    /// music workers observe the state on their next cycle and wind down.
    ///
    /// The order inside the critical section matters: the source is stopped
    /// and destroyed *before* the state flips to `Destroyed`, so a worker
    /// that sees `Destroyed` never races a live source.
    pub fn stop_voice(&self, id: VoiceId) {
        let mut voices = self.voices.lock();

        let Some(index) = Self::resolve(&voices, id) else {
            tracing::error!(voice = id.0, "invalid voice id, can't stop");
            return;
        };

        let slot = &mut voices.slots[index];

        if slot.kind == VoiceType::None {
            tracing::warn!(voice = id.0, "voice is not active, can't stop");
            return;
        }

        if let Some(source) = slot.source.take() {
            let _ = self.backend.stop_source(source);
            self.backend.destroy_source(source);
        }

        slot.state = VoiceState::Destroyed;
    }

    /// Stop everything and join all music workers. Called by the runtime's
    /// teardown; also runs on drop.
    pub fn shutdown(&mut self) {
        {
            let mut voices = self.voices.lock();

            for slot in &mut voices.slots {
                if slot.kind == VoiceType::None {
                    continue;
                }

                if let Some(source) = slot.source.take() {
                    let _ = self.backend.stop_source(source);
                    self.backend.destroy_source(source);
                }

                slot.state = VoiceState::Destroyed;
            }
        }

        let open: Vec<_> = self.musics.iter().map(|(handle, _)| handle).collect();
        for handle in open {
            self.close_music(handle);
        }
    }

    // --- Introspection ---

    /// Type and state of a voice, if the id is current.
    pub fn voice_state(&self, id: VoiceId) -> Option<(VoiceType, VoiceState)> {
        let voices = self.voices.lock();
        let index = Self::resolve(&voices, id)?;
        let slot = &voices.slots[index];

        Some((slot.kind, slot.state))
    }

    /// The voice currently attached to a music track, if any.
    pub fn music_voice(&self, handle: Handle<Music>) -> Option<VoiceId> {
        let music = self.musics.get(handle)?;
        let raw = music.link.voice.load(Ordering::Acquire);

        (raw != 0).then_some(VoiceId(raw))
    }

    /// How many times a music worker has rewound its decoder while looping.
    pub fn music_rewinds(&self, handle: Handle<Music>) -> u32 {
        self.musics
            .get(handle)
            .map_or(0, |music| music.link.rewinds.load(Ordering::Acquire))
    }

    // --- Internals ---

    fn resolve(voices: &Voices, id: VoiceId) -> Option<usize> {
        let (index, r#gen) = id.decode()?;

        (voices.slots[index].r#gen == r#gen).then_some(index)
    }

    fn find_voice(&self, voices: &mut Voices) -> Option<(usize, VoiceId)> {
        Self::find_voice_in(&self.backend, voices)
    }

    /// Linear scan for a reusable slot; claims it by advancing the
    /// generation. Music slots are skipped — their workers reclaim them.
    fn find_voice_in(
        backend: &Arc<dyn AudioBackend>,
        voices: &mut Voices,
    ) -> Option<(usize, VoiceId)> {
        let mut found = None;

        for (index, slot) in voices.slots.iter_mut().enumerate() {
            let reusable = match (slot.kind, slot.state) {
                (VoiceType::Music, _) => false,
                (VoiceType::None, _) => true,
                (_, VoiceState::Destroyed) => true,
                (VoiceType::Sound, _) => match slot.source {
                    // Reached its natural end; reclaim the source.
                    Some(source) if !backend.is_source_used(source) => {
                        backend.destroy_source(source);
                        true
                    }
                    _ => false,
                },
            };

            if reusable {
                found = Some(index);
                break;
            }
        }

        let Some(index) = found else {
            tracing::warn!("voice pool exhausted");
            return None;
        };

        let slot = &mut voices.slots[index];
        slot.r#gen = (slot.r#gen + 1) % VOICE_GEN_MODULO;
        slot.kind = VoiceType::None;
        slot.state = VoiceState::Inactive;
        slot.source = None;

        Some((index, VoiceId::encode(index, slot.r#gen)))
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct WorkerContext {
    backend: Arc<dyn AudioBackend>,
    voices: Arc<Mutex<Voices>>,
    link: Arc<MusicLink>,
    decoder: Arc<Mutex<Decoder>>,
    index: usize,
    source: SourceId,
    loop_count: i32,
    name: String,
}

/// Body of a music streaming thread.
fn music_worker(mut context: WorkerContext) {
    tracing::debug!(music = %context.name, "music worker started");

    if let Err(error) = context.decoder.lock().rewind() {
        tracing::warn!(music = %context.name, %error, "initial rewind failed");
    }

    if prefill(&context) && start(&context) {
        stream(&mut context);
        let _ = context.backend.stop_source(context.source);
    }

    // Reclaim the slot. The source may already be gone if the user stopped
    // the voice; destroying twice is a no-op by backend contract.
    let mut voices = context.voices.lock();

    context.backend.destroy_source(context.source);

    let slot = &mut voices.slots[context.index];
    slot.kind = VoiceType::None;
    slot.state = VoiceState::Inactive;
    slot.source = None;

    context.link.voice.store(0, Ordering::Release);

    tracing::debug!(music = %context.name, "music worker finished");
}

/// Decode and queue the initial ring of buffers.
fn prefill(context: &WorkerContext) -> bool {
    for _ in 0..TOTAL_MUSIC_BUFFERS {
        let mut chunk = vec![0i16; MUSIC_BUFFER_LENGTH];

        let read = match context.decoder.lock().read(&mut chunk) {
            Ok(read) => read,
            Err(error) => {
                tracing::error!(music = %context.name, %error, "music decode failed");
                return false;
            }
        };

        if read == 0 {
            tracing::error!(music = %context.name, "music track is too short");
            return false;
        }

        chunk.truncate(read);

        if let Err(error) = context.backend.queue_buffer(context.source, chunk.into()) {
            tracing::error!(music = %context.name, %error, "failed to queue music buffer");
        }
    }

    true
}

fn start(context: &WorkerContext) -> bool {
    if let Err(error) = context.backend.start_source(context.source) {
        tracing::error!(music = %context.name, %error, "failed to start music");
        return false;
    }

    true
}

/// The steady-state streaming loop. Returns when the voice is destroyed or
/// the track (and its loop budget) runs out.
fn stream(context: &mut WorkerContext) {
    let mut running = true;

    while running {
        let state = { context.voices.lock().slots[context.index].state };

        match state {
            VoiceState::Destroyed => break,
            VoiceState::Paused => {
                thread::sleep(PAUSE_POLL);
                continue;
            }
            _ => {}
        }

        // Refill exactly as many buffers as the backend consumed.
        let queued = context.backend.queued_buffers(context.source);
        let played = TOTAL_MUSIC_BUFFERS.saturating_sub(queued);

        for _ in 0..played {
            let mut chunk = vec![0i16; MUSIC_BUFFER_LENGTH];

            let read = match context.decoder.lock().read(&mut chunk) {
                Ok(read) => read,
                Err(error) => {
                    tracing::warn!(music = %context.name, %error, "music decode failed");
                    0
                }
            };

            if read == 0 {
                if context.loop_count == 0 {
                    running = false;
                    break;
                }

                if context.loop_count > 0 {
                    context.loop_count -= 1;
                }

                // Negative counts never decrement: loop forever.

                if let Err(error) = context.decoder.lock().rewind() {
                    tracing::warn!(music = %context.name, %error, "music rewind failed");
                    running = false;
                    break;
                }

                context.link.rewinds.fetch_add(1, Ordering::AcqRel);

                // Nothing queued for this pass; the empty chunk is dropped.
                continue;
            }

            chunk.truncate(read);

            if let Err(error) = context.backend.queue_buffer(context.source, chunk.into()) {
                tracing::warn!(music = %context.name, %error, "failed to queue music buffer");
            }
        }

        if running {
            thread::sleep(DECODE_CADENCE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null_backend::NullBackend;

    fn silent_wav(seconds: f32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..(8_000.0 * seconds) as usize {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }

        cursor.into_inner()
    }

    #[test]
    fn test_voice_id_encoding() {
        let id = VoiceId::encode(5, 3);
        assert_eq!(id.decode(), Some((5, 3)));
        assert!(id.is_valid());

        assert_eq!(VoiceId::INVALID.decode(), None);
        assert_eq!(VoiceId(0x1234_5678).decode(), None); // wrong tag
        assert_eq!(VoiceId(0x0000_CCFF).decode(), None); // index out of range
    }

    #[test]
    fn test_invalid_sound_handle_is_inert() {
        let audio = AudioSystem::new(Arc::new(NullBackend::new()));
        let bogus = Handle::from_raw(0x00FC0001).unwrap();

        assert_eq!(audio.play_sound(bogus), VoiceId::INVALID);
    }

    #[test]
    fn test_sound_load_and_play() {
        let mut audio = AudioSystem::new(Arc::new(NullBackend::new()));
        let sound = audio
            .load_sound_from_bytes("beep.wav", silent_wav(0.25))
            .unwrap();

        let voice = audio.play_sound(sound);
        assert!(voice.is_valid());
        assert_eq!(
            audio.voice_state(voice),
            Some((VoiceType::Sound, VoiceState::Playing))
        );
    }

    #[test]
    fn test_stale_voice_ops_are_inert() {
        let mut audio = AudioSystem::new(Arc::new(NullBackend::new()));
        let sound = audio
            .load_sound_from_bytes("beep.wav", silent_wav(0.1))
            .unwrap();

        let voice = audio.play_sound(sound);
        audio.stop_voice(voice);

        // With the null backend every slot is immediately reusable, so the
        // next play claims the same slot under a new generation.
        let replacement = audio.play_sound(sound);
        assert!(replacement.is_valid());
        assert_ne!(voice, replacement);

        // The stale id no longer resolves; these must not touch the new voice.
        assert_eq!(audio.voice_state(voice), None);
        audio.pause_voice(voice);
        audio.stop_voice(voice);
        assert_eq!(
            audio.voice_state(replacement),
            Some((VoiceType::Sound, VoiceState::Playing))
        );
    }

    #[test]
    fn test_destroy_sound_while_playing_is_safe() {
        let mut audio = AudioSystem::new(Arc::new(NullBackend::new()));
        let sound = audio
            .load_sound_from_bytes("beep.wav", silent_wav(0.1))
            .unwrap();

        let voice = audio.play_sound(sound);
        audio.destroy_sound(sound);

        assert!(audio.play_sound(sound) == VoiceId::INVALID);
        assert!(voice.is_valid());
    }

    #[test]
    fn test_music_open_close_without_play() {
        let mut audio = AudioSystem::new(Arc::new(NullBackend::new()));
        let music = audio
            .open_music_from_bytes("track.wav", silent_wav(1.0))
            .unwrap();

        assert!(audio.music_voice(music).is_none());
        audio.close_music(music);
        audio.close_music(music); // stale handle: warns, no effect
    }

    #[test]
    fn test_music_too_short_frees_voice() {
        let mut audio = AudioSystem::new(Arc::new(NullBackend::new()));

        // Shorter than one ring: the worker logs and bails out.
        let music = audio
            .open_music_from_bytes("tiny.wav", silent_wav(0.01))
            .unwrap();

        let voice = audio.play_music(music);
        assert!(voice.is_valid());

        audio.close_music(music);

        // The worker reclaimed the slot: same generation, back to idle.
        assert_eq!(
            audio.voice_state(voice),
            Some((VoiceType::None, VoiceState::Inactive))
        );
    }
}
