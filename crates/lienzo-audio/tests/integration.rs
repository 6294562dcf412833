//! Mixer behavior against the mock backend: voice identity, music
//! idempotence, loop counting, pause/stop protocols.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lienzo_audio::{
    AudioSystem, MockBackend, MockCall, SourceId, VoiceState, VoiceType, TOTAL_MUSIC_BUFFERS,
};

/// Interleaved silence WAV of `chunks` × 4096 samples, mono 16-bit.
fn wav_of_chunks(chunks: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..chunks * 4096 {
            writer.write_sample((i % 128) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    cursor.into_inner()
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    condition()
}

/// The source created most recently on the mock.
fn last_source(mock: &MockBackend) -> SourceId {
    let raw = mock
        .calls()
        .iter()
        .rev()
        .find_map(|call| match call {
            MockCall::CreateSource(id, _) => Some(*id),
            _ => None,
        })
        .expect("no source was created");

    SourceId::new(raw)
}

#[test]
fn test_voice_identity_after_play() {
    let mock = MockBackend::new();
    let mut audio = AudioSystem::new(Arc::new(mock.clone()));

    let sound = audio
        .load_sound_from_bytes("fanfare.wav", wav_of_chunks(4))
        .unwrap();

    // Three plays in the same frame get three live voices.
    let voices = [
        audio.play_sound(sound),
        audio.play_sound(sound),
        audio.play_sound(sound),
    ];

    for voice in voices {
        assert!(voice.is_valid());
        assert_eq!(
            audio.voice_state(voice),
            Some((VoiceType::Sound, VoiceState::Playing))
        );
    }

    assert_eq!(mock.live_sources(), 3);

    // Distinct ids.
    assert_ne!(voices[0], voices[1]);
    assert_ne!(voices[1], voices[2]);
}

#[test]
fn test_drained_voices_are_reused() {
    let mock = MockBackend::new();
    let mut audio = AudioSystem::new(Arc::new(mock.clone()));

    let sound = audio
        .load_sound_from_bytes("fanfare.wav", wav_of_chunks(1))
        .unwrap();

    let first = audio.play_sound(sound);
    assert!(first.is_valid());

    // Simulate the hardware finishing the sound.
    mock.drain_source(last_source(&mock));

    // The next play reclaims the same slot under a new generation, and the
    // drained source is destroyed in the process.
    let second = audio.play_sound(sound);
    assert!(second.is_valid());
    assert_ne!(first, second);
    assert_eq!(audio.voice_state(first), None);
    assert_eq!(mock.live_sources(), 1);
}

#[test]
fn test_pause_resume_protocol() {
    let mock = MockBackend::new();
    let mut audio = AudioSystem::new(Arc::new(mock.clone()));

    let sound = audio
        .load_sound_from_bytes("beep.wav", wav_of_chunks(2))
        .unwrap();
    let voice = audio.play_sound(sound);

    audio.pause_voice(voice);
    assert_eq!(
        audio.voice_state(voice),
        Some((VoiceType::Sound, VoiceState::Paused))
    );

    // Pausing a paused voice is a warning, not a transition.
    audio.pause_voice(voice);
    assert_eq!(
        audio.voice_state(voice),
        Some((VoiceType::Sound, VoiceState::Paused))
    );

    audio.unpause_voice(voice);
    assert_eq!(
        audio.voice_state(voice),
        Some((VoiceType::Sound, VoiceState::Playing))
    );

    let calls = mock.calls();
    let stops = calls.iter().filter(|c| matches!(c, MockCall::StopSource(_))).count();
    let starts = calls.iter().filter(|c| matches!(c, MockCall::StartSource(_))).count();
    assert_eq!(stops, 1);
    assert_eq!(starts, 2); // initial play + resume
}

#[test]
fn test_music_play_is_idempotent() {
    let mock = MockBackend::new();
    let mut audio = AudioSystem::new(Arc::new(mock.clone()));

    let music = audio
        .open_music_from_bytes("dungeon.wav", wav_of_chunks(32))
        .unwrap();

    let first = audio.loop_music(music);
    assert!(first.is_valid());

    let second = audio.play_music(music);
    assert_eq!(first, second);

    assert_eq!(audio.music_voice(music), Some(first));
    assert_eq!(
        audio.voice_state(first),
        Some((VoiceType::Music, VoiceState::Playing))
    );

    audio.stop_voice(first);
    audio.close_music(music);
}

#[test]
fn test_stop_then_close_does_not_deadlock() {
    let mock = MockBackend::new();
    let mut audio = AudioSystem::new(Arc::new(mock.clone()));

    let music = audio
        .open_music_from_bytes("dungeon.wav", wav_of_chunks(64))
        .unwrap();

    let voice = audio.loop_music(music);
    assert!(voice.is_valid());

    let started = Instant::now();
    audio.stop_voice(voice);
    audio.close_music(music);

    // The worker observes Destroyed within one decode cycle.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(audio.music_voice(music), None);
}

#[test]
fn test_music_worker_prefills_ring() {
    let mock = MockBackend::new();
    let mut audio = AudioSystem::new(Arc::new(mock.clone()));

    let music = audio
        .open_music_from_bytes("dungeon.wav", wav_of_chunks(32))
        .unwrap();

    let voice = audio.loop_music(music);
    assert!(voice.is_valid());

    let source = last_source(&mock);
    assert!(wait_until(Duration::from_secs(5), || {
        mock.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::QueueBuffer(id, _) if *id == source.raw()))
            .count()
            >= TOTAL_MUSIC_BUFFERS
    }));

    // The ring is bounded: the worker never queues more than it consumed.
    std::thread::sleep(Duration::from_millis(600));
    let queued: usize = {
        let calls = mock.calls();
        calls
            .iter()
            .filter(|c| matches!(c, MockCall::QueueBuffer(id, _) if *id == source.raw()))
            .count()
    };
    assert_eq!(queued, TOTAL_MUSIC_BUFFERS);

    audio.stop_voice(voice);
    audio.close_music(music);
}

#[test]
fn test_music_loop_counter() {
    let mock = MockBackend::new();
    let mut audio = AudioSystem::new(Arc::new(mock.clone()));

    // 10 chunks per pass, 2 extra loops => 30 chunks total, 2 rewinds.
    let music = audio
        .open_music_from_bytes("dungeon.wav", wav_of_chunks(10))
        .unwrap();

    let voice = audio.play_music_with_loops(music, 2);
    assert!(voice.is_valid());

    let source = last_source(&mock);

    // Keep "consuming" what the worker queues until the track ends.
    let finished = wait_until(Duration::from_secs(10), || {
        mock.consume_buffers(source, TOTAL_MUSIC_BUFFERS);
        audio.music_voice(music).is_none()
    });
    assert!(finished, "music never finished");

    assert_eq!(audio.music_rewinds(music), 2);

    // The worker reclaimed the voice slot on its way out.
    assert_eq!(
        audio.voice_state(voice),
        Some((VoiceType::None, VoiceState::Inactive))
    );

    audio.close_music(music);
}

#[test]
fn test_master_volume_delegates_to_backend() {
    let mock = MockBackend::new();
    let audio = AudioSystem::new(Arc::new(mock.clone()));

    audio.set_master_volume(0.25);
    assert_eq!(mock.master_volume(), 0.25);

    // Out-of-range values clamp.
    audio.set_master_volume(7.0);
    assert_eq!(mock.master_volume(), 1.0);
}

#[test]
fn test_shutdown_stops_everything() {
    let mock = MockBackend::new();
    let mut audio = AudioSystem::new(Arc::new(mock.clone()));

    let sound = audio
        .load_sound_from_bytes("beep.wav", wav_of_chunks(1))
        .unwrap();
    let music = audio
        .open_music_from_bytes("dungeon.wav", wav_of_chunks(64))
        .unwrap();

    audio.play_sound(sound);
    audio.loop_music(music);

    let started = Instant::now();
    audio.shutdown();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(mock.live_sources(), 0);
}
